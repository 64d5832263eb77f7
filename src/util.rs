use crate::config::KeyLogStrategy;

// Key masking and hint utilities (shared by every node)
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let start: String = chars[..4].iter().collect();
    let end: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", start, end)
}

/// How a bearer token shows up in logs. A composite BYOK token is masked per part.
pub fn token_hint(strategy: KeyLogStrategy, token: &str) -> Option<String> {
    match strategy {
        KeyLogStrategy::None => None,
        KeyLogStrategy::Plain => Some(token.to_string()),
        KeyLogStrategy::Masked => Some(
            token
                .split(';')
                .map(mask_key)
                .collect::<Vec<_>>()
                .join(";"),
        ),
    }
}

/// Non-empty trimmed value of an optional text parameter.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Splits comma separated user input, trimming and dropping blanks.
pub fn split_csv(text: &str, limit: Option<usize>) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(limit.unwrap_or(usize::MAX))
        .map(str::to_string)
        .collect()
}

/// Truncates an upstream body for error messages.
pub fn snippet(body: &str, max_chars: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty(&Some("  x ".into())), Some("x"));
        assert_eq!(non_empty(&Some("   ".into())), None);
        assert_eq!(non_empty(&None), None);
    }

    #[test]
    fn masks_keys() {
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key("dmt_1234567890"), "dmt_****7890");
    }

    #[test]
    fn token_hint_masks_each_byok_part() {
        assert_eq!(
            token_hint(KeyLogStrategy::Masked, "dmt_1234567890;sk-abcdefghij").as_deref(),
            Some("dmt_****7890;sk-a****ghij")
        );
        assert_eq!(token_hint(KeyLogStrategy::None, "x"), None);
        assert_eq!(token_hint(KeyLogStrategy::Plain, "x").as_deref(), Some("x"));
    }

    #[test]
    fn split_csv_trims_and_limits() {
        assert_eq!(split_csv(" a.com, ,b.com ", None), vec!["a.com", "b.com"]);
        assert_eq!(split_csv("1,2,3,4,5,6", Some(4)).len(), 4);
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("  héllo  ", 3), "hél");
        assert_eq!(snippet("ok", 240), "ok");
    }
}
