use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;
use url::{Host, Url};

use crate::error::{AdapterError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.demeterics.com";

// 本地开发主机：http 放行，https 拒绝
const DEV_LOOPBACK_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "::1", "0.0.0.0"];

const METADATA_HOSTS: [&str; 3] = ["metadata.google.internal", "metadata.goog", "metadata"];

// fc00::/7 (ULA) and fe80::/10 (link-local), matched against the canonical literal.
static IPV6_PRIVATE_PREFIXES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"^f[cd][0-9a-f]{2}:").expect("static regex"),
        Regex::new(r"^fe[89ab][0-9a-f]:").expect("static regex"),
    ]
});

static REQUEST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("static regex"));

/// Outcome of a base URL check. Computed fresh for every call, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlVerdict {
    pub valid: bool,
    pub reason: Option<String>,
}

impl BaseUrlVerdict {
    fn accept() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            valid: false,
            reason: Some(reason.to_string()),
        }
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    a == 10 || (a == 172 && (16..=31).contains(&b)) || (a == 192 && b == 168) || (a == 169 && b == 254)
}

fn is_dev_loopback(host: &str, ipv4: Option<Ipv4Addr>) -> bool {
    DEV_LOOPBACK_HOSTS.contains(&host) || ipv4.is_some_and(|ip| ip.is_loopback())
}

/// SSRF 基础防护（纯语法检查，不做 DNS 解析）：
/// - 仅允许 http/https，禁止 userinfo
/// - localhost / 127.0.0.0/8 / ::1 / 0.0.0.0：http 放行（本地开发），https 拒绝。
///   这是刻意保留的不对称，不是漏洞。
/// - 拒绝 RFC1918、169.254.0.0/16（含云元数据地址）、fc00::/7、fe80::/10
/// - 拒绝云元数据主机名
///
/// IPv6 literals are matched by prefix on their canonical text form, so
/// embedded forms such as `::ffff:10.0.0.1` are not recognised as private.
pub fn validate_base_url(raw: &str) -> BaseUrlVerdict {
    let Ok(url) = Url::parse(raw.trim()) else {
        return BaseUrlVerdict::reject("Invalid URL format");
    };

    let is_http = match url.scheme() {
        "http" => true,
        "https" => false,
        _ => return BaseUrlVerdict::reject("URL must use the http or https protocol"),
    };

    if !url.username().is_empty() || url.password().is_some() {
        return BaseUrlVerdict::reject("Credentials in URL are not allowed");
    }

    let (host, ipv4) = match url.host() {
        Some(Host::Domain(d)) => (d.trim_end_matches('.').to_ascii_lowercase(), None),
        Some(Host::Ipv4(ip)) => (ip.to_string(), Some(ip)),
        Some(Host::Ipv6(ip)) => (ip.to_string(), None),
        None => return BaseUrlVerdict::reject("URL is missing a host"),
    };

    if is_dev_loopback(&host, ipv4) {
        if is_http {
            return BaseUrlVerdict::accept();
        }
        return BaseUrlVerdict::reject("Localhost URLs not allowed with HTTPS");
    }

    let private_v6 = IPV6_PRIVATE_PREFIXES.iter().any(|re| re.is_match(&host));
    if ipv4.is_some_and(is_private_v4) || private_v6 {
        return BaseUrlVerdict::reject("Private/internal IP addresses not allowed");
    }

    if METADATA_HOSTS.contains(&host.as_str()) {
        return BaseUrlVerdict::reject("Cloud metadata services not allowed");
    }

    BaseUrlVerdict::accept()
}

/// Resolves the configured base URL (falling back to the public gateway),
/// strips trailing slashes and runs the guard. Every outbound call goes
/// through here first; an error must abort the call.
pub fn validated_base_url(raw: Option<&str>) -> Result<String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let url = raw.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string();
    let verdict = validate_base_url(&url);
    if !verdict.valid {
        let reason = verdict.reason.unwrap_or_default();
        tracing::warn!("Rejected base URL {}: {}", url, reason);
        return Err(AdapterError::Config(format!("Invalid API base URL: {}", reason)));
    }
    Ok(url)
}

/// Export request ids end up in a URL path, so only `[A-Za-z0-9_-]{1,128}` is accepted.
pub fn is_valid_request_id(request_id: &str) -> bool {
    REQUEST_ID.is_match(request_id)
}
