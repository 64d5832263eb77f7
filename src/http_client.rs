use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;

use crate::error::{AdapterError, Result, hint_for_status};
use crate::util::snippet;

const ERROR_SNIPPET_CHARS: usize = 240;

/// One client per call. Redirects are not followed so a validated host
/// cannot bounce the request somewhere the guard never saw.
pub fn client_with_timeout(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().redirect(Policy::none());
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Sends the request and turns any non-2xx status into `AdapterError::Upstream`.
/// No retries: a failure surfaces to the caller immediately.
pub async fn send(call: &'static str, url: &str, builder: RequestBuilder) -> Result<Response> {
    let start_time = Utc::now();
    let resp = builder.send().await?;
    let status = resp.status();
    tracing::debug!(
        "{} {} -> {} in {}ms",
        call,
        url,
        status.as_u16(),
        (Utc::now() - start_time).num_milliseconds()
    );
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or_default();
    Err(upstream_error(call, url, status.as_u16(), &body))
}

pub async fn json_body(resp: Response) -> Result<Value> {
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Reads the body as a stream, giving up once `limit` bytes are exceeded.
pub async fn bytes_body_limited(resp: Response, limit: usize) -> Result<Vec<u8>> {
    if resp.content_length().is_some_and(|len| len as usize > limit) {
        return Err(AdapterError::TooLarge { limit });
    }
    let mut out = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if out.len() + chunk.len() > limit {
            return Err(AdapterError::TooLarge { limit });
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

fn api_message(data: &Value) -> (Option<String>, Option<Value>) {
    match data.get("error") {
        Some(err @ Value::Object(obj)) => {
            let msg = obj
                .get("message")
                .or_else(|| obj.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string);
            (msg, Some(err.clone()))
        }
        Some(Value::String(s)) => (Some(s.clone()), None),
        _ => (
            data.get("message").and_then(Value::as_str).map(str::to_string),
            None,
        ),
    }
}

pub fn upstream_error(call: &'static str, url: &str, status: u16, body: &[u8]) -> AdapterError {
    let (message, api_error) = match serde_json::from_slice::<Value>(body) {
        Ok(data) => api_message(&data),
        Err(_) => (None, None),
    };
    let message = match message {
        Some(m) => format!("API Error: {}", m),
        None => {
            let text = snippet(&String::from_utf8_lossy(body), ERROR_SNIPPET_CHARS);
            if text.is_empty() {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                text
            }
        }
    };
    AdapterError::Upstream {
        call,
        url: url.to_string(),
        status,
        message,
        api_error,
        hint: hint_for_status(status),
    }
}
