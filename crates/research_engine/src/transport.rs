use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Method;
use research_logging::research_trace;
use serde_json::Value;
use url::Url;

use crate::{ClientSettings, TransportError, TransportErrorKind};

pub const CSRF_HEADER: &str = "X-CSRFToken";

/// JSON request/response helper with uniform failure surfacing.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
    csrf_token: Option<String>,
}

impl Transport {
    pub fn new(settings: &ClientSettings) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(&settings.base_url).map_err(|err| {
            TransportError::new(
                TransportErrorKind::InvalidEndpoint,
                format!("{}: {err}", settings.base_url),
            )
        })?;
        // Relative endpoints resolve below the last path segment only with a
        // trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| TransportError::new(TransportErrorKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            csrf_token: settings.csrf_token.clone(),
        })
    }

    /// Performs one exchange. With `deadline`, the exchange is abandoned once
    /// it elapses and reported as [`TransportErrorKind::TimedOut`].
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        deadline: Option<Duration>,
    ) -> Result<Value, TransportError> {
        match deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.exchange(endpoint, method, body))
                .await
                .map_err(|_| {
                    TransportError::new(TransportErrorKind::TimedOut, "request timed out")
                })?,
            None => self.exchange(endpoint, method, body).await,
        }
    }

    async fn exchange(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.base_url.join(endpoint).map_err(|err| {
            TransportError::new(
                TransportErrorKind::InvalidEndpoint,
                format!("{endpoint}: {err}"),
            )
        })?;
        research_trace!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = self.csrf_token.as_deref() {
            request = request.header(CSRF_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;

        let payload = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                // Error pages are often HTML; the status code is what matters then.
                Err(_) if !status.is_success() => Value::Null,
                Err(err) => {
                    return Err(TransportError::malformed(format!(
                        "response is not JSON: {err}"
                    )))
                }
            }
        };

        if !status.is_success() {
            let code = status.as_u16();
            return Err(TransportError::new(
                TransportErrorKind::HttpStatus(code),
                failure_message(&payload).unwrap_or_else(|| format!("HTTP {code}")),
            ));
        }

        if payload.get("ok").and_then(Value::as_bool) == Some(false) {
            return Err(TransportError::new(
                TransportErrorKind::Rejected,
                failure_message(&payload).unwrap_or_else(|| "request failed".to_string()),
            ));
        }

        Ok(payload)
    }
}

/// Human-readable reason from a failure payload: `detail`, then `error`.
fn failure_message(payload: &Value) -> Option<String> {
    ["detail", "error"].iter().find_map(|key| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned)
    })
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportErrorKind::TimedOut, err.to_string());
    }
    if err.is_decode() {
        return TransportError::malformed(err.to_string());
    }
    TransportError::new(TransportErrorKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::failure_message;

    #[test]
    fn detail_wins_over_error() {
        let payload = json!({"error": "Too Many Requests", "detail": "10 per 1 minute"});
        assert_eq!(failure_message(&payload).as_deref(), Some("10 per 1 minute"));
    }

    #[test]
    fn blank_fields_are_skipped() {
        let payload = json!({"detail": "  ", "error": "CSRF validation failed"});
        assert_eq!(
            failure_message(&payload).as_deref(),
            Some("CSRF validation failed")
        );
        assert_eq!(failure_message(&json!({"ok": false})), None);
        assert_eq!(failure_message(&serde_json::Value::Null), None);
    }
}
