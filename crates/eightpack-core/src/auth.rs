// The capability components need from the session, and the shared contract
// that decides whether an authenticated response is a success or an
// application error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;
use crate::http::{HttpClient, Method};

/// What an authenticated caller needs from whoever owns the credentials.
pub trait AuthProvider: Send + Sync {
    /// Bearer token to send; empty when logged out.
    fn current_token(&self) -> String;

    /// The server rejected a call with `detail`. Implementations drop the
    /// credentials and surface the message.
    fn on_application_error(&self, detail: &str);

    /// The server accepted a call.
    fn on_success(&self) {}
}

/// Extract the application error carried by `body`, if any.
///
/// A body is an application error when its `detail` field is non-empty: a
/// non-empty string, a non-empty list (validation errors, rendered from their
/// `msg` entries), or any other value that is not null, false, zero or empty.
pub fn application_error_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                Some(Value::Array(items.clone()).to_string())
            } else {
                Some(messages.join("; "))
            }
        }
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Apply the error contract to a response body.
///
/// Application errors are reported to `auth` and returned as
/// [`ClientError::Application`]; anything else is reported as a success and
/// handed back unchanged.
pub fn screen_response(auth: &dyn AuthProvider, body: Value) -> Result<Value, ClientError> {
    match application_error_detail(&body) {
        Some(detail) => {
            auth.on_application_error(&detail);
            Err(ClientError::Application { detail })
        }
        None => {
            auth.on_success();
            Ok(body)
        }
    }
}

/// Send a request carrying the current bearer token and screen the answer.
pub async fn authenticated_request(
    http: &dyn HttpClient,
    auth: &dyn AuthProvider,
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Result<Value, ClientError> {
    let token = auth.current_token();
    let response = http.request(method, path, body, Some(&token)).await?;
    debug!(path, status = response.status, "authenticated call answered");
    screen_response(auth, response.body)
}

/// Decode a screened success body into `T`.
pub fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(body)?)
}

/// [`authenticated_request`], then decode the success body into `T`.
pub async fn authenticated_fetch<T: DeserializeOwned>(
    http: &dyn HttpClient,
    auth: &dyn AuthProvider,
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Result<T, ClientError> {
    let body = authenticated_request(http, auth, method, path, body).await?;
    decode(body)
}
