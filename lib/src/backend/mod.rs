// lib/src/backend/mod.rs

//! The only boundary of the client layer: request/response calls against the
//! shared backend. `HttpBackend` talks to the real server, `InMemoryBackend`
//! plays the same contract offline.

pub mod endpoints;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use models::TransportError;

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// JSON request/response access to the backend. Paths are relative to the
/// configured base URL and always start with `/`.
///
/// Implementations return the decoded body on 2xx (`Value::Null` for an
/// empty body) and a `TransportError` otherwise. None of the calls can be
/// aborted once issued.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CareBackend: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, TransportError>;

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError>;

    /// Full-record replacement. The backend does not accept partial patches.
    async fn put(&self, path: &str, body: Value) -> Result<Value, TransportError>;

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, TransportError>;
}

/// Some deployments answer 200 with an error inside the body
/// (`{"code": 409, "msg": "..."}` or `{"success": false}`). Those are turned
/// into transport errors so callers see one failure path.
pub fn check_envelope(method: &'static str, path: &str, body: Value) -> Result<Value, TransportError> {
    let Some(map) = body.as_object() else {
        return Ok(body);
    };

    let message = map
        .get("msg")
        .or_else(|| map.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("request rejected")
        .to_string();

    if let Some(code) = map.get("code").and_then(Value::as_u64) {
        if code >= 400 && code < 600 {
            return Err(TransportError::new(method, path, Some(code as u16), message));
        }
    }
    if map.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(TransportError::new(method, path, None, message));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passes_plain_bodies_through() {
        let body = json!([{"planId": 1}]);
        assert_eq!(check_envelope("GET", "/x", body.clone()), Ok(body));
        assert_eq!(check_envelope("GET", "/x", Value::Null), Ok(Value::Null));
    }

    #[test]
    fn envelope_error_code_becomes_transport_error() {
        let err = check_envelope("POST", "/staff-info/nursing-plans", json!({"code": 409, "msg": "duplicate"}))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.message, "duplicate");
    }

    #[test]
    fn success_flag_false_is_an_error() {
        let err = check_envelope("PUT", "/x", json!({"success": false, "message": "locked"})).unwrap_err();
        assert_eq!(err.status, None);
        assert_eq!(err.message, "locked");
    }

    #[test]
    fn success_envelope_is_kept_whole() {
        let body = json!({"code": 200, "data": {"elderlyId": 3}});
        assert_eq!(check_envelope("GET", "/x", body.clone()), Ok(body));
    }
}
