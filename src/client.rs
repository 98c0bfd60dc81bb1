//! HTTP transport shared by every backend client.
//!
//! Adds the credential, maps status codes onto [`RepositoryError`] and pulls
//! the backend's own error message out of failed responses.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{NyayaError, RepositoryError, Result};
use crate::session::Credential;

/// Marker the backend puts in duplicate-complaint rejections.
const DUPLICATE_MARKER: &str = "similar complaint has already been submitted";

/// Thin wrapper over a configured `reqwest::Client`.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("nyayasathi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NyayaError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request, attaching the credential when one is given.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match credential {
            Some(credential) => {
                builder.header(reqwest::header::AUTHORIZATION, credential.header_value())
            }
            None => builder,
        }
    }

    /// Send and decode a JSON success body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> std::result::Result<T, RepositoryError> {
        let value = self.send_value(operation, request).await?;
        serde_json::from_value(value).map_err(|e| RepositoryError::Malformed(e.to_string()))
    }

    /// Send and decode the body as loose JSON, rejecting `{error}` bodies.
    pub(crate) async fn send_value(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> std::result::Result<Value, RepositoryError> {
        let response = self.dispatch(operation, request).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| RepositoryError::Malformed(e.to_string()))?;

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(RepositoryError::DomainRejected(describe_error(error, &value)));
        }
        Ok(value)
    }

    /// Send and ignore the success body.
    pub(crate) async fn send_empty(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> std::result::Result<(), RepositoryError> {
        self.dispatch(operation, request).await.map(|_| ())
    }

    async fn dispatch(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> std::result::Result<Response, RepositoryError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(operation = operation, error = %e, "Request failed in transport");
            RepositoryError::Network(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(operation = operation, status = status.as_u16(), "Backend responded");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_failure(status, &body))
    }
}

/// Map a non-2xx response onto the error taxonomy.
pub(crate) fn map_failure(status: StatusCode, body: &str) -> RepositoryError {
    match status {
        StatusCode::UNAUTHORIZED => RepositoryError::Unauthorized,
        StatusCode::NOT_FOUND => RepositoryError::NotFound,
        _ => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|value| backend_message(&value))
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            RepositoryError::DomainRejected(message)
        }
    }
}

/// Best human-readable message in an error body: `error`, then `detail`, then
/// the first field validation message.
pub(crate) fn backend_message(value: &Value) -> Option<String> {
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Some(describe_error(error, value));
    }
    if let Some(detail) = value.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }

    value.as_object()?.values().find_map(|field| match field {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

fn describe_error(error: &str, body: &Value) -> String {
    if !error.contains(DUPLICATE_MARKER) {
        return error.to_string();
    }

    match body.get("duplicate_complaint_id") {
        Some(Value::Number(id)) => {
            format!("Duplicate complaint detected. {} (Complaint ID: {})", error, id)
        }
        Some(Value::String(id)) => {
            format!("Duplicate complaint detected. {} (Complaint ID: {})", error, id)
        }
        _ => format!("Duplicate complaint detected. {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unauthorized_and_not_found_are_typed() {
        assert_eq!(
            map_failure(StatusCode::UNAUTHORIZED, r#"{"detail": "Invalid token."}"#),
            RepositoryError::Unauthorized
        );
        assert_eq!(map_failure(StatusCode::NOT_FOUND, ""), RepositoryError::NotFound);
    }

    #[test]
    fn backend_error_message_is_kept() {
        let err = map_failure(StatusCode::BAD_REQUEST, r#"{"error": "Invalid status"}"#);
        assert_eq!(err, RepositoryError::DomainRejected("Invalid status".to_string()));
    }

    #[test]
    fn detail_is_used_for_permission_errors() {
        let err = map_failure(
            StatusCode::FORBIDDEN,
            r#"{"detail": "You do not have permission to perform this action."}"#,
        );
        assert_eq!(
            err.user_message(),
            "You do not have permission to perform this action."
        );
    }

    #[test]
    fn first_field_error_is_used() {
        let message = backend_message(&json!({"username": ["A user with that username already exists."]}));
        assert_eq!(
            message.as_deref(),
            Some("A user with that username already exists.")
        );
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        let err = map_failure(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(
            err,
            RepositoryError::DomainRejected("Request failed with status 500".to_string())
        );
    }

    #[test]
    fn duplicate_rejection_mentions_existing_complaint() {
        let body = json!({
            "error": "A similar complaint has already been submitted.",
            "duplicate_complaint_id": 31
        });
        assert_eq!(
            backend_message(&body).as_deref(),
            Some("Duplicate complaint detected. A similar complaint has already been submitted. (Complaint ID: 31)")
        );
    }
}
