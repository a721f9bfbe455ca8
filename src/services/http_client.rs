use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;

use crate::error::ApiError;

/// Outbound HTTP helper. Upstream failures are classified by status range:
/// 4xx surfaces as a client error, 5xx as a server error, both carrying the
/// upstream body as metadata.
#[derive(Clone, Default)]
pub struct RequestClient {
    client: Client,
}

impl RequestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: Option<HeaderMap>,
        body: Option<&Value>,
        params: Option<&[(&str, &str)]>,
        raise_for_status: bool,
    ) -> Result<Response, ApiError> {
        tracing::info!(%method, url, "sending external HTTP request");

        let mut builder = self.client.request(method, url);
        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(params) = params {
            builder = builder.query(params);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, url, "external request failed to complete");
            ApiError::server("External service error!", Some(Value::String(e.to_string())))
        })?;

        if !raise_for_status {
            return Ok(response);
        }

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "external service returned an error");
            return Err(classify_status(status, body));
        }

        Ok(response)
    }
}

fn classify_status(status: StatusCode, body: String) -> ApiError {
    let metadata = Some(Value::String(body));
    if status.is_client_error() {
        ApiError::client("External service error!", metadata)
    } else {
        ApiError::server("External service error!", metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as HttpStatus;

    #[test]
    fn four_xx_classifies_as_client_error() {
        let err = classify_status(StatusCode::NOT_FOUND, "missing".to_string());
        assert_eq!(err.status_code(), HttpStatus::BAD_REQUEST);
        assert_eq!(
            err.to_json(),
            serde_json::json!({ "message": "External service error!", "metadata": "missing" })
        );
    }

    #[test]
    fn five_xx_classifies_as_server_error() {
        let err = classify_status(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert_eq!(err.status_code(), HttpStatus::INTERNAL_SERVER_ERROR);
    }
}
