pub mod auth;
pub mod cache;

pub use auth::{auth_gate, RequestIdentity};
pub use cache::{response_cache, ResponseCache};

use axum::http::HeaderMap;

/// Extract the bearer credential from the Authorization header, if present
/// and well-formed.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))?;

    let token = auth_header.to_str().ok()?.strip_prefix("Bearer ")?;
    if token.trim().is_empty() {
        return None;
    }

    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_credential() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer    "));
        assert_eq!(bearer_token(&headers), None);
    }
}
