use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;

use crate::cache::{CacheStore, CachedResponse};
use crate::config;

use super::bearer_token;

/// Response cache handle: the store plus the configured entry TTL. Cloned
/// into the middleware stack and into handlers that purge after mutations.
#[derive(Clone)]
pub struct ResponseCache {
    store: CacheStore,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: CacheStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn from_config(store: CacheStore) -> Self {
        Self::new(store, Duration::from_secs(config::config().redis.cache_ttl_secs))
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Purge every cached response whose key contains the substring. Called
    /// by collaborators after a mutation; never triggered automatically.
    pub async fn invalidate(&self, key_substring: &str) {
        match self.store.remove_matching(key_substring).await {
            Ok(removed) if removed > 0 => {
                tracing::info!(pattern = key_substring, removed, "cache invalidated");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "cache invalidation failed"),
        }
    }
}

/// Response cache middleware. Only GET requests carrying a bearer credential
/// are cacheable; the key binds the entry to path, query string, and the
/// caller's credential so responses never cross identities.
pub async fn response_cache(State(cache): State<ResponseCache>, request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }
    let Some(credential) = bearer_token(request.headers()) else {
        return next.run(request).await;
    };

    let key = cache_key(request.uri(), &credential);

    // A store fault is explicitly downgraded to a miss here; the cache is
    // not a correctness dependency.
    match cache.store.get(&key).await {
        Ok(Some(hit)) => {
            tracing::info!("returning cached response");
            return replay(hit);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "cache read failed, treating as miss"),
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content = match String::from_utf8(bytes.to_vec()) {
        Ok(content) => content,
        // Non-text bodies pass through uncached
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    let entry = CachedResponse {
        content: content.clone(),
        status_code: parts.status.as_u16(),
    };
    match cache.store.set(&key, &entry, cache.ttl).await {
        Ok(()) => tracing::info!("caching the response"),
        Err(e) => tracing::warn!(error = %e, "cache write failed, skipping store"),
    }

    Response::from_parts(parts, Body::from(content))
}

fn cache_key(uri: &Uri, credential: &str) -> String {
    format!("{}/{}:{}", uri.path(), uri.query().unwrap_or(""), credential)
}

fn replay(hit: CachedResponse) -> Response {
    (
        StatusCode::from_u16(hit.status_code).unwrap_or(StatusCode::OK),
        [(header::CONTENT_TYPE, "application/json")],
        hit.content,
    )
        .into_response()
}
