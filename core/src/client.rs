//! Request builder and response normalizer for the dashboard API.
//!
//! # Design
//! `ApiClient` holds the base URL and a shared token store and carries no
//! other state between calls. `build_request` produces an `HttpRequest`,
//! `parse_response` turns an `HttpResponse` into a JSON envelope or an
//! `ApiError`. `RestClient` in `rest.rs` joins the two around a `Transport`;
//! foreign hosts use the halves directly through the FFI crate.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, FALLBACK_MESSAGE};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE};
use crate::token::{MemoryTokenStore, TokenStore, TOKEN_KEY};

/// Whether a request should carry the stored bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    Bearer,
    Anonymous,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with a process-local token store.
    pub fn new(base_url: &str) -> Self {
        Self::with_store(base_url, Arc::new(MemoryTokenStore::new()))
    }

    pub fn with_store(base_url: &str, store: Arc<dyn TokenStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn from_config(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        Self::with_store(&config.base_url, store)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Token lifecycle
    // -----------------------------------------------------------------------

    /// Persist the session token. Storage failures are logged and dropped.
    pub fn save_token(&self, token: &str) {
        if let Err(e) = self.store.set(TOKEN_KEY, token) {
            warn!(error = %e, "failed to persist auth token");
        }
    }

    /// The stored token, or `None` when absent, empty or unreadable.
    pub fn get_token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Forget the session token. Storage failures are logged and dropped.
    pub fn clear_token(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(error = %e, "failed to clear auth token");
        }
    }

    /// The `authorization` header for the stored token, or nothing.
    pub fn auth_headers(&self) -> Vec<(String, String)> {
        match self.get_token() {
            Some(token) => vec![(AUTHORIZATION.to_string(), format!("Bearer {token}"))],
            None => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Build a request for `path` relative to the base URL.
    ///
    /// `content-type: application/json` is always set. The token is read once
    /// and attached only for `Auth::Bearer`.
    pub fn build_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        auth: Auth,
    ) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;

        let mut headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        if auth == Auth::Bearer {
            headers.extend(self.auth_headers());
        }

        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Parse
    // -----------------------------------------------------------------------

    /// Normalize a response into its JSON envelope.
    ///
    /// Empty or non-JSON bodies become `Value::Null` on either path. A non-2xx
    /// status yields `ApiError::RequestFailed`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        let parsed = parse_body(&response.body);

        if response.is_success() {
            debug!(status = response.status, "request succeeded");
            return Ok(parsed.unwrap_or(Value::Null));
        }

        let message = failure_message(parsed.as_ref(), &response.status_text);
        debug!(status = response.status, %message, "request failed");
        Err(ApiError::RequestFailed {
            status: response.status,
            message,
            payload: parsed,
        })
    }

    /// Decode a JSON envelope into `T`.
    pub fn decode<T: DeserializeOwned>(&self, value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

fn parse_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    serde_json::from_str(body).ok()
}

/// Server message, then status text, then the fixed fallback.
fn failure_message(payload: Option<&Value>, status_text: &str) -> String {
    payload
        .and_then(|p| p.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .or_else(|| Some(status_text).filter(|s| !s.is_empty()))
        .unwrap_or(FALLBACK_MESSAGE)
        .to_string()
}
