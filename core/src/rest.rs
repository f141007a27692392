//! The client feature code calls: one method per HTTP verb.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::{ApiClient, Auth};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::transport::Transport;

/// `ApiClient` bound to a `Transport`.
///
/// Each call reads the token once, performs a single exchange and returns the
/// JSON envelope. No retries, caching or deduplication.
#[derive(Debug, Clone)]
pub struct RestClient<T> {
    api: ApiClient,
    transport: T,
}

impl<T: Transport> RestClient<T> {
    pub fn new(api: ApiClient, transport: T) -> Self {
        Self { api, transport }
    }

    /// Token lifecycle and the sans-IO halves.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        auth: Auth,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.api.build_request(method, path, body, auth)?;
        let response = self.transport.execute(request)?;
        self.api.parse_response(response)
    }

    pub fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request::<Value>(HttpMethod::Get, path, None, Auth::Bearer)
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.request(HttpMethod::Post, path, Some(body), Auth::Bearer)
    }

    pub fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.request(HttpMethod::Put, path, Some(body), Auth::Bearer)
    }

    pub fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.request(HttpMethod::Patch, path, Some(body), Auth::Bearer)
    }

    pub fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request::<Value>(HttpMethod::Delete, path, None, Auth::Bearer)
    }

    /// GET and decode the envelope into `R`.
    pub fn get_as<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let value = self.get(path)?;
        self.api.decode(value)
    }
}
