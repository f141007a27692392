//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the I/O seam between the sans-IO `ApiClient` and the
//! outside world. `UreqTransport` is the blocking implementation used by
//! native callers; tests and embedders can supply their own.

use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange. Non-2xx statuses are returned as data.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport over a shared `ureq` agent.
///
/// The agent has status-as-error disabled so 4xx/5xx responses come back as
/// `HttpResponse` values for the client to normalize.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&url), &headers).call(),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(&url), &headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers(self.agent.delete(&url), &headers)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), &headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(&url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(&url), &headers).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                with_headers(self.agent.patch(&url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Patch, None) => with_headers(self.agent.patch(&url), &headers).send_empty(),
        };
        let mut response = result.map_err(TransportError::new)?;

        let status = response.status();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // No size cap. A non-UTF-8 body keeps its status and reads as empty.
        let bytes = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(TransportError::new)?;
        let body = String::from_utf8(bytes).unwrap_or_default();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: response_headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
