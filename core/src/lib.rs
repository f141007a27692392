//! Authenticated JSON REST client for the PropDesk dashboard API.
//!
//! # Overview
//! Every dashboard screen talks to the server through this crate: it builds
//! JSON requests against a configured base URL, attaches the stored bearer
//! token, and normalizes responses into a `serde_json::Value` or an
//! `ApiError`.
//!
//! # Design
//! - `ApiClient` is sans-IO: `build_request` produces an `HttpRequest`,
//!   `parse_response` consumes an `HttpResponse`.
//! - `RestClient` joins those halves around a `Transport`; `UreqTransport`
//!   is the blocking network implementation.
//! - The session token lives behind the `TokenStore` trait and is injected,
//!   never global. Storage failures are logged and swallowed.
//! - Payloads are opaque JSON; callers decode them with `decode`/`get_as`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod rest;
pub mod token;
pub mod transport;

pub use client::{ApiClient, Auth};
pub use config::ClientConfig;
pub use error::{ApiError, StorageError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use rest::RestClient;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use transport::{Transport, UreqTransport};
