//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. JSON envelopes cross the boundary as
//! serialized C strings. Conversion functions live here to keep `lib.rs`
//! focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use propdesk_core::HttpMethod;
use serde_json::Value;

/// Opaque handle to an `ApiClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiClient {
    pub(crate) inner: propdesk_core::ApiClient,
}

/// Copy `s` into a heap C string. Interior NULs are dropped.
pub(crate) fn c_string(s: String) -> *mut c_char {
    let bytes: Vec<u8> = s.into_bytes().into_iter().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Patch = 3,
    Delete = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Patch => FfiHttpMethod::Patch,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Patch => HttpMethod::Patch,
            FfiHttpMethod::Delete => HttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `propdesk_build_request`. The C caller executes the request
/// and passes the response back through `propdesk_parse_response`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: propdesk_core::HttpRequest) -> *mut Self {
        let url = c_string(req.url);
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            // Boxed slice; `propdesk_free_request` rebuilds it from the
            // pointer and `headers_len`.
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request,
/// then passes a pointer to `propdesk_parse_response`. Null `status_text`
/// and `body` are read as empty. The FFI layer reads but does not free
/// these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub status_text: *const c_char,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    RequestFailed = 1,
    Panic = 2,
    NullArg = 3,
}

/// Result envelope for `propdesk_parse_response`.
///
/// On success `error_code` is `Ok` and `json` holds the response envelope
/// (`"null"` for empty or unparsable bodies). On `RequestFailed`,
/// `error_message` holds the normalized message, `http_status` the status
/// and `json` the parsed error body or `"null"`. `Panic` and `NullArg` set
/// only `error_code` and `error_message`.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub json: *mut c_char,
}

impl FfiResult {
    fn boxed(error_code: FfiErrorCode, message: Option<String>, http_status: u16, json: Option<&Value>) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: message.map(c_string).unwrap_or(std::ptr::null_mut()),
            http_status,
            json: json.map(|v| c_string(v.to_string())).unwrap_or(std::ptr::null_mut()),
        }))
    }

    /// Build a success result carrying a JSON envelope.
    pub(crate) fn ok(status: u16, value: &Value) -> *mut Self {
        Self::boxed(FfiErrorCode::Ok, None, status, Some(value))
    }

    /// Build an error result from a normalized non-2xx response.
    pub(crate) fn request_failed(status: u16, message: String, payload: Option<Value>) -> *mut Self {
        Self::boxed(
            FfiErrorCode::RequestFailed,
            Some(message),
            status,
            Some(payload.as_ref().unwrap_or(&Value::Null)),
        )
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::NullArg, Some(format!("null argument: {name}")), 0, None)
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, Some(msg.to_string()), 0, None)
    }
}
