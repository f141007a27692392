//! C-ABI wrapper around `propdesk-core`.
//!
//! # Overview
//! Exposes the sans-IO half of the API client through `extern "C"`
//! functions so a host shell written in any language can build authenticated
//! JSON requests and normalize responses while doing its own HTTP I/O.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Each client handle owns an in-memory token store; the host persists
//!   the token wherever it likes and hands it over with
//!   `propdesk_save_token`.
//! - JSON travels as C strings in both directions.
//! - The C caller owns all returned pointers and must call the matching
//!   `propdesk_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use propdesk_core::{ApiClient, ApiError, Auth, HttpResponse};
use serde_json::Value;

use types::*;

/// Borrow a C string as `&str`. Null and invalid UTF-8 both read as `None`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// returned slice.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_str().ok()
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `propdesk_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_client_new(base_url: *const c_char) -> *mut FfiClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { str_arg(base_url) }) else {
            return std::ptr::null_mut();
        };
        Box::into_raw(Box::new(FfiClient {
            inner: ApiClient::new(url),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `propdesk_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_client_free(client: *mut FfiClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Token lifecycle
// ---------------------------------------------------------------------------

/// Store the session token on `client`. No-op if either argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_save_token(client: *const FfiClient, token: *const c_char) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return;
        }
        if let Some(token) = unsafe { str_arg(token) } {
            unsafe { &*client }.inner.save_token(token);
        }
    }));
}

/// The stored token as a new C string, or null when none is stored.
/// Free with `propdesk_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_get_token(client: *const FfiClient) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        match unsafe { &*client }.inner.get_token() {
            Some(token) => c_string(token),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Forget the stored token. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_clear_token(client: *const FfiClient) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        if !client.is_null() {
            unsafe { &*client }.inner.clear_token();
        }
    }));
}

// ---------------------------------------------------------------------------
// Build / parse
// ---------------------------------------------------------------------------

/// Build a request for `path` relative to the client's base URL.
///
/// `body_json` may be null (no body); otherwise it must hold valid JSON.
/// When `authenticated` is true and a token is stored, the bearer header is
/// attached. Returns null if `client` or `path` is null or `body_json` is
/// not valid JSON, or if `path` is not UTF-8. Free with `propdesk_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_build_request(
    client: *const FfiClient,
    method: FfiHttpMethod,
    path: *const c_char,
    body_json: *const c_char,
    authenticated: bool,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(path) = (unsafe { str_arg(path) }) else {
            return std::ptr::null_mut();
        };
        let body: Option<Value> = match unsafe { str_arg(body_json) } {
            None => None,
            Some(raw) => match serde_json::from_str(raw) {
                Ok(v) => Some(v),
                Err(_) => return std::ptr::null_mut(),
            },
        };
        let auth = if authenticated { Auth::Bearer } else { Auth::Anonymous };
        let client = unsafe { &*client };
        match client.inner.build_request(method.into(), path, body.as_ref(), auth) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Convert an `FfiHttpResponse` to a core `HttpResponse`.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let read = |ptr| unsafe { str_arg(ptr) }.unwrap_or("").to_string();
    HttpResponse {
        status: resp.status,
        status_text: read(resp.status_text),
        headers: Vec::new(),
        body: read(resp.body),
    }
}

/// Normalize a response the host received for a request built above.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_parse_response(
    client: *const FfiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let core_resp = ffi_response_to_core(unsafe { &*response });
        let status = core_resp.status;
        match client.inner.parse_response(core_resp) {
            Ok(value) => FfiResult::ok(status, &value),
            Err(ApiError::RequestFailed { status, message, payload }) => {
                FfiResult::request_failed(status, message, payload)
            }
            Err(e) => FfiResult::panic(&format!("unexpected parse error: {e}")),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in propdesk_parse_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `propdesk_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(req.headers, req.headers_len as usize);
            let headers = unsafe { Box::from_raw(slice) };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiResult` returned by `propdesk_parse_response`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.json);
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn propdesk_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_client() -> *mut FfiClient {
        let url = CString::new("http://localhost:3000/api").unwrap();
        let client = propdesk_client_new(url.as_ptr());
        assert!(!client.is_null());
        client
    }

    fn headers_of(req: &FfiHttpRequest) -> Vec<(String, String)> {
        if req.headers.is_null() {
            return Vec::new();
        }
        let raw = unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) };
        raw.iter()
            .map(|h| {
                let k = unsafe { CStr::from_ptr(h.key) }.to_str().unwrap().to_string();
                let v = unsafe { CStr::from_ptr(h.value) }.to_str().unwrap().to_string();
                (k, v)
            })
            .collect()
    }

    fn parse(client: *const FfiClient, status: u16, status_text: &str, body: &str) -> *mut FfiResult {
        let status_text = CString::new(status_text).unwrap();
        let body = CString::new(body).unwrap();
        let resp = FfiHttpResponse {
            status,
            status_text: status_text.as_ptr(),
            body: body.as_ptr(),
        };
        propdesk_parse_response(client, &resp)
    }

    fn json_of(result: &FfiResult) -> Value {
        let raw = unsafe { CStr::from_ptr(result.json) }.to_str().unwrap();
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn client_new_and_free() {
        let client = new_client();
        propdesk_client_free(client);
    }

    #[test]
    fn client_new_null_returns_null() {
        assert!(propdesk_client_new(std::ptr::null()).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        propdesk_client_free(std::ptr::null_mut());
    }

    #[test]
    fn token_roundtrip() {
        let client = new_client();
        assert!(propdesk_get_token(client).is_null());

        let token = CString::new("abc123").unwrap();
        propdesk_save_token(client, token.as_ptr());
        let got = propdesk_get_token(client);
        assert_eq!(unsafe { CStr::from_ptr(got) }.to_str().unwrap(), "abc123");
        propdesk_free_string(got);

        propdesk_clear_token(client);
        assert!(propdesk_get_token(client).is_null());
        propdesk_client_free(client);
    }

    #[test]
    fn build_get_without_token() {
        let client = new_client();
        let path = CString::new("/public/info.json").unwrap();
        let req = propdesk_build_request(client, FfiHttpMethod::Get, path.as_ptr(), std::ptr::null(), true);
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.method, FfiHttpMethod::Get);
        let url = unsafe { CStr::from_ptr(req_ref.url) }.to_str().unwrap();
        assert_eq!(url, "http://localhost:3000/api/public/info.json");
        assert!(req_ref.body.is_null());
        assert_eq!(
            headers_of(req_ref),
            vec![("content-type".to_string(), "application/json".to_string())]
        );

        propdesk_free_request(req);
        propdesk_client_free(client);
    }

    #[test]
    fn build_post_with_token_and_body() {
        let client = new_client();
        let token = CString::new("abc123").unwrap();
        propdesk_save_token(client, token.as_ptr());

        let path = CString::new("/properties").unwrap();
        let body = CString::new(r#"{"name":"Sunset Villa"}"#).unwrap();
        let req = propdesk_build_request(client, FfiHttpMethod::Post, path.as_ptr(), body.as_ptr(), true);
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.method, FfiHttpMethod::Post);
        assert_eq!(req_ref.headers_len, 2);
        assert!(headers_of(req_ref).contains(&("authorization".to_string(), "Bearer abc123".to_string())));
        let body_str = unsafe { CStr::from_ptr(req_ref.body) }.to_str().unwrap();
        let body: Value = serde_json::from_str(body_str).unwrap();
        assert_eq!(body, json!({"name": "Sunset Villa"}));

        propdesk_free_request(req);
        propdesk_client_free(client);
    }

    #[test]
    fn build_anonymous_skips_token() {
        let client = new_client();
        let token = CString::new("abc123").unwrap();
        propdesk_save_token(client, token.as_ptr());

        let path = CString::new("/public/info.json").unwrap();
        let req = propdesk_build_request(client, FfiHttpMethod::Get, path.as_ptr(), std::ptr::null(), false);
        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.headers_len, 1);

        propdesk_free_request(req);
        propdesk_client_free(client);
    }

    #[test]
    fn build_with_invalid_body_json_returns_null() {
        let client = new_client();
        let path = CString::new("/properties").unwrap();
        let body = CString::new("{not json").unwrap();
        let req = propdesk_build_request(client, FfiHttpMethod::Put, path.as_ptr(), body.as_ptr(), true);
        assert!(req.is_null());
        propdesk_client_free(client);
    }

    #[test]
    fn build_with_null_args_returns_null() {
        let path = CString::new("/x").unwrap();
        let req = propdesk_build_request(std::ptr::null(), FfiHttpMethod::Get, path.as_ptr(), std::ptr::null(), true);
        assert!(req.is_null());

        let client = new_client();
        let req = propdesk_build_request(client, FfiHttpMethod::Get, std::ptr::null(), std::ptr::null(), true);
        assert!(req.is_null());
        propdesk_client_free(client);
    }

    #[test]
    fn non_utf8_string_args_are_rejected() {
        let bad = CString::new(vec![0xff, 0xfe]).unwrap();
        assert!(propdesk_client_new(bad.as_ptr()).is_null());

        let client = new_client();
        let req = propdesk_build_request(client, FfiHttpMethod::Get, bad.as_ptr(), std::ptr::null(), true);
        assert!(req.is_null());

        propdesk_save_token(client, bad.as_ptr());
        assert!(propdesk_get_token(client).is_null());
        propdesk_client_free(client);
    }

    #[test]
    fn error_codes_have_stable_discriminants() {
        assert_eq!(FfiErrorCode::Ok as i32, 0);
        assert_eq!(FfiErrorCode::RequestFailed as i32, 1);
        assert_eq!(FfiErrorCode::Panic as i32, 2);
        assert_eq!(FfiErrorCode::NullArg as i32, 3);
    }

    #[test]
    fn parse_success_returns_json() {
        let client = new_client();
        let result = parse(client, 200, "OK", r#"{"id":1,"name":"Acme"}"#);
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Ok);
        assert!(result_ref.error_message.is_null());
        assert_eq!(result_ref.http_status, 200);
        assert_eq!(json_of(result_ref), json!({"id": 1, "name": "Acme"}));

        propdesk_free_result(result);
        propdesk_client_free(client);
    }

    #[test]
    fn parse_success_with_bad_body_is_null() {
        let client = new_client();
        let result = parse(client, 200, "OK", "<html>");
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Ok);
        assert_eq!(json_of(result_ref), Value::Null);

        propdesk_free_result(result);
        propdesk_client_free(client);
    }

    #[test]
    fn parse_failure_carries_message_status_and_payload() {
        let client = new_client();
        let result = parse(client, 422, "Unprocessable Entity", r#"{"message":"Name required"}"#);
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::RequestFailed);
        assert_eq!(result_ref.http_status, 422);
        let msg = unsafe { CStr::from_ptr(result_ref.error_message) }.to_str().unwrap();
        assert_eq!(msg, "Name required");
        assert_eq!(json_of(result_ref), json!({"message": "Name required"}));

        propdesk_free_result(result);
        propdesk_client_free(client);
    }

    #[test]
    fn parse_failure_with_null_fields_uses_fallback() {
        let client = new_client();
        let resp = FfiHttpResponse {
            status: 500,
            status_text: std::ptr::null(),
            body: std::ptr::null(),
        };
        let result = propdesk_parse_response(client, &resp);
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::RequestFailed);
        let msg = unsafe { CStr::from_ptr(result_ref.error_message) }.to_str().unwrap();
        assert_eq!(msg, "Request failed");
        assert_eq!(json_of(result_ref), Value::Null);

        propdesk_free_result(result);
        propdesk_client_free(client);
    }

    #[test]
    fn parse_null_args_report_null_arg() {
        let result = propdesk_parse_response(std::ptr::null(), std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        propdesk_free_result(result);

        let client = new_client();
        let result = propdesk_parse_response(client, std::ptr::null());
        let msg = unsafe { CStr::from_ptr((*result).error_message) }.to_str().unwrap();
        assert_eq!(msg, "null argument: response");
        propdesk_free_result(result);
        propdesk_client_free(client);
    }

    #[test]
    fn free_functions_accept_null() {
        propdesk_free_request(std::ptr::null_mut());
        propdesk_free_result(std::ptr::null_mut());
        propdesk_free_string(std::ptr::null_mut());
        propdesk_save_token(std::ptr::null(), std::ptr::null());
        propdesk_clear_token(std::ptr::null());
    }
}
