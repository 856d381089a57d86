//! C-ABI wrapper around `feature-toggle-core`.
//!
//! # Overview
//! Exposes every feature toggle operation through `extern "C"` functions so
//! mobile hosts (JNI or Swift glue) can build requests and parse responses
//! while doing the HTTP themselves, without linking a Rust async runtime.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - One `ft_build_*` per operation. Responses come in three shapes, so there
//!   are three parsers: `ft_parse_toggle_list`, `ft_parse_message` and
//!   `ft_parse_statistics`.
//! - A single `FfiFeatureToggleResult` envelope with `FfiDataTag` + `void*
//!   data` conveys success payloads and errors uniformly.
//! - String arguments are borrowed for the duration of the call. The C caller
//!   owns all returned pointers and must call the matching `ft_free_*`
//!   function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, UnwindSafe};
use std::ptr;

use feature_toggle_core::{FeatureToggleClient, FeatureToggleItem, HttpRequest, HttpResponse};

use types::*;

/// Borrow a C string argument. Null or non-UTF-8 input yields `None`.
unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

/// Like `str_arg`, for optional fields: null and non-UTF-8 both mean absent.
unsafe fn opt_arg(s: *const c_char) -> Option<String> {
    unsafe { str_arg(s) }.map(str::to_string)
}

unsafe fn client_ref<'a>(client: *const FfiFeatureToggleClient) -> Option<&'a FeatureToggleClient> {
    if client.is_null() {
        return None;
    }
    Some(unsafe { &(*client).inner })
}

/// Run a request builder behind `catch_unwind`; `None` or a panic is null.
fn build(f: impl FnOnce() -> Option<HttpRequest> + UnwindSafe) -> *mut FfiHttpRequest {
    catch_unwind(|| f().map_or(ptr::null_mut(), FfiHttpRequest::from_core))
        .unwrap_or(ptr::null_mut())
}

/// Convert an `FfiHttpResponse` to a core `HttpResponse`.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }
            .to_string_lossy()
            .into_owned()
    };
    HttpResponse::new(resp.status, body)
}

/// Shared null checks and panic guard for the `ft_parse_*` functions.
fn parse(
    name: &'static str,
    client: *const FfiFeatureToggleClient,
    response: *const FfiHttpResponse,
    f: impl FnOnce(&FeatureToggleClient, HttpResponse) -> *mut FfiFeatureToggleResult + UnwindSafe,
) -> *mut FfiFeatureToggleResult {
    catch_unwind(move || {
        let Some(client) = (unsafe { client_ref(client) }) else {
            return FfiFeatureToggleResult::null_arg("client");
        };
        if response.is_null() {
            return FfiFeatureToggleResult::null_arg("response");
        }
        let resp = ffi_response_to_core(unsafe { &*response });
        f(client, resp)
    })
    .unwrap_or_else(|_| FfiFeatureToggleResult::panic(&format!("panic in {name}")))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client bound to `base_url`.
///
/// Returns null if `base_url` is null, is not an absolute URL, or if an
/// internal panic occurs. The caller must free the returned pointer with
/// `ft_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn ft_client_new(base_url: *const c_char) -> *mut FfiFeatureToggleClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { str_arg(base_url) }) else {
            return ptr::null_mut();
        };
        match FeatureToggleClient::new(url) {
            Ok(inner) => Box::into_raw(Box::new(FfiFeatureToggleClient { inner })),
            Err(_) => ptr::null_mut(),
        }
    })
    .unwrap_or(ptr::null_mut())
}

/// Free a client created by `ft_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ft_client_free(client: *mut FfiFeatureToggleClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
//
// All return null when `client` or a required string is null or not UTF-8.
// The caller must free a non-null result with `ft_free_request`.
// ---------------------------------------------------------------------------

/// Build a create request. The toggle is filed under `package_name`.
///
/// `name`, `description`, `beginning_date` and `expiration_date` may be null;
/// null fields are left out of the body and the service reports them.
#[unsafe(no_mangle)]
pub extern "C" fn ft_build_create_feature_toggle(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
    name: *const c_char,
    description: *const c_char,
    beginning_date: *const c_char,
    expiration_date: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        let package_name = unsafe { str_arg(package_name) }?;
        let item = FeatureToggleItem {
            name: unsafe { opt_arg(name) },
            description: unsafe { opt_arg(description) },
            beginning_date: unsafe { opt_arg(beginning_date) },
            expiration_date: unsafe { opt_arg(expiration_date) },
            package_name: Some(package_name.to_string()),
            ..FeatureToggleItem::default()
        };
        client.build_create_feature_toggle(&item).ok()
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_get_all_feature_toggles(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        Some(client.build_get_all_feature_toggles(unsafe { str_arg(package_name) }?))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_get_active_feature_toggles(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        Some(client.build_get_active_feature_toggles(unsafe { str_arg(package_name) }?))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_delete_feature_toggle(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
    feature_id: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        let package_name = unsafe { str_arg(package_name) }?;
        let feature_id = unsafe { str_arg(feature_id) }?;
        Some(client.build_delete_feature_toggle(package_name, feature_id))
    })
}

/// Build an update-dates request. Either date may be null to leave it as is.
#[unsafe(no_mangle)]
pub extern "C" fn ft_build_update_feature_dates(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
    feature_id: *const c_char,
    beginning_date: *const c_char,
    expiration_date: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        let package_name = unsafe { str_arg(package_name) }?;
        let feature_id = unsafe { str_arg(feature_id) }?;
        let dates = FeatureToggleItem {
            beginning_date: unsafe { opt_arg(beginning_date) },
            expiration_date: unsafe { opt_arg(expiration_date) },
            ..FeatureToggleItem::default()
        };
        client
            .build_update_feature_dates(package_name, feature_id, &dates)
            .ok()
    })
}

/// Build an update-info request. `name` or `description` may be null to
/// leave it as is.
#[unsafe(no_mangle)]
pub extern "C" fn ft_build_update_feature_info(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
    feature_id: *const c_char,
    name: *const c_char,
    description: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        let package_name = unsafe { str_arg(package_name) }?;
        let feature_id = unsafe { str_arg(feature_id) }?;
        let info = FeatureToggleItem {
            name: unsafe { opt_arg(name) },
            description: unsafe { opt_arg(description) },
            ..FeatureToggleItem::default()
        };
        client
            .build_update_feature_info(package_name, feature_id, &info)
            .ok()
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_get_recent_feature_toggles(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        Some(client.build_get_recent_feature_toggles(unsafe { str_arg(package_name) }?))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_get_active_features_in_range(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
    start_date: *const c_char,
    end_date: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        let package_name = unsafe { str_arg(package_name) }?;
        let start_date = unsafe { str_arg(start_date) }?;
        let end_date = unsafe { str_arg(end_date) }?;
        Some(client.build_get_active_features_in_range(package_name, start_date, end_date))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_get_feature_toggle_statistics(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        Some(client.build_get_feature_toggle_statistics(unsafe { str_arg(package_name) }?))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_get_feature_toggles_by_date(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
    date: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        let package_name = unsafe { str_arg(package_name) }?;
        let date = unsafe { str_arg(date) }?;
        Some(client.build_get_feature_toggles_by_date(package_name, date))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn ft_build_delete_all_feature_toggles(
    client: *const FfiFeatureToggleClient,
    package_name: *const c_char,
) -> *mut FfiHttpRequest {
    build(move || {
        let client = unsafe { client_ref(client) }?;
        Some(client.build_delete_all_feature_toggles(unsafe { str_arg(package_name) }?))
    })
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Parse the response of any list operation (all, active, recent, in range,
/// by date).
///
/// Returns a result with `data_tag = ToggleList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn ft_parse_toggle_list(
    client: *const FfiFeatureToggleClient,
    response: *const FfiHttpResponse,
) -> *mut FfiFeatureToggleResult {
    parse("ft_parse_toggle_list", client, response, |client, resp| {
        match client.parse_toggle_list(resp) {
            Ok(items) => FfiFeatureToggleResult::ok_toggle_list(items),
            Err(e) => FfiFeatureToggleResult::from_error(e),
        }
    })
}

/// Parse the response of create, delete, the two updates, or delete-all.
///
/// Returns `data_tag = Message` when the server sent a message, or
/// `data_tag = None` for a bare confirmation.
#[unsafe(no_mangle)]
pub extern "C" fn ft_parse_message(
    client: *const FfiFeatureToggleClient,
    response: *const FfiHttpResponse,
) -> *mut FfiFeatureToggleResult {
    parse("ft_parse_message", client, response, |client, resp| {
        match client.parse_message(resp) {
            Ok(message) => FfiFeatureToggleResult::ok_message(message),
            Err(e) => FfiFeatureToggleResult::from_error(e),
        }
    })
}

/// Parse the response of the statistics operation.
///
/// Returns a result with `data_tag = Statistics` on success.
#[unsafe(no_mangle)]
pub extern "C" fn ft_parse_statistics(
    client: *const FfiFeatureToggleClient,
    response: *const FfiHttpResponse,
) -> *mut FfiFeatureToggleResult {
    parse("ft_parse_statistics", client, response, |client, resp| {
        match client.parse_statistics(resp) {
            Ok(stats) => FfiFeatureToggleResult::ok_statistics(stats),
            Err(e) => FfiFeatureToggleResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `ft_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ft_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| unsafe { FfiHttpRequest::free(req) });
}

/// Free an `FfiFeatureToggleResult` returned by any `ft_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn ft_free_result(result: *mut FfiFeatureToggleResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| unsafe { FfiFeatureToggleResult::free(result) });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ft_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
