//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations: owned
//! `*mut c_char` for strings (null when the value is absent), raw pointer plus
//! length for lists, and tagged enums with explicit discriminants. Conversion
//! functions live here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::ptr;

use feature_toggle_core::{ApiError, FeatureToggleItem, FeaturesStatistics, HttpMethod};

/// Opaque handle to a `FeatureToggleClient`. C callers receive a pointer to
/// this and pass it back into every FFI function.
pub struct FfiFeatureToggleClient {
    pub(crate) inner: feature_toggle_core::FeatureToggleClient,
}

/// Copy `s` into a heap C string owned by the caller.
///
/// Interior NUL bytes cannot be represented and are dropped.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let c = CString::new(s).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c.into_raw()
}

fn opt_c_string(s: Option<String>) -> *mut c_char {
    s.map_or(ptr::null_mut(), into_c_string)
}

/// Reclaim a string produced by `into_c_string`. Null is ignored.
pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Move a vector onto the heap as a raw pointer plus length. Empty vectors
/// become null.
fn into_raw_parts<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let data = Box::into_raw(items.into_boxed_slice()).cast::<T>();
    (data, len)
}

/// Rebuild a vector released by `into_raw_parts`.
///
/// # Safety
/// `data` and `len` must come from a single `into_raw_parts` call.
pub(crate) unsafe fn from_raw_parts<T>(data: *mut T, len: u32) -> Vec<T> {
    if data.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = ptr::slice_from_raw_parts_mut(data, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
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
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
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
/// Built by the `ft_build_*` functions. `path` is the absolute URL. The host
/// executes the request and hands the response to an `ft_parse_*` function.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    /// JSON body, or null for bodiless requests.
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: feature_toggle_core::HttpRequest) -> *mut Self {
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: into_c_string(k),
                value: into_c_string(v),
            })
            .collect();
        let (headers, headers_len) = into_raw_parts(headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path: into_c_string(req.path),
            headers,
            headers_len,
            body: opt_c_string(req.body),
        }))
    }

    /// Release everything `from_core` allocated.
    ///
    /// # Safety
    /// `req` must come from `from_core` and not have been freed.
    pub(crate) unsafe fn free(req: *mut Self) {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.path);
        free_c_string(req.body);
        for header in unsafe { from_raw_parts(req.headers, req.headers_len) } {
            free_c_string(header.key);
            free_c_string(header.value);
        }
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this after executing a request and passes a
/// pointer to an `ft_parse_*` function. The FFI layer reads but does not free
/// these fields. A null `body` is treated as an empty body.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiFeatureToggleResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    /// Non-2xx with an `error` message from the service.
    Server = 1,
    /// Non-2xx JSON body without an `error` field.
    UnknownServerError = 2,
    /// Non-2xx body that is missing or not JSON.
    MalformedErrorBody = 3,
    /// 2xx list response without a list.
    EmptyBody = 4,
    Deserialization = 5,
    Serialization = 6,
    Transport = 7,
    InvalidArgument = 8,
    Panic = 9,
    NullArg = 10,
}

/// Tag that tells `ft_free_result` what `FfiFeatureToggleResult::data`
/// points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a `FfiFeatureToggleList`.
    ToggleList = 1,
    /// `data` is a NUL-terminated C string.
    Message = 2,
    /// `data` is a `FfiFeaturesStatistics`.
    Statistics = 3,
}

/// A single feature toggle exposed to C. Absent fields are null.
#[repr(C)]
pub struct FfiFeatureToggle {
    pub id: *mut c_char,
    pub name: *mut c_char,
    pub description: *mut c_char,
    pub beginning_date: *mut c_char,
    pub expiration_date: *mut c_char,
    pub created_at: *mut c_char,
    pub updated_at: *mut c_char,
    pub package_name: *mut c_char,
}

impl FfiFeatureToggle {
    fn from_core(item: FeatureToggleItem) -> Self {
        FfiFeatureToggle {
            id: opt_c_string(item.id),
            name: opt_c_string(item.name),
            description: opt_c_string(item.description),
            beginning_date: opt_c_string(item.beginning_date),
            expiration_date: opt_c_string(item.expiration_date),
            created_at: opt_c_string(item.created_at),
            updated_at: opt_c_string(item.updated_at),
            package_name: opt_c_string(item.package_name),
        }
    }

    /// Free the C-string fields (but not the struct itself).
    pub(crate) fn free_fields(&self) {
        for field in [
            self.id,
            self.name,
            self.description,
            self.beginning_date,
            self.expiration_date,
            self.created_at,
            self.updated_at,
            self.package_name,
        ] {
            free_c_string(field);
        }
    }
}

/// A list of feature toggles exposed to C, in server order.
#[repr(C)]
pub struct FfiFeatureToggleList {
    pub items: *mut FfiFeatureToggle,
    pub len: u32,
}

/// Aggregate counts for one package.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FfiFeaturesStatistics {
    pub total_features: u64,
    pub active_features: u64,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the parsed payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, `http_status` carries the response status when
/// there was one, and `data` is null.
#[repr(C)]
pub struct FfiFeatureToggleResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiFeatureToggleResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiFeatureToggleResult {
            error_code: FfiErrorCode::Ok,
            error_message: ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn err(error_code: FfiErrorCode, http_status: u16, message: String) -> *mut Self {
        Box::into_raw(Box::new(FfiFeatureToggleResult {
            error_code,
            error_message: into_c_string(message),
            http_status,
            data_tag: FfiDataTag::None,
            data: ptr::null_mut(),
        }))
    }

    /// Build a success result carrying a `FfiFeatureToggleList`.
    pub(crate) fn ok_toggle_list(items: Vec<FeatureToggleItem>) -> *mut Self {
        let items: Vec<FfiFeatureToggle> =
            items.into_iter().map(FfiFeatureToggle::from_core).collect();
        let (items, len) = into_raw_parts(items);
        let list = Box::new(FfiFeatureToggleList { items, len });
        Self::ok(FfiDataTag::ToggleList, Box::into_raw(list).cast())
    }

    /// Build a success result carrying the server's message, or no data when
    /// the server sent none.
    pub(crate) fn ok_message(message: Option<String>) -> *mut Self {
        match message {
            Some(message) => Self::ok(FfiDataTag::Message, into_c_string(message).cast()),
            None => Self::ok(FfiDataTag::None, ptr::null_mut()),
        }
    }

    /// Build a success result carrying a `FfiFeaturesStatistics`.
    pub(crate) fn ok_statistics(stats: FeaturesStatistics) -> *mut Self {
        let stats = Box::new(FfiFeaturesStatistics {
            total_features: stats.total_features,
            active_features: stats.active_features,
        });
        Self::ok(FfiDataTag::Statistics, Box::into_raw(stats).cast())
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let error_code = match &err {
            ApiError::Server { .. } => FfiErrorCode::Server,
            ApiError::UnknownServerError { .. } => FfiErrorCode::UnknownServerError,
            ApiError::MalformedErrorBody { .. } => FfiErrorCode::MalformedErrorBody,
            ApiError::EmptyBody => FfiErrorCode::EmptyBody,
            ApiError::Deserialization { .. } => FfiErrorCode::Deserialization,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::InvalidBaseUrl(_) | ApiError::Runtime(_) => FfiErrorCode::InvalidArgument,
        };
        Self::err(error_code, err.status().unwrap_or(0), err.to_string())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::err(FfiErrorCode::Panic, 0, msg.to_string())
    }

    /// Release the envelope and whatever `data` points to.
    ///
    /// # Safety
    /// `result` must come from one of the constructors above and not have
    /// been freed.
    pub(crate) unsafe fn free(result: *mut Self) {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::ToggleList => {
                let list = unsafe { Box::from_raw(result.data.cast::<FfiFeatureToggleList>()) };
                for item in unsafe { from_raw_parts(list.items, list.len) } {
                    item.free_fields();
                }
            }
            FfiDataTag::Message => free_c_string(result.data.cast()),
            FfiDataTag::Statistics => {
                drop(unsafe { Box::from_raw(result.data.cast::<FfiFeaturesStatistics>()) });
            }
            FfiDataTag::None => {}
        }
    }
}
