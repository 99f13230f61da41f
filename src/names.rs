//! Well-known framework type names. The framework moved from the `javax` to
//! the `jakarta` namespace; compiled artifacts carry either prefix, so every
//! match accepts both.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Strips the `javax/ws/rs/` or `jakarta/ws/rs/` prefix off an internal
/// (slash-separated) class name.
pub(crate) fn ws_rs_suffix(internal_name: &str) -> Option<&str> {
    internal_name
        .strip_prefix("javax/ws/rs/")
        .or_else(|| internal_name.strip_prefix("jakarta/ws/rs/"))
}

pub(crate) fn is_path(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("Path")
}

pub(crate) fn is_application_path(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("ApplicationPath")
}

pub(crate) fn is_consumes(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("Consumes")
}

pub(crate) fn is_produces(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("Produces")
}

pub(crate) fn is_http_method_meta(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("HttpMethod")
}

pub(crate) fn is_default_value(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("DefaultValue")
}

/// Built-in verb annotations. Custom verbs are resolved through their
/// `@HttpMethod` meta-annotation instead.
pub(crate) fn builtin_verb(internal_name: &str) -> Option<&'static str> {
    match ws_rs_suffix(internal_name)? {
        "GET" => Some("GET"),
        "POST" => Some("POST"),
        "PUT" => Some("PUT"),
        "DELETE" => Some("DELETE"),
        "OPTIONS" => Some("OPTIONS"),
        "HEAD" => Some("HEAD"),
        "PATCH" => Some("PATCH"),
        _ => None,
    }
}

/// Parameter-binding annotations, mapped to the binding kind name used by the
/// model layer. `Context` is handled separately because it carries no name.
pub(crate) fn binding_kind(internal_name: &str) -> Option<&'static str> {
    match ws_rs_suffix(internal_name)? {
        "PathParam" => Some("path"),
        "QueryParam" => Some("query"),
        "HeaderParam" => Some("header"),
        "CookieParam" => Some("cookie"),
        "FormParam" => Some("form"),
        "MatrixParam" => Some("matrix"),
        _ => None,
    }
}

pub(crate) fn is_context(internal_name: &str) -> bool {
    matches!(
        ws_rs_suffix(internal_name),
        Some("core/Context") | Some("container/Suspended")
    )
}

pub(crate) fn is_response(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("core/Response")
}

pub(crate) fn is_response_builder(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("core/Response$ResponseBuilder")
}

pub(crate) fn is_response_status(internal_name: &str) -> bool {
    matches!(
        ws_rs_suffix(internal_name),
        Some("core/Response$Status") | Some("core/Response$StatusType")
    )
}

pub(crate) fn is_new_cookie(internal_name: &str) -> bool {
    ws_rs_suffix(internal_name) == Some("core/NewCookie")
}

/// `Response$Status` enum constants, by field name.
static STATUS_CODES: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    HashMap::from([
        ("OK", 200),
        ("CREATED", 201),
        ("ACCEPTED", 202),
        ("NO_CONTENT", 204),
        ("RESET_CONTENT", 205),
        ("PARTIAL_CONTENT", 206),
        ("MOVED_PERMANENTLY", 301),
        ("FOUND", 302),
        ("SEE_OTHER", 303),
        ("NOT_MODIFIED", 304),
        ("USE_PROXY", 305),
        ("TEMPORARY_REDIRECT", 307),
        ("BAD_REQUEST", 400),
        ("UNAUTHORIZED", 401),
        ("PAYMENT_REQUIRED", 402),
        ("FORBIDDEN", 403),
        ("NOT_FOUND", 404),
        ("METHOD_NOT_ALLOWED", 405),
        ("NOT_ACCEPTABLE", 406),
        ("PROXY_AUTHENTICATION_REQUIRED", 407),
        ("REQUEST_TIMEOUT", 408),
        ("CONFLICT", 409),
        ("GONE", 410),
        ("LENGTH_REQUIRED", 411),
        ("PRECONDITION_FAILED", 412),
        ("REQUEST_ENTITY_TOO_LARGE", 413),
        ("REQUEST_URI_TOO_LONG", 414),
        ("UNSUPPORTED_MEDIA_TYPE", 415),
        ("REQUESTED_RANGE_NOT_SATISFIABLE", 416),
        ("EXPECTATION_FAILED", 417),
        ("INTERNAL_SERVER_ERROR", 500),
        ("NOT_IMPLEMENTED", 501),
        ("BAD_GATEWAY", 502),
        ("SERVICE_UNAVAILABLE", 503),
        ("GATEWAY_TIMEOUT", 504),
        ("HTTP_VERSION_NOT_SUPPORTED", 505),
    ])
});

pub(crate) fn status_code_of(const_name: &str) -> Option<u16> {
    STATUS_CODES.get(const_name).copied()
}

pub(crate) const OBJECT: &str = "java/lang/Object";

/// Converts an internal name (`a/b/C`) to a binary name (`a.b.C`).
pub(crate) fn to_binary_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Converts a binary name (`a.b.C`) to an internal name (`a/b/C`).
pub(crate) fn to_internal_name(binary: &str) -> String {
    binary.replace('.', "/")
}
