use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

/// The media type every entry falls back to when neither the method nor the
/// class declares one.
pub const WILDCARD_MEDIA_TYPE: &str = "*/*";

/// Status code emitted when a response status could not be determined.
pub const UNKNOWN_STATUS: u16 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Options,
    Head,
    Patch,
    /// A custom verb declared through an HTTP-method meta-annotation.
    Other(Arc<str>),
}

impl HttpVerb {
    pub fn as_str(&self) -> &str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Head => "HEAD",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Other(name) => name,
        }
    }

    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "GET" => HttpVerb::Get,
            "POST" => HttpVerb::Post,
            "PUT" => HttpVerb::Put,
            "DELETE" => HttpVerb::Delete,
            "OPTIONS" => HttpVerb::Options,
            "HEAD" => HttpVerb::Head,
            "PATCH" => HttpVerb::Patch,
            other => HttpVerb::Other(Arc::from(other)),
        }
    }
}

impl From<HttpVerb> for String {
    fn from(verb: HttpVerb) -> Self {
        verb.as_str().to_string()
    }
}

impl Ord for HttpVerb {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for HttpVerb {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Path,
    Query,
    Header,
    Cookie,
    Form,
    Matrix,
    Context,
    Body,
}

impl ParameterKind {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "path" => Some(ParameterKind::Path),
            "query" => Some(ParameterKind::Query),
            "header" => Some(ParameterKind::Header),
            "cookie" => Some(ParameterKind::Cookie),
            "form" => Some(ParameterKind::Form),
            "matrix" => Some(ParameterKind::Matrix),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ParameterBinding {
    pub kind: ParameterKind,
    /// Binding name; absent for `Context` and `Body`.
    pub name: Option<String>,
    /// Declared Java type, rendered (`java.lang.String`, `int`, `byte[]`).
    pub java_type: String,
    pub default_value: Option<String>,
}

/// One inferred response of a resource method.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HttpResponse {
    /// Status codes in [100, 599], or [`UNKNOWN_STATUS`] for undetermined.
    pub statuses: BTreeSet<u16>,
    pub headers: BTreeSet<String>,
    pub cookies: BTreeSet<String>,
    pub entity_type: Option<String>,
}

/// The assembled REST surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resources {
    pub application_path: String,
    /// Sorted by template, then verb.
    pub entries: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEntry {
    pub template: String,
    pub verb: HttpVerb,
    pub request_media_types: Vec<String>,
    pub response_media_types: Vec<String>,
    pub parameters: Vec<ParameterBinding>,
    pub request_body_type: Option<String>,
    pub responses: BTreeSet<HttpResponse>,
    pub doc: Option<String>,
}
