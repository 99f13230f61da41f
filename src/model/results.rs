use std::collections::BTreeSet;
use std::sync::Arc;

use crate::descriptor::MethodDescriptor;
use crate::model::{HttpResponse, HttpVerb, ParameterBinding};

/// Per-class findings, filled in by the class analyzer and the bytecode
/// interpreter, then enriched with documentation. Read-only afterwards.
#[derive(Debug, Clone)]
pub struct ClassResult {
    /// Binary (dot-separated) name of the analyzed class.
    pub original_class: String,
    /// Class-level path fragment.
    pub path: Option<String>,
    /// Set when the class is the application root.
    pub application_path: Option<String>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    /// Field-level parameter bindings (instance fields only).
    pub fields: Vec<ParameterBinding>,
    pub methods: Vec<MethodResult>,
    pub doc: Option<String>,
}

impl ClassResult {
    pub fn new(original_class: impl Into<String>) -> Self {
        Self {
            original_class: original_class.into(),
            path: None,
            application_path: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            doc: None,
        }
    }
}

/// One REST-eligible method.
#[derive(Debug, Clone)]
pub struct MethodResult {
    pub name: Arc<str>,
    pub descriptor: MethodDescriptor,
    /// Generic signature, when the class file carries one.
    pub signature: Option<Arc<str>>,
    pub verbs: BTreeSet<HttpVerb>,
    pub path: Option<String>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    /// Parameter bindings in declaration order; at most one `Body`.
    pub parameters: Vec<ParameterBinding>,
    pub responses: BTreeSet<HttpResponse>,
    /// Project-local methods invoked from the body.
    pub invoked: BTreeSet<MethodIdentifier>,
    /// True when the REST annotations were found on a supertype member.
    pub annotations_inherited: bool,
    pub doc: Option<String>,
}

impl MethodResult {
    pub fn new(name: Arc<str>, descriptor: MethodDescriptor, signature: Option<Arc<str>>) -> Self {
        Self {
            name,
            descriptor,
            signature,
            verbs: BTreeSet::new(),
            path: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            parameters: Vec::new(),
            responses: BTreeSet::new(),
            invoked: BTreeSet::new(),
            annotations_inherited: false,
            doc: None,
        }
    }
}

/// Identifies a method for call-site resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodIdentifier {
    /// Binary name of the containing class.
    pub class_name: String,
    pub method_name: Arc<str>,
    /// Erased descriptor.
    pub descriptor: Arc<str>,
}
