use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{
    analysis::{
        interpreter::Interpreter,
        registry::JobRegistry,
        supertypes::{self, SuperMember},
    },
    class::{Annotation, Class, MethodInfo},
    consts::MethodAccessFlag,
    descriptor::{parse_method_descriptor, MethodDescriptor},
    error::Result,
    model::{ClassResult, HttpVerb, MethodResult, ParameterBinding, ParameterKind},
    names,
    pool::ClassPool,
};

/// Visits one class file and fills a [`ClassResult`]: class-level
/// annotations, instance-field bindings, and one [`MethodResult`] per
/// REST-eligible method, descending into supertypes for bare overrides.
pub struct ClassAnalyzer<'p> {
    pool: &'p ClassPool,
    registry: &'p JobRegistry,
    /// Verdicts for custom verb annotations, keyed by internal type name.
    verb_cache: DashMap<String, Option<Arc<str>>>,
}

impl<'p> ClassAnalyzer<'p> {
    pub fn new(pool: &'p ClassPool, registry: &'p JobRegistry) -> Self {
        Self {
            pool,
            registry,
            verb_cache: DashMap::new(),
        }
    }

    pub fn analyze(&self, binary_name: &str, result: &mut ClassResult) -> Result<()> {
        let class = self.pool.read_class(binary_name)?;

        self.extract_class_annotations(&class, result);
        if result.path.is_none() && result.application_path.is_none() {
            self.inherit_class_annotations(&class, result);
        }
        self.extract_fields(&class, result);

        let interpreter = Interpreter::new(self.pool);
        for method in &class.methods {
            if method.access_flags.intersects(
                MethodAccessFlag::SYNTHETIC | MethodAccessFlag::STATIC | MethodAccessFlag::NATIVE,
            ) {
                continue;
            }
            let Some(name) = method.name(&class) else {
                continue;
            };
            if name.as_ref() == "<init>" || name.as_ref() == "<clinit>" {
                continue;
            }

            let Some(mut method_result) = self.method_result(&class, method, &name) else {
                continue;
            };

            let simulation = interpreter.simulate(&class, method);
            method_result.responses = simulation.responses;
            for target in &simulation.invoked {
                self.registry.enqueue(&target.class_name);
            }
            method_result.invoked = simulation.invoked;

            result.methods.push(method_result);
        }

        Ok(())
    }

    fn extract_class_annotations(&self, class: &Class, result: &mut ClassResult) {
        for annotation in class.class_annotations() {
            let Some(type_name) = annotation.internal_type_name() else {
                continue;
            };
            if names::is_path(type_name) {
                result.path = annotation.string_value("value").map(|s| s.to_string());
            } else if names::is_application_path(type_name) {
                result.application_path = annotation.string_value("value").map(|s| s.to_string());
            } else if names::is_consumes(type_name) {
                result.consumes = annotation
                    .string_values("value")
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
            } else if names::is_produces(type_name) {
                result.produces = annotation
                    .string_values("value")
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
            }
        }
    }

    /// A bare implementation serves the path its annotated supertype
    /// declares; adopt the first class-level declaration found in
    /// traversal order.
    fn inherit_class_annotations(&self, class: &Class, result: &mut ClassResult) {
        for (super_name, super_class) in supertypes::supertype_classes(self.pool, class) {
            let mut inherited = ClassResult::new(result.original_class.clone());
            self.extract_class_annotations(&super_class, &mut inherited);
            if inherited.path.is_some() {
                debug!(
                    class = %result.original_class,
                    declared_on = %super_name,
                    "inheriting class-level path from supertype"
                );
                result.path = inherited.path;
                if result.consumes.is_empty() {
                    result.consumes = inherited.consumes;
                }
                if result.produces.is_empty() {
                    result.produces = inherited.produces;
                }
                return;
            }
        }
    }

    fn extract_fields(&self, class: &Class, result: &mut ClassResult) {
        for field in &class.fields {
            if field
                .access_flags
                .contains(crate::consts::FieldAccessFlag::STATIC)
            {
                continue;
            }
            let Some(descriptor) = field.descriptor(class) else {
                continue;
            };
            let Ok((_, descriptor)) = crate::descriptor::parse_field_descriptor(&descriptor)
            else {
                continue;
            };
            let annotations = class.decode_annotations(&field.attributes);
            let field_name = field.name(class);
            if let Some(binding) =
                binding_from_annotations(&annotations, &descriptor.0.type_name(), field_name.as_deref())
            {
                result.fields.push(binding);
            }
        }
    }

    /// Builds the method result when the method is REST-eligible, either by
    /// its own annotations or by an annotated supertype declaration.
    fn method_result(
        &self,
        class: &Class,
        method: &MethodInfo,
        name: &Arc<str>,
    ) -> Option<MethodResult> {
        let raw_descriptor = method.descriptor(class)?;
        let descriptor = match parse_method_descriptor(&raw_descriptor) {
            Ok((_, descriptor)) => descriptor,
            Err(err) => {
                warn!(method = %name, "undecodable method descriptor, skipping: {err:?}");
                return None;
            }
        };
        let signature = class.decode_signature(&method.attributes);

        let own_annotations = class.decode_annotations(&method.attributes);
        let own_relevant = own_annotations.iter().any(|a| self.is_rest_relevant(a));

        let (annotations, parameter_annotations, inherited) = if own_relevant {
            (
                own_annotations,
                class.decode_parameter_annotations(&method.attributes),
                false,
            )
        } else {
            let SuperMember {
                class_name,
                annotations,
                parameter_annotations,
            } = supertypes::find_annotated_super_member(
                self.pool,
                class,
                name,
                &raw_descriptor,
                signature.as_deref(),
                |a| self.is_rest_relevant(a),
            )?;
            debug!(
                method = %name,
                declared_on = %class_name,
                "inheriting method annotations from supertype"
            );
            let own_parameters = class.decode_parameter_annotations(&method.attributes);
            let parameters = if own_parameters.iter().any(|a| !a.is_empty()) {
                own_parameters
            } else {
                parameter_annotations
            };
            (annotations, parameters, true)
        };

        let mut result = MethodResult::new(Arc::clone(name), descriptor.clone(), signature);
        result.annotations_inherited = inherited;

        for annotation in &annotations {
            let Some(type_name) = annotation.internal_type_name() else {
                continue;
            };
            if let Some(verb) = names::builtin_verb(type_name) {
                result.verbs.insert(HttpVerb::from_name(verb));
            } else if names::is_path(type_name) {
                result.path = annotation.string_value("value").map(|s| s.to_string());
            } else if names::is_consumes(type_name) {
                result.consumes = annotation
                    .string_values("value")
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
            } else if names::is_produces(type_name) {
                result.produces = annotation
                    .string_values("value")
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
            } else if let Some(verb) = self.custom_verb(type_name) {
                result.verbs.insert(HttpVerb::from_name(&verb));
            }
        }

        result.parameters = extract_parameters(&descriptor, &parameter_annotations);
        Some(result)
    }

    fn is_rest_relevant(&self, annotation: &Annotation) -> bool {
        let Some(type_name) = annotation.internal_type_name() else {
            return false;
        };
        names::is_path(type_name)
            || names::builtin_verb(type_name).is_some()
            || self.custom_verb(type_name).is_some()
    }

    /// Resolves an annotation that is itself meta-annotated as an HTTP
    /// method; the verdict is cached per annotation type.
    fn custom_verb(&self, internal_name: &str) -> Option<Arc<str>> {
        if let Some(cached) = self.verb_cache.get(internal_name) {
            return cached.clone();
        }
        let verdict = self
            .pool
            .read_class(&names::to_binary_name(internal_name))
            .ok()
            .and_then(|annotation_class| {
                annotation_class.class_annotations().iter().find_map(|meta| {
                    meta.internal_type_name()
                        .filter(|n| names::is_http_method_meta(n))?;
                    meta.string_value("value")
                })
            });
        self.verb_cache
            .insert(internal_name.to_string(), verdict.clone());
        verdict
    }
}

/// Per-parameter bindings in declaration order. Parameters without a binding
/// annotation default to the request body, at most once; further bare
/// parameters are dropped, matching the framework.
fn extract_parameters(
    descriptor: &MethodDescriptor,
    parameter_annotations: &[Vec<Annotation>],
) -> Vec<ParameterBinding> {
    let mut bindings = Vec::new();
    let mut body_taken = false;
    static EMPTY: Vec<Annotation> = Vec::new();

    for (index, parameter_type) in descriptor.parameters.iter().enumerate() {
        let annotations = parameter_annotations.get(index).unwrap_or(&EMPTY);
        let java_type = parameter_type.type_name();

        if let Some(binding) = binding_from_annotations(annotations, &java_type, None) {
            bindings.push(binding);
            continue;
        }

        if body_taken {
            debug!(index, "second unbound parameter, dropping");
            continue;
        }
        body_taken = true;
        bindings.push(ParameterBinding {
            kind: ParameterKind::Body,
            name: None,
            java_type,
            default_value: default_value_of(annotations),
        });
    }
    bindings
}

fn binding_from_annotations(
    annotations: &[Annotation],
    java_type: &str,
    fallback_name: Option<&str>,
) -> Option<ParameterBinding> {
    let mut kind = None;
    let mut name = None;
    for annotation in annotations {
        let Some(type_name) = annotation.internal_type_name() else {
            continue;
        };
        if let Some(k) = names::binding_kind(type_name).and_then(ParameterKind::from_name) {
            kind = Some(k);
            name = annotation.string_value("value").map(|s| s.to_string());
        } else if names::is_context(type_name) && kind.is_none() {
            kind = Some(ParameterKind::Context);
        }
    }
    Some(ParameterBinding {
        kind: kind?,
        name: name.or_else(|| fallback_name.map(String::from)),
        java_type: java_type.to_string(),
        default_value: default_value_of(annotations),
    })
}

fn default_value_of(annotations: &[Annotation]) -> Option<String> {
    annotations.iter().find_map(|annotation| {
        annotation
            .internal_type_name()
            .filter(|n| names::is_default_value(n))?;
        annotation.string_value("value").map(|s| s.to_string())
    })
}
