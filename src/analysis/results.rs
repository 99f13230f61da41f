use std::collections::BTreeMap;

use tracing::warn;

use crate::model::{
    ClassResult, HttpVerb, ParameterKind, ResourceEntry, Resources, WILDCARD_MEDIA_TYPE,
};

/// Folds all class results into the final [`Resources`] tree: application
/// path, canonical template concatenation, one entry per verb, media-type
/// defaults, and `(template, verb)` dedup with union-merge.
pub struct ResultInterpreter;

impl ResultInterpreter {
    pub fn interpret(class_results: &[ClassResult]) -> Resources {
        let application_path = class_results
            .iter()
            .filter_map(|class| class.application_path.as_deref())
            .next()
            .map(|path| join_template(&[Some(path)]))
            .unwrap_or_else(|| "/".to_string());

        let mut merged: BTreeMap<(String, HttpVerb), ResourceEntry> = BTreeMap::new();

        for class in class_results {
            let eligible =
                class.path.is_some() || class.methods.iter().any(|m| !m.verbs.is_empty());
            if !eligible {
                continue;
            }

            for method in &class.methods {
                for verb in &method.verbs {
                    let template = join_template(&[
                        Some(application_path.as_str()),
                        class.path.as_deref(),
                        method.path.as_deref(),
                    ]);

                    let request_media_types = if method.consumes.is_empty() {
                        class.consumes.clone()
                    } else {
                        method.consumes.clone()
                    };
                    let response_media_types = if method.produces.is_empty() {
                        class.produces.clone()
                    } else {
                        method.produces.clone()
                    };

                    let mut parameters = class.fields.clone();
                    let mut request_body_type = None;
                    for binding in &method.parameters {
                        if binding.kind == ParameterKind::Body {
                            request_body_type = Some(binding.java_type.clone());
                        } else if !parameters.contains(binding) {
                            parameters.push(binding.clone());
                        }
                    }

                    let entry = ResourceEntry {
                        template: template.clone(),
                        verb: verb.clone(),
                        request_media_types,
                        response_media_types,
                        parameters,
                        request_body_type,
                        responses: method.responses.clone(),
                        doc: method.doc.clone(),
                    };

                    match merged.entry((template, verb.clone())) {
                        std::collections::btree_map::Entry::Vacant(slot) => {
                            slot.insert(entry);
                        }
                        std::collections::btree_map::Entry::Occupied(mut slot) => {
                            merge_entries(slot.get_mut(), entry);
                        }
                    }
                }
            }
        }

        let entries = merged
            .into_values()
            .map(|mut entry| {
                if entry.request_media_types.is_empty() {
                    entry.request_media_types = vec![WILDCARD_MEDIA_TYPE.to_string()];
                }
                if entry.response_media_types.is_empty() {
                    entry.response_media_types = vec![WILDCARD_MEDIA_TYPE.to_string()];
                }
                entry
            })
            .collect();

        Resources {
            application_path,
            entries,
        }
    }
}

/// Later results union-merge into the earlier entry for the same
/// `(template, verb)` pair.
fn merge_entries(existing: &mut ResourceEntry, incoming: ResourceEntry) {
    existing.responses.extend(incoming.responses);
    for binding in incoming.parameters {
        if !existing.parameters.contains(&binding) {
            existing.parameters.push(binding);
        }
    }
    for media in incoming.request_media_types {
        if !existing.request_media_types.contains(&media) {
            existing.request_media_types.push(media);
        }
    }
    for media in incoming.response_media_types {
        if !existing.response_media_types.contains(&media) {
            existing.response_media_types.push(media);
        }
    }
    match (&existing.request_body_type, incoming.request_body_type) {
        (Some(kept), Some(other)) if kept != &other => {
            warn!(
                template = %existing.template,
                verb = %existing.verb,
                kept = %kept,
                dropped = %other,
                "conflicting request body types for one resource method"
            );
        }
        (None, Some(other)) => existing.request_body_type = Some(other),
        _ => {}
    }
    if existing.doc.is_none() {
        existing.doc = incoming.doc;
    }
}

/// Canonical concatenation: every segment contributes its non-empty parts,
/// each part joined with exactly one `/`, no trailing slash unless the whole
/// template is `/`.
fn join_template(fragments: &[Option<&str>]) -> String {
    let mut template = String::new();
    for fragment in fragments.iter().flatten() {
        for part in fragment.split('/').filter(|part| !part.is_empty()) {
            template.push('/');
            template.push_str(part);
        }
    }
    if template.is_empty() {
        template.push('/');
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse_method_descriptor;
    use crate::model::{HttpResponse, MethodResult, ParameterBinding};
    use std::sync::Arc;

    fn method(name: &str, descriptor: &str) -> MethodResult {
        let (_, descriptor) = parse_method_descriptor(descriptor).unwrap();
        MethodResult::new(Arc::from(name), descriptor, None)
    }

    #[test]
    fn composes_application_class_and_method_paths() {
        let mut application = ClassResult::new("com.acme.App");
        application.application_path = Some("/api/".to_string());

        let mut class = ClassResult::new("com.acme.Users");
        class.path = Some("v1/users/".to_string());
        let mut m = method("byId", "(Ljava/lang/String;)Ljava/lang/String;");
        m.verbs.insert(HttpVerb::Get);
        m.path = Some("/{id}".to_string());
        class.methods.push(m);

        let resources = ResultInterpreter::interpret(&[application, class]);
        assert_eq!(resources.application_path, "/api");
        assert_eq!(resources.entries.len(), 1);
        assert_eq!(resources.entries[0].template, "/api/v1/users/{id}");
    }

    #[test]
    fn emits_one_entry_per_verb() {
        let mut class = ClassResult::new("com.acme.Users");
        class.path = Some("/users".to_string());
        let mut m = method("handle", "()V");
        m.verbs.insert(HttpVerb::Get);
        m.verbs.insert(HttpVerb::Post);
        class.methods.push(m);

        let resources = ResultInterpreter::interpret(&[class]);
        let verbs: Vec<_> = resources.entries.iter().map(|e| e.verb.clone()).collect();
        assert_eq!(verbs, vec![HttpVerb::Get, HttpVerb::Post]);
        assert!(resources
            .entries
            .iter()
            .all(|e| e.template == "/users"));
    }

    #[test]
    fn templates_never_contain_double_or_trailing_slashes() {
        let mut class = ClassResult::new("com.acme.Odd");
        class.path = Some("//a//b//".to_string());
        let mut m = method("x", "()V");
        m.verbs.insert(HttpVerb::Get);
        m.path = Some("/".to_string());
        class.methods.push(m);

        let resources = ResultInterpreter::interpret(&[class]);
        let template = &resources.entries[0].template;
        assert_eq!(template, "/a/b");
        assert!(!template.contains("//"));
    }

    #[test]
    fn media_types_default_to_wildcard_only_at_output() {
        let mut class = ClassResult::new("com.acme.Users");
        class.path = Some("/users".to_string());
        class.produces = vec!["application/json".to_string()];
        let mut m = method("list", "()Ljava/lang/String;");
        m.verbs.insert(HttpVerb::Get);
        class.methods.push(m);

        let resources = ResultInterpreter::interpret(&[class]);
        let entry = &resources.entries[0];
        assert_eq!(entry.request_media_types, vec!["*/*"]);
        assert_eq!(entry.response_media_types, vec!["application/json"]);
    }

    #[test]
    fn method_level_media_types_override_class_level() {
        let mut class = ClassResult::new("com.acme.Users");
        class.path = Some("/users".to_string());
        class.produces = vec!["text/plain".to_string()];
        let mut m = method("list", "()Ljava/lang/String;");
        m.verbs.insert(HttpVerb::Get);
        m.produces = vec!["application/json".to_string()];
        class.methods.push(m);

        let resources = ResultInterpreter::interpret(&[class]);
        assert_eq!(
            resources.entries[0].response_media_types,
            vec!["application/json"]
        );
    }

    #[test]
    fn colliding_entries_union_merge() {
        let mut interface = ClassResult::new("com.acme.IUsers");
        interface.path = Some("/users".to_string());
        let mut declared = method("list", "()Ljava/lang/String;");
        declared.verbs.insert(HttpVerb::Get);
        interface.methods.push(declared);

        let mut class = ClassResult::new("com.acme.Users");
        class.path = Some("/users".to_string());
        let mut implemented = method("list", "()Ljava/lang/String;");
        implemented.verbs.insert(HttpVerb::Get);
        implemented.responses.insert(HttpResponse {
            statuses: [200].into_iter().collect(),
            ..HttpResponse::default()
        });
        class.methods.push(implemented);

        let resources = ResultInterpreter::interpret(&[interface, class]);
        assert_eq!(resources.entries.len(), 1);
        assert_eq!(resources.entries[0].responses.len(), 1);
    }

    #[test]
    fn classes_without_path_or_verbs_are_not_emitted() {
        let mut class = ClassResult::new("com.acme.Helper");
        class.methods.push(method("helper", "()V"));

        let resources = ResultInterpreter::interpret(&[class]);
        assert!(resources.entries.is_empty());
    }

    #[test]
    fn field_bindings_join_method_parameters() {
        let mut class = ClassResult::new("com.acme.Users");
        class.path = Some("/users".to_string());
        class.fields.push(ParameterBinding {
            kind: ParameterKind::Header,
            name: Some("X-Tenant".to_string()),
            java_type: "java.lang.String".to_string(),
            default_value: None,
        });
        let mut m = method("create", "(Ljava/lang/String;)V");
        m.verbs.insert(HttpVerb::Post);
        m.parameters.push(ParameterBinding {
            kind: ParameterKind::Body,
            name: None,
            java_type: "java.lang.String".to_string(),
            default_value: None,
        });
        class.methods.push(m);

        let resources = ResultInterpreter::interpret(&[class]);
        let entry = &resources.entries[0];
        assert_eq!(entry.parameters.len(), 1);
        assert_eq!(entry.parameters[0].kind, ParameterKind::Header);
        assert_eq!(
            entry.request_body_type.as_deref(),
            Some("java.lang.String")
        );
    }
}
