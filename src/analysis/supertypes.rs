use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    class::{Annotation, Class},
    names,
    pool::ClassPool,
};

/// A supertype member carrying REST annotations for an otherwise-bare
/// override.
pub(crate) struct SuperMember {
    pub(crate) class_name: Arc<str>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) parameter_annotations: Vec<Vec<Annotation>>,
}

/// Loads the supertype chain in breadth-first order: superclass plus all
/// transitive interfaces, `Object` excluded, each type visited once.
/// Interfaces can be re-implemented across a diamond; the visited set keeps
/// the walk finite. Unloadable supertypes are logged and skipped.
pub(crate) fn supertype_classes(pool: &ClassPool, class: &Class) -> Vec<(Arc<str>, Arc<Class>)> {
    let mut queue: VecDeque<Arc<str>> = VecDeque::new();
    let mut visited: HashSet<Arc<str>> = HashSet::new();
    enqueue_supertypes(class, &mut queue, &mut visited);

    let mut chain = Vec::new();
    while let Some(internal_name) = queue.pop_front() {
        let binary = names::to_binary_name(&internal_name);
        let super_class = match pool.read_class(&binary) {
            Ok(class) => class,
            Err(err) => {
                debug!(class = %binary, "supertype not loadable, skipping: {err}");
                continue;
            }
        };
        enqueue_supertypes(&super_class, &mut queue, &mut visited);
        chain.push((internal_name, super_class));
    }
    chain
}

/// Finds the first supertype member with the same name and a compatible
/// signature that bears REST-relevant annotations.
///
/// Signature compatibility: equal erased descriptor, or equal generic
/// signature when one is present.
pub(crate) fn find_annotated_super_member(
    pool: &ClassPool,
    class: &Class,
    method_name: &str,
    descriptor: &str,
    signature: Option<&str>,
    is_rest_relevant: impl Fn(&Annotation) -> bool,
) -> Option<SuperMember> {
    let mut found: Option<SuperMember> = None;
    let mut ambiguous = false;

    for (internal_name, super_class) in supertype_classes(pool, class) {
        for method in &super_class.methods {
            let Some(name) = method.name(&super_class) else {
                continue;
            };
            if name.as_ref() != method_name {
                continue;
            }
            let Some(super_descriptor) = method.descriptor(&super_class) else {
                continue;
            };
            let super_signature = super_class.decode_signature(&method.attributes);
            let compatible = super_descriptor.as_ref() == descriptor
                || matches!(
                    (signature, super_signature.as_deref()),
                    (Some(a), Some(b)) if a == b
                );
            if !compatible {
                continue;
            }

            let annotations = super_class.decode_annotations(&method.attributes);
            if !annotations.iter().any(&is_rest_relevant) {
                continue;
            }

            if found.is_some() {
                ambiguous = true;
            } else {
                found = Some(SuperMember {
                    class_name: Arc::clone(&internal_name),
                    parameter_annotations: super_class
                        .decode_parameter_annotations(&method.attributes),
                    annotations,
                });
            }
        }
    }

    if ambiguous {
        if let Some(member) = &found {
            warn!(
                method = method_name,
                chosen = %member.class_name,
                "several supertype declarations qualify, keeping the first in traversal order"
            );
        }
    }

    found
}

fn enqueue_supertypes(
    class: &Class,
    queue: &mut VecDeque<Arc<str>>,
    visited: &mut HashSet<Arc<str>>,
) {
    let mut push = |name: Arc<str>| {
        if name.as_ref() != names::OBJECT && visited.insert(Arc::clone(&name)) {
            queue.push_back(name);
        }
    };
    if let Some(super_name) = class.super_class_name() {
        push(super_name);
    }
    for interface in class.interface_names() {
        push(interface);
    }
}
