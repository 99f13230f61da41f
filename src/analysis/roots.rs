use tracing::debug;

use crate::{analysis::supertypes, class::Class, names, pool::ClassPool};

/// Decides whether a class seeds the analysis queue.
pub struct RootSelector<'p> {
    pool: &'p ClassPool,
}

impl<'p> RootSelector<'p> {
    pub fn new(pool: &'p ClassPool) -> Self {
        Self { pool }
    }

    /// True iff the class directly carries the path-binding annotation or
    /// the application-path annotation. Inherited annotations do not count
    /// here; supertype propagation happens per method.
    pub fn is_root(&self, binary_name: &str) -> bool {
        self.inspect(binary_name)
            .map(|class| carries_root_annotation(&class))
            .unwrap_or(false)
    }

    /// True for a bare class whose supertype chain contains a directly
    /// annotated root type. Such implementations contribute resources under
    /// the supertype's path, so they must be analyzed too.
    pub fn implements_root(&self, binary_name: &str) -> bool {
        let Some(class) = self.inspect(binary_name) else {
            return false;
        };
        if carries_root_annotation(&class) {
            return false;
        }
        supertypes::supertype_classes(self.pool, &class)
            .iter()
            .any(|(_, super_class)| carries_root_annotation(super_class))
    }

    fn inspect(&self, binary_name: &str) -> Option<std::sync::Arc<Class>> {
        match self.pool.read_class(binary_name) {
            Ok(class) => Some(class),
            Err(err) => {
                debug!(class = binary_name, "not inspectable as root: {err}");
                None
            }
        }
    }
}

fn carries_root_annotation(class: &Class) -> bool {
    class.class_annotations().iter().any(|annotation| {
        annotation
            .internal_type_name()
            .is_some_and(|name| names::is_path(name) || names::is_application_path(name))
    })
}
