mod classes;
mod interpreter;
mod registry;
mod results;
mod roots;
mod supertypes;

pub use classes::ClassAnalyzer;
pub use registry::JobRegistry;
pub use results::ResultInterpreter;
pub use roots::RootSelector;

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{
    error::{AnalyzerError, Result},
    javadoc::{DocEnricher, NoopEnricher},
    model::Resources,
    pool::ClassPool,
};

/// Analyzes compiled artifacts for their REST surface. Thread-safe: a single
/// lock serializes the whole `analyze` call, and the class pool it guards is
/// append-only across calls.
pub struct ProjectAnalyzer {
    pool: Mutex<ClassPool>,
    enricher: Box<dyn DocEnricher + Send + Sync>,
}

impl ProjectAnalyzer {
    /// Creates an analyzer with dependency class paths (archives or
    /// directories): resolvable for supertype and call-target lookups, not
    /// scanned for roots.
    pub fn new(class_paths: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let mut pool = ClassPool::new();
        for path in class_paths {
            pool.add_dependency(&path)?;
        }
        Ok(Self {
            pool: Mutex::new(pool),
            enricher: Box::new(NoopEnricher),
        })
    }

    /// Registers the platform class library (`$JAVA_HOME/jmods`) so that
    /// framework-declared interfaces resolve during supertype traversal.
    pub fn with_runtime_modules(self, java_home: impl AsRef<Path>) -> Result<Self> {
        self.pool.lock().add_runtime_modules(java_home.as_ref())?;
        Ok(self)
    }

    pub fn with_enricher(mut self, enricher: Box<dyn DocEnricher + Send + Sync>) -> Self {
        self.enricher = enricher;
        self
    }

    /// Analyzes all classes reachable from the given project class paths and
    /// assembles the REST surface. Source paths feed the documentation
    /// enricher only.
    pub fn analyze(
        &self,
        project_class_paths: &[PathBuf],
        project_source_paths: &[PathBuf],
    ) -> Result<Resources> {
        let mut pool = self.pool.lock();

        for path in project_class_paths {
            pool.add_project(path)?;
        }

        let registry = JobRegistry::new();
        let selector = RootSelector::new(&pool);
        for name in pool.project_class_names() {
            if selector.is_root(name) || selector.implements_root(name) {
                registry.enqueue(name);
            }
        }

        let analyzer = ClassAnalyzer::new(&pool, &registry);
        while let Some((name, mut result)) = registry.next_pending() {
            match analyzer.analyze(&name, &mut result) {
                Ok(()) => {}
                Err(AnalyzerError::ClassNotFound(class)) => {
                    warn!(class = %class, "enqueued class vanished from the pool, skipping");
                }
                Err(fatal) => return Err(fatal),
            }
            registry.mark_done(&name, result);
        }

        let mut class_results = registry.into_results();
        info!(classes = class_results.len(), "class analysis finished");

        self.enricher.enrich(
            &mut class_results,
            pool.package_names(),
            project_source_paths,
            &pool,
        );

        Ok(ResultInterpreter::interpret(&class_results))
    }
}
