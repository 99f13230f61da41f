//! # jaxscan
//!
//! Discovers and describes the HTTP REST surface of compiled JAX-RS
//! artifacts. Given archives or directories of class files, it selects the
//! annotated resource classes, walks supertype chains for inherited
//! declarations, abstractly interprets method bodies to infer status codes,
//! headers and entity types, and folds everything into a [`Resources`] tree
//! mapping URI templates to per-verb method descriptors.
//!
//! ## Architecture
//!
//! - **pool**: class pool over archive/directory/jmod locations
//! - **class**: raw class-file model, nom parser, attribute decoding
//! - **descriptor**: field/method descriptor parsing
//! - **analysis**: root selection, job registry, per-class extraction,
//!   supertype resolution, bytecode interpretation, result folding
//! - **model**: REST data model and the `Resources` output
//! - **javadoc**: documentation-enrichment seam
//!
//! ```no_run
//! use jaxscan::ProjectAnalyzer;
//!
//! # fn main() -> jaxscan::Result<()> {
//! let analyzer = ProjectAnalyzer::new([])?;
//! let resources = analyzer.analyze(&["target/classes".into()], &[])?;
//! for entry in &resources.entries {
//!     println!("{} {}", entry.verb, entry.template);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod class;
pub mod consts;
pub mod descriptor;
pub mod error;
pub mod javadoc;
pub mod model;
mod names;
pub mod pool;

pub use analysis::ProjectAnalyzer;
pub use error::{AnalyzerError, Result};
pub use model::{
    ClassResult, HttpResponse, HttpVerb, MethodIdentifier, MethodResult, ParameterBinding,
    ParameterKind, ResourceEntry, Resources,
};
pub use pool::ClassPool;
