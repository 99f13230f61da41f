use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions surface through this enum; everything else is logged and
/// the analysis degrades (missing supertypes, undecodable method bodies).
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("the location '{0}' does not exist")]
    InvalidLocation(PathBuf),

    #[error("could not read '{path}': {source}")]
    LocationUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed class file '{class_name}': {detail}")]
    MalformedClassFile { class_name: String, detail: String },

    #[error("the class '{0}' is not present in the class pool")]
    ClassNotFound(String),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
