//! Documentation enrichment seam. Source-file tokenization lives outside
//! this crate; implementations merge documentation fragments into the class
//! results in place.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::{model::ClassResult, pool::ClassPool};

pub trait DocEnricher {
    fn enrich(
        &self,
        class_results: &mut [ClassResult],
        packages: &BTreeSet<String>,
        source_paths: &[PathBuf],
        pool: &ClassPool,
    );
}

/// Default enricher: leaves the results untouched.
pub struct NoopEnricher;

impl DocEnricher for NoopEnricher {
    fn enrich(
        &self,
        _class_results: &mut [ClassResult],
        _packages: &BTreeSet<String>,
        _source_paths: &[PathBuf],
        _pool: &ClassPool,
    ) {
    }
}
