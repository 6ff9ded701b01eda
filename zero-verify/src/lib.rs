//! Zero Verify - three-statement financial model verification.
//!
//! Pipeline:
//!
//! ```text
//! RawModel ──FieldMapper──▶ FinancialModel + MappingDiagnostics
//!          ──engine::run──▶ Vec<CheckResult> ──aggregate──▶ Report
//! ```
//!
//! - [`mapping`]: raw field names to canonical line items (exact, alias, fuzzy)
//! - [`checks`]: the 32 structural, cross-statement and reasonableness checks
//! - [`engine`]: runs every check on every period with fault isolation
//! - [`report`]: severity and category summaries, health, period × check matrix
//! - [`ingest`] / [`output`]: JSON in, console or JSON out

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod mapping;
pub mod model;
pub mod output;
pub mod report;
pub mod tolerance;

use rayon::prelude::*;
use serde::Serialize;

pub use checks::{CheckCategory, CheckResult, CheckStatus, ReasonablenessConfig, Severity};
pub use config::Config;
pub use engine::RunOptions;
pub use error::{Result, VerifyError};
pub use mapping::{FieldMapper, MappingConfig, MappingDiagnostics, SimilarityMetric};
pub use model::{FinancialModel, LineItem, RawModel, StatementKind};
pub use report::{aggregate, Health, Report};
pub use tolerance::Tolerance;

/// Report plus the mapping diagnostics that produced its model.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub report: Report,
    pub diagnostics: MappingDiagnostics,
}

/// Map, verify and aggregate a raw model.
pub fn verify<M: SimilarityMetric>(
    raw: &RawModel,
    mapper: &FieldMapper<M>,
    options: &RunOptions,
) -> Result<Verification> {
    let (model, diagnostics) = mapper.build_model(raw)?;
    let results = engine::run(&model, Some(&diagnostics), options)?;
    let report = aggregate(results).with_metadata(model.metadata.clone());
    Ok(Verification {
        report,
        diagnostics,
    })
}

/// Verify an already-mapped model.
pub fn verify_model(model: &FinancialModel, options: &RunOptions) -> Result<Report> {
    let results = engine::run(model, None, options)?;
    Ok(aggregate(results).with_metadata(model.metadata.clone()))
}

/// Diagnose-only mode: mapping diagnostics without running checks.
pub fn diagnose<M: SimilarityMetric>(raw: &RawModel, mapper: &FieldMapper<M>) -> MappingDiagnostics {
    mapper.diagnose(raw)
}

/// Verify several models in parallel. Each model gets its own independent
/// run; results come back in input order.
pub fn verify_batch<M: SimilarityMetric>(
    raws: &[RawModel],
    mapper: &FieldMapper<M>,
    options: &RunOptions,
) -> Vec<Result<Verification>> {
    tracing::info!(models = raws.len(), "Starting batch verification");
    raws.par_iter()
        .map(|raw| verify(raw, mapper, options))
        .collect()
}
