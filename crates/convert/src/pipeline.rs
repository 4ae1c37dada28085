use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mltrace_core::error::Result;
use mltrace_core::model::trace::{DocumentMetadata, TraceDocument};
use mltrace_core::schema::Schema;
use mltrace_core::warn::ConvertWarning;
use tracing::info;

use crate::reconstruct::ReconstructPolicy;
use crate::{encode, group, loader, reconstruct};

/// One conversion run, fully specified up front. The generation timestamp is
/// part of the request so repeated runs can be compared byte for byte.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub job_filter: Option<String>,
    pub policy: ReconstructPolicy,
    pub schema: Schema,
    pub generated_at: DateTime<Utc>,
}

/// The produced document plus everything the caller needs to report:
/// accumulated warnings and the run's counters.
#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    pub document: TraceDocument,
    pub warnings: Vec<ConvertWarning>,
    pub records_loaded: usize,
    pub records_grouped: usize,
    pub tracks: usize,
    pub spans: usize,
}

/// Runs load → group → reconstruct → encode, fail-fast on fatal errors.
/// Recoverable per-record issues accumulate in the outcome's warning set.
pub fn convert(req: &ConvertRequest) -> Result<ConvertOutcome> {
    let mut warnings = Vec::new();

    let set = loader::load(&req.input, &req.schema)?;
    let records_loaded = set.len();

    let root = group::group(&set, req.job_filter.as_deref(), &mut warnings)?;
    let records_grouped = root.record_count();

    let tree = reconstruct::reconstruct(&root, req.policy, &mut warnings)?;
    // Counted after reconstruction so dropped leaves are not reported.
    let tracks = tree.leaf_count();
    let spans = tree.span_count();

    let metadata = DocumentMetadata {
        source: req.input.display().to_string(),
        generated_at: req.generated_at,
        job_filter: req.job_filter.clone(),
    };
    let document = encode::encode(&tree, &metadata)?;

    info!(
        records = records_loaded,
        grouped = records_grouped,
        tracks,
        spans,
        warnings = warnings.len(),
        "conversion finished"
    );
    Ok(ConvertOutcome {
        document,
        warnings,
        records_loaded,
        records_grouped,
        tracks,
        spans,
    })
}

/// Deterministic artifact path: the input's stem with a `.trace.json.gz`
/// suffix, next to the input.
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("trace");
    input.with_file_name(format!("{stem}.trace.json.gz"))
}
