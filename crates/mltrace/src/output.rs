use std::path::Path;

use mltrace_convert::pipeline::ConvertOutcome;
use mltrace_core::warn::ConvertWarning;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub source: String,
    pub output: String,
    pub records_loaded: usize,
    pub records_grouped: usize,
    pub tracks: usize,
    pub spans: usize,
    pub warnings: Vec<ConvertWarning>,
}

impl RunSummary {
    pub fn new(source: &Path, output: &Path, outcome: &ConvertOutcome) -> Self {
        Self {
            source: source.display().to_string(),
            output: output.display().to_string(),
            records_loaded: outcome.records_loaded,
            records_grouped: outcome.records_grouped,
            tracks: outcome.tracks,
            spans: outcome.spans,
            warnings: outcome.warnings.clone(),
        }
    }
}

pub fn print_summary_human(v: &RunSummary) {
    println!(
        "{} -> {}: {} records ({} after filter), {} tracks, {} spans",
        v.source, v.output, v.records_loaded, v.records_grouped, v.tracks, v.spans
    );
    for warning in &v.warnings {
        println!("warning: {warning}");
    }
    println!("-- {} warnings --", v.warnings.len());
}
