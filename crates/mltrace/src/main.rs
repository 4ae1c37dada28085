mod output;
mod telemetry;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use mltrace_convert::encode::compress;
use mltrace_convert::pipeline::{ConvertRequest, convert, output_path};
use mltrace_convert::reconstruct::ReconstructPolicy;
use mltrace_core::schema::{Schema, parse_key_list};
use tracing::info;

use crate::output::{RunSummary, print_summary_human};

#[derive(Parser, Debug)]
#[command(name = "mltrace")]
#[command(about = "Build viewable traces from ML workload logs")]
struct Cli {
    /// Path to the CSV/JSON/JSONL file that contains logs.
    filename: PathBuf,

    /// Only convert records belonging to this job.
    #[arg(short = 'j', long)]
    jobname: Option<String>,

    /// How leaf records turn into spans.
    #[arg(long, value_enum, default_value = "interval")]
    policy: PolicyArg,

    /// Comma-separated hierarchy key columns, outer levels first.
    #[arg(long)]
    keys: Option<String>,

    /// Hierarchy key the job filter applies to.
    #[arg(long)]
    job_key: Option<String>,

    #[arg(long)]
    timestamp_key: Option<String>,

    #[arg(long)]
    event_key: Option<String>,

    #[arg(long)]
    name_key: Option<String>,

    /// Where to write the compressed trace; defaults to
    /// <input stem>.trace.json.gz next to the input.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    /// Pair begin/end markers into intervals.
    Interval,
    /// Emit every record as a zero-duration span.
    Point,
}

impl From<PolicyArg> for ReconstructPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Interval => ReconstructPolicy::PointToInterval,
            PolicyArg::Point => ReconstructPolicy::SinglePoint,
        }
    }
}

fn main() -> anyhow::Result<()> {
    telemetry::init_cli_tracing();
    let cli = Cli::parse();

    if !cli.filename.exists() {
        anyhow::bail!("input file {} does not exist", cli.filename.display());
    }
    if let Some(jobname) = &cli.jobname {
        if jobname.is_empty() {
            anyhow::bail!("jobname cannot be empty; provide a job name or omit -j");
        }
    }

    let schema = build_schema(&cli).context("invalid column schema")?;
    let request = ConvertRequest {
        input: cli.filename.clone(),
        job_filter: cli.jobname.clone(),
        policy: cli.policy.into(),
        schema,
        generated_at: Utc::now(),
    };

    let outcome = convert(&request)?;

    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| output_path(&cli.filename));
    let bytes = compress(&outcome.document)?;
    fs::write(&out_path, &bytes)
        .with_context(|| format!("failed writing {}", out_path.display()))?;
    info!(bytes = bytes.len(), output = %out_path.display(), "wrote trace artifact");

    let summary = RunSummary::new(&cli.filename, &out_path, &outcome);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary_human(&summary);
    }
    Ok(())
}

/// Layered schema: defaults ← config file ← environment ← CLI flags.
fn build_schema(cli: &Cli) -> anyhow::Result<Schema> {
    let mut schema = Schema::load()?;
    if let Some(keys) = &cli.keys {
        schema.hierarchy_keys = parse_key_list(keys);
        // A custom key list usually renames the job level too; follow it
        // unless --job-key overrides explicitly.
        if cli.job_key.is_none() && !schema.hierarchy_keys.contains(&schema.job_key) {
            if let Some(first) = schema.hierarchy_keys.first() {
                schema.job_key = first.clone();
            }
        }
    }
    if let Some(job_key) = &cli.job_key {
        schema.job_key = job_key.clone();
    }
    if let Some(timestamp_key) = &cli.timestamp_key {
        schema.timestamp_key = timestamp_key.clone();
    }
    if let Some(event_key) = &cli.event_key {
        schema.event_key = event_key.clone();
    }
    if let Some(name_key) = &cli.name_key {
        schema.name_key = if name_key.is_empty() {
            None
        } else {
            Some(name_key.clone())
        };
    }
    schema.validate()?;
    Ok(schema)
}
