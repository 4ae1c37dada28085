use std::collections::HashMap;

use mltrace_core::error::{MltraceError, Result};
use mltrace_core::model::group::{Group, UNKNOWN_BUCKET};
use mltrace_core::model::record::{LogRecord, RecordSet};
use mltrace_core::warn::ConvertWarning;
use tracing::debug;

/// Partitions the record set into the configured hierarchy.
///
/// Pure over its inputs: children keep first-seen key order at every level,
/// so identical input yields an identical tree. Records missing a level's key
/// go to the `unknown` bucket with a warning instead of being dropped.
pub fn group(
    set: &RecordSet,
    job_filter: Option<&str>,
    warnings: &mut Vec<ConvertWarning>,
) -> Result<Group> {
    if set.is_empty() {
        return Err(MltraceError::EmptyInput);
    }

    let mut records: Vec<LogRecord> = match job_filter {
        Some(filter) => {
            let job_level = set.schema.job_level();
            let retained: Vec<LogRecord> = set
                .records
                .iter()
                .filter(|r| r.key_at(job_level) == Some(filter))
                .cloned()
                .collect();
            if retained.is_empty() {
                return Err(MltraceError::NoMatchingRecords(filter.to_string()));
            }
            retained
        }
        None => set.records.clone(),
    };
    records.sort_by_key(|r| r.row);

    let root_name = set
        .source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("trace")
        .to_string();
    let levels = set.schema.hierarchy_keys.len();
    let children = build_level(records, 0, levels, &set.schema.hierarchy_keys, warnings);
    let root = Group::branch(root_name, children);
    debug!(
        leaves = root.leaf_count(),
        records = root.record_count(),
        "grouped records"
    );
    Ok(root)
}

fn build_level(
    records: Vec<LogRecord>,
    level: usize,
    levels: usize,
    keys: &[String],
    warnings: &mut Vec<ConvertWarning>,
) -> Vec<Group> {
    // First-seen bucket order, stable within each bucket.
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<LogRecord>> = HashMap::new();
    for record in records {
        let name = match record.key_at(level) {
            Some(value) => value.to_string(),
            None => {
                warnings.push(ConvertWarning::MissingKey {
                    row: record.row,
                    key: keys[level].clone(),
                });
                UNKNOWN_BUCKET.to_string()
            }
        };
        buckets
            .entry(name.clone())
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .map(|name| {
            let members = buckets.remove(&name).unwrap_or_default();
            if level + 1 == levels {
                Group::leaf(name, members)
            } else {
                let children = build_level(members, level + 1, levels, keys, warnings);
                Group::branch(name, children)
            }
        })
        .collect()
}
