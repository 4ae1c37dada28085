use std::path::PathBuf;

use mltrace_core::model::group::Group;
use mltrace_core::model::record::{LogRecord, RecordSet};
use mltrace_core::schema::Schema;

/// Builds a record under the default two-level (job, worker) schema.
pub fn record(row: usize, ts: &str, keys: &[&str], event: Option<&str>) -> LogRecord {
    LogRecord {
        row,
        timestamp: ts.to_string(),
        keys: keys.iter().map(|k| Some((*k).to_string())).collect(),
        event: event.map(str::to_string),
        name: None,
    }
}

pub fn record_set(records: Vec<LogRecord>) -> RecordSet {
    RecordSet {
        source: PathBuf::from("logs.csv"),
        schema: Schema::default(),
        records,
    }
}

pub fn leaf_of(name: &str, records: Vec<LogRecord>) -> Group {
    Group::leaf(name, records)
}
