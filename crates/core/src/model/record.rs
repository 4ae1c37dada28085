use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// One log event, already projected through the column schema. The raw
/// timestamp stays a string: parsing happens during span reconstruction so a
/// bad value only costs that record, not the load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    /// Position in the source file, used as a stable sort tie-breaker.
    pub row: usize,
    pub timestamp: String,
    /// Hierarchy key values, one slot per configured level, outer first.
    pub keys: Vec<Option<String>>,
    pub event: Option<String>,
    pub name: Option<String>,
}

impl LogRecord {
    pub fn key_at(&self, level: usize) -> Option<&str> {
        self.keys.get(level).and_then(|k| k.as_deref())
    }
}

/// The tabular record set handed to the pipeline, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub source: PathBuf,
    pub schema: Schema,
    pub records: Vec<LogRecord>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
