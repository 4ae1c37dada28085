use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recoverable issues accumulated while converting. None of these abort the
/// run; they are reported next to the produced trace so no skipped record
/// goes unaccounted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConvertWarning {
    #[error("row {row}: missing hierarchy key {key:?}, routed to the unknown bucket")]
    MissingKey { row: usize, key: String },

    #[error("row {row} in group {group:?}: unparsable timestamp {raw:?}: {reason}")]
    MalformedTimestamp {
        row: usize,
        group: String,
        raw: String,
        reason: String,
    },

    #[error("group {group:?}: span {name:?} had no end event, closed at {closed_at_us}us")]
    TruncatedSpan {
        group: String,
        name: String,
        start_us: i64,
        closed_at_us: i64,
    },

    #[error("group {group:?}: end event {name:?} at {at_us}us had no open span")]
    UnmatchedEnd {
        group: String,
        name: String,
        at_us: i64,
    },

    #[error("group {group:?} dropped: {reason}")]
    DroppedGroup { group: String, reason: String },
}
