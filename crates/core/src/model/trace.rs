use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One Trace Event Format entry. `ph` is `"B"`/`"E"` for duration pairs and
/// `"M"` for the process/thread naming metadata events; `ts` is microseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    pub name: String,
    pub cat: String,
    pub ph: String,
    pub ts: i64,
    pub pid: u64,
    pub tid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

impl TraceEvent {
    pub fn begin(name: impl Into<String>, cat: impl Into<String>, ts: i64, pid: u64, tid: u64) -> Self {
        Self {
            name: name.into(),
            cat: cat.into(),
            ph: "B".to_string(),
            ts,
            pid,
            tid,
            args: None,
        }
    }

    pub fn end(name: impl Into<String>, cat: impl Into<String>, ts: i64, pid: u64, tid: u64) -> Self {
        Self {
            name: name.into(),
            cat: cat.into(),
            ph: "E".to_string(),
            ts,
            pid,
            tid,
            args: None,
        }
    }

    pub fn metadata(name: impl Into<String>, label: &str, pid: u64, tid: u64) -> Self {
        Self {
            name: name.into(),
            cat: "__metadata".to_string(),
            ph: "M".to_string(),
            ts: 0,
            pid,
            tid,
            args: Some(serde_json::json!({ "name": label })),
        }
    }
}

/// Document-level metadata carried under `otherData`. The generation time is
/// an encoder input so that encoding stays a pure, deterministic function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub job_filter: Option<String>,
}

/// The final artifact: a self-contained Trace Event Format document that a
/// standard trace viewer (Perfetto, chrome://tracing) can load directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraceDocument {
    pub trace_events: Vec<TraceEvent>,
    pub display_time_unit: String,
    pub other_data: DocumentMetadata,
}

impl TraceDocument {
    pub fn new(trace_events: Vec<TraceEvent>, other_data: DocumentMetadata) -> Self {
        Self {
            trace_events,
            display_time_unit: "ms".to_string(),
            other_data,
        }
    }
}
