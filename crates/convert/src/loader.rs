use std::fs;
use std::path::Path;

use mltrace_core::error::{MltraceError, Result};
use mltrace_core::model::record::{LogRecord, RecordSet};
use mltrace_core::schema::Schema;
use tracing::info;

/// Loads a log file into a tabular record set, projecting each row through
/// the column schema. The format follows the file extension: `.csv`, or
/// `.json`/`.jsonl` (single array or line-delimited records).
pub fn load(path: &Path, schema: &Schema) -> Result<RecordSet> {
    schema.validate()?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" => load_csv(path, schema)?,
        "json" | "jsonl" => load_json(path, schema)?,
        other => {
            return Err(MltraceError::Load(format!(
                "unsupported file type {other:?} for {}: expected .csv, .json or .jsonl",
                path.display()
            )));
        }
    };

    info!(records = records.len(), source = %path.display(), "loaded log file");
    Ok(RecordSet {
        source: path.to_path_buf(),
        schema: schema.clone(),
        records,
    })
}

fn load_csv(path: &Path, schema: &Schema) -> Result<Vec<LogRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| MltraceError::Load(format!("failed reading {}: {e}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| MltraceError::Load(format!("bad CSV header in {}: {e}", path.display())))?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let Some(ts_col) = column(&schema.timestamp_key) else {
        return Err(MltraceError::Load(format!(
            "{} has no {:?} column (found: {})",
            path.display(),
            schema.timestamp_key,
            headers.iter().collect::<Vec<_>>().join(", ")
        )));
    };
    let key_cols: Vec<Option<usize>> = schema.hierarchy_keys.iter().map(|k| column(k)).collect();
    let event_col = column(&schema.event_key);
    let name_col = schema.name_key.as_deref().and_then(column);

    let cell = |row: &csv::StringRecord, col: Option<usize>| -> Option<String> {
        col.and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row
            .map_err(|e| MltraceError::Load(format!("bad CSV row in {}: {e}", path.display())))?;
        records.push(LogRecord {
            row: row_idx,
            timestamp: cell(&row, Some(ts_col)).unwrap_or_default(),
            keys: key_cols.iter().map(|&c| cell(&row, c)).collect(),
            event: cell(&row, event_col),
            name: cell(&row, name_col),
        });
    }
    Ok(records)
}

fn load_json(path: &Path, schema: &Schema) -> Result<Vec<LogRecord>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| MltraceError::Load(format!("failed reading {}: {e}", path.display())))?;
    let objects = parse_json_records(&raw, path)?;

    if !objects.is_empty()
        && !objects
            .iter()
            .any(|obj| obj.contains_key(&schema.timestamp_key))
    {
        return Err(MltraceError::Load(format!(
            "{} has no {:?} field in any record",
            path.display(),
            schema.timestamp_key
        )));
    }

    let field = |obj: &serde_json::Map<String, serde_json::Value>, key: &str| -> Option<String> {
        obj.get(key).and_then(value_to_string)
    };

    Ok(objects
        .iter()
        .enumerate()
        .map(|(row, obj)| LogRecord {
            row,
            timestamp: field(obj, &schema.timestamp_key).unwrap_or_default(),
            keys: schema
                .hierarchy_keys
                .iter()
                .map(|k| field(obj, k))
                .collect(),
            event: field(obj, &schema.event_key),
            name: schema.name_key.as_deref().and_then(|k| field(obj, k)),
        })
        .collect())
}

/// Two-step JSON detection: a whole-document array parse first, then an
/// explicit fallback to line-delimited records. Failing both is a load error
/// that reports the array-parse failure.
fn parse_json_records(
    raw: &str,
    path: &Path,
) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
    match serde_json::from_str::<Vec<serde_json::Map<String, serde_json::Value>>>(raw) {
        Ok(objects) => Ok(objects),
        Err(array_err) => {
            let mut objects = Vec::new();
            for (line_no, line) in raw.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let obj = serde_json::from_str(line).map_err(|line_err| {
                    MltraceError::Load(format!(
                        "{} is neither a JSON array ({array_err}) nor JSON lines \
                         (line {}: {line_err})",
                        path.display(),
                        line_no + 1
                    ))
                })?;
                objects.push(obj);
            }
            Ok(objects)
        }
    }
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        // Nested values keep their JSON rendering so nothing is lost.
        other => Some(other.to_string()),
    }
}
