use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MltraceError, Result};

/// Column schema the converter reads logs under. The original tool's column
/// names vary per deployment, so every field is overridable via config file,
/// environment and CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    pub timestamp_key: String,
    pub hierarchy_keys: Vec<String>,
    pub job_key: String,
    pub event_key: String,
    pub name_key: Option<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            timestamp_key: "timestamp".to_string(),
            hierarchy_keys: vec!["job".to_string(), "worker".to_string()],
            job_key: "job".to_string(),
            event_key: "event".to_string(),
            name_key: None,
        }
    }
}

impl Schema {
    pub fn load() -> Result<Self> {
        let mut schema = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut schema, file_overrides);
        }
        apply_overrides(&mut schema, load_env_overrides());
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timestamp_key.is_empty() {
            return Err(MltraceError::Config("timestamp_key is empty".to_string()));
        }
        if self.hierarchy_keys.is_empty() {
            return Err(MltraceError::Config(
                "hierarchy_keys must name at least one level".to_string(),
            ));
        }
        if self.hierarchy_keys.iter().any(|k| k.is_empty()) {
            return Err(MltraceError::Config(
                "hierarchy_keys contains an empty name".to_string(),
            ));
        }
        for (i, key) in self.hierarchy_keys.iter().enumerate() {
            if self.hierarchy_keys[..i].contains(key) {
                return Err(MltraceError::Config(format!(
                    "duplicate hierarchy key {key:?}"
                )));
            }
        }
        if !self.hierarchy_keys.contains(&self.job_key) {
            return Err(MltraceError::Config(format!(
                "job_key {:?} is not one of the hierarchy keys {:?}",
                self.job_key, self.hierarchy_keys
            )));
        }
        Ok(())
    }

    /// Level index the job filter applies to.
    pub fn job_level(&self) -> usize {
        self.hierarchy_keys
            .iter()
            .position(|k| k == &self.job_key)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SchemaOverrides {
    timestamp_key: Option<String>,
    hierarchy_keys: Option<Vec<String>>,
    job_key: Option<String>,
    event_key: Option<String>,
    name_key: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("MLTRACE_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("mltrace/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<SchemaOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| MltraceError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: SchemaOverrides = toml::from_str(&raw)
        .map_err(|e| MltraceError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> SchemaOverrides {
    SchemaOverrides {
        timestamp_key: env::var("MLTRACE_TIMESTAMP_KEY").ok(),
        hierarchy_keys: env::var("MLTRACE_HIERARCHY_KEYS")
            .ok()
            .map(|v| parse_key_list(&v)),
        job_key: env::var("MLTRACE_JOB_KEY").ok(),
        event_key: env::var("MLTRACE_EVENT_KEY").ok(),
        name_key: env::var("MLTRACE_NAME_KEY").ok(),
    }
}

fn apply_overrides(schema: &mut Schema, overrides: SchemaOverrides) {
    if let Some(v) = overrides.timestamp_key {
        schema.timestamp_key = v;
    }
    if let Some(v) = overrides.hierarchy_keys {
        schema.hierarchy_keys = v;
    }
    if let Some(v) = overrides.job_key {
        schema.job_key = v;
    }
    if let Some(v) = overrides.event_key {
        schema.event_key = v;
    }
    if let Some(v) = overrides.name_key {
        schema.name_key = if v.is_empty() { None } else { Some(v) };
    }
}

/// Splits a comma-separated key list, dropping empty entries.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
