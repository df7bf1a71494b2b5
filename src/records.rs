//! Dataset records and JSON-lines persistence.
//!
//! Every dataset in the benchmark is a newline-delimited JSON file with one
//! record per line, keyed by an integer prompt id.

use crate::error::{BenchError, Result};
use crate::score::{JudgeScore, Winner};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Records addressable by prompt id.
pub trait Keyed {
    fn id(&self) -> u32;
}

/// A benchmark prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: u32,
    pub prompt: String,
    /// Domain category (e.g. "crypto", "company-data").
    pub vertical: String,
}

/// A provider's answer to one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub id: u32,
    pub prompt: String,
    /// Unprocessed provider output (JSON text).
    #[serde(rename = "rawData", default)]
    pub raw_data: String,
    /// Summarized answer.
    #[serde(default)]
    pub result: String,
    /// Set when collection failed; `raw_data` and `result` are empty then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderResult {
    pub fn success(prompt: &Prompt, raw_data: String, result: String) -> Self {
        Self {
            id: prompt.id,
            prompt: prompt.prompt.clone(),
            raw_data,
            result,
            error: None,
        }
    }

    pub fn failure(prompt: &Prompt, error: impl Into<String>) -> Self {
        Self {
            id: prompt.id,
            prompt: prompt.prompt.clone(),
            raw_data: String::new(),
            result: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// The judge's verdict for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRecord {
    pub id: u32,
    pub prompt: String,
    /// Web search scores; absent when the judge produced none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exa: Option<JudgeScore>,
    /// Data API scores; absent when the judge produced none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kirha: Option<JudgeScore>,
    pub winner: Winner,
    #[serde(rename = "lastRunDate", default)]
    pub last_run_date: String,
}

impl Keyed for Prompt {
    fn id(&self) -> u32 {
        self.id
    }
}

impl Keyed for ProviderResult {
    fn id(&self) -> u32 {
        self.id
    }
}

impl Keyed for JudgeRecord {
    fn id(&self) -> u32 {
        self.id
    }
}

/// Load every record of a JSON-lines file.
///
/// Blank lines are skipped. A malformed line fails the whole load.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    parse_jsonl(path, &content)
}

/// Like [`load_jsonl`], but a missing file yields no records.
pub fn load_jsonl_or_empty<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    load_jsonl(path)
}

fn parse_jsonl<T: DeserializeOwned>(path: &Path, content: &str) -> Result<Vec<T>> {
    let mut records = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record = serde_json::from_str(line).map_err(|source| BenchError::Parse {
            path: path.to_path_buf(),
            line: line_num + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Write records as JSON lines, replacing any existing file.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
        }
    }

    let mut content = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| BenchError::Serialization(e.to_string()))?;
        content.push_str(&line);
        content.push('\n');
    }

    fs::write(path, content).map_err(|e| BenchError::io(path, e))
}

/// Overlay `updates` on `existing`, replacing records with the same id.
///
/// The result is sorted by id.
pub fn merge_by_id<T: Keyed>(existing: Vec<T>, updates: Vec<T>) -> Vec<T> {
    let mut merged: BTreeMap<u32, T> = existing.into_iter().map(|r| (r.id(), r)).collect();
    for record in updates {
        merged.insert(record.id(), record);
    }
    merged.into_values().collect()
}

/// Index records by id. When ids repeat, the first record wins.
pub fn index_by_id<T: Keyed>(records: &[T]) -> HashMap<u32, &T> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        index.entry(record.id()).or_insert(record);
    }
    index
}

/// Keep only records whose id is selected. `None` keeps everything.
pub fn select_ids<T: Keyed>(records: Vec<T>, ids: Option<&HashSet<u32>>) -> Vec<T> {
    match ids {
        Some(ids) if !ids.is_empty() => records.into_iter().filter(|r| ids.contains(&r.id())).collect(),
        _ => records,
    }
}
