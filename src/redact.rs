// Dataset redactor: builds the public `apps-public.json` from the private
// `apps.json` by dropping the sale and repository fields from every record.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SOURCE: &str = "src/data/apps.json";
pub const DEFAULT_DEST: &str = "apps-public.json";

/// Keys that never leave the private dataset.
pub const PRIVATE_KEYS: &[&str] = &[
    "saleDate",
    "salePrice",
    "listingFee",
    "successFee",
    "flippaLink",
    "salePriceComment",
    "gitHubLink",
];

#[derive(Error, Debug)]
pub enum RedactError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON array of app records")]
    NotAnArray,

    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("failed to serialize records: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactSummary {
    pub records: usize,
    /// Total number of keys removed over all records.
    pub removed: usize,
    pub dest: PathBuf,
}

/// Shallow copy of `record` without the private keys; remaining keys keep
/// their order.
pub fn redact_record(record: &Map<String, Value>) -> Map<String, Value> {
    record
        .iter()
        .filter(|(k, _)| !PRIVATE_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub fn redact_records(records: &[Value]) -> Result<Vec<Value>, RedactError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| match record {
            Value::Object(map) => Ok(Value::Object(redact_record(map))),
            _ => Err(RedactError::NotAnObject { index }),
        })
        .collect()
}

/// UTF-8 pretty JSON with a 4-space indent; non-ASCII characters are
/// written as is rather than escaped.
pub fn to_pretty_json(records: &[Value]) -> Result<Vec<u8>, RedactError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser).map_err(RedactError::Serialize)?;
    Ok(buf)
}

/// Read `source`, redact every record and write the result to `dest`. The
/// destination is only touched once the whole output is ready in memory.
pub fn prepare_public_json(source: &Path, dest: &Path) -> Result<RedactSummary, RedactError> {
    let raw = std::fs::read_to_string(source).map_err(|e| RedactError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    let data: Value = serde_json::from_str(&raw).map_err(|e| RedactError::Parse {
        path: source.to_path_buf(),
        source: e,
    })?;
    let records = match data {
        Value::Array(records) => records,
        _ => return Err(RedactError::NotAnArray),
    };

    let cleaned = redact_records(&records)?;
    let removed = count_keys(&records) - count_keys(&cleaned);
    let json = to_pretty_json(&cleaned)?;
    tracing::debug!(records = cleaned.len(), removed, "redacted records");

    let write_err = |e: std::io::Error| RedactError::Write {
        path: dest.to_path_buf(),
        source: e,
    };
    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    std::fs::write(dest, json).map_err(write_err)?;

    Ok(RedactSummary {
        records: cleaned.len(),
        removed,
        dest: dest.to_path_buf(),
    })
}

fn count_keys(records: &[Value]) -> usize {
    records
        .iter()
        .filter_map(Value::as_object)
        .map(Map::len)
        .sum()
}
