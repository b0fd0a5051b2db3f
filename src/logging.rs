//! JSON line-delimited logging.
//!
//! Every record is a single JSON object with `timestamp`, `kind` and
//! `payload` fields, appended to `<log_dir>/food_gru.jsonl`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

const DEFAULT_LOG_DIR: &str = "logs";
const LOG_FILE: &str = "food_gru.jsonl";

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Sets the log directory. Only the first call has an effect.
pub fn init<P: AsRef<Path>>(dir: P) {
    let _ = LOG_DIR.set(dir.as_ref().to_path_buf());
}

/// Directory records are written to.
pub fn log_dir() -> &'static Path {
    LOG_DIR.get_or_init(|| PathBuf::from(DEFAULT_LOG_DIR))
}

/// Appends one record to the log file.
pub fn log_event<T: Serialize>(kind: &str, payload: &T) -> io::Result<()> {
    write_record(log_dir(), kind, payload)
}

/// Appends one record to the log file inside `dir`.
pub fn write_record<T: Serialize>(dir: &Path, kind: &str, payload: &T) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let record = json!({
        "timestamp": Utc::now().to_rfc3339(),
        "kind": kind,
        "payload": payload,
    });
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;
    let line = serde_json::to_string(&record)?;
    writeln!(file, "{line}")
}

/// Logs an event, reporting a failed write on stderr instead of failing.
pub fn record<T: Serialize>(kind: &str, payload: &T) {
    if let Err(err) = log_event(kind, payload) {
        eprintln!("failed to log {kind}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "first", &json!({ "value": 1 })).unwrap();
        write_record(dir.path(), "second", &json!({ "value": 2 })).unwrap();

        let contents = fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed["kind"], "second");
        assert_eq!(parsed["payload"]["value"], 2);
        assert!(parsed["timestamp"].is_string());
    }
}
