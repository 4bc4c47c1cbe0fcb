//! File-based data source.
//!
//! Reads a saved historian response from a JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::{json, Value};

use afdd_historian::query::values_from_result;
use afdd_historian::{parse_query_response, HistorianValues};

use super::DataSource;

/// A data source that reads historian values from a JSON file.
///
/// The file may hold a full JSON-RPC response
/// (`{"result": {"values": {...}}}`), a bare result (`{"values": {...}}`)
/// or just the topic map.
///
/// The source tracks the file's modification time and only returns
/// new data when the file has been updated.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            last_modified: None,
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file once, regardless of its modification time.
    pub fn load(&mut self) -> Result<HistorianValues, String> {
        let result = fs::read_to_string(&self.path)
            .map_err(|e| format!("Read error: {}", e))
            .and_then(|content| parse_document(&content));
        self.last_error = result.as_ref().err().cloned();
        result
    }

    fn modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }
}

/// Parse any of the accepted document shapes.
fn parse_document(content: &str) -> Result<HistorianValues, String> {
    let doc: Value =
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;

    if doc.get("result").is_some() || doc.get("error").is_some() {
        return parse_query_response(content).map_err(|e| format!("Parse error: {}", e));
    }
    if doc.get("values").is_some() {
        return Ok(values_from_result(&doc));
    }
    if doc.is_object() {
        return Ok(values_from_result(&json!({ "values": doc })));
    }
    Err("Parse error: expected a JSON object".to_string())
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Option<HistorianValues> {
        let current_modified = self.modified_time();

        // Check if file has been modified since last read
        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(last), Some(current)) => current > last,
        };

        if file_changed {
            if let Ok(values) = self.load() {
                self.last_modified = current_modified;
                return Some(values);
            }
        }

        None
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};
    use tempfile::NamedTempFile;

    const DX: &str = "Economizer_RCx/PNNL/BUILDING1/AHU1/Temperature Sensor Dx/diagnostic message";

    fn envelope() -> String {
        format!(
            r#"{{"jsonrpc": "2.0", "id": "1", "result": {{"values": {{
                "{}": [["2024-01-01T10:15:00", 0.0], ["2024-01-01T11:15:00", 21.1]]
            }}}}}}"#,
            DX
        )
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/historian.json");
        assert_eq!(source.path(), Path::new("/tmp/historian.json"));
        assert_eq!(source.description(), "file: /tmp/historian.json");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_file_source_poll_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", envelope()).unwrap();

        let mut source = FileSource::new(file.path());

        // First poll should return data
        let values = source.poll().unwrap();
        assert_eq!(values[DX].len(), 2);

        // Second poll without file change should return None
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_file_source_detects_changes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", envelope()).unwrap();

        let mut source = FileSource::new(file.path());
        let _ = source.poll();

        std::thread::sleep(std::time::Duration::from_millis(10));
        file.as_file().set_len(0).unwrap();
        file.rewind().unwrap();
        writeln!(file, r#"{{"values": {{"{}": []}}}}"#, DX).unwrap();
        file.flush().unwrap();

        // Coarse mtime resolution can hide the change on some filesystems.
        if let Some(values) = source.poll() {
            assert!(values[DX].is_empty());
        }
    }

    #[test]
    fn test_document_shapes() {
        let bare = format!(r#"{{"{}": [["2024-01-01T10:15:00", 0]]}}"#, DX);
        assert_eq!(parse_document(&bare).unwrap().len(), 1);

        let result = format!(r#"{{"values": {{"{}": []}}}}"#, DX);
        assert_eq!(parse_document(&result).unwrap().len(), 1);

        let rpc_error = r#"{"error": {"code": 401, "message": "unauthorized"}}"#;
        assert!(parse_document(rpc_error).unwrap_err().contains("unauthorized"));

        assert!(parse_document("[1, 2]").is_err());
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/historian.json");

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Read error"));
    }

    #[test]
    fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Parse error"));
    }
}
