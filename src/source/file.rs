//! File-based data source.
//!
//! Polls a snapshot JSON file, as written by the coordinator's file output.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use swissknife_types::Snapshot;

use super::DataSource;

/// A data source that reads snapshots from a JSON file.
///
/// Tracks the file's modification time and only returns new data when the
/// file has been updated. Snapshots with an incompatible schema version are
/// rejected.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FileSource {
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

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn read_file(&mut self) -> Option<Snapshot> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                return None;
            }
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) if !snapshot.version.is_compatible() => {
                self.last_error = Some(format!(
                    "Unsupported snapshot version {}.{}",
                    snapshot.version.major, snapshot.version.minor
                ));
                None
            }
            Ok(snapshot) => {
                self.last_error = None;
                Some(snapshot)
            }
            Err(e) => {
                self.last_error = Some(format!("Parse error: {}", e));
                None
            }
        }
    }
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Option<Arc<Snapshot>> {
        let current_modified = self.modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,
            (Some(_), None) => false, // File disappeared, keep what we have
            (Some(last), Some(current)) => current > last,
        };

        if file_changed {
            if let Some(snapshot) = self.read_file() {
                self.last_modified = current_modified;
                return Some(Arc::new(snapshot));
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
    use std::io::Write;
    use swissknife_types::{Reading, SourceId};
    use tempfile::NamedTempFile;

    fn sample_json() -> String {
        let snapshot = Snapshot::builder()
            .tick(3)
            .result(SourceId::currency_usd(), Reading::new(950.5))
            .build();
        serde_json::to_string_pretty(&snapshot).unwrap()
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/snapshot.json");
        assert_eq!(source.path(), Path::new("/tmp/snapshot.json"));
        assert_eq!(source.description(), "file: /tmp/snapshot.json");
        assert!(source.error().is_none());
        assert!(!source.request_refresh());
    }

    #[test]
    fn test_file_source_poll_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());

        let snapshot = source.poll().unwrap();
        assert_eq!(snapshot.tick, 3);
        assert!(snapshot.get(&SourceId::currency_usd()).is_some());

        // Second poll without file change should return None
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/snapshot.json");

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

    #[test]
    fn test_file_source_rejects_future_major_version() {
        let mut file = NamedTempFile::new().unwrap();
        let json = sample_json().replacen("\"major\": 1", "\"major\": 99", 1);
        writeln!(file, "{}", json).unwrap();

        let mut source = FileSource::new(file.path());

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Unsupported snapshot version 99"));
    }
}
