//! Staged input files
//!
//! Each run gets its own uniquely named JSON file. The file is removed
//! explicitly after the run, and by `Drop` on any path that skips that
//! (panic, dropped future).

use serde_json::Value;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::{Builder, TempPath};
use tracing::warn;

const STAGED_PREFIX: &str = "raytrace-";
const STAGED_SUFFIX: &str = ".json";

/// Request document written to a private temp file
#[derive(Debug)]
pub struct StagedArtifact {
    path: TempPath,
}

impl StagedArtifact {
    /// Serialize `request` (two-space indented) into a new file under `dir`.
    /// The write handle is closed before returning so the child can open the file.
    pub fn create(dir: &Path, request: &Value) -> io::Result<Self> {
        let file = Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(STAGED_SUFFIX)
            .tempfile_in(dir)?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, request)?;
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, logging instead of failing if removal goes wrong.
    pub fn cleanup(self, request_id: &str) {
        let staged = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            warn!(
                op = "staging.cleanup_failed",
                request_id = %request_id,
                path = %staged.display(),
                error = %e,
                "Failed to remove staged input"
            );
        }
    }
}

/// True if `name` looks like a file this module creates
pub fn is_staged_file_name(name: &str) -> bool {
    name.starts_with(STAGED_PREFIX) && name.ends_with(STAGED_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn staged_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| is_staged_file_name(n))
            .collect()
    }

    #[test]
    fn test_create_writes_pretty_json() {
        let tmp = TempDir::new().unwrap();
        let request = json!({ "receiver_planes": { "p": { "width": 1.0 } }, "polygons": [] });

        let artifact = StagedArtifact::create(tmp.path(), &request).unwrap();
        let text = std::fs::read_to_string(artifact.path()).unwrap();

        assert!(text.contains("\n  \"polygons\""), "expected indented output: {}", text);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, request);

        let name = artifact.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(is_staged_file_name(&name), "unexpected name {}", name);
    }

    #[test]
    fn test_cleanup_removes_file() {
        let tmp = TempDir::new().unwrap();
        let artifact = StagedArtifact::create(tmp.path(), &json!({})).unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());

        artifact.cleanup("test");
        assert!(!path.exists());
        assert!(staged_files(tmp.path()).is_empty());
    }

    #[test]
    fn test_cleanup_of_vanished_file_is_logged_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let artifact = StagedArtifact::create(tmp.path(), &json!({})).unwrap();
        std::fs::remove_file(artifact.path()).unwrap();

        artifact.cleanup("test");
        assert!(staged_files(tmp.path()).is_empty());
    }

    #[test]
    fn test_drop_removes_file() {
        let tmp = TempDir::new().unwrap();
        let path = {
            let artifact = StagedArtifact::create(tmp.path(), &json!({ "a": 1 })).unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_names() {
        let tmp = TempDir::new().unwrap();
        let a = StagedArtifact::create(tmp.path(), &json!({})).unwrap();
        let b = StagedArtifact::create(tmp.path(), &json!({})).unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(staged_files(tmp.path()).len(), 2);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(StagedArtifact::create(&missing, &json!({})).is_err());
    }
}
