//! Audit files listing identifiers.
//!
//! An audit file is a UTF-8 JSON array of identifiers, written for the
//! operator and never read back. File names carry a random token per
//! write; the file is created with create-new semantics, so an existing
//! file is never overwritten and a name collision fails the write.

use crate::config::DEFAULT_AUDIT_PREFIX;
use crate::error::{EngineError, EngineResult};
use mongotransfer_store::IdentifierSet;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Suffix of the destination snapshot audit file.
pub const SNAPSHOT_SUFFIX: &str = ".json";

/// Suffix of the residual (destination-only) audit file.
pub const RESIDUAL_SUFFIX: &str = ".out.json";

/// Writes identifier sets to uniquely named JSON files.
#[derive(Debug, Clone)]
pub struct AuditWriter {
    dir: PathBuf,
    prefix: String,
}

impl AuditWriter {
    /// Creates a writer for the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_AUDIT_PREFIX.to_string(),
        }
    }

    /// Sets the file name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The directory audit files go to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `ids` to `<dir>/<prefix>.<token><suffix>` and returns the
    /// absolute path of the new file.
    pub fn write(&self, ids: &IdentifierSet, suffix: &str) -> EngineResult<PathBuf> {
        let token = Uuid::new_v4().simple().to_string();
        let path = self.dir.join(format!("{}.{}{}", self.prefix, token, suffix));
        let path = std::path::absolute(&path).map_err(|source| EngineError::Audit {
            path: path.clone(),
            source,
        })?;

        let io_err = |source| EngineError::Audit {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, ids)?;
        writer.flush().map_err(io_err)?;
        writer.get_ref().sync_all().map_err(io_err)?;

        debug!(path = %path.display(), count = ids.len(), "wrote audit file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongotransfer_store::Identifier;
    use tempfile::tempdir;

    fn ids(values: &[i32]) -> IdentifierSet {
        values.iter().map(|v| Identifier::new(*v)).collect()
    }

    #[test]
    fn writes_json_array() {
        let dir = tempdir().unwrap();
        let writer = AuditWriter::new(dir.path());

        let path = writer.write(&ids(&[3, 1, 2]), SNAPSHOT_SUFFIX).unwrap();
        assert!(path.is_absolute());

        let content = std::fs::read_to_string(&path).unwrap();
        let mut parsed: Vec<i64> = serde_json::from_str(&content).unwrap();
        parsed.sort();
        assert_eq!(parsed, vec![1, 2, 3]);
    }

    #[test]
    fn file_name_shape() {
        let dir = tempdir().unwrap();
        let writer = AuditWriter::new(dir.path()).with_prefix("mirror");

        let path = writer.write(&ids(&[1]), RESIDUAL_SUFFIX).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("mirror."));
        assert!(name.ends_with(".out.json"));
        // prefix + '.' + 32 hex chars + suffix
        assert_eq!(name.len(), "mirror.".len() + 32 + ".out.json".len());
    }

    #[test]
    fn never_reuses_a_name() {
        let dir = tempdir().unwrap();
        let writer = AuditWriter::new(dir.path());

        let first = writer.write(&ids(&[1]), SNAPSHOT_SUFFIX).unwrap();
        let second = writer.write(&ids(&[1]), SNAPSHOT_SUFFIX).unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn empty_set_is_empty_array() {
        let dir = tempdir().unwrap();
        let path = AuditWriter::new(dir.path())
            .write(&IdentifierSet::new(), SNAPSHOT_SUFFIX)
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
    }

    #[test]
    fn missing_directory_fails() {
        let dir = tempdir().unwrap();
        let writer = AuditWriter::new(dir.path().join("does-not-exist"));
        let err = writer.write(&ids(&[1]), SNAPSHOT_SUFFIX).unwrap_err();
        assert!(matches!(err, EngineError::Audit { .. }));
    }
}
