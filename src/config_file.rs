//! Reading and atomically rewriting `config.toml`.
//!
//! Uses `toml_edit::DocumentMut` rather than plain `toml` so that comments
//! and key ordering a user has hand-edited into the file survive a
//! mutation made through the control plane.

use std::path::{Path, PathBuf};

use relay_core::config::SnapshotInner;
use toml_edit::DocumentMut;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigFileError {
    #[error("reading {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("parsing {path}: {source}")]
    Parse { path: PathBuf, source: toml_edit::TomlError },
    #[error("serializing configuration: {0}")]
    Serialize(#[from] toml_edit::ser::Error),
    #[error("writing {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Load `config.toml`. A missing file is not an error: every section falls
/// back to its `#[derive(Default)]` value.
pub(crate) fn load(path: &Path) -> Result<SnapshotInner, ConfigFileError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(SnapshotInner::default()),
        Err(err) => {
            return Err(ConfigFileError::Read {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };

    toml_edit::de::from_str(&text).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist `snapshot`, merging it into the existing document so untouched
/// tables keep their formatting, then writing it via a temp-file-then-rename
/// so a crash mid-write never leaves a half-written `config.toml`.
pub(crate) fn store(path: &Path, snapshot: &SnapshotInner) -> Result<(), ConfigFileError> {
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    let mut doc = existing.parse::<DocumentMut>().unwrap_or_default();

    let rendered = toml_edit::ser::to_document(snapshot)?;
    for (key, item) in rendered.iter() {
        doc[key] = item.clone();
    }

    write_atomically(path, doc.to_string().as_bytes())
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), ConfigFileError> {
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, contents).map_err(|source| ConfigFileError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| ConfigFileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let snapshot = load(&path).unwrap();
        assert_eq!(snapshot, SnapshotInner::default());
    }

    #[test]
    fn round_trips_through_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut snapshot = SnapshotInner::default();
        snapshot.general.base_topic = "custom/".to_string();
        snapshot.broker.host = "broker.local".to_string();

        store(&path, &snapshot).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.general.base_topic, "custom/");
        assert_eq!(loaded.broker.host, "broker.local");
    }

    #[test]
    fn store_preserves_unrelated_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# a note to self\n[general]\nbase_topic = \"myrelay/\"\n").unwrap();

        let mut snapshot = load(&path).unwrap();
        snapshot.general.base_topic = "changed/".to_string();
        store(&path, &snapshot).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("# a note to self"));
        assert!(text.contains("changed/"));
    }
}
