//! Storage backends for tasker documents.
//!
//! Both the credential store and the task lists persist whole JSON documents
//! by name (`users.json`, `<user>_tasks.json`). A backend only has to read and
//! replace those documents:
//! - `FileBackend` - files in a data directory, replaced atomically
//! - `MemoryBackend` - an in-process map, used by tests

use crate::Result;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for storage backends that persist named JSON documents.
pub trait StorageBackend {
    /// Read a whole document. Returns `None` if it has never been written.
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Replace a whole document.
    fn write(&mut self, name: &str, contents: &str) -> Result<()>;

    /// Storage location description (for logging).
    fn location(&self) -> String;
}

/// Documents stored as files under a single directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write to a temp file in the same directory, fsync, then rename over
    /// the target so readers never see a truncated document.
    fn write_atomic(&self, final_path: &Path, contents: &str) -> io::Result<()> {
        let file_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path =
            final_path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));

        let result = write_then_rename(&temp_path, final_path, contents);
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}

fn write_then_rename(temp_path: &Path, final_path: &Path, contents: &str) -> io::Result<()> {
    let mut file = fs::File::create(temp_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, final_path)
}

impl StorageBackend for FileBackend {
    fn read(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(name)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        if !self.root.as_os_str().is_empty() {
            fs::create_dir_all(&self.root)?;
        }
        let path = self.path_for(name);
        self.write_atomic(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote document");
        Ok(())
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

/// In-memory documents.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    docs: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.docs.get(name).cloned())
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        self.docs.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
