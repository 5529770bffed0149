//! The document store the engine reads from and writes to.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::types::{DocumentKind, DocumentRef};

/// Narrow view of the host's document storage.
pub trait Vault {
    /// Name of the note the user is focused on, used to give a bare anchor
    /// a host note. `None` when nothing is focused.
    fn contextual_document_name(&self) -> Option<String>;

    /// Every document in the corpus, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus cannot be enumerated.
    fn list_documents(&self) -> Result<Vec<DocumentRef>, Error>;

    /// Put `entry` in front of the log at `path`, creating the log if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or written.
    fn prepend_to_log(&self, path: &Path, entry: &str) -> Result<(), Error>;

    /// Raw content of a document.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentNotFound` if the document does not exist.
    fn read_document(&self, path: &Path) -> Result<String, Error>;

    /// Overwrite a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn write_document(&self, path: &Path, content: &str) -> Result<(), Error>;
}

/// A vault rooted at a directory on disk.
pub struct FsVault {
    /// Scan filters and the log location.
    config: Config,
    /// Note the user is working in, if given.
    context: Option<String>,
    /// Vault root directory.
    root: PathBuf,
}

impl FsVault {
    /// Open the vault at `root`.
    pub const fn new(root: PathBuf, config: Config, context: Option<String>) -> Self {
        return Self { config, context, root };
    }
}

impl Vault for FsVault {
    fn contextual_document_name(&self) -> Option<String> {
        return self.context.clone();
    }

    fn list_documents(&self) -> Result<Vec<DocumentRef>, Error> {
        let mut documents = Vec::new();

        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_file())
        {
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
            let Some(kind) = DocumentKind::for_path(&relative) else {
                continue;
            };
            if relative == self.config.log_path || !self.config.should_scan(&relative.to_string_lossy()) {
                continue;
            }
            documents.push(DocumentRef { kind, path: relative });
        }

        return Ok(documents);
    }

    fn prepend_to_log(&self, path: &Path, entry: &str) -> Result<(), Error> {
        let log_path = self.root.join(path);
        let existing = match std::fs::read_to_string(&log_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::Io(e)),
        };
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&log_path, format!("{entry}{existing}"))?;
        return Ok(());
    }

    fn read_document(&self, path: &Path) -> Result<String, Error> {
        return match std::fs::read_to_string(self.root.join(path)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::DocumentNotFound { path: path.to_path_buf() })
            },
            Err(e) => Err(Error::Io(e)),
            Ok(c) => Ok(c),
        };
    }

    fn write_document(&self, path: &Path, content: &str) -> Result<(), Error> {
        std::fs::write(self.root.join(path), content)?;
        return Ok(());
    }
}
