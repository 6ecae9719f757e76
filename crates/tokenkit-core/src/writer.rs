/// Output writing through an injected writer.
///
/// Mirrors the reader seam in [`crate::loader`]: the bundler hands finished
/// documents to a [`TokenWriter`] and never touches the filesystem itself.
/// [`FsWriter`] supports atomic replace (write-then-rename) and `.bak`
/// backups; [`MemoryWriter`] collects output for tests.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failure to write an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteError {
    /// The path that failed.
    pub path: String,
    /// The underlying error message.
    pub detail: String,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot write {}: {}", self.path, self.detail)
    }
}

impl std::error::Error for WriteError {}

// ---------------------------------------------------------------------------
// Writer trait
// ---------------------------------------------------------------------------

/// Options for one write.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Write to a temporary file and rename over the target, so readers
    /// never observe a half-written file.
    pub atomic: bool,
    /// Keep the previous contents as `<path>.bak` before replacing.
    pub backup: bool,
}

/// The engine's only way of producing output.
pub trait TokenWriter: Send + Sync {
    /// Writes `bytes` to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the output cannot be produced.
    fn write_bytes(&self, path: &str, bytes: &[u8], opts: &WriteOptions) -> Result<(), WriteError>;
}

// ---------------------------------------------------------------------------
// FsWriter
// ---------------------------------------------------------------------------

/// Filesystem-backed writer. Parent directories are created on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl TokenWriter for FsWriter {
    fn write_bytes(&self, path: &str, bytes: &[u8], opts: &WriteOptions) -> Result<(), WriteError> {
        let target = Path::new(path);
        let to_err = |e: std::io::Error| WriteError {
            path: path.to_owned(),
            detail: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(to_err)?;
            }
        }

        if opts.backup && target.exists() {
            let backup_path = format!("{path}.bak");
            std::fs::copy(target, &backup_path).map_err(to_err)?;
        }

        if opts.atomic {
            let tmp_path = format!("{path}.tmp");
            std::fs::write(&tmp_path, bytes).map_err(to_err)?;
            std::fs::rename(&tmp_path, target).map_err(to_err)?;
        } else {
            std::fs::write(target, bytes).map_err(to_err)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryWriter
// ---------------------------------------------------------------------------

/// In-memory writer for tests and embeddings.
///
/// Interior mutability keeps the trait object shareable; the mutex is
/// uncontended in the single-threaded bundle path.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything written so far.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.files
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// The contents written to `path`, as UTF-8 text.
    pub fn text(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .ok()
            .and_then(|guard| guard.get(path).cloned())
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }
}

impl TokenWriter for MemoryWriter {
    fn write_bytes(&self, path: &str, bytes: &[u8], _opts: &WriteOptions) -> Result<(), WriteError> {
        let mut guard = self.files.lock().map_err(|_| WriteError {
            path: path.to_owned(),
            detail: "writer mutex poisoned".to_owned(),
        })?;
        guard.insert(path.to_owned(), bytes.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
