/// Document loading through an injected reader.
///
/// The engine never opens files itself: all I/O goes through the
/// [`TokenReader`] trait so the whole pipeline runs against an in-memory
/// collaborator in tests and embeddings. [`FsReader`] is the production
/// implementation; [`MemoryReader`] the test double.
///
/// [`DocumentLoader`] memoizes parsed documents by canonical path for the
/// lifetime of one bundle invocation.
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::manifest::Manifest;
use crate::model::TokenDocument;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failure to load a document or manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The reader could not produce the file's contents.
    Io {
        /// The path that failed.
        path: String,
        /// The underlying error message.
        detail: String,
    },
    /// The contents are not valid JSON.
    Parse {
        /// The path that failed.
        path: String,
        /// serde_json's message, which includes line and column.
        detail: String,
    },
    /// The JSON decoded but does not have the expected shape.
    Shape {
        /// The path that failed.
        path: String,
        /// What was wrong with the shape.
        detail: String,
    },
}

impl LoadError {
    /// The path the error refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } | Self::Shape { path, .. } => path,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, detail } => write!(f, "cannot read {path}: {detail}"),
            Self::Parse { path, detail } => write!(f, "cannot parse {path}: {detail}"),
            Self::Shape { path, detail } => write!(f, "unexpected shape in {path}: {detail}"),
        }
    }
}

impl std::error::Error for LoadError {}

// ---------------------------------------------------------------------------
// Reader trait
// ---------------------------------------------------------------------------

/// The engine's only way of reading input.
///
/// Implementations must be shareable as read-only references across workers
/// (`Send + Sync`); the loader cache, not the reader, is the per-worker
/// state.
pub trait TokenReader: Send + Sync {
    /// Reads the entire file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] when the path cannot be read.
    fn read_text(&self, path: &str) -> Result<String, LoadError>;

    /// Returns `true` if `path` exists.
    fn exists(&self, path: &str) -> bool;

    /// Joins `rel` onto `base` and normalizes the result to the canonical
    /// spelling used as a cache key.
    fn join(&self, base: &str, rel: &str) -> String;
}

/// Lexically normalizes a path: `.` segments drop, `..` pops where possible.
///
/// Purely textual so that [`MemoryReader`] keys behave like filesystem
/// paths without any filesystem present.
pub fn normalize_path(path: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                match out.last().map(String::as_str) {
                    Some("..") | None => out.push("..".to_owned()),
                    Some(_) => {
                        out.pop();
                    }
                }
            }
            Component::RootDir => out.push(String::new()),
            Component::Prefix(p) => out.push(p.as_os_str().to_string_lossy().into_owned()),
            Component::Normal(seg) => out.push(seg.to_string_lossy().into_owned()),
        }
    }
    if out.is_empty() {
        ".".to_owned()
    } else {
        out.join("/")
    }
}

/// The directory portion of `path` (empty for bare file names).
pub fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// FsReader
// ---------------------------------------------------------------------------

/// Filesystem-backed reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl TokenReader for FsReader {
    fn read_text(&self, path: &str) -> Result<String, LoadError> {
        std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_owned(),
            detail: e.to_string(),
        })
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn join(&self, base: &str, rel: &str) -> String {
        if Path::new(rel).is_absolute() {
            return normalize_path(rel);
        }
        let joined: PathBuf = Path::new(base).join(rel);
        normalize_path(&joined.to_string_lossy())
    }
}

// ---------------------------------------------------------------------------
// MemoryReader
// ---------------------------------------------------------------------------

/// In-memory reader keyed by normalized path. The test collaborator.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<String, String>,
}

impl MemoryReader {
    /// Creates an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, normalizing the path.
    pub fn insert(&mut self, path: &str, contents: &str) -> &mut Self {
        self.files
            .insert(normalize_path(path), contents.to_owned());
        self
    }
}

impl TokenReader for MemoryReader {
    fn read_text(&self, path: &str) -> Result<String, LoadError> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| LoadError::Io {
                path: path.to_owned(),
                detail: "no such file".to_owned(),
            })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn join(&self, base: &str, rel: &str) -> String {
        if base.is_empty() {
            normalize_path(rel)
        } else {
            normalize_path(&format!("{base}/{rel}"))
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentLoader
// ---------------------------------------------------------------------------

/// Parses and memoizes token documents through a [`TokenReader`].
///
/// The cache lives for one bundle invocation: each worker holds its own
/// loader over a shared reader.
pub struct DocumentLoader<'r> {
    reader: &'r dyn TokenReader,
    cache: HashMap<String, TokenDocument>,
}

impl<'r> DocumentLoader<'r> {
    /// Creates a loader with an empty cache.
    pub fn new(reader: &'r dyn TokenReader) -> Self {
        Self {
            reader,
            cache: HashMap::new(),
        }
    }

    /// The underlying reader.
    pub fn reader(&self) -> &dyn TokenReader {
        self.reader
    }

    /// Loads (or re-uses) the document at `path`. A top-level `$schema`
    /// member is stripped on parse.
    ///
    /// # Errors
    ///
    /// [`LoadError::Io`] when unreadable, [`LoadError::Parse`] when not
    /// JSON, [`LoadError::Shape`] when the root is not an object.
    pub fn read_document(&mut self, path: &str) -> Result<TokenDocument, LoadError> {
        let key = normalize_path(path);
        if let Some(doc) = self.cache.get(&key) {
            return Ok(doc.clone());
        }
        tracing::debug!(path = %key, "loading token document");
        let text = self.reader.read_text(&key)?;
        // Decode in two steps so a syntax failure and a shape failure
        // surface as different error kinds.
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LoadError::Parse {
                path: key.clone(),
                detail: e.to_string(),
            })?;
        let mut doc: TokenDocument =
            serde_json::from_value(value).map_err(|e| LoadError::Shape {
                path: key.clone(),
                detail: e.to_string(),
            })?;
        doc.root.shift_remove(crate::model::KEY_SCHEMA);
        self.cache.insert(key, doc.clone());
        Ok(doc)
    }

    /// Loads and validates the manifest at `path`.
    ///
    /// # Errors
    ///
    /// [`LoadError::Io`]/[`LoadError::Parse`] as for documents;
    /// [`LoadError::Shape`] for serde mismatches and for semantic manifest
    /// violations ([`crate::manifest::ManifestError`]).
    pub fn read_manifest(&mut self, path: &str) -> Result<Manifest, LoadError> {
        let key = normalize_path(path);
        tracing::debug!(path = %key, "loading manifest");
        let text = self.reader.read_text(&key)?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LoadError::Parse {
                path: key.clone(),
                detail: e.to_string(),
            })?;
        let manifest: Manifest =
            serde_json::from_value(value).map_err(|e| LoadError::Shape {
                path: key.clone(),
                detail: e.to_string(),
            })?;
        manifest.validate().map_err(|e| LoadError::Shape {
            path: key,
            detail: e.to_string(),
        })?;
        Ok(manifest)
    }

    /// Number of cached documents (test hook).
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::io::Write as _;

    use super::*;

    // --- normalize_path / parent_dir ---

    #[test]
    fn normalize_drops_cur_dir_segments() {
        assert_eq!(normalize_path("./a/./b.json"), "a/b.json");
    }

    #[test]
    fn normalize_pops_parent_segments() {
        assert_eq!(normalize_path("a/b/../c.json"), "a/c.json");
        assert_eq!(normalize_path("a/../../c.json"), "../c.json");
    }

    #[test]
    fn normalize_empty_is_dot() {
        assert_eq!(normalize_path(""), ".");
        assert_eq!(normalize_path("."), ".");
    }

    #[test]
    fn parent_dir_of_nested_path() {
        assert_eq!(parent_dir("tokens/core.json"), "tokens");
        assert_eq!(parent_dir("core.json"), "");
    }

    // --- MemoryReader ---

    #[test]
    fn memory_reader_round_trip() {
        let mut reader = MemoryReader::new();
        reader.insert("./tokens/a.json", "{}");
        assert!(reader.exists("tokens/a.json"));
        assert_eq!(reader.read_text("tokens/a.json").expect("read"), "{}");
        assert!(!reader.exists("tokens/b.json"));
    }

    #[test]
    fn memory_reader_join_resolves_relative() {
        let reader = MemoryReader::new();
        assert_eq!(reader.join("tokens", "./a.json"), "tokens/a.json");
        assert_eq!(reader.join("tokens/themes", "../base.json"), "tokens/base.json");
        assert_eq!(reader.join("", "a.json"), "a.json");
    }

    // --- FsReader ---

    #[test]
    fn fs_reader_reads_real_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        let mut f = std::fs::File::create(&path).expect("create");
        f.write_all(b"{\"a\":{\"$value\":1}}").expect("write");
        let reader = FsReader;
        let text = reader
            .read_text(&path.to_string_lossy())
            .expect("read_text");
        assert!(text.contains("$value"));
        assert!(reader.exists(&path.to_string_lossy()));
    }

    #[test]
    fn fs_reader_missing_file_is_io_error() {
        let reader = FsReader;
        let err = reader.read_text("/no/such/file.json").expect_err("io");
        assert!(matches!(err, LoadError::Io { .. }));
    }

    // --- DocumentLoader ---

    fn loader_with(files: &[(&str, &str)]) -> MemoryReader {
        let mut reader = MemoryReader::new();
        for (path, contents) in files {
            reader.insert(path, contents);
        }
        reader
    }

    #[test]
    fn read_document_strips_schema() {
        let reader = loader_with(&[(
            "a.json",
            r#"{"$schema": "https://example.com/s.json", "t": {"$value": 1}}"#,
        )]);
        let mut loader = DocumentLoader::new(&reader);
        let doc = loader.read_document("a.json").expect("document");
        assert!(!doc.root.contains_key("$schema"));
        assert!(doc.root.contains_key("t"));
    }

    #[test]
    fn read_document_caches_by_canonical_path() {
        let reader = loader_with(&[("tokens/a.json", r#"{"t": {"$value": 1}}"#)]);
        let mut loader = DocumentLoader::new(&reader);
        loader.read_document("tokens/a.json").expect("first");
        loader.read_document("./tokens/a.json").expect("second");
        loader
            .read_document("tokens/../tokens/a.json")
            .expect("third");
        assert_eq!(loader.cached_count(), 1, "one cache entry per canonical path");
    }

    #[test]
    fn read_document_invalid_json_is_parse_error() {
        let reader = loader_with(&[("bad.json", "{not json")]);
        let mut loader = DocumentLoader::new(&reader);
        let err = loader.read_document("bad.json").expect_err("parse");
        assert!(matches!(err, LoadError::Parse { .. }));
        assert_eq!(err.path(), "bad.json");
    }

    #[test]
    fn read_document_non_object_root_is_shape_error() {
        let reader = loader_with(&[("arr.json", "[1,2,3]")]);
        let mut loader = DocumentLoader::new(&reader);
        let err = loader.read_document("arr.json").expect_err("shape");
        assert!(matches!(err, LoadError::Shape { .. }));
    }

    #[test]
    fn read_manifest_happy_path() {
        let reader = loader_with(&[(
            "manifest.json",
            r#"{"sets": [{"values": ["a.json"]}], "modifiers": {}}"#,
        )]);
        let mut loader = DocumentLoader::new(&reader);
        let manifest = loader.read_manifest("manifest.json").expect("manifest");
        assert_eq!(manifest.base_files(), ["a.json"]);
    }

    #[test]
    fn read_manifest_semantic_violation_is_shape_error() {
        let reader = loader_with(&[("manifest.json", r#"{"sets": []}"#)]);
        let mut loader = DocumentLoader::new(&reader);
        let err = loader.read_manifest("manifest.json").expect_err("shape");
        assert!(matches!(err, LoadError::Shape { .. }));
        assert!(err.to_string().contains("sets"));
    }

    #[test]
    fn read_manifest_missing_file_is_io_error() {
        let reader = MemoryReader::new();
        let mut loader = DocumentLoader::new(&reader);
        let err = loader.read_manifest("manifest.json").expect_err("io");
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
