//! Access to source documents.
//!
//! Format strategies never touch storage directly. They enumerate and read
//! documents through a [`DocumentSource`], which may be a local directory, a
//! ZIP archive, or an in-memory set of files supplied by the caller (e.g. from
//! a remote object listing).

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::format::ConvertError;

/// Key of one source document, a `/`-separated path relative to the export root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentHandle {
    key: String,
}

impl DocumentHandle {
    /// Create a handle, normalizing separators.
    pub fn new(key: impl Into<String>) -> Self {
        let key: String = key.into();
        Self {
            key: key.replace('\\', "/").trim_start_matches("./").to_string(),
        }
    }

    /// The full relative key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
    }

    /// Lowercase extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }

    /// Key of the containing folder, empty at the root.
    pub fn parent(&self) -> &str {
        self.key.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// Check if the file has one of the given extensions (case-insensitive).
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension()
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }

    /// Check if the document is hidden or archive metadata.
    pub fn is_hidden(&self) -> bool {
        let lower = self.key.to_lowercase();
        lower.contains("__macosx") || lower.contains("/.") || lower.starts_with('.')
    }
}

impl std::fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// A readable collection of source documents.
pub trait DocumentSource {
    /// Human-readable description of the export root, for messages.
    fn describe(&self) -> String;

    /// All documents, sorted by key, hidden files excluded.
    fn list(&self) -> Result<Vec<DocumentHandle>, ConvertError>;

    /// Raw bytes of one document.
    fn read(&self, handle: &DocumentHandle) -> Result<Vec<u8>, ConvertError>;

    /// Document contents as UTF-8 text.
    fn read_to_string(&self, handle: &DocumentHandle) -> Result<String, ConvertError> {
        let bytes = self.read(handle)?;
        String::from_utf8(bytes).map_err(|_| {
            ConvertError::invalid_format(format!("Document '{}' is not valid UTF-8", handle))
        })
    }

    /// Check if a document with this key exists.
    fn contains(&self, handle: &DocumentHandle) -> bool {
        self.list().is_ok_and(|all| all.contains(handle))
    }
}

/// Documents in a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    /// Open a directory as a source.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ConvertError::source_not_found(root.display().to_string(), None));
        }
        Ok(Self { root })
    }

    /// The export root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self, dir: &Path, out: &mut Vec<DocumentHandle>) -> Result<(), ConvertError> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.walk(&path, out)?;
            } else if let Ok(relative) = path.strip_prefix(&self.root) {
                let handle = DocumentHandle::new(relative.to_string_lossy());
                if !handle.is_hidden() {
                    out.push(handle);
                }
            }
        }
        Ok(())
    }
}

impl DocumentSource for LocalSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list(&self) -> Result<Vec<DocumentHandle>, ConvertError> {
        let mut handles = Vec::new();
        self.walk(&self.root, &mut handles)?;
        handles.sort();
        Ok(handles)
    }

    fn read(&self, handle: &DocumentHandle) -> Result<Vec<u8>, ConvertError> {
        Ok(std::fs::read(self.root.join(handle.key()))?)
    }

    fn contains(&self, handle: &DocumentHandle) -> bool {
        self.root.join(handle.key()).is_file()
    }
}

/// Documents held in memory, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    files: BTreeMap<DocumentHandle, Vec<u8>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    /// Add a document.
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(DocumentHandle::new(key), content.into());
    }

    /// Builder-style [`MemorySource::insert`].
    pub fn with_file(mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(key, content);
        self
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the source holds no documents.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl DocumentSource for MemorySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn list(&self) -> Result<Vec<DocumentHandle>, ConvertError> {
        Ok(self
            .files
            .keys()
            .filter(|h| !h.is_hidden())
            .cloned()
            .collect())
    }

    fn read(&self, handle: &DocumentHandle) -> Result<Vec<u8>, ConvertError> {
        self.files.get(handle).cloned().ok_or_else(|| {
            ConvertError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("'{}' not found in {}", handle, self.name),
            ))
        })
    }

    fn contains(&self, handle: &DocumentHandle) -> bool {
        self.files.contains_key(handle)
    }
}

/// Documents inside a ZIP archive, extracted into memory on open.
#[derive(Debug, Clone)]
pub struct ZipSource {
    entries: MemorySource,
}

impl ZipSource {
    /// Open a ZIP file on disk.
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        log::info!("Opening ZIP export: {:?}", path);
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Read an archive from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R, name: &str) -> Result<Self, ConvertError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = MemorySource::new(name);

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let entry_name = file.name().to_string();
            if DocumentHandle::new(entry_name.as_str()).is_hidden() {
                log::trace!("Skipping hidden ZIP entry: {}", entry_name);
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.insert(entry_name, data);
        }

        log::debug!("Read {} entries from ZIP '{}'", entries.len(), name);
        Ok(Self { entries })
    }

    /// Check if a path names a ZIP file.
    pub fn is_zip_path(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    }
}

impl DocumentSource for ZipSource {
    fn describe(&self) -> String {
        self.entries.describe()
    }

    fn list(&self) -> Result<Vec<DocumentHandle>, ConvertError> {
        self.entries.list()
    }

    fn read(&self, handle: &DocumentHandle) -> Result<Vec<u8>, ConvertError> {
        self.entries.read(handle)
    }

    fn contains(&self, handle: &DocumentHandle) -> bool {
        self.entries.contains(handle)
    }
}

/// Open an export root: a ZIP file or a directory.
pub fn open_export(path: &Path) -> Result<Box<dyn DocumentSource>, ConvertError> {
    if path.is_file() && ZipSource::is_zip_path(path) {
        Ok(Box::new(ZipSource::open(path)?))
    } else {
        Ok(Box::new(LocalSource::new(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_handle_parts() {
        let handle = DocumentHandle::new("ds1\\ann\\img.01.jpg.json");
        assert_eq!(handle.key(), "ds1/ann/img.01.jpg.json");
        assert_eq!(handle.file_name(), "img.01.jpg.json");
        assert_eq!(handle.stem(), "img.01.jpg");
        assert_eq!(handle.extension().as_deref(), Some("json"));
        assert_eq!(handle.parent(), "ds1/ann");
    }

    #[test]
    fn test_hidden_handles() {
        assert!(DocumentHandle::new("__MACOSX/a.json").is_hidden());
        assert!(DocumentHandle::new("dir/.DS_Store").is_hidden());
        assert!(!DocumentHandle::new("dir/a.json").is_hidden());
    }

    #[test]
    fn test_memory_source_is_sorted() {
        let source = MemorySource::new("mem")
            .with_file("b.json", "{}")
            .with_file("a.json", "{}");
        let keys: Vec<String> = source
            .list()
            .unwrap()
            .iter()
            .map(|h| h.key().to_string())
            .collect();
        assert_eq!(keys, ["a.json", "b.json"]);
        assert!(source.read(&DocumentHandle::new("c.json")).is_err());
    }

    #[test]
    fn test_local_source_walks_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/x.xml"), "<a/>").unwrap();
        std::fs::write(dir.path().join("y.xml"), "<b/>").unwrap();

        let source = LocalSource::new(dir.path()).unwrap();
        let keys: Vec<String> = source
            .list()
            .unwrap()
            .iter()
            .map(|h| h.key().to_string())
            .collect();
        assert_eq!(keys, ["sub/x.xml", "y.xml"]);
        assert_eq!(
            source.read_to_string(&DocumentHandle::new("y.xml")).unwrap(),
            "<b/>"
        );
    }

    #[test]
    fn test_missing_directory() {
        let err = LocalSource::new("/definitely/not/here").unwrap_err();
        assert!(matches!(err, ConvertError::SourceNotFound { .. }));
    }

    #[test]
    fn test_zip_source() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("export/a.json", options).unwrap();
            writer.write_all(b"[]").unwrap();
            writer.start_file("__MACOSX/export/._a.json", options).unwrap();
            writer.write_all(b"junk").unwrap();
            writer.finish().unwrap();
        }
        buffer.set_position(0);

        let source = ZipSource::from_reader(buffer, "export.zip").unwrap();
        let handles = source.list().unwrap();
        assert_eq!(handles, vec![DocumentHandle::new("export/a.json")]);
        assert_eq!(source.read(&handles[0]).unwrap(), b"[]");
    }
}
