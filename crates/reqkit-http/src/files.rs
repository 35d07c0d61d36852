//! Uploaded files.
//!
//! Multipart file parts are collected into a [`FileRegistry`] keyed by field
//! name. A field keeps the cardinality it arrived with: one part is a single
//! file, two or more are an ordered list. Parts over the in-memory threshold
//! live in a [`NamedTempFile`] that is removed when the registry is dropped.
//!
//! [`UploadedFile`] is the per-file view handed to callers. It reads lazily,
//! reopening the spill file on first read, and can copy the full content to
//! a directory under a generated or a fixed name.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use bytes::Bytes;
use reqkit_model::{Cardinality, FileError};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::multipart::MultipartPart;

/// Where an uploaded file's bytes live.
#[derive(Debug)]
pub enum FileData {
    /// Small uploads stay in the request buffer.
    InMemory(Bytes),
    /// Large uploads are written to a temporary file.
    Spilled(NamedTempFile),
}

/// One uploaded file and its multipart header.
#[derive(Debug)]
pub struct FilePart {
    file_name: String,
    content_type: Option<String>,
    size: u64,
    data: FileData,
}

impl FilePart {
    /// Take ownership of a multipart file part, spilling it to disk when it is
    /// larger than `max_memory_size`.
    pub(crate) fn from_part(part: MultipartPart, max_memory_size: usize) -> io::Result<Self> {
        let size = part.data.len() as u64;
        let data = if part.data.len() > max_memory_size {
            let mut tmp = NamedTempFile::new()?;
            tmp.write_all(&part.data)?;
            tmp.flush()?;
            debug!(
                field = %part.name,
                size,
                path = %tmp.path().display(),
                "spilled upload to temporary file"
            );
            FileData::Spilled(tmp)
        } else {
            FileData::InMemory(part.data)
        };

        Ok(Self {
            file_name: part.filename.unwrap_or_default(),
            content_type: part.content_type,
            size,
            data,
        })
    }

    /// Whether the content was written to a temporary file.
    #[must_use]
    pub fn is_spilled(&self) -> bool {
        matches!(self.data, FileData::Spilled(_))
    }

    fn spill_path(&self) -> Option<&Path> {
        match &self.data {
            FileData::InMemory(_) => None,
            FileData::Spilled(tmp) => Some(tmp.path()),
        }
    }

    fn read_all(&self) -> io::Result<Vec<u8>> {
        match &self.data {
            FileData::InMemory(bytes) => Ok(bytes.to_vec()),
            FileData::Spilled(tmp) => std::fs::read(tmp.path()),
        }
    }
}

#[derive(Debug)]
enum FileEntry {
    Single(FilePart),
    Multiple(Vec<FilePart>),
}

impl FileEntry {
    fn cardinality(&self) -> Cardinality {
        match self {
            Self::Single(_) => Cardinality::Single,
            Self::Multiple(_) => Cardinality::Multiple,
        }
    }
}

/// Uploaded files of one request, keyed by multipart field name.
#[derive(Debug, Default)]
pub struct FileRegistry {
    entries: HashMap<String, FileEntry>,
}

impl FileRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every file received for `field`. An empty group is ignored.
    pub fn insert(&mut self, field: impl Into<String>, mut parts: Vec<FilePart>) {
        let entry = match parts.len() {
            0 => return,
            1 => FileEntry::Single(parts.remove(0)),
            _ => FileEntry::Multiple(parts),
        };
        self.entries.insert(field.into(), entry);
    }

    /// Whether any file was uploaded under `field`.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Number of fields carrying files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no files were uploaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The single file uploaded under `field`.
    ///
    /// # Errors
    ///
    /// [`FileError::NotFound`] if the field carries no file and
    /// [`FileError::WrongCardinality`] if it carries several.
    pub fn get_file(&self, field: &str) -> Result<UploadedFile<'_>, FileError> {
        match self.entries.get(field) {
            Some(FileEntry::Single(part)) => Ok(UploadedFile::new(part)),
            Some(entry) => Err(FileError::WrongCardinality {
                field: field.to_owned(),
                actual: entry.cardinality(),
            }),
            None => Err(FileError::NotFound(field.to_owned())),
        }
    }

    /// All files uploaded under `field`, in arrival order.
    ///
    /// # Errors
    ///
    /// [`FileError::NotFound`] if the field carries no file and
    /// [`FileError::WrongCardinality`] if it carries exactly one.
    pub fn get_files(&self, field: &str) -> Result<Vec<UploadedFile<'_>>, FileError> {
        match self.entries.get(field) {
            Some(FileEntry::Multiple(parts)) => Ok(parts.iter().map(UploadedFile::new).collect()),
            Some(entry) => Err(FileError::WrongCardinality {
                field: field.to_owned(),
                actual: entry.cardinality(),
            }),
            None => Err(FileError::NotFound(field.to_owned())),
        }
    }
}

#[derive(Debug)]
enum Reader<'a> {
    Memory(Cursor<&'a [u8]>),
    Disk(File),
}

/// Read handle over one uploaded file.
#[derive(Debug)]
pub struct UploadedFile<'a> {
    part: &'a FilePart,
    reader: Option<Reader<'a>>,
    stored_name: Option<String>,
}

impl<'a> UploadedFile<'a> {
    fn new(part: &'a FilePart) -> Self {
        Self {
            part,
            reader: None,
            stored_name: None,
        }
    }

    /// File name declared by the client.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.part.file_name
    }

    /// Content type declared by the client, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.part.content_type.as_deref()
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.part.size
    }

    /// Temporary file holding a spilled upload, removed with the registry.
    #[must_use]
    pub fn spill_path(&self) -> Option<&'a Path> {
        self.part.spill_path()
    }

    /// Name the file was last stored under, once [`store`](Self::store) or
    /// [`store_as`](Self::store_as) succeeded.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.stored_name.as_deref()
    }

    /// Write the content into `dir` under a unique name built from `pattern`.
    ///
    /// The last `*` in `pattern` is replaced by random characters; without a
    /// `*` they are appended. The directory is created if needed. Returns the
    /// base name of the new file.
    pub fn store(&mut self, dir: impl AsRef<Path>, pattern: &str) -> Result<String, FileError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let content = self.part.read_all()?;

        let (prefix, suffix) = pattern.rsplit_once('*').unwrap_or((pattern, ""));
        let mut target = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)?;
        target.write_all(&content)?;
        let (_, path) = target.keep().map_err(|e| e.error)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(dir = %dir.display(), name = %name, size = content.len(), "stored upload");
        self.stored_name = Some(name.clone());
        Ok(name)
    }

    /// Write the content to `dir/name`, overwriting any existing file.
    pub fn store_as(&mut self, dir: impl AsRef<Path>, name: &str) -> Result<(), FileError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let content = self.part.read_all()?;
        std::fs::write(dir.join(name), &content)?;
        debug!(dir = %dir.display(), name, size = content.len(), "stored upload");
        self.stored_name = Some(name.to_owned());
        Ok(())
    }

    fn reader(&mut self) -> io::Result<&mut Reader<'a>> {
        let part = self.part;
        let reader = match self.reader.take() {
            Some(reader) => reader,
            None => match &part.data {
                FileData::InMemory(bytes) => Reader::Memory(Cursor::new(bytes.as_ref())),
                FileData::Spilled(tmp) => Reader::Disk(tmp.reopen()?),
            },
        };
        Ok(self.reader.insert(reader))
    }
}

impl Read for UploadedFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader()? {
            Reader::Memory(cursor) => cursor.read(buf),
            Reader::Disk(file) => file.read(buf),
        }
    }
}
