//! Shared types passed between pipeline stages.

use crate::config::UploadConfig;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a candidate's bytes live.
#[derive(Debug, Clone)]
enum Contents {
    Memory(Arc<[u8]>),
    /// Read lazily so that type and size checks never touch the disk.
    Path(PathBuf),
}

/// The binary input currently being evaluated by the pipeline.
///
/// Cloning is cheap: in-memory contents are shared, not copied.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    name: String,
    mime_type: String,
    byte_length: u64,
    contents: Contents,
}

impl CandidateFile {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            byte_length: bytes.len() as u64,
            contents: Contents::Memory(bytes),
        }
    }

    /// Describe a file on disk. Only metadata is read here; the declared MIME
    /// type is derived from the extension, the way a file picker reports it.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            mime_type: mime_for_name(&name).to_string(),
            name,
            byte_length: metadata.len(),
            contents: Contents::Path(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    /// Load the file's bytes.
    pub fn read(&self) -> io::Result<Arc<[u8]>> {
        match &self.contents {
            Contents::Memory(bytes) => Ok(Arc::clone(bytes)),
            Contents::Path(path) => Ok(Arc::from(std::fs::read(path)?)),
        }
    }

    /// Read the contents once and hold them in memory from here on.
    ///
    /// Fails with `InvalidData` when the bytes read do not match the length
    /// the candidate was described with, e.g. a file modified after it was
    /// selected. In-memory candidates are returned sharing their buffer.
    pub fn load(&self) -> io::Result<Self> {
        let bytes = self.read()?;
        if bytes.len() as u64 != self.byte_length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} changed after selection: expected {} bytes, read {}",
                    self.name,
                    self.byte_length,
                    bytes.len()
                ),
            ));
        }
        Ok(Self {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            byte_length: self.byte_length,
            contents: Contents::Memory(bytes),
        })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.contents, Contents::Memory(_))
    }

    /// A new in-memory candidate with the same name and MIME type.
    pub fn with_contents(&self, bytes: Vec<u8>) -> Self {
        Self::from_bytes(self.name.clone(), self.mime_type.clone(), bytes)
    }

    /// True when both candidates share the same in-memory buffer.
    pub fn shares_contents_with(&self, other: &CandidateFile) -> bool {
        match (&self.contents, &other.contents) {
            (Contents::Memory(a), Contents::Memory(b)) => Arc::ptr_eq(a, b),
            (Contents::Path(a), Contents::Path(b)) => a == b,
            _ => false,
        }
    }
}

/// MIME type a browser would report for a file name.
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Per-upload-area limits. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConstraints {
    pub max_bytes: u64,
    pub allowed_mime_types: BTreeSet<String>,
    /// Lowercase, with leading dot (`.jpg`).
    pub allowed_extensions: BTreeSet<String>,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl UploadConstraints {
    /// Build constraints from a validated config.
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_bytes: config.max_size,
            allowed_mime_types: config.allowed_types.iter().cloned().collect(),
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            min_width: config.dimensions.min_width,
            min_height: config.dimensions.min_height,
            max_width: config.dimensions.max_width,
            max_height: config.dimensions.max_height,
        }
    }
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
