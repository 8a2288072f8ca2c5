//! Normalization helpers for OneBot v11 field values.
//!
//! OneBot v11 carries booleans as lowercase string literals and binary
//! payloads as URIs. The helpers here turn Rust values into those wire forms:
//!
//! - [`bool_to_string`]: `Some(true)` → `"true"`, `None` stays `None`
//! - [`file_to_uri`]: raw bytes → `base64://...`, paths → `file://...`,
//!   strings pass through untouched
//!
//! Path resolution only inspects symlinks along the path. Files are never
//! opened and their existence is never checked.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use tracing::trace;
use url::Url;

use crate::error::{MessageError, MessageResult};

/// Scheme prefix for inline binary payloads.
pub const BASE64_SCHEME: &str = "base64://";

/// Converts an optional boolean into the protocol's string form.
pub fn bool_to_string(value: Option<bool>) -> Option<String> {
    value.map(|b| b.to_string())
}

// ============================================================================
// FileSource
// ============================================================================

/// Where the content of a file-carrying segment comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Raw file content, sent inline as base64.
    Bytes(Vec<u8>),
    /// A local file, sent as a `file://` URI.
    Path(PathBuf),
    /// A URL, URI or protocol-specific file identifier, sent verbatim.
    Uri(String),
}

impl FileSource {
    /// Reads a byte stream to the end and keeps its content in memory.
    pub fn from_reader(mut reader: impl Read) -> MessageResult<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::Bytes(buf))
    }

    /// Normalizes this source into the URI string carried on the wire.
    pub fn into_uri(self) -> MessageResult<String> {
        match self {
            FileSource::Bytes(bytes) => Ok(base64_uri(&bytes)),
            FileSource::Path(path) => path_to_file_uri(&path),
            FileSource::Uri(uri) => Ok(uri),
        }
    }
}

impl From<Vec<u8>> for FileSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for FileSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for FileSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<String> for FileSource {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<&str> for FileSource {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_string())
    }
}

// ============================================================================
// URI conversion
// ============================================================================

/// Converts a file source into the URI form OneBot v11 expects.
///
/// - bytes → `base64://` followed by standard, padded base64
/// - path → absolute `file://` URI
/// - string → unchanged
pub fn file_to_uri(file: impl Into<FileSource>) -> MessageResult<String> {
    file.into().into_uri()
}

/// Encodes bytes as a `base64://` URI.
pub fn base64_uri(bytes: &[u8]) -> String {
    format!("{BASE64_SCHEME}{}", B64.encode(bytes))
}

/// Resolves a path to an absolute `file://` URI.
///
/// Relative paths are joined to the current directory. Components are then
/// walked in order: symlinks that exist are replaced by their target before a
/// following `..` is applied, and the rest of the path is folded lexically.
/// A missing file is not an error.
pub fn path_to_file_uri(path: &Path) -> MessageResult<String> {
    let absolute =
        std::path::absolute(path).map_err(|e| MessageError::invalid_path(path, e.to_string()))?;
    let resolved = resolve(&absolute);
    trace!(path = %path.display(), resolved = %resolved.display(), "resolved file path");

    Url::from_file_path(&resolved)
        .map(String::from)
        .map_err(|()| MessageError::invalid_path(path, "not representable as a file URI"))
}

fn resolve(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => {
                out.push(other.as_os_str());
                let is_link = fs::symlink_metadata(&out)
                    .is_ok_and(|meta| meta.file_type().is_symlink());
                if is_link {
                    // A dangling link stays as written.
                    if let Ok(target) = fs::canonicalize(&out) {
                        out = target;
                    }
                }
            }
        }
    }
    out
}
