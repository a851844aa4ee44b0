#![warn(missing_docs)]
//! # calorie-counter-preview
//!
//! ## Purpose
//! Models the user-selected image and the local preview resource derived from
//! it.
//!
//! ## Responsibilities
//! - Load a selected file with its display name and content type.
//! - Derive a deterministic preview handle id from the file contents.
//! - Acquire and release preview resources through [`PreviewStore`].
//! - Enforce the one-live-handle rule with [`PreviewSlot`], which releases
//!   the previous handle before acquiring the next and releases on drop.
//!
//! ## Data flow
//! File picker -> [`SelectedFile`] -> [`PreviewSlot::replace`] ->
//! [`PreviewStore::acquire`] -> [`PreviewHandle`] rendered by the UI.
//!
//! ## Ownership and lifetimes
//! [`PreviewHandle`] is not `Clone`; the slot is its only owner and hands it
//! back to the store by value on release.
//!
//! ## Error model
//! File reads and store bookkeeping failures return [`PreviewError`]. Release
//! failures during drop are logged, never raised.
//!
//! ## Security and privacy notes
//! Image bytes stay in process memory; logs carry only handle ids and sizes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use calorie_counter_core::redact_sensitive;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Prefix of every preview handle id.
pub const PREVIEW_ID_PREFIX: &str = "preview:";

const PREVIEW_ID_HEX_LEN: usize = 24;

/// Image file chosen by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl SelectedFile {
    /// Builds a selected file from in-memory contents.
    ///
    /// # Errors
    /// Returns [`PreviewError::InvalidFile`] when `name` is blank.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, PreviewError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PreviewError::InvalidFile("file name is empty".to_string()));
        }

        let content_type = content_type.into();
        let content_type = if content_type.trim().is_empty() {
            guess_content_type(Path::new(&name)).to_string()
        } else {
            content_type
        };

        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    /// Reads a file from disk, guessing its content type from the extension.
    ///
    /// # Errors
    /// Returns [`PreviewError::Io`] when the file cannot be read and
    /// [`PreviewError::InvalidFile`] when the path has no file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PreviewError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                PreviewError::InvalidFile(format!("path has no file name: {}", path.display()))
            })?
            .to_string();
        let bytes = std::fs::read(path).map_err(|source| PreviewError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            name,
            content_type: guess_content_type(path).to_string(),
            bytes,
        })
    }

    /// File name shown to the user and sent as the multipart file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type of the contents.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Raw file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the contents in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for zero-length files.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex SHA-256 over name, content type and contents.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0]);
        hasher.update(self.content_type.as_bytes());
        hasher.update([0]);
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }

    /// Preview id derived from [`SelectedFile::fingerprint`].
    pub fn preview_id(&self) -> String {
        let fingerprint = self.fingerprint();
        format!("{PREVIEW_ID_PREFIX}{}", &fingerprint[..PREVIEW_ID_HEX_LEN])
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Maps common image extensions to MIME types.
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Owned handle to a live preview resource.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PreviewHandle {
    id: String,
}

impl PreviewHandle {
    /// Handle id, stable for identical files.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Renderable contents behind a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewContents {
    /// MIME type of the bytes.
    pub content_type: String,
    /// Image bytes.
    pub bytes: Arc<[u8]>,
}

/// Acquire/release seam for preview resources.
pub trait PreviewStore: Send + Sync {
    /// Creates a preview resource for `file`.
    fn acquire(&self, file: &SelectedFile) -> Result<PreviewHandle, PreviewError>;

    /// Releases a resource previously returned by [`PreviewStore::acquire`].
    fn release(&self, handle: PreviewHandle) -> Result<(), PreviewError>;
}

#[derive(Debug)]
struct PreviewEntry {
    contents: PreviewContents,
    holders: usize,
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, PreviewEntry>,
}

/// Process-local preview store keeping file bytes per live handle.
///
/// Identical files share one entry, counted per holder. An entry is dropped
/// with its last holder, so memory tracks live handles only.
#[derive(Debug, Default)]
pub struct InMemoryPreviewStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryPreviewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles currently held across all entries.
    pub fn live_handles(&self) -> usize {
        self.lock()
            .map(|inner| inner.entries.values().map(|entry| entry.holders).sum::<usize>())
            .unwrap_or(0)
    }

    /// Number of distinct files with at least one live handle.
    pub fn entry_count(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    /// Contents behind a live handle id.
    pub fn contents(&self, id: &str) -> Option<PreviewContents> {
        self.lock()
            .ok()
            .and_then(|inner| inner.entries.get(id).map(|entry| entry.contents.clone()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, PreviewError> {
        self.inner.lock().map_err(|_| PreviewError::StoreUnavailable)
    }
}

impl PreviewStore for InMemoryPreviewStore {
    fn acquire(&self, file: &SelectedFile) -> Result<PreviewHandle, PreviewError> {
        let id = file.preview_id();
        let mut inner = self.lock()?;
        inner
            .entries
            .entry(id.clone())
            .or_insert_with(|| PreviewEntry {
                contents: PreviewContents {
                    content_type: file.content_type().to_string(),
                    bytes: Arc::from(file.bytes()),
                },
                holders: 0,
            })
            .holders += 1;
        tracing::debug!(
            stage = "preview",
            action = "acquire",
            preview_id = %id,
            bytes = file.len()
        );
        Ok(PreviewHandle { id })
    }

    fn release(&self, handle: PreviewHandle) -> Result<(), PreviewError> {
        let mut inner = self.lock()?;
        let Some(entry) = inner.entries.get_mut(&handle.id) else {
            return Err(PreviewError::UnknownHandle(handle.id.clone()));
        };

        entry.holders -= 1;
        if entry.holders == 0 {
            inner.entries.remove(&handle.id);
        }
        tracing::debug!(stage = "preview", action = "release", preview_id = %handle.id);
        Ok(())
    }
}

/// Single-owner slot for the preview of the currently selected file.
pub struct PreviewSlot {
    store: Arc<dyn PreviewStore>,
    current: Option<PreviewHandle>,
}

impl PreviewSlot {
    /// Creates an empty slot backed by `store`.
    pub fn new(store: Arc<dyn PreviewStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Releases the current handle, then acquires one for `file`.
    ///
    /// # Errors
    /// Returns the store error of either step. A failed release leaves the
    /// slot empty; no second handle is acquired in that case.
    pub fn replace(&mut self, file: &SelectedFile) -> Result<&PreviewHandle, PreviewError> {
        self.clear()?;
        let handle = self.store.acquire(file)?;
        Ok(self.current.insert(handle))
    }

    /// Releases the current handle, if any.
    ///
    /// # Errors
    /// Returns the store error from release.
    pub fn clear(&mut self) -> Result<(), PreviewError> {
        match self.current.take() {
            Some(handle) => self.store.release(handle),
            None => Ok(()),
        }
    }

    /// Handle of the current preview.
    pub fn current(&self) -> Option<&PreviewHandle> {
        self.current.as_ref()
    }
}

impl std::fmt::Debug for PreviewSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSlot")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        if let Err(error) = self.clear() {
            tracing::warn!(
                stage = "preview",
                action = "release_on_drop",
                error = %redact_sensitive(&error.to_string())
            );
        }
    }
}

/// Preview errors.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Reading the selected file failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// File metadata is unusable.
    #[error("invalid file: {0}")]
    InvalidFile(String),
    /// Release was called with a handle the store does not know.
    #[error("unknown preview handle: {0}")]
    UnknownHandle(String),
    /// Store lock was poisoned by a panicking holder.
    #[error("preview store unavailable")]
    StoreUnavailable,
}
