//! Shared fakes for preview integration tests.

use std::sync::Mutex;

use calorie_counter_preview::{
    InMemoryPreviewStore, PreviewError, PreviewHandle, PreviewStore, SelectedFile,
};

/// Store call observed by [`RecordingPreviewStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewEvent {
    /// A handle with this id was handed out.
    Acquired(String),
    /// A handle with this id was returned.
    Released(String),
}

/// In-memory store that also records successful acquire/release calls.
#[derive(Debug, Default)]
pub struct RecordingPreviewStore {
    inner: InMemoryPreviewStore,
    events: Mutex<Vec<PreviewEvent>>,
}

#[allow(dead_code)]
impl RecordingPreviewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls observed so far, in order.
    pub fn events(&self) -> Vec<PreviewEvent> {
        self.events.lock().expect("events lock").clone()
    }

    /// Backing store, for handle counts and contents.
    pub fn store(&self) -> &InMemoryPreviewStore {
        &self.inner
    }
}

impl PreviewStore for RecordingPreviewStore {
    fn acquire(&self, file: &SelectedFile) -> Result<PreviewHandle, PreviewError> {
        let handle = self.inner.acquire(file)?;
        self.events
            .lock()
            .expect("events lock")
            .push(PreviewEvent::Acquired(handle.id().to_string()));
        Ok(handle)
    }

    fn release(&self, handle: PreviewHandle) -> Result<(), PreviewError> {
        let id = handle.id().to_string();
        self.inner.release(handle)?;
        self.events
            .lock()
            .expect("events lock")
            .push(PreviewEvent::Released(id));
        Ok(())
    }
}

/// In-memory image fixture.
#[allow(dead_code)]
pub fn image(name: &str, bytes: &[u8]) -> SelectedFile {
    SelectedFile::new(name, "image/jpeg", bytes.to_vec()).expect("fixture file should be valid")
}
