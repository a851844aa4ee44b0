//! Shared fakes for app integration tests.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use calorie_counter_app::{AnalysisController, TransformController};
use calorie_counter_preview::{
    InMemoryPreviewStore, PreviewContents, PreviewError, PreviewHandle, PreviewStore, SelectedFile,
};
use calorie_counter_transport::{
    RequestBody, ServiceEndpoints, ServiceRequest, ServiceResponse, ServiceTransport,
    TransportError,
};

/// Base URL used by every fake controller.
#[allow(dead_code)]
pub const TEST_BASE: &str = "http://127.0.0.1:8000";

/// Transport that replays scripted replies and records every request.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<ServiceResponse, TransportError>>>,
    requests: Mutex<Vec<ServiceRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Creates a transport that answers with `replies` in order.
    pub fn new(replies: Vec<Result<ServiceResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Creates a transport answering each call with `status` and a JSON body.
    pub fn json_replies(replies: &[(u16, serde_json::Value)]) -> Arc<Self> {
        Self::new(
            replies
                .iter()
                .map(|(status, body)| Ok(ServiceResponse::new(*status, body.to_string())))
                .collect(),
        )
    }

    /// Requests sent so far.
    pub fn requests(&self) -> Vec<ServiceRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of requests sent so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    /// JSON body of request `index`.
    pub fn json_body(&self, index: usize) -> serde_json::Value {
        let requests = self.requests();
        match &requests[index].body {
            RequestBody::Json(bytes) => {
                serde_json::from_slice(bytes).expect("request body should be JSON")
            }
            RequestBody::Multipart(_) => panic!("request {index} is multipart"),
        }
    }
}

impl ServiceTransport for ScriptedTransport {
    fn send(&self, request: &ServiceRequest) -> Result<ServiceResponse, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted reply".to_string())))
    }
}

/// Transport that blocks each call until the test releases a reply.
#[allow(dead_code)]
pub struct GatedTransport {
    gate: Mutex<Receiver<Result<ServiceResponse, TransportError>>>,
    calls: Mutex<usize>,
}

#[allow(dead_code)]
impl GatedTransport {
    /// Creates the transport and the sender that releases its replies.
    pub fn new() -> (Arc<Self>, Sender<Result<ServiceResponse, TransportError>>) {
        let (release_tx, release_rx) = mpsc::channel();
        let transport = Arc::new(Self {
            gate: Mutex::new(release_rx),
            calls: Mutex::new(0),
        });
        (transport, release_tx)
    }

    /// Number of calls that reached the transport.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }
}

impl ServiceTransport for GatedTransport {
    fn send(&self, _request: &ServiceRequest) -> Result<ServiceResponse, TransportError> {
        *self.calls.lock().expect("calls lock") += 1;
        self.gate
            .lock()
            .expect("gate lock")
            .recv()
            .unwrap_or_else(|_| Err(TransportError::Request("gate closed".to_string())))
    }
}

/// Transport whose every call panics with `message`.
#[allow(dead_code)]
pub struct PanickingTransport {
    message: String,
}

#[allow(dead_code)]
impl PanickingTransport {
    /// Creates the transport.
    pub fn new(message: &str) -> Arc<Self> {
        Arc::new(Self {
            message: message.to_string(),
        })
    }
}

impl ServiceTransport for PanickingTransport {
    fn send(&self, _request: &ServiceRequest) -> Result<ServiceResponse, TransportError> {
        panic!("{}", self.message)
    }
}

/// Store call observed by [`RecordingPreviewStore`].
#[allow(dead_code)]
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
    /// Calls observed so far, in order.
    pub fn events(&self) -> Vec<PreviewEvent> {
        self.events.lock().expect("events lock").clone()
    }

    /// Handles currently held.
    pub fn live_handles(&self) -> usize {
        self.inner.live_handles()
    }

    /// Contents behind a live handle id.
    pub fn contents(&self, id: &str) -> Option<PreviewContents> {
        self.inner.contents(id)
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

/// Endpoints of the fake service.
#[allow(dead_code)]
pub fn endpoints() -> ServiceEndpoints {
    ServiceEndpoints::new(TEST_BASE).expect("test base should be valid")
}

/// Small in-memory image fixture.
#[allow(dead_code)]
pub fn image(name: &str) -> SelectedFile {
    SelectedFile::new(name, "image/jpeg", name.as_bytes().to_vec()).expect("fixture file")
}

/// Analysis controller with a fresh preview store.
#[allow(dead_code)]
pub fn analysis_controller(
    transport: Arc<dyn ServiceTransport>,
) -> (AnalysisController, Arc<RecordingPreviewStore>) {
    let previews = Arc::new(RecordingPreviewStore::default());
    let controller = AnalysisController::new(endpoints(), transport, previews.clone());
    (controller, previews)
}

/// Transform controller with `text` and `passphrase` already entered.
#[allow(dead_code)]
pub fn transform_controller(
    transport: Arc<dyn ServiceTransport>,
    text: &str,
    passphrase: &str,
) -> TransformController {
    let mut controller = TransformController::new(endpoints(), transport);
    controller.set_text(text).expect("idle controller accepts text");
    controller
        .set_passphrase(passphrase)
        .expect("idle controller accepts passphrase");
    controller
}
