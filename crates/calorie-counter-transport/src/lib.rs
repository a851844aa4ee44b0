#![warn(missing_docs)]
//! # calorie-counter-transport
//!
//! ## Purpose
//! Sends analysis and transform requests to the remote service.
//!
//! ## Responsibilities
//! - Validate the service base URL (`https`, or `http` on loopback hosts).
//! - Resolve the analyze/encrypt/decrypt endpoint URLs.
//! - Execute requests through an injectable [`ServiceTransport`].
//! - Provide the blocking HTTP implementation [`HttpTransport`].
//!
//! ## Data flow
//! Controller builds a [`ServiceRequest`] -> [`ServiceTransport::send`] ->
//! [`ServiceResponse`] with raw status and body for the controller to
//! interpret.
//!
//! ## Ownership and lifetimes
//! Requests and responses own their buffers so a request can be moved into a
//! worker thread and the response handed back over a channel.
//!
//! ## Error model
//! [`TransportError`] covers failures before a status line was received.
//! Non-2xx responses are not errors at this layer.
//!
//! ## Security and privacy notes
//! Request bodies are never logged; only method, path, status and sizes are.
//!
//! ## Example
//! ```rust
//! use calorie_counter_transport::ServiceEndpoints;
//!
//! let endpoints = ServiceEndpoints::new("https://calories.example.test").unwrap();
//! assert_eq!(endpoints.analyze().path(), "/api/analyze");
//! ```

use std::time::Duration;

use calorie_counter_contract::{ANALYZE_PATH, DECRYPT_PATH, ENCRYPT_PATH};
use thiserror::Error;
use url::{Host, Url};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolved endpoint URLs of one service deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    analyze: Url,
    encrypt: Url,
    decrypt: Url,
}

impl ServiceEndpoints {
    /// Validates `base` and resolves all endpoint URLs below it.
    ///
    /// A path prefix on `base` is kept, so `https://host/app` resolves to
    /// `https://host/app/api/analyze`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidEndpoint`] for unparsable URLs,
    /// non-HTTP schemes, or plain `http` on a non-loopback host.
    pub fn new(base: &str) -> Result<Self, TransportError> {
        let mut base = validate_service_base(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let resolve = |path: &str| {
            base.join(path.trim_start_matches('/')).map_err(|error| {
                TransportError::InvalidEndpoint(format!("cannot resolve {path}: {error}"))
            })
        };

        Ok(Self {
            analyze: resolve(ANALYZE_PATH)?,
            encrypt: resolve(ENCRYPT_PATH)?,
            decrypt: resolve(DECRYPT_PATH)?,
        })
    }

    /// Image analysis endpoint.
    pub fn analyze(&self) -> &Url {
        &self.analyze
    }

    /// Forward transform endpoint.
    pub fn encrypt(&self) -> &Url {
        &self.encrypt
    }

    /// Inverse transform endpoint.
    pub fn decrypt(&self) -> &Url {
        &self.decrypt
    }
}

/// Validates the service base URL policy.
///
/// # Errors
/// Returns [`TransportError::InvalidEndpoint`] when the URL is unparsable,
/// uses a scheme other than `http`/`https`, or uses `http` off loopback.
pub fn validate_service_base(base: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(base.trim())
        .map_err(|error| TransportError::InvalidEndpoint(format!("invalid service url: {error}")))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if is_loopback(&parsed) => Ok(parsed),
        "http" => Err(TransportError::InvalidEndpoint(
            "service url must use https outside loopback".to_string(),
        )),
        other => Err(TransportError::InvalidEndpoint(format!(
            "unsupported service url scheme: {other}"
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(address)) => address.is_loopback(),
        Some(Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    }
}

/// File part of a multipart request.
#[derive(Clone, PartialEq, Eq)]
pub struct MultipartFile {
    /// Form field name.
    pub field: String,
    /// File name reported to the service.
    pub file_name: String,
    /// MIME type of the bytes.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MultipartFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartFile")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Request body variants used by the service.
#[derive(Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `multipart/form-data` with a single file part.
    Multipart(MultipartFile),
    /// `application/json` bytes.
    Json(Vec<u8>),
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multipart(file) => f.debug_tuple("Multipart").field(file).finish(),
            Self::Json(bytes) => f.debug_tuple("Json").field(&bytes.len()).finish(),
        }
    }
}

/// One outbound `POST` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    /// Target endpoint.
    pub url: Url,
    /// Request body.
    pub body: RequestBody,
}

impl ServiceRequest {
    /// Builds a multipart upload request.
    pub fn multipart(url: Url, file: MultipartFile) -> Self {
        Self {
            url,
            body: RequestBody::Multipart(file),
        }
    }

    /// Builds a JSON request.
    pub fn json(url: Url, body: Vec<u8>) -> Self {
        Self {
            url,
            body: RequestBody::Json(body),
        }
    }
}

/// Raw response returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl ServiceResponse {
    /// Builds a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract transport used by the controllers.
pub trait ServiceTransport: Send + Sync {
    /// Sends one request and returns the raw response.
    fn send(&self, request: &ServiceRequest) -> Result<ServiceResponse, TransportError>;
}

/// Blocking HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a transport with a per-request timeout.
    ///
    /// # Errors
    /// Returns [`TransportError::Client`] when the HTTP client cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("calorie-counter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;
        Ok(Self { client })
    }
}

impl ServiceTransport for HttpTransport {
    fn send(&self, request: &ServiceRequest) -> Result<ServiceResponse, TransportError> {
        let builder = self.client.post(request.url.clone());
        let builder = match &request.body {
            RequestBody::Multipart(file) => {
                let part = reqwest::blocking::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)
                    .map_err(|error| TransportError::Client(error.to_string()))?;
                let form = reqwest::blocking::multipart::Form::new().part(file.field.clone(), part);
                builder.multipart(form)
            }
            RequestBody::Json(bytes) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
        };

        tracing::debug!(
            stage = "transport",
            action = "request",
            path = request.url.path()
        );
        let response = builder.send().map_err(TransportError::from)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|error| TransportError::Body(error.to_string()))?
            .to_vec();
        tracing::debug!(
            stage = "transport",
            action = "response",
            path = request.url.path(),
            status,
            bytes = body.len()
        );

        Ok(ServiceResponse { status, body })
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Endpoint violates URL policy.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Connection could not be established.
    #[error("service unreachable: {0}")]
    Unreachable(String),
    /// Request exceeded its timeout.
    #[error("request timed out")]
    Timeout,
    /// Client construction or request building failed.
    #[error("http client error: {0}")]
    Client(String),
    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Body(String),
    /// Any other request failure.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Unreachable(error.to_string())
        } else if error.is_builder() {
            Self::Client(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}
