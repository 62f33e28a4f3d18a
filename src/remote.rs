use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::config::Settings;
use crate::error::ChemFetchError;
use crate::pubchem::{Endpoints, fault_message};

/// Status and body of one HTTP exchange, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// One GET against the remote service. The seam test doubles plug into.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, ChemFetchError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ChemFetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("chemfetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ChemFetchError::Transport(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|err| ChemFetchError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, ChemFetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ChemFetchError {
    ChemFetchError::Transport(err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Bytes(Vec<u8>),
}

/// Classified outcome of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// HTTP 200.
    Ready(Body),
    /// HTTP 202: an asynchronous job is still running.
    Pending(Value),
}

/// Shared handle to the remote service: endpoint layout, transport, per-call
/// timeout and a cap on in-flight calls across every clone.
pub struct RemoteClient<T: Transport> {
    transport: Arc<T>,
    endpoints: Endpoints,
    request_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl<T: Transport> Clone for RemoteClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            endpoints: self.endpoints.clone(),
            request_timeout: self.request_timeout,
            permits: Arc::clone(&self.permits),
        }
    }
}

impl RemoteClient<HttpTransport> {
    pub fn from_settings(settings: &Settings) -> Result<Self, ChemFetchError> {
        let transport = HttpTransport::new(settings.request_timeout)?;
        Self::new(transport, settings)
    }
}

impl<T: Transport> RemoteClient<T> {
    pub fn new(transport: T, settings: &Settings) -> Result<Self, ChemFetchError> {
        Ok(Self {
            transport: Arc::new(transport),
            endpoints: Endpoints::new(settings.base_url.clone())?,
            request_timeout: settings.request_timeout,
            permits: Arc::new(Semaphore::new(settings.max_in_flight)),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issues one GET and classifies the status: 200 is `Ready`, 202 is
    /// `Pending`, anything else is `RemoteStatus`.
    pub async fn get(&self, url: &Url, kind: BodyKind) -> Result<Reply, ChemFetchError> {
        let raw = self.exchange(url).await?;
        tracing::debug!(url = %url, status = raw.status, "PubChem response");
        match raw.status {
            200 => Ok(Reply::Ready(decode_body(raw.body, kind)?)),
            // Job documents are JSON; tolerate an empty or odd body here and
            // let the caller decide whether a handle is required.
            202 => Ok(Reply::Pending(
                serde_json::from_slice(&raw.body).unwrap_or(Value::Null),
            )),
            status => Err(status_error(status, &raw.body)),
        }
    }

    /// For endpoints without job submission: only 200 is success.
    pub async fn get_json(&self, url: &Url) -> Result<Value, ChemFetchError> {
        match self.get(url, BodyKind::Json).await? {
            Reply::Ready(Body::Json(value)) => Ok(value),
            Reply::Ready(Body::Bytes(_)) => Err(ChemFetchError::Decode(
                "expected a JSON body".to_string(),
            )),
            Reply::Pending(_) => Err(unexpected_pending()),
        }
    }

    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, ChemFetchError> {
        match self.get(url, BodyKind::Bytes).await? {
            Reply::Ready(Body::Bytes(bytes)) => Ok(bytes),
            Reply::Ready(Body::Json(value)) => Ok(value.to_string().into_bytes()),
            Reply::Pending(_) => Err(unexpected_pending()),
        }
    }

    async fn exchange(&self, url: &Url) -> Result<RawResponse, ChemFetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| ChemFetchError::Transport(err.to_string()))?;
        tokio::time::timeout(self.request_timeout, self.transport.get(url))
            .await
            .map_err(|_| ChemFetchError::RequestTimeout(self.request_timeout))?
    }
}

fn decode_body(body: Vec<u8>, kind: BodyKind) -> Result<Body, ChemFetchError> {
    match kind {
        BodyKind::Bytes => Ok(Body::Bytes(body)),
        BodyKind::Json => serde_json::from_slice(&body)
            .map(Body::Json)
            .map_err(|err| ChemFetchError::Decode(err.to_string())),
    }
}

fn status_error(status: u16, body: &[u8]) -> ChemFetchError {
    let message = fault_message(body)
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| "PubChem request failed".to_string());
    ChemFetchError::RemoteStatus { status, message }
}

fn unexpected_pending() -> ChemFetchError {
    ChemFetchError::RemoteStatus {
        status: 202,
        message: "request accepted for asynchronous processing by an endpoint without job polling"
            .to_string(),
    }
}
