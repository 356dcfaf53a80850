//! Tokeninfo fetch: body accumulation and the outbound HTTP seam.
//!
//! The core hands [`TokenInfoFetch`] a fully assembled URL and consumes
//! `(status, body)` or a transport error; the implementation owns TLS,
//! redirects, and timeout policy. [`HttpFetcher`] is the production
//! implementation on blocking reqwest — one synchronous attempt per
//! thread of control, no internal parallelism.

use std::collections::TryReserveError;
use std::io::Read;
use std::time::Duration;

use thiserror::Error;

/// Growable response body, filled one transport chunk at a time.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk, growing by exactly `chunk.len()` bytes and
    /// preserving everything already written.
    ///
    /// Allocation failure surfaces as an error instead of aborting, so
    /// the attempt can fail as service-unavailable with the buffer
    /// still intact.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), AllocError> {
        self.bytes.try_reserve(chunk.len())?;
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Response body allocation failed.
#[derive(Debug, Error)]
#[error("response buffer allocation failed: {0}")]
pub struct AllocError(#[from] TryReserveError);

/// A fetched tokeninfo response: transport status plus accumulated body.
#[derive(Debug)]
pub struct FetchedResponse {
    pub status: u16,
    pub body: ResponseBuffer,
}

/// The outbound HTTP collaborator.
pub trait TokenInfoFetch {
    fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError>;
}

/// Failures while performing the tokeninfo request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid tokeninfo URL: {0}")]
    InvalidUrl(String),

    #[error("plaintext HTTP not allowed")]
    PlaintextNotAllowed,

    #[error("request timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("failed to read response body: {0}")]
    BodyRead(String),

    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Configuration for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout; the host sees the attempt fail as
    /// service-unavailable when it fires.
    pub timeout: Duration,
    /// Allow plaintext `http://` endpoints (development only).
    pub allow_plaintext: bool,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            allow_plaintext: false,
        }
    }
}

/// Read granularity for body accumulation.
const READ_CHUNK: usize = 8 * 1024;

/// Blocking reqwest-based fetcher. One GET per authentication attempt.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    allow_plaintext: bool,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(FetchError::Build)?;

        Ok(Self {
            client,
            allow_plaintext: config.allow_plaintext,
        })
    }
}

impl TokenInfoFetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let url = url
            .parse::<reqwest::Url>()
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        if url.scheme() == "http" && !self.allow_plaintext {
            return Err(FetchError::PlaintextNotAllowed);
        }

        let mut response = self.client.get(url).send().map_err(classify)?;
        let status = response.status().as_u16();

        let mut body = ResponseBuffer::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = response
                .read(&mut chunk)
                .map_err(|e| FetchError::BodyRead(e.to_string()))?;
            if n == 0 {
                break;
            }
            body.append(&chunk[..n])?;
        }

        Ok(FetchedResponse { status, body })
    }
}

/// Map a reqwest error to the fetch taxonomy. The URL is stripped first:
/// it embeds the credential and must never reach a log line.
fn classify(err: reqwest::Error) -> FetchError {
    let err = err.without_url();
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::ConnectionFailed(err.to_string())
    } else {
        FetchError::RequestFailed(err.to_string())
    }
}
