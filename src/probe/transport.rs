use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::outcome::{ProbeResponse, TransportError, TransportErrorKind};

/// A single form-encoded POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Anything that can deliver a POST and hand back the whole response.
///
/// Redirects must not be followed.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: &ProbeRequest) -> Result<ProbeResponse, TransportError>;
}

/// `HttpTransport` backed by a `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify_error(url: &str, e: &reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_connect() {
        TransportErrorKind::Connect
    } else if e.is_body() || e.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(url, kind, e.to_string())
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: &ProbeRequest) -> Result<ProbeResponse, TransportError> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .form(&request.form);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&request.url, &e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(&request.url, &e))?;

        Ok(ProbeResponse { status, headers, body })
    }
}
