use serde::Serialize;
use thiserror::Error;

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResponse {
    pub status: u16,
    /// Headers in the order they were received. Names may repeat.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ProbeResponse {
    pub fn new(status: u16) -> Self {
        Self { status, headers: Vec::new(), body: String::new() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// All values of `name`, compared ASCII case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Body,
    Other,
}

/// The request never produced an HTTP response (DNS, refused connection, timeout...).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("error connecting to {url}: {message}")]
pub struct TransportError {
    pub url: String,
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(url: &str, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { url: url.to_string(), kind, message: message.into() }
    }
}

/// Result of a single probe: exactly one of three kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Status inside the probe's acceptance range.
    Success(ProbeResponse),
    /// Status outside the acceptance range. Still carries the full response.
    HttpError(ProbeResponse),
    TransportError(TransportError),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    pub fn response(&self) -> Option<&ProbeResponse> {
        match self {
            ProbeOutcome::Success(r) | ProbeOutcome::HttpError(r) => Some(r),
            ProbeOutcome::TransportError(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}
