#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use waf_probe::probe::{
    HttpTransport, ProbeRequest, ProbeResponse, ProbeRunner, TransportError, TransportErrorKind,
};
use waf_probe::ProbeConfig;

pub const TARGET: &str = "https://shop.example.test/search";
pub const INCAPSULA_BLOCK: &str =
    "<html><body>Request unsuccessful. Incapsula incident ID: 1234-5678</body></html>";

/// Which of the three request shapes a recorded request was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Baseline,
    Trigger,
    Bypass,
}

pub fn shape_of(request: &ProbeRequest) -> Shape {
    let gzip = request
        .headers
        .iter()
        .any(|(n, v)| n.eq_ignore_ascii_case("content-encoding") && v == "gzip");
    let payload = request.form.first().map(|(_, v)| v.as_str()).unwrap_or_default();
    match (payload, gzip) {
        ("bar", _) => Shape::Baseline,
        (_, true) => Shape::Bypass,
        _ => Shape::Trigger,
    }
}

pub fn is_unix(request: &ProbeRequest) -> bool {
    request.form.iter().any(|(_, v)| v.contains("etc/shadow"))
}

type Handler = dyn Fn(&ProbeRequest) -> Result<ProbeResponse, TransportError> + Send + Sync;

/// In-memory transport answering from a closure and recording every request.
pub struct Scripted {
    handler: Box<Handler>,
    log: Mutex<Vec<ProbeRequest>>,
}

impl Scripted {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ProbeRequest) -> Result<ProbeResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self { handler: Box::new(handler), log: Mutex::new(Vec::new()) })
    }

    pub fn shapes(&self) -> Vec<Shape> {
        self.log.lock().unwrap().iter().map(shape_of).collect()
    }

    pub fn count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for Scripted {
    async fn post(&self, request: &ProbeRequest) -> Result<ProbeResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub fn refused(request: &ProbeRequest) -> TransportError {
    TransportError::new(&request.url, TransportErrorKind::Connect, "connection refused")
}

pub fn runner(transport: Arc<Scripted>, config: ProbeConfig) -> ProbeRunner {
    ProbeRunner::new(transport, TARGET, config)
}
