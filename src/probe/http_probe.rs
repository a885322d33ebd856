use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use super::outcome::ProbeOutcome;
use super::transport::{HttpTransport, ProbeRequest};
use crate::config::ProbeConfig;

const FORM_FIELD: &str = "foo";
const BASELINE_PAYLOAD: &str = "bar";

/// Baseline acceptance without `-r`.
pub const STRICT_BASELINE: RangeInclusive<u16> = 200..=200;
/// Baseline acceptance with `-r`: any 2xx or 3xx.
pub const RELAXED_BASELINE: RangeInclusive<u16> = 200..=399;
/// Trigger and bypass probes only fail on 4xx/5xx.
pub const NOT_BLOCKED: RangeInclusive<u16> = 100..=399;

/// Known-malicious payload families. The order of `ALL` is the probing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Trigger {
    #[serde(rename = "UNIX")]
    Unix,
    Windows,
}

impl Trigger {
    pub const ALL: [Trigger; 2] = [Trigger::Unix, Trigger::Windows];

    pub fn payload(self) -> &'static str {
        match self {
            Trigger::Unix => "../../../../../../../etc/shadow",
            Trigger::Windows => r"..\..\..\..\..\Windows\System32\cmd.exe",
        }
    }

    /// Bit contributed to the exit code when the bypass works for this trigger.
    pub fn bit(self) -> u8 {
        match self {
            Trigger::Unix => 1,
            Trigger::Windows => 2,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Unix => f.write_str("UNIX"),
            Trigger::Windows => f.write_str("Windows"),
        }
    }
}

/// Issues the three request shapes the bypass check needs against one URL.
///
/// Every probe is sent exactly once; there is no retry.
pub struct ProbeRunner {
    transport: Arc<dyn HttpTransport>,
    url: String,
    config: ProbeConfig,
}

impl ProbeRunner {
    pub fn new(transport: Arc<dyn HttpTransport>, url: &str, config: ProbeConfig) -> Self {
        Self { transport, url: url.to_string(), config }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn baseline_range(&self) -> RangeInclusive<u16> {
        if self.config.relaxed {
            RELAXED_BASELINE
        } else {
            STRICT_BASELINE
        }
    }

    /// Harmless POST; tells us whether the endpoint accepts form posts at all.
    pub async fn baseline_probe(&self) -> ProbeOutcome {
        self.send("baseline", BASELINE_PAYLOAD, Vec::new(), self.baseline_range()).await
    }

    /// Malicious POST without mutation, used for fingerprinting.
    pub async fn trigger_probe(&self, trigger: Trigger) -> ProbeOutcome {
        self.send("trigger", trigger.payload(), Vec::new(), NOT_BLOCKED).await
    }

    /// Malicious POST claiming a gzip-encoded body.
    pub async fn bypass_probe(&self, trigger: Trigger) -> ProbeOutcome {
        let headers = vec![("Content-Encoding".to_string(), "gzip".to_string())];
        self.send("bypass", trigger.payload(), headers, NOT_BLOCKED).await
    }

    async fn send(
        &self,
        shape: &str,
        payload: &str,
        headers: Vec<(String, String)>,
        accept: RangeInclusive<u16>,
    ) -> ProbeOutcome {
        let request = ProbeRequest {
            url: self.url.clone(),
            form: vec![(FORM_FIELD.to_string(), payload.to_string())],
            headers,
            timeout: self.config.timeout(),
        };

        match self.transport.post(&request).await {
            Ok(response) => {
                tracing::debug!(shape, url = %self.url, status = response.status, "probe answered");
                if accept.contains(&response.status) {
                    ProbeOutcome::Success(response)
                } else {
                    ProbeOutcome::HttpError(response)
                }
            }
            Err(e) => {
                tracing::warn!(shape, url = %self.url, kind = ?e.kind, "probe failed: {}", e.message);
                ProbeOutcome::TransportError(e)
            }
        }
    }
}
