use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::RunError;

/// Session-wide settings. Fixed at construction, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-request bound; expiry is reported as a transport error.
    pub timeout_secs: u64,
    /// Accept any 2xx/3xx for the baseline POST instead of only 200.
    pub relaxed: bool,
    /// Fire both bypass probes concurrently.
    pub parallel_bypass: bool,
    pub user_agent: String,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            relaxed: false,
            parallel_bypass: false,
            user_agent: concat!("waf_probe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Validate the target given on the command line. Only http(s) URLs with a host are probed.
pub fn parse_target(raw: &str) -> Result<Url, RunError> {
    let url = Url::parse(raw).map_err(|e| RunError::InvalidInvocation(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(RunError::InvalidInvocation(format!("{raw}: expected an http(s) URL"))),
    }
}
