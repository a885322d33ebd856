use serde::Serialize;

use crate::config::ProbeConfig;
use crate::error::RunError;
use crate::waf::{exit_code, BypassAttempt, BypassSession, Stage, TestResult, WafVerdict};

/// Machine-readable summary of one run, printed with `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: String,
    pub config: ProbeConfig,
    pub stage: Stage,
    pub baseline_status: Option<u16>,
    pub verdict: Option<WafVerdict>,
    pub attempts: Vec<BypassAttempt>,
    pub result: Option<TestResult>,
    pub error: Option<String>,
    pub exit_code: u8,
}

impl RunReport {
    pub fn from_session(session: &BypassSession<'_>, outcome: &Result<TestResult, RunError>) -> Self {
        Self {
            target: session.url().to_string(),
            config: session.runner().config().clone(),
            stage: session.stage(),
            baseline_status: session.baseline_status(),
            verdict: session.verdict().cloned(),
            attempts: session.attempts().to_vec(),
            result: outcome.as_ref().ok().copied(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
            exit_code: exit_code(outcome),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
