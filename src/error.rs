use thiserror::Error;

use crate::probe::TransportError;

/// Stable process exit statuses. Scripts depend on these values.
pub mod exit {
    pub const WAF_REPORTED: u8 = 0;
    pub const INVALID_INVOCATION: u8 = 1;
    pub const TRANSPORT_FAILURE: u8 = 2;
    pub const NO_WAF: u8 = 3;
    pub const WAF_MISMATCH: u8 = 4;
    pub const BASELINE_REJECTED: u8 = 5;
    /// Base of the bypass result; low bits flag which triggers got through.
    pub const BYPASS_BASE: u8 = 128;
}

/// Every way a run can stop before producing a bypass result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Can't POST. {}", baseline_hint(.status, .relaxed))]
    BaselineRejected { status: u16, relaxed: bool },

    #[error("It looks like there is no WAF protecting this URL")]
    NoWaf,

    #[error("Imperva wasn't detected. WAF type: {label}")]
    WafMismatch { label: String },
}

fn baseline_hint(status: &u16, relaxed: &bool) -> String {
    if *relaxed {
        format!("Expected HTTP 2xx or 3xx but received HTTP {status}.")
    } else {
        format!("Expected HTTP 200 but received HTTP {status}. Use -r to allow HTTP 2xx and 3xx.")
    }
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::InvalidInvocation(_) => exit::INVALID_INVOCATION,
            RunError::Transport(_) => exit::TRANSPORT_FAILURE,
            RunError::BaselineRejected { .. } => exit::BASELINE_REJECTED,
            RunError::NoWaf => exit::NO_WAF,
            RunError::WafMismatch { .. } => exit::WAF_MISMATCH,
        }
    }
}
