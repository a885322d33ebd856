use serde::{Serialize, Serializer};
use std::fmt;

use super::signatures::{Scope, SignatureStore};
use crate::probe::{ProbeOutcome, ProbeResponse, Trigger};

/// What the fingerprinting pass concluded about the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WafVerdict {
    /// The final trigger went through unblocked and nothing matched.
    NoWaf,
    /// Something blocked a trigger, but no signature names it.
    Unknown,
    Named(String),
}

impl WafVerdict {
    pub fn name(&self) -> &str {
        match self {
            WafVerdict::NoWaf => "None",
            WafVerdict::Unknown => "Unknown",
            WafVerdict::Named(label) => label,
        }
    }

    pub fn is(&self, label: &str) -> bool {
        matches!(self, WafVerdict::Named(l) if l == label)
    }
}

impl fmt::Display for WafVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for WafVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Signature matcher over a fixed catalog. Holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct WafDetector<'s> {
    store: &'s SignatureStore,
}

impl WafDetector<'static> {
    pub fn builtin() -> Self {
        Self::new(SignatureStore::builtin())
    }
}

impl Default for WafDetector<'static> {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'s> WafDetector<'s> {
    pub fn new(store: &'s SignatureStore) -> Self {
        Self { store }
    }

    /// First rule firing on this response. Header rules are exhausted before
    /// any body rule is tried; the catalog order breaks ties, not header order.
    pub fn match_response(&self, response: &ProbeResponse) -> Option<&'s str> {
        let rule = self
            .store
            .header_rules()
            .iter()
            .find(|rule| match rule.scope() {
                Scope::Header(name) => response.header_values(name).any(|v| rule.matches_value(v)),
                Scope::Body => false,
            })
            .or_else(|| {
                self.store.body_rules().iter().find(|rule| rule.matches_body(&response.body))
            })?;

        tracing::trace!(scope = ?rule.scope(), pattern = rule.pattern(), label = rule.label(), "rule fired");
        Some(rule.label())
    }

    /// Turn the trigger outcomes, in the order they were collected, into a verdict.
    ///
    /// Only blocked responses are fingerprinted. A named match returns at once and
    /// outranks any later success; `NoWaf` needs the last trigger to have passed.
    pub fn classify(&self, outcomes: &[(Trigger, ProbeOutcome)]) -> WafVerdict {
        let mut terminal_success = false;

        for (i, (trigger, outcome)) in outcomes.iter().enumerate() {
            match outcome {
                ProbeOutcome::Success(_) => {
                    if i + 1 == outcomes.len() {
                        terminal_success = true;
                    }
                }
                ProbeOutcome::HttpError(response) => {
                    if let Some(label) = self.match_response(response) {
                        tracing::debug!(%trigger, status = response.status, label, "signature matched");
                        return WafVerdict::Named(label.to_string());
                    }
                }
                ProbeOutcome::TransportError(_) => {}
            }
        }

        if terminal_success {
            WafVerdict::NoWaf
        } else {
            WafVerdict::Unknown
        }
    }
}
