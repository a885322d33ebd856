use serde::Serialize;

use super::detector::{WafDetector, WafVerdict};
use crate::error::{exit, RunError};
use crate::probe::{ProbeOutcome, ProbeRunner, Trigger};

/// The only WAF family the gzip bypass is tested against.
pub const TARGET_WAF: &str = "Imperva Incapsula";

/// Session progress. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    BaselineChecked,
    Classified,
    Testing,
    Done,
}

/// Which trigger payloads slipped past the WAF with the gzip header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub unix_vulnerable: bool,
    pub windows_vulnerable: bool,
}

impl TestResult {
    fn record(&mut self, trigger: Trigger, vulnerable: bool) {
        match trigger {
            Trigger::Unix => self.unix_vulnerable = vulnerable,
            Trigger::Windows => self.windows_vulnerable = vulnerable,
        }
    }

    pub fn is_vulnerable(&self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::Unix => self.unix_vulnerable,
            Trigger::Windows => self.windows_vulnerable,
        }
    }

    /// 128 with bit 1 for UNIX and bit 2 for Windows.
    pub fn exit_code(&self) -> u8 {
        Trigger::ALL
            .iter()
            .filter(|t| self.is_vulnerable(**t))
            .fold(exit::BYPASS_BASE, |code, t| code | t.bit())
    }
}

/// One gzip bypass probe and how the target answered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BypassAttempt {
    pub trigger: Trigger,
    pub vulnerable: bool,
    pub status: u16,
}

/// Progress notifications emitted while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent<'a> {
    BaselineStarted { url: &'a str },
    BaselineAccepted { status: u16 },
    TargetFound { label: &'a str },
    BypassStarted { trigger: Trigger },
    BypassFinished(&'a BypassAttempt),
}

/// Drives baseline, fingerprinting and bypass probes against one URL.
///
/// Each stage runs at most once; results are cached on the session. A new
/// target needs a new session.
pub struct BypassSession<'s> {
    runner: ProbeRunner,
    detector: WafDetector<'s>,
    stage: Stage,
    baseline_status: Option<u16>,
    verdict: Option<WafVerdict>,
    attempts: Vec<BypassAttempt>,
    result: Option<TestResult>,
}

impl BypassSession<'static> {
    pub fn new(runner: ProbeRunner) -> Self {
        Self::with_detector(runner, WafDetector::builtin())
    }
}

impl<'s> BypassSession<'s> {
    pub fn with_detector(runner: ProbeRunner, detector: WafDetector<'s>) -> Self {
        Self {
            runner,
            detector,
            stage: Stage::Init,
            baseline_status: None,
            verdict: None,
            attempts: Vec::new(),
            result: None,
        }
    }

    pub fn url(&self) -> &str {
        self.runner.url()
    }

    pub fn runner(&self) -> &ProbeRunner {
        &self.runner
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn baseline_status(&self) -> Option<u16> {
        self.baseline_status
    }

    pub fn verdict(&self) -> Option<&WafVerdict> {
        self.verdict.as_ref()
    }

    pub fn attempts(&self) -> &[BypassAttempt] {
        &self.attempts
    }

    pub fn result(&self) -> Option<TestResult> {
        self.result
    }

    fn advance(&mut self, to: Stage) {
        if to > self.stage {
            tracing::debug!(from = ?self.stage, to = ?to, "stage advanced");
            self.stage = to;
        }
    }

    /// Can we POST to the target at all? Returns the accepted status.
    pub async fn check_baseline(&mut self) -> Result<u16, RunError> {
        if let Some(status) = self.baseline_status {
            return Ok(status);
        }

        match self.runner.baseline_probe().await {
            ProbeOutcome::Success(response) => {
                tracing::info!(url = %self.url(), status = response.status, "baseline accepted");
                self.baseline_status = Some(response.status);
                self.advance(Stage::BaselineChecked);
                Ok(response.status)
            }
            ProbeOutcome::HttpError(response) => Err(RunError::BaselineRejected {
                status: response.status,
                relaxed: self.runner.config().relaxed,
            }),
            ProbeOutcome::TransportError(e) => Err(e.into()),
        }
    }

    /// Fingerprint the WAF, probing only on the first call.
    pub async fn waf_type(&mut self) -> Result<WafVerdict, RunError> {
        if let Some(verdict) = &self.verdict {
            return Ok(verdict.clone());
        }

        let mut outcomes = Vec::with_capacity(Trigger::ALL.len());
        for trigger in Trigger::ALL {
            let outcome = self.runner.trigger_probe(trigger).await;
            if let ProbeOutcome::TransportError(e) = &outcome {
                return Err(e.clone().into());
            }
            // A named match settles it; no point firing the remaining triggers.
            let settled = match &outcome {
                ProbeOutcome::HttpError(response) => self.detector.match_response(response).is_some(),
                _ => false,
            };
            outcomes.push((trigger, outcome));
            if settled {
                break;
            }
        }

        let verdict = self.detector.classify(&outcomes);
        tracing::info!(url = %self.url(), verdict = %verdict, "classified");
        self.verdict = Some(verdict.clone());
        self.advance(Stage::Classified);
        Ok(verdict)
    }

    /// Drop the cached verdict and fingerprint again.
    pub async fn reclassify(&mut self) -> Result<WafVerdict, RunError> {
        self.verdict = None;
        self.waf_type().await
    }

    /// Send one gzip bypass probe. Does not touch session state.
    pub async fn attempt(&self, trigger: Trigger) -> Result<BypassAttempt, RunError> {
        match self.runner.bypass_probe(trigger).await {
            ProbeOutcome::Success(response) => {
                Ok(BypassAttempt { trigger, vulnerable: true, status: response.status })
            }
            ProbeOutcome::HttpError(response) => {
                Ok(BypassAttempt { trigger, vulnerable: false, status: response.status })
            }
            ProbeOutcome::TransportError(e) => Err(e.into()),
        }
    }

    fn attempted(&self, trigger: Trigger) -> bool {
        self.attempts.iter().any(|a| a.trigger == trigger)
    }

    fn record(&mut self, attempt: BypassAttempt) {
        tracing::info!(trigger = %attempt.trigger, vulnerable = attempt.vulnerable, status = attempt.status, "bypass tested");
        self.attempts.push(attempt);
    }

    /// Run both bypass probes. Requires a verdict naming the target WAF.
    pub async fn run_bypass_tests<F>(&mut self, mut on_event: F) -> Result<TestResult, RunError>
    where
        F: FnMut(RunEvent<'_>),
    {
        if let Some(result) = self.result {
            return Ok(result);
        }
        ensure_target(&self.waf_type().await?)?;
        self.advance(Stage::Testing);

        // Triggers finished by an earlier, interrupted call are not sent again.
        let pending: Vec<Trigger> =
            Trigger::ALL.into_iter().filter(|t| !self.attempted(*t)).collect();

        if self.runner.config().parallel_bypass && pending.len() == Trigger::ALL.len() {
            for trigger in Trigger::ALL {
                on_event(RunEvent::BypassStarted { trigger });
            }
            let (unix, windows) =
                tokio::join!(self.attempt(Trigger::Unix), self.attempt(Trigger::Windows));
            // Keep whichever attempt completed even when the other one failed.
            let mut first_error = None;
            for attempt in [unix, windows] {
                match attempt {
                    Ok(attempt) => {
                        on_event(RunEvent::BypassFinished(&attempt));
                        self.record(attempt);
                    }
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        } else {
            for trigger in pending {
                on_event(RunEvent::BypassStarted { trigger });
                let attempt = self.attempt(trigger).await?;
                on_event(RunEvent::BypassFinished(&attempt));
                self.record(attempt);
            }
        }

        let mut result = TestResult::default();
        for attempt in &self.attempts {
            result.record(attempt.trigger, attempt.vulnerable);
        }
        self.result = Some(result);
        self.advance(Stage::Done);
        Ok(result)
    }

    /// Full pipeline: baseline, fingerprint, then the bypass probes.
    pub async fn run<F>(&mut self, mut on_event: F) -> Result<TestResult, RunError>
    where
        F: FnMut(RunEvent<'_>),
    {
        on_event(RunEvent::BaselineStarted { url: self.runner.url() });
        let status = self.check_baseline().await?;
        on_event(RunEvent::BaselineAccepted { status });

        let verdict = self.waf_type().await?;
        ensure_target(&verdict)?;
        on_event(RunEvent::TargetFound { label: verdict.name() });

        self.run_bypass_tests(on_event).await
    }
}

fn ensure_target(verdict: &WafVerdict) -> Result<(), RunError> {
    match verdict {
        WafVerdict::NoWaf => Err(RunError::NoWaf),
        v if v.is(TARGET_WAF) => Ok(()),
        other => Err(RunError::WafMismatch { label: other.name().to_string() }),
    }
}

/// Process exit status for a finished run.
pub fn exit_code(outcome: &Result<TestResult, RunError>) -> u8 {
    match outcome {
        Ok(result) => result.exit_code(),
        Err(e) => e.exit_code(),
    }
}
