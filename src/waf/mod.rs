// WAF fingerprinting and the gzip Content-Encoding bypass check

pub mod detector;
pub mod bypass;
pub mod signatures;

pub use detector::{WafDetector, WafVerdict};
pub use bypass::{exit_code, BypassAttempt, BypassSession, RunEvent, Stage, TestResult, TARGET_WAF};
pub use signatures::{Rule, Scope, SignatureStore};
