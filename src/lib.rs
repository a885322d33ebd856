pub mod config;
pub mod error;
pub mod http_client;
pub mod output;
pub mod probe;
pub mod waf;

// re-export the types most callers need
pub use crate::config::ProbeConfig;
pub use crate::error::RunError;
pub use crate::waf::{BypassSession, WafVerdict};
