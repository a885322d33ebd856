pub mod http_probe;
pub mod outcome;
pub mod transport;

pub use http_probe::{ProbeRunner, Trigger};
pub use outcome::{ProbeOutcome, ProbeResponse, TransportError, TransportErrorKind};
pub use transport::{HttpTransport, ProbeRequest, ReqwestTransport};
