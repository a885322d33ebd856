pub mod console;
pub mod report;

pub use console::{error_line, event_line};
pub use report::RunReport;
