use clap::error::ErrorKind;
use clap::Parser;

use waf_probe::error::exit;

/// Detect the WAF in front of a URL and test the Imperva gzip Content-Encoding bypass.
#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target URL (http or https)
    pub url: String,

    /// Only print the detected WAF type and exit
    #[arg(short = 't', long = "type", default_value_t = false, conflicts_with_all = ["relaxed", "parallel", "json"])]
    pub waf_type: bool,

    /// Relaxed mode: accept HTTP 2xx/3xx for the baseline POST instead of only 200
    #[arg(short = 'r', long, default_value_t = false)]
    pub relaxed: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5_u64)]
    pub timeout: u64,

    /// Send both bypass probes concurrently
    #[arg(long, default_value_t = false)]
    pub parallel: bool,

    /// Print a JSON report instead of progress lines
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable detailed debug logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

/// Parse argv. On failure returns the exit status to terminate with.
pub fn parse_cli() -> Result<Cli, u8> {
    parse_cli_from(std::env::args_os())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<Cli, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
            _ => exit::INVALID_INVOCATION,
        }
    })
}
