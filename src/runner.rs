use std::sync::Arc;

use anyhow::Context;

use crate::cli::Cli;
use waf_probe::config::{parse_target, ProbeConfig};
use waf_probe::error::{exit, RunError};
use waf_probe::http_client::create_probe_client;
use waf_probe::output::{error_line, event_line, RunReport};
use waf_probe::probe::{ProbeRunner, ReqwestTransport};
use waf_probe::waf::{exit_code, BypassSession};

fn init_logging(cli: &Cli) {
    // Our crate at the requested level, HTTP internals capped at info. Logs go to
    // stderr so stdout only carries the tool's answer.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "waf_probe={crate},reqwest=info,hyper=info,rustls=info",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .init();
}

fn build_session(cli: &Cli) -> anyhow::Result<BypassSession<'static>> {
    let url = parse_target(&cli.url)?;
    let config = ProbeConfig {
        timeout_secs: cli.timeout,
        relaxed: cli.relaxed,
        parallel_bypass: cli.parallel,
        ..ProbeConfig::default()
    };
    let client = create_probe_client(&config).context("failed to build HTTP client")?;
    let runner = ProbeRunner::new(Arc::new(ReqwestTransport::new(client)), url.as_str(), config);
    Ok(BypassSession::new(runner))
}

/// Exit status for a failure before any probe was sent. A bad target is the
/// caller's mistake; anything else means we could not set up a connection.
fn setup_exit_code(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<RunError>() {
        Some(run_error) => run_error.exit_code(),
        None => exit::TRANSPORT_FAILURE,
    }
}

/// `-t`: the WAF label on success, the error line otherwise.
async fn report_waf_type(session: &mut BypassSession<'_>) -> (String, u8) {
    match session.waf_type().await {
        Ok(verdict) => (verdict.to_string(), exit::WAF_REPORTED),
        Err(e) => (error_line(&e), e.exit_code()),
    }
}

pub async fn run_from_cli(cli: Cli) -> u8 {
    init_logging(&cli);

    let mut session = match build_session(&cli) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("[!] {:#}", e);
            return setup_exit_code(&e);
        }
    };

    tracing::info!(url = %session.url(), relaxed = cli.relaxed, type_only = cli.waf_type, "Starting probe");

    if cli.waf_type {
        let (line, code) = report_waf_type(&mut session).await;
        println!("{}", line);
        return code;
    }

    let quiet = cli.json;
    let outcome = session
        .run(|event| {
            if !quiet {
                println!("{}", event_line(&event));
            }
        })
        .await;

    if cli.json {
        match RunReport::from_session(&session, &outcome).to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("failed to serialize report: {}", e),
        }
    } else if let Err(e) = &outcome {
        println!("{}", error_line(e));
    }

    exit_code(&outcome)
}
