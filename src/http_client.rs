use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::config::ProbeConfig;

/// Build the HTTP client every probe goes through.
///
/// Redirects are never followed: a 3xx from the target is a verdict, not a hop.
pub fn create_probe_client(config: &ProbeConfig) -> reqwest::Result<Client> {
    ClientBuilder::new()
        .pool_max_idle_per_host(2)
        .tcp_nodelay(true)

        // Timeouts
        .timeout(config.timeout())
        .connect_timeout(config.timeout().min(Duration::from_secs(5)))

        // Compression
        .gzip(true)
        .brotli(true)

        // TLS
        .use_rustls_tls()
        .tls_sni(true)
        .https_only(false)

        .redirect(reqwest::redirect::Policy::none())
        .user_agent(config.user_agent.as_str())

        // Targets are frequently staging hosts with self-signed certificates
        .danger_accept_invalid_certs(true)

        .build()
}
