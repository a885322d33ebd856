use crate::error::RunError;
use crate::waf::RunEvent;

/// Progress line for a session event.
pub fn event_line(event: &RunEvent<'_>) -> String {
    match event {
        RunEvent::BaselineStarted { url } => format!("[+] Can we make POST requests to {}?", url),
        RunEvent::BaselineAccepted { status } => {
            format!("[+] Got HTTP {} response to POST. Checking for Imperva WAF...", status)
        }
        RunEvent::TargetFound { .. } => "[+] Found Imperva WAF!".to_string(),
        RunEvent::BypassStarted { trigger } => {
            format!("[+] Attempting gzip bypass for {} trigger...", trigger)
        }
        RunEvent::BypassFinished(attempt) if attempt.vulnerable => {
            format!("[+] Vulnerable! HTTP response code: {}", attempt.status)
        }
        RunEvent::BypassFinished(attempt) => {
            format!("[-] Not vulnerable. HTTP response code: {}", attempt.status)
        }
    }
}

/// Line explaining why a run stopped early.
pub fn error_line(error: &RunError) -> String {
    format!("[!] {}", error)
}
