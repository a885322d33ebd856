mod common;

use common::*;
use waf_probe::probe::{ProbeResponse, Trigger};
use waf_probe::waf::{exit_code, BypassSession, RunEvent, Stage, WafVerdict};
use waf_probe::{ProbeConfig, RunError};

fn strict() -> ProbeConfig {
    ProbeConfig::default()
}

/// Imperva in front: triggers blocked with the Incapsula page; gzip lets UNIX through.
fn imperva_unix_only() -> std::sync::Arc<Scripted> {
    Scripted::new(|req| {
        Ok(match shape_of(req) {
            Shape::Baseline => ProbeResponse::new(200),
            Shape::Trigger => ProbeResponse::new(403).with_body(INCAPSULA_BLOCK),
            Shape::Bypass if is_unix(req) => ProbeResponse::new(200),
            Shape::Bypass => ProbeResponse::new(403).with_body(INCAPSULA_BLOCK),
        })
    })
}

#[tokio::test]
async fn imperva_with_unix_bypass_exits_129() {
    let transport = imperva_unix_only();
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let outcome = session.run(|_| {}).await;

    assert_eq!(session.verdict(), Some(&WafVerdict::Named("Imperva Incapsula".into())));
    let result = outcome.clone().unwrap();
    assert!(result.unix_vulnerable);
    assert!(!result.windows_vulnerable);
    assert_eq!(exit_code(&outcome), 129);
    assert_eq!(session.stage(), Stage::Done);
    // Classification stopped after the first named match.
    assert_eq!(
        transport.shapes(),
        vec![Shape::Baseline, Shape::Trigger, Shape::Bypass, Shape::Bypass]
    );
}

#[tokio::test]
async fn events_follow_pipeline_order() {
    let transport = imperva_unix_only();
    let mut session = BypassSession::new(runner(transport, strict()));

    let mut lines = Vec::new();
    session
        .run(|event| lines.push(waf_probe::output::event_line(&event)))
        .await
        .unwrap();

    assert_eq!(lines[0], format!("[+] Can we make POST requests to {}?", TARGET));
    assert_eq!(lines[1], "[+] Got HTTP 200 response to POST. Checking for Imperva WAF...");
    assert_eq!(lines[2], "[+] Found Imperva WAF!");
    assert_eq!(lines[3], "[+] Attempting gzip bypass for UNIX trigger...");
    assert_eq!(lines[4], "[+] Vulnerable! HTTP response code: 200");
    assert_eq!(lines[5], "[+] Attempting gzip bypass for Windows trigger...");
    assert_eq!(lines[6], "[-] Not vulnerable. HTTP response code: 403");
}

#[tokio::test]
async fn both_bypasses_exit_131_in_parallel_mode() {
    let transport = Scripted::new(|req| {
        Ok(match shape_of(req) {
            Shape::Trigger => ProbeResponse::new(403).with_body(INCAPSULA_BLOCK),
            _ => ProbeResponse::new(200),
        })
    });
    let config = ProbeConfig { parallel_bypass: true, ..ProbeConfig::default() };
    let mut session = BypassSession::new(runner(transport, config));

    let mut finished = 0;
    let outcome = session
        .run(|event| {
            if let RunEvent::BypassFinished(_) = event {
                finished += 1;
            }
        })
        .await;

    assert_eq!(exit_code(&outcome), 131);
    assert_eq!(finished, 2);
    assert_eq!(session.attempts().len(), 2);
}

#[tokio::test]
async fn imperva_not_vulnerable_exits_128() {
    let transport = Scripted::new(|req| {
        Ok(match shape_of(req) {
            Shape::Baseline => ProbeResponse::new(200),
            _ => ProbeResponse::new(403).with_body(INCAPSULA_BLOCK),
        })
    });
    let mut session = BypassSession::new(runner(transport, strict()));
    assert_eq!(exit_code(&session.run(|_| {}).await), 128);
}

#[tokio::test]
async fn other_waf_exits_4_without_bypass() {
    let transport = Scripted::new(|req| {
        Ok(match shape_of(req) {
            Shape::Baseline => ProbeResponse::new(200),
            _ => ProbeResponse::new(403).with_header("X-CNection", "close"),
        })
    });
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let outcome = session.run(|_| {}).await;

    assert_eq!(outcome, Err(RunError::WafMismatch { label: "BigIP".into() }));
    assert_eq!(exit_code(&outcome), 4);
    assert!(!transport.shapes().contains(&Shape::Bypass));
    assert_eq!(session.stage(), Stage::Classified);
}

#[tokio::test]
async fn unidentified_block_exits_4() {
    let transport = Scripted::new(|req| {
        Ok(match shape_of(req) {
            Shape::Baseline => ProbeResponse::new(200),
            _ => ProbeResponse::new(406).with_body("Not Acceptable"),
        })
    });
    let mut session = BypassSession::new(runner(transport, strict()));
    let outcome = session.run(|_| {}).await;
    assert_eq!(session.verdict(), Some(&WafVerdict::Unknown));
    assert_eq!(exit_code(&outcome), 4);
}

#[tokio::test]
async fn unfiltered_target_exits_3() {
    let transport = Scripted::new(|_| Ok(ProbeResponse::new(200)));
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let outcome = session.run(|_| {}).await;

    assert_eq!(outcome, Err(RunError::NoWaf));
    assert_eq!(exit_code(&outcome), 3);
    assert_eq!(transport.shapes(), vec![Shape::Baseline, Shape::Trigger, Shape::Trigger]);
}

#[tokio::test]
async fn strict_baseline_rejects_redirect() {
    let transport = Scripted::new(|_| Ok(ProbeResponse::new(301)));
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let outcome = session.run(|_| {}).await;

    assert_eq!(outcome, Err(RunError::BaselineRejected { status: 301, relaxed: false }));
    assert_eq!(exit_code(&outcome), 5);
    assert_eq!(transport.count(), 1);
    assert_eq!(session.stage(), Stage::Init);
}

#[tokio::test]
async fn relaxed_baseline_accepts_redirect_but_not_server_error() {
    let transport = Scripted::new(|req| {
        Ok(match shape_of(req) {
            Shape::Baseline => ProbeResponse::new(301),
            _ => ProbeResponse::new(200),
        })
    });
    let relaxed = ProbeConfig { relaxed: true, ..ProbeConfig::default() };
    let mut session = BypassSession::new(runner(transport, relaxed.clone()));
    assert_eq!(session.check_baseline().await, Ok(301));

    let failing = Scripted::new(|_| Ok(ProbeResponse::new(500)));
    let mut session = BypassSession::new(runner(failing, relaxed));
    let outcome = session.run(|_| {}).await;
    assert_eq!(exit_code(&outcome), 5);
}

#[tokio::test]
async fn refused_baseline_exits_2_immediately() {
    let transport = Scripted::new(|req| Err(refused(req)));
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let outcome = session.run(|_| {}).await;

    assert!(matches!(outcome, Err(RunError::Transport(_))));
    assert_eq!(exit_code(&outcome), 2);
    assert_eq!(transport.count(), 1);
    assert!(session.verdict().is_none());
}

#[tokio::test]
async fn transport_failure_during_bypass_is_fatal() {
    let transport = Scripted::new(|req| match shape_of(req) {
        Shape::Baseline => Ok(ProbeResponse::new(200)),
        Shape::Trigger => Ok(ProbeResponse::new(403).with_body(INCAPSULA_BLOCK)),
        Shape::Bypass => Err(refused(req)),
    });
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let outcome = session.run(|_| {}).await;

    assert_eq!(exit_code(&outcome), 2);
    // Sequential mode stops after the first failed bypass probe.
    assert_eq!(transport.shapes().iter().filter(|s| **s == Shape::Bypass).count(), 1);
    assert!(session.result().is_none());
}

#[tokio::test]
async fn resumed_bypass_tests_skip_finished_triggers() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    // The first Windows bypass is refused; later ones answer 403.
    let windows_calls = AtomicUsize::new(0);
    let transport = Scripted::new(move |req| match shape_of(req) {
        Shape::Baseline => Ok(ProbeResponse::new(200)),
        Shape::Trigger => Ok(ProbeResponse::new(403).with_body(INCAPSULA_BLOCK)),
        Shape::Bypass if is_unix(req) => Ok(ProbeResponse::new(200)),
        Shape::Bypass => {
            if windows_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(refused(req))
            } else {
                Ok(ProbeResponse::new(403))
            }
        }
    });
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let first = session.run(|_| {}).await;
    assert_eq!(exit_code(&first), 2);
    assert_eq!(session.attempts().len(), 1);

    let mut started = Vec::new();
    let second = session
        .run_bypass_tests(|event| {
            if let RunEvent::BypassStarted { trigger } = event {
                started.push(trigger);
            }
        })
        .await;

    assert_eq!(exit_code(&second), 129);
    assert_eq!(started, vec![Trigger::Windows]);
    assert_eq!(session.attempts().len(), 2);
    assert_eq!(transport.shapes().iter().filter(|s| **s == Shape::Bypass).count(), 3);
    assert_eq!(session.stage(), Stage::Done);
}

#[tokio::test]
async fn parallel_failure_keeps_completed_attempt() {
    let transport = Scripted::new(|req| match shape_of(req) {
        Shape::Baseline => Ok(ProbeResponse::new(200)),
        Shape::Trigger => Ok(ProbeResponse::new(403).with_body(INCAPSULA_BLOCK)),
        Shape::Bypass if is_unix(req) => Ok(ProbeResponse::new(200)),
        Shape::Bypass => Err(refused(req)),
    });
    let config = ProbeConfig { parallel_bypass: true, ..ProbeConfig::default() };
    let mut session = BypassSession::new(runner(transport, config));

    let outcome = session.run(|_| {}).await;

    assert_eq!(exit_code(&outcome), 2);
    assert_eq!(session.attempts().len(), 1);
    assert_eq!(session.attempts()[0].trigger, Trigger::Unix);
    assert!(session.result().is_none());
}

#[tokio::test]
async fn verdict_is_cached_until_reclassify() {
    let transport = Scripted::new(|_| Ok(ProbeResponse::new(403).with_header("Server", "BigIP")));
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let first = session.waf_type().await.unwrap();
    let probes = transport.count();
    let second = session.waf_type().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.count(), probes);

    let third = session.reclassify().await.unwrap();
    assert_eq!(third, WafVerdict::Named("BigIP".into()));
    assert_eq!(transport.count(), probes * 2);
}

#[tokio::test]
async fn type_only_skips_baseline() {
    let transport = Scripted::new(|req| {
        Ok(match shape_of(req) {
            Shape::Trigger => ProbeResponse::new(403).with_body("Generated by Wordfence at Mon"),
            _ => ProbeResponse::new(500),
        })
    });
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    assert_eq!(session.waf_type().await.unwrap().to_string(), "WordFence");
    assert!(!transport.shapes().contains(&Shape::Baseline));
    assert_eq!(session.stage(), Stage::Classified);
}

#[tokio::test]
async fn bypass_tests_refuse_non_target() {
    let transport = Scripted::new(|_| Ok(ProbeResponse::new(200)));
    let mut session = BypassSession::new(runner(transport.clone(), strict()));

    let outcome = session.run_bypass_tests(|_| {}).await;

    assert_eq!(outcome, Err(RunError::NoWaf));
    assert!(!transport.shapes().contains(&Shape::Bypass));
}

#[tokio::test]
async fn json_report_reflects_run() {
    let transport = imperva_unix_only();
    let mut session = BypassSession::new(runner(transport, strict()));
    let outcome = session.run(|_| {}).await;

    let report = waf_probe::output::RunReport::from_session(&session, &outcome);
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(value["exit_code"], 129);
    assert_eq!(value["verdict"], "Imperva Incapsula");
    assert_eq!(value["baseline_status"], 200);
    assert_eq!(value["stage"], "done");
    assert_eq!(value["attempts"][0]["trigger"], "UNIX");
    assert_eq!(value["attempts"][1]["vulnerable"], false);
    assert!(value["error"].is_null());
}
