//! Full-size runs with the shipped defaults (50 workers, 10 seconds).
//!
//! Slow, so ignored by default: `cargo test -- --ignored`

use std::time::{Duration, Instant};

use ingest_stress::config::Config;
use ingest_stress::report::Termination;
use ingest_stress::LoadDriver;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::mock_http_server::{Behavior, MockHttpServer};

/// Default configuration against an always-200 server: every completed
/// attempt is a success and the window closes on the timer.
#[tokio::test]
#[ignore] // Ignore by default as this is a slow test
async fn test_default_profile_against_healthy_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut cfg = Config::default();
    cfg.target.url = format!("{}/ingest", server.uri());

    let report = LoadDriver::new(cfg).unwrap().run().await.unwrap();
    let received = server.received_requests().await.unwrap().len() as u64;

    println!("{}", report.render_text());
    assert_eq!(report.termination, Termination::Elapsed);
    assert_eq!(report.counts.fail_count, 0);
    assert_eq!(report.counts.success_count, received);
    assert_eq!(
        report.requests_per_second,
        report.counts.success_count as f64 / 10.0
    );
}

/// Responses slower than the grace period with a long request timeout: the
/// in-flight requests are abandoned and every worker is aborted.
#[tokio::test]
#[ignore] // Ignore by default as this is a slow test
async fn test_default_profile_against_slow_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let mut cfg = Config::default();
    cfg.target.url = format!("{}/ingest", server.uri());
    cfg.load.request_timeout_ms = 30_000;

    let started = Instant::now();
    let report = LoadDriver::new(cfg).unwrap().run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(13));
    assert!(report.counts.success_count >= 50);
    assert_eq!(report.counts.fail_count, 0);
    assert_eq!(report.stragglers, 50);
}

/// Sustained connection churn must neither deadlock nor lose counts.
#[tokio::test]
#[ignore] // Ignore by default as this is a slow test
async fn test_default_profile_against_dropping_target() {
    let server = MockHttpServer::start(Behavior::CloseOnAccept).await;

    let mut cfg = Config::default();
    cfg.target.url = server.url("/ingest");

    let report = LoadDriver::new(cfg).unwrap().run().await.unwrap();

    assert_eq!(report.stragglers, 0);
    assert_eq!(report.counts.success_count, 0);
    assert_eq!(report.counts.transport_faults, report.counts.fail_count);
    assert!(report.counts.fail_count > 0);
}
