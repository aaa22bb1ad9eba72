//! End-to-end tests for the cost anomaly checker against in-memory clients.

use std::sync::Arc;

use chrono::NaiveDate;
use finwatch_abstraction::UpstreamError;
use finwatch_clients::{InMemoryBilling, RecordingNotifier};
use finwatch_core::cost::ALERT_SUBJECT;
use finwatch_core::{CostAnomalyChecker, CostAnomalyConfig};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn config(threshold: &str) -> CostAnomalyConfig {
    let vars = [
        ("ALERT_EMAIL", "ops@example.com"),
        ("ALERT_SENDER", "finops@example.com"),
        ("ANOMALY_THRESHOLD", threshold),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    CostAnomalyConfig::from_vars(vars).unwrap()
}

fn checker(billing: InMemoryBilling, notifier: &RecordingNotifier) -> CostAnomalyChecker {
    CostAnomalyChecker::new(Arc::new(billing), Arc::new(notifier.clone()), config("1.2"))
}

#[tokio::test]
async fn test_spike_sends_alert() {
    let notifier = RecordingNotifier::new();
    let billing = InMemoryBilling::trailing(today(), &[100.0, 100.0, 100.0, 130.0]);

    let response = checker(billing, &notifier).run(today()).await;

    assert_eq!(response.status_code, 200);
    let body = response.body_json().unwrap();
    assert_eq!(body["anomaly"], true);
    assert_eq!(body["cost"], 130.0);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ops@example.com");
    assert_eq!(sent[0].from, "finops@example.com");
    assert_eq!(sent[0].subject, ALERT_SUBJECT);
    assert_eq!(sent[0].body, "Alert: Cost anomaly detected. Latest daily cost: $130.00");
}

#[tokio::test]
async fn test_steady_spend_sends_nothing() {
    let notifier = RecordingNotifier::new();
    let billing = InMemoryBilling::trailing(today(), &[100.0, 100.0, 100.0, 110.0]);

    let response = checker(billing, &notifier).run(today()).await;

    assert_eq!(response.status_code, 200);
    let body = response.body_json().unwrap();
    assert_eq!(body["anomaly"], false);
    assert_eq!(body["cost"], 110.0);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_window_excludes_today() {
    let notifier = RecordingNotifier::new();
    // Six history days plus a spike dated today, which must not be queried.
    let mut points: Vec<_> = (1..=6)
        .map(|d| finwatch_abstraction::DailyCostPoint::new(today() - chrono::Days::new(d), 100.0))
        .collect();
    points.push(finwatch_abstraction::DailyCostPoint::new(today(), 900.0));

    let response = checker(InMemoryBilling::new(points), &notifier).run(today()).await;

    let body = response.body_json().unwrap();
    assert_eq!(body["anomaly"], false);
    assert_eq!(body["cost"], 100.0);
}

#[tokio::test]
async fn test_insufficient_data_is_not_an_anomaly() {
    let notifier = RecordingNotifier::new();

    let response = checker(InMemoryBilling::trailing(today(), &[500.0]), &notifier).run(today()).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body_json().unwrap()["anomaly"], false);

    let response = checker(InMemoryBilling::new(Vec::new()), &notifier).run(today()).await;
    let body = response.body_json().unwrap();
    assert_eq!(body["anomaly"], false);
    assert_eq!(body["cost"], 0.0);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_zero_baseline_is_not_an_anomaly() {
    let notifier = RecordingNotifier::new();
    let billing = InMemoryBilling::trailing(today(), &[0.0, 0.0, 0.0, 50.0]);

    let response = checker(billing, &notifier).run(today()).await;

    assert_eq!(response.body_json().unwrap()["anomaly"], false);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_billing_failure_returns_error_response() {
    let notifier = RecordingNotifier::new();
    let billing =
        InMemoryBilling::failing(UpstreamError::unreachable("ce", "AccessDeniedException"));

    let response = checker(billing, &notifier).run(today()).await;

    assert_eq!(response.status_code, 500);
    let message = response.body_json().unwrap();
    let message = message.as_str().unwrap();
    assert!(message.starts_with("Error during cost anomaly check:"));
    assert!(message.contains("AccessDeniedException"));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_alert_failure_returns_error_response() {
    let notifier = RecordingNotifier::new().failing_for("ops@example.com");
    let billing = InMemoryBilling::trailing(today(), &[100.0, 100.0, 200.0]);

    let response = checker(billing, &notifier).run(today()).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("MessageRejected"));
}

#[tokio::test]
async fn test_higher_threshold_suppresses_alert() {
    let notifier = RecordingNotifier::new();
    let billing = InMemoryBilling::trailing(today(), &[100.0, 100.0, 130.0]);
    let checker =
        CostAnomalyChecker::new(Arc::new(billing), Arc::new(notifier.clone()), config("1.5"));

    let verdict = checker.check(today()).await.unwrap();

    assert!(!verdict.is_anomaly);
    assert!(notifier.sent().is_empty());
}
