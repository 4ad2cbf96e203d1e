//! Integration tests for the end-to-end dashboard workflow.

mod common;

use common::{FakeBackend, dashboard, entry, identity};
use vision_flow_app::AnalyzeOutcome;
use vision_flow_core::{ErrorKind, TransportError};
use vision_flow_ui::{NoticeLevel, WorkflowPhase};

#[test]
fn dashboard_flow_tests_views_stored_bottle_detection() {
    let backend = FakeBackend::seeded("a@x.com", vec![entry(1, "bottle")]);
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");

    let result = dashboard.view_history(1).expect("entry should display");

    assert_eq!(result.detected_label, "bottle");
    assert_eq!(
        result.original_image_ref.as_ref().map(|url| url.as_str()),
        Some("http://127.0.0.1:8000/static_uploads/img1.jpg")
    );
    assert_eq!(
        result.heatmap_ref.as_ref().map(|url| url.as_str()),
        Some("http://127.0.0.1:8000/static_uploads/hm1.jpg")
    );
    assert_eq!(backend.analyze_calls(), 0);
    assert_eq!(backend.fetch_calls(), 1);

    let view = dashboard.view();
    assert_eq!(view.headline, "Result: bottle");
    assert_eq!(view.history_status, "1 detection");
    assert!(view.history[0].selected);
}

#[test]
fn dashboard_flow_tests_analyze_refreshes_history_exactly_once() {
    let backend = FakeBackend::seeded("a@x.com", vec![entry(1, "bottle")]);
    backend.queue_label("can");
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");

    dashboard
        .select_file("scene.jpg", vec![0xFF, 0xD8, 0xFF])
        .expect("file should be accepted");
    let outcome = dashboard.analyze().expect("submit should start");

    let AnalyzeOutcome::Succeeded(result) = outcome else {
        panic!("analysis should succeed");
    };
    assert_eq!(result.detected_label, "can");
    assert_eq!(result.id, Some(2));
    assert_eq!(backend.analyze_calls(), 1);
    assert_eq!(backend.fetch_calls(), 2);

    let labels: Vec<&str> = dashboard
        .history()
        .iter()
        .map(|entry| entry.object_name.as_str())
        .collect();
    assert_eq!(labels, vec!["can", "bottle"]);
    assert_eq!(dashboard.controller().phase(), WorkflowPhase::Succeeded);
    assert!(dashboard.controller().pending_file().is_none());
    assert_eq!(dashboard.controller().live_previews(), 0);
}

#[test]
fn dashboard_flow_tests_minimal_success_payload_is_adopted() {
    let backend = FakeBackend::seeded("a@x.com", vec![entry(1, "bottle")]);
    backend.queue_raw_body(r#"{"detected":"can","advice":"Crush and recycle"}"#);
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");
    dashboard
        .select_file("scene.jpg", vec![0xFF, 0xD8])
        .expect("file should be accepted");

    let outcome = dashboard.analyze().expect("submit should start");

    let AnalyzeOutcome::Succeeded(result) = outcome else {
        panic!("minimal payload should succeed, got {outcome:?}");
    };
    assert_eq!(result.detected_label, "can");
    assert_eq!(result.advice, "Crush and recycle");
    assert_eq!(result.id, None);
    assert!(result.original_image_ref.is_none());
    assert!(result.heatmap_ref.is_none());
    assert_eq!(dashboard.controller().phase(), WorkflowPhase::Succeeded);
    assert_eq!(backend.fetch_calls(), 2);
    assert_eq!(dashboard.view().headline, "Result: can");
}

#[test]
fn dashboard_flow_tests_analyze_failure_keeps_file_for_retry() {
    let backend = FakeBackend::seeded("a@x.com", Vec::new());
    backend.fail_analyze(Some(TransportError::Status(503)));
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");
    dashboard
        .select_file("scene.jpg", vec![1, 2, 3])
        .expect("file should be accepted");

    let outcome = dashboard.analyze().expect("submit should start");
    assert!(matches!(outcome, AnalyzeOutcome::Failed(_)));
    assert_eq!(dashboard.controller().phase(), WorkflowPhase::FileSelected);
    assert_eq!(
        dashboard.controller().last_failure(),
        Some(ErrorKind::Network)
    );
    assert!(dashboard.controller().current_result().is_none());
    assert_eq!(backend.fetch_calls(), 1);
    assert_eq!(
        dashboard.notices().latest().map(|notice| notice.level),
        Some(NoticeLevel::Warning)
    );

    backend.fail_analyze(None);
    let retry = dashboard.analyze().expect("retry should start");
    assert!(matches!(retry, AnalyzeOutcome::Succeeded(_)));
    assert_eq!(backend.analyze_calls(), 2);
}

#[test]
fn dashboard_flow_tests_analyze_without_file_never_reaches_network() {
    let backend = FakeBackend::seeded("a@x.com", Vec::new());
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");

    let error = dashboard.analyze().expect_err("nothing selected");
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(backend.analyze_calls(), 0);
    assert_eq!(
        dashboard.notices().latest().map(|notice| notice.message.as_str()),
        Some("Select an image first.")
    );
}

#[test]
fn dashboard_flow_tests_network_failure_keeps_previous_list() {
    let backend = FakeBackend::seeded("a@x.com", vec![entry(1, "bottle"), entry(2, "can")]);
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");

    backend.fail_fetch(Some(TransportError::Unreachable("connection refused".to_string())));
    let error = dashboard.refresh_history().expect_err("refresh should fail");

    assert_eq!(error.kind(), ErrorKind::Network);
    assert_eq!(dashboard.history().len(), 2);
    assert!(dashboard.session().is_active());
    assert_eq!(
        dashboard.notices().latest().map(|notice| notice.level),
        Some(NoticeLevel::Warning)
    );
}

#[test]
fn dashboard_flow_tests_auth_rejection_ends_session() {
    let backend = FakeBackend::seeded("a@x.com", vec![entry(1, "bottle")]);
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");
    dashboard.view_history(1).expect("entry should display");

    backend.fail_fetch(Some(TransportError::Status(401)));
    let error = dashboard.refresh_history().expect_err("refresh should fail");

    assert_eq!(error.kind(), ErrorKind::Auth);
    assert!(!dashboard.session().is_active());
    assert!(dashboard.history().is_empty());
    assert!(dashboard.controller().current_result().is_none());
    assert_eq!(
        dashboard.notices().latest().map(|notice| notice.level),
        Some(NoticeLevel::Error)
    );
}

#[test]
fn dashboard_flow_tests_end_session_drops_identity_scoped_state() {
    let backend = FakeBackend::seeded("a@x.com", vec![entry(1, "bottle")]);
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");
    dashboard
        .select_file("scene.jpg", vec![1])
        .expect("file should be accepted");

    dashboard.end_session();

    let view = dashboard.view();
    assert!(!view.signed_in);
    assert_eq!(view.display_name, "User");
    assert!(view.history.is_empty());
    assert!(view.pending_file_name.is_none());
    assert_eq!(dashboard.controller().live_previews(), 0);

    let error = dashboard.refresh_history().expect_err("no identity");
    assert_eq!(error.kind(), ErrorKind::Auth);
    assert_eq!(backend.fetch_calls(), 1);
}

#[test]
fn dashboard_flow_tests_switching_identity_hides_previous_history() {
    let backend = FakeBackend::seeded("a@x.com", vec![entry(1, "bottle")]);
    let mut dashboard = dashboard(backend.clone());
    dashboard
        .sign_in(identity("a@x.com"))
        .expect("history should load");
    assert_eq!(dashboard.history().len(), 1);

    dashboard
        .sign_in(identity("b@x.com"))
        .expect("history should load");

    assert!(dashboard.history().is_empty());
    assert_eq!(dashboard.view().history_status, "No history found");
}
