use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracker_core::{OperationRegistry, OperationStatus, RawSnapshot};
use tracker_engine::{
    CommandDispatcher, FailureKind, ReqwestProgressSource, SharedRegistry, SourceSettings,
    StopError, StopOutcome,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry_with(snapshots: &[RawSnapshot]) -> SharedRegistry {
    let mut registry = OperationRegistry::default();
    registry.apply_batch(snapshots, Utc::now());
    Arc::new(Mutex::new(registry))
}

fn dispatcher_for(server: &MockServer, registry: SharedRegistry) -> CommandDispatcher {
    let source = ReqwestProgressSource::new(SourceSettings {
        base_url: format!("{}/api", server.uri()),
        ..SourceSettings::default()
    })
    .expect("valid base url");
    CommandDispatcher::new(Arc::new(source), registry)
}

#[tokio::test]
async fn concurrent_stop_requests_are_deduplicated() {
    tracker_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/operations/op-1/stop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(150))
                .set_body_raw(r#"{"success":true}"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_with(&[RawSnapshot::new("op-1", "crawling")]);
    let dispatcher = dispatcher_for(&server, registry.clone());

    let (first, second) = tokio::join!(
        dispatcher.request_stop("op-1"),
        dispatcher.request_stop("op-1")
    );
    assert_eq!(first, Ok(StopOutcome::Acknowledged));
    assert_eq!(second, Ok(StopOutcome::Acknowledged));
    assert!(!dispatcher.is_stop_in_flight("op-1"));

    let registry = registry.lock().unwrap();
    let tracked = registry.get("op-1").unwrap();
    assert!(tracked.is_pending_cancel());
    assert_eq!(tracked.state().status, OperationStatus::Crawling);
}

#[tokio::test]
async fn sequential_stop_requests_are_sent_again() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/operations/op-1/stop"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let registry = registry_with(&[RawSnapshot::new("op-1", "crawling")]);
    let dispatcher = dispatcher_for(&server, registry);

    assert_eq!(dispatcher.request_stop("op-1").await, Ok(StopOutcome::Acknowledged));
    assert_eq!(dispatcher.request_stop("op-1").await, Ok(StopOutcome::Acknowledged));
}

#[tokio::test]
async fn transport_failure_is_recoverable_and_leaves_registry_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/operations/op-1/stop"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = registry_with(&[RawSnapshot::new("op-1", "crawling").with_progress(20.0)]);
    let before = registry.lock().unwrap().get("op-1").cloned();
    let dispatcher = dispatcher_for(&server, registry.clone());

    let err = dispatcher.request_stop("op-1").await.unwrap_err();
    match &err {
        StopError::Transport { id, error } => {
            assert_eq!(id, "op-1");
            assert_eq!(error.kind, FailureKind::HttpStatus(500));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(registry.lock().unwrap().get("op-1").cloned(), before);
    assert!(!dispatcher.is_stop_in_flight("op-1"));
}

#[tokio::test]
async fn finished_operations_are_not_stopped_again() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry_with(&[RawSnapshot::new("op-1", "completed")]);
    let dispatcher = dispatcher_for(&server, registry);

    assert_eq!(
        dispatcher.request_stop("op-1").await,
        Ok(StopOutcome::AlreadyFinished)
    );
    assert_eq!(dispatcher.request_stop("  ").await, Err(StopError::EmptyId));
}

#[tokio::test]
async fn unknown_ids_are_forwarded_to_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/operations/op-404/stop"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_with(&[]);
    let dispatcher = dispatcher_for(&server, registry.clone());

    assert_eq!(dispatcher.request_stop("op-404").await, Ok(StopOutcome::Acknowledged));
    assert!(registry.lock().unwrap().is_empty());
}
