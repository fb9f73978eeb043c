use tracker_core::{OperationStatus, RawSnapshot};

#[test]
fn statuses_parse_case_insensitively() {
    assert_eq!(OperationStatus::from("Completed"), OperationStatus::Completed);
    assert_eq!(OperationStatus::from(" CRAWLING "), OperationStatus::Crawling);
    assert_eq!(OperationStatus::from("canceled"), OperationStatus::Cancelled);
    assert_eq!(
        OperationStatus::from("reticulating"),
        OperationStatus::Other("reticulating".to_string())
    );
}

#[test]
fn only_the_four_terminal_statuses_are_terminal() {
    for status in ["completed", "error", "failed", "cancelled"] {
        assert!(OperationStatus::from(status).is_terminal(), "{status}");
    }
    for status in ["pending", "crawling", "stopping", "document_storage", "unknown"] {
        assert!(!OperationStatus::from(status).is_terminal(), "{status}");
    }
}

#[test]
fn partial_snapshot_json_decodes_with_defaults() {
    let raw: RawSnapshot = serde_json::from_str(
        r#"{"id":"op-1","progress_percentage":12.5,"target_url":"https://docs.example.com"}"#,
    )
    .unwrap();
    assert_eq!(raw.id, "op-1");
    assert_eq!(raw.status, OperationStatus::Other("unknown".to_string()));
    assert_eq!(raw.progress_percentage, Some(12.5));
    assert_eq!(raw.pages_processed, None);
    assert_eq!(raw.updated_at, None);
}

#[test]
fn full_snapshot_json_decodes() {
    let raw: RawSnapshot = serde_json::from_str(
        r#"{
            "id": "op-2",
            "status": "code_extraction",
            "progress_percentage": 70,
            "pages_processed": 112,
            "code_examples_found": 9,
            "current_depth": null,
            "max_depth": 3,
            "target_url": "https://docs.example.com",
            "error_message": null,
            "updated_at": "2024-05-01T12:00:00Z",
            "operation_type": "crawl"
        }"#,
    )
    .unwrap();
    assert_eq!(raw.status, OperationStatus::CodeExtraction);
    assert_eq!(raw.progress_percentage, Some(70.0));
    assert_eq!(raw.pages_processed, Some(112));
    assert_eq!(raw.max_depth, Some(3));
    assert_eq!(raw.operation_type.as_deref(), Some("crawl"));
    assert!(raw.updated_at.is_some());
}
