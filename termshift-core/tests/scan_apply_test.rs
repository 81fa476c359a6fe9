use serde_json::json;
use tempfile::TempDir;
use termshift_core::audit::{AuditEntry, JsonlAuditLog};
use termshift_core::{
    ChangeApplier, MemoryRecordStore, RecordScanner, ScanOptions, ScanRequest, ScanResponse,
    SelectedChange, SweepError,
};

fn snapshot() -> MemoryRecordStore {
    MemoryRecordStore::from_snapshot_value(json!({
        "blog_post": [
            {
                "uid": "blt01",
                "_version": 3,
                "title": "Why OldBrand matters",
                "body": {
                    "type": "doc",
                    "uid": "doc1",
                    "attrs": {},
                    "children": [
                        {
                            "type": "p",
                            "attrs": {"style": {}},
                            "children": [
                                {"text": "Visit the "},
                                {
                                    "type": "a",
                                    "attrs": {"href": "https://oldbrand.com", "target": "_blank"},
                                    "children": [{"text": "OldBrand site", "bold": true}]
                                },
                                {"text": " or mail info@oldbrand.com."}
                            ]
                        }
                    ]
                },
                "tags": ["oldbrand", "news"],
                "created_by": "OldBrand"
            },
            {
                "uid": "blt02",
                "_version": 1,
                "title": "Unrelated post",
                "body": {"type": "doc", "children": [{"type": "p", "children": [{"text": "Nothing"}]}]}
            }
        ],
        "product": [
            {"uid": "blt10", "title": "Try Gemini 2.5 Pro today", "summary": null}
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn scan_then_apply_rewrites_rich_text_and_links() {
    let store = snapshot();
    let request = ScanRequest::new("OldBrand", "NewBrand")
        .with_content_types(vec!["blog_post".to_string()])
        .with_options(ScanOptions {
            update_links: true,
            named_entities: true,
            ..ScanOptions::default()
        });

    let report = RecordScanner::new(&store).scan(&request).await.unwrap();
    assert_eq!(report.total_entries, 2);
    assert_eq!(report.entries_with_changes, 1);

    let result = &report.results[0];
    let fields: Vec<&str> = result.changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["title", "body", "tags"]);

    let link = &result.updated_data["body"]["children"][0]["children"][1];
    assert_eq!(link["attrs"]["href"], "https://newbrand.com");
    assert_eq!(link["attrs"]["target"], "_blank");
    assert_eq!(link["children"][0]["text"], "NewBrand site");
    assert_eq!(link["children"][0]["bold"], true);
    assert_eq!(
        result.updated_data["body"]["children"][0]["children"][2]["text"],
        " or mail info@newbrand.com."
    );
    assert_eq!(result.updated_data["tags"], json!(["NewBrand", "news"]));
    assert_eq!(result.updated_data["created_by"], "OldBrand");

    let selected: Vec<SelectedChange> = report.results.iter().map(|r| r.to_selected_change()).collect();
    let temp = TempDir::new().unwrap();
    let audit = JsonlAuditLog::new(temp.path()).unwrap();
    let response = ChangeApplier::new(&store)
        .with_audit(&audit)
        .with_actor("editor")
        .apply(&selected)
        .await;

    assert_eq!(response.applied_count, 1);
    let stored = store.get("blog_post", "blt01").unwrap();
    assert_eq!(stored["title"], "Why NewBrand matters");
    assert_eq!(stored["_version"], 4);

    let files = audit.list_log_files().unwrap();
    let line = std::fs::read_to_string(&files[0]).unwrap();
    let entry: AuditEntry = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(entry.record_id, "blt01");
    assert_eq!(entry.user_id, "editor");
    assert_eq!(entry.changes.len(), 3);

    // A second scan finds nothing left to change
    let again = RecordScanner::new(&store).scan(&request).await.unwrap();
    assert_eq!(again.entries_with_changes, 0);
}

#[tokio::test]
async fn context_aware_scan_keeps_version_and_edition() {
    let store = snapshot();
    let request = ScanRequest::new("Gemini 2.5 Pro", "Aurora")
        .with_content_types(vec!["product".to_string()])
        .with_options(ScanOptions {
            context_aware: true,
            ..ScanOptions::default()
        });

    let report = RecordScanner::new(&store).scan(&request).await.unwrap();

    let change = &report.results[0].changes[0];
    assert_eq!(change.after, json!("Try Aurora 2.5 Pro today"));
    assert_eq!(change.change_count, 1);
}

#[tokio::test]
async fn failed_scan_becomes_structured_failure() {
    let store = snapshot();
    let request = ScanRequest::new("OldBrand", "NewBrand").with_content_types(vec!["missing".to_string()]);

    let result = RecordScanner::new(&store).scan(&request).await;
    assert!(matches!(result, Err(SweepError::StorageUnavailable(_))));

    let response = ScanResponse::from_result(result, 10);
    assert!(!response.success);
    assert!(response.error.unwrap().contains("missing"));
    assert!(response.results.is_empty());
}
