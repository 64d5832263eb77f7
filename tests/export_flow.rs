//! Export, council and cohort calls (gateway-key endpoints plus council).

mod support;

use demeterics_nodes::AdapterError;
use demeterics_nodes::auth::VendorKeySlot;
use demeterics_nodes::nodes::cohort::CohortNode;
use demeterics_nodes::nodes::council::CouncilNode;
use demeterics_nodes::nodes::export::ExportNode;
use demeterics_nodes::nodes::{Node, NodeContext};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn export_simple_streams_ndjson_rows() {
    let mut server = support::start().await;
    let create = server
        .mock("POST", "/api/v1/exports")
        .match_header("authorization", "Bearer dmt_test_key_123")
        .match_body(Matcher::PartialJson(json!({"format": "json", "start_date": "2024-01-01"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"request_id":"req_abc123","status":"queued"}"#)
        .create_async()
        .await;
    let stream = server
        .mock("GET", "/api/v1/exports/req_abc123/stream")
        .with_status(200)
        .with_body("{\"id\":1}\n{\"id\":2}\r\n\ncorrupted line\n")
        .create_async()
        .await;

    // BYOK keys must not leak into gateway-only calls
    let settings = support::byok_settings(&server, VendorKeySlot::Groq, "gsk_vendor");
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let out = ExportNode
        .execute(
            &ctx,
            json!({"operation": "export_simple", "start_date": "2024-01-01"}),
        )
        .await
        .unwrap();

    create.assert_async().await;
    stream.assert_async().await;
    let rows: Vec<_> = out.iter().map(|i| i.json.clone()).collect();
    assert_eq!(
        rows,
        vec![json!({"id": 1}), json!({"id": 2}), json!({"raw": "corrupted line"})]
    );
}

#[tokio::test]
async fn csv_stream_is_one_binary_item() {
    let mut server = support::start().await;
    let _stream = server
        .mock("GET", "/api/v1/exports/req_1/stream")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body("id,model\n1,llama\n")
        .create_async()
        .await;

    let settings = support::settings(&server);
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let out = ExportNode
        .execute(
            &ctx,
            json!({"operation": "stream", "request_id": "req_1", "stream_format": "csv"}),
        )
        .await
        .unwrap();

    assert_eq!(out.len(), 1);
    let binary = out[0].binary.as_ref().unwrap();
    assert_eq!(binary.mime_type, "text/csv");
    assert_eq!(binary.file_name, "export.csv");
    assert_eq!(binary.data, b"id,model\n1,llama\n");
}

#[tokio::test]
async fn create_without_request_id_fails_export_simple() {
    let mut server = support::start().await;
    let _create = server
        .mock("POST", "/api/v1/exports")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"queued"}"#)
        .create_async()
        .await;

    let settings = support::settings(&server);
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let err = ExportNode
        .execute(&ctx, json!({"operation": "export_simple"}))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::MissingRequestId));
}

#[tokio::test]
async fn invalid_request_id_is_rejected_before_fetching() {
    let mut server = support::start().await;
    let any = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let settings = support::settings(&server);
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let err = ExportNode
        .execute(&ctx, json!({"operation": "stream", "request_id": "../../admin"}))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::InvalidRequestId(_)));
    any.assert_async().await;
}

#[tokio::test]
async fn council_uses_groq_slot_and_reports_hint() {
    let mut server = support::start().await;
    let _mock = server
        .mock("POST", "/council/v1/evaluate")
        .match_header("authorization", "Bearer dmt_test_key_123;gsk_vendor")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"bad key"}"#)
        .create_async()
        .await;

    let settings = support::byok_settings(&server, VendorKeySlot::Groq, "gsk_vendor");
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let err = CouncilNode
        .execute(&ctx, json!({"question": "Is it clear?", "content": "Some text"}))
        .await
        .unwrap_err();

    let record = err.to_item_json();
    assert_eq!(record["status_code"], 401);
    assert_eq!(
        record["error"],
        "Council API request failed (HTTP 401): API Error: bad key"
    );
    assert!(record["hint"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn cohort_get_sends_query() {
    let mut server = support::start().await;
    let mock = server
        .mock("GET", "/api/v1/cohort/outcome")
        .match_query(Matcher::UrlEncoded("cohort_id".into(), "c-42".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"cohort_id":"c-42","outcome":1.0}"#)
        .create_async()
        .await;

    let settings = support::settings(&server);
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let out = CohortNode
        .execute(&ctx, json!({"operation": "get", "cohort_id": "c-42"}))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(out[0].json["outcome"], 1.0);
}

#[tokio::test]
async fn oversized_export_stream_is_refused() {
    let mut server = support::start().await;
    let _stream = server
        .mock("GET", "/api/v1/exports/req_big/stream")
        .with_status(200)
        .with_body("{\"id\":1}\n".repeat(64))
        .create_async()
        .await;

    let mut settings = support::settings(&server);
    settings.http.max_export_bytes = 100;
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let err = ExportNode
        .execute(&ctx, json!({"operation": "stream", "request_id": "req_big"}))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::TooLarge { limit: 100 }));
}
