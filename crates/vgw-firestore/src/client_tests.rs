//! Tests for Firestore client functionality.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{method, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vgw_models::{ConfigField, DetectionStatus, ObjectId, StatusRegistry};

use crate::client::{FirestoreClient, FirestoreConfig};
use crate::error::FirestoreError;
use crate::repos::{ConfigRepository, VideoRepository};
use crate::retry::RetryConfig;
use crate::types::Precondition;

// =============================================================================
// Test Helpers
// =============================================================================

const DOCS: &str = "/v1/projects/test-project/databases/.default./documents";

async fn emulator_client(server: &MockServer) -> FirestoreClient {
    let host = server.uri().trim_start_matches("http://").to_string();
    let mut config = FirestoreConfig::emulator("test-project", host);
    config.retry = RetryConfig {
        max_retries: 2,
        base_delay_ms: 1,
        max_delay_ms: 5,
    };
    FirestoreClient::new(config).await.unwrap()
}

fn doc_json(collection: &str, id: &str, fields: serde_json::Value) -> serde_json::Value {
    json!({
        "name": format!("projects/test-project/databases/(default)/documents/{}/{}", collection, id),
        "fields": fields,
        "createTime": "2024-05-01T10:00:00.000000Z",
        "updateTime": "2024-05-01T10:00:00.000000Z"
    })
}

fn config_json(id: &ObjectId, fields: serde_json::Value) -> serde_json::Value {
    doc_json(
        "config_sets",
        &id.to_hex(),
        json!({
            "name": {"stringValue": "camera"},
            "fields": {"arrayValue": {"values": fields}},
            "created_at": {"timestampValue": "2024-05-01T10:00:00Z"},
            "updated_at": {"timestampValue": "2024-05-01T10:00:00Z"}
        }),
    )
}

fn field_json(id: &ObjectId, key: &str, value: serde_json::Value) -> serde_json::Value {
    json!({"mapValue": {"fields": {
        "_id": {"stringValue": id.to_hex()},
        "key": {"stringValue": key},
        "value": value
    }}})
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_from_http_status_429() {
    let err = FirestoreError::from_http_status(429, "rate limited");
    assert!(matches!(err, FirestoreError::RateLimited(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_error_from_http_status_503() {
    let err = FirestoreError::from_http_status(503, "service unavailable");
    assert!(matches!(err, FirestoreError::ServerError(503, _)));
    assert!(err.is_retryable());
}

#[test]
fn test_error_from_http_status_400_failed_precondition() {
    let err = FirestoreError::from_http_status(400, r#"{"status":"FAILED_PRECONDITION"}"#);
    assert!(err.is_precondition_failed());
    assert!(!err.is_retryable());
}

#[test]
fn test_error_from_http_status_404() {
    let err = FirestoreError::from_http_status(404, "not found");
    assert!(matches!(err, FirestoreError::NotFound(_)));
    assert!(!err.is_retryable());
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_from_env_requires_project() {
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    assert!(matches!(
        FirestoreConfig::from_env(),
        Err(FirestoreError::AuthError(_))
    ));
}

#[test]
#[serial]
fn test_config_from_env_reads_emulator_and_timeouts() {
    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");
    std::env::set_var("FIRESTORE_TIMEOUT_SECS", "7");

    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "gcp-project");
    assert_eq!(config.database_id, "(default)");
    assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
    assert_eq!(config.timeout, Duration::from_secs(7));

    std::env::remove_var("GCP_PROJECT_ID");
    std::env::remove_var("FIRESTORE_EMULATOR_HOST");
    std::env::remove_var("FIRESTORE_TIMEOUT_SECS");
}

// =============================================================================
// Client Tests
// =============================================================================

#[tokio::test]
async fn test_get_document_found_and_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(format!("{}/videos/present$", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(
            "videos",
            "present",
            json!({"title": {"stringValue": "clip"}}),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(format!("{}/videos/absent$", DOCS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;

    let doc = client.get_document("videos", "present").await.unwrap().unwrap();
    assert_eq!(doc.id(), Some("present"));
    assert_eq!(doc.get::<String>("title").as_deref(), Some("clip"));

    assert!(client.get_document("videos", "absent").await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(format!("{}/videos/flaky$", DOCS)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(format!("{}/videos/flaky$", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json("videos", "flaky", json!({}))))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let doc = client.get_document("videos", "flaky").await.unwrap();
    assert!(doc.is_some());
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .expect(1)
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let err = client.get_document("videos", "any").await.unwrap_err();
    assert!(matches!(err, FirestoreError::AuthError(_)));
}

#[tokio::test]
async fn test_update_sends_precondition_and_maps_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path_regex(format!("{}/config_sets/abc$", DOCS)))
        .and(query_param("currentDocument.updateTime", "2024-05-01T10:00:00Z"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"code": 400, "status": "FAILED_PRECONDITION"}})),
        )
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let err = client
        .update_document(
            "config_sets",
            "abc",
            Default::default(),
            Some(vec!["fields".to_string()]),
            Some(Precondition::update_time("2024-05-01T10:00:00Z")),
        )
        .await
        .unwrap_err();
    assert!(err.is_precondition_failed());
}

#[tokio::test]
async fn test_list_all_documents_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(format!("{}/config_sets$", DOCS)))
        .and(query_param("pageToken", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [doc_json("config_sets", "b", json!({}))]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(format!("{}/config_sets$", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [doc_json("config_sets", "a", json!({}))],
            "nextPageToken": "next"
        })))
        .mount(&server)
        .await;

    let client = emulator_client(&server).await;
    let docs = client.list_all_documents("config_sets", 10).await.unwrap();
    let ids: Vec<_> = docs.iter().filter_map(|d| d.id()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

// =============================================================================
// Repository Tests
// =============================================================================

#[tokio::test]
async fn test_video_repository_decodes_status() {
    let server = MockServer::start().await;
    let id = ObjectId::parse("507f1f77bcf86cd799439011").unwrap();
    Mock::given(method("GET"))
        .and(path_regex(format!("{}/videos/{}$", DOCS, id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(
            "videos",
            &id.to_hex(),
            json!({"object_detection_status": {"integerValue": "4"}}),
        )))
        .mount(&server)
        .await;

    let repo = VideoRepository::new(
        emulator_client(&server).await,
        "videos",
        Arc::new(StatusRegistry::default()),
    );
    let video = repo.get(&id).await.unwrap().unwrap();
    assert_eq!(video.detection_status, Some(DetectionStatus::Completed));
}

#[tokio::test]
async fn test_append_field_retries_after_write_conflict() {
    let server = MockServer::start().await;
    let config_id = ObjectId::new();

    Mock::given(method("GET"))
        .and(path_regex(format!("{}/config_sets/{}$", DOCS, config_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_json(&config_id, json!([]))))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path_regex(format!("{}/config_sets/{}$", DOCS, config_id)))
        .respond_with(ResponseTemplate::new(412))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let field = ConfigField::new("fps", json!(30));
    Mock::given(method("PATCH"))
        .and(path_regex(format!("{}/config_sets/{}$", DOCS, config_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_json(
            &config_id,
            json!([field_json(&field.id, "fps", json!({"integerValue": "30"}))]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ConfigRepository::new(emulator_client(&server).await, "config_sets");
    let appended = repo.append_field(&config_id, field.clone()).await.unwrap();
    assert_eq!(appended, Some(field));
}

#[tokio::test]
async fn test_append_duplicate_key_is_rejected_without_write() {
    let server = MockServer::start().await;
    let config_id = ObjectId::new();
    let existing = ObjectId::new();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_json(
            &config_id,
            json!([field_json(&existing, "fps", json!({"integerValue": "30"}))]),
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let repo = ConfigRepository::new(emulator_client(&server).await, "config_sets");
    let err = repo
        .append_field(&config_id, ConfigField::new("fps", json!(60)))
        .await
        .unwrap_err();
    assert!(matches!(err, FirestoreError::ConstraintViolation(_)));
}

#[tokio::test]
async fn test_field_mutation_on_missing_config_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = ConfigRepository::new(emulator_client(&server).await, "config_sets");
    let config_id = ObjectId::new();
    assert_eq!(
        repo.append_field(&config_id, ConfigField::new("fps", json!(1)))
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        repo.delete_field(&config_id, &ObjectId::new()).await.unwrap(),
        None
    );
    assert_eq!(repo.delete(&config_id).await.unwrap(), None);
}
