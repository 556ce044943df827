//! Integration tests for the GitLab publisher against a local fake API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tlsprint_core::{Implementation, LearnedEntry, Protocol, VersionTag};
use tlsprint_publish::{ActionKind, CommitRequest, GitLabPublisher, PublishConfig, PublishError};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn create_commit(
    State(recorded): State<Recorded>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let token = headers
        .get("PRIVATE-TOKEN")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    recorded
        .requests
        .lock()
        .unwrap()
        .push((project, token.clone(), body));

    if token.as_deref() != Some("good-token") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "401 Unauthorized" })),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({ "id": "ed899a2f4b50b4370feeea94676502b42383c746", "web_url": "https://gitlab.example/c/ed899a2f" })),
    )
}

async fn raw_file(
    Path((project, file)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    if headers.get("PRIVATE-TOKEN").and_then(|v| v.to_str().ok()) != Some("good-token") {
        return (StatusCode::UNAUTHORIZED, "401 Unauthorized".into());
    }
    match (project.as_str(), file.as_str(), query.get("ref").map(String::as_str)) {
        ("50", "ci/.drone.yml", Some("master")) => (StatusCode::OK, "kind: pipeline\n".into()),
        _ => (StatusCode::NOT_FOUND, "{\"message\":\"404 File Not Found\"}".into()),
    }
}

async fn fake_gitlab() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/v4/projects/:project/repository/files/:file/raw", get(raw_file))
        .route("/api/v4/projects/:project/repository/commits", post(create_commit))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base, recorded)
}

fn publisher(base_url: String, token: &str) -> GitLabPublisher {
    GitLabPublisher::new(PublishConfig {
        base_url,
        project_id: "50".into(),
        branch: "master".into(),
        private_token: token.into(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_commit_learned_model() {
    let (base, recorded) = fake_gitlab().await;
    let entry = LearnedEntry::new(
        Implementation::new("wolfssl"),
        VersionTag::new("4.1.0"),
        Protocol::new("TLS12"),
    );
    let request = CommitRequest::learned_model(&entry, "digraph g { s0 -> s1 }".into());

    let commit = publisher(base, "good-token").commit(&request).await.unwrap();
    assert_eq!(commit.id, "ed899a2f4b50b4370feeea94676502b42383c746");

    let requests = recorded.requests.lock().unwrap();
    let (project, token, body) = &requests[0];
    assert_eq!(project, "50");
    assert_eq!(token.as_deref(), Some("good-token"));
    assert_eq!(
        body,
        &json!({
            "branch": "master",
            "commit_message": "Add model of wolfssl version 4.1.0, for TLS12",
            "actions": [{
                "action": "create",
                "file_path": "wolfssl/4.1.0/TLS12/learnedModel.dot",
                "content": "digraph g { s0 -> s1 }"
            }]
        })
    );
}

#[tokio::test]
async fn test_rejected_commit() {
    let (base, _) = fake_gitlab().await;
    let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
    let request = CommitRequest::manifest_update(ActionKind::Update, ".drone.yml", "---\n", date);

    let err = publisher(base, "stale-token").commit(&request).await.unwrap_err();
    match err {
        PublishError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Unauthorized"));
        }
        other => panic!("expected rejection, got {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_api() {
    let err = publisher("http://127.0.0.1:1".into(), "good-token")
        .commit(&CommitRequest {
            commit_message: "noop".into(),
            actions: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Http(_)));
}

#[tokio::test]
async fn test_file_content() {
    let (base, _) = fake_gitlab().await;
    let gitlab = publisher(base.clone(), "good-token");

    assert_eq!(
        gitlab.file_content("ci/.drone.yml").await.unwrap().as_deref(),
        Some("kind: pipeline\n")
    );
    assert_eq!(gitlab.file_content(".drone.yml").await.unwrap(), None);

    let err = publisher(base, "stale-token")
        .file_content("ci/.drone.yml")
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Rejected { status: 401, .. }));
}
