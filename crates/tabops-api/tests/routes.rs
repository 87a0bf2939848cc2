use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tabops_api::{router, AppState};
use tabops_config::AppConfig;
use tabops_core::memory::{MemoryBackend, RecordingNotifier};
use tabops_core::{ContentKind, ContentStore, OpsError, Rendition, SessionProvider};
use tempfile::TempDir;
use tower::ServiceExt;

const SITE: &str = "dev";

struct Harness {
    backend: MemoryBackend,
    app: Router,
    alerts: Arc<RecordingNotifier>,
    dir: TempDir,
}

fn config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.url = "https://tableau.example.com".to_string();
    config.server.site_id = SITE.to_string();
    config.server.token_name = "automation".to_string();
    config.server.token_secret = "secret".to_string();
    config.storage.download_dir = dir.path().join("downloads");
    config.storage.snapshot_dir = dir.path().join("snapshots");
    config
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let backend = MemoryBackend::new();
    backend.add_site(SITE);
    let alerts = Arc::new(RecordingNotifier::new());
    let state = AppState::new(
        config(&dir),
        Arc::new(backend.clone()),
        alerts.clone(),
        Arc::new(RecordingNotifier::new()),
    );
    Harness {
        backend,
        app: router(state),
        alerts,
        dir,
    }
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_create_project_and_duplicate() {
    let h = harness();
    h.backend.add_project(SITE, "Sales");

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/create_project",
        Some(json!({ "project_name": "P1", "description": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully created project 'P1'");
    let first_id = body["project_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/create_project",
        Some(json!({ "project_name": " p1 " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
    assert_eq!(body["projects"], json!(["Sales", "P1"]));

    let projects = h.backend.with_site(SITE, |s| s.projects.clone());
    assert_eq!(projects.len(), 2);
    let p1 = projects.iter().find(|p| p.id == first_id).unwrap();
    assert_eq!(p1.description.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_delete_without_project_reports_duplicates() {
    let h = harness();
    let alice = h.backend.add_user(SITE, "alice@example.com", "Creator");
    let finance = h.backend.add_project(SITE, "Finance");
    let sales = h.backend.add_project(SITE, "Sales");
    h.backend.add_content(SITE, ContentKind::Workbook, "Revenue", &finance, &alice);
    h.backend.add_content(SITE, ContentKind::Workbook, "Revenue", &sales, &alice);

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/delete_content",
        Some(json!({ "content_type": "workbook", "content_name": "Revenue" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Multiple Workbooks named 'Revenue' found"));
    assert!(message.contains("provide a project"));
    assert_eq!(h.backend.with_site(SITE, |s| s.content.len()), 2);

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/delete_content",
        Some(json!({ "content_type": "workbook", "content_name": "revenue", "project_name": "Sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Workbook 'Revenue' deleted successfully from project 'Sales'");
    assert_eq!(h.backend.with_site(SITE, |s| s.content.len()), 1);
}

#[tokio::test]
async fn test_move_keeps_content_id() {
    let h = harness();
    let alice = h.backend.add_user(SITE, "alice@example.com", "Creator");
    let finance = h.backend.add_project(SITE, "Finance");
    let sales = h.backend.add_project(SITE, "Sales");
    let item = h
        .backend
        .add_content(SITE, ContentKind::Datasource, "Orders", &finance, &alice);

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/move_content",
        Some(json!({
            "content_type": "datasource",
            "content_name": "Orders",
            "source_project": "Finance",
            "new_project": "Sales"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content_id"], item.id);
    assert_eq!(body["project_id"], sales.id);
}

#[tokio::test]
async fn test_ownership_mismatch_is_rejected() {
    let h = harness();
    let alice = h.backend.add_user(SITE, "alice@example.com", "Creator");
    h.backend.add_user(SITE, "bob@example.com", "Explorer");
    h.backend.add_user(SITE, "carol@example.com", "Explorer");
    let finance = h.backend.add_project(SITE, "Finance");
    let item = h
        .backend
        .add_content(SITE, ContentKind::Workbook, "Revenue", &finance, &alice);

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/update_ownership",
        Some(json!({
            "content_type": "workbook",
            "content_name": "Revenue",
            "current_owner": "bob@example.com",
            "new_owner": "carol@example.com",
            "project_name": "Finance"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let owner = h.backend.with_site(SITE, |s| s.content[0].owner_id.clone());
    assert_eq!(owner, item.owner_id);
}

#[tokio::test]
async fn test_copy_requires_source_project() {
    let h = harness();
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/copy_content",
        Some(json!({ "workbook_name": "Revenue", "target_project": "Sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A project name is required to copy a Workbook.");
}

#[tokio::test]
async fn test_revision_history_failure_has_empty_revisions() {
    let h = harness();
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/revision_history",
        Some(json!({ "content_type": "workbook", "content_name": "Missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["revisions"], json!([]));
    assert_eq!(body["message"], "Workbook 'Missing' not found");
}

#[tokio::test]
async fn test_malformed_requests_use_failure_shape() {
    let h = harness();
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/tableau/move_content",
        Some(json!({ "content_type": "workbook" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = call(&h.app, Method::GET, "/tableau/get_lineage_for_workbook", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid request"));
}

#[tokio::test]
async fn test_audit_site_with_override() {
    let h = harness();
    h.backend.add_site("prod");
    h.backend.add_user("prod", "a@example.com", "Viewer");
    h.backend.add_user("prod", "b@example.com", "SiteAdministratorCreator");
    h.backend.add_group("prod", "All Users");

    let (status, body) = call(&h.app, Method::POST, "/tableau/audit_site?site_name=prod", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["site"], "prod");
    assert_eq!(body["user_count"], 2);
    assert_eq!(body["group_count"], 1);
    assert_eq!(body["role_breakdown"]["Viewer"], 1);
    assert!(h.dir.path().join("snapshots").join("audit_snapshot_prod.json").exists());
    assert!(h.alerts.subjects().is_empty());
}

#[tokio::test]
async fn test_download_view_writes_file() {
    let h = harness();
    h.backend.add_view(
        SITE,
        "Overview",
        vec![(Rendition::Csv, vec![b"a,b\n".to_vec(), b"1,2\n".to_vec()])],
    );

    let (status, body) = call(
        &h.app,
        Method::GET,
        "/tableau/download_view_features?view_name=overview&download_format=csv",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Csv downloaded");
    let path = body["path"].as_str().unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"a,b\n1,2\n");
}

#[tokio::test]
async fn test_slack_connection_needs_webhook_url() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/tableau/slack_connection", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Configuration error: Slack webhook URL is missing in config.");
}

#[tokio::test]
async fn test_health_and_openapi() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["site"], SITE);

    let (status, doc) = call(&h.app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/tableau/create_project"]["post"].is_object());
    assert!(doc["paths"]["/tableau/site_activity"]["get"].is_object());
}

struct Unreachable;

#[async_trait]
impl SessionProvider for Unreachable {
    async fn sign_in(&self, _site: &str) -> tabops_core::Result<Arc<dyn ContentStore>> {
        Err(OpsError::Transport("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_unreachable_server_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(
        config(&dir),
        Arc::new(Unreachable),
        Arc::new(RecordingNotifier::new()),
        Arc::new(RecordingNotifier::new()),
    );

    let (status, body) = call(&router(state), Method::GET, "/tableau/personal_spaces", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Transport error: connection refused");
}
