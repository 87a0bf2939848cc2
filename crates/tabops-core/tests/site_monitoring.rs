use std::io::{Cursor, Write};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tabops_core::memory::{MemoryBackend, RecordingNotifier};
use tabops_core::*;
use tempfile::TempDir;

const SITE: &str = "dev";

struct Fixture {
    backend: MemoryBackend,
    monitor: SiteMonitor,
    alerts: Arc<RecordingNotifier>,
    chat: Arc<RecordingNotifier>,
    _dir: TempDir,
}

fn fixture(settings: impl FnOnce(&mut MonitorSettings)) -> Fixture {
    let backend = MemoryBackend::new();
    backend.add_site(SITE);
    let dir = TempDir::new().unwrap();
    let mut monitor_settings = MonitorSettings {
        download_dir: dir.path().to_path_buf(),
        ..MonitorSettings::default()
    };
    settings(&mut monitor_settings);
    let alerts = Arc::new(RecordingNotifier::new());
    let chat = Arc::new(RecordingNotifier::new());
    let monitor = SiteMonitor::new(
        SiteContext::new(Arc::new(backend.clone()), SITE),
        monitor_settings,
        alerts.clone(),
        chat.clone(),
    );
    Fixture {
        backend,
        monitor,
        alerts,
        chat,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_personal_spaces() {
    let fx = fixture(|_| {});
    fx.backend.add_project(SITE, "Team");
    let space = fx.backend.add_project(SITE, "Personal Space");
    fx.backend.with_site(SITE, |s| {
        let p = s.projects.iter_mut().find(|p| p.id == space.id).unwrap();
        p.personal_space = true;
        p.owner_id = Some("u-1".to_string());
    });

    let spaces = fx.monitor.personal_spaces().await.unwrap();

    assert_eq!(
        spaces,
        vec![PersonalSpace {
            name: "Personal Space".to_string(),
            id: space.id,
            owner_id: "u-1".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_tcm_access_for_admin_and_viewer() {
    let fx = fixture(|_| {});
    let admin = fx.backend.add_user(SITE, "admin@example.com", "SiteAdministratorExplorer");
    fx.backend
        .with_site(SITE, |s| s.signed_in_user = Some(admin.id.clone()));

    let access = fx.monitor.tcm_access(None).await.unwrap();
    assert!(access.has_tcm);
    assert_eq!(access.user, "admin@example.com");
    assert_eq!(access.site_id, SITE);

    let viewer = fx.backend.add_user(SITE, "viewer@example.com", "Viewer");
    fx.backend
        .with_site(SITE, |s| s.signed_in_user = Some(viewer.id.clone()));
    let access = fx.monitor.tcm_access(Some("  ")).await.unwrap();
    assert!(!access.has_tcm);
    assert_eq!(access.role, "Viewer");
}

#[tokio::test]
async fn test_content_metadata_covers_workbooks_and_datasources() {
    let fx = fixture(|_| {});
    let owner = fx.backend.add_user(SITE, "o@example.com", "Creator");
    let project = fx.backend.add_project(SITE, "Finance");
    fx.backend
        .add_content(SITE, ContentKind::Workbook, "Described", &project, &owner);
    fx.backend
        .add_content(SITE, ContentKind::Datasource, "Bare", &project, &owner);
    fx.backend.with_site(SITE, |s| {
        s.content[0].description = Some("Quarterly numbers".to_string());
        s.content[0].labels = vec!["certified".to_string()];
    });

    let entries = fx.monitor.content_metadata().await.unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries[0].description && entries[0].has_data_labels);
    assert_eq!(entries[1].content_type, ContentKind::Datasource);
    assert!(!entries[1].description && !entries[1].has_data_labels);
    assert_eq!(entries[1].project.as_deref(), Some("Finance"));
}

#[tokio::test]
async fn test_lineage_returns_raw_payload() {
    let fx = fixture(|_| {});
    let payload = json!({ "data": { "workbooks": [{ "name": "Superstore", "id": "w1" }] } });
    fx.backend
        .with_site(SITE, |s| s.metadata_response = Some(payload.clone()));

    let response = fx.monitor.lineage("Superstore").await.unwrap();

    assert_eq!(response, payload);
    let queries = fx.backend.with_site(SITE, |s| s.metadata_queries.clone());
    assert!(queries[0].contains("upstreamDatasources"));
}

#[tokio::test]
async fn test_check_extensions_unpacks_twbx() {
    let fx = fixture(|_| {});
    let owner = fx.backend.add_user(SITE, "o@example.com", "Creator");
    let project = fx.backend.add_project(SITE, "Finance");
    let workbook = fx
        .backend
        .add_content(SITE, ContentKind::Workbook, "Superstore", &project, &owner);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("Superstore.twb", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(b"<workbook><extension url='https://einstein.example.com'/></workbook>")
        .unwrap();
    let package = writer.finish().unwrap().into_inner();
    fx.backend.with_site(SITE, |s| {
        s.packages.insert(workbook.id.clone(), package);
    });

    let report = fx.monitor.check_extensions("superstore").await.unwrap();

    assert!(report.einstein_used);
    assert!(report.viz_ext_used);
    assert!(!report.tabpy_used);
    assert!(report.path.ends_with("Superstore.twb"));
    assert!(report.path.exists());
}

#[tokio::test]
async fn test_validate_pulse_disabled_notifies() {
    let fx = fixture(|s| s.pulse_datasource = Some("Orders".to_string()));

    let err = fx.monitor.validate_pulse(None).await.unwrap_err();

    assert!(err.to_string().contains("Pulse is not enabled"));
    assert_eq!(fx.alerts.subjects().len(), 1);
}

#[tokio::test]
async fn test_validate_pulse_creates_metric() {
    let fx = fixture(|_| {});
    let owner = fx.backend.add_user(SITE, "o@example.com", "Creator");
    let project = fx.backend.add_project(SITE, "Finance");
    let datasource = fx
        .backend
        .add_content(SITE, ContentKind::Datasource, "Orders", &project, &owner);
    fx.backend.with_site(SITE, |s| {
        s.pulse_enabled = true;
        s.metadata_response = Some(json!({ "data": { "pulseCreateMetric": { "metric": { "id": "m1" } } } }));
    });

    let metric = fx.monitor.validate_pulse(Some("orders")).await.unwrap();

    assert_eq!(metric.metric_name, "AutoMetric_Orders");
    assert_eq!(metric.datasource_id, datasource.id);
    assert!(fx.alerts.subjects().is_empty());
}

#[tokio::test]
async fn test_validate_pulse_graphql_errors_fail() {
    let fx = fixture(|_| {});
    let owner = fx.backend.add_user(SITE, "o@example.com", "Creator");
    let project = fx.backend.add_project(SITE, "Finance");
    fx.backend
        .add_content(SITE, ContentKind::Datasource, "Orders", &project, &owner);
    fx.backend.with_site(SITE, |s| {
        s.pulse_enabled = true;
        s.metadata_response = Some(json!({ "errors": [{ "message": "unknown field" }] }));
    });

    let err = fx.monitor.validate_pulse(Some("Orders")).await.unwrap_err();

    assert!(err.to_string().contains("Pulse metric creation failed"));
    assert_eq!(fx.alerts.subjects().len(), 1);
}

#[tokio::test]
async fn test_validate_pulse_needs_datasource_name() {
    let fx = fixture(|_| {});
    let err = fx.monitor.validate_pulse(None).await.unwrap_err();
    assert!(matches!(err, OpsError::Config(_)));
}

#[tokio::test]
async fn test_site_activity_reports_recent_entities() {
    let fx = fixture(|_| {});
    let fresh = fx.backend.add_user(SITE, "new@example.com", "Viewer");
    fx.backend.add_user(SITE, "old@example.com", "Unlicensed");
    let now = Utc::now();
    fx.backend.with_site(SITE, |s| {
        for user in s.users.iter_mut() {
            user.created_at = Some(if user.id == fresh.id {
                now - Duration::hours(2)
            } else {
                now - Duration::days(30)
            });
        }
        s.metadata_response = Some(json!({
            "data": { "groups": [
                { "name": "Analysts", "createdAt": (now - Duration::hours(1)).to_rfc3339() },
                { "name": "Legacy", "createdAt": (now - Duration::days(3)).to_rfc3339() }
            ] }
        }));
    });

    let report = fx.monitor.site_activity().await.unwrap();

    assert_eq!(report.new_users.len(), 1);
    assert_eq!(report.new_users[0].name, "new@example.com");
    assert_eq!(report.new_groups, vec!["Analysts".to_string()]);
    assert_eq!(report.licensed_users, 1);
    assert!(report.notified);
    assert_eq!(fx.chat.subjects().len(), 1);
    assert!(fx.alerts.subjects().is_empty());
}

#[tokio::test]
async fn test_slack_connection_requires_url() {
    let fx = fixture(|_| {});
    let err = fx.monitor.slack_connection().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration error: Slack webhook URL is missing in config."
    );
    assert_eq!(fx.backend.sign_in_count(), 0);
}

#[tokio::test]
async fn test_slack_connection_registers_webhook() {
    let fx = fixture(|s| s.slack_webhook_url = Some("https://hooks.slack.test/T1".to_string()));

    fx.monitor.slack_connection().await.unwrap();

    let hooks = fx.backend.with_site(SITE, |s| s.webhooks.clone());
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].event, "WorkbookCreated");
    assert_eq!(hooks[0].destination_url, "https://hooks.slack.test/T1");
}
