//! Site audit with snapshot comparison
//!
//! An audit counts users and groups on a site, compares the counts with the
//! previous run's snapshot and alerts on decreases only. Growth and unchanged
//! counts are logged but never alerted. The new snapshot is written at the end
//! of every successful run, whether or not an alert went out.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{fs, sync::Mutex};
use tracing::{error, info, instrument, warn};

use crate::{
    context::SiteContext,
    error::{OpsError, Result},
    notify::{escape_html, notify_best_effort, Notifier},
    retriever::local_filename,
};

/// Compared metrics, in report order
const METRICS: [Metric; 2] = [Metric::UserCount, Metric::GroupCount];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    UserCount,
    GroupCount,
}

impl Metric {
    fn key(self) -> &'static str {
        match self {
            Metric::UserCount => "user_count",
            Metric::GroupCount => "group_count",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Metric::UserCount => "User Count",
            Metric::GroupCount => "Group Count",
        }
    }

    fn read(self, snapshot: &AuditSnapshot) -> Option<u64> {
        match self {
            Metric::UserCount => snapshot.user_count,
            Metric::GroupCount => snapshot.group_count,
        }
    }
}

/// Persisted counts of one site; a missing metric means "no baseline"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub user_count: Option<u64>,
    pub group_count: Option<u64>,
}

impl AuditSnapshot {
    /// Read counts out of an arbitrary JSON document; non-integer values are
    /// treated as absent
    fn from_value(value: &Value) -> Self {
        let count = |key: &str| {
            let raw = value.get(key)?;
            let parsed = raw.as_u64();
            if parsed.is_none() {
                warn!(metric = key, previous = %raw, "Could not compare metric with previous snapshot");
            }
            parsed
        };
        AuditSnapshot {
            user_count: count("user_count"),
            group_count: count("group_count"),
        }
    }
}

/// A metric that went down between two runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricChange {
    pub metric: String,
    pub previous: u64,
    pub current: u64,
}

impl MetricChange {
    pub fn drop_by(&self) -> u64 {
        self.previous - self.current
    }
}

/// Metrics whose current value is lower than the previous one.
///
/// Increases, equal values and metrics without a previous value never appear.
pub fn negative_changes(previous: &AuditSnapshot, current: &AuditSnapshot) -> Vec<MetricChange> {
    let mut changes = Vec::new();
    for metric in METRICS {
        let (Some(prev), Some(curr)) = (metric.read(previous), metric.read(current)) else {
            continue;
        };
        if curr < prev {
            warn!(metric = metric.key(), prev, curr, "Metric decreased");
            changes.push(MetricChange {
                metric: metric.key().to_string(),
                previous: prev,
                current: curr,
            });
        } else if curr > prev {
            info!(metric = metric.key(), prev, curr, "Metric increased, no alert needed");
        } else {
            info!(metric = metric.key(), curr, "Metric unchanged");
        }
    }
    changes
}

/// Snapshot files, one per site, in a single directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Snapshot file of `site`; separators in the site name cannot leave `dir`
    pub fn path_for(&self, site: &str) -> PathBuf {
        self.dir
            .join(local_filename(&format!("audit_snapshot_{}", site.trim()), "json"))
    }

    /// Previous snapshot; missing, empty or unreadable files yield an empty one
    pub async fn load(&self, site: &str) -> AuditSnapshot {
        let path = self.path_for(site);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AuditSnapshot::default(),
            Err(e) => {
                warn!(path = %path.display(), "Could not read snapshot file: {e}");
                return AuditSnapshot::default();
            }
        };
        if content.trim().is_empty() {
            return AuditSnapshot::default();
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(value) => AuditSnapshot::from_value(&value),
            Err(e) => {
                warn!(path = %path.display(), "Could not parse snapshot file: {e}");
                AuditSnapshot::default()
            }
        }
    }

    /// Replace the snapshot of `site`; readers never observe a partial file
    pub async fn save(&self, site: &str, snapshot: &AuditSnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(site);
        let staging = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&staging, json).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }
}

/// Result of a successful audit run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub site: String,
    pub user_count: u64,
    pub group_count: u64,
    pub role_breakdown: BTreeMap<String, u64>,
    pub negative_changes: Vec<MetricChange>,
}

/// Runs site audits; concurrent runs are serialized so snapshot updates for
/// the same site never interleave
pub struct AuditEngine {
    ctx: SiteContext,
    snapshots: SnapshotStore,
    notifier: Arc<dyn Notifier>,
    run_lock: Mutex<()>,
}

impl AuditEngine {
    pub fn new(ctx: SiteContext, snapshots: SnapshotStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            ctx,
            snapshots,
            notifier,
            run_lock: Mutex::new(()),
        }
    }

    /// Audit `site`, or the configured site when `None`
    #[instrument(skip(self))]
    pub async fn run(&self, site_override: Option<&str>) -> Result<AuditReport> {
        let _guard = self.run_lock.lock().await;
        let site = site_override
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.ctx.site())
            .to_string();
        if site_override.is_some() {
            info!(%site, "Overriding audited site");
        }

        let notifier = Arc::clone(&self.notifier);
        let (user_count, group_count, role_breakdown) = self
            .ctx
            .run_on(Some(&site), |store| {
                let site = site.clone();
                async move {
                    let users = match store.list_users().await {
                        Ok(users) => users,
                        Err(e) => return Err(fetch_failed(notifier.as_ref(), &site, "users", e).await),
                    };
                    let mut role_breakdown = BTreeMap::new();
                    for user in &users {
                        *role_breakdown.entry(user.site_role.clone()).or_insert(0u64) += 1;
                    }
                    info!(users = users.len(), ?role_breakdown, "Fetched users");

                    let groups = match store.list_groups().await {
                        Ok(groups) => groups,
                        Err(e) => return Err(fetch_failed(notifier.as_ref(), &site, "groups", e).await),
                    };
                    info!(groups = groups.len(), "Fetched groups");

                    Ok((users.len() as u64, groups.len() as u64, role_breakdown))
                }
            })
            .await?;

        let current = AuditSnapshot {
            user_count: Some(user_count),
            group_count: Some(group_count),
        };
        let previous = self.snapshots.load(&site).await;
        let changes = negative_changes(&previous, &current);

        if !changes.is_empty() {
            notify_best_effort(
                self.notifier.as_ref(),
                &format!("Tableau Audit Alert - {site}"),
                &alert_html(&site, &changes),
            )
            .await;
        }

        self.snapshots.save(&site, &current).await?;

        Ok(AuditReport {
            site,
            user_count,
            group_count,
            role_breakdown,
            negative_changes: changes,
        })
    }
}

async fn fetch_failed(notifier: &dyn Notifier, site: &str, what: &str, e: OpsError) -> OpsError {
    error!(site, "Failed to fetch {what}: {e}");
    let body = format!(
        "<html><body>\
         <p style=\"color:red;\"><strong>Feature:</strong> Site Role/User/Group Audit</p>\
         <p>Failed to fetch {what} from Tableau site <strong>{}</strong>.</p>\
         <p><code>{}</code></p>\
         </body></html>",
        escape_html(site),
        escape_html(&e.to_string()),
    );
    notify_best_effort(notifier, &format!("Tableau Audit Failure - {site}"), &body).await;

    let detail = match e {
        OpsError::Remote(message) => message,
        other => other.to_string(),
    };
    OpsError::Remote(format!("Failed to fetch {what}: {detail}"))
}

/// HTML table of decreased metrics
pub fn alert_html(site: &str, changes: &[MetricChange]) -> String {
    let rows: String = changes
        .iter()
        .map(|change| {
            let label = METRICS
                .iter()
                .find(|m| m.key() == change.metric)
                .map(|m| m.label())
                .unwrap_or(change.metric.as_str());
            format!(
                "<tr><td>{label}</td><td>{}</td><td>{}</td><td style=\"color:red;\">&darr; {}</td></tr>",
                change.previous,
                change.current,
                change.drop_by()
            )
        })
        .collect();

    format!(
        "<html><head><style>\
         body {{ font-family: Arial, sans-serif; }}\
         table {{ border-collapse: collapse; margin-top: 10px; }}\
         th, td {{ border: 1px solid #ccc; padding: 8px; text-align: center; }}\
         th {{ background-color: #e0e0e0; }}\
         </style></head><body>\
         <p><strong>Feature:</strong> Site Role/User/Group Audit</p>\
         <p>Detected negative changes in Tableau site <strong>{}</strong>:</p>\
         <table><tr><th>Metric</th><th>Previous</th><th>Current</th><th>Status</th></tr>{rows}</table>\
         <p><i>This alert was auto-generated by the audit job.</i></p>\
         </body></html>",
        escape_html(site)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot(users: u64, groups: u64) -> AuditSnapshot {
        AuditSnapshot {
            user_count: Some(users),
            group_count: Some(groups),
        }
    }

    #[test]
    fn test_only_decreases_are_reported() {
        let changes = negative_changes(&snapshot(10, 5), &snapshot(8, 5));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].metric, "user_count");
        assert_eq!(changes[0].drop_by(), 2);

        assert!(negative_changes(&snapshot(10, 5), &snapshot(12, 5)).is_empty());
        assert!(negative_changes(&snapshot(10, 5), &snapshot(10, 5)).is_empty());
    }

    #[test]
    fn test_snapshot_path_stays_in_directory() {
        let store = SnapshotStore::new("snapshots");
        assert_eq!(
            store.path_for("prod"),
            PathBuf::from("snapshots").join("audit_snapshot_prod.json")
        );
        assert_eq!(
            store.path_for("../../etc/cron.d/x"),
            PathBuf::from("snapshots").join("audit_snapshot_.._.._etc_cron.d_x.json")
        );
        assert_eq!(
            store.path_for("a\\b c"),
            PathBuf::from("snapshots").join("audit_snapshot_a_b_c.json")
        );
    }

    #[test]
    fn test_missing_baseline_is_never_a_decrease() {
        assert!(negative_changes(&AuditSnapshot::default(), &snapshot(0, 0)).is_empty());
    }

    #[test]
    fn test_alert_table_lists_metric() {
        let html = alert_html(
            "dev<site>",
            &[MetricChange {
                metric: "group_count".to_string(),
                previous: 7,
                current: 4,
            }],
        );
        assert!(html.contains("<td>Group Count</td><td>7</td><td>4</td>"));
        assert!(html.contains("&darr; 3"));
        assert!(html.contains("dev&lt;site&gt;"));
    }

    #[tokio::test]
    async fn test_snapshot_store_tolerates_bad_files() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());

        assert_eq!(store.load("s").await, AuditSnapshot::default());

        std::fs::write(store.path_for("s"), "   ").unwrap();
        assert_eq!(store.load("s").await, AuditSnapshot::default());

        std::fs::write(store.path_for("s"), "{not json").unwrap();
        assert_eq!(store.load("s").await, AuditSnapshot::default());

        std::fs::write(store.path_for("s"), r#"{"user_count": "ten", "group_count": 3}"#).unwrap();
        assert_eq!(
            store.load("s").await,
            AuditSnapshot {
                user_count: None,
                group_count: Some(3)
            }
        );
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_uses_site_file_name() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested"));

        store.save("prod", &snapshot(4, 2)).await.unwrap();

        let path = dir.path().join("nested").join("audit_snapshot_prod.json");
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw["user_count"], 4);
        assert_eq!(store.load("prod").await, snapshot(4, 2));
    }
}
