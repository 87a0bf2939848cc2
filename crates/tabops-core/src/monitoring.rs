//! Read-only site checks
//!
//! Personal spaces, lineage, admin access, metadata completeness, extension
//! usage, Pulse availability, recent activity and Slack connectivity.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::{
    context::SiteContext,
    error::{OpsError, Result},
    extensions::{self, ExtensionUsage},
    models::{ContentItem, ContentKind, WebhookSpec},
    notify::{escape_html, notify_best_effort, Notifier},
    resolver::Resolver,
    retriever::local_filename,
};

/// Site roles that imply content-migration (TCM) access
pub const TCM_ROLES: [&str; 3] = [
    "SiteAdministrator",
    "SiteAdministratorExplorer",
    "ServerAdministrator",
];

const LINEAGE_QUERY: &str = r#"
query getWorkbookLineage($name: String!) {
  workbooks(filter: {name: $name}) {
    name
    id
    projectName
    upstreamDatasources { name id }
    embeddedDatasources { name id }
    sheets { name id }
    dashboards { name id }
  }
}"#;

const GROUPS_QUERY: &str = r#"
query recentGroups {
  groups { name createdAt }
}"#;

const PULSE_METRIC_MUTATION: &str = r#"
mutation CreatePulseMetric($name: String!, $dataSourceId: String!, $expression: String!) {
  pulseCreateMetric(input: {
    name: $name,
    description: "Automated metric from tabops",
    dataSourceId: $dataSourceId,
    expression: $expression
  }) {
    metric { id name }
  }
}"#;

const PULSE_EXPRESSION: &str = "COUNTD([Order ID])";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalSpace {
    pub name: String,
    pub id: String,
    pub owner_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TcmAccess {
    pub site_id: String,
    pub user: String,
    pub role: String,
    pub has_tcm: bool,
}

/// Description/label completeness of one content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    #[serde(rename = "type")]
    pub content_type: ContentKind,
    pub name: String,
    pub project: Option<String>,
    pub description: bool,
    pub has_data_labels: bool,
}

impl From<&ContentItem> for MetadataEntry {
    fn from(item: &ContentItem) -> Self {
        MetadataEntry {
            content_type: item.kind,
            name: item.name.clone(),
            project: item.project_name.clone(),
            description: item
                .description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty()),
            has_data_labels: !item.labels.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionReport {
    pub workbook: String,
    pub path: PathBuf,
    pub tabpy_used: bool,
    pub einstein_used: bool,
    pub viz_ext_used: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PulseMetric {
    pub metric_name: String,
    pub datasource_id: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub new_users: Vec<NewUser>,
    pub new_groups: Vec<String>,
    pub licensed_users: usize,
    pub notified: bool,
}

/// Settings for checks that need more than a session
#[derive(Debug, Clone, Default)]
pub struct MonitorSettings {
    /// Where workbook packages are unpacked for the extension scan
    pub download_dir: PathBuf,
    /// Destination of the Slack connectivity webhook
    pub slack_webhook_url: Option<String>,
    /// Datasource used by the Pulse check when none is given
    pub pulse_datasource: Option<String>,
}

pub struct SiteMonitor {
    ctx: SiteContext,
    settings: MonitorSettings,
    /// Email-style alerts (Pulse failures)
    alerts: Arc<dyn Notifier>,
    /// Chat channel for activity reports
    chat: Arc<dyn Notifier>,
}

impl SiteMonitor {
    pub fn new(
        ctx: SiteContext,
        settings: MonitorSettings,
        alerts: Arc<dyn Notifier>,
        chat: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ctx,
            settings,
            alerts,
            chat,
        }
    }

    /// Projects flagged as personal spaces
    #[instrument(skip(self))]
    pub async fn personal_spaces(&self) -> Result<Vec<PersonalSpace>> {
        self.ctx
            .run(|store| async move {
                let projects = store.list_projects().await?;
                let spaces: Vec<_> = projects
                    .into_iter()
                    .filter(|p| p.personal_space)
                    .map(|p| PersonalSpace {
                        name: p.name,
                        id: p.id,
                        owner_id: p.owner_id.unwrap_or_else(|| "N/A".to_string()),
                    })
                    .collect();
                info!(count = spaces.len(), "Found personal spaces");
                Ok(spaces)
            })
            .await
    }

    /// Raw metadata-API lineage payload for workbooks with this name
    #[instrument(skip(self))]
    pub async fn lineage(&self, workbook_name: &str) -> Result<Value> {
        self.ctx
            .run(|store| async move {
                let response = store
                    .metadata_query(LINEAGE_QUERY, json!({ "name": workbook_name }))
                    .await?;
                if response.get("errors").is_some() {
                    warn!(workbook = workbook_name, "Lineage query returned errors");
                }
                Ok(response)
            })
            .await
    }

    /// Whether the signed-in identity holds an admin role on the site
    #[instrument(skip(self))]
    pub async fn tcm_access(&self, site_override: Option<&str>) -> Result<TcmAccess> {
        let site = site_override
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.ctx.site())
            .to_string();

        let site_id = site.clone();
        self.ctx
            .run_on(Some(&site), |store| async move {
                let user = store.get_user(store.user_id()).await?;
                let has_tcm = TCM_ROLES.contains(&user.site_role.as_str());
                if has_tcm {
                    info!(user = %user.name, role = %user.site_role, "Admin role grants TCM access");
                } else {
                    warn!(user = %user.name, role = %user.site_role, "TCM access unlikely, user is not an admin");
                }
                Ok(TcmAccess {
                    site_id,
                    user: user.name,
                    role: user.site_role,
                    has_tcm,
                })
            })
            .await
    }

    /// Description and label presence for every workbook and datasource
    #[instrument(skip(self))]
    pub async fn content_metadata(&self) -> Result<Vec<MetadataEntry>> {
        self.ctx
            .run(|store| async move {
                let mut entries = Vec::new();
                for kind in [ContentKind::Workbook, ContentKind::Datasource] {
                    let items = store.list_content(kind).await?;
                    info!(%kind, count = items.len(), "Fetched content");
                    entries.extend(items.iter().map(MetadataEntry::from));
                }
                Ok(entries)
            })
            .await
    }

    /// Download a workbook, unpack its `.twb` and scan it for extensions
    #[instrument(skip(self))]
    pub async fn check_extensions(&self, workbook_name: &str) -> Result<ExtensionReport> {
        let (workbook, package) = self
            .ctx
            .run(|store| async move {
                let workbook = Resolver::new(store.as_ref())
                    .content(ContentKind::Workbook, workbook_name, None)
                    .await?;
                let package = store
                    .download_content(ContentKind::Workbook, &workbook.id, false)
                    .await?;
                Ok((workbook, package))
            })
            .await?;

        let (document, usage) = extensions::scan_package(&package.bytes)?;
        let file_name = match &document.entry {
            Some(entry) => local_filename(entry.trim_end_matches(".twb"), "twb"),
            None => local_filename(&workbook.name, "twb"),
        };
        fs::create_dir_all(&self.settings.download_dir).await?;
        let path = self.settings.download_dir.join(file_name);
        fs::write(&path, &document.xml).await?;

        let ExtensionUsage {
            tabpy,
            einstein,
            viz_ext,
        } = usage;
        info!(workbook = %workbook.name, tabpy, einstein, viz_ext, "Scanned workbook for extensions");
        Ok(ExtensionReport {
            workbook: workbook.name,
            path,
            tabpy_used: tabpy,
            einstein_used: einstein,
            viz_ext_used: viz_ext,
        })
    }

    /// Check Pulse availability by creating a metric on a datasource
    #[instrument(skip(self))]
    pub async fn validate_pulse(&self, datasource_name: Option<&str>) -> Result<PulseMetric> {
        let datasource_name = datasource_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(self.settings.pulse_datasource.as_deref())
            .ok_or_else(|| {
                OpsError::Config("No datasource given and pulse.datasource_name is not set".to_string())
            })?
            .to_string();
        let alerts = Arc::clone(&self.alerts);
        let site = self.ctx.site().to_string();

        self.ctx
            .run(|store| async move {
                if !store.pulse_enabled().await? {
                    error!(%site, "Pulse is not enabled on this site");
                    notify_best_effort(
                        alerts.as_ref(),
                        &format!("Tableau Pulse Check - {site}"),
                        "<p><strong style=\"color:red;\">Pulse feature is not enabled</strong></p>\
                         <p>Please ask the Tableau Cloud administrator to enable the Tableau Pulse API for your site.</p>",
                    )
                    .await;
                    return Err(OpsError::Remote("Pulse is not enabled on this site.".to_string()));
                }

                let datasource = Resolver::new(store.as_ref())
                    .content(ContentKind::Datasource, &datasource_name, None)
                    .await?;
                let metric_name = format!("AutoMetric_{}", datasource.name);
                info!(metric = %metric_name, datasource = %datasource.id, "Creating Pulse metric");

                let created = store
                    .metadata_query(
                        PULSE_METRIC_MUTATION,
                        json!({
                            "name": metric_name,
                            "dataSourceId": datasource.id,
                            "expression": PULSE_EXPRESSION,
                        }),
                    )
                    .await;
                let failure = match &created {
                    Ok(response) => response.get("errors").map(|errors| errors.to_string()),
                    Err(e) => Some(e.to_string()),
                };
                if let Some(reason) = failure {
                    error!(metric = %metric_name, "Pulse metric creation failed: {reason}");
                    notify_best_effort(
                        alerts.as_ref(),
                        &format!("Tableau Pulse Check - {site}"),
                        &format!(
                            "<p><strong style=\"color:red;\">Pulse metric creation failed!</strong></p><p>Error: {}</p>",
                            escape_html(&reason)
                        ),
                    )
                    .await;
                    return Err(OpsError::Remote(format!("Pulse metric creation failed: {reason}")));
                }

                Ok(PulseMetric {
                    metric_name,
                    datasource_id: datasource.id,
                    response: created?,
                })
            })
            .await
    }

    /// Users and groups created in the last 24 hours, plus licensed user count
    pub async fn site_activity(&self) -> Result<ActivityReport> {
        self.site_activity_since(Utc::now() - Duration::hours(24)).await
    }

    /// Activity report for everything created after `cutoff`
    #[instrument(skip(self))]
    pub async fn site_activity_since(&self, cutoff: DateTime<Utc>) -> Result<ActivityReport> {
        let (new_users, new_groups, licensed_users) = self
            .ctx
            .run(|store| async move {
                let users = store.list_users().await?;
                let new_users: Vec<NewUser> = users
                    .iter()
                    .filter(|u| u.created_at.is_some_and(|at| at > cutoff))
                    .map(|u| NewUser {
                        name: u.name.clone(),
                        email: u.email.clone(),
                    })
                    .collect();
                let licensed_users = users.iter().filter(|u| u.is_licensed()).count();

                let payload = store.metadata_query(GROUPS_QUERY, json!({})).await?;
                let new_groups = recent_groups(&payload, cutoff);

                Ok((new_users, new_groups, licensed_users))
            })
            .await?;

        let notified = !new_users.is_empty() || !new_groups.is_empty();
        if notified {
            let message = activity_message(&new_users, &new_groups, licensed_users);
            notify_best_effort(self.chat.as_ref(), "Tableau New Users/Groups Report", &message).await;
        } else {
            info!("No new users or groups created in the last day");
        }

        Ok(ActivityReport {
            new_users,
            new_groups,
            licensed_users,
            notified,
        })
    }

    /// Register a `WorkbookCreated` webhook pointing at the Slack URL
    #[instrument(skip(self))]
    pub async fn slack_connection(&self) -> Result<()> {
        let destination_url = self
            .settings
            .slack_webhook_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| OpsError::Config("Slack webhook URL is missing in config.".to_string()))?;

        let created = self
            .ctx
            .run(|store| async move {
                store
                    .create_webhook(&WebhookSpec {
                        name: "Slack Integration Test".to_string(),
                        event: "WorkbookCreated".to_string(),
                        destination_url,
                    })
                    .await
            })
            .await?;

        if created {
            info!("Slack webhook integration exists");
            Ok(())
        } else {
            Err(OpsError::Remote("Slack webhook was not created".to_string()))
        }
    }
}

/// Group names from a metadata payload with `createdAt` after `cutoff`
fn recent_groups(payload: &Value, cutoff: DateTime<Utc>) -> Vec<String> {
    let Some(groups) = payload.pointer("/data/groups").and_then(Value::as_array) else {
        warn!("Metadata response carried no groups");
        return Vec::new();
    };
    groups
        .iter()
        .filter(|g| {
            g.get("createdAt")
                .and_then(Value::as_str)
                .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
                .is_some_and(|at| at.with_timezone(&Utc) > cutoff)
        })
        .filter_map(|g| g.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

fn activity_message(users: &[NewUser], groups: &[String], licensed: usize) -> String {
    let user_list = if users.is_empty() {
        "No new users".to_string()
    } else {
        users
            .iter()
            .map(|u| format!("- {} ({})", u.name, u.email.as_deref().unwrap_or("no email")))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let group_list = if groups.is_empty() {
        "No new groups".to_string()
    } else {
        groups
            .iter()
            .map(|g| format!("- {g}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "*Tableau New Users/Groups Report*\nDate: {}\n\n*New Users:* {}\n{user_list}\n\n*New Groups:* {}\n{group_list}\n\n*Licensed Users:* {licensed}\n",
        Utc::now().format("%Y-%m-%d"),
        users.len(),
        groups.len(),
    )
}
