//! API request and response models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabops_core::{
    ActivityReport, AuditReport, ExtensionReport, MetadataEntry, MetricChange, NewUser,
    PersonalSpace, PulseMetric, Revision, TcmAccess,
};
use utoipa::{IntoParams, ToSchema};

/// Project creation request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    /// Name of the new project
    pub project_name: String,
    /// Project description
    #[serde(default)]
    pub description: String,
}

/// Deletion request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteContentRequest {
    /// `project`, `workbook` or `datasource`
    pub content_type: String,
    /// Name of the item to delete
    pub content_name: String,
    /// Project holding the workbook or datasource
    pub project_name: Option<String>,
}

/// Move request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MoveContentRequest {
    /// `workbook` or `datasource`
    pub content_type: String,
    /// Name of the item to move
    pub content_name: String,
    /// Project currently holding the item
    pub source_project: String,
    /// Destination project
    pub new_project: String,
}

/// Ownership transfer request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateOwnershipRequest {
    /// `workbook`, `datasource` or `project`
    pub content_type: String,
    /// Item name; the project name when `content_type` is `project`
    pub content_name: String,
    /// Email of the owner the caller expects
    pub current_owner: String,
    /// Email of the new owner
    pub new_owner: String,
    /// Project holding the workbook or datasource
    pub project_name: Option<String>,
}

/// Workbook copy request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CopyContentRequest {
    /// Workbook to copy
    pub workbook_name: String,
    /// Project holding the workbook
    pub source_project: Option<String>,
    /// Project receiving the copy
    pub target_project: String,
}

/// Package download request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// `workbook` or `datasource`
    pub content_type: String,
    /// Item to download
    pub content_name: String,
    /// Project holding the item
    pub project_name: Option<String>,
    /// `twbx` or `tdsx`, matching the content type
    pub format_type: Option<String>,
}

/// Revision history request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevisionHistoryRequest {
    /// `workbook` or `datasource`
    pub content_type: String,
    /// Item name
    pub content_name: String,
    /// Project holding the item
    pub project_name: Option<String>,
}

/// Pulse check request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ValidatePulseRequest {
    /// Datasource to build the metric on; defaults to the configured one
    pub datasource_name: Option<String>,
}

/// Optional site override
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SiteQuery {
    /// Site content URL; the configured site when absent
    pub site_name: Option<String>,
}

/// Workbook selector
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WorkbookQuery {
    /// Workbook name
    pub workbook_name: String,
}

/// View rendition selector
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewDownloadQuery {
    /// View name
    pub view_name: String,
    /// `image`, `pdf` or `csv`
    #[serde(default = "default_download_format")]
    pub download_format: String,
}

fn default_download_format() -> String {
    "image".to_string()
}

/// Plain success response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Always `true` on 200 responses
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

impl MessageResponse {
    /// Successful outcome with `message`
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Failure body, returned with 400 or 502
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Reason for the failure
    pub message: String,
}

/// Created project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProjectResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Id of the new project
    pub project_id: String,
}

/// Moved content
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MoveContentResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Id of the moved item, unchanged by the move
    pub content_id: String,
    /// Id of the destination project
    pub project_id: String,
}

/// Copied workbook
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CopyContentResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Id of the new workbook
    pub workbook_id: String,
}

/// Downloaded package
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Local path of the package
    pub download_path: String,
}

/// One revision
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevisionEntry {
    /// Revision number
    pub version_number: String,
    /// Publication timestamp
    pub created_at: String,
    /// Publisher
    pub modified_by: String,
}

impl From<Revision> for RevisionEntry {
    fn from(revision: Revision) -> Self {
        Self {
            version_number: revision.version_number,
            created_at: revision.created_at,
            modified_by: revision.modified_by,
        }
    }
}

/// Revision history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevisionHistoryResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Revisions in server order
    pub revisions: Vec<RevisionEntry>,
}

/// Metric that went down since the last audit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetricChangeEntry {
    /// `user_count` or `group_count`
    pub metric: String,
    /// Value in the stored snapshot
    pub previous: u64,
    /// Value observed now
    pub current: u64,
}

impl From<MetricChange> for MetricChangeEntry {
    fn from(change: MetricChange) -> Self {
        Self {
            metric: change.metric,
            previous: change.previous,
            current: change.current,
        }
    }
}

/// Audit outcome
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Audited site
    pub site: String,
    /// Users on the site
    pub user_count: u64,
    /// Groups on the site
    pub group_count: u64,
    /// Users per site role
    pub role_breakdown: BTreeMap<String, u64>,
    /// Metrics lower than in the previous snapshot
    pub negative_changes: Vec<MetricChangeEntry>,
}

impl From<AuditReport> for AuditResponse {
    fn from(report: AuditReport) -> Self {
        let message = if report.negative_changes.is_empty() {
            format!("Audit of site '{}' completed", report.site)
        } else {
            format!(
                "Audit of site '{}' completed with {} decreased metric(s)",
                report.site,
                report.negative_changes.len()
            )
        };
        Self {
            success: true,
            message,
            site: report.site,
            user_count: report.user_count,
            group_count: report.group_count,
            role_breakdown: report.role_breakdown,
            negative_changes: report.negative_changes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Personal space project
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PersonalSpaceEntry {
    /// Project name
    pub name: String,
    /// Project id
    pub id: String,
    /// Owner id, `N/A` when unknown
    pub owner_id: String,
}

impl From<PersonalSpace> for PersonalSpaceEntry {
    fn from(space: PersonalSpace) -> Self {
        Self {
            name: space.name,
            id: space.id,
            owner_id: space.owner_id,
        }
    }
}

/// Personal spaces on the site
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PersonalSpacesResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Personal space projects
    pub results: Vec<PersonalSpaceEntry>,
}

/// Lineage payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LineageResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Raw metadata API payload
    #[schema(value_type = Object)]
    pub response: Value,
}

/// Admin access of the signed-in identity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TcmAccessResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Checked site
    pub site_id: String,
    /// Signed-in user
    pub user: String,
    /// Site role of that user
    pub role: String,
    /// Whether the role grants Cloud Manager access
    pub has_tcm: bool,
}

impl From<TcmAccess> for TcmAccessResponse {
    fn from(access: TcmAccess) -> Self {
        let message = if access.has_tcm {
            format!("User '{}' has TCM access", access.user)
        } else {
            format!("User '{}' does not have TCM access", access.user)
        };
        Self {
            success: true,
            message,
            site_id: access.site_id,
            user: access.user,
            role: access.role,
            has_tcm: access.has_tcm,
        }
    }
}

/// Downloaded view rendition
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ViewDownloadResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Local path of the file
    pub path: String,
}

/// Extension usage of a workbook
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtensionsResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Workbook name
    pub workbook: String,
    /// Extracted `.twb` file
    pub path: String,
    /// TabPy or analytics extension referenced
    pub tabpy_used: bool,
    /// Einstein Discovery referenced
    pub einstein_used: bool,
    /// Dashboard extension present
    pub viz_ext_used: bool,
}

impl From<ExtensionReport> for ExtensionsResponse {
    fn from(report: ExtensionReport) -> Self {
        Self {
            success: true,
            message: format!("Workbook '{}' scanned for extensions", report.workbook),
            workbook: report.workbook,
            path: report.path.display().to_string(),
            tabpy_used: report.tabpy_used,
            einstein_used: report.einstein_used,
            viz_ext_used: report.viz_ext_used,
        }
    }
}

/// Description and label presence of one item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetadataItem {
    /// `workbook` or `datasource`
    #[serde(rename = "type")]
    pub content_type: String,
    /// Item name
    pub name: String,
    /// Project name
    pub project: Option<String>,
    /// Whether a description is set
    pub description: bool,
    /// Whether data labels are attached
    pub has_data_labels: bool,
}

impl From<MetadataEntry> for MetadataItem {
    fn from(entry: MetadataEntry) -> Self {
        Self {
            content_type: entry.content_type.as_str().to_string(),
            name: entry.name,
            project: entry.project,
            description: entry.description,
            has_data_labels: entry.has_data_labels,
        }
    }
}

/// Metadata completeness report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentMetadataResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// One entry per workbook and datasource
    pub items: Vec<MetadataItem>,
}

/// Created Pulse metric
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PulseResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Name of the created metric
    pub metric_name: String,
    /// Datasource the metric is defined on
    pub datasource_id: String,
    /// Raw metadata API payload
    #[schema(value_type = Object)]
    pub response: Value,
}

impl From<PulseMetric> for PulseResponse {
    fn from(metric: PulseMetric) -> Self {
        Self {
            success: true,
            message: format!("Pulse metric '{}' created", metric.metric_name),
            metric_name: metric.metric_name,
            datasource_id: metric.datasource_id,
            response: metric.response,
        }
    }
}

/// User created recently
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUserEntry {
    /// Sign-in name
    pub name: String,
    /// Email, when known
    pub email: Option<String>,
}

impl From<NewUser> for NewUserEntry {
    fn from(user: NewUser) -> Self {
        Self {
            name: user.name,
            email: user.email,
        }
    }
}

/// Site activity in the last day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SiteActivityResponse {
    /// Always `true`
    pub success: bool,
    /// Outcome
    pub message: String,
    /// Users created in the window
    pub new_users: Vec<NewUserEntry>,
    /// Groups created in the window
    pub new_groups: Vec<String>,
    /// Users whose role is not `Unlicensed`
    pub licensed_users: usize,
    /// Whether a report was sent
    pub notified: bool,
}

impl From<ActivityReport> for SiteActivityResponse {
    fn from(report: ActivityReport) -> Self {
        Self {
            success: true,
            message: format!(
                "{} new user(s), {} new group(s), {} licensed user(s)",
                report.new_users.len(),
                report.new_groups.len(),
                report.licensed_users
            ),
            new_users: report.new_users.into_iter().map(Into::into).collect(),
            new_groups: report.new_groups,
            licensed_users: report.licensed_users,
            notified: report.notified,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since start
    pub uptime: u64,
    /// Default Tableau site
    pub site: String,
}
