//! Audit and site monitoring handlers

use axum::{body::Bytes, extract::State, Json};

use super::ApiQuery;
use crate::{
    error::{ApiError, ApiResult},
    models::{
        AuditResponse, ContentMetadataResponse, ErrorResponse, ExtensionsResponse,
        LineageResponse, MessageResponse, MetadataItem, PersonalSpaceEntry,
        PersonalSpacesResponse, PulseResponse, SiteActivityResponse, SiteQuery,
        TcmAccessResponse, ValidatePulseRequest, WorkbookQuery,
    },
    state::AppState,
};

/// Audit user and group counts against the stored snapshot
#[utoipa::path(
    post,
    path = "/tableau/audit_site",
    params(SiteQuery),
    responses(
        (status = 200, description = "Audit completed", body = AuditResponse),
        (status = 400, description = "Audit failed", body = ErrorResponse)
    )
)]
pub async fn audit_site(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SiteQuery>,
) -> ApiResult<Json<AuditResponse>> {
    let report = state.audit.run(query.site_name.as_deref()).await?;
    Ok(Json(report.into()))
}

/// Personal space projects on the site
#[utoipa::path(
    get,
    path = "/tableau/personal_spaces",
    responses(
        (status = 200, description = "Personal spaces listed", body = PersonalSpacesResponse),
        (status = 400, description = "Listing failed", body = ErrorResponse)
    )
)]
pub async fn personal_spaces(State(state): State<AppState>) -> ApiResult<Json<PersonalSpacesResponse>> {
    let spaces = state.monitor.personal_spaces().await?;
    Ok(Json(PersonalSpacesResponse {
        success: true,
        message: format!("Found {} personal space(s)", spaces.len()),
        results: spaces.into_iter().map(PersonalSpaceEntry::from).collect(),
    }))
}

/// Upstream lineage of a workbook from the metadata API
#[utoipa::path(
    get,
    path = "/tableau/get_lineage_for_workbook",
    params(WorkbookQuery),
    responses(
        (status = 200, description = "Lineage payload", body = LineageResponse),
        (status = 400, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn get_lineage_for_workbook(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WorkbookQuery>,
) -> ApiResult<Json<LineageResponse>> {
    let response = state.monitor.lineage(&query.workbook_name).await?;
    Ok(Json(LineageResponse {
        success: true,
        message: format!("Lineage fetched for workbook '{}'", query.workbook_name.trim()),
        response,
    }))
}

/// Whether the signed-in identity can use Tableau Cloud Manager
#[utoipa::path(
    get,
    path = "/tableau/check_tcm_access",
    params(SiteQuery),
    responses(
        (status = 200, description = "Access checked", body = TcmAccessResponse),
        (status = 400, description = "Check failed", body = ErrorResponse)
    )
)]
pub async fn check_tcm_access(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SiteQuery>,
) -> ApiResult<Json<TcmAccessResponse>> {
    let access = state.monitor.tcm_access(query.site_name.as_deref()).await?;
    Ok(Json(access.into()))
}

/// Scan a workbook for TabPy, Einstein and dashboard extensions
#[utoipa::path(
    get,
    path = "/tableau/check_extensions_in_workbook",
    params(WorkbookQuery),
    responses(
        (status = 200, description = "Workbook scanned", body = ExtensionsResponse),
        (status = 400, description = "Scan failed", body = ErrorResponse)
    )
)]
pub async fn check_extensions_in_workbook(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WorkbookQuery>,
) -> ApiResult<Json<ExtensionsResponse>> {
    let report = state.monitor.check_extensions(&query.workbook_name).await?;
    Ok(Json(report.into()))
}

/// Description and data label presence for all content
#[utoipa::path(
    get,
    path = "/tableau/confirm_content_labels_and_description",
    responses(
        (status = 200, description = "Content checked", body = ContentMetadataResponse),
        (status = 400, description = "Check failed", body = ErrorResponse)
    )
)]
pub async fn confirm_content_labels_and_description(
    State(state): State<AppState>,
) -> ApiResult<Json<ContentMetadataResponse>> {
    let entries = state.monitor.content_metadata().await?;
    Ok(Json(ContentMetadataResponse {
        success: true,
        message: format!("Checked {} item(s)", entries.len()),
        items: entries.into_iter().map(MetadataItem::from).collect(),
    }))
}

/// Check Pulse availability by defining a metric
#[utoipa::path(
    post,
    path = "/tableau/validate_pulse",
    request_body(content = ValidatePulseRequest, description = "Optional; defaults to the configured datasource"),
    responses(
        (status = 200, description = "Metric created", body = PulseResponse),
        (status = 400, description = "Pulse disabled or metric rejected", body = ErrorResponse)
    )
)]
pub async fn validate_pulse(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<PulseResponse>> {
    let request: ValidatePulseRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ValidatePulseRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let metric = state
        .monitor
        .validate_pulse(request.datasource_name.as_deref())
        .await?;
    Ok(Json(metric.into()))
}

/// Users and groups created in the last day
#[utoipa::path(
    get,
    path = "/tableau/site_activity",
    responses(
        (status = 200, description = "Activity collected", body = SiteActivityResponse),
        (status = 400, description = "Collection failed", body = ErrorResponse)
    )
)]
pub async fn site_activity(State(state): State<AppState>) -> ApiResult<Json<SiteActivityResponse>> {
    let report = state.monitor.site_activity().await?;
    Ok(Json(report.into()))
}

/// Register the Slack webhook on the site
#[utoipa::path(
    get,
    path = "/tableau/slack_connection",
    responses(
        (status = 200, description = "Webhook exists", body = MessageResponse),
        (status = 400, description = "Missing URL or webhook rejected", body = ErrorResponse)
    )
)]
pub async fn slack_connection(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    state.monitor.slack_connection().await?;
    Ok(Json(MessageResponse::ok("Slack webhook integration Exists.")))
}
