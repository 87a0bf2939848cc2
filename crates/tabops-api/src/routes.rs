//! API route definitions

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::{
    handlers::{content, downloads, health, monitoring},
    middleware::logging_middleware,
    state::AppState,
};

/// Operation routes, mounted under `/tableau`
pub fn tableau_routes() -> Router<AppState> {
    Router::new()
        // Content management
        .route("/create_project", post(content::create_project))
        .route("/delete_content", post(content::delete_content))
        .route("/move_content", post(content::move_content))
        .route("/update_ownership", post(content::update_ownership))
        .route("/copy_content", post(content::copy_content))
        .route("/revision_history", post(content::revision_history))
        // Downloads
        .route("/download_content", post(downloads::download_content))
        .route("/download_view_features", get(downloads::download_view_features))
        // Monitoring
        .route("/audit_site", post(monitoring::audit_site))
        .route("/personal_spaces", get(monitoring::personal_spaces))
        .route("/get_lineage_for_workbook", get(monitoring::get_lineage_for_workbook))
        .route("/check_tcm_access", get(monitoring::check_tcm_access))
        .route(
            "/check_extensions_in_workbook",
            get(monitoring::check_extensions_in_workbook),
        )
        .route(
            "/confirm_content_labels_and_description",
            get(monitoring::confirm_content_labels_and_description),
        )
        .route("/validate_pulse", post(monitoring::validate_pulse))
        .route("/site_activity", get(monitoring::site_activity))
        .route("/slack_connection", get(monitoring::slack_connection))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Combined routes
pub fn all_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/tableau", tableau_routes())
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Application router with state attached
pub fn router(state: AppState) -> Router {
    all_routes().with_state(state)
}

/// OpenAPI document of the whole API
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        content::create_project,
        content::delete_content,
        content::move_content,
        content::update_ownership,
        content::copy_content,
        content::revision_history,
        downloads::download_content,
        downloads::download_view_features,
        monitoring::audit_site,
        monitoring::personal_spaces,
        monitoring::get_lineage_for_workbook,
        monitoring::check_tcm_access,
        monitoring::check_extensions_in_workbook,
        monitoring::confirm_content_labels_and_description,
        monitoring::validate_pulse,
        monitoring::site_activity,
        monitoring::slack_connection,
    ),
    components(schemas(
        crate::models::CreateProjectRequest,
        crate::models::DeleteContentRequest,
        crate::models::MoveContentRequest,
        crate::models::UpdateOwnershipRequest,
        crate::models::CopyContentRequest,
        crate::models::DownloadRequest,
        crate::models::RevisionHistoryRequest,
        crate::models::ValidatePulseRequest,
        crate::models::MessageResponse,
        crate::models::ErrorResponse,
        crate::models::CreateProjectResponse,
        crate::models::MoveContentResponse,
        crate::models::CopyContentResponse,
        crate::models::DownloadResponse,
        crate::models::RevisionHistoryResponse,
        crate::models::AuditResponse,
        crate::models::PersonalSpacesResponse,
        crate::models::LineageResponse,
        crate::models::TcmAccessResponse,
        crate::models::ViewDownloadResponse,
        crate::models::ExtensionsResponse,
        crate::models::ContentMetadataResponse,
        crate::models::PulseResponse,
        crate::models::SiteActivityResponse,
        crate::models::HealthResponse,
    )),
    info(
        title = "tabops API",
        description = "Tableau content management, downloads and site monitoring"
    )
)]
pub struct ApiDoc;
