//! Project and content mutation handlers

use axum::{extract::State, Json};
use serde_json::json;
use tabops_core::{ContentType, EntityKind, OpsError};

use super::ApiJson;
use crate::{
    error::ApiResult,
    models::{
        CopyContentRequest, CopyContentResponse, CreateProjectRequest, CreateProjectResponse,
        DeleteContentRequest, ErrorResponse, MessageResponse, MoveContentRequest,
        MoveContentResponse, RevisionEntry, RevisionHistoryRequest, RevisionHistoryResponse,
        UpdateOwnershipRequest,
    },
    state::AppState,
};

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Create a project
#[utoipa::path(
    post,
    path = "/tableau/create_project",
    request_body = CreateProjectRequest,
    responses(
        (status = 200, description = "Project created", body = CreateProjectResponse),
        (status = 400, description = "Project exists or request failed", body = ErrorResponse)
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateProjectRequest>,
) -> ApiResult<Json<CreateProjectResponse>> {
    let project = state
        .mutator
        .create_project(&request.project_name, &request.description)
        .await?;
    Ok(Json(CreateProjectResponse {
        success: true,
        message: format!("Successfully created project '{}'", project.name),
        project_id: project.id,
    }))
}

/// Delete a project, workbook or datasource
#[utoipa::path(
    post,
    path = "/tableau/delete_content",
    request_body = DeleteContentRequest,
    responses(
        (status = 200, description = "Content deleted", body = MessageResponse),
        (status = 400, description = "Not found, ambiguous or missing project", body = ErrorResponse)
    )
)]
pub async fn delete_content(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteContentRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let project = non_empty(&request.project_name);
    let deleted = state
        .mutator
        .delete_content(&request.content_type, &request.content_name, project)
        .await?;

    let kind = deleted.content_type.entity();
    let message = match (deleted.content_type, project) {
        (ContentType::Project, _) | (_, None) => format!("{kind} '{}' deleted successfully", deleted.name),
        (_, Some(project)) => {
            format!("{kind} '{}' deleted successfully from project '{project}'", deleted.name)
        }
    };
    Ok(Json(MessageResponse::ok(message)))
}

/// Move a workbook or datasource to another project
#[utoipa::path(
    post,
    path = "/tableau/move_content",
    request_body = MoveContentRequest,
    responses(
        (status = 200, description = "Content moved", body = MoveContentResponse),
        (status = 400, description = "Move failed", body = ErrorResponse)
    )
)]
pub async fn move_content(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MoveContentRequest>,
) -> ApiResult<Json<MoveContentResponse>> {
    let moved = state
        .mutator
        .move_content(
            &request.content_type,
            &request.content_name,
            &request.source_project,
            &request.new_project,
        )
        .await?;
    Ok(Json(MoveContentResponse {
        success: true,
        message: format!(
            "Successfully moved {} '{}' to project '{}'",
            request.content_type.trim().to_lowercase(),
            request.content_name.trim(),
            request.new_project.trim()
        ),
        content_id: moved.content_id,
        project_id: moved.project_id,
    }))
}

/// Transfer ownership of a workbook, datasource or project
#[utoipa::path(
    post,
    path = "/tableau/update_ownership",
    request_body = UpdateOwnershipRequest,
    responses(
        (status = 200, description = "Ownership transferred", body = MessageResponse),
        (status = 400, description = "Owner mismatch or lookup failure", body = ErrorResponse)
    )
)]
pub async fn update_ownership(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateOwnershipRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let change = state
        .mutator
        .update_ownership(
            &request.content_type,
            &request.content_name,
            &request.current_owner,
            &request.new_owner,
            non_empty(&request.project_name),
        )
        .await?;

    let message = match change.content_type {
        ContentType::Project => format!("Project ownership updated to '{}'", request.new_owner),
        other => format!(
            "{} '{}' ownership changed to '{}'",
            other.entity(),
            change.name,
            request.new_owner
        ),
    };
    Ok(Json(MessageResponse::ok(message)))
}

/// Copy a workbook into another project
#[utoipa::path(
    post,
    path = "/tableau/copy_content",
    request_body = CopyContentRequest,
    responses(
        (status = 200, description = "Workbook copied", body = CopyContentResponse),
        (status = 400, description = "Copy failed", body = ErrorResponse)
    )
)]
pub async fn copy_content(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CopyContentRequest>,
) -> ApiResult<Json<CopyContentResponse>> {
    let source_project = non_empty(&request.source_project).ok_or(OpsError::MissingProject {
        kind: EntityKind::Workbook,
        action: "copy".to_string(),
    })?;
    let copied = state
        .mutator
        .copy_workbook(&request.workbook_name, source_project, &request.target_project)
        .await?;
    Ok(Json(CopyContentResponse {
        success: true,
        message: format!(
            "Workbook '{}' successfully copied from '{}' to '{}'.",
            copied.workbook.name,
            source_project,
            request.target_project.trim()
        ),
        workbook_id: copied.workbook.id,
    }))
}

/// Revision history of a workbook or datasource
#[utoipa::path(
    post,
    path = "/tableau/revision_history",
    request_body = RevisionHistoryRequest,
    responses(
        (status = 200, description = "Revisions fetched", body = RevisionHistoryResponse),
        (status = 400, description = "Lookup failed; `revisions` is empty", body = ErrorResponse)
    )
)]
pub async fn revision_history(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RevisionHistoryRequest>,
) -> ApiResult<Json<RevisionHistoryResponse>> {
    let revisions = state
        .history
        .revisions(
            &request.content_type,
            &request.content_name,
            non_empty(&request.project_name),
        )
        .await
        .map_err(|e| crate::error::ApiError::from(e).with_field("revisions", json!([])))?;
    Ok(Json(RevisionHistoryResponse {
        success: true,
        message: "Revision history fetched successfully".to_string(),
        revisions: revisions.into_iter().map(RevisionEntry::from).collect(),
    }))
}
