//! Package and view download handlers

use axum::{extract::State, Json};

use super::{ApiJson, ApiQuery};
use crate::{
    error::ApiResult,
    models::{
        DownloadRequest, DownloadResponse, ErrorResponse, ViewDownloadQuery, ViewDownloadResponse,
    },
    state::AppState,
};

/// Download a packaged workbook or datasource into the download directory
#[utoipa::path(
    post,
    path = "/tableau/download_content",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Package written", body = DownloadResponse),
        (status = 400, description = "Lookup or format failure", body = ErrorResponse)
    )
)]
pub async fn download_content(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DownloadRequest>,
) -> ApiResult<Json<DownloadResponse>> {
    let path = state
        .retriever
        .download_package(
            &request.content_type,
            &request.content_name,
            request.project_name.as_deref().filter(|p| !p.trim().is_empty()),
            request.format_type.as_deref().filter(|f| !f.trim().is_empty()),
        )
        .await?;
    Ok(Json(DownloadResponse {
        success: true,
        message: format!(
            "Downloaded {} '{}' successfully.",
            request.content_type.trim().to_lowercase(),
            request.content_name.trim()
        ),
        download_path: path.display().to_string(),
    }))
}

/// Render a view as image, PDF or CSV
#[utoipa::path(
    get,
    path = "/tableau/download_view_features",
    params(ViewDownloadQuery),
    responses(
        (status = 200, description = "Rendition written", body = ViewDownloadResponse),
        (status = 400, description = "Unknown view or format", body = ErrorResponse)
    )
)]
pub async fn download_view_features(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ViewDownloadQuery>,
) -> ApiResult<Json<ViewDownloadResponse>> {
    let path = state
        .retriever
        .download_view(&query.view_name, &query.download_format)
        .await?;
    Ok(Json(ViewDownloadResponse {
        success: true,
        message: format!("{} downloaded", capitalize(query.download_format.trim())),
        path: path.display().to_string(),
    }))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::capitalize;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("pdf"), "Pdf");
        assert_eq!(capitalize("IMAGE"), "Image");
        assert_eq!(capitalize(""), "");
    }
}
