//! API error types and handling

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tabops_core::OpsError;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// An operation failed
    #[error("{error}")]
    Operation {
        /// Underlying failure
        error: OpsError,
        /// Extra fields merged into the failure body
        fields: Map<String, Value>,
    },

    /// The request could not be parsed
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Attach an extra field to the failure body
    pub fn with_field(self, key: &str, value: Value) -> Self {
        match self {
            ApiError::Operation { error, mut fields } => {
                fields.insert(key.to_string(), value);
                ApiError::Operation { error, fields }
            }
            other => other,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Operation {
                error: OpsError::Transport(_),
                ..
            } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<OpsError> for ApiError {
    fn from(error: OpsError) -> Self {
        let mut fields = Map::new();
        if let OpsError::AlreadyExists { existing, .. } = &error {
            fields.insert("projects".to_string(), json!(existing));
        }
        ApiError::Operation { error, fields }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, "{message}");
        } else {
            tracing::warn!(%status, "{message}");
        }

        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert("message".to_string(), Value::String(message));
        if let ApiError::Operation { fields, .. } = self {
            body.extend(fields);
        }

        (status, Json(Value::Object(body))).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tabops_core::EntityKind;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = OpsError::Transport("connection refused".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err: ApiError = OpsError::InvalidType("report".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_collision_lists_projects() {
        let err: ApiError = OpsError::AlreadyExists {
            kind: EntityKind::Project,
            name: "P1".to_string(),
            existing: vec!["P1".to_string(), "Sales".to_string()],
        }
        .into();
        match err {
            ApiError::Operation { fields, .. } => {
                assert_eq!(fields["projects"], json!(["P1", "Sales"]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
