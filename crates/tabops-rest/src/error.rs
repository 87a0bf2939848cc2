//! Mapping of transport failures onto the operation error taxonomy

use tabops_core::OpsError;
use tabops_http::{HttpError, StatusCode};

/// Translate an HTTP failure into an [`OpsError`]
pub fn map_http(err: HttpError) -> OpsError {
    if err.is_transport() {
        return OpsError::Transport(err.to_string());
    }
    match err {
        HttpError::HttpStatus { status, message } if status == StatusCode::UNAUTHORIZED => {
            OpsError::Auth(message)
        }
        HttpError::HttpStatus { message, .. } => OpsError::Remote(message),
        HttpError::InvalidUrl(url) => OpsError::Config(format!("invalid server URL: {url}")),
        other => OpsError::Remote(other.to_string()),
    }
}

/// Body could not be decoded as the expected JSON document
pub fn decode_error(what: &str, err: impl std::fmt::Display) -> OpsError {
    OpsError::Remote(format!("unexpected {what} response: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_auth() {
        let err = map_http(HttpError::HttpStatus {
            status: StatusCode::UNAUTHORIZED,
            message: "Signin Error".to_string(),
        });
        assert!(matches!(err, OpsError::Auth(m) if m == "Signin Error"));
    }

    #[test]
    fn test_other_status_is_remote_with_message() {
        let err = map_http(HttpError::HttpStatus {
            status: StatusCode::CONFLICT,
            message: "Resource Conflict: project exists".to_string(),
        });
        assert_eq!(err.to_string(), "Remote error: Resource Conflict: project exists");
    }
}
