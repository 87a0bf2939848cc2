//! HTTP client implementation

use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::HttpConfig,
    error::{HttpError, Result},
};

/// Configured HTTP client; cheap to clone, clones share one connection pool
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Create a new HTTP client with configuration
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.user_agent)
            .redirect(if config.max_redirects > 0 {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            });

        // Configure proxy if provided
        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| HttpError::InvalidProxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        // Configure connection pooling
        if config.pool_enabled {
            builder = builder.pool_idle_timeout(config.pool_idle_timeout());
        } else {
            builder = builder.pool_max_idle_per_host(0);
        }

        let inner = builder
            .build()
            .map_err(|e| HttpError::BuildError(e.to_string()))?;

        Ok(Self { inner, config })
    }

    /// Create HTTP client with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpConfig::default())
    }

    /// Get configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Start a request after validating the URL
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let url = url
            .parse::<url::Url>()
            .map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))?;
        debug!("HTTP {} {}", method, url);
        Ok(self.inner.request(method, url))
    }

    /// Send a request and fail on non-success status
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(HttpError::RequestFailed)?;
        check_response(response).await
    }

    /// Send a request and return the response whatever its status
    pub async fn send_raw(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(HttpError::RequestFailed)
    }
}

/// Return the response unchanged on success, otherwise an
/// [`HttpError::HttpStatus`] carrying the most specific message the body offers
pub async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(HttpError::HttpStatus {
        status,
        message: error_message(&body),
    })
}

/// Pull `error.summary`/`error.detail` (or `message`) out of a JSON error
/// body; fall back to the raw text
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return if body.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            body.trim().to_string()
        };
    };

    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
    let error = value.get("error");
    match (
        text(error.and_then(|e| e.get("summary"))),
        text(error.and_then(|e| e.get("detail"))),
    ) {
        (Some(summary), Some(detail)) => format!("{summary}: {detail}"),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => text(value.get("message"))
            .or_else(|| text(error))
            .unwrap_or_else(|| body.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation_with_config() {
        let config = HttpConfig::default().with_timeout(Duration::from_secs(10));
        let client = HttpClient::new(config).unwrap();
        assert_eq!(client.config().timeout_secs, 10);
    }

    #[test]
    fn test_invalid_proxy() {
        let config = HttpConfig::default().with_proxy("invalid-proxy");
        let result = HttpClient::new(config);
        assert!(matches!(result, Err(HttpError::InvalidProxy(_))));
    }

    #[test]
    fn test_request_rejects_invalid_url() {
        let client = HttpClient::with_defaults().unwrap();
        let result = client.request(Method::GET, "not a url");
        assert!(matches!(result, Err(HttpError::InvalidUrl(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"summary":"Not Found","detail":"Project missing","code":"404005"}}"#),
            "Not Found: Project missing"
        );
        assert_eq!(error_message(r#"{"message":"bad token"}"#), "bad token");
        assert_eq!(error_message("plain failure"), "plain failure");
        assert_eq!(error_message(""), "Unknown error");
    }

    #[tokio::test]
    async fn test_send_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3.22/sites"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "summary": "Signin Error", "detail": "Invalid token", "code": "401002" }
            })))
            .mount(&server)
            .await;

        let client = HttpClient::with_defaults().unwrap();
        let request = client
            .request(Method::GET, &format!("{}/api/3.22/sites", server.uri()))
            .unwrap();
        let err = client.send(request).await.unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
        assert!(err.to_string().contains("Signin Error: Invalid token"));
    }

    #[tokio::test]
    async fn test_send_sets_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "tabops-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = HttpClient::new(HttpConfig::default().with_user_agent("tabops-test")).unwrap();
        let request = client.request(Method::GET, &server.uri()).unwrap();
        let response = client.send(request).await.unwrap();

        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = HttpClient::new(HttpConfig::fast()).unwrap();
        let request = client.request(Method::GET, "http://127.0.0.1:9/").unwrap();
        let err = client.send(request).await.unwrap_err();
        assert!(err.is_transport());
    }
}
