//! HTTP client for tabops
//!
//! A configured [`reqwest`] client shared by the REST session layer and the
//! Slack notifier.
//!
//! ## Features
//!
//! - **Configurable**: timeouts, proxy, user-agent, redirects, pooling
//! - **Status checking**: non-2xx responses become [`HttpError::HttpStatus`]
//!   carrying the server's error summary
//! - **Testing support**: exercised against wiremock servers

pub mod client;
pub mod config;
pub mod error;

pub use client::{check_response, HttpClient};
pub use config::HttpConfig;
pub use error::{HttpError, Result};

/// Re-export commonly used types
pub use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
