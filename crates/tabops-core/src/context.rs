//! Process-wide site context
//!
//! Built once at startup and handed to every component, so nothing reaches out
//! to ambient global state for credentials or the default site.

use std::future::Future;
use std::sync::Arc;

use crate::{
    error::Result,
    store::{with_session, ContentStore, SessionProvider},
};

/// Session provider plus the default site operations run against
#[derive(Clone)]
pub struct SiteContext {
    sessions: Arc<dyn SessionProvider>,
    site: String,
}

impl SiteContext {
    pub fn new(sessions: Arc<dyn SessionProvider>, site: impl Into<String>) -> Self {
        Self {
            sessions,
            site: site.into(),
        }
    }

    /// Default site id
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Run `op` in a fresh session on the default site
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn ContentStore>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_session(self.sessions.as_ref(), &self.site, op).await
    }

    /// Run `op` in a fresh session on `site`, or the default site when `None`
    pub async fn run_on<T, F, Fut>(&self, site: Option<&str>, op: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn ContentStore>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let site = site.filter(|s| !s.trim().is_empty()).unwrap_or(&self.site);
        with_session(self.sessions.as_ref(), site, op).await
    }
}
