//! Remote content store seam and scoped sessions
//!
//! The vendor server is modelled as a remote object store reached through
//! list/get/create/update/delete/download verbs. A [`SessionProvider`] signs in
//! and hands out a [`ContentStore`] bound to one site; [`with_session`] makes
//! sure the session is signed out on every exit path.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::Result,
    models::{
        ContentItem, ContentKind, Group, NewProject, Package, Project, Rendition, Revision, User,
        View, WebhookSpec,
    },
};

/// Authenticated handle to one site of the remote store.
///
/// Every method fails with [`OpsError::Session`](crate::OpsError::Session)
/// once [`sign_out`](ContentStore::sign_out) has been called.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Site id (LUID) of the signed-in site
    fn site_id(&self) -> &str;

    /// User id of the signed-in identity
    fn user_id(&self) -> &str;

    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn list_content(&self, kind: ContentKind) -> Result<Vec<ContentItem>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: &str) -> Result<User>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn list_views(&self) -> Result<Vec<View>>;

    async fn create_project(&self, project: &NewProject) -> Result<Project>;

    /// Persist owner/description changes of an existing project
    async fn update_project(&self, project: &Project) -> Result<Project>;

    async fn delete_project(&self, id: &str) -> Result<()>;

    /// Persist parent project and owner changes, in place
    async fn update_content(&self, item: &ContentItem) -> Result<ContentItem>;

    async fn delete_content(&self, kind: ContentKind, id: &str) -> Result<()>;

    /// Download the packaged content, with or without its data extract
    async fn download_content(
        &self,
        kind: ContentKind,
        id: &str,
        include_extract: bool,
    ) -> Result<Package>;

    /// Publish a workbook package as a brand-new object (never overwrites)
    async fn publish_workbook(
        &self,
        name: &str,
        project_id: &str,
        package: Package,
    ) -> Result<ContentItem>;

    /// Render a view; the payload may arrive as several chunks
    async fn render_view(&self, view_id: &str, rendition: Rendition) -> Result<Vec<Vec<u8>>>;

    async fn list_revisions(&self, kind: ContentKind, id: &str) -> Result<Vec<Revision>>;

    /// Run a metadata GraphQL document and return the raw payload
    async fn metadata_query(&self, query: &str, variables: Value) -> Result<Value>;

    /// Whether the Pulse metric-definition API answers on this site
    async fn pulse_enabled(&self) -> Result<bool>;

    /// Register a webhook; `true` when the server created it
    async fn create_webhook(&self, webhook: &WebhookSpec) -> Result<bool>;

    /// Release the authentication state on the server
    async fn sign_out(&self) -> Result<()>;
}

/// Opens sessions against the remote store with preconfigured credentials
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Sign in to `site`; fails with `Auth` when credentials or site are rejected
    async fn sign_in(&self, site: &str) -> Result<Arc<dyn ContentStore>>;
}

/// Run `op` inside a signed-in session for `site` and always sign out afterwards.
///
/// Sign-out failures are logged and never replace the operation's own result.
pub async fn with_session<T, F, Fut>(provider: &dyn SessionProvider, site: &str, op: F) -> Result<T>
where
    F: FnOnce(Arc<dyn ContentStore>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let store = provider.sign_in(site).await?;
    debug!(site, site_id = store.site_id(), "Signed in");

    let outcome = op(Arc::clone(&store)).await;

    if let Err(e) = store.sign_out().await {
        warn!(site, "Sign-out failed: {e}");
    } else {
        debug!(site, "Signed out");
    }

    outcome
}
