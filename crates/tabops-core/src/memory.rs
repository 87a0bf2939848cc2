//! In-memory content store
//!
//! A complete [`SessionProvider`] / [`ContentStore`] pair backed by plain
//! vectors. Used by the test suites and for offline dry runs of the API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{OpsError, Result},
    models::{
        ContentItem, ContentKind, EntityKind, Group, NewProject, Package, Project, Rendition,
        Revision, User, View, WebhookSpec,
    },
    notify::{NotificationError, Notifier},
    store::{ContentStore, SessionProvider},
};

/// Mutable state of one site
#[derive(Debug, Default, Clone)]
pub struct SiteState {
    pub projects: Vec<Project>,
    pub content: Vec<ContentItem>,
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub views: Vec<View>,
    pub packages: HashMap<String, Vec<u8>>,
    pub renditions: HashMap<(String, Rendition), Vec<Vec<u8>>>,
    pub revisions: HashMap<String, Vec<Revision>>,
    pub metadata_response: Option<Value>,
    pub metadata_queries: Vec<String>,
    pub pulse_enabled: bool,
    pub webhooks: Vec<WebhookSpec>,
    /// Package downloads served: content id and whether the extract was requested
    pub downloads: Vec<(String, bool)>,
    /// Id of the identity that signs in
    pub signed_in_user: Option<String>,
    /// Operation name -> error message for injected remote failures
    pub failures: HashMap<String, String>,
}

impl SiteState {
    fn fail_if_injected(&self, operation: &str) -> Result<()> {
        match self.failures.get(operation) {
            Some(message) => Err(OpsError::Remote(message.clone())),
            None => Ok(()),
        }
    }

    fn project_name(&self, project_id: &str) -> Option<String> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.name.clone())
    }
}

#[derive(Default)]
struct Shared {
    sites: Mutex<HashMap<String, SiteState>>,
    open_sessions: AtomicUsize,
    sign_ins: AtomicUsize,
}

/// In-memory remote store holding any number of sites; clones share state
#[derive(Default, Clone)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty site that accepts sign-ins
    pub fn add_site(&self, site: &str) {
        self.shared.sites.lock().entry(site.to_string()).or_default();
    }

    /// Inspect or mutate a site's state
    ///
    /// # Panics
    ///
    /// Panics if the site was never added.
    pub fn with_site<R>(&self, site: &str, f: impl FnOnce(&mut SiteState) -> R) -> R {
        let mut sites = self.shared.sites.lock();
        let state = sites
            .get_mut(site)
            .unwrap_or_else(|| panic!("unknown in-memory site '{site}'"));
        f(state)
    }

    pub fn add_project(&self, site: &str, name: &str) -> Project {
        let project = Project {
            id: new_id(),
            name: name.to_string(),
            owner_id: None,
            description: None,
            personal_space: false,
        };
        self.with_site(site, |s| s.projects.push(project.clone()));
        project
    }

    pub fn add_user(&self, site: &str, email: &str, site_role: &str) -> User {
        let user = User {
            id: new_id(),
            name: email.to_string(),
            email: Some(email.to_string()),
            site_role: site_role.to_string(),
            created_at: None,
        };
        self.with_site(site, |s| s.users.push(user.clone()));
        user
    }

    pub fn add_group(&self, site: &str, name: &str) -> Group {
        let group = Group {
            id: new_id(),
            name: name.to_string(),
        };
        self.with_site(site, |s| s.groups.push(group.clone()));
        group
    }

    /// Add a workbook or datasource with a small placeholder package
    pub fn add_content(
        &self,
        site: &str,
        kind: ContentKind,
        name: &str,
        project: &Project,
        owner: &User,
    ) -> ContentItem {
        let item = ContentItem {
            id: new_id(),
            kind,
            name: name.to_string(),
            project_id: project.id.clone(),
            project_name: Some(project.name.clone()),
            owner_id: owner.id.clone(),
            description: None,
            labels: Vec::new(),
        };
        self.with_site(site, |s| {
            s.packages
                .insert(item.id.clone(), format!("package:{name}").into_bytes());
            s.content.push(item.clone());
        });
        item
    }

    pub fn add_view(&self, site: &str, name: &str, renditions: Vec<(Rendition, Vec<Vec<u8>>)>) -> View {
        let view = View {
            id: new_id(),
            name: name.to_string(),
            workbook_id: None,
            project_id: None,
        };
        self.with_site(site, |s| {
            for (rendition, chunks) in renditions {
                s.renditions.insert((view.id.clone(), rendition), chunks);
            }
            s.views.push(view.clone());
        });
        view
    }

    /// Make the named store operation fail with a remote error
    pub fn inject_failure(&self, site: &str, operation: &str, message: &str) {
        self.with_site(site, |s| {
            s.failures.insert(operation.to_string(), message.to_string());
        });
    }

    pub fn clear_failure(&self, site: &str, operation: &str) {
        self.with_site(site, |s| {
            s.failures.remove(operation);
        });
    }

    /// Sessions signed in and not yet signed out
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    pub fn sign_in_count(&self) -> usize {
        self.shared.sign_ins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MemoryBackend {
    async fn sign_in(&self, site: &str) -> Result<Arc<dyn ContentStore>> {
        let user_id = {
            let sites = self.shared.sites.lock();
            let state = sites
                .get(site)
                .ok_or_else(|| OpsError::Auth(format!("site '{site}' does not exist")))?;
            if let Some(message) = state.failures.get("sign_in") {
                return Err(OpsError::Auth(message.clone()));
            }
            state.signed_in_user.clone().unwrap_or_default()
        };
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.shared.sign_ins.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemorySession {
            backend: self.clone(),
            site: site.to_string(),
            user_id,
            closed: AtomicBool::new(false),
        }))
    }
}

/// Session over one in-memory site
pub struct MemorySession {
    backend: MemoryBackend,
    site: String,
    user_id: String,
    closed: AtomicBool,
}

impl MemorySession {
    /// Run `f` against the site state, failing once signed out or when a
    /// failure has been injected for `operation`
    fn live<R>(&self, operation: &str, f: impl FnOnce(&mut SiteState) -> Result<R>) -> Result<R> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OpsError::Session(format!(
                "'{operation}' called after sign-out"
            )));
        }
        let mut sites = self.backend.shared.sites.lock();
        let state = sites
            .get_mut(&self.site)
            .ok_or_else(|| OpsError::Session(format!("site '{}' vanished", self.site)))?;
        state.fail_if_injected(operation)?;
        f(state)
    }
}

fn missing(kind: EntityKind, id: &str) -> OpsError {
    OpsError::Remote(format!("{kind} with id '{id}' does not exist"))
}

#[async_trait]
impl ContentStore for MemorySession {
    fn site_id(&self) -> &str {
        &self.site
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.live("list_projects", |s| Ok(s.projects.clone()))
    }

    async fn list_content(&self, kind: ContentKind) -> Result<Vec<ContentItem>> {
        self.live("list_content", |s| {
            Ok(s.content.iter().filter(|c| c.kind == kind).cloned().collect())
        })
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.live("list_users", |s| Ok(s.users.clone()))
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        self.live("get_user", |s| {
            s.users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or_else(|| missing(EntityKind::User, id))
        })
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        self.live("list_groups", |s| Ok(s.groups.clone()))
    }

    async fn list_views(&self) -> Result<Vec<View>> {
        self.live("list_views", |s| Ok(s.views.clone()))
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let owner_id = self.user_id.clone();
        self.live("create_project", |s| {
            let created = Project {
                id: new_id(),
                name: project.name.clone(),
                owner_id: Some(owner_id).filter(|id| !id.is_empty()),
                description: Some(project.description.clone()),
                personal_space: false,
            };
            s.projects.push(created.clone());
            Ok(created)
        })
    }

    async fn update_project(&self, project: &Project) -> Result<Project> {
        self.live("update_project", |s| {
            let slot = s
                .projects
                .iter_mut()
                .find(|p| p.id == project.id)
                .ok_or_else(|| missing(EntityKind::Project, &project.id))?;
            slot.owner_id = project.owner_id.clone();
            slot.description = project.description.clone();
            Ok(slot.clone())
        })
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.live("delete_project", |s| {
            let before = s.projects.len();
            s.projects.retain(|p| p.id != id);
            if s.projects.len() == before {
                return Err(missing(EntityKind::Project, id));
            }
            s.content.retain(|c| c.project_id != id);
            Ok(())
        })
    }

    async fn update_content(&self, item: &ContentItem) -> Result<ContentItem> {
        self.live("update_content", |s| {
            let project_name = s.project_name(&item.project_id);
            let slot = s
                .content
                .iter_mut()
                .find(|c| c.kind == item.kind && c.id == item.id)
                .ok_or_else(|| missing(item.kind.entity(), &item.id))?;
            slot.project_id = item.project_id.clone();
            slot.project_name = project_name;
            slot.owner_id = item.owner_id.clone();
            Ok(slot.clone())
        })
    }

    async fn delete_content(&self, kind: ContentKind, id: &str) -> Result<()> {
        self.live("delete_content", |s| {
            let before = s.content.len();
            s.content.retain(|c| !(c.kind == kind && c.id == id));
            if s.content.len() == before {
                return Err(missing(kind.entity(), id));
            }
            s.packages.remove(id);
            Ok(())
        })
    }

    async fn download_content(
        &self,
        kind: ContentKind,
        id: &str,
        include_extract: bool,
    ) -> Result<Package> {
        self.live("download_content", |s| {
            let filename = s
                .content
                .iter()
                .find(|c| c.kind == kind && c.id == id)
                .map(|item| format!("{}.{}", item.name, kind.package_extension()))
                .ok_or_else(|| missing(kind.entity(), id))?;
            s.downloads.push((id.to_string(), include_extract));
            let bytes = s.packages.get(id).cloned().unwrap_or_default();
            Ok(Package {
                filename: Some(filename),
                bytes,
            })
        })
    }

    async fn publish_workbook(
        &self,
        name: &str,
        project_id: &str,
        package: Package,
    ) -> Result<ContentItem> {
        let owner_id = self.user_id.clone();
        self.live("publish_workbook", |s| {
            let project_name = s
                .project_name(project_id)
                .ok_or_else(|| missing(EntityKind::Project, project_id))?;
            let item = ContentItem {
                id: new_id(),
                kind: ContentKind::Workbook,
                name: name.to_string(),
                project_id: project_id.to_string(),
                project_name: Some(project_name),
                owner_id,
                description: None,
                labels: Vec::new(),
            };
            s.packages.insert(item.id.clone(), package.bytes);
            s.content.push(item.clone());
            Ok(item)
        })
    }

    async fn render_view(&self, view_id: &str, rendition: Rendition) -> Result<Vec<Vec<u8>>> {
        self.live("render_view", |s| {
            s.renditions
                .get(&(view_id.to_string(), rendition))
                .cloned()
                .ok_or_else(|| {
                    OpsError::Remote(format!(
                        "no {} rendition for view '{view_id}'",
                        rendition.as_str()
                    ))
                })
        })
    }

    async fn list_revisions(&self, _kind: ContentKind, id: &str) -> Result<Vec<Revision>> {
        self.live("list_revisions", |s| {
            Ok(s.revisions.get(id).cloned().unwrap_or_default())
        })
    }

    async fn metadata_query(&self, query: &str, _variables: Value) -> Result<Value> {
        self.live("metadata_query", |s| {
            s.metadata_queries.push(query.to_string());
            Ok(s
                .metadata_response
                .clone()
                .unwrap_or_else(|| serde_json::json!({ "data": {} })))
        })
    }

    async fn pulse_enabled(&self) -> Result<bool> {
        self.live("pulse_enabled", |s| Ok(s.pulse_enabled))
    }

    async fn create_webhook(&self, webhook: &WebhookSpec) -> Result<bool> {
        self.live("create_webhook", |s| {
            s.webhooks.push(webhook.clone());
            Ok(true)
        })
    }

    async fn sign_out(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.backend.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Notifier that records every message; optionally fails each delivery
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body_html: &str) -> std::result::Result<(), NotificationError> {
        self.sent
            .lock()
            .push((subject.to_string(), body_html.to_string()));
        if self.fail {
            return Err(NotificationError::Delivery("delivery refused".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::with_session;

    #[tokio::test]
    async fn test_unknown_site_is_auth_error() {
        let backend = MemoryBackend::new();
        let result = backend.sign_in("missing").await;
        assert!(matches!(result, Err(OpsError::Auth(_))));
    }

    #[tokio::test]
    async fn test_store_rejects_calls_after_sign_out() {
        let backend = MemoryBackend::new();
        backend.add_site("site");
        let store = backend.sign_in("site").await.unwrap();
        assert_eq!(backend.open_sessions(), 1);

        store.sign_out().await.unwrap();
        assert_eq!(backend.open_sessions(), 0);
        assert!(matches!(
            store.list_projects().await,
            Err(OpsError::Session(_))
        ));
    }

    #[tokio::test]
    async fn test_with_session_signs_out_on_error() {
        let backend = MemoryBackend::new();
        backend.add_site("site");

        let result: Result<()> = with_session(&backend, "site", |_store| async {
            Err(OpsError::Remote("boom".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(backend.sign_in_count(), 1);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MemoryBackend::new();
        backend.add_site("site");
        backend.inject_failure("site", "list_users", "users endpoint down");
        let store = backend.sign_in("site").await.unwrap();

        let err = store.list_users().await.unwrap_err();
        assert_eq!(err.to_string(), "Remote error: users endpoint down");
    }
}
