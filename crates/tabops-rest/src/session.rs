//! Personal-access-token sessions against the Tableau REST API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use tabops_core::{
    ContentItem, ContentKind, ContentStore, Group, NewProject, OpsError, Package, Project,
    Rendition, Result, Revision, SessionProvider, User, View, WebhookSpec,
};
use tabops_http::{header, HttpClient, HttpError, Method, RequestBuilder, Response, StatusCode};

use crate::{
    error::{decode_error, map_http},
    publish,
    wire::{
        collection_keys, ContentWire, GroupWire, Pagination, ProjectWire, RevisionWire,
        SignInResponse, UserWire, ViewWire,
    },
};

/// Header carrying the session token on every call after sign-in
pub const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Where and how to sign in
#[derive(Debug, Clone)]
pub struct RestSettings {
    /// Base URL of the server, without the `/api` suffix
    pub server_url: String,
    pub api_version: String,
    pub token_name: String,
    pub token_secret: String,
    /// Page size for list calls
    pub page_size: u32,
}

impl RestSettings {
    fn server(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    fn api_base(&self) -> String {
        format!("{}/api/{}", self.server(), self.api_version)
    }
}

/// Signs in with a personal access token
pub struct TableauSessionProvider {
    http: HttpClient,
    settings: RestSettings,
}

impl TableauSessionProvider {
    pub fn new(http: HttpClient, settings: RestSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl SessionProvider for TableauSessionProvider {
    async fn sign_in(&self, site: &str) -> Result<Arc<dyn ContentStore>> {
        let url = format!("{}/auth/signin", self.settings.api_base());
        let body = json!({
            "credentials": {
                "personalAccessTokenName": self.settings.token_name,
                "personalAccessTokenSecret": self.settings.token_secret,
                "site": { "contentUrl": site }
            }
        });

        let request = self
            .http
            .request(Method::POST, &url)
            .map_err(map_http)?
            .header(header::ACCEPT, "application/json")
            .json(&body);
        // Any rejection of the sign-in itself means bad credentials or site
        let response = self.http.send(request).await.map_err(|e| match map_http(e) {
            OpsError::Remote(message) => OpsError::Auth(message),
            other => other,
        })?;
        let signed_in: SignInResponse = response
            .json()
            .await
            .map_err(|e| decode_error("sign-in", e))?;

        info!(site, site_id = %signed_in.credentials.site.id, "Signed in to Tableau site");
        Ok(Arc::new(TableauSession {
            http: self.http.clone(),
            server_url: self.settings.server().to_string(),
            api_base: self.settings.api_base(),
            page_size: self.settings.page_size.max(1),
            token: signed_in.credentials.token,
            site_id: signed_in.credentials.site.id,
            user_id: signed_in.credentials.user.id,
            closed: AtomicBool::new(false),
        }))
    }
}

/// One signed-in site
pub struct TableauSession {
    http: HttpClient,
    server_url: String,
    api_base: String,
    page_size: u32,
    token: String,
    site_id: String,
    user_id: String,
    closed: AtomicBool,
}

fn rendition_path(rendition: Rendition) -> &'static str {
    match rendition {
        Rendition::Image => "image",
        Rendition::Pdf => "pdf",
        Rendition::Csv => "data",
    }
}

/// File name from a `Content-Disposition` header
fn disposition_filename(response: &Response) -> Option<String> {
    let value = response
        .headers()
        .get(header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;
    for part in value.split(';').map(str::trim) {
        if let Some(encoded) = part.strip_prefix("filename*=UTF-8''") {
            if let Ok(decoded) = urlencoding::decode(encoded) {
                return Some(decoded.into_owned());
            }
        }
    }
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
}

impl TableauSession {
    fn site_url(&self, path: &str) -> String {
        format!("{}/sites/{}/{}", self.api_base, self.site_id, path)
    }

    fn authed(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OpsError::Session(format!(
                "request to {url} after sign-out"
            )));
        }
        Ok(self
            .http
            .request(method, url)
            .map_err(map_http)?
            .header(AUTH_HEADER, &self.token)
            .header(header::ACCEPT, "application/json"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.http.send(request).await.map_err(map_http)
    }

    async fn send_json(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = self.send(request).await?;
        response.json().await.map_err(|e| decode_error(what, e))
    }

    /// Pull `body[key]` out as `T`
    fn field<T: DeserializeOwned>(body: &Value, key: &str) -> Result<T> {
        let value = body
            .get(key)
            .cloned()
            .ok_or_else(|| decode_error(key, "missing field"))?;
        serde_json::from_value(value).map_err(|e| decode_error(key, e))
    }

    /// Fetch every page of a site collection
    async fn list<T: DeserializeOwned>(&self, path: &str, plural: &str, singular: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u64;
        loop {
            let url = format!(
                "{}?pageSize={}&pageNumber={page}",
                self.site_url(path),
                self.page_size
            );
            let body = self.send_json(self.authed(Method::GET, &url)?, plural).await?;

            let batch: Vec<T> = match body.get(plural).and_then(|c| c.get(singular)) {
                Some(list) => serde_json::from_value(list.clone()).map_err(|e| decode_error(plural, e))?,
                None => Vec::new(),
            };
            let fetched = batch.len();
            items.extend(batch);

            let total = match body.get("pagination") {
                Some(p) => serde_json::from_value::<Pagination>(p.clone())
                    .map_err(|e| decode_error("pagination", e))?
                    .total_available,
                None => break,
            };
            debug!(path, page, fetched, total, "Fetched page");
            if fetched == 0 || items.len() as u64 >= total {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

#[async_trait]
impl ContentStore for TableauSession {
    fn site_id(&self) -> &str {
        &self.site_id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects: Vec<ProjectWire> = self.list("projects", "projects", "project").await?;
        Ok(projects.into_iter().map(Project::from).collect())
    }

    async fn list_content(&self, kind: ContentKind) -> Result<Vec<ContentItem>> {
        let (plural, singular) = collection_keys(kind);
        let items: Vec<ContentWire> = self.list(plural, plural, singular).await?;
        Ok(items.into_iter().map(|w| w.into_item(kind)).collect())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users: Vec<UserWire> = self.list("users", "users", "user").await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let url = self.site_url(&format!("users/{id}"));
        let body = self.send_json(self.authed(Method::GET, &url)?, "user").await?;
        Ok(Self::field::<UserWire>(&body, "user")?.into())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups: Vec<GroupWire> = self.list("groups", "groups", "group").await?;
        Ok(groups.into_iter().map(Group::from).collect())
    }

    async fn list_views(&self) -> Result<Vec<View>> {
        let views: Vec<ViewWire> = self.list("views", "views", "view").await?;
        Ok(views.into_iter().map(View::from).collect())
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let url = self.site_url("projects");
        let request = self.authed(Method::POST, &url)?.json(&json!({
            "project": { "name": project.name, "description": project.description }
        }));
        let body = self.send_json(request, "project").await?;
        Ok(Self::field::<ProjectWire>(&body, "project")?.into())
    }

    async fn update_project(&self, project: &Project) -> Result<Project> {
        let url = self.site_url(&format!("projects/{}", project.id));
        let mut update = json!({ "name": project.name });
        if let Some(description) = &project.description {
            update["description"] = json!(description);
        }
        if let Some(owner) = &project.owner_id {
            update["owner"] = json!({ "id": owner });
        }
        let request = self
            .authed(Method::PUT, &url)?
            .json(&json!({ "project": update }));
        let body = self.send_json(request, "project").await?;
        Ok(Self::field::<ProjectWire>(&body, "project")?.into())
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        let url = self.site_url(&format!("projects/{id}"));
        self.send(self.authed(Method::DELETE, &url)?).await?;
        Ok(())
    }

    async fn update_content(&self, item: &ContentItem) -> Result<ContentItem> {
        let (plural, singular) = collection_keys(item.kind);
        let url = self.site_url(&format!("{plural}/{}", item.id));
        let mut update = serde_json::Map::new();
        update.insert(
            singular.to_string(),
            json!({
                "project": { "id": item.project_id },
                "owner": { "id": item.owner_id }
            }),
        );
        let request = self.authed(Method::PUT, &url)?.json(&update);
        let body = self.send_json(request, singular).await?;
        Ok(Self::field::<ContentWire>(&body, singular)?.into_item(item.kind))
    }

    async fn delete_content(&self, kind: ContentKind, id: &str) -> Result<()> {
        let (plural, _) = collection_keys(kind);
        let url = self.site_url(&format!("{plural}/{id}"));
        self.send(self.authed(Method::DELETE, &url)?).await?;
        Ok(())
    }

    async fn download_content(
        &self,
        kind: ContentKind,
        id: &str,
        include_extract: bool,
    ) -> Result<Package> {
        let (plural, _) = collection_keys(kind);
        let url = self.site_url(&format!(
            "{plural}/{id}/content?includeExtract={include_extract}"
        ));
        let response = self.send(self.authed(Method::GET, &url)?).await?;
        let filename = disposition_filename(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_http(HttpError::RequestFailed(e)))?;
        debug!(%kind, id, include_extract, bytes = bytes.len(), ?filename, "Downloaded package");
        Ok(Package {
            filename,
            bytes: bytes.to_vec(),
        })
    }

    async fn publish_workbook(&self, name: &str, project_id: &str, package: Package) -> Result<ContentItem> {
        let workbook_type = if package.is_archive() { "twbx" } else { "twb" };
        let filename = package
            .filename
            .clone()
            .unwrap_or_else(|| format!("{name}.{workbook_type}"));
        let body = publish::workbook_body(name, project_id, &filename, &package.bytes);

        let url = self.site_url(&format!(
            "workbooks?workbookType={workbook_type}&overwrite=false"
        ));
        let request = self
            .authed(Method::POST, &url)?
            .header(header::CONTENT_TYPE, body.content_type())
            .body(body.bytes);
        let response = self.send_json(request, "workbook").await?;
        Ok(Self::field::<ContentWire>(&response, "workbook")?.into_item(ContentKind::Workbook))
    }

    async fn render_view(&self, view_id: &str, rendition: Rendition) -> Result<Vec<Vec<u8>>> {
        let url = self.site_url(&format!("views/{view_id}/{}", rendition_path(rendition)));
        let mut response = self.send(self.authed(Method::GET, &url)?).await?;
        let mut chunks = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| map_http(HttpError::RequestFailed(e)))?
        {
            chunks.push(chunk.to_vec());
        }
        Ok(chunks)
    }

    async fn list_revisions(&self, kind: ContentKind, id: &str) -> Result<Vec<Revision>> {
        let (plural, _) = collection_keys(kind);
        let revisions: Vec<RevisionWire> = self
            .list(&format!("{plural}/{id}/revisions"), "revisions", "revision")
            .await?;
        Ok(revisions.into_iter().map(Revision::from).collect())
    }

    async fn metadata_query(&self, query: &str, variables: Value) -> Result<Value> {
        let url = format!("{}/api/metadata/graphql", self.server_url);
        let request = self
            .authed(Method::POST, &url)?
            .json(&json!({ "query": query, "variables": variables }));
        self.send_json(request, "metadata").await
    }

    async fn pulse_enabled(&self) -> Result<bool> {
        let url = self.site_url("pulse/metric-definitions");
        let response = self
            .http
            .send_raw(self.authed(Method::GET, &url)?)
            .await
            .map_err(map_http)?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            warn!("Pulse API not enabled for this site");
            Ok(false)
        } else {
            warn!(%status, "Pulse check failed");
            Ok(false)
        }
    }

    async fn create_webhook(&self, webhook: &WebhookSpec) -> Result<bool> {
        let url = self.site_url("webhooks");
        let request = self.authed(Method::POST, &url)?.json(&json!({
            "webhook": {
                "name": webhook.name,
                "event": webhook.event,
                "webhook-destination": {
                    "webhook-destination-http": { "method": "POST", "url": webhook.destination_url }
                }
            }
        }));
        let response = self.http.send_raw(request).await.map_err(map_http)?;
        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(true);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(%status, %body, "Webhook was not created");
        Ok(false)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let url = format!("{}/auth/signout", self.api_base);
        let request = self
            .http
            .request(Method::POST, &url)
            .map_err(map_http)?
            .header(AUTH_HEADER, &self.token);
        self.send(request).await?;
        Ok(())
    }
}
