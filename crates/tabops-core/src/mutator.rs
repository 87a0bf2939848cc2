//! Content mutations: create, copy, move, re-own and delete
//!
//! Every operation opens its own session, resolves names through the
//! [`Resolver`] and checks preconditions before touching the remote store.
//! A failed precondition leaves the store untouched.

use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    context::SiteContext,
    error::{OpsError, Result},
    models::{ContentItem, ContentKind, ContentType, EntityKind, NewProject, Project},
    resolver::{self, Resolver},
};

/// Workbook created by [`ContentMutator::copy_workbook`]
#[derive(Debug, Clone, Serialize)]
pub struct CopiedWorkbook {
    pub source_id: String,
    pub workbook: ContentItem,
}

/// Outcome of [`ContentMutator::move_content`]
#[derive(Debug, Clone, Serialize)]
pub struct MovedContent {
    pub content_id: String,
    pub project_id: String,
}

/// Outcome of [`ContentMutator::update_ownership`]
#[derive(Debug, Clone, Serialize)]
pub struct OwnershipChange {
    pub content_type: ContentType,
    pub id: String,
    pub name: String,
    pub previous_owner_id: String,
    pub new_owner_id: String,
}

/// Outcome of [`ContentMutator::delete_content`]
#[derive(Debug, Clone, Serialize)]
pub struct DeletedContent {
    pub content_type: ContentType,
    pub id: String,
    pub name: String,
}

/// Structural changes to projects, workbooks and datasources
#[derive(Clone)]
pub struct ContentMutator {
    ctx: SiteContext,
}

impl ContentMutator {
    pub fn new(ctx: SiteContext) -> Self {
        Self { ctx }
    }

    /// Create a top-level project.
    ///
    /// Fails with `AlreadyExists` (carrying the current project names) when a
    /// project with the same normalized name is already present.
    #[instrument(skip(self, description))]
    pub async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        self.ctx
            .run(|store| async move {
                let projects = store.list_projects().await?;
                if !resolver::matches(&projects, name, None).is_empty() {
                    return Err(OpsError::AlreadyExists {
                        kind: EntityKind::Project,
                        name: name.trim().to_string(),
                        existing: projects.iter().map(|p| p.name.clone()).collect(),
                    });
                }

                let created = store
                    .create_project(&NewProject {
                        name: name.trim().to_string(),
                        description: description.to_string(),
                    })
                    .await?;
                info!(project = %created.name, id = %created.id, "Created project");
                Ok(created)
            })
            .await
    }

    /// Duplicate a workbook into another project.
    ///
    /// The source package is downloaded and published as a new object in the
    /// target project; the source workbook is never modified.
    #[instrument(skip(self))]
    pub async fn copy_workbook(
        &self,
        workbook_name: &str,
        source_project: &str,
        target_project: &str,
    ) -> Result<CopiedWorkbook> {
        self.ctx
            .run(|store| async move {
                let resolver = Resolver::new(store.as_ref());
                let source = resolver.project(source_project).await?;
                let target = resolver.project(target_project).await?;
                let workbook = resolver
                    .content(ContentKind::Workbook, workbook_name, Some(&source))
                    .await?;

                let package = store
                    .download_content(ContentKind::Workbook, &workbook.id, true)
                    .await?;
                let copied = store
                    .publish_workbook(&workbook.name, &target.id, package)
                    .await?;

                info!(
                    workbook = %workbook.name,
                    from = %source.name,
                    to = %target.name,
                    new_id = %copied.id,
                    "Copied workbook"
                );
                Ok(CopiedWorkbook {
                    source_id: workbook.id,
                    workbook: copied,
                })
            })
            .await
    }

    /// Re-parent a workbook or datasource in place; the id is preserved
    #[instrument(skip(self))]
    pub async fn move_content(
        &self,
        content_type: &str,
        content_name: &str,
        source_project: &str,
        target_project: &str,
    ) -> Result<MovedContent> {
        let kind = ContentKind::parse(content_type)?;
        self.ctx
            .run(|store| async move {
                let resolver = Resolver::new(store.as_ref());
                let source = resolver.project(source_project).await?;
                let target = resolver.project(target_project).await?;
                let mut item = resolver.content(kind, content_name, Some(&source)).await?;

                item.project_id = target.id.clone();
                let moved = store.update_content(&item).await?;

                info!(%kind, content = %moved.name, to = %target.name, "Moved content");
                Ok(MovedContent {
                    content_id: moved.id,
                    project_id: moved.project_id,
                })
            })
            .await
    }

    /// Transfer ownership of a workbook, datasource or project.
    ///
    /// `current_owner` must be the actual owner; otherwise nothing is changed.
    #[instrument(skip(self))]
    pub async fn update_ownership(
        &self,
        content_type: &str,
        content_name: &str,
        current_owner: &str,
        new_owner: &str,
        project_name: Option<&str>,
    ) -> Result<OwnershipChange> {
        let content_type: ContentType = content_type.parse()?;
        self.ctx
            .run(|store| async move {
                let resolver = Resolver::new(store.as_ref());
                let current = resolver.user(current_owner).await?;

                match content_type.content_kind() {
                    Some(kind) => {
                        let project = resolver.optional_project(project_name).await?;
                        let mut item = resolver.content(kind, content_name, project.as_ref()).await?;
                        if item.owner_id != current.id {
                            return Err(OpsError::OwnerMismatch {
                                kind: kind.entity(),
                                name: item.name,
                                asserted: current_owner.to_string(),
                            });
                        }
                        let target = resolver.user(new_owner).await?;

                        item.owner_id = target.id.clone();
                        let updated = store.update_content(&item).await?;
                        info!(%kind, content = %updated.name, owner = %target.name, "Transferred ownership");
                        Ok(OwnershipChange {
                            content_type,
                            id: updated.id,
                            name: updated.name,
                            previous_owner_id: current.id,
                            new_owner_id: target.id,
                        })
                    }
                    None => {
                        let mut project = resolver.project(content_name).await?;
                        if project.owner_id.as_deref() != Some(current.id.as_str()) {
                            return Err(OpsError::OwnerMismatch {
                                kind: EntityKind::Project,
                                name: project.name,
                                asserted: current_owner.to_string(),
                            });
                        }
                        let target = resolver.user(new_owner).await?;

                        project.owner_id = Some(target.id.clone());
                        let updated = store.update_project(&project).await?;
                        info!(project = %updated.name, owner = %target.name, "Transferred project ownership");
                        Ok(OwnershipChange {
                            content_type,
                            id: updated.id,
                            name: updated.name,
                            previous_owner_id: current.id,
                            new_owner_id: target.id,
                        })
                    }
                }
            })
            .await
    }

    /// Delete a project, workbook or datasource.
    ///
    /// Workbooks and datasources must be addressed with their project. Without
    /// one the call fails: `AmbiguousMatch` when several items share the name,
    /// `NotFound` when none does, `MissingProject` otherwise.
    #[instrument(skip(self))]
    pub async fn delete_content(
        &self,
        content_type: &str,
        content_name: &str,
        project_name: Option<&str>,
    ) -> Result<DeletedContent> {
        let content_type: ContentType = content_type.parse()?;
        let project_name = project_name.filter(|p| !p.trim().is_empty());
        self.ctx
            .run(|store| async move {
                let resolver = Resolver::new(store.as_ref());

                let (id, name) = match (content_type.content_kind(), project_name) {
                    (None, _) => {
                        let project = resolver.project(content_name).await?;
                        store.delete_project(&project.id).await?;
                        (project.id, project.name)
                    }
                    (Some(kind), Some(project_name)) => {
                        let project = resolver.project(project_name).await?;
                        let item = resolver.content(kind, content_name, Some(&project)).await?;
                        store.delete_content(kind, &item.id).await?;
                        (item.id, item.name)
                    }
                    (Some(kind), None) => {
                        let items = store.list_content(kind).await?;
                        // Resolution errors win so duplicates are reported as such
                        resolver::find(kind.entity(), &items, content_name, None)?;
                        return Err(OpsError::MissingProject {
                            kind: kind.entity(),
                            action: "delete".to_string(),
                        });
                    }
                };

                info!(?content_type, %name, %id, "Deleted content");
                Ok(DeletedContent {
                    content_type,
                    id,
                    name,
                })
            })
            .await
    }
}
