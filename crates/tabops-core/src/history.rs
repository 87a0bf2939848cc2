//! Revision history lookup

use tracing::instrument;

use crate::{
    context::SiteContext,
    error::Result,
    models::{ContentKind, Revision},
    resolver::Resolver,
};

/// Reads the immutable revision list of a workbook or datasource
#[derive(Clone)]
pub struct RevisionHistory {
    ctx: SiteContext,
}

impl RevisionHistory {
    pub fn new(ctx: SiteContext) -> Self {
        Self { ctx }
    }

    /// Revisions of the named item, in server order
    #[instrument(skip(self))]
    pub async fn revisions(
        &self,
        content_type: &str,
        content_name: &str,
        project_name: Option<&str>,
    ) -> Result<Vec<Revision>> {
        let kind = ContentKind::parse(content_type)?;
        self.ctx
            .run(|store| async move {
                let resolver = Resolver::new(store.as_ref());
                let project = resolver.optional_project(project_name).await?;
                let item = resolver.content(kind, content_name, project.as_ref()).await?;
                store.list_revisions(kind, &item.id).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::OpsError, memory::MemoryBackend};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_revisions_of_scoped_workbook() {
        let backend = MemoryBackend::new();
        backend.add_site("site");
        let owner = backend.add_user("site", "owner@example.com", "Creator");
        let finance = backend.add_project("site", "Finance");
        let sales = backend.add_project("site", "Sales");
        let wb = backend.add_content("site", ContentKind::Workbook, "Q1", &finance, &owner);
        backend.add_content("site", ContentKind::Workbook, "Q1", &sales, &owner);
        backend.with_site("site", |s| {
            s.revisions.insert(
                wb.id.clone(),
                vec![Revision {
                    version_number: "1".to_string(),
                    created_at: "2024-01-01T00:00:00Z".to_string(),
                    modified_by: "owner".to_string(),
                }],
            );
        });
        let history = RevisionHistory::new(SiteContext::new(Arc::new(backend.clone()), "site"));

        let ambiguous = history.revisions("workbook", "Q1", None).await.unwrap_err();
        assert!(matches!(ambiguous, OpsError::AmbiguousMatch { .. }));

        let revisions = history.revisions("workbook", "q1", Some("Finance")).await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].version_number, "1");
    }
}
