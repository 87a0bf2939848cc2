//! Name resolution
//!
//! Lookup of named entities by case-insensitive, whitespace-trimmed name. Every
//! entity kind goes through the same exactly-one policy: zero matches is
//! `NotFound`, more than one is `AmbiguousMatch`. A silent pick among duplicates
//! could mutate the wrong remote object, so callers must narrow with a project.

use tracing::debug;

use crate::{
    error::{OpsError, Result},
    models::{ContentItem, ContentKind, EntityKind, Project, User, View},
    store::ContentStore,
};

/// Anything that can be looked up by name
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    /// Parent project id, for entities that live inside a project
    fn parent_project(&self) -> Option<&str> {
        None
    }
}

impl Named for Project {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ContentItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn parent_project(&self) -> Option<&str> {
        Some(&self.project_id)
    }
}

impl Named for User {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for View {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn parent_project(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
}

/// Canonical form used for every name comparison
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Project restriction applied before matching names
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub project_id: &'a str,
    pub project_name: &'a str,
}

impl<'a> From<&'a Project> for Scope<'a> {
    fn from(project: &'a Project) -> Self {
        Scope {
            project_id: &project.id,
            project_name: &project.name,
        }
    }
}

/// All candidates whose normalized name equals the normalized target
pub fn matches<'a, T: Named>(
    candidates: &'a [T],
    target: &str,
    scope: Option<Scope<'_>>,
) -> Vec<&'a T> {
    let wanted = normalize(target);
    candidates
        .iter()
        .filter(|c| match scope {
            Some(scope) => c.parent_project() == Some(scope.project_id),
            None => true,
        })
        .filter(|c| normalize(c.name()) == wanted)
        .collect()
}

/// Resolve exactly one entity or fail with `NotFound` / `AmbiguousMatch`
pub fn find<'a, T: Named>(
    kind: EntityKind,
    candidates: &'a [T],
    target: &str,
    scope: Option<Scope<'_>>,
) -> Result<&'a T> {
    let found = matches(candidates, target, scope);
    let scope_name = scope.map(|s| s.project_name.to_string());
    match found.as_slice() {
        [only] => Ok(*only),
        [] => Err(OpsError::NotFound {
            kind,
            name: target.to_string(),
            scope: scope_name,
        }),
        _ => Err(OpsError::AmbiguousMatch {
            kind,
            name: target.to_string(),
            scope: scope_name,
        }),
    }
}

/// Resolver bound to a live session
pub struct Resolver<'s> {
    store: &'s dyn ContentStore,
}

impl<'s> Resolver<'s> {
    pub fn new(store: &'s dyn ContentStore) -> Self {
        Self { store }
    }

    pub async fn project(&self, name: &str) -> Result<Project> {
        let projects = self.store.list_projects().await?;
        let project = find(EntityKind::Project, &projects, name, None)?;
        debug!(project = %project.name, id = %project.id, "Resolved project");
        Ok(project.clone())
    }

    /// Resolve an optional project name
    pub async fn optional_project(&self, name: Option<&str>) -> Result<Option<Project>> {
        match name {
            Some(name) => self.project(name).await.map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a workbook or datasource, optionally inside `project`
    pub async fn content(
        &self,
        kind: ContentKind,
        name: &str,
        project: Option<&Project>,
    ) -> Result<ContentItem> {
        let items = self.store.list_content(kind).await?;
        let item = find(kind.entity(), &items, name, project.map(Scope::from))?;
        debug!(content = %item.name, id = %item.id, kind = %kind, "Resolved content");
        Ok(item.clone())
    }

    /// Resolve a user by sign-in name (email)
    pub async fn user(&self, email: &str) -> Result<User> {
        let users = self.store.list_users().await?;
        let user = find(EntityKind::User, &users, email, None)?;
        debug!(user = %user.name, id = %user.id, "Resolved user");
        Ok(user.clone())
    }

    pub async fn view(&self, name: &str) -> Result<View> {
        let views = self.store.list_views().await?;
        find(EntityKind::View, &views, name, None).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: None,
            description: None,
            personal_space: false,
        }
    }

    fn workbook(id: &str, name: &str, project_id: &str) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            kind: ContentKind::Workbook,
            name: name.to_string(),
            project_id: project_id.to_string(),
            project_name: None,
            owner_id: "owner".to_string(),
            description: None,
            labels: Vec::new(),
        }
    }

    #[test]
    fn test_find_is_case_and_whitespace_insensitive() {
        let projects = vec![project("p1", "MyProj"), project("p2", "Other")];
        let a = find(EntityKind::Project, &projects, "  MyProj ", None).unwrap();
        let b = find(EntityKind::Project, &projects, "myproj", None).unwrap();
        assert_eq!(a.id, "p1");
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_find_rejects_duplicates() {
        let projects = vec![project("p1", "Sales"), project("p2", " sales")];
        let result = find(EntityKind::Project, &projects, "Sales", None);
        assert!(matches!(result, Err(OpsError::AmbiguousMatch { .. })));
    }

    #[test]
    fn test_find_missing() {
        let projects = vec![project("p1", "Sales")];
        let result = find(EntityKind::Project, &projects, "Marketing", None);
        assert!(matches!(result, Err(OpsError::NotFound { .. })));
    }

    #[test]
    fn test_scope_narrows_duplicates() {
        let finance = project("p1", "Finance");
        let items = vec![workbook("w1", "WB", "p1"), workbook("w2", "WB", "p2")];

        assert!(matches!(
            find(EntityKind::Workbook, &items, "wb", None),
            Err(OpsError::AmbiguousMatch { .. })
        ));

        let scoped = find(EntityKind::Workbook, &items, "wb", Some(Scope::from(&finance))).unwrap();
        assert_eq!(scoped.id, "w1");
    }

    #[test]
    fn test_scoped_not_found_names_project() {
        let finance = project("p9", "Finance");
        let items = vec![workbook("w1", "WB", "p1")];
        let err = find(EntityKind::Workbook, &items, "WB", Some(Scope::from(&finance))).unwrap_err();
        assert_eq!(err.to_string(), "Workbook 'WB' not found in project 'Finance'");
    }

    proptest! {
        #[test]
        fn prop_padding_and_case_never_change_resolution(
            name in "[A-Za-z][A-Za-z0-9 ]{0,12}[A-Za-z0-9]",
            left in " {0,3}",
            right in " {0,3}",
            upper in any::<bool>(),
        ) {
            let projects = vec![project("p1", &name), project("p2", "zz-unrelated-zz")];
            let query = if upper { name.to_uppercase() } else { name.to_lowercase() };
            let query = format!("{left}{query}{right}");

            let first = find(EntityKind::Project, &projects, &query, None).unwrap();
            let second = find(EntityKind::Project, &projects, &query, None).unwrap();
            prop_assert_eq!(&first.id, "p1");
            prop_assert_eq!(&first.id, &second.id);
        }
    }
}
