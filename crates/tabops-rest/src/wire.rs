//! JSON wire types of the REST API and their conversion into core models
//!
//! The server is loose with scalar types: counts and flags may arrive as
//! strings or as native JSON values, so those fields go through the
//! `flexible_*` deserializers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use tabops_core::{ContentItem, ContentKind, Group, Project, Revision, User, View};

fn flexible_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn flexible_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn flexible_datetime<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// `{"id": ..., "name": ...}` reference to another entity
#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(deserialize_with = "flexible_u64", default)]
    pub page_number: u64,
    #[serde(deserialize_with = "flexible_u64", default)]
    pub page_size: u64,
    #[serde(deserialize_with = "flexible_u64", default)]
    pub total_available: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub credentials: SignInCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInCredentials {
    pub token: String,
    pub site: IdRef,
    pub user: IdRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWire {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<IdRef>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub personal_space: bool,
}

impl From<ProjectWire> for Project {
    fn from(wire: ProjectWire) -> Self {
        Project {
            id: wire.id,
            name: wire.name,
            owner_id: wire.owner.map(|o| o.id),
            description: wire.description,
            personal_space: wire.personal_space,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub tag: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub struct Tag {
    pub label: String,
}

/// Workbook or datasource as listed by the server
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentWire {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project: Option<IdRef>,
    #[serde(default)]
    pub owner: Option<IdRef>,
    #[serde(default)]
    pub tags: Option<Tags>,
}

impl ContentWire {
    pub fn into_item(self, kind: ContentKind) -> ContentItem {
        let (project_id, project_name) = match self.project {
            Some(project) => (project.id, project.name),
            None => (String::new(), None),
        };
        ContentItem {
            id: self.id,
            kind,
            name: self.name,
            project_id,
            project_name,
            owner_id: self.owner.map(|o| o.id).unwrap_or_default(),
            description: self.description,
            labels: self
                .tags
                .unwrap_or_default()
                .tag
                .into_iter()
                .map(|t| t.label)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWire {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    pub site_role: String,
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<UserWire> for User {
    fn from(wire: UserWire) -> Self {
        User {
            id: wire.id,
            name: wire.name,
            email: wire.email,
            site_role: wire.site_role,
            created_at: wire.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GroupWire {
    pub id: String,
    pub name: String,
}

impl From<GroupWire> for Group {
    fn from(wire: GroupWire) -> Self {
        Group {
            id: wire.id,
            name: wire.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ViewWire {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub workbook: Option<IdRef>,
    #[serde(default)]
    pub project: Option<IdRef>,
}

impl From<ViewWire> for View {
    fn from(wire: ViewWire) -> Self {
        View {
            id: wire.id,
            name: wire.name,
            workbook_id: wire.workbook.map(|w| w.id),
            project_id: wire.project.map(|p| p.id),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionWire {
    #[serde(deserialize_with = "flexible_string")]
    pub revision_number: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub publisher: Option<IdRef>,
}

impl From<RevisionWire> for Revision {
    fn from(wire: RevisionWire) -> Self {
        Revision {
            version_number: wire.revision_number,
            created_at: wire.published_at.unwrap_or_default(),
            modified_by: wire
                .publisher
                .and_then(|p| p.name.or(Some(p.id)))
                .unwrap_or_default(),
        }
    }
}

/// Collection path segments, e.g. `("projects", "project")`
pub fn collection_keys(kind: ContentKind) -> (&'static str, &'static str) {
    match kind {
        ContentKind::Workbook => ("workbooks", "workbook"),
        ContentKind::Datasource => ("datasources", "datasource"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_accepts_strings() {
        let p: Pagination = serde_json::from_value(json!({
            "pageNumber": "2", "pageSize": "100", "totalAvailable": "250"
        }))
        .unwrap();
        assert_eq!(p.page_number, 2);
        assert_eq!(p.total_available, 250);
    }

    #[test]
    fn test_content_wire_into_item() {
        let wire: ContentWire = serde_json::from_value(json!({
            "id": "w1",
            "name": "Superstore",
            "project": { "id": "p1", "name": "Samples" },
            "owner": { "id": "u1" },
            "tags": { "tag": [{ "label": "certified" }] }
        }))
        .unwrap();

        let item = wire.into_item(ContentKind::Workbook);
        assert_eq!(item.project_id, "p1");
        assert_eq!(item.project_name.as_deref(), Some("Samples"));
        assert_eq!(item.owner_id, "u1");
        assert_eq!(item.labels, vec!["certified"]);
    }

    #[test]
    fn test_project_personal_space_flag() {
        let wire: ProjectWire = serde_json::from_value(json!({
            "id": "p", "name": "Personal Space", "personalSpace": "true"
        }))
        .unwrap();
        assert!(Project::from(wire).personal_space);
    }

    #[test]
    fn test_revision_wire() {
        let wire: RevisionWire = serde_json::from_value(json!({
            "revisionNumber": 3,
            "publishedAt": "2024-02-01T10:00:00Z",
            "publisher": { "id": "u1", "name": "alice" }
        }))
        .unwrap();
        let revision = Revision::from(wire);
        assert_eq!(revision.version_number, "3");
        assert_eq!(revision.modified_by, "alice");
    }
}
