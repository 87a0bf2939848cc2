//! Remote entity models
//!
//! The system never owns these entities. They are transient, request-scoped
//! references resolved fresh from the remote store on every call.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OpsError;

/// Kind of named entity, used for resolution and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Workbook,
    Datasource,
    User,
    View,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Project => "Project",
            EntityKind::Workbook => "Workbook",
            EntityKind::Datasource => "Datasource",
            EntityKind::User => "User",
            EntityKind::View => "View",
            EntityKind::Group => "Group",
        };
        f.write_str(label)
    }
}

/// Content type accepted by the operation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Project,
    Workbook,
    Datasource,
}

impl FromStr for ContentType {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "project" => Ok(ContentType::Project),
            "workbook" => Ok(ContentType::Workbook),
            "datasource" => Ok(ContentType::Datasource),
            _ => Err(OpsError::InvalidType(format!(
                "{s}. Must be 'project', 'workbook' or 'datasource'"
            ))),
        }
    }
}

impl ContentType {
    /// Narrow to a publishable content kind
    pub fn content_kind(self) -> Option<ContentKind> {
        match self {
            ContentType::Project => None,
            ContentType::Workbook => Some(ContentKind::Workbook),
            ContentType::Datasource => Some(ContentKind::Datasource),
        }
    }

    pub fn entity(self) -> EntityKind {
        match self {
            ContentType::Project => EntityKind::Project,
            ContentType::Workbook => EntityKind::Workbook,
            ContentType::Datasource => EntityKind::Datasource,
        }
    }
}

/// Publishable content: workbooks and datasources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Workbook,
    Datasource,
}

impl ContentKind {
    /// Parse a user-supplied content type that must be a workbook or datasource
    pub fn parse(value: &str) -> Result<Self, OpsError> {
        value
            .parse::<ContentType>()
            .ok()
            .and_then(ContentType::content_kind)
            .ok_or_else(|| {
                OpsError::InvalidType(format!("{value}. Must be 'workbook' or 'datasource'"))
            })
    }

    pub fn entity(self) -> EntityKind {
        match self {
            ContentKind::Workbook => EntityKind::Workbook,
            ContentKind::Datasource => EntityKind::Datasource,
        }
    }

    /// Packaged file extension used for downloads
    pub fn package_extension(self) -> &'static str {
        match self {
            ContentKind::Workbook => "twbx",
            ContentKind::Datasource => "tdsx",
        }
    }

    /// Lowercase name as used in REST paths and messages
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Workbook => "workbook",
            ContentKind::Datasource => "datasource",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder-like container for content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
    pub description: Option<String>,
    /// Set for per-user personal space projects
    #[serde(default)]
    pub personal_space: bool,
}

/// Input for project creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

/// Workbook or datasource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub kind: ContentKind,
    pub name: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub owner_id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Site user; `name` is the sign-in email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub site_role: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// True unless the site role is `Unlicensed`
    pub fn is_licensed(&self) -> bool {
        !self.site_role.is_empty() && self.site_role != "Unlicensed"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// Sheet or dashboard inside a workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    pub workbook_id: Option<String>,
    pub project_id: Option<String>,
}

/// Immutable history entry of a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub version_number: String,
    pub created_at: String,
    pub modified_by: String,
}

/// Downloaded content package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// File name assigned by the server, if any
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl Package {
    /// Packaged workbooks and datasources are zip archives
    pub fn is_archive(&self) -> bool {
        self.bytes.starts_with(b"PK\x03\x04")
    }
}

/// Rendered export of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rendition {
    Image,
    Pdf,
    Csv,
}

impl FromStr for Rendition {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" | "png" => Ok(Rendition::Image),
            "pdf" => Ok(Rendition::Pdf),
            "csv" => Ok(Rendition::Csv),
            other => Err(OpsError::InvalidFormat(format!(
                "Invalid download type '{other}'. Use 'image', 'pdf' or 'csv'"
            ))),
        }
    }
}

impl Rendition {
    pub fn extension(self) -> &'static str {
        match self {
            Rendition::Image => "png",
            Rendition::Pdf => "pdf",
            Rendition::Csv => "csv",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rendition::Image => "image",
            Rendition::Pdf => "pdf",
            Rendition::Csv => "csv",
        }
    }
}

/// Webhook registration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSpec {
    pub name: String,
    pub event: String,
    pub destination_url: String,
}
