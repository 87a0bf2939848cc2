//! tabops core
//!
//! Name resolution, content mutation, asset retrieval, auditing and site
//! monitoring over a remote BI content store.
//!
//! The remote server is reached only through the [`SessionProvider`] and
//! [`ContentStore`] traits. Every operation signs in, resolves names with the
//! strict exactly-one policy of [`resolver`], performs its calls and signs out
//! again, whatever the outcome.

pub mod audit;
pub mod context;
pub mod error;
pub mod extensions;
pub mod history;
pub mod memory;
pub mod models;
pub mod monitoring;
pub mod mutator;
pub mod notify;
pub mod resolver;
pub mod retriever;
pub mod store;

pub use audit::{AuditEngine, AuditReport, AuditSnapshot, MetricChange, SnapshotStore};
pub use context::SiteContext;
pub use error::{OpsError, Result};
pub use history::RevisionHistory;
pub use models::{
    ContentItem, ContentKind, ContentType, EntityKind, Group, NewProject, Package, Project,
    Rendition, Revision, User, View, WebhookSpec,
};
pub use monitoring::{
    ActivityReport, ExtensionReport, MetadataEntry, MonitorSettings, NewUser, PersonalSpace,
    PulseMetric, SiteMonitor, TcmAccess,
};
pub use mutator::{ContentMutator, CopiedWorkbook, DeletedContent, MovedContent, OwnershipChange};
pub use notify::{DisabledNotifier, NotificationError, Notifier};
pub use resolver::Resolver;
pub use retriever::AssetRetriever;
pub use store::{with_session, ContentStore, SessionProvider};
