//! Tableau REST API backend
//!
//! Implements the [`SessionProvider`](tabops_core::SessionProvider) and
//! [`ContentStore`](tabops_core::ContentStore) seams over the server's JSON
//! REST API and metadata GraphQL endpoint, signing in with a personal access
//! token.

pub mod error;
pub mod publish;
pub mod session;
pub mod wire;

pub use session::{RestSettings, TableauSession, TableauSessionProvider, AUTH_HEADER};
