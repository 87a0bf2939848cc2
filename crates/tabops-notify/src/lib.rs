//! Notification delivery for tabops
//!
//! Implementations of the core [`Notifier`](tabops_core::Notifier) seam:
//!
//! - [`EmailNotifier`]: HTML mail over SMTP with STARTTLS
//! - [`SlackNotifier`]: incoming webhook or `chat.postMessage`
//! - [`FanoutNotifier`]: one message to several notifiers
//!
//! Callers in the core swallow delivery failures, so these types simply
//! report what went wrong through [`NotifyError`].

pub mod email;
pub mod error;
pub mod fanout;
pub mod slack;

pub use email::{EmailNotifier, EmailSettings};
pub use error::{NotifyError, Result};
pub use fanout::FanoutNotifier;
pub use slack::{SlackNotifier, SlackSettings};
