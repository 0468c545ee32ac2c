//! Notification records, the in-memory feed, and the remote service seam.

mod feed;
mod service;
mod types;

pub use feed::{NotificationFeed, PushOutcome};
pub use service::{HttpNotificationService, NotificationService};
pub use types::{Notification, NotificationKind, Severity};
