// Shared infrastructure
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

// Domain
pub mod notification;

// Push channel and live feed
pub mod feed;
pub mod websocket;

pub use auth::{AuthContext, Identity};
pub use error::{FeedError, Result};
pub use feed::{FeedController, FeedServices, FeedSession, FeedState};
pub use notification::{Notification, NotificationFeed, NotificationKind};
