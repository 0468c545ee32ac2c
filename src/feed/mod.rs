//! Live notification feed.
//!
//! `FeedController` follows the current identity and owns at most one
//! `FeedSession`. The session keeps the notification list in sync from an
//! initial fetch, the push channel, and optimistic local mutations.

mod controller;
mod session;
mod state;

use std::sync::Arc;

use crate::config::{Endpoints, ReconnectConfig, Settings};
use crate::error::Result;
use crate::notification::{HttpNotificationService, NotificationService};
use crate::websocket::{PushConnector, WsConnector};

pub use controller::FeedController;
pub use session::{load_initial, FeedSession, PushHandling, SyncHandle};
pub use state::FeedState;

/// Collaborators shared by every session of a controller
#[derive(Clone)]
pub struct FeedServices {
    pub service: Arc<dyn NotificationService>,
    pub connector: Arc<dyn PushConnector>,
    pub endpoints: Endpoints,
    pub reconnect: ReconnectConfig,
}

impl FeedServices {
    /// Production wiring: REST over reqwest, push over tokio-tungstenite
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let endpoints = Endpoints::resolve(settings)?;
        let service = HttpNotificationService::new(endpoints.clone(), &settings.api)?;

        tracing::info!(
            api_base = %endpoints.api_base(),
            push_base = %endpoints.push_base(),
            "Notification endpoints resolved"
        );

        Ok(Self {
            service: Arc::new(service),
            connector: Arc::new(WsConnector::new()),
            endpoints,
            reconnect: settings.push.reconnect.clone(),
        })
    }
}
