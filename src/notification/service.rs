//! Remote notification service abstraction.
//!
//! The feed only needs four request/response operations from the server.
//! `HttpNotificationService` is the production implementation; tests plug
//! in their own recorders behind the same trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};

use crate::auth::Identity;
use crate::config::{ApiConfig, Endpoints};
use crate::error::Result;

use super::Notification;

/// Operations the feed delegates to the notification service
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Current notifications for the identity, in server order
    async fn list(&self, identity: &Identity) -> Result<Vec<Notification>>;

    async fn mark_read(&self, identity: &Identity, id: i64) -> Result<()>;

    async fn mark_all_read(&self, identity: &Identity) -> Result<()>;

    async fn clear_all(&self, identity: &Identity) -> Result<()>;
}

/// REST client for the notification service
pub struct HttpNotificationService {
    client: Client,
    endpoints: Endpoints,
}

impl HttpNotificationService {
    pub fn new(endpoints: Endpoints, config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, endpoints))
    }

    pub fn with_client(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    fn request(&self, method: Method, path: &str, identity: &Identity) -> Result<RequestBuilder> {
        let url = self.endpoints.api_url(path)?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(identity.token()))
    }

    async fn send(&self, method: Method, path: &str, identity: &Identity) -> Result<()> {
        self.request(method, path, identity)?
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    #[tracing::instrument(name = "notifications.list", skip_all, fields(user_id = %identity.user_id()))]
    async fn list(&self, identity: &Identity) -> Result<Vec<Notification>> {
        let notifications = self
            .request(Method::GET, "/notifications", identity)?
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Notification>>()
            .await?;

        tracing::debug!(count = notifications.len(), "Fetched notifications");
        Ok(notifications)
    }

    async fn mark_read(&self, identity: &Identity, id: i64) -> Result<()> {
        self.send(Method::PATCH, &format!("/notifications/{}/read", id), identity)
            .await
    }

    async fn mark_all_read(&self, identity: &Identity) -> Result<()> {
        self.send(Method::PATCH, "/notifications/read-all", identity)
            .await
    }

    async fn clear_all(&self, identity: &Identity) -> Result<()> {
        self.send(Method::DELETE, "/notifications", identity).await
    }
}
