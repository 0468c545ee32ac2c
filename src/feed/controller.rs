use tokio::sync::{broadcast, watch};

use crate::auth::Identity;
use crate::config::Settings;
use crate::error::Result;
use crate::notification::{Notification, NotificationFeed};

use super::session::{FeedSession, SyncHandle};
use super::state::FeedState;
use super::FeedServices;

/// Owns at most one `FeedSession` and follows identity changes.
///
/// Every mutation is a no-op without an identity: nothing changes locally
/// and no remote call is made.
pub struct FeedController {
    services: FeedServices,
    session: Option<FeedSession>,
}

impl FeedController {
    pub fn new(services: FeedServices) -> Self {
        Self {
            services,
            session: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(FeedServices::from_settings(settings)?))
    }

    /// Apply an identity change.
    ///
    /// A different identity (or none) discards the current session and its
    /// feed; a new identity starts a fresh one.
    pub fn set_identity(&mut self, identity: Option<Identity>) {
        if let (Some(current), Some(next)) = (&self.session, &identity) {
            if current.identity() == next {
                return;
            }
        }

        // Dropping the session releases its push channel
        self.session = None;

        if let Some(identity) = identity {
            match FeedSession::start(identity, &self.services) {
                Ok(session) => self.session = Some(session),
                Err(e) => {
                    tracing::warn!(error = %e, error_kind = e.code(), "Could not start feed session");
                }
            }
        }
    }

    /// Follow an identity source until `shutdown` fires, then close the
    /// active session.
    pub async fn follow(
        &mut self,
        mut identities: watch::Receiver<Option<Identity>>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let initial = identities.borrow_and_update().clone();
        self.set_identity(initial);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Feed controller received shutdown signal");
                    break;
                }
                changed = identities.changed() => {
                    if changed.is_err() {
                        tracing::info!("Identity source closed");
                        self.set_identity(None);
                        break;
                    }
                    let next = identities.borrow_and_update().clone();
                    self.set_identity(next);
                }
            }
        }

        self.shutdown().await;
    }

    /// Close the active session and wait for its channel to be released
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }

    pub fn session(&self) -> Option<&FeedSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> FeedState {
        self.session
            .as_ref()
            .map(FeedSession::state)
            .unwrap_or(FeedState::Disconnected)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.session
            .as_ref()
            .map(FeedSession::notifications)
            .unwrap_or_default()
    }

    pub fn unread_count(&self) -> usize {
        self.session
            .as_ref()
            .map(FeedSession::unread_count)
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> Option<watch::Receiver<NotificationFeed>> {
        self.session.as_ref().map(FeedSession::subscribe)
    }

    pub fn mark_read(&self, id: i64) -> Option<SyncHandle> {
        self.session.as_ref().map(|s| s.mark_read(id))
    }

    pub fn mark_all_read(&self) -> Option<SyncHandle> {
        self.session.as_ref().map(FeedSession::mark_all_read)
    }

    pub fn clear_all(&self) -> Option<SyncHandle> {
        self.session.as_ref().map(FeedSession::clear_all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::feed::test_support::{note_json, FakeConnector, RecordingService, SyncCall};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn wait_live(controller: &FeedController) {
        let mut rx = controller.session().expect("session").watch_state();
        timeout(Duration::from_secs(2), rx.wait_for(|s| *s == FeedState::Live))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_identity_mutations_are_noops() {
        let service = RecordingService::with_initial(vec![Notification::new(1, "A", "")]);
        let connector = FakeConnector::new();
        let controller =
            FeedController::new(FeedServices::for_tests(service.clone(), connector.clone()));

        assert!(controller.mark_read(1).is_none());
        assert!(controller.mark_all_read().is_none());
        assert!(controller.clear_all().is_none());

        assert_eq!(controller.state(), FeedState::Disconnected);
        assert!(controller.notifications().is_empty());
        assert_eq!(controller.unread_count(), 0);
        assert!(controller.subscribe().is_none());
        assert!(service.calls().is_empty());
        assert_eq!(connector.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_identity_drives_session_lifecycle() {
        let service = RecordingService::with_initial(vec![Notification::new(1, "A", "")]);
        let connector = FakeConnector::new();
        let mut controller =
            FeedController::new(FeedServices::for_tests(service.clone(), connector.clone()));

        controller.set_identity(Some(Identity::new("coordinator-7", "tok-a")));
        wait_live(&controller).await;
        assert_eq!(controller.unread_count(), 1);

        // Same identity again keeps the session
        controller.set_identity(Some(Identity::new("coordinator-7", "tok-a")));
        assert_eq!(connector.connect_attempts(), 1);

        controller.set_identity(None);
        assert_eq!(controller.state(), FeedState::Disconnected);
        assert!(controller.notifications().is_empty());
        assert!(controller.mark_all_read().is_none());
    }

    #[tokio::test]
    async fn test_identity_change_discards_feed() {
        let service = RecordingService::empty();
        let connector = FakeConnector::new();
        let mut controller =
            FeedController::new(FeedServices::for_tests(service.clone(), connector.clone()));

        controller.set_identity(Some(Identity::new("candidate-1", "tok-1")));
        wait_live(&controller).await;
        controller
            .session()
            .unwrap()
            .on_push(&note_json(11, "application received", false));
        assert_eq!(controller.notifications().len(), 1);

        controller.set_identity(Some(Identity::new("admin-2", "tok-2")));
        assert!(controller.notifications().is_empty());
        assert_eq!(controller.session().unwrap().identity().user_id(), "admin-2");
        wait_live(&controller).await;
        assert!(connector.last_url().unwrap().as_str().ends_with("token=tok-2"));
    }

    #[tokio::test]
    async fn test_mutations_with_identity() {
        let service = RecordingService::with_initial(vec![
            Notification::new(1, "A", ""),
            Notification::new(2, "B", "").with_read(true),
        ]);
        let mut controller =
            FeedController::new(FeedServices::for_tests(service.clone(), FakeConnector::new()));
        controller.set_identity(Some(Identity::new("volunteer-3", "tok")));
        wait_live(&controller).await;

        controller.mark_read(1).unwrap().await.unwrap();
        assert_eq!(controller.unread_count(), 0);

        controller.clear_all().unwrap().await.unwrap();
        assert!(controller.notifications().is_empty());
        assert_eq!(
            service.calls(),
            vec![SyncCall::List, SyncCall::MarkRead(1), SyncCall::ClearAll]
        );
    }

    #[tokio::test]
    async fn test_follow_auth_context() {
        let service = RecordingService::empty();
        let connector = FakeConnector::new();
        let mut controller =
            FeedController::new(FeedServices::for_tests(service, connector.clone()));

        let auth = AuthContext::new();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let identities = auth.subscribe();

        let driver = async {
            auth.login(Identity::new("volunteer-9", "tok"));
            timeout(Duration::from_secs(2), async {
                while connector.connect_attempts() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .unwrap();
            auth.logout();
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = shutdown_tx.send(());
        };

        let ((), ()) = tokio::join!(controller.follow(identities, shutdown_rx), driver);
        assert_eq!(controller.state(), FeedState::Disconnected);
        assert!(controller.session().is_none());
    }
}
