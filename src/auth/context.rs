use tokio::sync::watch;

use super::Identity;

/// Holder of the current identity.
///
/// Login and logout publish through a watch channel so the feed controller
/// can follow identity changes without polling.
#[derive(Debug)]
pub struct AuthContext {
    current: watch::Sender<Option<Identity>>,
}

impl AuthContext {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    pub fn login(&self, identity: Identity) {
        tracing::info!(user_id = %identity.user_id(), "Identity available");
        self.current.send_replace(Some(identity));
    }

    pub fn logout(&self) {
        if let Some(previous) = self.current.send_replace(None) {
            tracing::info!(user_id = %previous.user_id(), "Identity cleared");
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}
