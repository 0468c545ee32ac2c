//! One user's live feed.
//!
//! A `FeedSession` is created when an identity becomes available and dropped
//! when it goes away. On start it spawns two independent tasks: the initial
//! fetch and the push channel. Either may finish first; the feed merge is
//! order-independent. Mutations update the feed synchronously and then hand
//! the remote call to a detached task whose result is only logged.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::auth::Identity;
use crate::config::ReconnectConfig;
use crate::error::Result;
use crate::metrics::{
    CHANNEL_RECONNECTS_TOTAL, INITIAL_LOAD_FAILURES_TOTAL, PUSH_MESSAGES_TOTAL, SESSIONS_ACTIVE,
    SYNC_FAILURES_TOTAL,
};
use crate::notification::{Notification, NotificationFeed, NotificationService, PushOutcome};
use crate::websocket::{BackoffConfig, ControlMessage, ExponentialBackoff, PushConnector, PushMessage};

use super::state::{FeedState, Progress};
use super::FeedServices;

/// Handle to a detached remote sync call
pub type SyncHandle = JoinHandle<()>;

/// How a single push payload was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushHandling {
    Inserted,
    Duplicate,
    Control,
    Malformed,
}

impl PushHandling {
    fn as_label(&self) -> &'static str {
        match self {
            PushHandling::Inserted => "inserted",
            PushHandling::Duplicate => "duplicate",
            PushHandling::Control => "control",
            PushHandling::Malformed => "malformed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SyncOp {
    MarkRead(i64),
    MarkAllRead,
    ClearAll,
}

impl SyncOp {
    fn name(&self) -> &'static str {
        match self {
            SyncOp::MarkRead(_) => "mark_read",
            SyncOp::MarkAllRead => "mark_all_read",
            SyncOp::ClearAll => "clear_all",
        }
    }
}

struct Shared {
    feed: watch::Sender<NotificationFeed>,
    progress: watch::Sender<Progress>,
    state: watch::Sender<FeedState>,
    service: Arc<dyn NotificationService>,
}

impl Shared {
    /// Progress writers serialize on the progress lock, so the derived
    /// state is published in the same order.
    fn update_progress(&self, user_id: &str, modify: impl FnOnce(&mut Progress)) {
        self.progress.send_modify(|progress| {
            modify(progress);
            let next = progress.state();
            self.state.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                tracing::info!(
                    user_id = %user_id,
                    from = current.as_str(),
                    to = next.as_str(),
                    "Feed state changed"
                );
                *current = next;
                true
            });
        });
    }
}

pub struct FeedSession {
    identity: Identity,
    shared: Arc<Shared>,
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl FeedSession {
    /// Start a session: kick off the initial fetch and open the push channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(identity: Identity, services: &FeedServices) -> Result<Self> {
        let push_url = services.endpoints.push_url(identity.token())?;

        let (feed, _) = watch::channel(NotificationFeed::new());
        let (progress, _) = watch::channel(Progress::default());
        let (state, _) = watch::channel(FeedState::Loading);
        let shared = Arc::new(Shared {
            feed,
            progress,
            state,
            service: services.service.clone(),
        });
        let (shutdown, _) = broadcast::channel(1);

        let loader = tokio::spawn(run_loader(
            shared.clone(),
            identity.clone(),
            shutdown.subscribe(),
        ));

        let channel = ChannelTask {
            shared: shared.clone(),
            connector: services.connector.clone(),
            url: push_url,
            reconnect: services.reconnect.clone(),
            user_id: identity.user_id().to_string(),
            shutdown: shutdown.subscribe(),
        };
        let channel = tokio::spawn(channel.run());

        SESSIONS_ACTIVE.inc();
        tracing::info!(user_id = %identity.user_id(), "Feed session started");

        Ok(Self {
            identity,
            shared,
            shutdown,
            tasks: vec![loader, channel],
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> FeedState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<FeedState> {
        self.shared.state.subscribe()
    }

    /// Receiver that observes every feed change; read-only
    pub fn subscribe(&self) -> watch::Receiver<NotificationFeed> {
        self.shared.feed.subscribe()
    }

    /// Snapshot of the feed, most recent push first
    pub fn notifications(&self) -> Vec<Notification> {
        self.shared.feed.borrow().as_slice().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        self.shared.feed.borrow().unread_count()
    }

    /// Handle one raw payload from the push channel
    pub fn on_push(&self, raw: &str) -> PushHandling {
        apply_push(&self.shared.feed, raw)
    }

    pub fn mark_read(&self, id: i64) -> SyncHandle {
        let changed = self.shared.feed.send_if_modified(|feed| feed.mark_read(id));
        tracing::debug!(notification_id = id, changed, "Marked notification read");
        self.spawn_sync(SyncOp::MarkRead(id))
    }

    pub fn mark_all_read(&self) -> SyncHandle {
        let mut flipped = 0;
        self.shared.feed.send_if_modified(|feed| {
            flipped = feed.mark_all_read();
            flipped > 0
        });
        tracing::debug!(flipped, "Marked all notifications read");
        self.spawn_sync(SyncOp::MarkAllRead)
    }

    pub fn clear_all(&self) -> SyncHandle {
        let mut removed = 0;
        self.shared.feed.send_if_modified(|feed| {
            removed = feed.clear();
            removed > 0
        });
        tracing::debug!(removed, "Cleared notifications");
        self.spawn_sync(SyncOp::ClearAll)
    }

    /// Stop both tasks and wait for the push channel to be closed
    pub async fn close(mut self) {
        let _ = self.shutdown.send(());
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Feed session task ended abnormally");
            }
        }
    }

    fn spawn_sync(&self, op: SyncOp) -> SyncHandle {
        let service = self.shared.service.clone();
        let identity = self.identity.clone();

        tokio::spawn(async move {
            let result = match op {
                SyncOp::MarkRead(id) => service.mark_read(&identity, id).await,
                SyncOp::MarkAllRead => service.mark_all_read(&identity).await,
                SyncOp::ClearAll => service.clear_all(&identity).await,
            };

            if let Err(e) = result {
                SYNC_FAILURES_TOTAL.with_label_values(&[op.name()]).inc();
                tracing::warn!(
                    user_id = %identity.user_id(),
                    operation = op.name(),
                    error = %e,
                    error_kind = e.code(),
                    "Remote sync failed, local state kept"
                );
            }
        })
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        // No receivers left is fine; the sender is dropped right after anyway
        let _ = self.shutdown.send(());
        SESSIONS_ACTIVE.dec();
        tracing::info!(user_id = %self.identity.user_id(), "Feed session ended");
    }
}

/// Fetch the current notifications; any failure yields an empty list
pub async fn load_initial(service: &dyn NotificationService, identity: &Identity) -> Vec<Notification> {
    match service.list(identity).await {
        Ok(notifications) => notifications,
        Err(e) => {
            INITIAL_LOAD_FAILURES_TOTAL.inc();
            tracing::warn!(
                user_id = %identity.user_id(),
                error = %e,
                error_kind = e.code(),
                "Initial notification fetch failed, starting with an empty feed"
            );
            Vec::new()
        }
    }
}

fn apply_push(feed: &watch::Sender<NotificationFeed>, raw: &str) -> PushHandling {
    let handling = match PushMessage::decode(raw) {
        Ok(PushMessage::Control(ControlMessage::Connected)) => {
            tracing::trace!("Push channel handshake received");
            PushHandling::Control
        }
        Ok(PushMessage::Notification(notification)) => {
            let id = notification.id;
            let inserted =
                feed.send_if_modified(|feed| feed.push(notification) == PushOutcome::Inserted);
            tracing::debug!(notification_id = id, inserted, "Push received");
            if inserted {
                PushHandling::Inserted
            } else {
                PushHandling::Duplicate
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, error_kind = e.code(), "Discarding malformed push message");
            PushHandling::Malformed
        }
    };

    PUSH_MESSAGES_TOTAL
        .with_label_values(&[handling.as_label()])
        .inc();
    handling
}

async fn run_loader(shared: Arc<Shared>, identity: Identity, mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        _ = shutdown.recv() => {
            tracing::debug!(user_id = %identity.user_id(), "Initial fetch cancelled");
        }
        fetched = load_initial(&*shared.service, &identity) => {
            let count = fetched.len();
            shared.feed.send_modify(|feed| feed.merge_initial(fetched));
            shared.update_progress(identity.user_id(), |p| p.fetched = true);
            tracing::info!(user_id = %identity.user_id(), count, "Initial notifications loaded");
        }
    }
}

enum ChannelExit {
    Shutdown,
    Dropped,
}

struct ChannelTask {
    shared: Arc<Shared>,
    connector: Arc<dyn PushConnector>,
    url: Url,
    reconnect: ReconnectConfig,
    user_id: String,
    shutdown: broadcast::Receiver<()>,
}

impl ChannelTask {
    async fn run(mut self) {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig::from(&self.reconnect));

        loop {
            if let ChannelExit::Shutdown = self.connect_and_pump(&mut backoff).await {
                break;
            }

            if !self.reconnect.enabled || backoff.attempt() >= self.reconnect.max_attempts {
                break;
            }

            let delay = backoff.next_delay();
            CHANNEL_RECONNECTS_TOTAL.inc();
            self.shared.update_progress(&self.user_id, |p| {
                p.channel_open = false;
                p.reconnecting = true;
            });
            tracing::info!(
                user_id = %self.user_id,
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Reopening push channel"
            );

            tokio::select! {
                _ = self.shutdown.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.shared.update_progress(&self.user_id, |p| {
            p.channel_open = false;
            p.reconnecting = false;
            p.closed = true;
        });
    }

    async fn connect_and_pump(&mut self, backoff: &mut ExponentialBackoff) -> ChannelExit {
        let mut transport = tokio::select! {
            _ = self.shutdown.recv() => return ChannelExit::Shutdown,
            result = self.connector.connect(&self.url) => match result {
                Ok(transport) => transport,
                Err(e) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        error = %e,
                        error_kind = e.code(),
                        "Failed to open push channel"
                    );
                    return ChannelExit::Dropped;
                }
            },
        };

        backoff.reset();
        self.shared.update_progress(&self.user_id, |p| {
            p.channel_open = true;
            p.reconnecting = false;
        });
        tracing::info!(user_id = %self.user_id, "Push channel open");

        let exit = loop {
            tokio::select! {
                _ = self.shutdown.recv() => break ChannelExit::Shutdown,
                frame = transport.recv() => match frame {
                    Some(Ok(raw)) => {
                        apply_push(&self.shared.feed, &raw);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(
                            user_id = %self.user_id,
                            error = %e,
                            error_kind = e.code(),
                            "Push channel error, closing"
                        );
                        break ChannelExit::Dropped;
                    }
                    None => {
                        tracing::info!(user_id = %self.user_id, "Push channel closed");
                        break ChannelExit::Dropped;
                    }
                },
            }
        };

        transport.close().await;
        exit
    }
}
