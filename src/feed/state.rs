/// Lifecycle of the feed for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedState {
    /// No identity, or the push channel is gone for good
    Disconnected,
    /// Identity present; initial fetch or channel open still pending
    Loading,
    /// Initial fetch done and push channel open
    Live,
    /// Push channel dropped; waiting to reopen it
    Reconnecting,
}

impl FeedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedState::Disconnected => "disconnected",
            FeedState::Loading => "loading",
            FeedState::Live => "live",
            FeedState::Reconnecting => "reconnecting",
        }
    }
}

/// Raw session milestones the public state is derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Progress {
    pub fetched: bool,
    pub channel_open: bool,
    pub reconnecting: bool,
    pub closed: bool,
}

impl Progress {
    pub fn state(&self) -> FeedState {
        if self.closed {
            FeedState::Disconnected
        } else if self.reconnecting {
            FeedState::Reconnecting
        } else if self.fetched && self.channel_open {
            FeedState::Live
        } else {
            FeedState::Loading
        }
    }
}
