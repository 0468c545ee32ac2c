use std::fmt;

/// Authenticated user context gating every per-user feed operation
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject (user ID)
    user_id: String,
    /// Bearer credential, used for REST calls and the push channel URL
    token: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keep the credential out of logs
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}
