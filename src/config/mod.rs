mod endpoints;
mod settings;

pub use endpoints::{Endpoints, PUSH_CHANNEL_PATH};
pub use settings::{ApiConfig, AppConfig, PushConfig, ReconnectConfig, SessionConfig, Settings};
