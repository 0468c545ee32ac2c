mod backoff;
mod message;
mod transport;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use message::{ControlMessage, PushMessage};
pub use transport::{PushConnector, PushTransport, WsConnector, WsTransport};
