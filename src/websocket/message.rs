use serde::Deserialize;

use crate::error::Result;
use crate::notification::Notification;

/// Control frames the server sends on the push channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Handshake sent once the channel is established
    #[serde(rename = "connected")]
    Connected,
}

/// Messages received on the push channel.
///
/// Both shapes carry a `type` field: control frames use reserved values,
/// notifications use their category. Control variants are tried first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PushMessage {
    Control(ControlMessage),
    Notification(Notification),
}

impl PushMessage {
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
