//! JSON-encoded packets via `serde_json`.
//!
//! Handy for tooling, admin channels and tests where a human-readable body
//! beats compactness. Behind the `json` feature flag (enabled by default).

use bytes::Bytes;
use serde::Serialize;

use crate::{ProtocolError, SendablePacket};

/// Wraps any `Serialize` value so it can be handed to a session's `send`.
///
/// ```rust
/// use wyrmgate_protocol::{JsonPacket, SendablePacket};
///
/// #[derive(serde::Serialize)]
/// struct Chat { text: String }
///
/// let packet = JsonPacket(Chat { text: "hi".into() });
/// assert_eq!(packet.serialize().unwrap().as_ref(), br#"{"text":"hi"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct JsonPacket<T>(pub T);

impl<T: Serialize + Send + Sync> SendablePacket for JsonPacket<T> {
    fn serialize(&self) -> Result<Bytes, ProtocolError> {
        serde_json::to_vec(&self.0)
            .map(Bytes::from)
            .map_err(ProtocolError::Encode)
    }
}
