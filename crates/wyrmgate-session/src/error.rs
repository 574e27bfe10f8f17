//! Error types for the session layer.

use wyrmgate_crypto::CryptoError;
use wyrmgate_protocol::{FramingError, ProtocolError};

use crate::LifecycleState;

/// Boxed error coming back from a [`Connection`](wyrmgate_transport::Connection).
pub type BoxedTransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while driving a client session.
///
/// Use [`is_fatal`](Self::is_fatal) to decide whether the connection must
/// be torn down. Fatal errors are never retried, and no error detail is
/// ever written to the peer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Inbound or outbound framing failed.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// Decryption or encryption failed, or the cipher was not seeded.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The underlying connection failed or a write timed out.
    #[error("transport error: {0}")]
    Transport(#[source] BoxedTransportError),

    /// An outbound packet could not be serialized.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The dispatcher reported a problem with an inbound packet.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The call is not allowed in the session's current state.
    #[error(transparent)]
    Violation(#[from] ProtocolViolation),
}

impl SessionError {
    pub(crate) fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// Returns `true` if this error must close the connection.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Framing(_) | Self::Crypto(_) | Self::Transport(_) => true,
            Self::Dispatch(e) => e.closes_connection(),
            Self::Protocol(_) | Self::Violation(_) => false,
        }
    }
}

/// A call that the session state machine does not permit.
///
/// Never propagated to the peer. `send` on a closing session does not even
/// produce one; it is dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("{operation} is not allowed while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// `set_account_name` was called while a name is already set.
    #[error("account name already set")]
    AccountAlreadySet,

    /// `set_active_char` was called while an actor is already bound.
    #[error("active character already bound")]
    CharAlreadyBound,
}

/// Errors returned by a [`Dispatcher`](crate::Dispatcher).
///
/// Only [`DispatchError::Close`] and fatal send failures close the
/// connection; everything else is logged and the session keeps running.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The payload could not be parsed.
    #[error("malformed packet: {0}")]
    Malformed(#[from] ProtocolError),

    /// The packet was understood but refused.
    #[error("packet rejected: {0}")]
    Rejected(String),

    /// The dispatcher wants the connection closed.
    #[error("dispatcher requested close: {0}")]
    Close(String),

    /// A reply could not be sent.
    #[error("reply failed: {0}")]
    Send(#[source] Box<SessionError>),
}

impl DispatchError {
    pub fn closes_connection(&self) -> bool {
        match self {
            Self::Close(_) => true,
            Self::Send(e) => e.is_fatal(),
            Self::Malformed(_) | Self::Rejected(_) => false,
        }
    }
}

impl From<SessionError> for DispatchError {
    fn from(err: SessionError) -> Self {
        Self::Send(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fatal_framing_and_crypto() {
        let framing = SessionError::from(FramingError::FrameTooLarge {
            declared: 40000,
            max: 32767,
        });
        assert!(framing.is_fatal());
        assert!(SessionError::from(CryptoError::NotSeeded).is_fatal());
    }

    #[test]
    fn test_is_fatal_violation_is_not() {
        let err = SessionError::from(ProtocolViolation::AccountAlreadySet);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_is_fatal_dispatch_depends_on_kind() {
        let rejected = SessionError::from(DispatchError::Rejected("no".into()));
        let close = SessionError::from(DispatchError::Close("bye".into()));
        assert!(!rejected.is_fatal());
        assert!(close.is_fatal());
    }

    #[test]
    fn test_dispatch_send_inherits_fatality() {
        let fatal: DispatchError = SessionError::from(CryptoError::Released).into();
        let benign: DispatchError =
            SessionError::from(ProtocolError::StringTooLong(70000)).into();
        assert!(fatal.closes_connection());
        assert!(!benign.closes_connection());
    }

    #[test]
    fn test_invalid_state_message_names_operation_and_state() {
        let err = ProtocolViolation::InvalidState {
            operation: "set_account_name",
            state: LifecycleState::Closing,
        };
        assert_eq!(
            err.to_string(),
            "set_account_name is not allowed while the session is closing"
        );
    }
}
