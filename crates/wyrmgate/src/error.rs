//! Unified error type for the Wyrmgate server.

use wyrmgate_crypto::CryptoError;
use wyrmgate_protocol::{FramingError, ProtocolError};
use wyrmgate_session::SessionError;
use wyrmgate_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WyrmgateError {
    /// Binding, accepting, reading or writing failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An inbound frame declared an illegal length.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// A packet could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Keys could not be produced or applied.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let wyrm_err: WyrmgateError = err.into();
        assert!(matches!(wyrm_err, WyrmgateError::Transport(_)));
        assert!(wyrm_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_framing_error() {
        let err = FramingError::FrameTooLarge {
            declared: 40000,
            max: 32767,
        };
        let wyrm_err: WyrmgateError = err.into();
        assert!(matches!(wyrm_err, WyrmgateError::Framing(_)));
    }

    #[test]
    fn test_from_crypto_error() {
        let wyrm_err: WyrmgateError = CryptoError::NotSeeded.into();
        assert!(matches!(wyrm_err, WyrmgateError::Crypto(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::from(CryptoError::Released);
        let wyrm_err: WyrmgateError = err.into();
        assert!(matches!(wyrm_err, WyrmgateError::Session(_)));
    }

    #[test]
    fn test_from_config_error() {
        let wyrm_err: WyrmgateError = ConfigError::Invalid("bad".into()).into();
        assert!(matches!(wyrm_err, WyrmgateError::Config(_)));
        assert!(wyrm_err.to_string().contains("bad"));
    }
}
