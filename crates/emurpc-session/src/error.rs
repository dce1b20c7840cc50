use std::path::PathBuf;

use emurpc_frame::FrameError;
use emurpc_packet::PacketError;
use emurpc_transport::TransportError;
use serde::Serialize;

/// Errors that can occur while talking to the emulator.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Packet marshaling or reply decoding error.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// An earlier call failed after its request went out.
    #[error("session unusable after earlier failure: {0}")]
    Poisoned(String),

    /// The reply did not arrive in time.
    #[error("call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The trap table has no entry for this name.
    #[error("unknown trap '{0}'")]
    UnknownTrap(String),

    /// A trap table entry is neither a 16-bit integer nor a `0x` hex string.
    #[error("invalid trap number for '{name}': {value}")]
    InvalidTrap { name: String, value: String },

    /// The trap table file could not be read.
    #[error("failed to read trap table {path}: {source}")]
    TrapFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Coarse classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection loss, short read or write, timeout. The session is unusable.
    TransportFailure,
    /// The reply does not match the request.
    ProtocolMismatch,
    InvalidType,
    InvalidValue,
    MalformedParameter,
    TruncatedBody,
    UnknownRegister,
    UnknownParameter,
    /// Caller-side mistake: bad slot, oversized request, missing trap.
    Usage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::ProtocolMismatch => "protocol_mismatch",
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::MalformedParameter => "malformed_parameter",
            ErrorKind::TruncatedBody => "truncated_body",
            ErrorKind::UnknownRegister => "unknown_register",
            ErrorKind::UnknownParameter => "unknown_parameter",
            ErrorKind::Usage => "usage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Transport(_) | SessionError::Poisoned(_) | SessionError::Timeout(_) => {
                ErrorKind::TransportFailure
            }
            SessionError::Frame(err) => match err {
                FrameError::ShortRead { .. } | FrameError::Io(_) | FrameError::ConnectionClosed => {
                    ErrorKind::TransportFailure
                }
                FrameError::InvalidSignature { .. }
                | FrameError::HeaderChecksum { .. }
                | FrameError::BodyChecksum { .. }
                | FrameError::LengthMismatch { .. }
                | FrameError::ReplyTooLarge { .. } => ErrorKind::ProtocolMismatch,
                FrameError::BodyTooLarge { .. } => ErrorKind::Usage,
            },
            SessionError::Packet(err) => match err {
                PacketError::InvalidType(_) => ErrorKind::InvalidType,
                PacketError::InvalidValue { .. } => ErrorKind::InvalidValue,
                PacketError::MalformedParameter(_) => ErrorKind::MalformedParameter,
                PacketError::TruncatedBody { .. } => ErrorKind::TruncatedBody,
                PacketError::ProtocolMismatch { .. } => ErrorKind::ProtocolMismatch,
                PacketError::UnknownRegister(_) => ErrorKind::UnknownRegister,
                PacketError::UnknownParameter(_) => ErrorKind::UnknownParameter,
                PacketError::UnsupportedSlot { .. } | PacketError::TooLarge { .. } => {
                    ErrorKind::Usage
                }
            },
            SessionError::UnknownTrap(_)
            | SessionError::InvalidTrap { .. }
            | SessionError::TrapFile { .. }
            | SessionError::Json(_) => ErrorKind::Usage,
        }
    }

    /// Whether this error leaves the connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TransportFailure | ErrorKind::ProtocolMismatch
        )
    }
}
