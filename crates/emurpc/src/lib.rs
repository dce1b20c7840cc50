//! Client for the Palm OS Emulator debugger RPC protocol.
//!
//! emurpc talks to a running emulator over TCP: read and write emulated
//! memory, and call OS traps with typed, by-value or by-reference
//! parameters.
//!
//! # Crate Structure
//!
//! - [`transport`] — TCP connection to the emulator's debugger port
//! - [`frame`] — Header/body/footer framing and integrity strategies
//! - [`packet`] — Typed parameters and the memory and RPC packet variants
//! - [`session`] — Blocking call sessions, trap catalog and convenience
//!   calls (behind the `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use emurpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use emurpc_frame::*;
}

/// Re-export packet types.
pub mod packet {
    pub use emurpc_packet::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use emurpc_session::*;
}
