use std::sync::Arc;
use std::time::Duration;

use emurpc_frame::{FrameConfig, Integrity, Placeholder};

/// Source byte every request carries.
pub const DEFAULT_SOURCE: u8 = 1;

/// Packet-type byte every request carries.
pub const DEFAULT_PACKET_TYPE: u8 = 0;

/// Transaction id of the first call on a new session.
pub const INITIAL_TRANSACTION_ID: u8 = 1;

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Header source byte. Default: 1.
    pub source: u8,
    /// Header packet-type byte. Default: 0.
    pub packet_type: u8,
    /// Transaction id used for the first call. Default: 1.
    pub initial_transaction_id: u8,
    /// Footer checksum and reply verification. Default: [`Placeholder`].
    pub integrity: Arc<dyn Integrity>,
    /// Reply size limit and socket timeouts.
    pub frame: FrameConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE,
            packet_type: DEFAULT_PACKET_TYPE,
            initial_transaction_id: INITIAL_TRANSACTION_ID,
            integrity: Arc::new(Placeholder),
            frame: FrameConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_integrity(mut self, integrity: impl Integrity + 'static) -> Self {
        self.integrity = Arc::new(integrity);
        self
    }

    /// Apply the same timeout to socket reads and writes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.frame.read_timeout = timeout;
        self.frame.write_timeout = timeout;
        self
    }
}
