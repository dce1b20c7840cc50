/// Errors raised while building, marshaling or unmarshaling packets.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The parameter type tag is not `B`, `H`, `L` or `<N>s`.
    #[error("invalid parameter type '{0}'")]
    InvalidType(String),

    /// The value does not fit the declared parameter type.
    #[error("value does not fit parameter type {ty}: {reason}")]
    InvalidValue { ty: String, reason: String },

    /// A parameter's wire bytes do not match its declared type.
    #[error("malformed parameter: {0}")]
    MalformedParameter(String),

    /// A reply body ended before a field it must contain.
    #[error("truncated body: needed {needed} more bytes, {available} available")]
    TruncatedBody { needed: usize, available: usize },

    /// The reply carries a different number of parameters than were declared.
    #[error("unexpected number of return parameters: declared {declared}, received {received}")]
    ProtocolMismatch { declared: usize, received: usize },

    /// The register has no value or does not exist.
    #[error("unknown register '{0}'")]
    UnknownRegister(String),

    /// No parameter with this name was declared.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// The packet variant has no such slot, or the value kind does not fit it.
    #[error("slot '{slot}' cannot be used here: {reason}")]
    UnsupportedSlot { slot: String, reason: &'static str },

    /// A body field would overflow its 16-bit length or count.
    #[error("{what} too large ({size}, max {max})")]
    TooLarge {
        what: &'static str,
        size: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, PacketError>;
