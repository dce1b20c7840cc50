use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{PacketError, Result};

/// Declared type of a trap parameter.
///
/// The textual tags are the struct-format letters the emulator's scripting
/// clients have always used: `B`, `H`, `L` for 8/16/32-bit integers and
/// `<N>s` for an `N`-byte fixed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    U8,
    U16,
    U32,
    FixedString(u8),
}

impl ParamType {
    /// Encoded value size in bytes.
    pub fn size(self) -> u8 {
        match self {
            ParamType::U8 => 1,
            ParamType::U16 => 2,
            ParamType::U32 => 4,
            ParamType::FixedString(n) => n,
        }
    }

    fn max_int(self) -> Option<u32> {
        match self {
            ParamType::U8 => Some(u32::from(u8::MAX)),
            ParamType::U16 => Some(u32::from(u16::MAX)),
            ParamType::U32 => Some(u32::MAX),
            ParamType::FixedString(_) => None,
        }
    }
}

impl FromStr for ParamType {
    type Err = PacketError;

    fn from_str(tag: &str) -> Result<Self> {
        let invalid = || PacketError::InvalidType(tag.to_string());
        let last = tag.chars().last().ok_or_else(invalid)?;
        let prefix = &tag[..tag.len() - last.len_utf8()];

        match last.to_ascii_uppercase() {
            'B' if prefix.is_empty() => Ok(ParamType::U8),
            'H' if prefix.is_empty() => Ok(ParamType::U16),
            'L' if prefix.is_empty() => Ok(ParamType::U32),
            'S' => {
                if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                prefix
                    .parse::<u8>()
                    .map(ParamType::FixedString)
                    .map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::U8 => f.write_str("B"),
            ParamType::U16 => f.write_str("H"),
            ParamType::U32 => f.write_str("L"),
            ParamType::FixedString(n) => write!(f, "{n}s"),
        }
    }
}

/// A decoded parameter, register or scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(u32),
    Bytes(Bytes),
}

impl Value {
    /// Integer value, if this is one.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bytes(_) => None,
        }
    }

    /// Raw bytes, if this is a string value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Int(_) => None,
            Value::Bytes(b) => Some(b.as_ref()),
        }
    }

    /// String value up to the first NUL, decoded lossily.
    pub fn to_string_lossy(&self) -> Option<String> {
        self.as_bytes().map(|bytes| {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bytes(_) => write!(f, "{:?}", self.to_string_lossy().unwrap_or_default()),
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(u32::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(u32::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Bytes(Bytes::from(v.into_bytes()))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

/// One typed trap parameter.
///
/// Wire format: `byref (1) ‖ size (1) ‖ value (size bytes)`, integers
/// big-endian, strings NUL-padded or truncated to the declared length.
/// A by-reference parameter is written back by the emulator; its value is
/// replaced when the reply is unmarshaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcParam {
    byref: bool,
    ty: ParamType,
    size: u8,
    value: Value,
}

impl RpcParam {
    /// Create a parameter from a textual type tag such as `"L"` or `"32s"`.
    pub fn new(byref: bool, tag: &str, value: impl Into<Value>) -> Result<Self> {
        Self::typed(byref, tag.parse()?, value)
    }

    /// Create a parameter from an already parsed type.
    pub fn typed(byref: bool, ty: ParamType, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        check_value(ty, &value)?;
        Ok(Self {
            byref,
            ty,
            size: ty.size(),
            value,
        })
    }

    /// By-value 8-bit integer.
    pub fn u8(value: u8) -> Self {
        Self::int(ParamType::U8, u32::from(value))
    }

    /// By-value 16-bit integer.
    pub fn u16(value: u16) -> Self {
        Self::int(ParamType::U16, u32::from(value))
    }

    /// By-value 32-bit integer.
    pub fn u32(value: u32) -> Self {
        Self::int(ParamType::U32, value)
    }

    fn int(ty: ParamType, value: u32) -> Self {
        Self {
            byref: false,
            ty,
            size: ty.size(),
            value: Value::Int(value),
        }
    }

    /// Mark the parameter as passed by reference.
    pub fn by_ref(mut self) -> Self {
        self.byref = true;
        self
    }

    pub fn is_byref(&self) -> bool {
        self.byref
    }

    pub fn param_type(&self) -> ParamType {
        self.ty
    }

    /// Value size in bytes as carried in the size byte.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Current value: the initial one, or the one decoded from the last reply.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Bytes this parameter occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        2 + usize::from(self.size)
    }

    /// Append `byref ‖ size ‖ value` to `dst`.
    pub fn marshal(&self, dst: &mut BytesMut) {
        dst.put_u8(u8::from(self.byref));
        dst.put_u8(self.size);
        match (&self.value, self.ty) {
            (Value::Int(v), ParamType::U8) => dst.put_u8(*v as u8),
            (Value::Int(v), ParamType::U16) => dst.put_u16(*v as u16),
            (Value::Int(v), ParamType::U32) => dst.put_u32(*v),
            (Value::Bytes(b), ParamType::FixedString(n)) => {
                let n = usize::from(n);
                let take = b.len().min(n);
                dst.put_slice(&b[..take]);
                dst.put_bytes(0, n - take);
            }
            // Construction rejects mismatched kinds.
            _ => dst.put_bytes(0, usize::from(self.size)),
        }
    }

    /// Replace byref flag and value from reply bytes.
    ///
    /// The value is decoded with the declared type; the wire size byte must
    /// agree with it.
    pub fn unmarshal(&mut self, src: &[u8]) -> Result<()> {
        if src.len() < 2 {
            return Err(PacketError::MalformedParameter(format!(
                "{} bytes available, parameter header needs 2",
                src.len()
            )));
        }
        let wire_size = src[1];
        if wire_size != self.size {
            return Err(PacketError::MalformedParameter(format!(
                "wire size {wire_size} does not match declared type {} ({} bytes)",
                self.ty, self.size
            )));
        }
        let data = &src[2..];
        let size = usize::from(self.size);
        if data.len() < size {
            return Err(PacketError::MalformedParameter(format!(
                "type {} needs {size} bytes, {} available",
                self.ty,
                data.len()
            )));
        }

        let data = &data[..size];
        self.value = match self.ty {
            ParamType::U8 => Value::Int(u32::from(data[0])),
            ParamType::U16 => Value::Int(u32::from(u16::from_be_bytes([data[0], data[1]]))),
            ParamType::U32 => Value::Int(u32::from_be_bytes([data[0], data[1], data[2], data[3]])),
            ParamType::FixedString(_) => Value::Bytes(Bytes::copy_from_slice(data)),
        };
        self.byref = src[0] != 0;
        Ok(())
    }
}

impl fmt::Display for RpcParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<param byref={} type={} size={} value={}>",
            u8::from(self.byref),
            self.ty,
            self.size,
            self.value
        )
    }
}

fn check_value(ty: ParamType, value: &Value) -> Result<()> {
    let invalid = |reason: String| PacketError::InvalidValue {
        ty: ty.to_string(),
        reason,
    };
    match (ty.max_int(), value) {
        (Some(max), Value::Int(v)) if *v > max => Err(invalid(format!("{v} exceeds {max}"))),
        (Some(_), Value::Int(_)) => Ok(()),
        (Some(_), Value::Bytes(_)) => Err(invalid("expected an integer".to_string())),
        (None, Value::Bytes(_)) => Ok(()),
        (None, Value::Int(_)) => Err(invalid("expected a string".to_string())),
    }
}
