use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Trap names the convenience calls look up.
pub mod names {
    pub const MEM_PTR_NEW: &str = "sysTrapMemPtrNew";
    pub const SYS_TICKS_PER_SECOND: &str = "sysTrapSysTicksPerSecond";
    pub const DM_NUM_DATABASES: &str = "sysTrapDmNumDatabases";
    pub const DM_GET_DATABASE: &str = "sysTrapDmGetDatabase";
    pub const DM_FIND_DATABASE: &str = "sysTrapDmFindDatabase";
    pub const DM_DATABASE_INFO: &str = "sysTrapDmDatabaseInfo";
    pub const DM_GET_LAST_ERR: &str = "sysTrapDmGetLastErr";
    pub const EVT_ENQUEUE_KEY: &str = "sysTrapEvtEnqueueKey";
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TrapEntry {
    Number(u64),
    Text(String),
}

/// Catalog mapping symbolic trap names to trap numbers.
///
/// Loaded from a JSON object whose values are integers or `"0x…"` hex
/// strings:
///
/// ```json
/// { "sysTrapMemPtrNew": "0xA013", "sysTrapSysTicksPerSecond": 41705 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrapTable {
    traps: BTreeMap<String, u16>,
}

impl TrapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON trap catalog.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, TrapEntry> = serde_json::from_str(json)?;
        let mut traps = BTreeMap::new();
        for (name, entry) in raw {
            let number = match &entry {
                TrapEntry::Number(n) => u16::try_from(*n).ok(),
                TrapEntry::Text(text) => parse_trap_number(text),
            };
            let number = number.ok_or_else(|| SessionError::InvalidTrap {
                name: name.clone(),
                value: match entry {
                    TrapEntry::Number(n) => n.to_string(),
                    TrapEntry::Text(text) => text,
                },
            })?;
            traps.insert(name, number);
        }
        Ok(Self { traps })
    }

    /// Read and parse a JSON trap catalog from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SessionError::TrapFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn insert(&mut self, name: impl Into<String>, trap: u16) -> &mut Self {
        self.traps.insert(name.into(), trap);
        self
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.traps.get(name).copied()
    }

    /// Look up a trap, failing with [`SessionError::UnknownTrap`].
    pub fn resolve(&self, name: &str) -> Result<u16> {
        self.get(name)
            .ok_or_else(|| SessionError::UnknownTrap(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    /// Entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.traps.iter().map(|(name, trap)| (name.as_str(), *trap))
    }
}

/// Parse a trap number written as decimal or `0x` hex.
pub fn parse_trap_number(text: &str) -> Option<u16> {
    let text = text.trim();
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
