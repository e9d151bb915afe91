use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::{Commitment, Leaf};

/// Where the ciphertext for an entry is pinned
///
/// Serialized as its on-chain `u8` value; the lowercase name is only used on
/// the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum StorageProvider {
    #[default]
    Storacha = 0,
    Pinata = 1,
    Ipfs = 2,
    Other = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storage provider: {0}")]
pub struct UnknownProvider(pub String);

impl TryFrom<u8> for StorageProvider {
    type Error = UnknownProvider;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Storacha),
            1 => Ok(Self::Pinata),
            2 => Ok(Self::Ipfs),
            3 => Ok(Self::Other),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

impl From<StorageProvider> for u8 {
    fn from(provider: StorageProvider) -> Self {
        provider as u8
    }
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Storacha => "storacha",
            Self::Pinata => "pinata",
            Self::Ipfs => "ipfs",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "storacha" => Ok(Self::Storacha),
            "pinata" => Ok(Self::Pinata),
            "ipfs" => Ok(Self::Ipfs),
            "other" => Ok(Self::Other),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// One content reference inside a vault, as recorded by the registry
///
/// `index` is assigned by the registry and never reused. Removing an entry
/// only clears `active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub index: u64,
    pub tag: String,
    pub cid: String,
    pub provider: StorageProvider,
    /// Ledger timestamp of the write, unix seconds
    pub created_at: i64,
    pub leaf: Leaf,
    pub commitment: Commitment,
    pub active: bool,
}

impl Entry {
    pub fn is_active(&self) -> bool {
        self.active
    }
}
