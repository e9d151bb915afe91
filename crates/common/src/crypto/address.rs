use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::bytes32::{decode_fixed, HexError};

/// Size of a ledger account identifier in bytes
pub const ADDRESS_SIZE: usize = 20;

/// A ledger account identifier
///
/// Vault owners and proof submitters are both identified by an `Address`.
/// The registry never learns anything else about a caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const ZERO: Address = Address([0; ADDRESS_SIZE]);

    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse an address from hex, with or without the `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        decode_fixed::<ADDRESS_SIZE>(s).map(Self)
    }
}

impl From<[u8; ADDRESS_SIZE]> for Address {
    fn from(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = HexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::new([0x5a; ADDRESS_SIZE]);
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
        assert_eq!(addr.to_hex().len(), 2 + ADDRESS_SIZE * 2);
    }

    #[test]
    fn test_address_rejects_digest_sized_hex() {
        assert!(Address::from_hex(&"11".repeat(32)).is_err());
    }
}
