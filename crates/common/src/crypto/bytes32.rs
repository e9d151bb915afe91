//! Fixed-width 32-byte values
//!
//! Every digest that crosses a boundary in the protocol (vault ids, leaves,
//! commitments, nullifiers, Merkle nodes) is a 32-byte value. On the wire and
//! in manifests they are written as `0x`-prefixed lowercase hex.
//!
//! [`Bytes32`] is the untyped value used inside the Merkle tree. The
//! [`define_bytes32!`] newtypes give each protocol value its own type so a
//! nullifier can never be passed where a vault id is expected.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Size of every digest in bytes
pub const BYTES32_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HexError {
    #[error("invalid hex length, expected {expected} hex characters, got {got}")]
    Length { expected: usize, got: usize },
    #[error("invalid hex: {0}")]
    Decode(#[from] hex::FromHexError),
}

/// Decode an optionally `0x`-prefixed hex string into a fixed-size array.
pub(crate) fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() != N * 2 {
        return Err(HexError::Length {
            expected: N * 2,
            got: s.len(),
        });
    }
    let mut buff = [0u8; N];
    hex::decode_to_slice(s, &mut buff)?;
    Ok(buff)
}

/// An untyped 32-byte value
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Bytes32([u8; BYTES32_SIZE]);

impl Bytes32 {
    /// The all-zero value. Used as the Merkle pad node and as the
    ///  "unset" marker for registry fields.
    pub const ZERO: Bytes32 = Bytes32([0; BYTES32_SIZE]);

    pub const fn new(bytes: [u8; BYTES32_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BYTES32_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; BYTES32_SIZE]
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        decode_fixed::<BYTES32_SIZE>(s).map(Self)
    }
}

impl Deref for Bytes32 {
    type Target = [u8; BYTES32_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Bytes32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; BYTES32_SIZE]> for Bytes32 {
    fn from(bytes: [u8; BYTES32_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes32({})", self.to_hex())
    }
}

impl FromStr for Bytes32 {
    type Err = HexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Declare a typed 32-byte protocol value backed by [`Bytes32`].
macro_rules! define_bytes32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Bytes32);

        impl $name {
            pub const fn new(bytes: [u8; BYTES32_SIZE]) -> Self {
                Self(Bytes32::new(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; BYTES32_SIZE] {
                self.0.as_bytes()
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn to_hex(&self) -> String {
                self.0.to_hex()
            }

            pub fn from_hex(s: &str) -> Result<Self, HexError> {
                Bytes32::from_hex(s).map(Self)
            }
        }

        impl From<Bytes32> for $name {
            fn from(value: Bytes32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Bytes32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = HexError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }
    };
}

define_bytes32!(
    /// One-way hash of a vault password, stored on the registry
    PasswordHash
);
define_bytes32!(
    /// Registry key of a vault, `H(password_hash, owner)`
    VaultId
);
define_bytes32!(
    /// Merkle leaf binding a content tag to its vault
    Leaf
);
define_bytes32!(
    /// Public commitment to a [`Leaf`]
    Commitment
);
define_bytes32!(
    /// One-time value spent when a proof is accepted
    Nullifier
);
define_bytes32!(
    /// Identifier of a broadcast ledger transaction
    TxHash
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_accepts_prefixed_and_bare() {
        let value = Bytes32::new([0xab; 32]);
        let prefixed = value.to_hex();
        assert!(prefixed.starts_with("0x"));
        assert_eq!(Bytes32::from_hex(&prefixed).unwrap(), value);
        assert_eq!(Bytes32::from_hex(&prefixed[2..]).unwrap(), value);
    }

    #[test]
    fn test_hex_rejects_wrong_length() {
        let err = Bytes32::from_hex("0xabcd").unwrap_err();
        assert_eq!(
            err,
            HexError::Length {
                expected: 64,
                got: 4
            }
        );
        // an odd digit count is reported as is, not rounded down
        let err = Bytes32::from_hex(&"a".repeat(63)).unwrap_err();
        assert_eq!(
            err,
            HexError::Length {
                expected: 64,
                got: 63
            }
        );
    }

    #[test]
    fn test_typed_values_serialize_as_hex_strings() {
        let id = VaultId::new([7; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "07".repeat(32)));
        let back: VaultId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
