//! # Core Entities
//!
//! Primitive types shared by the ledger core and the off-band gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// The all-zero address. Never a valid owner or gateway.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Ledger timestamp in seconds (block time).
pub type Timestamp = u64;

/// Monotonically assigned request identifier.
pub type RequestId = u64;

/// Wei per native currency unit.
pub const WEI_PER_UNIT: u64 = 1_000_000_000_000_000_000;

/// Convert whole currency units into wei.
#[must_use]
pub fn units(amount: u64) -> U256 {
    U256::from(amount) * U256::from(WEI_PER_UNIT)
}

/// Short hex prefix of an address for log lines.
#[must_use]
pub fn short_addr(address: &Address) -> String {
    format!("0x{}", hex::encode(&address[..4]))
}

/// Opaque encrypted byte string.
///
/// Produced and consumed by external encryption collaborators. The ledger
/// core stores it verbatim and never interprets its contents.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(pub Vec<u8>);

impl Ciphertext {
    /// Create an empty ciphertext.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no bytes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// SHA-256 of the bytes, for correlating log lines without printing
    /// the ciphertext itself.
    #[must_use]
    pub fn digest(&self) -> Hash {
        use sha2::{Digest, Sha256};
        Sha256::digest(&self.0).into()
    }

    /// Drop the bytes, leaving an empty ciphertext.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digest = self.digest();
        write!(
            f,
            "Ciphertext({} bytes, sha256={})",
            self.0.len(),
            hex::encode(&digest[..6])
        )
    }
}

impl From<Vec<u8>> for Ciphertext {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Ciphertext {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Ciphertext {
    fn from(bytes: &[u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Ciphertext {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
