use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 256-bit digest of the canonical serialization of a value.
///
/// Everything that is hashed or signed in the protocol goes through
/// [`canonical`], so `hash` and `sign` always agree on the input bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// The all-zeroes digest. Origin of a fresh action log and previous hash
    /// of the genesis block.
    pub const fn zero() -> Self {
        Hash([0u8; 32])
    }

    pub fn of<T: Serialize>(value: &T) -> Self {
        Self::digest(&canonical(value))
    }

    pub fn digest(bytes: &[u8]) -> Self {
        let mut output = [0u8; 32];
        output.copy_from_slice(&Sha256::digest(bytes));
        Hash(output)
    }

    /// Digest of the concatenation of two digests. Used to fold merkle trees.
    pub fn combine(left: &Hash, right: &Hash) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&left.0);
        hasher.update(&right.0);

        let mut output = [0u8; 32];
        output.copy_from_slice(&hasher.finalize());
        Hash(output)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Canonical byte encoding: fixed field order, little-endian fixed-width
/// integers, `u64` length prefixes for variable data.
pub fn canonical<T: Serialize>(value: &T) -> Vec<u8> {
    // The protocol types are plain data; encoding them cannot fail.
    bincode::serialize(value).expect("canonical encoding")
}

/// Distinguished input hash of the emission transaction of a period. Cannot
/// collide with the hash of a real transaction because of the domain tag.
pub fn emission_hash(period_id: u64) -> Hash {
    Hash::of(&("emission", period_id))
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::LowerHex for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
