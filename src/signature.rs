use crate::{hash::canonical, keys::PublicKey};
use ed25519_dalek::Verifier;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{convert::TryFrom, fmt};

/// Signature over the canonical serialization of a value.
#[derive(Clone, Copy)]
pub struct Signature(ed25519_dalek::Signature);

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes()[..] == other.0.to_bytes()[..]
    }
}

impl Eq for Signature {}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("signature is invalid")]
pub struct InvalidSignature;

/// Verify `signature` against the canonical serialization of `value`.
pub fn verify_sig<T: Serialize>(
    verification_key: PublicKey,
    value: &T,
    signature: &Signature,
) -> Result<(), InvalidSignature> {
    verification_key
        .inner()
        .verify(&canonical(value), &signature.0)
        .map_err(|_| InvalidSignature)
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(signature: ed25519_dalek::Signature) -> Self {
        Signature(signature)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let signature =
            ed25519_dalek::Signature::try_from(bytes.as_slice()).map_err(de::Error::custom)?;

        Ok(Signature(signature))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0.to_bytes()[..4]))
    }
}

impl fmt::LowerHex for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0.to_bytes()[..]))
    }
}
