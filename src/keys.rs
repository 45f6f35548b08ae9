use crate::{hash::canonical, signature::Signature};
use ed25519_dalek::ExpandedSecretKey;
use rand::rngs::OsRng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{cmp::Ordering, fmt};

/// Signing keypair of a node (bank or mintette) or of a wallet address.
pub struct KeyPair {
    secret_key: ed25519_dalek::SecretKey,
    public_key: PublicKey,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(ed25519_dalek::PublicKey);

/// Wrapper over a public key which coins are paid to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(PublicKey);

impl KeyPair {
    pub fn new_random() -> KeyPair {
        let mut csprng = OsRng;
        let secret_key = ed25519_dalek::SecretKey::generate(&mut csprng);
        let public_key = PublicKey(ed25519_dalek::PublicKey::from(&secret_key));

        Self {
            secret_key,
            public_key,
        }
    }

    /// Restore a keypair from the 32 secret-key bytes, as read from a key
    /// file.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<KeyPair, InvalidKey> {
        let secret_key = ed25519_dalek::SecretKey::from_bytes(bytes).map_err(|_| InvalidKey)?;
        let public_key = PublicKey(ed25519_dalek::PublicKey::from(&secret_key));

        Ok(Self {
            secret_key,
            public_key,
        })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret_key.to_bytes()
    }

    pub fn public(&self) -> PublicKey {
        self.public_key
    }

    pub fn address(&self) -> Address {
        Address(self.public_key)
    }

    /// Sign the canonical serialization of `value`. Ed25519 signing is
    /// deterministic: the same keypair and value always produce the same
    /// signature, which the replay log relies on.
    pub fn sign<T: Serialize>(&self, value: &T) -> Signature {
        let expanded = ExpandedSecretKey::from(&self.secret_key);

        Signature::from(expanded.sign(&canonical(value), &self.public_key.0))
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("not a valid ed25519 key")]
pub struct InvalidKey;

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub(crate) fn inner(&self) -> &ed25519_dalek::PublicKey {
        &self.0
    }
}

impl Address {
    pub fn key(&self) -> PublicKey {
        self.0
    }
}

impl From<PublicKey> for Address {
    fn from(key: PublicKey) -> Self {
        Address(key)
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_bytes().hash(state);
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (*self.0.as_bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        let key = ed25519_dalek::PublicKey::from_bytes(&bytes).map_err(de::Error::custom)?;

        Ok(PublicKey(key))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..4]))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0.as_bytes()[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_deser_round() {
        let pubkey = KeyPair::new_random().public();

        let str = serde_json::to_string(&pubkey).unwrap();
        let res: PublicKey = serde_json::from_str(&str).unwrap();

        assert_eq!(pubkey, res);
    }

    #[test]
    fn keypair_restores_from_secret_bytes() {
        let keypair = KeyPair::new_random();
        let signature = keypair.sign(&"payload");

        let restored = KeyPair::from_secret_bytes(&keypair.secret_bytes()).unwrap();

        assert_eq!(keypair.public(), restored.public());
        assert_eq!(signature, restored.sign(&"payload"));
    }
}
