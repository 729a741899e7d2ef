//! Envelope encryption for stored objects.
//!
//! AES-256-GCM with a 128-bit nonce. The key and nonce for an object are
//! generated once at upload and travel with its metadata record inside an
//! [`EncryptionEnvelope`]; the engine itself holds no state.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Algorithm tag written into every envelope.
pub const ALGORITHM_TAG: &str = "AES-256-GCM";
pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 16;

type Aes256Gcm128 = AesGcm<Aes256, U16>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Ciphertext failed authentication")]
    AuthenticationFailed,

    #[error("Key or nonce has the wrong length")]
    InvalidKeyOrNonceLength,

    #[error("Unknown envelope algorithm: {tag}")]
    UnknownAlgorithm { tag: String },
}

/// 256-bit content key. Wiped on drop; never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Key(Vec<u8>);

/// Per-object nonce.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Nonce(Vec<u8>);

macro_rules! opaque_bytes {
    ($ty:ident, $label:literal) => {
        impl $ty {
            pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_base64(&self) -> String {
                base64::engine::general_purpose::STANDARD.encode(&self.0)
            }

            pub fn from_base64(text: &str) -> Result<Self, base64::DecodeError> {
                base64::engine::general_purpose::STANDARD
                    .decode(text)
                    .map(Self)
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "([redacted; {}])"), self.0.len())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_base64())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::from_base64(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

opaque_bytes!(Key, "Key");
opaque_bytes!(Nonce, "Nonce");

/// Everything needed to decrypt one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionEnvelope {
    pub algorithm: String,
    pub key: Key,
    pub nonce: Nonce,
}

impl EncryptionEnvelope {
    pub fn new(key: Key, nonce: Nonce) -> Self {
        Self {
            algorithm: ALGORITHM_TAG.to_string(),
            key,
            nonce,
        }
    }
}

/// Stateless AES-256-GCM engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptionEngine;

impl EncryptionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_key(&self) -> Key {
        let mut bytes = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Key(bytes)
    }

    pub fn generate_nonce(&self) -> Nonce {
        let mut bytes = vec![0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Nonce(bytes)
    }

    /// Ciphertext followed by the 16-byte tag.
    pub fn encrypt(&self, plaintext: &[u8], key: &Key, nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
        let (cipher, nonce) = Self::cipher(key, nonce)?;
        // Only fails when the plaintext exceeds the GCM length limit.
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::InvalidKeyOrNonceLength)
    }

    pub fn decrypt(&self, ciphertext: &[u8], key: &Key, nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
        let (cipher, nonce) = Self::cipher(key, nonce)?;
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    /// Encrypts under a fresh key and nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<(Vec<u8>, EncryptionEnvelope), CryptoError> {
        let key = self.generate_key();
        let nonce = self.generate_nonce();
        let ciphertext = self.encrypt(plaintext, &key, &nonce)?;
        Ok((ciphertext, EncryptionEnvelope::new(key, nonce)))
    }

    pub fn open(&self, ciphertext: &[u8], envelope: &EncryptionEnvelope) -> Result<Vec<u8>, CryptoError> {
        if envelope.algorithm != ALGORITHM_TAG {
            return Err(CryptoError::UnknownAlgorithm {
                tag: envelope.algorithm.clone(),
            });
        }
        self.decrypt(ciphertext, &envelope.key, &envelope.nonce)
    }

    fn cipher<'n>(
        key: &Key,
        nonce: &'n Nonce,
    ) -> Result<(Aes256Gcm128, &'n GenericArray<u8, U16>), CryptoError> {
        if nonce.0.len() != NONCE_LEN {
            return Err(CryptoError::InvalidKeyOrNonceLength);
        }
        let cipher = Aes256Gcm128::new_from_slice(&key.0)
            .map_err(|_| CryptoError::InvalidKeyOrNonceLength)?;
        Ok((cipher, GenericArray::from_slice(&nonce.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_various_sizes() {
        let engine = EncryptionEngine::new();
        let key = engine.generate_key();
        let nonce = engine.generate_nonce();

        for len in [0usize, 1, 15, 16, 17, 4096, 65_537] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let ciphertext = engine.encrypt(&plaintext, &key, &nonce).unwrap();
            assert_eq!(ciphertext.len(), len + 16);
            assert_eq!(engine.decrypt(&ciphertext, &key, &nonce).unwrap(), plaintext);
        }
    }

    #[test]
    fn encryption_is_deterministic_for_fixed_inputs() {
        let engine = EncryptionEngine::new();
        let key = Key::from_bytes(vec![7u8; KEY_LEN]);
        let nonce = Nonce::from_bytes(vec![9u8; NONCE_LEN]);

        let a = engine.encrypt(b"same input", &key, &nonce).unwrap();
        let b = engine.encrypt(b"same input", &key, &nonce).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn any_flipped_bit_fails_authentication() {
        let engine = EncryptionEngine::new();
        let key = engine.generate_key();
        let nonce = engine.generate_nonce();
        let ciphertext = engine.encrypt(b"ID3 tiny track", &key, &nonce).unwrap();

        for byte in 0..ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = ciphertext.clone();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    engine.decrypt(&tampered, &key, &nonce),
                    Err(CryptoError::AuthenticationFailed),
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let engine = EncryptionEngine::new();
        let nonce = engine.generate_nonce();
        let ciphertext = engine.encrypt(b"payload", &engine.generate_key(), &nonce).unwrap();
        assert_eq!(
            engine.decrypt(&ciphertext, &engine.generate_key(), &nonce),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn bad_lengths_are_rejected() {
        let engine = EncryptionEngine::new();
        let short_key = Key::from_bytes(vec![1u8; 16]);
        let short_nonce = Nonce::from_bytes(vec![1u8; 12]);

        assert_eq!(
            engine.encrypt(b"x", &short_key, &engine.generate_nonce()),
            Err(CryptoError::InvalidKeyOrNonceLength)
        );
        assert_eq!(
            engine.decrypt(b"x", &engine.generate_key(), &short_nonce),
            Err(CryptoError::InvalidKeyOrNonceLength)
        );
    }

    #[test]
    fn envelope_serializes_as_base64_text() {
        let engine = EncryptionEngine::new();
        let (ciphertext, envelope) = engine.seal(b"fLaC....").unwrap();

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["algorithm"], ALGORITHM_TAG);
        assert!(json["key"].is_string());

        let restored: EncryptionEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(restored, envelope);
        assert_eq!(engine.open(&ciphertext, &restored).unwrap(), b"fLaC....");
    }

    #[test]
    fn unknown_algorithm_tag_is_refused() {
        let engine = EncryptionEngine::new();
        let (ciphertext, mut envelope) = engine.seal(b"abc").unwrap();
        envelope.algorithm = "AES/CBC/PKCS5Padding".into();
        assert!(matches!(
            engine.open(&ciphertext, &envelope),
            Err(CryptoError::UnknownAlgorithm { .. })
        ));
    }

    #[test]
    fn debug_output_redacts_key_material() {
        let key = Key::from_bytes(vec![0xAB; KEY_LEN]);
        let printed = format!("{key:?}");
        assert_eq!(printed, "Key([redacted; 32])");
    }
}
