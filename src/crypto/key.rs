//! Raw private key material.
//!
//! This module provides the in-memory form of a peer's private key: the raw
//! scalar bytes plus the curve they belong to. The bytes are wiped when the
//! value is dropped.

use crate::error::{PeerKeyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// The curve (key algorithm) a raw private key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCurve {
    /// ECDSA over secp256k1, the libp2p default for peer identities
    Secp256k1,
    /// Ed25519
    Ed25519,
}

impl KeyCurve {
    /// Length in bytes of a raw private key on this curve.
    pub fn secret_len(self) -> usize {
        match self {
            KeyCurve::Secp256k1 => 32,
            KeyCurve::Ed25519 => 32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyCurve::Secp256k1 => "secp256k1",
            KeyCurve::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyCurve {
    type Err = PeerKeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "secp256k1" => Ok(KeyCurve::Secp256k1),
            "ed25519" => Ok(KeyCurve::Ed25519),
            other => Err(PeerKeyError::UnsupportedAlgorithm(format!(
                "unknown key type '{}'",
                other
            ))),
        }
    }
}

/// A private key as raw bytes plus its curve tag.
///
/// The bytes live in a zeroizing buffer. `Debug` never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct RawKeyMaterial {
    curve: KeyCurve,
    bytes: Zeroizing<Vec<u8>>,
}

impl RawKeyMaterial {
    /// Create key material, validating the length for the curve.
    ///
    /// # Example
    ///
    /// ```
    /// use peerkey::crypto::key::{KeyCurve, RawKeyMaterial};
    ///
    /// let key = RawKeyMaterial::new(KeyCurve::Secp256k1, vec![7u8; 32]).unwrap();
    /// assert_eq!(key.as_bytes().len(), 32);
    /// assert!(RawKeyMaterial::new(KeyCurve::Secp256k1, vec![7u8; 16]).is_err());
    /// ```
    pub fn new(curve: KeyCurve, bytes: Vec<u8>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() != curve.secret_len() {
            return Err(PeerKeyError::InvalidKey(format!(
                "Expected {} bytes for {} secret key, got {}",
                curve.secret_len(),
                curve,
                bytes.len()
            )));
        }
        if curve == KeyCurve::Secp256k1 && bytes.iter().all(|b| *b == 0) {
            return Err(PeerKeyError::InvalidKey(format!(
                "{} secret key must not be all zeroes",
                curve
            )));
        }
        Ok(Self { curve, bytes })
    }

    /// Create secp256k1 key material.
    pub fn secp256k1(bytes: &[u8]) -> Result<Self> {
        Self::new(KeyCurve::Secp256k1, bytes.to_vec())
    }

    /// Create Ed25519 key material.
    pub fn ed25519(bytes: &[u8]) -> Result<Self> {
        Self::new(KeyCurve::Ed25519, bytes.to_vec())
    }

    /// Parse key material from a hex string.
    pub fn from_hex(curve: KeyCurve, hex_string: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_string)
                .map_err(|e| PeerKeyError::InvalidKey(format!("Invalid hex string: {}", e)))?,
        );
        Self::new(curve, bytes.to_vec())
    }

    pub fn curve(&self) -> KeyCurve {
        self.curve
    }

    /// The raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for RawKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawKeyMaterial")
            .field("curve", &self.curve)
            .field("bytes", &"<redacted>")
            .finish()
    }
}
