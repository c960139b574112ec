//! Algorithm table.
//!
//! One static table maps every supported cipher to its name, OID, key size,
//! IV size and the password-based encryption scheme that carries it. The PRF
//! table does the same for HMAC digests. Everything else in the crate looks
//! algorithms up here.

use crate::crypto::kdf::PrfDigest;
use crate::error::{PeerKeyError, Result};
use der::asn1::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PKCS#5 v2.0 PBES2 (RFC 8018).
pub const PBES2_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.13");
/// PBKDF2 key derivation function.
pub const PBKDF2_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.12");
/// PKCS#12 `pbeWithSHAAnd3-KeyTripleDES-CBC`.
pub const PKCS12_3DES_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.3");

/// `id-ecPublicKey` (RFC 5480).
pub const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// Named curve secp256k1 (SEC 2).
pub const SECP256K1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");
/// `id-Ed25519` (RFC 8410).
pub const ED25519_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

const AES128_CBC_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2");
const AES192_CBC_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22");
const AES256_CBC_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");
const DES_CBC_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");
const DES_EDE3_CBC_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.3.7");

const HMAC_SHA1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.7");
const HMAC_SHA224_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.8");
const HMAC_SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.9");
const HMAC_SHA384_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.10");
const HMAC_SHA512_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.11");

/// Block cipher used to encrypt a key container. All run in CBC mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CipherAlgorithm {
    #[serde(rename = "aes128")]
    Aes128,
    #[serde(rename = "aes192")]
    Aes192,
    #[default]
    #[serde(rename = "aes256")]
    Aes256,
    #[serde(rename = "des")]
    Des,
    #[serde(rename = "3des")]
    TripleDes,
}

/// How the encryption parameters are carried in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbeScheme {
    /// PBES2: PBKDF2 parameters plus a cipher identifier with a random IV
    Pbes2,
    /// PKCS#12 PBE: salt and iteration count only, key and IV both derived
    Pkcs12,
}

/// One row of the algorithm table.
#[derive(Debug)]
pub struct AlgorithmSpec {
    pub algorithm: CipherAlgorithm,
    pub name: &'static str,
    /// Cipher OID inside a PBES2 `encryptionScheme`
    pub cipher_oid: ObjectIdentifier,
    pub key_size: usize,
    pub iv_size: usize,
    /// Scheme used when encrypting with this cipher
    pub scheme: PbeScheme,
}

static ALGORITHMS: [AlgorithmSpec; 5] = [
    AlgorithmSpec {
        algorithm: CipherAlgorithm::Aes128,
        name: "aes128",
        cipher_oid: AES128_CBC_OID,
        key_size: 16,
        iv_size: 16,
        scheme: PbeScheme::Pbes2,
    },
    AlgorithmSpec {
        algorithm: CipherAlgorithm::Aes192,
        name: "aes192",
        cipher_oid: AES192_CBC_OID,
        key_size: 24,
        iv_size: 16,
        scheme: PbeScheme::Pbes2,
    },
    AlgorithmSpec {
        algorithm: CipherAlgorithm::Aes256,
        name: "aes256",
        cipher_oid: AES256_CBC_OID,
        key_size: 32,
        iv_size: 16,
        scheme: PbeScheme::Pbes2,
    },
    AlgorithmSpec {
        algorithm: CipherAlgorithm::Des,
        name: "des",
        cipher_oid: DES_CBC_OID,
        key_size: 8,
        iv_size: 8,
        scheme: PbeScheme::Pbes2,
    },
    AlgorithmSpec {
        algorithm: CipherAlgorithm::TripleDes,
        name: "3des",
        cipher_oid: DES_EDE3_CBC_OID,
        key_size: 24,
        iv_size: 8,
        scheme: PbeScheme::Pkcs12,
    },
];

static PRFS: [(PrfDigest, ObjectIdentifier); 5] = [
    (PrfDigest::Sha1, HMAC_SHA1_OID),
    (PrfDigest::Sha224, HMAC_SHA224_OID),
    (PrfDigest::Sha256, HMAC_SHA256_OID),
    (PrfDigest::Sha384, HMAC_SHA384_OID),
    (PrfDigest::Sha512, HMAC_SHA512_OID),
];

impl CipherAlgorithm {
    /// All supported ciphers, in table order.
    pub fn all() -> impl Iterator<Item = CipherAlgorithm> {
        ALGORITHMS.iter().map(|spec| spec.algorithm)
    }

    /// The table row for this cipher.
    pub fn spec(self) -> &'static AlgorithmSpec {
        // The table holds one row per variant, in declaration order.
        &ALGORITHMS[self as usize]
    }

    pub fn key_size(self) -> usize {
        self.spec().key_size
    }

    pub fn iv_size(self) -> usize {
        self.spec().iv_size
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Look a cipher up by its PBES2 `encryptionScheme` OID.
    pub fn from_cipher_oid(oid: &ObjectIdentifier) -> Result<Self> {
        ALGORITHMS
            .iter()
            .find(|spec| spec.cipher_oid == *oid)
            .map(|spec| spec.algorithm)
            .ok_or_else(|| PeerKeyError::UnsupportedAlgorithm(format!("cipher OID {}", oid)))
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = PeerKeyError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_ascii_lowercase();
        ALGORITHMS
            .iter()
            .find(|spec| spec.name == wanted)
            .map(|spec| spec.algorithm)
            .ok_or_else(|| PeerKeyError::UnsupportedAlgorithm(format!("cipher '{}'", s)))
    }
}

/// The HMAC algorithm identifier OID for a PRF digest.
pub fn prf_oid(prf: PrfDigest) -> ObjectIdentifier {
    PRFS.iter()
        .find(|(digest, _)| *digest == prf)
        .map(|(_, oid)| *oid)
        .unwrap_or(HMAC_SHA1_OID)
}

/// Look a PRF digest up by its HMAC algorithm identifier OID.
pub fn prf_from_oid(oid: &ObjectIdentifier) -> Result<PrfDigest> {
    PRFS.iter()
        .find(|(_, candidate)| candidate == oid)
        .map(|(digest, _)| *digest)
        .ok_or_else(|| PeerKeyError::UnsupportedDigest(format!("PRF OID {}", oid)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        let expected = [
            (CipherAlgorithm::Aes128, 16, 16),
            (CipherAlgorithm::Aes192, 24, 16),
            (CipherAlgorithm::Aes256, 32, 16),
            (CipherAlgorithm::Des, 8, 8),
            (CipherAlgorithm::TripleDes, 24, 8),
        ];
        for (algorithm, key_size, iv_size) in expected {
            assert_eq!(algorithm.key_size(), key_size, "{}", algorithm);
            assert_eq!(algorithm.iv_size(), iv_size, "{}", algorithm);
        }
    }

    #[test]
    fn test_table_rows_match_variants() {
        for algorithm in CipherAlgorithm::all() {
            assert_eq!(algorithm.spec().algorithm, algorithm);
        }
        assert_eq!(CipherAlgorithm::all().count(), 5);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("aes256".parse::<CipherAlgorithm>().unwrap(), CipherAlgorithm::Aes256);
        assert_eq!("3DES".parse::<CipherAlgorithm>().unwrap(), CipherAlgorithm::TripleDes);
        assert!(matches!(
            "blowfish".parse::<CipherAlgorithm>(),
            Err(PeerKeyError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_default_is_aes256() {
        assert_eq!(CipherAlgorithm::default(), CipherAlgorithm::Aes256);
    }

    #[test]
    fn test_scheme_shapes() {
        assert_eq!(CipherAlgorithm::Aes128.spec().scheme, PbeScheme::Pbes2);
        assert_eq!(CipherAlgorithm::Des.spec().scheme, PbeScheme::Pbes2);
        assert_eq!(CipherAlgorithm::TripleDes.spec().scheme, PbeScheme::Pkcs12);
    }

    #[test]
    fn test_cipher_oid_lookup() {
        let oid = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");
        assert_eq!(CipherAlgorithm::from_cipher_oid(&oid).unwrap(), CipherAlgorithm::Aes256);

        let unknown = ObjectIdentifier::new_unwrap("1.2.3.4");
        assert!(matches!(
            CipherAlgorithm::from_cipher_oid(&unknown),
            Err(PeerKeyError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_prf_oid_roundtrip() {
        for prf in [
            PrfDigest::Sha1,
            PrfDigest::Sha224,
            PrfDigest::Sha256,
            PrfDigest::Sha384,
            PrfDigest::Sha512,
        ] {
            assert_eq!(prf_from_oid(&prf_oid(prf)).unwrap(), prf);
        }
        assert_eq!(prf_oid(PrfDigest::Sha512).to_string(), "1.2.840.113549.2.11");
    }

    #[test]
    fn test_unknown_prf_oid() {
        let md5 = ObjectIdentifier::new_unwrap("1.2.840.113549.2.5");
        assert!(matches!(prf_from_oid(&md5), Err(PeerKeyError::UnsupportedDigest(_))));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&CipherAlgorithm::TripleDes).unwrap();
        assert_eq!(json, "\"3des\"");
        let parsed: CipherAlgorithm = serde_json::from_str("\"aes192\"").unwrap();
        assert_eq!(parsed, CipherAlgorithm::Aes192);
    }
}
