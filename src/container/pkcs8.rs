//! PKCS#8 structures.
//!
//! Builds and parses `PrivateKeyInfo` (RFC 5208 / RFC 5958) for the supported
//! curves, and `EncryptedPrivateKeyInfo` with either PBES2 (RFC 8018) or the
//! PKCS#12 3DES scheme (RFC 7292).

use crate::container::asn1::Asn1;
use crate::crypto::algorithms::{
    prf_from_oid, prf_oid, CipherAlgorithm, EC_PUBLIC_KEY_OID, ED25519_OID, PBES2_OID,
    PBKDF2_OID, PKCS12_3DES_OID, SECP256K1_OID,
};
use crate::crypto::kdf::PrfDigest;
use crate::crypto::key::{KeyCurve, RawKeyMaterial};
use crate::error::{PeerKeyError, Result};
use zeroize::Zeroizing;

/// `ECPrivateKey` version (RFC 5915).
const EC_PRIVATE_KEY_VERSION: u64 = 1;

/// Parameters of one password-based encryption, as carried in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PbeParams {
    /// PBES2 with PBKDF2
    Pbes2 {
        salt: Vec<u8>,
        iterations: u32,
        /// Written only alongside a non-default PRF
        key_length: Option<usize>,
        prf: PrfDigest,
        cipher: CipherAlgorithm,
        iv: Vec<u8>,
    },
    /// `pbeWithSHAAnd3-KeyTripleDES-CBC`
    Pkcs12TripleDes { salt: Vec<u8>, iterations: u32 },
}

/// A parsed `EncryptedPrivateKeyInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPrivateKeyInfo {
    pub params: PbeParams,
    pub ciphertext: Vec<u8>,
}

/// Wrap a raw key as a DER `PrivateKeyInfo`.
///
/// secp256k1 keys carry an RFC 5915 `ECPrivateKey` inside the private key
/// octet string; Ed25519 keys carry an RFC 8410 `CurvePrivateKey`.
///
/// # Example
///
/// ```
/// use peerkey::container::pkcs8::{unwrap_plain_key, wrap_plain_key};
/// use peerkey::crypto::key::RawKeyMaterial;
///
/// let key = RawKeyMaterial::secp256k1(&[5u8; 32]).unwrap();
/// let der = wrap_plain_key(&key).unwrap();
/// assert_eq!(unwrap_plain_key(&der).unwrap(), key);
/// ```
pub fn wrap_plain_key(raw: &RawKeyMaterial) -> Result<Zeroizing<Vec<u8>>> {
    let (algorithm, private_key) = match raw.curve() {
        KeyCurve::Secp256k1 => (
            Asn1::Sequence(vec![Asn1::oid(EC_PUBLIC_KEY_OID), Asn1::oid(SECP256K1_OID)]),
            Asn1::Sequence(vec![
                Asn1::uint(EC_PRIVATE_KEY_VERSION)?,
                Asn1::octets(raw.as_bytes()),
            ]),
        ),
        KeyCurve::Ed25519 => (
            Asn1::Sequence(vec![Asn1::oid(ED25519_OID)]),
            Asn1::octets(raw.as_bytes()),
        ),
    };

    let private_key = Zeroizing::new(private_key.to_der()?);
    let info = Asn1::Sequence(vec![Asn1::uint(0)?, algorithm, Asn1::octets(&private_key)]);
    Ok(Zeroizing::new(info.to_der()?))
}

/// Parse a DER `PrivateKeyInfo` back into raw key material.
pub fn unwrap_plain_key(der: &[u8]) -> Result<RawKeyMaterial> {
    let info = Asn1::from_der(der)?;
    let fields = info.as_sequence()?;
    if fields.len() < 3 {
        return Err(PeerKeyError::MalformedContainer(
            "PrivateKeyInfo needs version, algorithm and key".to_string(),
        ));
    }

    let version = fields[0].as_u64()?;
    if version > 1 {
        return Err(PeerKeyError::MalformedContainer(format!(
            "unsupported PrivateKeyInfo version {}",
            version
        )));
    }

    let algorithm = fields[1].as_sequence()?;
    let key_oid = first_oid(algorithm, "PrivateKeyInfo algorithm")?;
    let private_key = fields[2].as_octet_string()?;

    if *key_oid == EC_PUBLIC_KEY_OID {
        let curve_oid = algorithm
            .get(1)
            .ok_or_else(|| {
                PeerKeyError::MalformedContainer("EC key without named curve".to_string())
            })?
            .as_oid()?;
        if *curve_oid != SECP256K1_OID {
            return Err(PeerKeyError::UnsupportedAlgorithm(format!("curve OID {}", curve_oid)));
        }

        let ec_key = Asn1::from_der(private_key)?;
        let ec_fields = ec_key.as_sequence()?;
        if ec_fields.len() < 2 || ec_fields[0].as_u64()? != EC_PRIVATE_KEY_VERSION {
            return Err(PeerKeyError::MalformedContainer(
                "invalid ECPrivateKey".to_string(),
            ));
        }
        RawKeyMaterial::secp256k1(ec_fields[1].as_octet_string()?)
    } else if *key_oid == ED25519_OID {
        let seed = Asn1::from_der(private_key)?;
        RawKeyMaterial::ed25519(seed.as_octet_string()?)
    } else {
        Err(PeerKeyError::UnsupportedAlgorithm(format!("key algorithm OID {}", key_oid)))
    }
}

impl EncryptedPrivateKeyInfo {
    /// Encode as DER.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let algorithm = match &self.params {
            PbeParams::Pbes2 {
                salt,
                iterations,
                key_length,
                prf,
                cipher,
                iv,
            } => {
                let mut kdf_params = vec![Asn1::octets(salt), Asn1::uint(*iterations as u64)?];
                if let Some(key_length) = key_length {
                    kdf_params.push(Asn1::uint(*key_length as u64)?);
                }
                if *prf != PrfDigest::Sha1 {
                    kdf_params.push(Asn1::Sequence(vec![Asn1::oid(prf_oid(*prf)), Asn1::Null]));
                }

                Asn1::Sequence(vec![
                    Asn1::oid(PBES2_OID),
                    Asn1::Sequence(vec![
                        Asn1::Sequence(vec![Asn1::oid(PBKDF2_OID), Asn1::Sequence(kdf_params)]),
                        Asn1::Sequence(vec![
                            Asn1::oid(cipher.spec().cipher_oid),
                            Asn1::octets(iv),
                        ]),
                    ]),
                ])
            }
            PbeParams::Pkcs12TripleDes { salt, iterations } => Asn1::Sequence(vec![
                Asn1::oid(PKCS12_3DES_OID),
                Asn1::Sequence(vec![Asn1::octets(salt), Asn1::uint(*iterations as u64)?]),
            ]),
        };

        Asn1::Sequence(vec![algorithm, Asn1::octets(&self.ciphertext)]).to_der()
    }

    /// Parse a DER `EncryptedPrivateKeyInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let root = Asn1::from_der(der)?;
        let fields = root.as_sequence()?;
        if fields.len() != 2 {
            return Err(PeerKeyError::MalformedContainer(
                "EncryptedPrivateKeyInfo needs algorithm and encrypted data".to_string(),
            ));
        }

        let algorithm = fields[0].as_sequence()?;
        let scheme_oid = first_oid(algorithm, "encryptionAlgorithm")?;
        let params = algorithm.get(1).ok_or_else(|| {
            PeerKeyError::MalformedContainer("encryptionAlgorithm without parameters".to_string())
        })?;
        let ciphertext = fields[1].as_octet_string()?.to_vec();

        let params = if *scheme_oid == PBES2_OID {
            parse_pbes2(params)?
        } else if *scheme_oid == PKCS12_3DES_OID {
            let (salt, iterations) = parse_salt_and_count(params.as_sequence()?)?;
            PbeParams::Pkcs12TripleDes { salt, iterations }
        } else {
            return Err(PeerKeyError::UnsupportedAlgorithm(format!(
                "encryption scheme OID {}",
                scheme_oid
            )));
        };

        Ok(Self { params, ciphertext })
    }
}

fn parse_pbes2(params: &Asn1) -> Result<PbeParams> {
    let parts = params.as_sequence()?;
    if parts.len() != 2 {
        return Err(PeerKeyError::MalformedContainer(
            "PBES2-params needs keyDerivationFunc and encryptionScheme".to_string(),
        ));
    }

    let kdf = parts[0].as_sequence()?;
    let kdf_oid = first_oid(kdf, "keyDerivationFunc")?;
    if *kdf_oid != PBKDF2_OID {
        return Err(PeerKeyError::UnsupportedAlgorithm(format!("KDF OID {}", kdf_oid)));
    }
    let kdf_params = kdf
        .get(1)
        .ok_or_else(|| PeerKeyError::MalformedContainer("PBKDF2 without parameters".to_string()))?
        .as_sequence()?;
    let (salt, iterations) = parse_salt_and_count(kdf_params)?;

    let mut key_length = None;
    let mut prf = PrfDigest::Sha1;
    for field in &kdf_params[2..] {
        match field {
            Asn1::Integer(_) if key_length.is_none() => {
                key_length = Some(field.as_u64()? as usize);
            }
            Asn1::Sequence(prf_algorithm) => {
                prf = prf_from_oid(first_oid(prf_algorithm, "PBKDF2 prf")?)?;
            }
            other => {
                return Err(PeerKeyError::MalformedContainer(format!(
                    "unexpected PBKDF2 parameter {:?}",
                    other
                )))
            }
        }
    }

    let scheme = parts[1].as_sequence()?;
    let cipher = CipherAlgorithm::from_cipher_oid(first_oid(scheme, "encryptionScheme")?)?;
    let iv = scheme
        .get(1)
        .ok_or_else(|| PeerKeyError::MalformedContainer("encryptionScheme without IV".to_string()))?
        .as_octet_string()?
        .to_vec();

    if iv.len() != cipher.iv_size() {
        return Err(PeerKeyError::MalformedContainer(format!(
            "{} needs a {}-byte IV, container has {}",
            cipher,
            cipher.iv_size(),
            iv.len()
        )));
    }
    if let Some(len) = key_length {
        if len != cipher.key_size() {
            return Err(PeerKeyError::MalformedContainer(format!(
                "keyLength {} does not match {} ({} bytes)",
                len,
                cipher,
                cipher.key_size()
            )));
        }
    }

    Ok(PbeParams::Pbes2 {
        salt,
        iterations,
        key_length,
        prf,
        cipher,
        iv,
    })
}

fn parse_salt_and_count(fields: &[Asn1]) -> Result<(Vec<u8>, u32)> {
    if fields.len() < 2 {
        return Err(PeerKeyError::MalformedContainer(
            "parameters need salt and iteration count".to_string(),
        ));
    }
    let salt = fields[0].as_octet_string()?.to_vec();
    let iterations = fields[1].as_u64()?;
    if iterations == 0 || iterations > u32::MAX as u64 {
        return Err(PeerKeyError::MalformedContainer(format!(
            "iteration count {} out of range",
            iterations
        )));
    }
    Ok((salt, iterations as u32))
}

fn first_oid<'a>(fields: &'a [Asn1], what: &str) -> Result<&'a der::asn1::ObjectIdentifier> {
    fields
        .first()
        .ok_or_else(|| PeerKeyError::MalformedContainer(format!("{} is empty", what)))?
        .as_oid()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_HEX: &str = "104c3d4e1619b7e45fab42db46f809fb1269147ec2eee4d62bf3b691aec608e6";

    fn test_key() -> RawKeyMaterial {
        RawKeyMaterial::from_hex(KeyCurve::Secp256k1, TEST_KEY_HEX).unwrap()
    }

    fn uint(value: u64) -> Asn1 {
        Asn1::uint(value).unwrap()
    }

    #[test]
    fn test_wrap_secp256k1_layout() {
        let der = wrap_plain_key(&test_key()).unwrap();
        let expected = format!(
            "303e020100301006072a8648ce3d020106052b8104000a042730250201010420{}",
            TEST_KEY_HEX
        );
        assert_eq!(hex::encode(&*der), expected);
    }

    #[test]
    fn test_wrap_ed25519_layout() {
        let key = RawKeyMaterial::ed25519(&[0x11u8; 32]).unwrap();
        let der = wrap_plain_key(&key).unwrap();
        assert_eq!(
            hex::encode(&der[..16]),
            "302e020100300506032b657004220420"
        );
        assert_eq!(der.len(), 48);
    }

    #[test]
    fn test_unwrap_roundtrip_both_curves() {
        let secp = test_key();
        assert_eq!(unwrap_plain_key(&wrap_plain_key(&secp).unwrap()).unwrap(), secp);

        let ed = RawKeyMaterial::ed25519(&[0x42u8; 32]).unwrap();
        assert_eq!(unwrap_plain_key(&wrap_plain_key(&ed).unwrap()).unwrap(), ed);
    }

    #[test]
    fn test_unwrap_accepts_ec_key_with_public_key() {
        // ECPrivateKey with the optional [1] publicKey field, as OpenSSL writes it
        let ec_key = Asn1::Sequence(vec![
            uint(1),
            Asn1::octets(test_key().as_bytes()),
            Asn1::Other {
                tag: 0xa1,
                content: vec![0x03, 0x02, 0x00, 0x04],
            },
        ]);
        let info = Asn1::Sequence(vec![
            uint(0),
            Asn1::Sequence(vec![Asn1::oid(EC_PUBLIC_KEY_OID), Asn1::oid(SECP256K1_OID)]),
            Asn1::octets(&ec_key.to_der().unwrap()),
        ]);
        assert_eq!(unwrap_plain_key(&info.to_der().unwrap()).unwrap(), test_key());
    }

    #[test]
    fn test_unwrap_unknown_key_algorithm() {
        let info = Asn1::Sequence(vec![
            uint(0),
            Asn1::Sequence(vec![
                Asn1::oid(der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1")),
                Asn1::Null,
            ]),
            Asn1::octets(&[0x30, 0x00]),
        ]);
        let result = unwrap_plain_key(&info.to_der().unwrap());
        assert!(matches!(result, Err(PeerKeyError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_unwrap_unknown_curve() {
        let prime256v1 = der::asn1::ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
        let info = Asn1::Sequence(vec![
            uint(0),
            Asn1::Sequence(vec![Asn1::oid(EC_PUBLIC_KEY_OID), Asn1::oid(prime256v1)]),
            Asn1::octets(&[0x30, 0x00]),
        ]);
        let result = unwrap_plain_key(&info.to_der().unwrap());
        assert!(matches!(result, Err(PeerKeyError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_unwrap_garbage() {
        let result = unwrap_plain_key(&[0x04, 0x02, 0x01, 0x02]);
        assert!(matches!(result, Err(PeerKeyError::MalformedContainer(_))));
    }

    #[test]
    fn test_pbes2_der_layout_with_sha512() {
        let info = EncryptedPrivateKeyInfo {
            params: PbeParams::Pbes2 {
                salt: vec![0xaa; 16],
                iterations: 10000,
                key_length: Some(32),
                prf: PrfDigest::Sha512,
                cipher: CipherAlgorithm::Aes256,
                iv: vec![0xbb; 16],
            },
            ciphertext: vec![0xcc; 80],
        };
        let der = info.to_der().unwrap();
        let hex_der = hex::encode(&der);

        // PBES2 OID, then PBKDF2 OID
        assert!(hex_der.contains("06092a864886f70d01050d"));
        assert!(hex_der.contains("06092a864886f70d01050c"));
        // salt, iteration count, key length, hmacWithSHA512 + NULL
        let kdf_params = format!(
            "0410{}02022710020120300c06082a864886f70d020b0500",
            "aa".repeat(16)
        );
        assert!(hex_der.contains(&kdf_params));
        // aes256-CBC + IV
        assert!(hex_der.contains(&format!("060960864801650304012a0410{}", "bb".repeat(16))));

        assert_eq!(EncryptedPrivateKeyInfo::from_der(&der).unwrap(), info);
    }

    #[test]
    fn test_pbes2_sha1_omits_prf_and_key_length() {
        let info = EncryptedPrivateKeyInfo {
            params: PbeParams::Pbes2 {
                salt: vec![1; 8],
                iterations: 2048,
                key_length: None,
                prf: PrfDigest::Sha1,
                cipher: CipherAlgorithm::Aes128,
                iv: vec![2; 16],
            },
            ciphertext: vec![3; 32],
        };
        let der = info.to_der().unwrap();
        let hex_der = hex::encode(&der);
        // PBKDF2-params is exactly SEQUENCE { salt, count }
        assert!(hex_der.contains(&format!("300e0408{}02020800", "01".repeat(8))));
        assert!(!hex_der.contains("2a864886f70d0207"));

        assert_eq!(EncryptedPrivateKeyInfo::from_der(&der).unwrap(), info);
    }

    #[test]
    fn test_pkcs12_der_layout() {
        let info = EncryptedPrivateKeyInfo {
            params: PbeParams::Pkcs12TripleDes {
                salt: vec![9; 8],
                iterations: 2048,
            },
            ciphertext: vec![4; 72],
        };
        let der = info.to_der().unwrap();
        assert_eq!(
            hex::encode(&der[..32]),
            format!("3068301c060a2a864886f70d010c0103300e0408{}02020800", "09".repeat(8))
        );
        assert_eq!(EncryptedPrivateKeyInfo::from_der(&der).unwrap(), info);
    }

    #[test]
    fn test_parse_unknown_scheme() {
        let der = Asn1::Sequence(vec![
            Asn1::Sequence(vec![
                Asn1::oid(der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.3")),
                Asn1::Sequence(vec![Asn1::octets(&[0; 8]), uint(1)]),
            ]),
            Asn1::octets(&[0; 8]),
        ])
        .to_der()
        .unwrap();
        let result = EncryptedPrivateKeyInfo::from_der(&der);
        assert!(matches!(result, Err(PeerKeyError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_parse_unknown_prf() {
        let md5 = der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.2.5");
        let der = Asn1::Sequence(vec![
            Asn1::Sequence(vec![
                Asn1::oid(PBES2_OID),
                Asn1::Sequence(vec![
                    Asn1::Sequence(vec![
                        Asn1::oid(PBKDF2_OID),
                        Asn1::Sequence(vec![
                            Asn1::octets(&[0; 8]),
                            uint(1),
                            Asn1::Sequence(vec![Asn1::oid(md5), Asn1::Null]),
                        ]),
                    ]),
                    Asn1::Sequence(vec![
                        Asn1::oid(CipherAlgorithm::Aes128.spec().cipher_oid),
                        Asn1::octets(&[0; 16]),
                    ]),
                ]),
            ]),
            Asn1::octets(&[0; 16]),
        ])
        .to_der()
        .unwrap();
        let result = EncryptedPrivateKeyInfo::from_der(&der);
        assert!(matches!(result, Err(PeerKeyError::UnsupportedDigest(_))));
    }

    #[test]
    fn test_parse_mismatched_key_length() {
        let info = EncryptedPrivateKeyInfo {
            params: PbeParams::Pbes2 {
                salt: vec![1; 8],
                iterations: 1,
                key_length: Some(16),
                prf: PrfDigest::Sha256,
                cipher: CipherAlgorithm::Aes256,
                iv: vec![2; 16],
            },
            ciphertext: vec![3; 16],
        };
        let result = EncryptedPrivateKeyInfo::from_der(&info.to_der().unwrap());
        assert!(matches!(result, Err(PeerKeyError::MalformedContainer(_))));
    }

    #[test]
    fn test_parse_wrong_iv_size() {
        let info = EncryptedPrivateKeyInfo {
            params: PbeParams::Pbes2 {
                salt: vec![1; 8],
                iterations: 1,
                key_length: None,
                prf: PrfDigest::Sha1,
                cipher: CipherAlgorithm::Aes256,
                iv: vec![2; 8],
            },
            ciphertext: vec![3; 16],
        };
        let result = EncryptedPrivateKeyInfo::from_der(&info.to_der().unwrap());
        assert!(matches!(result, Err(PeerKeyError::MalformedContainer(_))));
    }

    #[test]
    fn test_parse_plain_key_info_is_malformed() {
        let der = wrap_plain_key(&test_key()).unwrap();
        let result = EncryptedPrivateKeyInfo::from_der(&der);
        assert!(matches!(result, Err(PeerKeyError::MalformedContainer(_))));
    }

    #[test]
    fn test_parse_zero_iterations() {
        let der = Asn1::Sequence(vec![
            Asn1::Sequence(vec![
                Asn1::oid(PKCS12_3DES_OID),
                Asn1::Sequence(vec![Asn1::octets(&[0; 8]), uint(0)]),
            ]),
            Asn1::octets(&[0; 8]),
        ])
        .to_der()
        .unwrap();
        let result = EncryptedPrivateKeyInfo::from_der(&der);
        assert!(matches!(result, Err(PeerKeyError::MalformedContainer(_))));
    }
}
