//! Password-based key derivation.
//!
//! This module provides PBKDF2 (RFC 8018) over an HMAC PRF, and the legacy
//! PKCS#12 key derivation (RFC 7292, Appendix B) used by the
//! `pbeWithSHAAnd3-KeyTripleDES-CBC` scheme.

use crate::error::{PeerKeyError, Result};
use hmac::Hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Default salt length in bytes.
pub const DEFAULT_SALT_SIZE: usize = 16;

/// Digest underlying the HMAC pseudorandom function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrfDigest {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    #[default]
    Sha512,
}

impl PrfDigest {
    pub fn as_str(self) -> &'static str {
        match self {
            PrfDigest::Sha1 => "sha1",
            PrfDigest::Sha224 => "sha224",
            PrfDigest::Sha256 => "sha256",
            PrfDigest::Sha384 => "sha384",
            PrfDigest::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for PrfDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrfDigest {
    type Err = PeerKeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(PrfDigest::Sha1),
            "sha224" => Ok(PrfDigest::Sha224),
            "sha256" => Ok(PrfDigest::Sha256),
            "sha384" => Ok(PrfDigest::Sha384),
            "sha512" => Ok(PrfDigest::Sha512),
            other => Err(PeerKeyError::UnsupportedDigest(other.to_string())),
        }
    }
}

/// What a PKCS#12 derivation pass produces (the "ID" diversifier byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pkcs12Purpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// Generate a random salt of the given length.
///
/// # Example
///
/// ```
/// use peerkey::crypto::kdf::generate_salt;
///
/// let salt = generate_salt(16);
/// assert_eq!(salt.len(), 16);
/// ```
pub fn generate_salt(len: usize) -> Vec<u8> {
    let mut salt = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive `output_len` bytes from a password with PBKDF2.
///
/// # Arguments
///
/// * `password` - The password bytes
/// * `salt` - The salt
/// * `iterations` - Iteration count, at least 1
/// * `output_len` - Number of bytes to derive (the cipher's key size)
/// * `prf` - Digest for the HMAC PRF
///
/// # Example
///
/// ```
/// use peerkey::crypto::kdf::{derive, PrfDigest};
///
/// let key = derive(b"password", b"salt", 1, 20, PrfDigest::Sha1).unwrap();
/// assert_eq!(hex::encode(&*key), "0c60c80f961f0e71f3a9b524af6012062fe037a6");
/// ```
pub fn derive(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
    prf: PrfDigest,
) -> Result<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        return Err(PeerKeyError::InvalidOptions(
            "iteration count must be at least 1".to_string(),
        ));
    }

    let mut output = Zeroizing::new(vec![0u8; output_len]);
    let result = match prf {
        PrfDigest::Sha1 => pbkdf2::pbkdf2::<Hmac<Sha1>>(password, salt, iterations, &mut output),
        PrfDigest::Sha224 => {
            pbkdf2::pbkdf2::<Hmac<Sha224>>(password, salt, iterations, &mut output)
        }
        PrfDigest::Sha256 => {
            pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, &mut output)
        }
        PrfDigest::Sha384 => {
            pbkdf2::pbkdf2::<Hmac<Sha384>>(password, salt, iterations, &mut output)
        }
        PrfDigest::Sha512 => {
            pbkdf2::pbkdf2::<Hmac<Sha512>>(password, salt, iterations, &mut output)
        }
    };
    result.map_err(|e| PeerKeyError::InvalidOptions(format!("PBKDF2 error: {}", e)))?;

    Ok(output)
}

/// Derive `output_len` bytes with the PKCS#12 key derivation function.
///
/// The password is converted to a NUL-terminated BMPString first, as the
/// PKCS#12 PBE schemes require.
pub fn derive_pkcs12(
    password: &str,
    salt: &[u8],
    iterations: u32,
    purpose: Pkcs12Purpose,
    output_len: usize,
    prf: PrfDigest,
) -> Result<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        return Err(PeerKeyError::InvalidOptions(
            "iteration count must be at least 1".to_string(),
        ));
    }

    let password = bmp_password(password);
    let id = purpose as u8;
    let output = match prf {
        PrfDigest::Sha1 => pkcs12_kdf::<Sha1>(64, &password, salt, iterations, id, output_len),
        PrfDigest::Sha224 => pkcs12_kdf::<Sha224>(64, &password, salt, iterations, id, output_len),
        PrfDigest::Sha256 => pkcs12_kdf::<Sha256>(64, &password, salt, iterations, id, output_len),
        PrfDigest::Sha384 => {
            pkcs12_kdf::<Sha384>(128, &password, salt, iterations, id, output_len)
        }
        PrfDigest::Sha512 => {
            pkcs12_kdf::<Sha512>(128, &password, salt, iterations, id, output_len)
        }
    };

    Ok(output)
}

/// UTF-16BE encoding with a two-byte NUL terminator.
fn bmp_password(password: &str) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity((password.len() + 1) * 2));
    for unit in password.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// `data` repeated to fill a multiple of `v` bytes; empty stays empty.
fn fill_blocks(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = v * data.len().div_ceil(v);
    data.iter().copied().cycle().take(len).collect()
}

/// RFC 7292 B.2. `v` is the digest's block size in bytes.
fn pkcs12_kdf<D: Digest>(
    v: usize,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    id: u8,
    output_len: usize,
) -> Zeroizing<Vec<u8>> {
    let u = <D as Digest>::output_size();
    let diversifier = vec![id; v];

    let mut input = Zeroizing::new(fill_blocks(salt, v));
    input.extend_from_slice(&fill_blocks(password, v));

    let mut output = Zeroizing::new(Vec::with_capacity(output_len.div_ceil(u) * u));
    while output.len() < output_len {
        let mut hasher = D::new();
        hasher.update(&diversifier);
        hasher.update(&*input);
        let mut block = hasher.finalize().to_vec();
        for _ in 1..iterations {
            block = D::digest(&block).to_vec();
        }
        output.extend_from_slice(&block);

        if output.len() >= output_len {
            break;
        }

        // I_j = (I_j + B + 1) mod 2^(8v), with B = block repeated to v bytes
        let b: Vec<u8> = block.iter().copied().cycle().take(v).collect();
        for chunk in input.chunks_mut(v) {
            let mut carry = 1u16;
            for (x, y) in chunk.iter_mut().rev().zip(b.iter().rev()) {
                let sum = *x as u16 + *y as u16 + carry;
                *x = sum as u8;
                carry = sum >> 8;
            }
        }
        block.fill(0);
    }

    output.truncate(output_len);
    output
}
