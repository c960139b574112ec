//! Cryptographic primitives module.
//!
//! This module provides the building blocks of key containers:
//!
//! - Raw private key material for secp256k1 and Ed25519
//! - Password-based key derivation (PBKDF2 and the PKCS#12 KDF)
//! - CBC block ciphers with PKCS#7 padding
//! - The table of supported ciphers and PRFs
//!
//! # Example
//!
//! ```rust
//! use peerkey::crypto::algorithms::CipherAlgorithm;
//! use peerkey::crypto::cipher::{decrypt, encrypt, generate_iv};
//! use peerkey::crypto::kdf::{derive, generate_salt, PrfDigest};
//!
//! # fn example() -> peerkey::Result<()> {
//! let algorithm = CipherAlgorithm::Aes256;
//! let salt = generate_salt(16);
//! let key = derive(b"secure-password", &salt, 1000, algorithm.key_size(), PrfDigest::Sha512)?;
//! let iv = generate_iv(algorithm);
//!
//! let ciphertext = encrypt(b"private key info", &key, &iv, algorithm);
//! let plaintext = decrypt(&ciphertext, &key, &iv, algorithm)?;
//! assert_eq!(plaintext.as_slice(), b"private key info");
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod cipher;
pub mod kdf;
pub mod key;
