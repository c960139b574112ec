//! Block cipher encryption and decryption in CBC mode.
//!
//! This module encrypts and decrypts key containers with AES-128/192/256,
//! DES or 3DES in CBC mode with PKCS#7 padding. The engine is stateless.

use crate::crypto::algorithms::CipherAlgorithm;
use crate::error::{PeerKeyError, Result};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

/// Generate a random IV for the given cipher.
pub fn generate_iv(algorithm: CipherAlgorithm) -> Vec<u8> {
    crate::crypto::kdf::generate_salt(algorithm.iv_size())
}

/// Encrypt `plaintext` with the given key and IV.
///
/// # Panics
///
/// Panics if `key` or `iv` do not have the sizes the algorithm table fixes
/// for `algorithm`.
///
/// # Example
///
/// ```
/// use peerkey::crypto::algorithms::CipherAlgorithm;
/// use peerkey::crypto::cipher::{decrypt, encrypt};
///
/// let key = [7u8; 32];
/// let iv = [9u8; 16];
/// let ciphertext = encrypt(b"secret key info", &key, &iv, CipherAlgorithm::Aes256);
/// let plaintext = decrypt(&ciphertext, &key, &iv, CipherAlgorithm::Aes256).unwrap();
/// assert_eq!(plaintext.as_slice(), b"secret key info");
/// ```
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8], algorithm: CipherAlgorithm) -> Vec<u8> {
    check_sizes(key, iv, algorithm);

    match algorithm {
        CipherAlgorithm::Aes128 => cbc::Encryptor::<aes::Aes128>::new(key.into(), iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        CipherAlgorithm::Aes192 => cbc::Encryptor::<aes::Aes192>::new(key.into(), iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        CipherAlgorithm::Aes256 => cbc::Encryptor::<aes::Aes256>::new(key.into(), iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        CipherAlgorithm::Des => cbc::Encryptor::<des::Des>::new(key.into(), iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        CipherAlgorithm::TripleDes => cbc::Encryptor::<des::TdesEde3>::new(key.into(), iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    }
}

/// Decrypt `ciphertext` with the given key and IV.
///
/// Returns [`PeerKeyError::IntegrityError`] when the ciphertext is empty,
/// not a whole number of blocks, or carries invalid padding. With a
/// well-formed container that means the password was wrong.
///
/// # Panics
///
/// Panics if `key` or `iv` do not match the algorithm table.
pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8],
    iv: &[u8],
    algorithm: CipherAlgorithm,
) -> Result<Zeroizing<Vec<u8>>> {
    check_sizes(key, iv, algorithm);

    let block_size = algorithm.iv_size();
    if ciphertext.is_empty() || ciphertext.len() % block_size != 0 {
        return Err(PeerKeyError::IntegrityError);
    }

    let plaintext = match algorithm {
        CipherAlgorithm::Aes128 => cbc::Decryptor::<aes::Aes128>::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        CipherAlgorithm::Aes192 => cbc::Decryptor::<aes::Aes192>::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        CipherAlgorithm::Aes256 => cbc::Decryptor::<aes::Aes256>::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        CipherAlgorithm::Des => cbc::Decryptor::<des::Des>::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        CipherAlgorithm::TripleDes => cbc::Decryptor::<des::TdesEde3>::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
    };

    plaintext
        .map(Zeroizing::new)
        .map_err(|_| PeerKeyError::IntegrityError)
}

fn check_sizes(key: &[u8], iv: &[u8], algorithm: CipherAlgorithm) {
    assert_eq!(
        key.len(),
        algorithm.key_size(),
        "{} requires a {}-byte key",
        algorithm,
        algorithm.key_size()
    );
    assert_eq!(
        iv.len(),
        algorithm.iv_size(),
        "{} requires a {}-byte IV",
        algorithm,
        algorithm.iv_size()
    );
}
