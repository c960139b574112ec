//! PEM armor for key containers.

use crate::error::{PeerKeyError, Result};

/// Label of a PKCS#8 `EncryptedPrivateKeyInfo`.
pub const ENCRYPTED_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Label of an unencrypted PKCS#8 `PrivateKeyInfo`.
pub const PLAIN_LABEL: &str = "PRIVATE KEY";

/// Wrap DER bytes in PEM armor with the given label.
pub fn encode(label: &str, der: &[u8]) -> String {
    pem::encode(&pem::Pem::new(label, der.to_vec()))
}

/// Parse a single PEM block, returning its label and DER body.
pub fn decode(pem_str: &str) -> Result<(String, Vec<u8>)> {
    let parsed = pem::parse(pem_str)
        .map_err(|e| PeerKeyError::MalformedContainer(format!("Failed to read PEM: {}", e)))?;
    Ok((parsed.tag().to_string(), parsed.contents().to_vec()))
}
