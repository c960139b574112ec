//! Error types for the peerkey library.
//!
//! Every failure an operation can hit is a variant of [`PeerKeyError`].
//! Expected outcomes such as a wrong password or a missing key are ordinary
//! variants, so callers match on them instead of catching anything.

use thiserror::Error;

/// The main error type for peerkey operations.
#[derive(Error, Debug)]
pub enum PeerKeyError {
    /// Unknown cipher, scheme, KDF or key algorithm (by name or OID)
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Unknown PRF digest (by name or OID)
    #[error("Unsupported digest: {0}")]
    UnsupportedDigest(String),

    /// The input is not a well-formed key container
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Decryption produced invalid padding or an invalid payload.
    ///
    /// This is the signal for a wrong password.
    #[error("Integrity check failed: wrong password or corrupted ciphertext")]
    IntegrityError,

    /// A key already exists under this name
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// No key exists under this name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence layer I/O error
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A store operation timed out or was cancelled
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Raw key material has the wrong shape for its curve
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The keystore name is not a valid path-like name
    #[error("Invalid key name: {0}")]
    InvalidKeyName(String),

    /// Encryption options are out of range
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for peerkey operations.
pub type Result<T> = std::result::Result<T, PeerKeyError>;
