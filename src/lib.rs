//! peerkey: password-protected storage for peer signing keys
//!
//! This library keeps a peer's long-term private key safe at rest. It lets
//! callers:
//!
//! - Encrypt raw secp256k1 or Ed25519 keys into standard PKCS#8
//!   `EncryptedPrivateKeyInfo` containers (PBES2 or PKCS#12 3DES)
//! - Decrypt such containers, including ones written by OpenSSL
//! - Keep containers in a name-indexed store on disk or in memory
//!
//! # Architecture
//!
//! Raw key bytes are wrapped as a `PrivateKeyInfo`, encrypted under a
//! password-derived key, wrapped again as an `EncryptedPrivateKeyInfo`, and
//! stored as PEM under `/privKeys/<name>`. Loading reverses each step. All
//! operations return `Result`; a wrong password or a missing key is an
//! ordinary error variant.
//!
//! # Example
//!
//! ```rust,no_run
//! use peerkey::crypto::key::RawKeyMaterial;
//! use peerkey::storage::keystore::{encrypt_and_store, load_and_decrypt};
//! use peerkey::storage::FsKeyStore;
//! use peerkey::Result;
//!
//! async fn example(secret: &[u8]) -> Result<()> {
//!     let store = FsKeyStore::open("/var/lib/peer/keystore").await?;
//!     let key = RawKeyMaterial::secp256k1(secret)?;
//!
//!     encrypt_and_store(&store, "self", &key, "correct horse").await?;
//!     let loaded = load_and_decrypt(&store, "self", "correct horse").await?;
//!     assert_eq!(loaded, key);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod container;
pub mod crypto;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use config::KeystoreConfig;
pub use container::{EncryptionOptions, KeyContainer, Protection};
pub use crypto::key::{KeyCurve, RawKeyMaterial};
pub use error::{PeerKeyError, Result};
