//! Key handling and authenticated encryption of backup files.
//!
//! # Security Guarantees
//! - Keys are stored in `Zeroizing` containers for automatic memory clearing
//! - Every encryption uses a fresh random nonce from the OS RNG
//! - Decryption verifies the AES-GCM tag before any plaintext is released
//!
//! # Module Structure
//! - `key`: derivation of the 256-bit key from the configured secret
//! - `encryption`: AES-GCM-256 sealing of whole files

mod key;

pub mod encryption;

// Re-export public types
pub use key::{KEY_SIZE, SymmetricKey, derive_key};
