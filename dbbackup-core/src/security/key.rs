//! Symmetric key derivation from the configured secret.
//!
//! # Compatibility
//! The secret's bytes are copied into a zeroed 32-byte buffer: shorter
//! secrets are zero-padded, longer ones truncated. This is not a key
//! derivation function. Every existing backup was sealed under this scheme,
//! so replacing it would make those backups undecryptable.

use zeroize::Zeroizing;

/// AES-256 key size: 256 bits (32 bytes)
pub const KEY_SIZE: usize = 32;

/// A 256-bit key that is zeroed when dropped.
///
/// Derived once per run and held only in memory. `Debug` never prints the
/// key bytes.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_SIZE]>);

impl SymmetricKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Derives the backup key from `secret`.
///
/// # Example
/// ```rust
/// use dbbackup_core::security::derive_key;
///
/// let key = derive_key("abc");
/// assert_eq!(&key.as_bytes()[..3], b"abc");
/// assert!(key.as_bytes()[3..].iter().all(|&b| b == 0));
/// ```
pub fn derive_key(secret: &str) -> SymmetricKey {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    let bytes = secret.as_bytes();
    let len = bytes.len().min(KEY_SIZE);
    key[..len].copy_from_slice(&bytes[..len]);
    SymmetricKey(key)
}
