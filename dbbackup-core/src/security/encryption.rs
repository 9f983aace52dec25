//! AES-GCM-256 file encryption for backup artifacts.
//!
//! Every backup is sealed with a fresh random 96-bit nonce and no associated
//! data. The on-disk blob is self-describing:
//!
//! ```text
//! +----------------+---------------------------+-----------------+
//! | nonce (12 B)   | ciphertext (len of input) | auth tag (16 B) |
//! +----------------+---------------------------+-----------------+
//! ```
//!
//! Decryption needs only the blob and the key.
//!
//! # Scaling
//! Files are read fully into memory before sealing or opening. Backups are
//! expected to fit comfortably in RAM on the host running the job.
//!
//! # Cryptographic Standards
//! - AES-GCM: NIST SP 800-38D
//! - Key size: 256 bits

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use tokio::io::AsyncWriteExt;

use super::key::SymmetricKey;
use crate::error::{DbBackupError, Result};

/// AES-GCM nonce size: 96 bits (12 bytes)
///
/// **Standard:** NIST SP 800-38D §8.2.1
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size: 128 bits (16 bytes)
///
/// **Standard:** NIST SP 800-38D §5.2.1, Table 2
pub const TAG_SIZE: usize = 16;

/// Extension carried by encrypted backup files.
pub const ENCRYPTED_EXTENSION: &str = "enc";

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key)
        .map_err(|e| DbBackupError::crypto_setup(format!("invalid AES-256 key: {}", e)))
}

/// Seals `plaintext` and returns `nonce ‖ ciphertext ‖ tag`.
///
/// # Example
/// ```rust
/// use dbbackup_core::security::{derive_key, encryption::{open, seal}};
///
/// let key = derive_key("backup-secret");
/// let blob = seal(b"-- MySQL dump", &key)?;
/// assert_eq!(open(&blob, &key)?, b"-- MySQL dump");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn seal(plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    let cipher = build_cipher(key.as_bytes())?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| DbBackupError::crypto_setup(format!("encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE.saturating_add(sealed.len()));
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Verifies and decrypts a blob produced by [`seal`].
///
/// # Errors
/// - [`DbBackupError::Format`] if the blob is shorter than the nonce; no
///   cipher is constructed in that case
/// - [`DbBackupError::Authentication`] if the tag does not verify (wrong key,
///   tampering or truncation)
pub fn open(blob: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    if blob.len() < NONCE_SIZE {
        return Err(DbBackupError::format(format!(
            "ciphertext too short: {} bytes, nonce alone is {} bytes",
            blob.len(),
            NONCE_SIZE
        )));
    }

    let cipher = build_cipher(key.as_bytes())?;
    let (nonce, sealed) = blob.split_at(NONCE_SIZE);

    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| DbBackupError::Authentication)
}

/// Encrypts the file at `plaintext_path` into `ciphertext_path`.
pub async fn encrypt_file(
    plaintext_path: &Path,
    ciphertext_path: &Path,
    key: &SymmetricKey,
) -> Result<()> {
    let plaintext = tokio::fs::read(plaintext_path).await.map_err(|e| {
        DbBackupError::io(
            format!("Failed to read {}", plaintext_path.display()),
            e,
        )
    })?;

    let blob = seal(&plaintext, key)?;
    drop(plaintext);

    write_owner_only(ciphertext_path, &blob).await
}

/// Decrypts the blob at `ciphertext_path` into `plaintext_path`.
///
/// Nothing is written unless the blob authenticates.
pub async fn decrypt_file(
    ciphertext_path: &Path,
    plaintext_path: &Path,
    key: &SymmetricKey,
) -> Result<()> {
    let blob = tokio::fs::read(ciphertext_path).await.map_err(|e| {
        DbBackupError::io(
            format!("Failed to read {}", ciphertext_path.display()),
            e,
        )
    })?;

    let plaintext = open(&blob, key)?;
    write_owner_only(plaintext_path, &plaintext).await
}

/// Destination for a decrypted backup.
///
/// `db_x_backup_20250101_000000.sql.enc` becomes `db_x_backup_20250101_000000.sql`.
/// A path without the `.enc` extension gets `.dec` appended so the input is
/// never overwritten.
pub fn decrypted_output_path(ciphertext_path: &Path) -> PathBuf {
    if ciphertext_path
        .extension()
        .is_some_and(|ext| ext == ENCRYPTED_EXTENSION)
    {
        ciphertext_path.with_extension("")
    } else {
        append_extension(ciphertext_path, "dec")
    }
}

/// Appends `.{extension}` to the full file name, keeping existing extensions.
pub fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

async fn write_owner_only(path: &Path, contents: &[u8]) -> Result<()> {
    let context = || format!("Failed to write {}", path.display());

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| DbBackupError::io(context(), e))?;
    file.write_all(contents)
        .await
        .map_err(|e| DbBackupError::io(context(), e))?;
    file.flush()
        .await
        .map_err(|e| DbBackupError::io(context(), e))?;

    Ok(())
}
