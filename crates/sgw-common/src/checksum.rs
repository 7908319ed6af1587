//! Content hashing of raw artifact bytes
//!
//! Hashes are computed over the bytes as they sit on disk, streamed in
//! [`HASH_CHUNK_SIZE`] chunks, so they stay stable no matter how the payload is
//! later parsed.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the read buffer used while hashing
pub const HASH_CHUNK_SIZE: usize = 8192;

/// Hex-encoded SHA-256 digest of an artifact's raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already computed hex digest (e.g. one loaded from the store)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_lowercase())
    }

    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Hash any readable source chunk by chunk
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; HASH_CHUNK_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        Self::from_reader(&mut file)
    }

    /// Async counterpart of [`ContentHash::from_reader`]
    pub async fn from_async_reader<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub async fn from_file_async(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = tokio::fs::File::open(path).await?;
        Self::from_async_reader(&mut file).await
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
