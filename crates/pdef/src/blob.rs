//! Helpers for storing encoded pdata as an opaque blob.
//!
//! The codec output is hashed for change detection and optionally zstd
//! compressed before it is persisted. Nothing here inspects the bytes.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::BlobError;
use crate::limits::{DEFAULT_ZSTD_LEVEL, MAX_PDATA_SIZE};

/// SHA-256 of an encoded pdata blob (before compression).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PdataHash(pub [u8; 32]);

impl PdataHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PdataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PdataHash {
    type Err = BlobError;

    /// Parses 64 hex digits (either case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|_| BlobError::InvalidHash(s.to_string()))?;
        Ok(PdataHash(out))
    }
}

/// Hashes encoded pdata.
pub fn pdata_hash(data: &[u8]) -> PdataHash {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    PdataHash(out)
}

/// Compression applied to a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Zstd,
}

impl Compression {
    /// Label persisted next to the blob (empty for uncompressed).
    pub fn label(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Zstd => "zstd",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Compression {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Compression::None),
            "zstd" => Ok(Compression::Zstd),
            other => Err(BlobError::UnknownCompression(other.to_string())),
        }
    }
}

/// How encoded pdata is packed for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobOptions {
    pub compression: Compression,
    /// zstd level; ignored when uncompressed.
    pub level: i32,
}

impl Default for BlobOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Zstd,
            level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

impl BlobOptions {
    /// Stores blobs as-is.
    pub fn uncompressed() -> Self {
        Self {
            compression: Compression::None,
            level: DEFAULT_ZSTD_LEVEL,
        }
    }

    /// zstd at the given level.
    pub fn zstd(level: i32) -> Self {
        Self {
            compression: Compression::Zstd,
            level,
        }
    }
}

/// Compresses `data` according to `options`.
pub fn compress(data: &[u8], options: &BlobOptions) -> Result<Vec<u8>, BlobError> {
    if data.len() > MAX_PDATA_SIZE {
        return Err(BlobError::TooLarge {
            len: data.len(),
            max: MAX_PDATA_SIZE,
        });
    }
    match options.compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Zstd => zstd::encode_all(data, options.level)
            .map_err(|e| BlobError::CompressionFailed(e.to_string())),
    }
}

/// Reverses [`compress`]. Output larger than [`MAX_PDATA_SIZE`] is rejected
/// without being fully inflated.
pub fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>, BlobError> {
    match compression {
        Compression::None => {
            if data.len() > MAX_PDATA_SIZE {
                return Err(BlobError::TooLarge {
                    len: data.len(),
                    max: MAX_PDATA_SIZE,
                });
            }
            Ok(data.to_vec())
        }
        Compression::Zstd => {
            let decoder = zstd::Decoder::new(data)
                .map_err(|e| BlobError::DecompressionFailed(e.to_string()))?;

            let mut out = Vec::new();
            decoder
                .take(MAX_PDATA_SIZE as u64 + 1)
                .read_to_end(&mut out)
                .map_err(|e| BlobError::DecompressionFailed(e.to_string()))?;

            if out.len() > MAX_PDATA_SIZE {
                return Err(BlobError::TooLarge {
                    len: out.len(),
                    max: MAX_PDATA_SIZE,
                });
            }
            Ok(out)
        }
    }
}

/// An encoded pdata blob as persisted by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPdata {
    pub compression: Compression,
    /// Hash of the uncompressed bytes.
    pub hash: PdataHash,
    pub data: Vec<u8>,
}

impl StoredPdata {
    /// Hashes and compresses encoded pdata.
    pub fn pack(encoded: &[u8], options: &BlobOptions) -> Result<Self, BlobError> {
        let hash = pdata_hash(encoded);
        let data = compress(encoded, options)?;
        debug!(
            size = encoded.len(),
            stored = data.len(),
            compression = options.compression.label(),
            %hash,
            "packed pdata"
        );
        Ok(Self {
            compression: options.compression,
            hash,
            data,
        })
    }

    /// Decompresses the blob and verifies its hash.
    pub fn unpack(&self) -> Result<Vec<u8>, BlobError> {
        let encoded = decompress(&self.data, self.compression)?;
        let actual = pdata_hash(&encoded);
        if actual != self.hash {
            return Err(BlobError::HashMismatch {
                expected: self.hash.to_hex(),
                actual: actual.to_hex(),
            });
        }
        debug!(
            size = encoded.len(),
            stored = self.data.len(),
            compression = self.compression.label(),
            "unpacked pdata"
        );
        Ok(encoded)
    }

    /// Returns true if `encoded` differs from what this blob holds.
    pub fn is_changed(&self, encoded: &[u8]) -> bool {
        pdata_hash(encoded) != self.hash
    }
}
