//! Native `.cpse` storage format.
//!
//! The format is a 32-byte header followed by a Postcard-encoded payload of
//! the forest's trees.
//!
//! # Format Structure
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("CPSE")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       1     Model type
//! 7       1     Reserved
//! 8       4     Payload size (bytes, little-endian)
//! 12      4     CRC32 checksum of payload
//! 16      4     Number of trees
//! 20      4     Number of classes
//! 24      8     Reserved
//! ```
//!
//! OOB row arrays are never part of the payload: a loaded forest is the
//! saved forest with its OOB arrays dropped, which is exactly the
//! persistence invariant callers rely on.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repr::{Forest, Tree};

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a copse model file.
pub const MAGIC: &[u8; 4] = b"CPSE";

/// Current format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

// ============================================================================
// Model Type
// ============================================================================

/// Model type identifier stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModelType {
    /// Random forest classifier.
    RandomForest = 0,
}

impl ModelType {
    /// Convert from u8, returning None for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::RandomForest),
            _ => None,
        }
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 32-byte header for the native storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    /// Format version (major).
    pub version_major: u8,
    /// Format version (minor).
    pub version_minor: u8,
    /// Model type.
    pub model_type: ModelType,
    /// Size of the payload in bytes.
    pub payload_size: u32,
    /// CRC32 checksum of the payload.
    pub checksum: u32,
    /// Number of trees in the forest.
    pub n_trees: u32,
    /// Number of distinct classes seen at training time.
    pub n_classes: u32,
}

impl FormatHeader {
    /// Create a new header with the current version.
    pub fn new(model_type: ModelType, n_trees: u32, n_classes: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            model_type,
            payload_size: 0,
            checksum: 0,
            n_trees,
            n_classes,
        }
    }

    /// Serialize header to 32 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.model_type as u8;
        buf[7] = 0;
        buf[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..20].copy_from_slice(&self.n_trees.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_classes.to_le_bytes());
        // Bytes 24..32 reserved.

        buf
    }

    /// Parse header from 32 bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotAModel);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let model_type = ModelType::from_u8(buf[6])
            .ok_or_else(|| DeserializeError::CorruptPayload("invalid model type".into()))?;

        let payload_size = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let checksum = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
        let n_trees = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
        let n_classes = u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]);

        Ok(Self {
            version_major,
            version_minor,
            model_type,
            payload_size,
            checksum,
            n_trees,
            n_classes,
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Postcard encoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}

/// Errors that can occur during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// File is not a copse model (wrong magic).
    #[error("not a copse model file")]
    NotAModel,

    /// Model requires a newer version of copse.
    #[error("model requires copse format {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Payload checksum doesn't match.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// File was truncated or incomplete.
    #[error("truncated file: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// I/O error during reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Postcard decoding error.
    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),

    /// Structurally invalid payload.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),
}

// ============================================================================
// Payload
// ============================================================================

/// Serialized forest payload. Trees only: OOB arrays are evaluation-time
/// state and never persisted.
#[derive(Debug, Serialize, Deserialize)]
struct ForestPayload {
    trees: Vec<Tree>,
}

// ============================================================================
// CRC32 Helper
// ============================================================================

/// Compute CRC32 checksum of data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ============================================================================
// Native Codec
// ============================================================================

/// Codec for serializing/deserializing forests in the native format.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl NativeCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self
    }

    /// Serialize a forest to bytes, header included.
    ///
    /// `n_classes` is recorded in the header for consumers that size class
    /// buffers before decoding the payload.
    pub fn serialize_forest(
        &self,
        forest: &Forest,
        n_classes: u32,
    ) -> Result<Vec<u8>, SerializeError> {
        let payload = ForestPayload {
            trees: forest.trees().cloned().collect(),
        };
        let payload_bytes = postcard::to_allocvec(&payload)?;

        let mut header = FormatHeader::new(
            ModelType::RandomForest,
            forest.n_trees() as u32,
            n_classes,
        );

        let mut output = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());
        self.write_to(&mut output, &mut header, &payload_bytes)?;
        Ok(output)
    }

    /// Deserialize a forest from bytes.
    ///
    /// The returned forest has empty OOB arrays, matching the saved forest
    /// after [`Forest::drop_oob`].
    pub fn deserialize_forest(
        &self,
        bytes: &[u8],
    ) -> Result<(FormatHeader, Forest), DeserializeError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let (header, payload_bytes) = self.read_from(&mut cursor)?;

        let payload: ForestPayload = postcard::from_bytes(&payload_bytes)?;
        if payload.trees.len() != header.n_trees as usize {
            return Err(DeserializeError::CorruptPayload(format!(
                "header claims {} trees, payload has {}",
                header.n_trees,
                payload.trees.len()
            )));
        }

        Ok((header, Forest::from_trees(payload.trees)))
    }

    /// Write header and payload to a writer, fixing up size and checksum.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        header: &mut FormatHeader,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        header.payload_size = payload.len() as u32;
        header.checksum = compute_checksum(payload);

        writer.write_all(&header.to_bytes())?;
        writer.write_all(payload)?;
        Ok(())
    }

    /// Read header and payload from a reader, verifying the checksum.
    pub fn read_from<R: Read>(
        &self,
        reader: &mut R,
    ) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DeserializeError::Truncated {
                    expected: HEADER_SIZE,
                    actual: 0,
                }
            } else {
                DeserializeError::Io(e)
            }
        })?;

        let header = FormatHeader::from_bytes(&header_buf)?;

        let mut payload = vec![0u8; header.payload_size as usize];
        reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DeserializeError::Truncated {
                    expected: header.payload_size as usize,
                    actual: 0,
                }
            } else {
                DeserializeError::Io(e)
            }
        })?;

        let actual = compute_checksum(&payload);
        if actual != header.checksum {
            return Err(DeserializeError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        Ok((header, payload))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::MutableTree;

    fn sample_forest() -> Forest {
        let mut forest = Forest::new();

        let mut t = MutableTree::new();
        let root = t.init_root();
        let (l, r) = t.apply_split(root, 2, 10);
        t.make_leaf(l, 0);
        t.make_leaf(r, 1);
        forest.push_tree(t.freeze(), vec![0, 3, 5]);

        let mut t = MutableTree::new();
        let root = t.init_root();
        t.make_leaf(root, 1);
        forest.push_tree(t.freeze(), vec![1]);

        forest
    }

    #[test]
    fn header_roundtrip() {
        let mut header = FormatHeader::new(ModelType::RandomForest, 10, 3);
        header.payload_size = 1234;
        header.checksum = 0xDEADBEEF;

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let parsed = FormatHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = FormatHeader::new(ModelType::RandomForest, 1, 2).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            FormatHeader::from_bytes(&bytes),
            Err(DeserializeError::NotAModel)
        ));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut bytes = FormatHeader::new(ModelType::RandomForest, 1, 2).to_bytes();
        bytes[4] = CURRENT_VERSION_MAJOR + 1;
        assert!(matches!(
            FormatHeader::from_bytes(&bytes),
            Err(DeserializeError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_forest_roundtrip_drops_oob() {
        let forest = sample_forest();
        let codec = NativeCodec::new();

        let bytes = codec.serialize_forest(&forest, 2).unwrap();
        let (header, loaded) = codec.deserialize_forest(&bytes).unwrap();

        assert_eq!(header.n_trees, 2);
        assert_eq!(header.n_classes, 2);

        let mut stripped = forest;
        stripped.drop_oob();
        assert_eq!(loaded, stripped);
    }

    #[test]
    fn test_checksum_corruption_detected() {
        let forest = sample_forest();
        let codec = NativeCodec::new();

        let mut bytes = codec.serialize_forest(&forest, 2).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        assert!(matches!(
            codec.deserialize_forest(&bytes),
            Err(DeserializeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_input_detected() {
        let forest = sample_forest();
        let codec = NativeCodec::new();

        let bytes = codec.serialize_forest(&forest, 2).unwrap();
        assert!(matches!(
            codec.deserialize_forest(&bytes[..HEADER_SIZE + 4]),
            Err(DeserializeError::Truncated { .. })
        ));
        assert!(matches!(
            codec.deserialize_forest(&bytes[..10]),
            Err(DeserializeError::Truncated { .. })
        ));
    }
}
