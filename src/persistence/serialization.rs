//! On-disk index encodings: compact JSON, or a CRC-checked bincode frame.
//!
//! Binary frame layout (little-endian):
//! `[magic: b"RIMX"][format: u32][crc32: u32][len: u64][payload: bincode(IndexFile)]`

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MatcherError, Result};
use crate::extractor::SchemeTag;
use crate::index::ReferenceIndex;
use crate::vector::FeatureVector;

const MAGIC: &[u8; 4] = b"RIMX";
const FRAME_FORMAT: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Serializable representation of the full index.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexFile {
    pub scheme: SchemeTag,
    pub entries: BTreeMap<String, FeatureVector>,
}

impl From<&ReferenceIndex> for IndexFile {
    fn from(index: &ReferenceIndex) -> Self {
        IndexFile {
            scheme: index.scheme(),
            entries: index
                .iter()
                .map(|(name, vector)| (name.to_string(), vector.clone()))
                .collect(),
        }
    }
}

/// How the index file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Json,
    Binary,
}

impl IndexFormat {
    /// `.json` files are JSON; anything else uses the binary frame.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => IndexFormat::Json,
            _ => IndexFormat::Binary,
        }
    }

    pub fn encode(&self, file: &IndexFile) -> Result<Vec<u8>> {
        match self {
            IndexFormat::Json => to_json(file),
            IndexFormat::Binary => encode_frame(file),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<IndexFile> {
        match self {
            IndexFormat::Json => from_json(bytes),
            IndexFormat::Binary => decode_frame(bytes),
        }
    }
}

/// Encode data to bincode bytes.
pub fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| MatcherError::SerializationError(e.to_string()))
}

/// Decode data from bincode bytes.
pub fn from_bincode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| MatcherError::SerializationError(e.to_string()))
}

/// Encode data to JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| MatcherError::SerializationError(e.to_string()))
}

/// Decode data from JSON bytes.
pub fn from_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| MatcherError::SerializationError(e.to_string()))
}

/// Wrap a bincode payload in the checksummed frame.
pub fn encode_frame(file: &IndexFile) -> Result<Vec<u8>> {
    let payload = to_bincode(file)?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FRAME_FORMAT.to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Validate and unwrap a checksummed frame.
pub fn decode_frame(bytes: &[u8]) -> Result<IndexFile> {
    if bytes.len() < HEADER_LEN {
        return Err(MatcherError::SerializationError(
            "truncated index header".to_string(),
        ));
    }
    if &bytes[0..4] != MAGIC {
        return Err(MatcherError::SerializationError(
            "not an index file (bad magic)".to_string(),
        ));
    }

    let u32_at =
        |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let format = u32_at(4);
    if format != FRAME_FORMAT {
        return Err(MatcherError::SerializationError(format!(
            "unsupported frame format {format}"
        )));
    }
    let expected_crc = u32_at(8);

    let mut len_buf = [0u8; 8];
    len_buf.copy_from_slice(&bytes[12..20]);
    let len = u64::from_le_bytes(len_buf) as usize;

    let payload = &bytes[HEADER_LEN..];
    if payload.len() != len {
        return Err(MatcherError::SerializationError(format!(
            "payload length {} does not match header {len}",
            payload.len()
        )));
    }
    if crc32fast::hash(payload) != expected_crc {
        return Err(MatcherError::SerializationError(
            "checksum mismatch".to_string(),
        ));
    }

    from_bincode(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexFile {
        let mut entries = BTreeMap::new();
        entries.insert("cat".to_string(), FeatureVector::new(vec![1, 2, 3]));
        entries.insert("Dog".to_string(), FeatureVector::new(vec![4, 5, 6]));
        IndexFile {
            scheme: SchemeTag {
                version: 1,
                canonical_size: 1,
            },
            entries,
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(IndexFormat::from_path(Path::new("image_index.json")), IndexFormat::Json);
        assert_eq!(IndexFormat::from_path(Path::new("INDEX.JSON")), IndexFormat::Json);
        assert_eq!(IndexFormat::from_path(Path::new("index.bin")), IndexFormat::Binary);
        assert_eq!(IndexFormat::from_path(Path::new("index")), IndexFormat::Binary);
    }

    #[test]
    fn test_json_layout() {
        let bytes = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["scheme"]["canonical_size"], 1);
        assert_eq!(value["entries"]["cat"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_frame_roundtrip() {
        let bytes = encode_frame(&sample()).unwrap();
        assert_eq!(&bytes[0..4], b"RIMX");
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded.entries.len(), 2);
        assert_eq!(decoded.entries["Dog"].as_slice(), &[4, 5, 6]);
    }

    #[test]
    fn test_frame_detects_corruption() {
        let mut bytes = encode_frame(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = decode_frame(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_frame_detects_truncation() {
        let bytes = encode_frame(&sample()).unwrap();
        assert!(decode_frame(&bytes[..bytes.len() - 2]).is_err());
        assert!(decode_frame(&bytes[..10]).is_err());
    }

    #[test]
    fn test_frame_rejects_json() {
        let bytes = to_json(&sample()).unwrap();
        let err = decode_frame(&bytes).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }
}
