//! Checksummed snapshot files
//!
//! All stores persist through the same frame: a fixed header (magic bytes,
//! format version, xxh3 checksum) followed by a bincode payload. A flipped
//! bit anywhere in the payload fails the load instead of resurrecting a
//! silently wrong store.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Magic bytes identifying a MnemoDB snapshot file
const MAGIC: [u8; 4] = *b"MNEM";

/// Current snapshot format version
const VERSION: u16 = 1;

/// Header: magic (4) + version (2) + checksum (8)
const HEADER_LEN: usize = 14;

/// Serialize `value` and write it to `path` inside a checksummed frame
pub fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))?;
    let checksum = xxhash_rust::xxh3::xxh3_64(&payload);

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&checksum.to_le_bytes());
    bytes.extend_from_slice(&payload);

    fs::write(path, bytes)?;
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`], verifying the frame
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;

    if bytes.len() < HEADER_LEN {
        return Err(Error::SnapshotCorrupt(format!(
            "file too short for snapshot header: {} bytes",
            bytes.len()
        )));
    }

    if bytes[0..4] != MAGIC {
        return Err(Error::SnapshotCorrupt(
            "bad magic bytes, not a snapshot file".to_string(),
        ));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(Error::SnapshotCorrupt(format!(
            "unsupported snapshot version {version}"
        )));
    }

    let stored = u64::from_le_bytes([
        bytes[6], bytes[7], bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13],
    ]);
    let payload = &bytes[HEADER_LEN..];
    let computed = xxhash_rust::xxh3::xxh3_64(payload);
    if stored != computed {
        return Err(Error::SnapshotCorrupt(format!(
            "checksum mismatch: stored {stored:#018x}, computed {computed:#018x}"
        )));
    }

    bincode::deserialize(payload).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        values: Vec<f32>,
    }

    fn sample() -> Sample {
        Sample {
            name: "probe".to_string(),
            values: vec![0.25, -1.5, 3.0],
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.snap");

        write_snapshot(&path, &sample()).unwrap();
        let restored: Sample = read_snapshot(&path).unwrap();

        assert_eq!(restored, sample());
    }

    #[test]
    fn test_snapshot_detects_payload_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.snap");

        write_snapshot(&path, &sample()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let result: Result<Sample> = read_snapshot(&path);
        assert!(matches!(result, Err(Error::SnapshotCorrupt(_))));
    }

    #[test]
    fn test_snapshot_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.snap");

        write_snapshot(&path, &sample()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = b'X';
        fs::write(&path, bytes).unwrap();

        let result: Result<Sample> = read_snapshot(&path);
        assert!(matches!(result, Err(Error::SnapshotCorrupt(_))));
    }

    #[test]
    fn test_snapshot_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.snap");

        fs::write(&path, [0u8; 5]).unwrap();

        let result: Result<Sample> = read_snapshot(&path);
        assert!(matches!(result, Err(Error::SnapshotCorrupt(_))));
    }

    #[test]
    fn test_snapshot_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-written.snap");

        let result: Result<Sample> = read_snapshot(&path);
        assert!(result.as_ref().err().map(Error::is_io_error).unwrap_or(false));
    }
}
