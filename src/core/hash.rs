use serde::{Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-file BLAKE3 digest. Two files with equal digests are treated as
/// byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactDigest([u8; blake3::OUT_LEN]);

impl From<blake3::Hash> for ExactDigest {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl fmt::Display for ExactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for ExactDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Computes exact-content digests of files
pub struct HashService;

impl HashService {
    pub fn new() -> Self {
        Self
    }

    /// Stream the file through BLAKE3 and return its digest
    pub fn compute_content_hash(&self, file_path: &Path) -> Result<ExactDigest, HashError> {
        let file = File::open(file_path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0; 8192];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize().into())
    }
}

impl Default for HashService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_compute_content_hash_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("photo.png");
        fs::write(&file_path, b"not really a png").unwrap();

        let hash_service = HashService::new();
        let hash = hash_service.compute_content_hash(&file_path).unwrap();
        let hash2 = hash_service.compute_content_hash(&file_path).unwrap();
        assert_eq!(hash, hash2);

        // 32 bytes rendered as 64 hex characters
        let hex = hash.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_matches_single_shot_blake3() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("large.jpg");

        // Spans several read buffers
        let content: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&file_path, &content).unwrap();

        let hash = HashService::new().compute_content_hash(&file_path).unwrap();
        assert_eq!(hash, ExactDigest::from(blake3::hash(&content)));
    }

    #[test]
    fn test_identical_files_ignore_names() {
        let temp_dir = TempDir::new().unwrap();
        let file1 = temp_dir.path().join("IMG_0001.JPG");
        let file2 = temp_dir.path().join("copy of holiday.jpeg");

        fs::write(&file1, b"Identical content").unwrap();
        fs::write(&file2, b"Identical content").unwrap();

        let hash_service = HashService::new();
        assert_eq!(
            hash_service.compute_content_hash(&file1).unwrap(),
            hash_service.compute_content_hash(&file2).unwrap()
        );
    }

    #[test]
    fn test_different_files_different_hash() {
        let temp_dir = TempDir::new().unwrap();
        let file1 = temp_dir.path().join("a.png");
        let file2 = temp_dir.path().join("b.png");

        fs::write(&file1, b"Content A").unwrap();
        fs::write(&file2, b"Content B").unwrap();

        let hash_service = HashService::new();
        assert_ne!(
            hash_service.compute_content_hash(&file1).unwrap(),
            hash_service.compute_content_hash(&file2).unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone.png");

        let result = HashService::new().compute_content_hash(&missing);
        assert!(matches!(result, Err(HashError::Io(_))));
    }

    #[test]
    fn test_digest_serializes_as_hex() {
        let digest = ExactDigest::from(blake3::hash(b"abc"));
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest));
    }
}
