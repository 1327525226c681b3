//! # Fingerprint Module
//!
//! SHA-256 content digests used as the duplicate-equality key.
//!
//! The digest depends only on the bytes of a file, never on its name or
//! location, so two copies of a photo anywhere on disk fingerprint the same.

use crate::error::FingerprintError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Bytes read per chunk
pub const CHUNK_SIZE: usize = 8192;

/// Length of a hex fingerprint
pub const FINGERPRINT_LEN: usize = 64;

/// Hash a file's content
pub fn fingerprint_file(path: &Path) -> Result<String, FingerprintError> {
    let io_error = |source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    fingerprint_reader(&mut file).map_err(io_error)
}

/// Hash everything readable from `reader`
pub fn fingerprint_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let count = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..count]);
    }

    Ok(to_hex(&hasher.finalize()))
}

/// Whether `s` has the shape of a fingerprint
pub fn is_fingerprint(s: &str) -> bool {
    s.len() == FINGERPRINT_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn known_digests() {
        assert_eq!(fingerprint_reader(&mut &b""[..]).unwrap(), EMPTY_SHA256);
        assert_eq!(fingerprint_reader(&mut &b"abc"[..]).unwrap(), ABC_SHA256);
    }

    #[test]
    fn identical_content_under_different_names_matches() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "IMG_0001.JPG", b"same bytes");
        let b = write_file(&dir, "copy of photo.jpg", b"same bytes");

        assert_eq!(fingerprint_file(&a).unwrap(), fingerprint_file(&b).unwrap());
    }

    #[test]
    fn different_content_differs() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.jpg", b"one");
        let b = write_file(&dir, "b.jpg", b"two");

        assert_ne!(fingerprint_file(&a).unwrap(), fingerprint_file(&b).unwrap());
    }

    #[test]
    fn content_spanning_many_chunks() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let path = write_file(&dir, "big.jpg", &content);

        let digest = fingerprint_file(&path).unwrap();
        assert_eq!(digest, fingerprint_reader(&mut content.as_slice()).unwrap());
        assert!(is_fingerprint(&digest));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = fingerprint_file(Path::new("/nonexistent/file.jpg"));
        match result {
            Err(FingerprintError::Io { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/file.jpg"))
            }
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn fingerprint_shape() {
        assert!(is_fingerprint(ABC_SHA256));
        assert!(!is_fingerprint("abc"));
        assert!(!is_fingerprint(&ABC_SHA256.to_uppercase()));
    }
}
