//! SHA-256 helpers shared by schema sources, the cache, and the lock file.
//!
//! Every hash in repoconf is the lowercase hex SHA-256 of the raw bytes, whichever source
//! produced them.

use sha2::{Digest, Sha256};
use std::io;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Buffers bytes while hashing them, so a download is hashed as it streams in.
#[derive(Debug, Clone, Default)]
pub struct HashingBuffer {
    data: Vec<u8>,
    hasher: Sha256,
}

impl HashingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
        self.hasher.update(chunk);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the buffer, returning the bytes and their hex hash.
    pub fn finish(self) -> (Vec<u8>, String) {
        (self.data, hex::encode(self.hasher.finalize()))
    }
}

impl io::Write for HashingBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut buf = HashingBuffer::new();
        buf.update(b"{\"documents\":");
        buf.write_all(b"[]}").unwrap();
        assert_eq!(buf.len(), 16);

        let (data, hash) = buf.finish();
        assert_eq!(data, b"{\"documents\":[]}");
        assert_eq!(hash, sha256_hex(&data));
    }

    #[test]
    fn empty_buffer_hashes_empty_input() {
        let buf = HashingBuffer::new();
        assert!(buf.is_empty());
        let (data, hash) = buf.finish();
        assert!(data.is_empty());
        assert_eq!(hash, sha256_hex(b""));
    }
}
