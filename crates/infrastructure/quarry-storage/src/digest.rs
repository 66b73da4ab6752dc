use crate::error::StorageError;
use camino::{Utf8Path, Utf8PathBuf};
use sha1::Digest as _;
use std::fs::File;
use std::io::{BufReader, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Md5,
    Sha1,
}

impl Algorithm {
    /// Verification preference order: SHA-1 first, MD5 as the legacy
    /// fallback.
    pub const ALL: [Algorithm; 2] = [Algorithm::Sha1, Algorithm::Md5];

    pub fn extension(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
        }
    }

    /// `path/to/foo.jar` -> `path/to/foo.jar.sha1`
    pub fn companion_path(self, path: &Utf8Path) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{path}.{}", self.extension()))
    }

    fn hex_len(self) -> usize {
        match self {
            Algorithm::Md5 => 32,
            Algorithm::Sha1 => 40,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

enum Hasher {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
}

impl Hasher {
    fn new(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Md5 => Hasher::Md5(md5::Context::new()),
            Algorithm::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
        }
    }

    fn consume(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(ctx) => ctx.consume(data),
            Hasher::Sha1(h) => h.update(data),
        }
    }

    fn hex(self) -> String {
        match self {
            Hasher::Md5(ctx) => format!("{:x}", ctx.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
        }
    }
}

/// Lowercase hex digest of a byte slice.
pub fn digest_bytes(algo: Algorithm, data: &[u8]) -> String {
    let mut hasher = Hasher::new(algo);
    hasher.consume(data);
    hasher.hex()
}

/// Lowercase hex digest of a file, streamed in fixed-size chunks.
pub fn digest_file(algo: Algorithm, path: &Utf8Path) -> Result<String, StorageError> {
    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new(algo);
    let mut buf = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| StorageError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.consume(&buf[..n]);
    }
    Ok(hasher.hex())
}

/// Extract the hex digest from a checksum companion file. The standard
/// format is a single hex line, but `hash  filename` output from md5sum
/// and friends is accepted too.
pub fn read_digest_file(algo: Algorithm, path: &Utf8Path) -> Result<String, StorageError> {
    let content = std::fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    parse_digest(algo, &content).ok_or_else(|| StorageError::MalformedDigestFile {
        path: path.to_path_buf(),
    })
}

pub(crate) fn parse_digest(algo: Algorithm, content: &str) -> Option<String> {
    let token = content.split_whitespace().next()?;
    if token.len() == algo.hex_len() && token.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(token.to_ascii_lowercase())
    } else {
        None
    }
}

/// Render companion file content for a digest: `hash  filename`.
pub fn format_digest_file(digest: &str, filename: &str) -> String {
    format!("{digest}  {filename}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digests_known_vectors() {
        assert_eq!(
            digest_bytes(Algorithm::Md5, b"hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            digest_bytes(Algorithm::Sha1, b"hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[test]
    fn file_digest_matches_byte_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("data.bin")).unwrap();
        let mut f = File::create(&path).unwrap();
        f.write_all(b"hello").unwrap();
        assert_eq!(
            digest_file(Algorithm::Sha1, &path).unwrap(),
            digest_bytes(Algorithm::Sha1, b"hello")
        );
    }

    #[test]
    fn parses_bare_and_annotated_digests() {
        let d = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
        assert_eq!(parse_digest(Algorithm::Sha1, d).as_deref(), Some(d));
        assert_eq!(
            parse_digest(Algorithm::Sha1, &format!("{d}  widget-1.0.jar\n")).as_deref(),
            Some(d)
        );
        assert_eq!(
            parse_digest(Algorithm::Sha1, &format!("{}  x", d.to_ascii_uppercase())).as_deref(),
            Some(d)
        );
        assert!(parse_digest(Algorithm::Sha1, "not a digest").is_none());
        assert!(parse_digest(Algorithm::Sha1, "").is_none());
        // md5-length token is not a sha1
        assert!(parse_digest(Algorithm::Sha1, "5d41402abc4b2a76b9719d911017c592").is_none());
    }
}
