//! File integrity verification for downloaded artifacts.
//!
//! Digests are computed by streaming the file through a RustCrypto
//! [`Digest`] implementation, so installers of any size are hashed in
//! constant memory. Comparison against the published hex string is
//! case-insensitive.

use crate::constants::CHECKSUM_BUFFER_SIZE;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Digest algorithm announced by an appcast's `checksumType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    /// No checksum published; verification always succeeds
    #[default]
    None,
    Md5,
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Parse the wire value. Matching is case-insensitive; an absent or
    /// unrecognized value means no checksum.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("md5") => Self::Md5,
            Some(v) if v.eq_ignore_ascii_case("sha1") => Self::Sha1,
            Some(v) if v.eq_ignore_ascii_case("sha256") => Self::Sha256,
            _ => Self::None,
        }
    }

    /// Wire representation, `None` when no checksum is used.
    pub fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Md5 => Some("md5"),
            Self::Sha1 => Some("sha1"),
            Self::Sha256 => Some("sha256"),
        }
    }

    /// Length of the hex-encoded digest (twice the digest size).
    pub fn hex_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }

    /// Whether `checksum` has the shape of a digest produced by this algorithm.
    pub fn accepts(self, checksum: &str) -> bool {
        match self {
            Self::None => true,
            _ => checksum.len() == self.hex_len(),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire().unwrap_or("none"))
    }
}

/// What to do with a file whose digest does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidChecksumBehavior {
    #[default]
    RemoveFile,
    KeepFile,
}

async fn digest_file<D: Digest>(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHECKSUM_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the lowercase hex digest of `path`.
///
/// Returns `Ok(None)` for [`ChecksumAlgorithm::None`].
pub async fn compute_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<Option<String>> {
    debug!("Computing {} checksum for: {}", algorithm, path.display());

    let digest = match algorithm {
        ChecksumAlgorithm::None => return Ok(None),
        ChecksumAlgorithm::Md5 => digest_file::<Md5>(path).await?,
        ChecksumAlgorithm::Sha1 => digest_file::<Sha1>(path).await?,
        ChecksumAlgorithm::Sha256 => digest_file::<Sha256>(path).await?,
    };
    Ok(Some(digest))
}

/// Check `path` against the published `expected` digest.
///
/// - `None` algorithm: always `true`, the file is untouched.
/// - Empty path, empty expected value, or unreadable file: `false`.
/// - Mismatch: `false`, and the file is deleted when `behavior` is
///   [`InvalidChecksumBehavior::RemoveFile`].
pub async fn verify_checksum(
    path: &Path,
    expected: &str,
    algorithm: ChecksumAlgorithm,
    behavior: InvalidChecksumBehavior,
) -> bool {
    if algorithm == ChecksumAlgorithm::None {
        return true;
    }

    if path.as_os_str().is_empty() || expected.trim().is_empty() {
        return false;
    }

    let actual = match compute_checksum(path, algorithm).await {
        Ok(Some(actual)) => actual,
        Ok(None) => return true,
        Err(e) => {
            warn!("Cannot read {} for checksum verification: {}", path.display(), e);
            return false;
        }
    };

    if actual.eq_ignore_ascii_case(expected.trim()) {
        info!("Checksum verification successful for {}", path.display());
        return true;
    }

    warn!(
        "Checksum mismatch for {}: expected {}, actual {}",
        path.display(),
        expected,
        actual
    );

    if behavior == InvalidChecksumBehavior::RemoveFile {
        if let Err(e) = fs::remove_file(path).await {
            warn!("Failed to remove corrupted file {}: {}", path.display(), e);
        }
    }

    false
}
