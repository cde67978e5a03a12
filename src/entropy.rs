//! Deterministic entropy buffer backing synthetic upload payloads.
//!
//! The buffer is derived once per run from the session's seed, written to
//! a fixed well-known path, read concurrently by upload operations, and
//! removed when the run ends — on success, failure, or panic alike.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::ENTROPY_FILE_NAME;

/// Where the transient entropy buffer lives for the duration of a run.
pub fn entropy_file_path() -> PathBuf {
    std::env::temp_dir().join(ENTROPY_FILE_NAME)
}

/// Generate `size` deterministic pseudo-random bytes from `seed`.
///
/// The generator is a locally scoped, explicitly seeded ChaCha20 stream;
/// no ambient RNG state is read or written, so two calls with the same
/// `(size, seed)` always agree and unrelated randomization is unaffected.
pub fn generate(size: usize, seed: &str) -> Vec<u8> {
    let mut rng = ChaCha20Rng::from_seed(seed_key(seed));
    let mut buffer = vec![0u8; size];
    rng.fill_bytes(&mut buffer);
    buffer
}

/// Cycle the (≤ 12 hex chars) seed string into a full ChaCha key. Only
/// determinism matters here, not cryptographic strength.
fn seed_key(seed: &str) -> [u8; 32] {
    let mut key = [0u8; 32];
    if !seed.is_empty() {
        for (slot, byte) in key.iter_mut().zip(seed.bytes().cycle()) {
            *slot = byte;
        }
    }
    key
}

/// Read the `[offset, offset + size)` slice of the entropy file.
pub async fn read_slice(path: &Path, size: u64, offset: u64) -> Result<Vec<u8>> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("failed to open entropy file {}", path.display()))?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut slice = vec![0u8; size as usize];
    file.read_exact(&mut slice)
        .await
        .with_context(|| format!("entropy file too short for slice at {offset}+{size}"))?;
    Ok(slice)
}

/// Owns the on-disk entropy buffer; dropping it removes the file.
#[derive(Debug)]
pub struct EntropyFile {
    path: PathBuf,
}

impl EntropyFile {
    /// Generate the buffer for `config` and persist it at the well-known
    /// path.
    pub async fn materialize(config: &Config) -> Result<Self> {
        let path = entropy_file_path();
        let contents = generate(config.entropy_size as usize, &config.entropy_seed);
        tokio::fs::write(&path, &contents)
            .await
            .with_context(|| format!("failed to write entropy file {}", path.display()))?;
        debug!("Wrote {} entropy bytes to {}", contents.len(), path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EntropyFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove entropy file {}: {}", self.path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::rngs::StdRng;

    #[test]
    fn generation_is_deterministic() {
        let a = generate(4096, "abcdef");
        let b = generate(4096, "abcdef");
        assert_eq!(a, b);
        assert_eq!(a.len(), 4096);
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(generate(1024, "aa"), generate(1024, "ab"));
    }

    #[test]
    fn generation_does_not_disturb_other_rngs() {
        let draw = |interfere: bool| -> u64 {
            let mut rng = StdRng::seed_from_u64(7);
            if interfere {
                let _ = generate(512, "aa");
            }
            rng.random()
        };
        assert_eq!(draw(false), draw(true));
    }

    #[test]
    fn empty_seed_is_still_deterministic() {
        assert_eq!(generate(64, ""), generate(64, ""));
    }

    #[tokio::test]
    async fn slices_match_the_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entropy");
        let buffer = generate(2048, "aa");
        tokio::fs::write(&path, &buffer).await.unwrap();

        let slice = read_slice(&path, 512, 1024).await.unwrap();
        assert_eq!(slice, &buffer[1024..1536]);

        // A slice running past the end is an error, not a short read.
        assert!(read_slice(&path, 512, 1600).await.is_err());
    }
}
