//! Pre-run validation of operator input.
//!
//! Everything here runs before a single operation is dispatched; the
//! engines only ever see a [`Config`] that already passed these checks.

use rand::Rng;
use thiserror::Error;

use crate::config::Config;
use crate::constants::{
    DEFAULT_ENTROPY_FACTOR, ENTROPY_SEED_CHARACTERS, ENTROPY_SEED_LENGTH,
};
use crate::size_parser::parse_size;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "CLUSTER_URL should have one of following formats:\n  sx://user@cluster.example.com\n  @user"
    )]
    InvalidClusterUrl,
    #[error("invalid volume name: {0}")]
    InvalidVolume(String),
    #[error("invalid number of threads")]
    InvalidThreads,
    #[error("invalid size: {0}")]
    InvalidSize(String),
    #[error("size must be greater than 0")]
    NonPositiveSize,
    #[error("entropy seed length should not exceed {0} characters")]
    SeedTooLong(usize),
    #[error("entropy seed should be a hexadecimal string")]
    SeedNotHex,
}

/// Raw operator input for a record session, prior to validation.
#[derive(Debug, Clone)]
pub struct RawSettings {
    pub cluster_url: String,
    pub volumes: Vec<String>,
    pub threads: usize,
    pub min_size: String,
    pub max_size: String,
    pub entropy_size: Option<String>,
    pub entropy_seed: Option<String>,
}

/// Validate raw CLI input and assemble an immutable [`Config`].
pub fn build_config(raw: RawSettings) -> Result<Config, ValidationError> {
    validate_cluster_url(&raw.cluster_url)?;
    for volume in &raw.volumes {
        validate_volume(volume)?;
    }
    if raw.threads < 1 {
        return Err(ValidationError::InvalidThreads);
    }

    let (min_size, max_size) = validate_sizes(
        parse_size(&raw.min_size)?,
        parse_size(&raw.max_size)?,
    )?;
    let entropy_size = resolve_entropy_size(raw.entropy_size, max_size)?;
    let entropy_seed = validate_entropy_seed(raw.entropy_seed)?;

    Ok(Config {
        cluster_url: raw.cluster_url,
        volumes: raw.volumes,
        threads: raw.threads,
        min_size,
        max_size,
        entropy_size,
        entropy_seed,
    })
}

fn validate_cluster_url(url: &str) -> Result<(), ValidationError> {
    if url.contains(' ') {
        return Err(ValidationError::InvalidClusterUrl);
    }
    if url.starts_with('@') {
        return Ok(());
    }
    if url.starts_with("sx://") && url.contains('@') {
        return Ok(());
    }
    Err(ValidationError::InvalidClusterUrl)
}

fn validate_volume(volume: &str) -> Result<(), ValidationError> {
    if volume.is_empty() || volume.contains('/') || volume.contains(' ') {
        return Err(ValidationError::InvalidVolume(volume.to_string()));
    }
    Ok(())
}

/// Returns the two sizes in ascending order; zero is rejected rather than
/// silently producing empty uploads.
fn validate_sizes(a: u64, b: u64) -> Result<(u64, u64), ValidationError> {
    if a == 0 || b == 0 {
        return Err(ValidationError::NonPositiveSize);
    }
    Ok((a.min(b), a.max(b)))
}

/// When not given, the entropy size defaults to a multiple of the
/// maximum file size; when given, it is floored at `max_size` so every
/// upload slice fits inside the buffer.
fn resolve_entropy_size(size: Option<String>, max_size: u64) -> Result<u64, ValidationError> {
    let Some(size) = size else {
        return Ok(DEFAULT_ENTROPY_FACTOR * max_size);
    };
    let size = parse_size(&size)?;
    if size == 0 {
        return Err(ValidationError::NonPositiveSize);
    }
    Ok(size.max(max_size))
}

fn validate_entropy_seed(seed: Option<String>) -> Result<String, ValidationError> {
    let Some(seed) = seed else {
        return Ok(generate_entropy_seed());
    };
    let seed = seed.to_lowercase();
    if seed.len() > ENTROPY_SEED_LENGTH {
        return Err(ValidationError::SeedTooLong(ENTROPY_SEED_LENGTH));
    }
    if !seed.bytes().all(|c| ENTROPY_SEED_CHARACTERS.contains(&c)) {
        return Err(ValidationError::SeedNotHex);
    }
    Ok(seed)
}

/// A fresh random seed in the accepted alphabet.
pub fn generate_entropy_seed() -> String {
    let mut rng = rand::rng();
    (0..ENTROPY_SEED_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ENTROPY_SEED_CHARACTERS.len());
            ENTROPY_SEED_CHARACTERS[idx] as char
        })
        .collect()
}
