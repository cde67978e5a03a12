//! Human-readable size strings for the CLI.
//!
//! Accepts raw byte counts, decimal suffixes (K/KB, M/MB, G/GB, T/TB) and
//! binary suffixes (Ki/KiB, Mi/MiB, Gi/GiB, Ti/TiB), case-insensitive,
//! with optional fractional values ("1.5M"). A comma is accepted as the
//! decimal separator.

use crate::validate::ValidationError;

/// Parse a size string into a byte count.
pub fn parse_size(input: &str) -> Result<u64, ValidationError> {
    let input = input.trim().replace(',', ".");
    let bad = || ValidationError::InvalidSize(input.clone());

    let split = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(split);

    let value: f64 = number.parse().map_err(|_| bad())?;
    let multiplier: u64 = match suffix.trim().to_ascii_uppercase().as_str() {
        "" => 1,
        "K" | "KB" => 1_000,
        "M" | "MB" => 1_000_000,
        "G" | "GB" => 1_000_000_000,
        "T" | "TB" => 1_000_000_000_000,
        "KI" | "KIB" => 1 << 10,
        "MI" | "MIB" => 1 << 20,
        "GI" | "GIB" => 1 << 30,
        "TI" | "TIB" => 1 << 40,
        _ => return Err(bad()),
    };

    Ok((value * multiplier as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_numbers() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("1024").unwrap(), 1024);
    }

    #[test]
    fn decimal_suffixes() {
        assert_eq!(parse_size("1K").unwrap(), 1_000);
        assert_eq!(parse_size("1kb").unwrap(), 1_000);
        assert_eq!(parse_size("8M").unwrap(), 8_000_000);
        assert_eq!(parse_size("2GB").unwrap(), 2_000_000_000);
        assert_eq!(parse_size("1t").unwrap(), 1_000_000_000_000);
    }

    #[test]
    fn binary_suffixes() {
        assert_eq!(parse_size("1Ki").unwrap(), 1_024);
        assert_eq!(parse_size("1KiB").unwrap(), 1_024);
        assert_eq!(parse_size("8MiB").unwrap(), 8 * 1_048_576);
        assert_eq!(parse_size("1gib").unwrap(), 1_073_741_824);
    }

    #[test]
    fn fractional_values() {
        assert_eq!(parse_size("1.5M").unwrap(), 1_500_000);
        assert_eq!(parse_size("1,5M").unwrap(), 1_500_000);
        assert_eq!(parse_size("2.5MiB").unwrap(), 2_621_440);
    }

    #[test]
    fn surrounding_whitespace() {
        assert_eq!(parse_size(" 1K ").unwrap(), 1_000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("K").is_err());
        assert!(parse_size("1X").is_err());
        assert!(parse_size("-1M").is_err());
        assert!(parse_size("one meg").is_err());
    }
}
