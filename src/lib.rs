// src/lib.rs

pub mod config;
pub mod constants;
pub mod entropy;
pub mod ops;
pub mod record;
pub mod replay;
pub mod runner;
pub mod size_parser;
pub mod validate;

/// Tool name and version, as logged at startup.
pub fn name_and_version() -> String {
    format!("sxload v{}", env!("CARGO_PKG_VERSION"))
}
