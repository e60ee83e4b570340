//! Command-line host for Safe EIP-712 digests and signature blobs.
//!
//! # Modules
//!
//! - [`commands`] - Argument parsing and subcommand handlers
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`error`] - Error types for the binary

pub mod commands;
pub mod config;
pub mod error;
