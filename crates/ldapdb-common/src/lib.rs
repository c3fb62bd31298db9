//! ldapdb Common - Shared types and utilities
//!
//! This crate provides the distinguished-name and scope types, the error
//! taxonomy surfaced to the protocol engine, and configuration structures
//! used across all ldapdb components.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
