//! # HGD Common Library
//!
//! Shared code for the Henderson Geocode Dashboard services:
//! - Error type shared by configuration and startup code
//! - Configuration loading (CLI → ENV → TOML → compiled defaults)
//! - Root folder layout (locations document, contact files, image assets)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
