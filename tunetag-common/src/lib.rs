//! # tunetag Common Library
//!
//! Shared code for the tunetag services:
//! - Common error type
//! - Configuration file discovery and data folder resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
