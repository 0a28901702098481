//! # CJS Common Library
//!
//! Shared code for the comparative-judgement survey engine:
//! - Error types
//! - Survey configuration loading and validation
//! - Database initialization, schema and row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
