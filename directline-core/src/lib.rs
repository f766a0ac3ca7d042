//! Core types for the Direct Line bridge
//!
//! This crate provides configuration loading, the shared error type and
//! logging setup used by all other directline components.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
