//! Shared library for the frontdesk supervisor service
//!
//! Error taxonomy and configuration resolution used by the service crate.

pub mod config;
pub mod error;

pub use error::{Error, Result};
