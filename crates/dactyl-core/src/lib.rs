//! Shared vocabulary for the dactyl fingerprint sensor stack.
//!
//! This crate holds the error taxonomy every public operation resolves to,
//! the constants fixed by the sensor protocol, and the data model passed
//! between the session, the capture pipeline and the template engine.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::*;
