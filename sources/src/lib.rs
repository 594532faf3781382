//! Module to deal with the export service we fetch data from.
//!
//! The different submodules deal with:
//!
//! - the environments we can talk to and their credentials,
//! - signing every request (HMAC-SHA256 over passkey, timestamp and path),
//! - fetching data with signed GET requests,
//! - finding the right manifest and the files it lists.
//!

// Re-export these modules for a shorter import path.
//
pub use client::*;
pub use environment::*;
pub use error::*;
pub use manifest::*;
pub use sign::*;

mod client;
mod environment;
mod error;
mod manifest;
mod sign;

pub fn version() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
