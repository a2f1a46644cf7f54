//! rigwatch Connectors
//!
//! Adapters for the NiceHash rig management API.
//! Signs requests, performs the HTTP call and decodes responses into
//! domain types.

#![warn(clippy::all)]

// Public modules
pub mod error;
pub mod nicehash_rest;
pub mod ports;
pub mod signer;
pub mod stub;
pub mod transport;

// Re-exports
pub use error::RigApiError;
pub use nicehash_rest::{NicehashClient, NicehashClientConfig, RIGS_ENDPOINT};
pub use ports::RigSource;
pub use signer::{sign, SignBody, SignQuery};
pub use stub::StubRigSource;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
