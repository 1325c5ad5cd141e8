//! An API for signing files on the strength of a Verifiable Presentation,
//! using [OpenID for Verifiable Presentations](https://openid.net/specs/openid-4-verifiable-presentations-1_0.html)
//! to request and receive the holder's credential.
//!
//! A file is uploaded and hashed. A presentation request bound to the file is
//! issued to the holder's Wallet. When the Wallet responds with a presentation
//! that echoes the request's nonce and passes the host's credential check, the
//! file's content hash is signed together with the holder's identifier. Anyone
//! holding the file id can later confirm that the bytes are unchanged.
//!
//! All persistence, signing, and credential checks are delegated to the host
//! through the traits in [`provider`]. [`Endpoint`] wraps a provider and
//! exposes the signing lifecycle.

mod check;
pub mod config;
pub mod core;
pub mod dif_exch;
mod endpoint;
mod error;
pub mod hash;
mod issue;
pub mod jose;
mod lock;
pub mod model;
mod presentation;
mod reap;
pub mod registry;
pub mod session;
mod share;
mod sign;
mod upload;
pub mod validator;
mod verify;
pub mod wallet;

pub mod provider;
pub mod types;

pub mod test_utils;

pub use crate::config::Config;
pub use crate::core::Kind;
pub use crate::endpoint::Endpoint;
pub use crate::error::{Error, OidError};

/// Result type for signing service operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
