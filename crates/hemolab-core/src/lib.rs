//! Hemolab Core: domain models, repository traits, the permission
//! model and the shared error type.
//!
//! Nothing in this crate performs I/O. Storage backends implement the
//! traits in [`repository`]; the service layer in `hemolab-access`
//! consumes them.

pub mod error;
pub mod models;
pub mod permission;
pub mod repository;

pub use error::{HemolabError, HemolabResult};
