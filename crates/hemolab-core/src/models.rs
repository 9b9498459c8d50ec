//! Domain models for Hemolab.

pub mod change_request;
pub mod notification;
pub mod role;
pub mod user;
