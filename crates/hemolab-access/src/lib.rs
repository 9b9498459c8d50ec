//! Hemolab Access: the approval workflow for user changes, the
//! notification relay that reports on it, and per-session activity
//! tracking.

pub mod bootstrap;
pub mod config;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod notifier;
pub mod session;
pub mod workflow;

pub use config::AccessConfig;
pub use error::AccessError;
pub use gateway::{ChangeOutcome, UserChange, UserChangeGateway};
pub use notifier::{NotificationRelay, Subscription};
pub use session::SessionActivity;
pub use workflow::{ChangeRequestService, SubmitChangeRequest};
