//! Bulk event invitations: deduplicated creation, templated notification
//! and RSVP handling over pluggable storage and mail transports.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod template;
pub mod transport;
pub mod utils;

pub use config::{Config, DispatchSettings};
pub use error::{DispatchError, StoreError, TargetError, TemplateError, TransportError};
pub use service::{InvitationBatchProcessor, InvitationDeduplicator, RsvpStateMachine};
