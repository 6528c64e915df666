use thiserror::Error;
use uuid::Uuid;

use crate::models::InviteeKey;

#[derive(Error, Debug)]
pub enum ParseTagError {
    #[error("Unknown invitation role `{0}`")]
    Role(String),

    #[error("Unknown invitation status `{0}`")]
    Status(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("An invitation for {0} already exists for this event")]
    Conflict(InviteeKey),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invitation {0} is no longer pending")]
    NotPending(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<ParseTagError> for StoreError {
    fn from(err: ParseTagError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Mail relay rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template `{0}` not found")]
    NotFound(String),

    #[error("Failed to read template `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template context must serialize to an object: {0}")]
    Context(String),
}

/// Errors that abort a whole operation.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Event {0} not found")]
    EventNotFound(Uuid),

    #[error("Inviter {0} not found")]
    InviterNotFound(Uuid),

    #[error("Invitation {0} not found")]
    InvitationNotFound(Uuid),

    #[error("Invitation {0} has already been responded to")]
    AlreadyResponded(Uuid),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors that fail a single batch target. The message becomes
/// `BatchResult::error`.
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("{0} is already invited to this event")]
    AlreadyInvited(String),

    #[error("{0} appears more than once in this batch")]
    DuplicateInBatch(String),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Failed to deliver invitation: {0}")]
    Delivery(#[from] TransportError),

    #[error("Failed to render invitation: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TargetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(key) => TargetError::AlreadyInvited(key.to_string()),
            other => TargetError::Store(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },
}
