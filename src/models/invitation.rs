use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseTagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, InvitationStatus::Pending)
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "declined" => Ok(InvitationStatus::Declined),
            other => Err(ParseTagError::Status(other.to_string())),
        }
    }
}

/// The role an invitee is offered. Stored as `invitation_type` and copied
/// onto the membership when the invitation is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationRole {
    #[default]
    Participant,
    Organizer,
    Moderator,
    CoAdmin,
    Admin,
}

impl InvitationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationRole::Participant => "participant",
            InvitationRole::Organizer => "organizer",
            InvitationRole::Moderator => "moderator",
            InvitationRole::CoAdmin => "co_admin",
            InvitationRole::Admin => "admin",
        }
    }

    /// Label used in outbound notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            InvitationRole::Participant => "Participant",
            InvitationRole::Organizer => "Event Organizer",
            InvitationRole::Moderator => "Event Moderator",
            InvitationRole::CoAdmin => "Co-Administrator",
            InvitationRole::Admin => "Event Administrator",
        }
    }
}

impl fmt::Display for InvitationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationRole {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participant" => Ok(InvitationRole::Participant),
            "organizer" => Ok(InvitationRole::Organizer),
            "moderator" => Ok(InvitationRole::Moderator),
            "co_admin" => Ok(InvitationRole::CoAdmin),
            "admin" => Ok(InvitationRole::Admin),
            other => Err(ParseTagError::Role(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub invited_user_id: Option<Uuid>,
    pub invited_email: String,
    pub invited_by: Uuid,
    pub invitation_type: InvitationRole,
    pub personal_message: Option<String>,
    pub max_guests: u32,
    pub status: InvitationStatus,
    pub reminder_count: u32,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub response_date: Option<DateTime<Utc>>,
    pub guest_count: Option<u32>,
    pub dietary_restrictions: Option<String>,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn invitee_key(&self) -> InviteeKey {
        match self.invited_user_id {
            Some(user_id) => InviteeKey::User(user_id),
            None => InviteeKey::Email(self.invited_email.clone()),
        }
    }
}

/// Dedup key for one event. The two variants never match each other: an
/// email key only matches invitations with no registered user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InviteeKey {
    User(Uuid),
    Email(String),
}

impl fmt::Display for InviteeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InviteeKey::User(id) => write!(f, "user {}", id),
            InviteeKey::Email(email) => write!(f, "{}", email),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub event_id: Uuid,
    pub invited_user_id: Option<Uuid>,
    pub invited_email: String,
    pub invited_by: Uuid,
    pub invitation_type: InvitationRole,
    pub personal_message: Option<String>,
    pub max_guests: u32,
}

impl NewInvitation {
    pub fn invitee_key(&self) -> InviteeKey {
        match self.invited_user_id {
            Some(user_id) => InviteeKey::User(user_id),
            None => InviteeKey::Email(self.invited_email.clone()),
        }
    }
}

/// An RSVP written onto a pending invitation.
#[derive(Debug, Clone)]
pub struct InvitationResponse {
    pub status: InvitationStatus,
    pub responded_at: DateTime<Utc>,
    pub details: ResponseDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpAction {
    Accept,
    Decline,
}

impl RsvpAction {
    pub fn resulting_status(&self) -> InvitationStatus {
        match self {
            RsvpAction::Accept => InvitationStatus::Accepted,
            RsvpAction::Decline => InvitationStatus::Declined,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseDetails {
    #[serde(default)]
    pub guest_count: u32,
    pub dietary_restrictions: Option<String>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsvpOutcome {
    pub status: InvitationStatus,
    pub invitation_id: Uuid,
    pub event_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResendOutcome {
    pub invitation_id: Uuid,
    pub reminder_count: u32,
}
