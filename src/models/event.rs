use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invitation::InvitationRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// online, offline or hybrid
    pub event_type: String,
    pub category: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_paid: bool,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub max_participants: Option<u32>,
    pub age_restriction: Option<String>,
    pub dress_code: Option<String>,
    pub require_approval: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLocation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub venue_type: Option<String>,
    pub address: Option<String>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub capacity: Option<u32>,
    pub online_url: Option<String>,
    pub online_platform: Option<String>,
    pub meeting_id: Option<String>,
    pub access_code: Option<String>,
    pub special_instructions: Option<String>,
    pub parking_info: Option<String>,
    pub public_transport: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
}

/// An event together with what an invitation notification needs to show.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    pub event: Event,
    /// Active locations in display order.
    pub locations: Vec<EventLocation>,
    /// Number of active participant memberships.
    pub current_participants: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_invite_users: bool,
    pub can_edit_event: bool,
    pub can_manage_locations: bool,
    pub can_view_analytics: bool,
    pub can_send_messages: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            can_invite_users: true,
            can_edit_event: true,
            can_manage_locations: true,
            can_view_analytics: true,
            can_send_messages: true,
        }
    }

    pub fn for_role(role: InvitationRole) -> Self {
        match role {
            InvitationRole::Admin | InvitationRole::CoAdmin => Self::all(),
            InvitationRole::Organizer => Self {
                can_manage_locations: true,
                can_send_messages: true,
                ..Self::default()
            },
            InvitationRole::Moderator => Self {
                can_send_messages: true,
                ..Self::default()
            },
            InvitationRole::Participant => Self::default(),
        }
    }
}

/// Membership of one user in one event. Unique per (event_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRole {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub role: InvitationRole,
    pub capabilities: Capabilities,
    pub assigned_by: Option<Uuid>,
    pub is_active: bool,
}

impl EventRole {
    /// The admin membership granted to whoever creates the event.
    pub fn for_creator(event_id: Uuid, user_id: Uuid) -> Self {
        Self {
            event_id,
            user_id,
            role: InvitationRole::Admin,
            capabilities: Capabilities::all(),
            assigned_by: None,
            is_active: true,
        }
    }
}

/// Upsert request for a membership. `capabilities` is written only when
/// the membership is created; an existing row keeps its flags and gets
/// `role` and `is_active = true`.
#[derive(Debug, Clone)]
pub struct EventRoleUpsert {
    pub role: InvitationRole,
    pub assigned_by: Uuid,
    pub capabilities: Capabilities,
}

impl EventRoleUpsert {
    pub fn from_role(role: InvitationRole, assigned_by: Uuid) -> Self {
        Self {
            role,
            assigned_by,
            capabilities: Capabilities::for_role(role),
        }
    }
}
