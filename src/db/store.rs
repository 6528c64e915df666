use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        EventDetails, EventRole, EventRoleUpsert, Invitation, InvitationResponse,
        InvitationStatus, InviteeKey, NewInvitation, User,
    },
};

/// Persistence used by the invitation services.
///
/// `create_invitation` must enforce the per-event uniqueness of
/// [`InviteeKey`] atomically and report a duplicate as
/// [`StoreError::Conflict`]. `record_reminder` and `respond` only touch
/// pending invitations and report anything else as
/// [`StoreError::NotPending`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ── Events & users ──

    async fn find_event(&self, event_id: Uuid) -> Result<Option<EventDetails>, StoreError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    // ── Invitations ──

    async fn find_invitation(
        &self,
        event_id: Uuid,
        key: &InviteeKey,
    ) -> Result<Option<Invitation>, StoreError>;
    async fn get_invitation(&self, invitation_id: Uuid) -> Result<Option<Invitation>, StoreError>;
    /// Newest first.
    async fn list_invitations(
        &self,
        event_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<Invitation>, StoreError>;
    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Invitation, StoreError>;
    async fn record_reminder(
        &self,
        invitation_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<Invitation, StoreError>;
    /// Writes the response and, when `grant` is given and the invitation
    /// belongs to a registered user, upserts that user's event role. Both
    /// writes commit together or not at all.
    async fn respond(
        &self,
        invitation_id: Uuid,
        response: InvitationResponse,
        grant: Option<EventRoleUpsert>,
    ) -> Result<(Invitation, Option<EventRole>), StoreError>;
}
