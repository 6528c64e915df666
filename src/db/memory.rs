use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::RecordStore;
use crate::{
    error::StoreError,
    models::{
        EventDetails, EventRole, EventRoleUpsert, Invitation, InvitationRole, InvitationStatus,
        InvitationResponse, InviteeKey, NewInvitation, User,
    },
    utils::email::normalize_email,
};

#[derive(Default)]
struct State {
    events: HashMap<Uuid, EventDetails>,
    users: HashMap<Uuid, User>,
    invitations: Vec<Invitation>,
    roles: HashMap<(Uuid, Uuid), EventRole>,
}

impl State {
    fn matches(invitation: &Invitation, event_id: Uuid, key: &InviteeKey) -> bool {
        if invitation.event_id != event_id {
            return false;
        }
        match key {
            InviteeKey::User(user_id) => invitation.invited_user_id == Some(*user_id),
            InviteeKey::Email(email) => {
                invitation.invited_user_id.is_none()
                    && normalize_email(&invitation.invited_email) == normalize_email(email)
            }
        }
    }

    fn pending_mut(&mut self, invitation_id: Uuid) -> Result<&mut Invitation, StoreError> {
        let invitation = self
            .invitations
            .iter_mut()
            .find(|i| i.id == invitation_id)
            .ok_or_else(|| StoreError::NotFound(format!("invitation {}", invitation_id)))?;
        if !invitation.status.is_pending() {
            return Err(StoreError::NotPending(invitation_id));
        }
        Ok(invitation)
    }

    /// Creates the membership or reactivates an existing one with the new
    /// role. Existing capability flags are kept.
    fn upsert_role(&mut self, event_id: Uuid, user_id: Uuid, upsert: EventRoleUpsert) -> EventRole {
        self.roles
            .entry((event_id, user_id))
            .and_modify(|existing| {
                existing.role = upsert.role;
                existing.is_active = true;
            })
            .or_insert_with(|| EventRole {
                event_id,
                user_id,
                role: upsert.role,
                capabilities: upsert.capabilities,
                assigned_by: Some(upsert.assigned_by),
                is_active: true,
            })
            .clone()
    }
}

/// In-process [`RecordStore`]. All checks and writes for one call happen
/// under a single lock, so uniqueness holds across concurrent batches.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, details: EventDetails) {
        let mut state = self.state.lock().await;
        state.events.insert(details.event.id, details);
    }

    pub async fn insert_user(&self, user: User) {
        let mut state = self.state.lock().await;
        state.users.insert(user.id, user);
    }

    pub async fn insert_event_role(&self, role: EventRole) {
        let mut state = self.state.lock().await;
        state.roles.insert((role.event_id, role.user_id), role);
    }

    pub async fn event_role(&self, event_id: Uuid, user_id: Uuid) -> Option<EventRole> {
        let state = self.state.lock().await;
        state.roles.get(&(event_id, user_id)).cloned()
    }

    pub async fn event_roles(&self, event_id: Uuid) -> Vec<EventRole> {
        let state = self.state.lock().await;
        state
            .roles
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect()
    }

    pub async fn invitations(&self) -> Vec<Invitation> {
        self.state.lock().await.invitations.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<EventDetails>, StoreError> {
        let state = self.state.lock().await;
        let Some(details) = state.events.get(&event_id) else {
            return Ok(None);
        };

        let mut details = details.clone();
        details.locations.retain(|l| l.is_active);
        details.locations.sort_by_key(|l| l.display_order);
        let participants = state
            .roles
            .values()
            .filter(|r| {
                r.event_id == event_id && r.is_active && r.role == InvitationRole::Participant
            })
            .count();
        details.current_participants = u32::try_from(participants).unwrap_or(u32::MAX);

        Ok(Some(details))
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| normalize_email(&u.email) == email)
            .cloned())
    }

    async fn find_invitation(
        &self,
        event_id: Uuid,
        key: &InviteeKey,
    ) -> Result<Option<Invitation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .iter()
            .find(|i| State::matches(i, event_id, key))
            .cloned())
    }

    async fn get_invitation(&self, invitation_id: Uuid) -> Result<Option<Invitation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .iter()
            .find(|i| i.id == invitation_id)
            .cloned())
    }

    async fn list_invitations(
        &self,
        event_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<Invitation>, StoreError> {
        let state = self.state.lock().await;
        let mut invitations: Vec<Invitation> = state
            .invitations
            .iter()
            .filter(|i| i.event_id == event_id && status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        // Vec order is insertion order, which breaks created_at ties.
        invitations.reverse();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Invitation, StoreError> {
        let mut state = self.state.lock().await;
        let key = invitation.invitee_key();
        if state
            .invitations
            .iter()
            .any(|i| State::matches(i, invitation.event_id, &key))
        {
            return Err(StoreError::Conflict(key));
        }

        let created = Invitation {
            id: Uuid::new_v4(),
            event_id: invitation.event_id,
            invited_user_id: invitation.invited_user_id,
            invited_email: invitation.invited_email,
            invited_by: invitation.invited_by,
            invitation_type: invitation.invitation_type,
            personal_message: invitation.personal_message,
            max_guests: invitation.max_guests,
            status: InvitationStatus::Pending,
            reminder_count: 0,
            reminder_sent_at: None,
            response_date: None,
            guest_count: None,
            dietary_restrictions: None,
            special_requests: None,
            created_at: Utc::now(),
        };
        state.invitations.push(created.clone());
        Ok(created)
    }

    async fn record_reminder(
        &self,
        invitation_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<Invitation, StoreError> {
        let mut state = self.state.lock().await;
        let invitation = state.pending_mut(invitation_id)?;
        invitation.reminder_count += 1;
        invitation.reminder_sent_at = Some(sent_at);
        Ok(invitation.clone())
    }

    async fn respond(
        &self,
        invitation_id: Uuid,
        response: InvitationResponse,
        grant: Option<EventRoleUpsert>,
    ) -> Result<(Invitation, Option<EventRole>), StoreError> {
        let mut state = self.state.lock().await;
        let (event_id, user_id) = {
            let invitation = state.pending_mut(invitation_id)?;
            (invitation.event_id, invitation.invited_user_id)
        };

        let role = match (grant, user_id) {
            (Some(upsert), Some(user_id)) => Some(state.upsert_role(event_id, user_id, upsert)),
            _ => None,
        };

        let invitation = state.pending_mut(invitation_id)?;
        invitation.status = response.status;
        invitation.response_date = Some(response.responded_at);
        invitation.guest_count = Some(response.details.guest_count);
        invitation.dietary_restrictions = response.details.dietary_restrictions;
        invitation.special_requests = response.details.special_requests;
        Ok((invitation.clone(), role))
    }
}
