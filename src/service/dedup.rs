use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::RecordStore,
    error::StoreError,
    models::{Invitation, InviteeKey},
};

#[derive(Debug, Clone)]
pub struct DedupCheck {
    pub conflict: bool,
    pub existing: Option<Invitation>,
}

/// Decides whether an invitation may be created for one identity.
///
/// Registered users are matched by user id only; unregistered invitees by
/// email among invitations that have no user. Any existing invitation
/// blocks a new one, whatever its status.
#[derive(Clone)]
pub struct InvitationDeduplicator {
    store: Arc<dyn RecordStore>,
}

impl InvitationDeduplicator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Builds the dedup key for a target: the user id when there is one,
    /// otherwise the email.
    pub fn key_for(user_id: Option<Uuid>, email: &str) -> InviteeKey {
        match user_id {
            Some(user_id) => InviteeKey::User(user_id),
            None => InviteeKey::Email(email.to_string()),
        }
    }

    pub async fn check(&self, event_id: Uuid, key: &InviteeKey) -> Result<DedupCheck, StoreError> {
        let existing = self.store.find_invitation(event_id, key).await?;
        Ok(DedupCheck {
            conflict: existing.is_some(),
            existing,
        })
    }
}
