use std::sync::Arc;

use chrono::Utc;
use log::info;
use uuid::Uuid;

use super::invitation_error;
use crate::{
    db::RecordStore,
    error::DispatchError,
    models::{EventRoleUpsert, InvitationResponse, ResponseDetails, RsvpAction, RsvpOutcome},
};

/// Applies accept/decline responses to pending invitations.
///
/// `pending` moves to `accepted` or `declined` exactly once; answering an
/// invitation that has already been answered is an error. Accepting an
/// invitation held by a registered user also grants the invited role for
/// the event, in the same store write as the status change.
#[derive(Clone)]
pub struct RsvpStateMachine {
    store: Arc<dyn RecordStore>,
}

impl RsvpStateMachine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn apply(
        &self,
        invitation_id: Uuid,
        action: RsvpAction,
        details: Option<ResponseDetails>,
    ) -> Result<RsvpOutcome, DispatchError> {
        let invitation = self
            .store
            .get_invitation(invitation_id)
            .await?
            .ok_or(DispatchError::InvitationNotFound(invitation_id))?;

        if !invitation.status.is_pending() {
            return Err(DispatchError::AlreadyResponded(invitation_id));
        }

        let status = action.resulting_status();
        let grant = match action {
            RsvpAction::Accept if invitation.invited_user_id.is_some() => Some(
                EventRoleUpsert::from_role(invitation.invitation_type, invitation.invited_by),
            ),
            _ => None,
        };
        let (updated, role) = self
            .store
            .respond(
                invitation_id,
                InvitationResponse {
                    status,
                    responded_at: Utc::now(),
                    details: details.unwrap_or_default(),
                },
                grant,
            )
            .await
            .map_err(|e| invitation_error(invitation_id, e))?;

        if let Some(role) = role {
            info!(
                "User {} joined event {} as {}",
                role.user_id, role.event_id, role.role
            );
        }

        info!("Invitation {} {}", invitation_id, status);
        Ok(RsvpOutcome {
            status,
            invitation_id,
            event_id: updated.event_id,
        })
    }
}
