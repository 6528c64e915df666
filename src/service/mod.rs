pub mod batch;
pub mod dedup;
pub mod rsvp;

pub use batch::InvitationBatchProcessor;
pub use dedup::{DedupCheck, InvitationDeduplicator};
pub use rsvp::RsvpStateMachine;

use uuid::Uuid;

use crate::error::{DispatchError, StoreError};

/// Maps store failures on an existing invitation to the fatal taxonomy.
fn invitation_error(invitation_id: Uuid, err: StoreError) -> DispatchError {
    match err {
        StoreError::NotPending(_) => DispatchError::AlreadyResponded(invitation_id),
        StoreError::NotFound(_) => DispatchError::InvitationNotFound(invitation_id),
        other => DispatchError::Store(other),
    }
}
