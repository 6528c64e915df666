use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{invitation::InvitationRole, user::UserRef};
use crate::utils::email::normalize_email;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkInviteRequest {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub users: Vec<UserRef>,
}

impl BulkInviteRequest {
    /// Flattens the request into one ordered target list: emails first,
    /// then user references.
    pub fn targets(&self) -> Vec<BatchTarget> {
        self.emails
            .iter()
            .cloned()
            .map(BatchTarget::Email)
            .chain(self.users.iter().cloned().map(BatchTarget::User))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.emails.len() + self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InviteSettings {
    #[serde(default)]
    pub role: InvitationRole,
    pub personal_message: Option<String>,
    #[serde(default)]
    pub max_guests: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchTarget {
    Email(String),
    User(UserRef),
}

/// Outcome for one target of a bulk dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
    pub success: bool,
    pub invitation_id: Option<Uuid>,
    pub error: Option<String>,
    pub is_registered_user: bool,
}

impl BatchResult {
    pub fn sent(
        email: String,
        user_id: Option<Uuid>,
        invitation_id: Uuid,
        is_registered_user: bool,
    ) -> Self {
        Self {
            email: Some(email),
            user_id,
            success: true,
            invitation_id: Some(invitation_id),
            error: None,
            is_registered_user,
        }
    }

    /// A target that failed before its identity was resolved. Email
    /// targets report the normalised address.
    pub fn failed(target: &BatchTarget, error: impl ToString) -> Self {
        let (email, user_id) = match target {
            BatchTarget::Email(email) => (Some(normalize_email(email)), None),
            BatchTarget::User(user) => (user.email.clone(), Some(user.id)),
        };
        Self {
            email,
            user_id,
            success: false,
            invitation_id: None,
            error: Some(error.to_string()),
            is_registered_user: false,
        }
    }

    /// A target that failed after resolution to `email` and, for registered
    /// invitees, `user_id`.
    pub fn rejected(email: String, user_id: Option<Uuid>, error: impl ToString) -> Self {
        Self {
            email: Some(email),
            user_id,
            success: false,
            invitation_id: None,
            error: Some(error.to_string()),
            is_registered_user: user_id.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub sent: usize,
    pub failed: usize,
}

impl From<&[BatchResult]> for BatchSummary {
    fn from(results: &[BatchResult]) -> Self {
        let sent = results.iter().filter(|r| r.success).count();
        Self {
            sent,
            failed: results.len() - sent,
        }
    }
}
