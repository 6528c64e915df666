use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{prelude::FromRow, PgPool};
use uuid::Uuid;

use super::store::RecordStore;
use crate::{
    error::StoreError,
    models::{
        Capabilities, Event, EventDetails, EventLocation, EventRole, EventRoleUpsert, Invitation,
        InvitationResponse, InvitationStatus, InviteeKey, NewInvitation, User,
    },
};

const INVITATION_COLUMNS: &str = r#"
    id, event_id, invited_user_id, invited_email, invited_by, invitation_type,
    personal_message, max_guests, status, reminder_count, reminder_sent_at,
    response_date, guest_count, dietary_restrictions, special_requests, created_at
"#;

const ROLE_COLUMNS: &str = r#"
    event_id, user_id, role, can_invite_users, can_edit_event, can_manage_locations,
    can_view_analytics, can_send_messages, assigned_by, is_active
"#;

/// [`RecordStore`] over the `event_invitations` schema in `migrations/`.
/// Uniqueness of invitations is enforced by the table's unique indexes.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn invitation_state(&self, invitation_id: Uuid) -> StoreError {
        match self.get_invitation(invitation_id).await {
            Ok(Some(_)) => StoreError::NotPending(invitation_id),
            Ok(None) => StoreError::NotFound(format!("invitation {}", invitation_id)),
            Err(e) => e,
        }
    }
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    slug: String,
    description: Option<String>,
    event_type: String,
    category: Option<String>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_paid: bool,
    price: Option<Decimal>,
    currency: Option<String>,
    max_participants: Option<i32>,
    age_restriction: Option<String>,
    dress_code: Option<String>,
    require_approval: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            event_type: row.event_type,
            category: row.category,
            start_date: row.start_date,
            end_date: row.end_date,
            is_paid: row.is_paid,
            price: row.price,
            currency: row.currency,
            max_participants: row.max_participants.map(from_i32).transpose()?,
            age_restriction: row.age_restriction,
            dress_code: row.dress_code,
            require_approval: row.require_approval,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct LocationRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    venue_type: Option<String>,
    address: Option<String>,
    start_datetime: DateTime<Utc>,
    end_datetime: DateTime<Utc>,
    capacity: Option<i32>,
    online_url: Option<String>,
    online_platform: Option<String>,
    meeting_id: Option<String>,
    access_code: Option<String>,
    special_instructions: Option<String>,
    parking_info: Option<String>,
    public_transport: Option<String>,
    display_order: i32,
    is_active: bool,
}

impl TryFrom<LocationRow> for EventLocation {
    type Error = StoreError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        Ok(EventLocation {
            id: row.id,
            event_id: row.event_id,
            name: row.name,
            venue_type: row.venue_type,
            address: row.address,
            start_datetime: row.start_datetime,
            end_datetime: row.end_datetime,
            capacity: row.capacity.map(from_i32).transpose()?,
            online_url: row.online_url,
            online_platform: row.online_platform,
            meeting_id: row.meeting_id,
            access_code: row.access_code,
            special_instructions: row.special_instructions,
            parking_info: row.parking_info,
            public_transport: row.public_transport,
            display_order: row.display_order,
            is_active: row.is_active,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
        }
    }
}

#[derive(FromRow)]
struct InvitationRow {
    id: Uuid,
    event_id: Uuid,
    invited_user_id: Option<Uuid>,
    invited_email: String,
    invited_by: Uuid,
    invitation_type: String,
    personal_message: Option<String>,
    max_guests: i32,
    status: String,
    reminder_count: i32,
    reminder_sent_at: Option<DateTime<Utc>>,
    response_date: Option<DateTime<Utc>>,
    guest_count: Option<i32>,
    dietary_restrictions: Option<String>,
    special_requests: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = StoreError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Invitation {
            id: row.id,
            event_id: row.event_id,
            invited_user_id: row.invited_user_id,
            invited_email: row.invited_email,
            invited_by: row.invited_by,
            invitation_type: row.invitation_type.parse()?,
            personal_message: row.personal_message,
            max_guests: from_i32(row.max_guests)?,
            status: row.status.parse()?,
            reminder_count: from_i32(row.reminder_count)?,
            reminder_sent_at: row.reminder_sent_at,
            response_date: row.response_date,
            guest_count: row.guest_count.map(from_i32).transpose()?,
            dietary_restrictions: row.dietary_restrictions,
            special_requests: row.special_requests,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RoleRow {
    event_id: Uuid,
    user_id: Uuid,
    role: String,
    can_invite_users: bool,
    can_edit_event: bool,
    can_manage_locations: bool,
    can_view_analytics: bool,
    can_send_messages: bool,
    assigned_by: Option<Uuid>,
    is_active: bool,
}

impl TryFrom<RoleRow> for EventRole {
    type Error = StoreError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(EventRole {
            event_id: row.event_id,
            user_id: row.user_id,
            role: row.role.parse()?,
            capabilities: Capabilities {
                can_invite_users: row.can_invite_users,
                can_edit_event: row.can_edit_event,
                can_manage_locations: row.can_manage_locations,
                can_view_analytics: row.can_view_analytics,
                can_send_messages: row.can_send_messages,
            },
            assigned_by: row.assigned_by,
            is_active: row.is_active,
        })
    }
}

fn from_i32(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative count {}", value)))
}

fn to_i32(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("count {} out of range", value)))
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<EventDetails>, StoreError> {
        let Some(row) = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, slug, description, type AS event_type, category,
                   start_date, end_date, is_paid, price, currency, max_participants,
                   age_restriction, dress_code, require_approval, created_by, created_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let locations = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, event_id, name, venue_type, address, start_datetime, end_datetime,
                   capacity, online_url, online_platform, meeting_id, access_code,
                   special_instructions, parking_info, public_transport, display_order, is_active
            FROM event_locations
            WHERE event_id = $1 AND is_active
            ORDER BY display_order ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(EventLocation::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let participants = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM event_roles
            WHERE event_id = $1 AND role = 'participant' AND is_active
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(EventDetails {
            event: row.try_into()?,
            locations,
            current_participants: u32::try_from(participants).unwrap_or(u32::MAX),
        }))
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, email FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, email FROM users WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user.map(User::from))
    }

    async fn find_invitation(
        &self,
        event_id: Uuid,
        key: &InviteeKey,
    ) -> Result<Option<Invitation>, StoreError> {
        let row = match key {
            InviteeKey::User(user_id) => {
                sqlx::query_as::<_, InvitationRow>(&format!(
                    "SELECT {} FROM event_invitations WHERE event_id = $1 AND invited_user_id = $2",
                    INVITATION_COLUMNS
                ))
                .bind(event_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
            }
            InviteeKey::Email(email) => {
                sqlx::query_as::<_, InvitationRow>(&format!(
                    r#"
                    SELECT {} FROM event_invitations
                    WHERE event_id = $1 AND lower(invited_email) = lower($2)
                      AND invited_user_id IS NULL
                    "#,
                    INVITATION_COLUMNS
                ))
                .bind(event_id)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(Invitation::try_from).transpose()
    }

    async fn get_invitation(&self, invitation_id: Uuid) -> Result<Option<Invitation>, StoreError> {
        sqlx::query_as::<_, InvitationRow>(&format!(
            "SELECT {} FROM event_invitations WHERE id = $1",
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Invitation::try_from)
        .transpose()
    }

    async fn list_invitations(
        &self,
        event_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<Invitation>, StoreError> {
        sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            SELECT {} FROM event_invitations
            WHERE event_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            INVITATION_COLUMNS
        ))
        .bind(event_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Invitation::try_from)
        .collect()
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Invitation, StoreError> {
        let key = invitation.invitee_key();
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            INSERT INTO event_invitations
                (event_id, invited_user_id, invited_email, invited_by, invitation_type,
                 personal_message, max_guests, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(invitation.event_id)
        .bind(invitation.invited_user_id)
        .bind(&invitation.invited_email)
        .bind(invitation.invited_by)
        .bind(invitation.invitation_type.as_str())
        .bind(&invitation.personal_message)
        .bind(to_i32(invitation.max_guests)?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(key)
            }
            other => StoreError::Database(other),
        })?;

        row.try_into()
    }

    async fn record_reminder(
        &self,
        invitation_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<Invitation, StoreError> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            UPDATE event_invitations
            SET reminder_count = reminder_count + 1, reminder_sent_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .bind(sent_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.invitation_state(invitation_id).await),
        }
    }

    async fn respond(
        &self,
        invitation_id: Uuid,
        response: InvitationResponse,
        grant: Option<EventRoleUpsert>,
    ) -> Result<(Invitation, Option<EventRole>), StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            UPDATE event_invitations
            SET status = $2, response_date = $3, guest_count = $4,
                dietary_restrictions = $5, special_requests = $6
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .bind(response.status.as_str())
        .bind(response.responded_at)
        .bind(to_i32(response.details.guest_count)?)
        .bind(response.details.dietary_restrictions)
        .bind(response.details.special_requests)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(self.invitation_state(invitation_id).await);
        };
        let invitation = Invitation::try_from(row)?;

        let role = match (grant, invitation.invited_user_id) {
            (Some(upsert), Some(user_id)) => {
                let caps = upsert.capabilities;
                let row = sqlx::query_as::<_, RoleRow>(&format!(
                    r#"
                    INSERT INTO event_roles
                        (event_id, user_id, role, can_invite_users, can_edit_event,
                         can_manage_locations, can_view_analytics, can_send_messages,
                         assigned_by, is_active)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE)
                    ON CONFLICT (event_id, user_id)
                    DO UPDATE SET role = EXCLUDED.role, is_active = TRUE
                    RETURNING {}
                    "#,
                    ROLE_COLUMNS
                ))
                .bind(invitation.event_id)
                .bind(user_id)
                .bind(upsert.role.as_str())
                .bind(caps.can_invite_users)
                .bind(caps.can_edit_event)
                .bind(caps.can_manage_locations)
                .bind(caps.can_view_analytics)
                .bind(caps.can_send_messages)
                .bind(upsert.assigned_by)
                .fetch_one(&mut *tx)
                .await?;
                Some(EventRole::try_from(row)?)
            }
            _ => None,
        };

        tx.commit().await?;
        Ok((invitation, role))
    }
}
