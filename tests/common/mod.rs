#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use event_invites::{
    db::{MemoryStore, RecordStore},
    models::{
        Event, EventDetails, EventLocation, EventRole, EventRoleUpsert, Invitation,
        InvitationResponse, InvitationRole, InvitationStatus, InviteSettings, InviteeKey,
        NewInvitation, User, UserRef,
    },
    template::{StaticTemplateSource, TemplateSource},
    transport::Transport,
    DispatchSettings, InvitationBatchProcessor, RsvpStateMachine, StoreError, TransportError,
};
use uuid::Uuid;

pub const BASE_URL: &str = "https://events.test";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Records every message; addresses registered with `fail_for` are rejected.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn fail_for(&self, email: &str) {
        self.failing.lock().unwrap().insert(email.to_string());
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, email: &str) -> Vec<SentEmail> {
        self.sent().into_iter().filter(|m| m.to == email).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), TransportError> {
        if self.failing.lock().unwrap().contains(to) {
            return Err(TransportError::Rejected {
                status: 550,
                body: "mailbox unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Delegates to a [`MemoryStore`] with switchable faults.
pub struct ScriptedStore {
    inner: Arc<MemoryStore>,
    hide_existing: bool,
    failing_grants: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            hide_existing: false,
            failing_grants: AtomicUsize::new(0),
        }
    }

    /// `find_invitation` never sees anything, so only `create_invitation`
    /// can detect a duplicate.
    pub fn hiding_existing(mut self) -> Self {
        self.hide_existing = true;
        self
    }

    /// The next `count` responses that grant a role fail as a whole.
    pub fn failing_grants(self, count: usize) -> Self {
        self.failing_grants.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<EventDetails>, StoreError> {
        self.inner.find_event(event_id).await
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_user(user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_invitation(
        &self,
        event_id: Uuid,
        key: &InviteeKey,
    ) -> Result<Option<Invitation>, StoreError> {
        if self.hide_existing {
            return Ok(None);
        }
        self.inner.find_invitation(event_id, key).await
    }

    async fn get_invitation(&self, invitation_id: Uuid) -> Result<Option<Invitation>, StoreError> {
        self.inner.get_invitation(invitation_id).await
    }

    async fn list_invitations(
        &self,
        event_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<Invitation>, StoreError> {
        self.inner.list_invitations(event_id, status).await
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Invitation, StoreError> {
        self.inner.create_invitation(invitation).await
    }

    async fn record_reminder(
        &self,
        invitation_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<Invitation, StoreError> {
        self.inner.record_reminder(invitation_id, sent_at).await
    }

    async fn respond(
        &self,
        invitation_id: Uuid,
        response: InvitationResponse,
        grant: Option<EventRoleUpsert>,
    ) -> Result<(Invitation, Option<EventRole>), StoreError> {
        let fail = grant.is_some()
            && self
                .failing_grants
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if fail {
            return Err(StoreError::Corrupt("event_roles write failed".into()));
        }
        self.inner.respond(invitation_id, response, grant).await
    }
}

pub fn user(first: &str, last: &str, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: first.into(),
        last_name: last.into(),
        email: email.into(),
    }
}

pub fn user_ref(user: &User) -> UserRef {
    UserRef {
        id: user.id,
        email: Some(user.email.clone()),
    }
}

pub fn event_details(created_by: Uuid) -> EventDetails {
    let start = Utc.with_ymd_and_hms(2025, 6, 13, 19, 0, 0).unwrap();
    let event_id = Uuid::new_v4();
    EventDetails {
        event: Event {
            id: event_id,
            title: "Launch Party".into(),
            slug: "launch-party-1718300000".into(),
            description: Some("Celebrating the release".into()),
            event_type: "hybrid".into(),
            category: Some("party".into()),
            start_date: start,
            end_date: start + Duration::hours(4),
            is_paid: false,
            price: None,
            currency: Some("EUR".into()),
            max_participants: Some(50),
            age_restriction: None,
            dress_code: None,
            require_approval: false,
            created_by,
            created_at: start - Duration::days(30),
        },
        locations: vec![
            EventLocation {
                id: Uuid::new_v4(),
                event_id,
                name: "Main Hall".into(),
                venue_type: Some("primary".into()),
                address: Some("1 Harbour Road".into()),
                start_datetime: start,
                end_datetime: start + Duration::hours(4),
                capacity: Some(50),
                online_url: None,
                online_platform: None,
                meeting_id: None,
                access_code: None,
                special_instructions: None,
                parking_info: None,
                public_transport: None,
                display_order: 0,
                is_active: true,
            },
            EventLocation {
                id: Uuid::new_v4(),
                event_id,
                name: "Old Annex".into(),
                venue_type: Some("backup".into()),
                address: None,
                start_datetime: start,
                end_datetime: start,
                capacity: None,
                online_url: None,
                online_platform: None,
                meeting_id: None,
                access_code: None,
                special_instructions: None,
                parking_info: None,
                public_transport: None,
                display_order: 1,
                is_active: false,
            },
        ],
        current_participants: 0,
    }
}

pub fn participant_settings(max_guests: u32) -> InviteSettings {
    InviteSettings {
        role: InvitationRole::Participant,
        personal_message: None,
        max_guests,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub processor: InvitationBatchProcessor,
    pub rsvp: RsvpStateMachine,
    pub event_id: Uuid,
    pub inviter: User,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_templates(Arc::new(StaticTemplateSource::bundled())).await
    }

    pub async fn with_templates(templates: Arc<dyn TemplateSource>) -> Self {
        Self::build(templates, |store| store as Arc<dyn RecordStore>).await
    }

    /// Runs the services against `wrap(memory_store)` while seeding and
    /// inspecting the memory store directly.
    pub async fn with_store(
        wrap: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn RecordStore>,
    ) -> Self {
        Self::build(Arc::new(StaticTemplateSource::bundled()), wrap).await
    }

    async fn build(
        templates: Arc<dyn TemplateSource>,
        wrap: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn RecordStore>,
    ) -> Self {
        init_logging();

        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let inviter = user("Grace", "Hopper", "grace@host.test");
        let details = event_details(inviter.id);
        let event_id = details.event.id;

        store.insert_user(inviter.clone()).await;
        store
            .insert_event_role(EventRole::for_creator(event_id, inviter.id))
            .await;
        store.insert_event(details).await;

        let services = wrap(store.clone());
        let processor = InvitationBatchProcessor::new(
            services.clone(),
            transport.clone() as Arc<dyn Transport>,
            templates,
            DispatchSettings::new(BASE_URL).with_concurrency(4),
        );
        let rsvp = RsvpStateMachine::new(services);

        Self {
            store,
            transport,
            processor,
            rsvp,
            event_id,
            inviter,
        }
    }

    pub async fn register(&self, user: &User) {
        self.store.insert_user(user.clone()).await;
    }
}
