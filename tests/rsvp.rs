mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{participant_settings, user, user_ref, Harness, ScriptedStore};
use event_invites::{
    db::RecordStore,
    models::{
        BulkInviteRequest, Capabilities, EventRole, EventRoleUpsert, InvitationResponse,
        InvitationRole, InvitationStatus, InviteSettings, ResponseDetails, RsvpAction, User,
    },
    DispatchError, StoreError,
};
use uuid::Uuid;

async fn invite_user(h: &Harness, invitee: &User, settings: &InviteSettings) -> Uuid {
    let request = BulkInviteRequest {
        emails: Vec::new(),
        users: vec![user_ref(invitee)],
    };
    let results = h
        .processor
        .send_bulk(h.event_id, h.inviter.id, &request, settings)
        .await
        .unwrap();
    results[0].invitation_id.unwrap()
}

async fn invite_email(h: &Harness, email: &str) -> Uuid {
    let request = BulkInviteRequest {
        emails: vec![email.to_string()],
        users: Vec::new(),
    };
    let results = h
        .processor
        .send_bulk(h.event_id, h.inviter.id, &request, &participant_settings(0))
        .await
        .unwrap();
    results[0].invitation_id.unwrap()
}

#[tokio::test]
async fn accept_grants_exactly_one_role() {
    let h = Harness::new().await;
    let ada = user("Ada", "Lovelace", "ada@x.com");
    h.register(&ada).await;
    let invitation_id = invite_user(&h, &ada, &participant_settings(0)).await;

    let outcome = h
        .rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap();
    assert_eq!(outcome.status, InvitationStatus::Accepted);
    assert_eq!(outcome.invitation_id, invitation_id);
    assert_eq!(outcome.event_id, h.event_id);

    let role = h.store.event_role(h.event_id, ada.id).await.unwrap();
    assert_eq!(role.role, InvitationRole::Participant);
    assert_eq!(role.capabilities, Capabilities::default());
    assert_eq!(role.assigned_by, Some(h.inviter.id));
    assert!(role.is_active);

    let err = h
        .rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::AlreadyResponded(id) if id == invitation_id));

    // Creator plus the new participant.
    assert_eq!(h.store.event_roles(h.event_id).await.len(), 2);
}

#[tokio::test]
async fn failed_role_grant_leaves_invitation_pending() {
    let h = Harness::with_store(|memory| {
        Arc::new(ScriptedStore::new(memory).failing_grants(1)) as Arc<dyn RecordStore>
    })
    .await;
    let ada = user("Ada", "Lovelace", "ada@x.com");
    h.register(&ada).await;
    let invitation_id = invite_user(&h, &ada, &participant_settings(0)).await;

    let err = h
        .rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Store(_)));

    let invitations = h.store.invitations().await;
    let invitation = invitations.iter().find(|i| i.id == invitation_id).unwrap();
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert!(invitation.response_date.is_none());
    assert!(h.store.event_role(h.event_id, ada.id).await.is_none());

    let outcome = h
        .rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap();
    assert_eq!(outcome.status, InvitationStatus::Accepted);
    assert!(h.store.event_role(h.event_id, ada.id).await.is_some());
    assert_eq!(h.store.event_roles(h.event_id).await.len(), 2);
}

#[tokio::test]
async fn store_grants_no_role_once_answered() {
    let h = Harness::new().await;
    let ada = user("Ada", "Lovelace", "ada@x.com");
    h.register(&ada).await;
    let invitation_id = invite_user(&h, &ada, &participant_settings(0)).await;
    h.rsvp
        .apply(invitation_id, RsvpAction::Decline, None)
        .await
        .unwrap();

    let err = h
        .store
        .respond(
            invitation_id,
            InvitationResponse {
                status: InvitationStatus::Accepted,
                responded_at: Utc::now(),
                details: ResponseDetails::default(),
            },
            Some(EventRoleUpsert::from_role(InvitationRole::Participant, h.inviter.id)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotPending(id) if id == invitation_id));
    assert!(h.store.event_role(h.event_id, ada.id).await.is_none());
}

#[tokio::test]
async fn accepted_organizer_gets_organizer_capabilities() {
    let h = Harness::new().await;
    let ada = user("Ada", "Lovelace", "ada@x.com");
    h.register(&ada).await;
    let settings = InviteSettings {
        role: InvitationRole::Organizer,
        ..participant_settings(0)
    };
    let invitation_id = invite_user(&h, &ada, &settings).await;

    h.rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap();

    let role = h.store.event_role(h.event_id, ada.id).await.unwrap();
    assert_eq!(role.role, InvitationRole::Organizer);
    assert!(role.capabilities.can_manage_locations);
    assert!(role.capabilities.can_send_messages);
    assert!(!role.capabilities.can_edit_event);
    assert!(!role.capabilities.can_invite_users);
}

#[tokio::test]
async fn decline_records_details_without_role() {
    let h = Harness::new().await;
    let ada = user("Ada", "Lovelace", "ada@x.com");
    h.register(&ada).await;
    let invitation_id = invite_user(&h, &ada, &participant_settings(2)).await;

    let details = ResponseDetails {
        guest_count: 1,
        dietary_restrictions: Some("vegetarian".into()),
        special_requests: Some("aisle seat".into()),
    };
    let outcome = h
        .rsvp
        .apply(invitation_id, RsvpAction::Decline, Some(details))
        .await
        .unwrap();
    assert_eq!(outcome.status, InvitationStatus::Declined);

    let invitation = h
        .store
        .invitations()
        .await
        .into_iter()
        .find(|i| i.id == invitation_id)
        .unwrap();
    assert_eq!(invitation.status, InvitationStatus::Declined);
    assert!(invitation.response_date.is_some());
    assert_eq!(invitation.guest_count, Some(1));
    assert_eq!(invitation.dietary_restrictions.as_deref(), Some("vegetarian"));
    assert_eq!(invitation.special_requests.as_deref(), Some("aisle seat"));

    assert!(h.store.event_role(h.event_id, ada.id).await.is_none());

    let err = h
        .rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::AlreadyResponded(_)));
}

#[tokio::test]
async fn accepting_email_only_invitation_grants_no_role() {
    let h = Harness::new().await;
    let invitation_id = invite_email(&h, "walkin@x.com").await;

    let outcome = h
        .rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap();
    assert_eq!(outcome.status, InvitationStatus::Accepted);

    let invitation = h
        .store
        .invitations()
        .await
        .into_iter()
        .find(|i| i.id == invitation_id)
        .unwrap();
    assert_eq!(invitation.guest_count, Some(0));
    assert_eq!(h.store.event_roles(h.event_id).await.len(), 1);
}

#[tokio::test]
async fn accept_reactivates_existing_membership() {
    let h = Harness::new().await;
    let ada = user("Ada", "Lovelace", "ada@x.com");
    h.register(&ada).await;
    h.store
        .insert_event_role(EventRole {
            event_id: h.event_id,
            user_id: ada.id,
            role: InvitationRole::Moderator,
            capabilities: Capabilities::for_role(InvitationRole::Moderator),
            assigned_by: None,
            is_active: false,
        })
        .await;

    let invitation_id = invite_user(&h, &ada, &participant_settings(0)).await;
    h.rsvp
        .apply(invitation_id, RsvpAction::Accept, None)
        .await
        .unwrap();

    let role = h.store.event_role(h.event_id, ada.id).await.unwrap();
    assert!(role.is_active);
    assert_eq!(role.role, InvitationRole::Participant);
    assert_eq!(
        role.capabilities,
        Capabilities::for_role(InvitationRole::Moderator)
    );
    assert_eq!(role.assigned_by, None);
    assert_eq!(h.store.event_roles(h.event_id).await.len(), 2);
}

#[tokio::test]
async fn concurrent_answers_apply_once() {
    let h = Harness::new().await;
    let ada = user("Ada", "Lovelace", "ada@x.com");
    h.register(&ada).await;
    let invitation_id = invite_user(&h, &ada, &participant_settings(0)).await;

    let (accept, decline) = tokio::join!(
        h.rsvp.apply(invitation_id, RsvpAction::Accept, None),
        h.rsvp.apply(invitation_id, RsvpAction::Decline, None),
    );
    assert!(accept.is_ok() ^ decline.is_ok());

    let role = h.store.event_role(h.event_id, ada.id).await;
    assert_eq!(role.is_some(), accept.is_ok());
}

#[tokio::test]
async fn unknown_invitation_is_not_found() {
    let h = Harness::new().await;
    let unknown = Uuid::new_v4();

    let err = h
        .rsvp
        .apply(unknown, RsvpAction::Decline, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvitationNotFound(id) if id == unknown));
}
