use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use futures_util::{stream, StreamExt};
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::{dedup::InvitationDeduplicator, invitation_error};
use crate::{
    config::DispatchSettings,
    db::RecordStore,
    error::{DispatchError, StoreError, TargetError, TemplateError},
    models::{
        BatchResult, BatchSummary, BatchTarget, BulkInviteRequest, EventDetails, Invitation,
        InvitationStatus, InviteSettings, InviteeKey, NewInvitation, ResendOutcome, User,
    },
    template::{EventInvitationPayload, Template, TemplateSource, EVENT_INVITATION},
    transport::Transport,
    utils::email::{is_valid_email, normalize_email},
};

/// Everything loaded once per batch and shared by its targets.
struct BatchContext<'a> {
    event: EventDetails,
    inviter: User,
    template: Template,
    settings: &'a InviteSettings,
}

/// A target whose identity has been resolved against the user table.
struct Resolved {
    email: String,
    user: Option<User>,
    key: InviteeKey,
}

impl Resolved {
    fn rejected(&self, error: impl ToString) -> BatchResult {
        BatchResult::rejected(self.email.clone(), self.user.as_ref().map(|u| u.id), error)
    }
}

struct Rendered {
    to: String,
    subject: String,
    html: String,
}

/// Creates invitations for a batch of targets and notifies each invitee.
///
/// Only a missing event, inviter or template aborts a batch. Everything
/// that goes wrong for a single target ends up in that target's
/// [`BatchResult`], and results always come back in input order.
pub struct InvitationBatchProcessor {
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn Transport>,
    templates: Arc<dyn TemplateSource>,
    dedup: InvitationDeduplicator,
    settings: DispatchSettings,
}

impl InvitationBatchProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn Transport>,
        templates: Arc<dyn TemplateSource>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            dedup: InvitationDeduplicator::new(store.clone()),
            store,
            transport,
            templates,
            settings,
        }
    }

    pub async fn send_bulk(
        &self,
        event_id: Uuid,
        inviter_id: Uuid,
        request: &BulkInviteRequest,
        settings: &InviteSettings,
    ) -> Result<Vec<BatchResult>, DispatchError> {
        info!(
            "Processing {} invitation target(s) for event {}",
            request.len(),
            event_id
        );

        let event = self.store.find_event(event_id).await?.ok_or_else(|| {
            error!("Bulk invite aborted: event {} not found", event_id);
            DispatchError::EventNotFound(event_id)
        })?;
        let inviter = self.store.find_user(inviter_id).await?.ok_or_else(|| {
            error!("Bulk invite aborted: inviter {} not found", inviter_id);
            DispatchError::InviterNotFound(inviter_id)
        })?;
        let template = self.load_template().await?;

        let context = BatchContext {
            event,
            inviter,
            template,
            settings,
        };
        let targets = request.targets();
        let concurrency = self.settings.concurrency.max(1);

        let resolved: Vec<Result<Resolved, BatchResult>> = stream::iter(targets.iter())
            .map(|target| async move {
                self.resolve(target).await.map_err(|e| {
                    warn!("Failed to invite {}: {}", describe(target), e);
                    BatchResult::failed(target, e)
                })
            })
            .buffered(concurrency)
            .collect()
            .await;
        let resolved = mark_repeats(resolved);

        let context = &context;
        let results: Vec<BatchResult> = stream::iter(resolved)
            .map(|resolved| async move {
                match resolved {
                    Ok(resolved) => self.dispatch(context, event_id, resolved).await,
                    Err(result) => result,
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let summary = BatchSummary::from(results.as_slice());
        info!(
            "Bulk invite for event {} finished: {} sent, {} failed",
            event_id, summary.sent, summary.failed
        );
        Ok(results)
    }

    /// Sends a pending invitation again, counting it as a reminder.
    pub async fn resend(&self, invitation_id: Uuid) -> Result<ResendOutcome, DispatchError> {
        let invitation = self
            .store
            .get_invitation(invitation_id)
            .await?
            .ok_or(DispatchError::InvitationNotFound(invitation_id))?;
        if !invitation.status.is_pending() {
            return Err(DispatchError::AlreadyResponded(invitation_id));
        }

        let event = self
            .store
            .find_event(invitation.event_id)
            .await?
            .ok_or(DispatchError::EventNotFound(invitation.event_id))?;
        let inviter = self
            .store
            .find_user(invitation.invited_by)
            .await?
            .ok_or(DispatchError::InviterNotFound(invitation.invited_by))?;
        let invitee = match invitation.invited_user_id {
            Some(user_id) => self.store.find_user(user_id).await?,
            None => None,
        };
        let template = self.load_template().await?;

        let invitation = self
            .store
            .record_reminder(invitation_id, Utc::now())
            .await
            .map_err(|e| invitation_error(invitation_id, e))?;

        let payload = EventInvitationPayload::build(
            &event,
            &inviter,
            &invitation,
            invitee.as_ref(),
            &self.settings.base_url,
        )
        .into_reminder();
        let rendered = render(&template, payload)?;
        self.transport
            .send(&rendered.to, &rendered.subject, &rendered.html)
            .await?;

        info!(
            "Resent invitation {} to {} (reminder #{})",
            invitation_id, rendered.to, invitation.reminder_count
        );
        Ok(ResendOutcome {
            invitation_id,
            reminder_count: invitation.reminder_count,
        })
    }

    pub async fn list_invitations(
        &self,
        event_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<Invitation>, DispatchError> {
        Ok(self.store.list_invitations(event_id, status).await?)
    }

    async fn load_template(&self) -> Result<Template, DispatchError> {
        let source = self.templates.load(EVENT_INVITATION).await.map_err(|e| {
            error!("Cannot load template {}: {}", EVENT_INVITATION, e);
            e
        })?;
        Ok(Template::parse(&source))
    }

    async fn resolve(&self, target: &BatchTarget) -> Result<Resolved, TargetError> {
        match target {
            BatchTarget::Email(raw) => {
                let email = normalize_email(raw);
                if !is_valid_email(&email) {
                    return Err(TargetError::InvalidEmail(raw.trim().to_string()));
                }
                let user = self.store.find_user_by_email(&email).await?;
                let key = InvitationDeduplicator::key_for(user.as_ref().map(|u| u.id), &email);
                Ok(Resolved {
                    email,
                    user,
                    key,
                })
            }
            BatchTarget::User(user_ref) => {
                let user = self
                    .store
                    .find_user(user_ref.id)
                    .await?
                    .ok_or(TargetError::UserNotFound(user_ref.id))?;
                Ok(Resolved {
                    email: user.email.clone(),
                    key: InviteeKey::User(user.id),
                    user: Some(user),
                })
            }
        }
    }

    async fn dispatch(
        &self,
        context: &BatchContext<'_>,
        event_id: Uuid,
        resolved: Resolved,
    ) -> BatchResult {
        let invitation = match self.create(event_id, context, &resolved).await {
            Ok(invitation) => invitation,
            Err(e) => {
                warn!("Failed to invite {}: {}", resolved.email, e);
                return resolved.rejected(e);
            }
        };

        let is_registered = resolved.user.is_some();
        match self.notify(context, &invitation, resolved.user.as_ref()).await {
            Ok(()) => {
                debug!("Invitation {} sent to {}", invitation.id, resolved.email);
                BatchResult::sent(
                    resolved.email,
                    invitation.invited_user_id,
                    invitation.id,
                    is_registered,
                )
            }
            Err(e) => {
                // The invitation stays pending and can be resent later.
                warn!(
                    "Invitation {} created but not delivered to {}: {}",
                    invitation.id, resolved.email, e
                );
                let mut result = resolved.rejected(e);
                result.invitation_id = Some(invitation.id);
                result
            }
        }
    }

    async fn create(
        &self,
        event_id: Uuid,
        context: &BatchContext<'_>,
        resolved: &Resolved,
    ) -> Result<Invitation, TargetError> {
        let check = self.dedup.check(event_id, &resolved.key).await?;
        if check.conflict {
            return Err(TargetError::AlreadyInvited(resolved.email.clone()));
        }

        self.store
            .create_invitation(NewInvitation {
                event_id,
                invited_user_id: resolved.user.as_ref().map(|u| u.id),
                invited_email: resolved.email.clone(),
                invited_by: context.inviter.id,
                invitation_type: context.settings.role,
                personal_message: context.settings.personal_message.clone(),
                max_guests: context.settings.max_guests,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => TargetError::AlreadyInvited(resolved.email.clone()),
                other => other.into(),
            })
    }

    async fn notify(
        &self,
        context: &BatchContext<'_>,
        invitation: &Invitation,
        invitee: Option<&User>,
    ) -> Result<(), TargetError> {
        let payload = EventInvitationPayload::build(
            &context.event,
            &context.inviter,
            invitation,
            invitee,
            &self.settings.base_url,
        );
        let rendered = render(&context.template, payload)?;
        self.transport
            .send(&rendered.to, &rendered.subject, &rendered.html)
            .await?;
        Ok(())
    }
}

fn render(template: &Template, payload: EventInvitationPayload) -> Result<Rendered, TemplateError> {
    let context = payload.to_context()?;
    Ok(Rendered {
        html: template.render(&context),
        subject: payload.subject(),
        to: payload.to,
    })
}

/// Fails every resolved target whose identity already appeared earlier in
/// the same batch.
fn mark_repeats(resolved: Vec<Result<Resolved, BatchResult>>) -> Vec<Result<Resolved, BatchResult>> {
    let mut seen = HashSet::new();
    resolved
        .into_iter()
        .map(|entry| match entry {
            Ok(r) if !seen.insert(r.key.clone()) => {
                let error = TargetError::DuplicateInBatch(r.email.clone());
                warn!("Failed to invite {}: {}", r.email, error);
                Err(r.rejected(error))
            }
            other => other,
        })
        .collect()
}

fn describe(target: &BatchTarget) -> String {
    match target {
        BatchTarget::Email(email) => email.clone(),
        BatchTarget::User(user) => format!("user {}", user.id),
    }
}
