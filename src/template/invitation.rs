use serde::Serialize;

use super::engine::{self, Context};
use crate::{
    error::TemplateError,
    models::{EventDetails, EventLocation, Invitation, User},
    utils::{email::local_part, time::format_datetime},
};

const REMINDER_PREFIX: &str = "REMINDER: ";

/// Render context for the `event-invitation` template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInvitationPayload {
    pub to: String,
    pub invited_user_name: String,
    pub inviter_name: String,
    pub inviter_email: String,
    pub invitation_role: String,
    pub personal_message: Option<String>,

    pub event_title: String,
    pub event_description: Option<String>,
    pub event_type: String,
    pub event_category: String,
    pub event_start_date: String,
    pub event_end_date: String,

    pub is_paid: bool,
    pub price: Option<String>,
    pub currency: String,
    pub max_participants: Option<u32>,
    pub current_participants: u32,
    pub max_guests: u32,
    pub age_restriction: Option<String>,
    pub dress_code: Option<String>,
    pub requires_approval: bool,

    pub locations: Vec<LocationPayload>,

    pub accept_url: String,
    pub decline_url: String,
    pub event_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub name: String,
    pub venue_type: Option<String>,
    pub address: Option<String>,
    pub start_datetime: String,
    pub end_datetime: String,
    pub capacity: Option<u32>,
    pub online_url: Option<String>,
    pub online_platform: Option<String>,
    pub meeting_id: Option<String>,
    pub access_code: Option<String>,
    pub special_instructions: Option<String>,
    pub parking_info: Option<String>,
    pub public_transport: Option<String>,
}

impl From<&EventLocation> for LocationPayload {
    fn from(location: &EventLocation) -> Self {
        Self {
            name: location.name.clone(),
            venue_type: location.venue_type.clone(),
            address: location.address.clone(),
            start_datetime: format_datetime(&location.start_datetime),
            end_datetime: format_datetime(&location.end_datetime),
            capacity: location.capacity,
            online_url: location.online_url.clone(),
            online_platform: location.online_platform.clone(),
            meeting_id: location.meeting_id.clone(),
            access_code: location.access_code.clone(),
            special_instructions: location.special_instructions.clone(),
            parking_info: location.parking_info.clone(),
            public_transport: location.public_transport.clone(),
        }
    }
}

/// Links a recipient uses to answer an invitation.
#[derive(Debug, Clone, PartialEq)]
pub struct RsvpLinks {
    pub accept: String,
    pub decline: String,
    pub event: String,
}

impl RsvpLinks {
    pub fn new(base_url: &str, slug: &str, invitation: &Invitation) -> Self {
        let event = format!("{}/events/{}", base_url.trim_end_matches('/'), slug);
        Self {
            accept: format!("{}/rsvp?invitation={}&action=accept", event, invitation.id),
            decline: format!("{}/rsvp?invitation={}&action=decline", event, invitation.id),
            event,
        }
    }
}

impl EventInvitationPayload {
    /// `invitee` is the registered user behind the invitation, if any.
    pub fn build(
        details: &EventDetails,
        inviter: &User,
        invitation: &Invitation,
        invitee: Option<&User>,
        base_url: &str,
    ) -> Self {
        let event = &details.event;
        let links = RsvpLinks::new(base_url, &event.slug, invitation);
        let invited_user_name = match invitee {
            Some(user) => user.full_name(),
            None => local_part(&invitation.invited_email).to_string(),
        };

        Self {
            to: invitee
                .map(|user| user.email.clone())
                .unwrap_or_else(|| invitation.invited_email.clone()),
            invited_user_name,
            inviter_name: inviter.full_name(),
            inviter_email: inviter.email.clone(),
            invitation_role: invitation.invitation_type.display_name().to_string(),
            personal_message: invitation.personal_message.clone(),

            event_title: event.title.clone(),
            event_description: event.description.clone(),
            event_type: event.event_type.clone(),
            event_category: event
                .category
                .clone()
                .unwrap_or_else(|| "General".to_string()),
            event_start_date: format_datetime(&event.start_date),
            event_end_date: format_datetime(&event.end_date),

            is_paid: event.is_paid,
            price: event.price.map(|p| p.to_string()),
            currency: event.currency.clone().unwrap_or_else(|| "USD".to_string()),
            max_participants: event.max_participants,
            current_participants: details.current_participants,
            max_guests: invitation.max_guests,
            age_restriction: event.age_restriction.clone(),
            dress_code: event.dress_code.clone(),
            requires_approval: event.require_approval,

            locations: details.locations.iter().map(LocationPayload::from).collect(),

            accept_url: links.accept,
            decline_url: links.decline,
            event_url: links.event,
        }
    }

    /// Marks the payload as a reminder for an invitation already sent.
    pub fn into_reminder(mut self) -> Self {
        let message = self.personal_message.take().unwrap_or_default();
        self.personal_message = Some(format!("{}{}", REMINDER_PREFIX, message));
        self
    }

    pub fn subject(&self) -> String {
        format!("You're invited to {}!", self.event_title)
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let required = [
            ("to", &self.to),
            ("eventTitle", &self.event_title),
            ("acceptUrl", &self.accept_url),
            ("declineUrl", &self.decline_url),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(TemplateError::Context(format!("`{}` is empty", field))),
            None => Ok(()),
        }
    }

    pub fn to_context(&self) -> Result<Context, TemplateError> {
        self.validate()?;
        engine::to_context(self)
    }
}
