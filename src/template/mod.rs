pub mod engine;
pub mod invitation;
pub mod source;

pub use engine::{render, Context, Template};
pub use invitation::{EventInvitationPayload, LocationPayload, RsvpLinks};
pub use source::{FsTemplateSource, StaticTemplateSource, TemplateSource, EVENT_INVITATION};
