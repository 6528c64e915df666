pub mod batch;
pub mod event;
pub mod invitation;
pub mod user;

pub use batch::*;
pub use event::*;
pub use invitation::*;
pub use user::*;
