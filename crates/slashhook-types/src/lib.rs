//! Wire types for the slash-command interaction webhook and the
//! command-management API.

mod api;
mod command;
mod interaction;
mod message;
mod user;

pub use api::*;
pub use command::*;
pub use interaction::*;
pub use message::*;
pub use user::*;
