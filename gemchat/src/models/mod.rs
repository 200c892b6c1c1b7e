mod auth;
mod chatroom;
mod message;
mod types;

pub use auth::*;
pub use chatroom::*;
pub use message::*;
pub use types::*;
