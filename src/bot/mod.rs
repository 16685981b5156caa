/// Command routing and handlers
pub mod handlers;
/// Resilient send/edit/delete wrappers
pub mod resilient;
/// Open set-channel session tracking
pub mod sessions;
/// The set-channel conversation
pub mod setchannel;
/// Prompt texts and inline keyboards
pub mod views;

pub use sessions::{ChannelSession, SessionMap};
