//! Direct Line channel integration for the bridge
//!
//! This crate owns the conversation with the remote bot: token issuance and
//! refresh, conversation start, outbound activities and reply polling.

pub mod base;
pub mod common;
pub mod directline;
pub mod handle;

pub use base::{DirectLineError, Result};
pub use directline::{
    Activity, ChannelAccount, Clock, ConversationState, DirectLineSession, ManualClock, Reply,
    SystemClock,
};
pub use handle::{SessionCommand, SessionHandle};
