//! Direct Line session manager
//!
//! The session owns the bearer token, the conversation handle and the
//! watermark of consumed bot activities. All upstream HTTP goes through it.

pub mod activity;
pub mod session;
pub mod token;

pub use activity::{extract_citation, select_reply, Activity, ActivitySet, ChannelAccount, Reply};
pub use session::{ConversationState, DirectLineSession};
pub use token::{Clock, IssuedToken, ManualClock, SystemClock, TokenState};
