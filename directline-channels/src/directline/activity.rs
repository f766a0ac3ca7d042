//! Activity wire model and reply selection

use crate::base::{DirectLineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activity type carrying user-visible text
pub const MESSAGE_TYPE: &str = "message";

/// Entity type marking message annotations (citations live here)
pub const MESSAGE_ENTITY_TYPE: &str = "https://schema.org/Message";

/// Sender or recipient of an activity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A single activity in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Conversation-scoped id, e.g. `"abc123|0000007"`
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub from: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Value>>,
}

impl Activity {
    /// Sequence number encoded in the second `|` or `:` delimited segment of the id
    pub fn sequence_number(&self) -> Result<u64> {
        self.id
            .split(['|', ':'])
            .nth(1)
            .and_then(|segment| segment.trim().parse().ok())
            .ok_or_else(|| DirectLineError::MalformedActivity(self.id.clone()))
    }

    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_TYPE
    }

    /// Citation attached to this activity, if any
    pub fn citation(&self) -> Option<Value> {
        self.entities.as_deref().and_then(extract_citation)
    }
}

/// Body of `GET .../activities`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// A bot reply handed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub conversation_id: String,
    pub citation: Option<Value>,
}

/// Outbound message activity
#[derive(Debug, Serialize)]
pub(crate) struct OutgoingActivity<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub from: OutgoingAccount<'a>,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutgoingAccount<'a> {
    pub id: &'a str,
}

impl<'a> OutgoingActivity<'a> {
    pub fn message(user_id: &'a str, text: &'a str) -> Self {
        Self {
            kind: MESSAGE_TYPE,
            from: OutgoingAccount { id: user_id },
            text,
        }
    }
}

/// Pick the first activity, in list order, that is a message from someone
/// other than `local_user` with a sequence number above `watermark`.
///
/// Later qualifying activities are left for the next call. Any activity id
/// without a sequence number fails the whole scan.
pub fn select_reply<'a>(
    activities: &'a [Activity],
    local_user: &str,
    watermark: u64,
) -> Result<Option<(u64, &'a Activity)>> {
    for activity in activities {
        let seq = activity.sequence_number()?;
        if activity.is_message() && activity.from.id != local_user && seq > watermark {
            return Ok(Some((seq, activity)));
        }
    }
    Ok(None)
}

/// Citation of the first message-annotation entity that has a `citation` field.
///
/// The scan stops at that entity even when its citation is null or an empty
/// list, so a later entity is never consulted.
pub fn extract_citation(entities: &[Value]) -> Option<Value> {
    let entity = entities.iter().find(|entity| {
        entity.get("type").and_then(Value::as_str) == Some(MESSAGE_ENTITY_TYPE)
            && entity.get("citation").is_some()
    })?;

    match entity.get("citation")? {
        Value::Array(items) => items.first().cloned(),
        Value::Null => None,
        other => Some(other.clone()),
    }
}
