//! The Direct Line session: token lifecycle, conversation start, outbound
//! activities and reply polling.
//!
//! A session is plain `&mut self` state with no internal locking. Share it
//! through [`crate::handle::SessionHandle`], which serialises every call.

use super::activity::{select_reply, ActivitySet, OutgoingActivity, Reply};
use super::token::{Clock, SystemClock, TokenState};
use crate::base::{DirectLineError, Result};
use crate::common::{body_text, create_http_client};
use chrono::{DateTime, Utc};
use directline_core::config::DirectLineConfig;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Token issuance response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Conversation creation response
#[derive(Debug, Deserialize)]
struct ConversationResponse {
    #[serde(rename = "conversationId")]
    conversation_id: String,
}

/// Conversation sub-state of a session.
///
/// `Uninitialized -> Active` on the first send or an explicit start; a restart
/// replaces the active conversation and zeroes the watermark. There is no
/// close transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Uninitialized,
    Active {
        id: String,
        /// Highest bot activity sequence number already handed out
        watermark: u64,
    },
}

pub struct DirectLineSession {
    http: reqwest::Client,
    secret: String,
    bot_endpoint: String,
    token_endpoint: String,
    user_id: String,
    poll_interval: Duration,
    token: TokenState,
    conversation: ConversationState,
    clock: Arc<dyn Clock>,
}

impl DirectLineSession {
    /// Build a session without contacting the upstream service
    pub fn new(config: &DirectLineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.secret.trim().is_empty() {
            return Err(DirectLineError::InvalidConfig(
                "Direct Line secret not configured".to_string(),
            ));
        }
        if config.bot_endpoint.trim().is_empty() {
            return Err(DirectLineError::InvalidConfig(
                "Bot endpoint not configured".to_string(),
            ));
        }

        let lifetime = i64::try_from(config.token_lifetime_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                DirectLineError::InvalidConfig(format!(
                    "token lifetime out of range: {}s",
                    config.token_lifetime_secs
                ))
            })?;

        Ok(Self {
            http: create_http_client(config.request_timeout_secs.map(Duration::from_secs))?,
            secret: config.secret.clone(),
            bot_endpoint: config.bot_endpoint.trim_end_matches('/').to_string(),
            token_endpoint: config.token_endpoint.clone(),
            user_id: config.user_id.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            token: TokenState::new(lifetime),
            conversation: ConversationState::Uninitialized,
            clock,
        })
    }

    /// Build a session and acquire the first token, failing fast if that fails
    pub async fn connect(config: &DirectLineConfig) -> Result<Self> {
        Self::connect_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(
        config: &DirectLineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut session = Self::new(config, clock)?;
        session.acquire_token().await?;
        info!("Direct Line session initialized");
        Ok(session)
    }

    /// Request a new token with the channel secret
    pub async fn acquire_token(&mut self) -> Result<()> {
        self.refresh_token().await.map(|_| ())
    }

    /// Refresh the token if it is missing or expired
    pub async fn ensure_valid(&mut self) -> Result<()> {
        self.bearer().await.map(|_| ())
    }

    /// Create a new conversation and reset the watermark
    pub async fn start_conversation(&mut self) -> Result<String> {
        let token = self.bearer().await?;

        let response = self
            .http
            .post(&self.bot_endpoint)
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            error!(status = status.as_u16(), "Failed to start conversation with the bot");
            return Err(DirectLineError::ConversationStart {
                status: status.as_u16(),
            });
        }

        let created: ConversationResponse = decode_json(response).await?;
        info!("Started new conversation: {}", created.conversation_id);
        self.conversation = ConversationState::Active {
            id: created.conversation_id.clone(),
            watermark: 0,
        };
        Ok(created.conversation_id)
    }

    /// Post a message activity, starting a conversation first if none exists.
    ///
    /// `user_id` defaults to the configured local user. Returns the upstream
    /// body as-is.
    pub async fn send_message(&mut self, message: &str, user_id: Option<&str>) -> Result<Value> {
        let token = self.bearer().await?;

        let conversation_id = match self.conversation_id().map(str::to_string) {
            Some(id) => id,
            None => self.start_conversation().await?,
        };

        let url = self.activities_url(&conversation_id);
        let from = user_id.unwrap_or(self.user_id.as_str());
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&OutgoingActivity::message(from, message))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = body_text(response).await;
            error!(status = status.as_u16(), "Failed to send activity: {}", body);
            return Err(DirectLineError::SendActivity {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Sent message activity to conversation {}", conversation_id);
        decode_json(response).await
    }

    /// Poll the conversation until a new bot message arrives.
    ///
    /// Sleeps one poll interval before every request. Returns the first
    /// qualifying activity of the first response that has one and advances
    /// the watermark to it. Never times out on its own; `cancel` ends the wait.
    pub async fn await_reply(&mut self, cancel: &CancellationToken) -> Result<Reply> {
        self.ensure_valid().await?;

        let conversation_id = self
            .conversation_id()
            .ok_or(DirectLineError::NoActiveConversation)?
            .to_string();
        let url = self.activities_url(&conversation_id);
        let mut attempts: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Reply polling cancelled after {} attempts", attempts);
                    return Err(DirectLineError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let token = self.bearer().await?;
            attempts += 1;

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DirectLineError::Cancelled),
                response = self.http.get(&url).bearer_auth(&token).send() => response?,
            };

            let status = response.status();
            if status != StatusCode::OK {
                error!(
                    status = status.as_u16(),
                    "Failed to retrieve activities from the bot"
                );
                return Err(DirectLineError::Poll {
                    status: status.as_u16(),
                });
            }

            let set: ActivitySet = decode_json(response).await?;
            if let Some((seq, activity)) = select_reply(&set.activities, &self.user_id, self.watermark())? {
                let reply = Reply {
                    text: activity.text.clone().unwrap_or_default(),
                    conversation_id: conversation_id.clone(),
                    citation: activity.citation(),
                };
                self.advance_watermark(seq);
                info!(
                    attempts,
                    sequence = seq,
                    "Received bot reply in conversation {}",
                    conversation_id
                );
                return Ok(reply);
            }

            debug!(
                attempts,
                activities = set.activities.len(),
                "No new bot activity yet"
            );
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match &self.conversation {
            ConversationState::Active { id, .. } => Some(id.as_str()),
            ConversationState::Uninitialized => None,
        }
    }

    /// Watermark of the active conversation, 0 when none is active
    pub fn watermark(&self) -> u64 {
        match &self.conversation {
            ConversationState::Active { watermark, .. } => *watermark,
            ConversationState::Uninitialized => 0,
        }
    }

    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.token.current().map(|token| token.expires_at())
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Usable bearer token, refreshing it first when missing or expired
    async fn bearer(&mut self) -> Result<String> {
        if let Some(token) = self.token.valid_at(self.clock.now()) {
            return Ok(token.to_string());
        }
        info!("Token expired or missing. Generating a new token...");
        self.refresh_token().await
    }

    async fn refresh_token(&mut self) -> Result<String> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .bearer_auth(&self.secret)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = body_text(response).await;
            error!(status = status.as_u16(), "Failed to generate Direct Line token");
            return Err(DirectLineError::TokenAcquisition {
                status: status.as_u16(),
                body,
            });
        }

        let issued: TokenResponse = decode_json(response).await?;
        let stored = self.token.store(issued.token, self.clock.now());
        info!(expires_at = %stored.expires_at(), "Successfully generated Direct Line token");
        Ok(stored.value().to_string())
    }

    fn advance_watermark(&mut self, seq: u64) {
        if let ConversationState::Active { watermark, .. } = &mut self.conversation {
            *watermark = (*watermark).max(seq);
        }
    }

    fn activities_url(&self, conversation_id: &str) -> String {
        format!("{}/{}/activities", self.bot_endpoint, conversation_id)
    }
}

impl std::fmt::Debug for DirectLineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectLineSession")
            .field("bot_endpoint", &self.bot_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("user_id", &self.user_id)
            .field("poll_interval", &self.poll_interval)
            .field("conversation", &self.conversation)
            .field("token_expiry", &self.token_expiry())
            .finish_non_exhaustive()
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
