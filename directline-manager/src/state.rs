use directline_channels::SessionHandle;
use directline_core::config::GatewayConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub info: Arc<ApiInfo>,
    /// Parent of every per-request cancel token; cancelled when the server shuts down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(session: SessionHandle, gateway: &GatewayConfig) -> Self {
        Self {
            session,
            info: Arc::new(ApiInfo::from(gateway)),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Body of `POST /send`
#[derive(Debug, Clone, Deserialize)]
pub struct SendRequest {
    pub name: Option<String>,
    pub message: String,
}

/// Answer of `POST /send`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub bot_response: String,
    pub citations: Option<Value>,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    pub name: Option<String>,
}

/// Service metadata served by `/api-info`
#[derive(Debug, Clone, Serialize)]
pub struct ApiInfo {
    pub title: String,
    pub description: String,
    pub version: String,
    pub contact: Contact,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

impl From<&GatewayConfig> for ApiInfo {
    fn from(gateway: &GatewayConfig) -> Self {
        Self {
            title: gateway.title.clone(),
            description: gateway.description.clone(),
            version: gateway.version.clone(),
            contact: Contact {
                name: gateway.contact.name.clone(),
                email: gateway.contact.email.clone(),
            },
        }
    }
}
