//! Actor wrapper that owns a [`DirectLineSession`] and serialises access to it

use crate::base::{DirectLineError, Result};
use crate::directline::{DirectLineSession, Reply};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const COMMAND_QUEUE_SIZE: usize = 64;

/// Commands processed one at a time by the session task
pub enum SessionCommand {
    Submit {
        message: String,
        user_id: Option<String>,
        reply_tx: oneshot::Sender<Result<Value>>,
    },
    AwaitReply {
        cancel: CancellationToken,
        reply_tx: oneshot::Sender<Result<Reply>>,
    },
    /// Submit followed by await-reply without letting another command in between
    Exchange {
        message: String,
        user_id: Option<String>,
        cancel: CancellationToken,
        reply_tx: oneshot::Sender<Result<Reply>>,
    },
}

/// Cloneable handle to the session task.
///
/// The task stops once every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Move `session` onto its own task and return a handle to it
    pub fn spawn(session: DirectLineSession) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let task = tokio::spawn(run_session(session, rx));
        (Self { tx }, task)
    }

    /// Send a message to the bot, returning the upstream response body
    pub async fn submit(&self, message: impl Into<String>, user_id: Option<String>) -> Result<Value> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.dispatch(SessionCommand::Submit {
            message: message.into(),
            user_id,
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| DirectLineError::SessionClosed)?
    }

    /// Wait for the next bot reply
    pub async fn await_reply(&self, cancel: CancellationToken) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.dispatch(SessionCommand::AwaitReply { cancel, reply_tx })
            .await?;
        reply_rx.await.map_err(|_| DirectLineError::SessionClosed)?
    }

    /// Send a message and wait for the bot's answer as one uninterrupted turn
    pub async fn exchange(
        &self,
        message: impl Into<String>,
        user_id: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.dispatch(SessionCommand::Exchange {
            message: message.into(),
            user_id,
            cancel,
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| DirectLineError::SessionClosed)?
    }

    async fn dispatch(&self, command: SessionCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| DirectLineError::SessionClosed)
    }
}

async fn run_session(mut session: DirectLineSession, mut rx: mpsc::Receiver<SessionCommand>) {
    info!("Session task started");

    while let Some(command) = rx.recv().await {
        match command {
            SessionCommand::Submit {
                message,
                user_id,
                reply_tx,
            } => {
                let result = session.send_message(&message, user_id.as_deref()).await;
                let _ = reply_tx.send(result);
            }
            SessionCommand::AwaitReply { cancel, reply_tx } => {
                let result = session.await_reply(&cancel).await;
                let _ = reply_tx.send(result);
            }
            SessionCommand::Exchange {
                message,
                user_id,
                cancel,
                reply_tx,
            } => {
                if cancel.is_cancelled() {
                    debug!("Skipping exchange abandoned by its caller");
                    let _ = reply_tx.send(Err(DirectLineError::Cancelled));
                    continue;
                }
                let result = match session.send_message(&message, user_id.as_deref()).await {
                    Ok(_) => session.await_reply(&cancel).await,
                    Err(e) => Err(e),
                };
                let _ = reply_tx.send(result);
            }
        }
    }

    info!("All session handles dropped, stopping session task");
}
