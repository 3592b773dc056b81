//! Environment backed by a live chat service.
//!
//! Agents act through the backend's REST API and Socket.IO channel, while
//! inbound `new-message` events accumulate in an [`Inbox`] between steps.
//! The synchronous [`Environment`] calls are bridged onto a tokio runtime
//! owned by the environment, which also keeps the socket reader running.

use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::client::{
    Channel, ChatBackend, ClientError, Credentials, HttpBackend, Inbox, OutgoingEvent,
    RealtimeChannel, Session,
};

use super::{Environment, Step};

pub mod action;
pub mod config;
pub mod encoding;
pub mod observation;
pub mod reward;

pub use action::{ActionType, ChatAction, ChatActionSpace};
pub use config::{ChatEnvironmentConfig, ConfigError};
pub use observation::ChatObservation;
pub use reward::Task;

use observation::{
    CHANNEL_INFO_DIM, HISTORY_LEN, MAX_SECONDS_SINCE_MESSAGE, MAX_UNREAD, USER_PRESENCE_DIM,
};
use reward::{calculate_reward, RewardContext};

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to authenticate agent {email}: {source}")]
    Authentication {
        email: String,
        #[source]
        source: ClientError,
    },
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("environment must be reset before stepping")]
    NotReset,
}

/// Why an action could not be carried out. Reported to the agent as an
/// unsuccessful step, never as an environment error.
#[derive(Debug, Error)]
enum ActionError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("realtime channel is not connected")]
    NotConnected,
    #[error("no message received yet")]
    NoMessage,
    #[error("no channel available")]
    NoChannel,
    #[error("no workspace available")]
    NoWorkspace,
    #[error("no other workspace member to message")]
    NoPeer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatStepInfo {
    pub action_success: bool,
    pub action_message: String,
    pub messages_received: usize,
    pub current_step: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Human,
    Ansi,
}

#[derive(Debug, Clone)]
struct AgentSession {
    token: String,
    user_id: Option<String>,
    workspace_id: Option<String>,
}

impl ChatEnvironmentConfig {
    pub fn init(&self) -> Result<ChatEnvironment<HttpBackend>, EnvError> {
        let backend =
            HttpBackend::new(self.backend_url.clone()).with_connect_timeout(self.connect_timeout());
        self.init_with_backend(backend)
    }

    pub fn init_with_backend<B: ChatBackend>(
        &self,
        backend: B,
    ) -> Result<ChatEnvironment<B>, EnvError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("chat-rl-io")
            .enable_all()
            .build()?;
        Ok(ChatEnvironment {
            cfg: self.clone(),
            backend,
            runtime: Arc::new(runtime),
            inbox: Inbox::new(self.inbox_capacity),
            realtime: None,
            session: None,
            channels: Vec::new(),
            current_channel: None,
            current_step: 0,
            rng: StdRng::from_entropy(),
            action_space: ChatActionSpace::new(self.embedding_dim),
        })
    }
}

pub struct ChatEnvironment<B: ChatBackend> {
    cfg: ChatEnvironmentConfig,
    backend: B,
    runtime: Arc<Runtime>,
    inbox: Inbox,
    realtime: Option<B::Realtime>,
    session: Option<AgentSession>,
    channels: Vec<Channel>,
    current_channel: Option<String>,
    current_step: u64,
    rng: StdRng,
    action_space: ChatActionSpace,
}

impl<B: ChatBackend> ChatEnvironment<B> {
    pub fn config(&self) -> &ChatEnvironmentConfig {
        &self.cfg
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.user_id.as_deref())
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.workspace_id.as_deref())
    }

    pub fn current_channel(&self) -> Option<&str> {
        self.current_channel.as_deref()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn is_connected(&self) -> bool {
        self.realtime.is_some()
    }

    pub fn render(&self, mode: RenderMode) -> Option<String> {
        match mode {
            RenderMode::Human => {
                println!("\n=== Chat RL Environment (Step {}) ===", self.current_step);
                println!("Workspace: {}", self.workspace_id().unwrap_or("None"));
                println!("Current Channel: {}", self.current_channel().unwrap_or("None"));
                println!("Recent Messages: {}", self.inbox.len());
                let recent = self.inbox.recent(3);
                if !recent.is_empty() {
                    println!("\nLast 3 Messages:");
                    for message in recent {
                        let content: String = message.text().chars().take(50).collect();
                        println!(
                            "  [{}]: {}",
                            message.username.as_deref().unwrap_or("Unknown"),
                            content
                        );
                    }
                }
                None
            }
            RenderMode::Ansi => Some(format!(
                "Step: {}, Messages: {}",
                self.current_step,
                self.inbox.len()
            )),
        }
    }

    async fn authenticate(&self) -> Result<Session, EnvError> {
        let credentials = Credentials {
            email: self.cfg.agent_email.clone(),
            password: self.cfg.agent_password.clone(),
        };
        match self.backend.login(&credentials).await {
            Ok(session) => Ok(session),
            Err(source) if source.status().is_none() => Err(EnvError::Authentication {
                email: credentials.email.clone(),
                source,
            }),
            Err(login_err) => {
                info!(error = %login_err, "login rejected, signing up agent account");
                self.backend
                    .signup(&self.cfg.agent_username, &credentials)
                    .await
                    .map_err(|source| EnvError::Authentication {
                        email: credentials.email.clone(),
                        source,
                    })
            }
        }
    }

    async fn setup_workspace(&mut self, token: &str) -> Option<String> {
        let workspace = match self.backend.workspaces(token).await {
            Ok(workspaces) if !workspaces.is_empty() => workspaces.into_iter().next(),
            Ok(_) => match self
                .backend
                .create_workspace(token, &self.cfg.workspace_name, &self.cfg.workspace_slug)
                .await
            {
                Ok(workspace) => Some(workspace),
                Err(err) => {
                    warn!(error = %err, "failed to create workspace");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "failed to list workspaces");
                None
            }
        };
        let workspace_id = workspace.map(|w| w.id)?;

        match self.backend.channels(token, &workspace_id).await {
            Ok(channels) => {
                self.current_channel = channels.first().map(|c| c.id.clone());
                self.channels = channels;
            }
            Err(err) => warn!(error = %err, "failed to list channels"),
        }
        Some(workspace_id)
    }

    async fn disconnect_realtime(&mut self) {
        if let Some(mut previous) = self.realtime.take() {
            if let Err(err) = previous.disconnect().await {
                debug!(error = %err, "previous realtime channel did not close cleanly");
            }
        }
    }

    async fn connect_realtime(&mut self) {
        let mut realtime = match self.backend.connect(self.inbox.clone()).await {
            Ok(realtime) => realtime,
            Err(err) => {
                warn!(error = %err, "socket connection failed, continuing without realtime");
                return;
            }
        };

        let online = OutgoingEvent::UserOnline {
            user_id: self.user_id().map(str::to_string),
            workspace_id: self.workspace_id().map(str::to_string),
        };
        if let Err(err) = realtime.emit(online).await {
            warn!(error = %err, "failed to announce presence");
        }
        if let Some(channel_id) = self.current_channel.clone() {
            if let Err(err) = realtime.emit(OutgoingEvent::JoinChannel { channel_id }).await {
                warn!(error = %err, "failed to join channel");
            }
        }
        self.realtime = Some(realtime);
    }

    async fn reset_async(&mut self) -> Result<(), EnvError> {
        // The old reader may still deliver into the inbox until it is stopped.
        self.disconnect_realtime().await;
        self.inbox.clear();

        let session = self.authenticate().await?;
        let token = session.session_id.clone();
        self.session = Some(AgentSession {
            token: token.clone(),
            user_id: session.user_id().map(str::to_string),
            workspace_id: None,
        });

        let workspace_id = self.setup_workspace(&token).await;
        if let Some(session) = self.session.as_mut() {
            session.workspace_id = workspace_id;
        }

        self.connect_realtime().await;
        info!(
            user = ?self.user_id(),
            workspace = ?self.workspace_id(),
            channel = ?self.current_channel(),
            connected = self.is_connected(),
            "environment reset"
        );
        Ok(())
    }

    async fn execute(&mut self, action: &ChatAction) -> Result<String, ActionError> {
        let session = self.session.clone().ok_or(ActionError::NoWorkspace)?;
        let token = session.token.as_str();
        let text = encoding::decode_message(&action.message_embedding);

        match action.action_type {
            ActionType::SendMessage => {
                let event = OutgoingEvent::SendMessage {
                    channel_id: self.current_channel.clone(),
                    dm_conversation_id: None,
                    content: text.to_string(),
                    user_id: session.user_id.clone(),
                };
                self.realtime_mut()?.emit(event).await?;
                Ok("Message sent".to_string())
            }
            ActionType::React => {
                let message_id = self.last_message_id()?;
                let event = OutgoingEvent::Reaction {
                    message_id,
                    emoji: encoding::emoji(action.emoji).to_string(),
                    user_id: session.user_id.clone(),
                };
                self.realtime_mut()?.emit(event).await?;
                Ok("Reaction added".to_string())
            }
            ActionType::CreateChannel => {
                let workspace_id = session.workspace_id.as_deref().ok_or(ActionError::NoWorkspace)?;
                let name = format!("rl-channel-{:04x}", self.rng.gen::<u16>());
                let channel = self.backend.create_channel(token, workspace_id, &name).await?;
                self.channels.push(channel);
                Ok(format!("Channel {name} created"))
            }
            ActionType::JoinChannel => {
                if self.channels.is_empty() {
                    return Err(ActionError::NoChannel);
                }
                let channel_id = self.channels[action.target_id % self.channels.len()].id.clone();
                self.realtime_mut()?
                    .emit(OutgoingEvent::JoinChannel {
                        channel_id: channel_id.clone(),
                    })
                    .await?;
                self.current_channel = Some(channel_id);
                Ok("Channel joined".to_string())
            }
            ActionType::SendDm => {
                let workspace_id = session.workspace_id.as_deref().ok_or(ActionError::NoWorkspace)?;
                let peers: Vec<_> = self
                    .backend
                    .members(token, workspace_id)
                    .await?
                    .into_iter()
                    .filter(|m| Some(m.user_id.as_str()) != session.user_id.as_deref())
                    .collect();
                if peers.is_empty() {
                    return Err(ActionError::NoPeer);
                }
                let peer = &peers[action.target_id % peers.len()];
                let conversation = self.backend.open_dm(token, &peer.user_id).await?;
                let event = OutgoingEvent::SendMessage {
                    channel_id: None,
                    dm_conversation_id: Some(conversation.id),
                    content: text.to_string(),
                    user_id: session.user_id.clone(),
                };
                self.realtime_mut()?.emit(event).await?;
                Ok("Direct message sent".to_string())
            }
            ActionType::MarkRead => {
                let channel_id = self.current_channel.as_deref().ok_or(ActionError::NoChannel)?;
                self.backend.mark_read(token, channel_id).await?;
                self.inbox.mark_read();
                Ok("Marked as read".to_string())
            }
            ActionType::PinMessage => {
                let message_id = self.last_message_id()?;
                self.backend
                    .pin_message(token, &message_id, self.current_channel.as_deref())
                    .await?;
                Ok("Message pinned".to_string())
            }
            ActionType::SearchMessages => {
                let workspace_id = session.workspace_id.as_deref().ok_or(ActionError::NoWorkspace)?;
                let results = self.backend.search(token, workspace_id, text).await?;
                Ok(format!("Search returned {} messages", results.len()))
            }
            ActionType::Wait => Ok("No action taken".to_string()),
        }
    }

    fn realtime_mut(&mut self) -> Result<&mut B::Realtime, ActionError> {
        self.realtime.as_mut().ok_or(ActionError::NotConnected)
    }

    fn last_message_id(&self) -> Result<String, ActionError> {
        self.inbox
            .last()
            .and_then(|m| m.id)
            .ok_or(ActionError::NoMessage)
    }

    fn observation(&mut self) -> ChatObservation {
        let dim = self.cfg.embedding_dim;
        let mut obs = ChatObservation::empty(dim);

        let recent = self.inbox.recent(HISTORY_LEN);
        for (row, message) in obs.message_history.iter_mut().zip(recent.iter()) {
            *row = encoding::simple_embedding(message.text(), dim);
        }
        if let Some(last) = recent.last() {
            obs.conversation_context = encoding::simple_embedding(last.text(), dim);
        }

        // Channel and presence features are placeholders until the backend
        // exposes them per step.
        for x in obs.channel_info.iter_mut().take(CHANNEL_INFO_DIM) {
            *x = self.rng.gen();
        }
        for x in obs.user_presence.iter_mut().take(USER_PRESENCE_DIM) {
            *x = self.rng.gen();
        }

        obs.unread_counts[0] = (self.inbox.unread().min(MAX_UNREAD as usize)) as i32;
        obs.time_since_last_message = self
            .inbox
            .since_last()
            .map(|d| d.as_secs_f32().min(MAX_SECONDS_SINCE_MESSAGE))
            .unwrap_or(0.0);
        obs
    }
}

impl<B: ChatBackend> Environment for ChatEnvironment<B> {
    type A = ChatAction;
    type O = ChatObservation;
    type Info = ChatStepInfo;
    type Error = EnvError;
    type ActionSpace = ChatActionSpace;

    fn action_space(&self) -> &ChatActionSpace {
        &self.action_space
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<ChatObservation, EnvError> {
        self.current_step = 0;
        self.session = None;
        self.channels.clear();
        self.current_channel = None;
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }

        let runtime = Arc::clone(&self.runtime);
        runtime.block_on(self.reset_async())?;
        Ok(self.observation())
    }

    fn step(&mut self, action: ChatAction) -> Result<Step<ChatObservation, ChatStepInfo>, EnvError> {
        if self.session.is_none() {
            return Err(EnvError::NotReset);
        }
        self.current_step += 1;

        let runtime = Arc::clone(&self.runtime);
        let outcome = match runtime.block_on(self.execute(&action)) {
            Ok(message) => ActionOutcome {
                success: true,
                message,
            },
            Err(err) => {
                warn!(action = %action.action_type, error = %err, "action failed");
                ActionOutcome {
                    success: false,
                    message: err.to_string(),
                }
            }
        };
        debug!(
            step = self.current_step,
            action = %action.action_type,
            success = outcome.success,
            "{}",
            outcome.message
        );

        if self.cfg.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.cfg.settle_ms));
        }

        let reward = calculate_reward(
            self.cfg.task,
            &RewardContext {
                action_type: action.action_type,
                success: outcome.success,
                step: self.current_step,
                buffered_messages: self.inbox.len(),
            },
        );

        Ok(Step {
            observation: self.observation(),
            reward,
            done: self.current_step >= self.cfg.max_steps,
            info: ChatStepInfo {
                action_success: outcome.success,
                action_message: outcome.message,
                messages_received: self.inbox.len(),
                current_step: self.current_step,
            },
        })
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if let Some(mut realtime) = self.realtime.take() {
            let runtime = Arc::clone(&self.runtime);
            runtime.block_on(realtime.disconnect())?;
            info!("realtime channel closed");
        }
        Ok(())
    }
}
