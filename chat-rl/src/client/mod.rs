//! Access to the external chat backend.
//!
//! [`ChatBackend`] is the REST seam used by the chat environment, and
//! [`RealtimeChannel`] the outbound half of its Socket.IO connection.
//! Inbound events are delivered into an [`Inbox`].

use async_trait::async_trait;

pub mod error;
pub mod http;
pub mod inbox;
pub mod models;
pub mod socket;

pub use error::ClientError;
pub use http::HttpBackend;
pub use inbox::Inbox;
pub use models::{
    Channel, ChatMessage, Credentials, DmConversation, Member, OutgoingEvent, Session, User,
    Workspace,
};

#[async_trait]
pub trait ChatBackend: Send + Sync {
    type Realtime: RealtimeChannel;

    async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError>;

    async fn signup(&self, username: &str, credentials: &Credentials)
        -> Result<Session, ClientError>;

    async fn workspaces(&self, session: &str) -> Result<Vec<Workspace>, ClientError>;

    async fn create_workspace(
        &self,
        session: &str,
        name: &str,
        slug: &str,
    ) -> Result<Workspace, ClientError>;

    async fn channels(&self, session: &str, workspace_id: &str) -> Result<Vec<Channel>, ClientError>;

    async fn create_channel(
        &self,
        session: &str,
        workspace_id: &str,
        name: &str,
    ) -> Result<Channel, ClientError>;

    async fn members(&self, session: &str, workspace_id: &str) -> Result<Vec<Member>, ClientError>;

    async fn open_dm(&self, session: &str, user_id: &str) -> Result<DmConversation, ClientError>;

    /// Succeeds only on HTTP 200.
    async fn mark_read(&self, session: &str, channel_id: &str) -> Result<(), ClientError>;

    /// Succeeds only on HTTP 200.
    async fn pin_message(
        &self,
        session: &str,
        message_id: &str,
        channel_id: Option<&str>,
    ) -> Result<(), ClientError>;

    async fn search(
        &self,
        session: &str,
        workspace_id: &str,
        query: &str,
    ) -> Result<Vec<ChatMessage>, ClientError>;

    /// Opens the realtime channel; inbound messages are pushed into `inbox`.
    async fn connect(&self, inbox: Inbox) -> Result<Self::Realtime, ClientError>;
}

#[async_trait]
pub trait RealtimeChannel: Send {
    async fn emit(&mut self, event: OutgoingEvent) -> Result<(), ClientError>;

    async fn disconnect(&mut self) -> Result<(), ClientError>;
}
