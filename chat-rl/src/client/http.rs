use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::ClientError;
use super::inbox::Inbox;
use super::models::{
    Channel, ChatMessage, CreatedWorkspace, Credentials, DmConversation, Member, Session,
    SignupRequest, Workspace,
};
use super::socket::SocketConnection;
use super::ChatBackend;

/// REST + Socket.IO access to a running chat backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    connect_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder, session: &str) -> RequestBuilder {
        builder.bearer_auth(session)
    }

    async fn ok(response: Response) -> Result<Response, ClientError> {
        match response.status() {
            StatusCode::OK => Ok(response),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::ok(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    type Realtime = SocketConnection;

    async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        Self::json(self.client.post(self.url("/api/login")).json(credentials)).await
    }

    async fn signup(
        &self,
        username: &str,
        credentials: &Credentials,
    ) -> Result<Session, ClientError> {
        let body = SignupRequest {
            username,
            email: &credentials.email,
            password: &credentials.password,
        };
        Self::json(self.client.post(self.url("/api/signup")).json(&body)).await
    }

    async fn workspaces(&self, session: &str) -> Result<Vec<Workspace>, ClientError> {
        let request = self.authorized(self.client.get(self.url("/api/workspaces")), session);
        Self::json(request).await
    }

    async fn create_workspace(
        &self,
        session: &str,
        name: &str,
        slug: &str,
    ) -> Result<Workspace, ClientError> {
        let request = self
            .authorized(self.client.post(self.url("/api/workspaces")), session)
            .json(&json!({ "name": name, "slug": slug }));
        Self::json::<CreatedWorkspace>(request).await.map(Workspace::from)
    }

    async fn channels(&self, session: &str, workspace_id: &str) -> Result<Vec<Channel>, ClientError> {
        let path = format!("/api/workspaces/{workspace_id}/channels");
        Self::json(self.authorized(self.client.get(self.url(&path)), session)).await
    }

    async fn create_channel(
        &self,
        session: &str,
        workspace_id: &str,
        name: &str,
    ) -> Result<Channel, ClientError> {
        let path = format!("/api/workspaces/{workspace_id}/channels");
        let request = self
            .authorized(self.client.post(self.url(&path)), session)
            .json(&json!({ "name": name }));
        Self::json(request).await
    }

    async fn members(&self, session: &str, workspace_id: &str) -> Result<Vec<Member>, ClientError> {
        let path = format!("/api/workspaces/{workspace_id}/members");
        Self::json(self.authorized(self.client.get(self.url(&path)), session)).await
    }

    async fn open_dm(&self, session: &str, user_id: &str) -> Result<DmConversation, ClientError> {
        let request = self
            .authorized(self.client.post(self.url("/api/dm-conversations")), session)
            .json(&json!({ "userId": user_id }));
        Self::json(request).await
    }

    async fn mark_read(&self, session: &str, channel_id: &str) -> Result<(), ClientError> {
        let path = format!("/api/channels/{channel_id}/mark-read");
        let request = self.authorized(self.client.post(self.url(&path)), session);
        Self::ok(request.send().await?).await.map(|_| ())
    }

    async fn pin_message(
        &self,
        session: &str,
        message_id: &str,
        channel_id: Option<&str>,
    ) -> Result<(), ClientError> {
        let path = format!("/api/messages/{message_id}/pin");
        let request = self
            .authorized(self.client.post(self.url(&path)), session)
            .json(&json!({ "channelId": channel_id }));
        Self::ok(request.send().await?).await.map(|_| ())
    }

    async fn search(
        &self,
        session: &str,
        workspace_id: &str,
        query: &str,
    ) -> Result<Vec<ChatMessage>, ClientError> {
        let path = format!("/api/workspaces/{workspace_id}/search");
        let request = self
            .authorized(self.client.get(self.url(&path)), session)
            .query(&[("q", query)]);
        Self::json(request).await
    }

    async fn connect(&self, inbox: Inbox) -> Result<Self::Realtime, ClientError> {
        SocketConnection::connect(&self.base_url, inbox, self.connect_timeout).await
    }
}
