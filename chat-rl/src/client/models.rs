use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SignupRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response body of the login and signup endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Workspace {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Workspace creation answers either with the workspace itself or wrapped
/// in a `workspace` field, depending on the backend version.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreatedWorkspace {
    Wrapped { workspace: Workspace },
    Bare(Workspace),
}

impl From<CreatedWorkspace> for Workspace {
    fn from(created: CreatedWorkspace) -> Self {
        match created {
            CreatedWorkspace::Wrapped { workspace } => workspace,
            CreatedWorkspace::Bare(workspace) => workspace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DmConversation {
    pub id: String,
}

/// A message as broadcast by the `new-message` event or returned by search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub dm_conversation_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ChatMessage {
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Events the agent emits on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingEvent {
    UserOnline {
        user_id: Option<String>,
        workspace_id: Option<String>,
    },
    JoinChannel {
        channel_id: String,
    },
    SendMessage {
        channel_id: Option<String>,
        dm_conversation_id: Option<String>,
        content: String,
        user_id: Option<String>,
    },
    Reaction {
        message_id: String,
        emoji: String,
        user_id: Option<String>,
    },
}

impl OutgoingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutgoingEvent::UserOnline { .. } => "user-online",
            OutgoingEvent::JoinChannel { .. } => "join-channel",
            OutgoingEvent::SendMessage { .. } => "send-message",
            OutgoingEvent::Reaction { .. } => "reaction",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            OutgoingEvent::UserOnline {
                user_id,
                workspace_id,
            } => json!({ "userId": user_id, "workspaceId": workspace_id }),
            OutgoingEvent::JoinChannel { channel_id } => json!(channel_id),
            OutgoingEvent::SendMessage {
                channel_id,
                dm_conversation_id,
                content,
                user_id,
            } => json!({
                "channelId": channel_id,
                "dmConversationId": dm_conversation_id,
                "content": content,
                "userId": user_id,
            }),
            OutgoingEvent::Reaction {
                message_id,
                emoji,
                user_id,
            } => json!({ "messageId": message_id, "emoji": emoji, "userId": user_id }),
        }
    }
}
