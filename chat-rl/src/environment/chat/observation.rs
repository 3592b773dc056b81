use crate::environment::Features;

pub const HISTORY_LEN: usize = 10;
pub const CHANNEL_INFO_DIM: usize = 20;
pub const USER_PRESENCE_DIM: usize = 50;
pub const UNREAD_SLOTS: usize = 10;
pub const MAX_UNREAD: i32 = 100;
pub const MAX_SECONDS_SINCE_MESSAGE: f32 = 3600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatObservation {
    /// One embedding row per recent message, oldest first, zero padded.
    pub message_history: Vec<Vec<f32>>,
    pub channel_info: [f32; CHANNEL_INFO_DIM],
    pub user_presence: [f32; USER_PRESENCE_DIM],
    pub unread_counts: [i32; UNREAD_SLOTS],
    /// Embedding of the latest message.
    pub conversation_context: Vec<f32>,
    pub time_since_last_message: f32,
}

impl ChatObservation {
    pub fn empty(embedding_dim: usize) -> Self {
        ChatObservation {
            message_history: vec![vec![0.0; embedding_dim]; HISTORY_LEN],
            channel_info: [0.0; CHANNEL_INFO_DIM],
            user_presence: [0.0; USER_PRESENCE_DIM],
            unread_counts: [0; UNREAD_SLOTS],
            conversation_context: vec![0.0; embedding_dim],
            time_since_last_message: 0.0,
        }
    }

    pub fn feature_len(embedding_dim: usize) -> usize {
        HISTORY_LEN * embedding_dim
            + CHANNEL_INFO_DIM
            + USER_PRESENCE_DIM
            + UNREAD_SLOTS
            + embedding_dim
            + 1
    }
}

impl Features for ChatObservation {
    // Counts and elapsed time are scaled into [0, 1] like the other entries.
    fn features(&self) -> Vec<f32> {
        let embedding_dim = self.conversation_context.len();
        let mut out = Vec::with_capacity(Self::feature_len(embedding_dim));
        for row in &self.message_history {
            out.extend_from_slice(row);
        }
        out.extend_from_slice(&self.channel_info);
        out.extend_from_slice(&self.user_presence);
        out.extend(
            self.unread_counts
                .iter()
                .map(|c| *c as f32 / MAX_UNREAD as f32),
        );
        out.extend_from_slice(&self.conversation_context);
        out.push(self.time_since_last_message / MAX_SECONDS_SINCE_MESSAGE);
        out
    }
}
