use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_rl::client::{
    Channel, ChatBackend, ChatMessage, ClientError, Credentials, DmConversation, Inbox, Member,
    OutgoingEvent, RealtimeChannel, Session, User, Workspace,
};
use chat_rl::environment::chat::{
    encoding, ActionType, ChatAction, ChatEnvironment, ChatEnvironmentConfig, ChatObservation,
    EnvError, RenderMode, Task,
};
use chat_rl::environment::{Environment, Features};

#[derive(Default)]
struct MockState {
    registered: bool,
    signup_fails: bool,
    backend_down: bool,
    late_message: bool,
    connect_fails: bool,
    pin_status: Option<u16>,
    workspaces: Vec<Workspace>,
    channels: Vec<Channel>,
    members: Vec<Member>,
    calls: Vec<String>,
    events: Vec<OutgoingEvent>,
    disconnects: usize,
}

#[derive(Clone, Default)]
struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    fn with_state(f: impl FnOnce(&mut MockState)) -> Self {
        let backend = MockBackend::default();
        f(&mut backend.state.lock().unwrap());
        backend
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn events(&self) -> Vec<OutgoingEvent> {
        self.state.lock().unwrap().events.clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().unwrap().calls.push(call.into());
    }

    fn session() -> Session {
        Session {
            session_id: "tok-1".to_string(),
            user: Some(User {
                id: "u-agent".to_string(),
                username: Some("RL_Agent".to_string()),
                email: None,
            }),
        }
    }
}

fn status(status: u16) -> ClientError {
    ClientError::Status {
        status,
        body: String::new(),
    }
}

fn channel(id: &str) -> Channel {
    Channel {
        id: id.to_string(),
        name: Some(id.to_string()),
        workspace_id: Some("ws-1".to_string()),
    }
}

fn member(id: &str) -> Member {
    Member {
        user_id: id.to_string(),
        username: None,
    }
}

fn message(id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        id: Some(id.to_string()),
        content: Some(content.to_string()),
        username: Some("alice".to_string()),
        ..Default::default()
    }
}

struct MockRealtime {
    state: Arc<Mutex<MockState>>,
    inbox: Inbox,
}

#[async_trait]
impl RealtimeChannel for MockRealtime {
    async fn emit(&mut self, event: OutgoingEvent) -> Result<(), ClientError> {
        self.state.lock().unwrap().events.push(event);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.disconnects += 1;
        // A reader that was mid-delivery when the channel closed.
        if state.late_message {
            self.inbox.push(message("m-late", "from the last episode"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    type Realtime = MockRealtime;

    async fn login(&self, _credentials: &Credentials) -> Result<Session, ClientError> {
        self.record("login");
        if self.state.lock().unwrap().backend_down {
            return Err(ClientError::Timeout("login"));
        }
        match self.state.lock().unwrap().registered {
            true => Ok(Self::session()),
            false => Err(status(401)),
        }
    }

    async fn signup(&self, username: &str, _credentials: &Credentials) -> Result<Session, ClientError> {
        self.record(format!("signup {username}"));
        let mut state = self.state.lock().unwrap();
        if state.signup_fails {
            return Err(status(409));
        }
        state.registered = true;
        Ok(Self::session())
    }

    async fn workspaces(&self, session: &str) -> Result<Vec<Workspace>, ClientError> {
        self.record(format!("workspaces {session}"));
        Ok(self.state.lock().unwrap().workspaces.clone())
    }

    async fn create_workspace(&self, _session: &str, name: &str, slug: &str) -> Result<Workspace, ClientError> {
        self.record(format!("create_workspace {name} {slug}"));
        let workspace = Workspace {
            id: "ws-1".to_string(),
            name: Some(name.to_string()),
            slug: Some(slug.to_string()),
        };
        self.state.lock().unwrap().workspaces.push(workspace.clone());
        Ok(workspace)
    }

    async fn channels(&self, _session: &str, workspace_id: &str) -> Result<Vec<Channel>, ClientError> {
        self.record(format!("channels {workspace_id}"));
        Ok(self.state.lock().unwrap().channels.clone())
    }

    async fn create_channel(&self, _session: &str, workspace_id: &str, name: &str) -> Result<Channel, ClientError> {
        self.record(format!("create_channel {workspace_id}"));
        let created = Channel {
            id: format!("ch-{}", self.state.lock().unwrap().channels.len() + 1),
            name: Some(name.to_string()),
            workspace_id: Some(workspace_id.to_string()),
        };
        self.state.lock().unwrap().channels.push(created.clone());
        Ok(created)
    }

    async fn members(&self, _session: &str, _workspace_id: &str) -> Result<Vec<Member>, ClientError> {
        Ok(self.state.lock().unwrap().members.clone())
    }

    async fn open_dm(&self, _session: &str, user_id: &str) -> Result<DmConversation, ClientError> {
        self.record(format!("open_dm {user_id}"));
        Ok(DmConversation {
            id: format!("dm-{user_id}"),
        })
    }

    async fn mark_read(&self, _session: &str, channel_id: &str) -> Result<(), ClientError> {
        self.record(format!("mark_read {channel_id}"));
        Ok(())
    }

    async fn pin_message(&self, _session: &str, message_id: &str, _channel_id: Option<&str>) -> Result<(), ClientError> {
        self.record(format!("pin {message_id}"));
        match self.state.lock().unwrap().pin_status {
            Some(code) => Err(status(code)),
            None => Ok(()),
        }
    }

    async fn search(&self, _session: &str, _workspace_id: &str, query: &str) -> Result<Vec<ChatMessage>, ClientError> {
        self.record(format!("search {query}"));
        Ok(vec![message("m-9", query)])
    }

    async fn connect(&self, inbox: Inbox) -> Result<MockRealtime, ClientError> {
        if self.state.lock().unwrap().connect_fails {
            return Err(ClientError::ChannelClosed);
        }
        Ok(MockRealtime {
            state: Arc::clone(&self.state),
            inbox,
        })
    }
}

fn config() -> ChatEnvironmentConfig {
    ChatEnvironmentConfig::new()
        .with_embedding_dim(16)
        .with_max_steps(5)
}

fn seeded_backend() -> MockBackend {
    MockBackend::with_state(|s| {
        s.registered = true;
        s.workspaces = vec![Workspace {
            id: "ws-1".to_string(),
            name: None,
            slug: None,
        }];
        s.channels = vec![channel("ch-1"), channel("ch-2")];
        s.members = vec![member("u-agent"), member("u-2"), member("u-3")];
    })
}

fn ready_env(backend: &MockBackend) -> ChatEnvironment<MockBackend> {
    let mut env = config().init_with_backend(backend.clone()).unwrap();
    env.reset(Some(3)).unwrap();
    env
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn reset_signs_up_and_creates_workspace() {
    let backend = MockBackend::with_state(|s| s.channels = vec![channel("ch-1")]);
    let mut env = config().init_with_backend(backend.clone()).unwrap();
    let obs = env.reset(None).unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            "login",
            "signup RL_Agent",
            "workspaces tok-1",
            "create_workspace RL Training Space rl-training",
            "channels ws-1",
        ]
    );
    assert_eq!(env.user_id(), Some("u-agent"));
    assert_eq!(env.workspace_id(), Some("ws-1"));
    assert_eq!(env.current_channel(), Some("ch-1"));
    assert!(env.is_connected());
    assert_eq!(
        backend.events(),
        vec![
            OutgoingEvent::UserOnline {
                user_id: Some("u-agent".to_string()),
                workspace_id: Some("ws-1".to_string()),
            },
            OutgoingEvent::JoinChannel {
                channel_id: "ch-1".to_string()
            },
        ]
    );
    assert_eq!(obs.features().len(), ChatObservation::feature_len(16));
    assert_eq!(obs.unread_counts, [0; 10]);
    assert_eq!(obs.time_since_last_message, 0.0);
}

#[test]
fn failed_authentication_is_fatal() {
    let backend = MockBackend::with_state(|s| s.signup_fails = true);
    let mut env = config().init_with_backend(backend).unwrap();
    let err = env.reset(None).unwrap_err();
    assert!(matches!(err, EnvError::Authentication { ref email, .. } if email == "rl_agent@slack.ai"));
}

#[test]
fn unreachable_backend_skips_signup() {
    let backend = MockBackend::with_state(|s| s.backend_down = true);
    let mut env = config().init_with_backend(backend.clone()).unwrap();
    let err = env.reset(None).unwrap_err();
    assert!(matches!(
        err,
        EnvError::Authentication {
            source: ClientError::Timeout("login"),
            ..
        }
    ));
    assert_eq!(backend.calls(), vec!["login"]);
}

#[test]
fn failed_reset_discards_previous_episode() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);
    {
        let mut state = backend.state.lock().unwrap();
        state.registered = false;
        state.signup_fails = true;
    }

    assert!(env.reset(Some(1)).is_err());
    assert!(!env.is_connected());
    assert_eq!(env.user_id(), None);
    assert_eq!(env.current_channel(), None);
    assert!(env.channels().is_empty());
    assert_eq!(backend.state.lock().unwrap().disconnects, 1);

    let err = env.step(ChatAction::new(ActionType::SendMessage)).unwrap_err();
    assert!(matches!(err, EnvError::NotReset));
    assert_eq!(backend.events().len(), 2);
}

#[test]
fn reset_drops_messages_from_previous_socket() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);
    backend.state.lock().unwrap().late_message = true;

    let obs = env.reset(None).unwrap();
    assert!(env.inbox().is_empty());
    assert_eq!(obs.unread_counts[0], 0);
    let step = env.step(ChatAction::new(ActionType::React)).unwrap();
    assert!(!step.info.action_success);
}

#[test]
fn step_requires_reset() {
    let mut env = config().init_with_backend(seeded_backend()).unwrap();
    let err = env.step(ChatAction::new(ActionType::Wait)).unwrap_err();
    assert!(matches!(err, EnvError::NotReset));
}

#[test]
fn send_message_emits_decoded_template() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);
    let embedding = vec![0.0625; 1];
    let step = env
        .step(ChatAction::new(ActionType::SendMessage).with_embedding(embedding.clone()))
        .unwrap();

    assert!(step.info.action_success);
    assert_eq!(step.info.current_step, 1);
    assert!(approx(step.reward, 0.09), "{}", step.reward);
    assert_eq!(
        backend.events().last(),
        Some(&OutgoingEvent::SendMessage {
            channel_id: Some("ch-1".to_string()),
            dm_conversation_id: None,
            content: encoding::decode_message(&embedding).to_string(),
            user_id: Some("u-agent".to_string()),
        })
    );
}

#[test]
fn reply_to_buffered_message_earns_conversation_bonus() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);
    env.inbox().push(message("m-1", "hi agent"));

    let step = env.step(ChatAction::new(ActionType::SendMessage)).unwrap();
    assert!(approx(step.reward, 0.44), "{}", step.reward);
    assert_eq!(step.info.messages_received, 1);
    assert_eq!(step.observation.unread_counts[0], 1);
    assert_eq!(
        step.observation.conversation_context,
        encoding::simple_embedding("hi agent", 16)
    );
    assert_eq!(
        step.observation.message_history[0],
        encoding::simple_embedding("hi agent", 16)
    );
}

#[test]
fn react_targets_last_message() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);

    let step = env
        .step(ChatAction::new(ActionType::React).with_emoji(3))
        .unwrap();
    assert!(!step.info.action_success);
    assert!(approx(step.reward, -0.01), "{}", step.reward);

    env.inbox().push(message("m-1", "first"));
    env.inbox().push(message("m-2", "second"));
    let step = env
        .step(ChatAction::new(ActionType::React).with_emoji(13))
        .unwrap();
    assert!(step.info.action_success);
    assert_eq!(
        backend.events().last(),
        Some(&OutgoingEvent::Reaction {
            message_id: "m-2".to_string(),
            emoji: "🎉".to_string(),
            user_id: Some("u-agent".to_string()),
        })
    );
}

#[test]
fn channel_actions_update_known_channels() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);

    let step = env.step(ChatAction::new(ActionType::CreateChannel)).unwrap();
    assert!(step.info.action_success, "{}", step.info.action_message);
    assert_eq!(env.channels().len(), 3);

    let step = env
        .step(ChatAction::new(ActionType::JoinChannel).with_target(5))
        .unwrap();
    assert!(step.info.action_success);
    assert_eq!(env.current_channel(), Some(env.channels()[2].id.as_str()));
    assert!(matches!(
        backend.events().last(),
        Some(OutgoingEvent::JoinChannel { .. })
    ));
}

#[test]
fn direct_message_skips_the_agent() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);

    let step = env
        .step(ChatAction::new(ActionType::SendDm).with_target(3))
        .unwrap();
    assert!(step.info.action_success);
    // Peers are [u-2, u-3]; target 3 wraps onto u-3.
    assert!(backend.calls().contains(&"open_dm u-3".to_string()));
    assert!(matches!(
        backend.events().last(),
        Some(OutgoingEvent::SendMessage { dm_conversation_id: Some(id), channel_id: None, .. }) if id == "dm-u-3"
    ));
}

#[test]
fn mark_read_clears_unread_counter() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);
    for i in 0..3 {
        env.inbox().push(message(&format!("m-{i}"), "ping"));
    }

    let step = env.step(ChatAction::new(ActionType::Wait)).unwrap();
    assert_eq!(step.observation.unread_counts[0], 3);
    assert!(approx(step.reward, 0.1));

    let step = env.step(ChatAction::new(ActionType::MarkRead)).unwrap();
    assert!(step.info.action_success);
    assert_eq!(step.observation.unread_counts[0], 0);
    assert_eq!(step.info.messages_received, 3);
    assert!(backend.calls().contains(&"mark_read ch-1".to_string()));
}

#[test]
fn failed_pin_is_penalised_not_fatal() {
    let backend = seeded_backend();
    backend.state.lock().unwrap().pin_status = Some(403);
    let mut env = config()
        .with_task(Task::Routing)
        .init_with_backend(backend.clone())
        .unwrap();
    env.reset(None).unwrap();
    env.inbox().push(message("m-1", "route me"));

    let step = env.step(ChatAction::new(ActionType::PinMessage)).unwrap();
    assert!(!step.info.action_success);
    assert!(approx(step.reward, -0.01));
    assert!(backend.calls().contains(&"pin m-1".to_string()));

    let step = env.step(ChatAction::new(ActionType::SearchMessages)).unwrap();
    assert!(step.info.action_success);
    assert_eq!(step.info.action_message, "Search returned 1 messages");
}

#[test]
fn episode_ends_at_max_steps() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);
    let done: Vec<bool> = (0..5)
        .map(|_| env.step(ChatAction::new(ActionType::Wait)).unwrap().done)
        .collect();
    assert_eq!(done, vec![false, false, false, false, true]);

    env.reset(None).unwrap();
    assert_eq!(env.current_step(), 0);
    // The previous realtime channel is closed before reconnecting.
    assert_eq!(backend.state.lock().unwrap().disconnects, 1);
}

#[test]
fn runs_without_realtime_channel() {
    let backend = seeded_backend();
    backend.state.lock().unwrap().connect_fails = true;
    let mut env = ready_env(&backend);
    assert!(!env.is_connected());

    let step = env.step(ChatAction::new(ActionType::SendMessage)).unwrap();
    assert!(!step.info.action_success);
    let step = env.step(ChatAction::new(ActionType::Wait)).unwrap();
    assert!(step.info.action_success);
    assert_eq!(step.info.action_message, "No action taken");
}

#[test]
fn seeded_placeholder_features_are_reproducible() {
    let backend = seeded_backend();
    let mut env = config().init_with_backend(backend).unwrap();
    let first = env.reset(Some(11)).unwrap();
    let second = env.reset(Some(11)).unwrap();
    assert_eq!(first.channel_info, second.channel_info);
    assert_eq!(first.user_presence, second.user_presence);
    assert!(first.channel_info.iter().all(|x| (0.0..1.0).contains(x)));
}

#[test]
fn render_and_close() {
    let backend = seeded_backend();
    let mut env = ready_env(&backend);
    env.inbox().push(message("m-1", "hello"));
    env.step(ChatAction::new(ActionType::Wait)).unwrap();

    assert_eq!(
        env.render(RenderMode::Ansi).as_deref(),
        Some("Step: 1, Messages: 1")
    );
    assert_eq!(env.render(RenderMode::Human), None);

    env.close().unwrap();
    assert!(!env.is_connected());
    assert_eq!(backend.state.lock().unwrap().disconnects, 1);
    // Closing twice is a no-op.
    env.close().unwrap();
    assert_eq!(backend.state.lock().unwrap().disconnects, 1);
}
