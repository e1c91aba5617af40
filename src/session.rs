//! Chat sessions and the pipeline that drives them.
//!
//! A [`Session`] is an append-only, ordered message log with a tiny state
//! machine (`Idle` / `AwaitingResponse`). Sessions are plain values held in
//! a caller-owned [`SessionStore`]; their lifecycle (create, read, evict)
//! belongs to the caller, not the core.
//!
//! [`ChatPipeline::submit`] is the orchestration entry point: retrieve
//! context for the new user turn, compose the outbound payload, issue
//! exactly one completion attempt, and append the reply — or an in-band
//! error message — to the log. A failure is always recorded in the log,
//! never silently dropped, and the session always returns to `Idle`.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::chat::{ChatClient, WireMessage};
use crate::config::Config;
use crate::context::{assemble, AssembledContext};
use crate::embedding::Embedder;
use crate::error::ChatError;
use crate::index::IndexCache;
use crate::models::{Message, Role};
use crate::retrieve;

/// Session state machine. `AwaitingResponse` only exists for the duration
/// of one `submit`; overlapping submits on one session are ruled out by the
/// `&mut Session` it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// One conversation: an id plus its ordered message log.
///
/// The log is append-only. If a system message is present it occupies
/// position 0 and is the only one.
#[derive(Debug)]
pub struct Session {
    id: String,
    messages: Vec<Message>,
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Create a session whose log is seeded with a system message at
    /// position 0.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.messages.push(Message::system(prompt));
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Messages in strict append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-owned map of sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session, creating it on first use.
    pub fn get_or_create(&mut self, id: &str) -> &mut Session {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::with_id(id))
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Drives sessions: retrieval, payload composition, and the completion
/// call. One pipeline serves any number of sessions concurrently; the
/// shared pieces (index cache, embedder, chat client) are all handles.
pub struct ChatPipeline {
    cache: IndexCache,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatClient>,
    system_prompt: String,
    include_history: bool,
    k: usize,
    max_context_chars: usize,
    max_tokens: u32,
}

impl ChatPipeline {
    pub fn new(
        cache: IndexCache,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatClient>,
        config: &Config,
    ) -> Self {
        Self {
            cache,
            embedder,
            chat,
            system_prompt: config.chat.system_prompt.clone(),
            include_history: config.chat.include_history,
            k: config.retrieval.k,
            max_context_chars: config.retrieval.max_context_chars,
            max_tokens: config.chat.max_tokens,
        }
    }

    /// Submit one user turn: append it, retrieve context, call the
    /// completion endpoint once, and append the reply.
    ///
    /// Valid only from `Idle`; taking `&mut Session` makes an overlapping
    /// submit on the same session unrepresentable. Returns the appended
    /// assistant message. On any completion failure the returned message
    /// carries a human-readable error marker instead of a reply; the
    /// session is back in `Idle` either way.
    pub async fn submit(&self, session: &mut Session, user_text: &str) -> Message {
        session.push(Message::user(user_text));
        session.state = SessionState::AwaitingResponse;

        let context = self.retrieve_context(user_text).await;
        let payload = self.compose_payload(session, &context);

        let reply = match self.chat.complete(&payload, self.max_tokens).await {
            Ok(content) => Message::assistant(content),
            Err(e) => {
                tracing::warn!(
                    session = session.id(),
                    error = %e,
                    "chat completion failed; recording in-band error reply"
                );
                Message::assistant(error_marker(&e))
            }
        };

        session.push(reply.clone());
        session.state = SessionState::Idle;
        reply
    }

    /// Build the retrieval context for a query, degrading to an empty
    /// context on any failure along the index/embed/search path. The user
    /// interaction proceeds either way.
    async fn retrieve_context(&self, query: &str) -> AssembledContext {
        let index = match self.cache.get().await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "index unavailable; answering without retrieved context");
                return AssembledContext::default();
            }
        };

        if index.is_empty() {
            tracing::debug!("index is empty; answering without retrieved context");
            return AssembledContext::default();
        }

        let query_vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; answering without retrieved context");
                return AssembledContext::default();
            }
        };

        let matches = match retrieve::search(&index, &query_vector, self.k) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "search failed; answering without retrieved context");
                return AssembledContext::default();
            }
        };

        assemble(&matches, self.max_context_chars)
    }

    /// Compose the outbound payload: `[system, ...history, user]`.
    ///
    /// The system message is the configured prompt, augmented with the
    /// retrieved context when there is any. The just-appended user message
    /// is the log's last entry, so "history plus new turn" is simply every
    /// non-system log message; with `include_history` off, only that last
    /// turn is sent.
    fn compose_payload(&self, session: &Session, context: &AssembledContext) -> Vec<WireMessage> {
        let system_text = if context.text.is_empty() {
            self.system_prompt.clone()
        } else {
            format!(
                "{}\n\nUse the following retrieved context when answering:\n\n{}",
                self.system_prompt, context.text
            )
        };

        let mut payload = Vec::with_capacity(session.messages().len() + 1);
        payload.push(WireMessage::new(Role::System, system_text));

        if self.include_history {
            payload.extend(
                session
                    .messages()
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .map(WireMessage::from),
            );
        } else if let Some(last) = session.messages().last() {
            payload.push(WireMessage::from(last));
        }

        payload
    }
}

/// Render a chat failure as the in-band assistant message the user sees.
/// Deliberately not the raw error; the typed error is logged instead.
fn error_marker(err: &ChatError) -> String {
    let reason = match err {
        ChatError::Timeout => "the request timed out".to_string(),
        ChatError::Transport(_) => "the service could not be reached".to_string(),
        ChatError::Status(code) => format!("the service returned HTTP {code}"),
        ChatError::MalformedResponse(_) => "the service returned an unreadable reply".to_string(),
    };
    format!("Sorry, I couldn't generate a response: {reason}. Please try again.")
}
