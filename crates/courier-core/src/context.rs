//! Conversation context: bounded per-session history and prompt assembly.

use crate::error::CourierError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// History is trimmed to this many entries after every completed round.
pub const MAX_HISTORY: usize = 20;

/// Fixed instructions sent ahead of every prompt. The file-send directive is
/// the only way the gateway learns that a reply should carry a file.
pub const SYSTEM_CONTRACT: &str = "\
You are a personal automation assistant reached through a private chat with your owner.
Keep replies short and plain; they are read on a phone.

FILE DELIVERY CONTRACT:
- Whenever the user asks you to send, share, show, or deliver a file, image, screenshot, or document,
  you MUST include the directive [SEND_FILE:/absolute/path/to/file] in your reply.
- Never merely describe where a file is or claim you sent it. Only the directive delivers a file.
- Use an absolute path to a file that exists. Emit at most one directive per reply.
- Any text outside the directive is sent as the caption.";

/// Speaker of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when serializing history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// A single entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
}

impl ConversationEntry {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

/// Conversation context passed to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// System prompt prepended to every request.
    pub system_prompt: String,
    /// Conversation history (oldest first).
    pub history: Vec<ConversationEntry>,
    /// The current user message.
    pub current_message: String,
}

impl Context {
    /// Create a new context with just a current message and the default contract.
    pub fn new(message: &str) -> Self {
        Self {
            system_prompt: SYSTEM_CONTRACT.to_string(),
            history: Vec::new(),
            current_message: message.to_string(),
        }
    }

    /// Flatten the context into a single prompt string for CLI backends.
    ///
    /// Layout: system contract, then prior history as `Role: content` lines,
    /// then the current user text.
    pub fn to_prompt_string(&self) -> String {
        let mut parts = Vec::new();

        if !self.system_prompt.is_empty() {
            parts.push(self.system_prompt.clone());
        }

        if !self.history.is_empty() {
            let lines: Vec<String> = self
                .history
                .iter()
                .map(|e| format!("{}: {}", e.role.label(), e.content))
                .collect();
            parts.push(format!("Conversation so far:\n{}", lines.join("\n")));
        }

        parts.push(format!("User: {}", self.current_message));

        parts.join("\n\n")
    }
}

/// Per-session state. Histories are keyed by backend name.
#[derive(Debug, Default)]
struct SessionHistory {
    histories: HashMap<String, Vec<ConversationEntry>>,
    /// Bumped by `clear`; rounds opened before a clear do not write back.
    epoch: u64,
    open: bool,
}

/// A round whose user entry is recorded but whose reply is still pending.
///
/// Consumed by exactly one of [`ConversationStore::complete_round`] or
/// [`ConversationStore::abandon_round`].
#[derive(Debug)]
#[must_use = "an open round must be completed or abandoned"]
pub struct OpenRound {
    session: String,
    backend: String,
    epoch: u64,
    user_text: String,
    /// Full prompt to hand to the backend.
    pub prompt: String,
}

/// Owns every conversation history for the process lifetime.
#[derive(Debug, Default)]
pub struct ConversationStore {
    sessions: HashMap<String, SessionHistory>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the user's text and build the outbound prompt.
    ///
    /// Fails if the session already has an open round.
    pub fn begin_round(
        &mut self,
        session: &str,
        backend: &str,
        user_text: &str,
    ) -> Result<OpenRound, CourierError> {
        let state = self.sessions.entry(session.to_string()).or_default();
        if state.open {
            return Err(CourierError::Busy(session.to_string()));
        }

        let history = state.histories.entry(backend.to_string()).or_default();
        let context = Context {
            system_prompt: SYSTEM_CONTRACT.to_string(),
            history: history.clone(),
            current_message: user_text.to_string(),
        };
        history.push(ConversationEntry::user(user_text));
        state.open = true;

        Ok(OpenRound {
            session: session.to_string(),
            backend: backend.to_string(),
            epoch: state.epoch,
            user_text: user_text.to_string(),
            prompt: context.to_prompt_string(),
        })
    }

    /// Record the assistant's reply and trim to the most recent entries.
    pub fn complete_round(&mut self, round: OpenRound, reply: &str) {
        let Some(state) = self.sessions.get_mut(&round.session) else {
            return;
        };
        state.open = false;
        if state.epoch != round.epoch {
            return;
        }
        let history = state.histories.entry(round.backend).or_default();
        history.push(ConversationEntry::assistant(reply));
        if history.len() > MAX_HISTORY {
            let excess = history.len() - MAX_HISTORY;
            history.drain(..excess);
        }
    }

    /// Close a round that produced no turn, withdrawing its user entry.
    pub fn abandon_round(&mut self, round: OpenRound) {
        let Some(state) = self.sessions.get_mut(&round.session) else {
            return;
        };
        state.open = false;
        if state.epoch != round.epoch {
            return;
        }
        if let Some(history) = state.histories.get_mut(&round.backend) {
            if history.last() == Some(&ConversationEntry::user(&round.user_text)) {
                history.pop();
            }
        }
    }

    /// Drop every backend's history for a session.
    pub fn clear(&mut self, session: &str) {
        if let Some(state) = self.sessions.get_mut(session) {
            state.histories.clear();
            state.epoch += 1;
        }
    }

    /// History for one session and backend (oldest first).
    pub fn history(&self, session: &str, backend: &str) -> &[ConversationEntry] {
        self.sessions
            .get(session)
            .and_then(|s| s.histories.get(backend))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether a round is currently open for the session.
    pub fn is_open(&self, session: &str) -> bool {
        self.sessions.get(session).is_some_and(|s| s.open)
    }
}
