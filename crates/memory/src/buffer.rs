use chrono::Utc;
use flowbridge_core::config::MemoryConfig;
use flowbridge_core::message::{ConversationMessage, MessageMeta};
use flowbridge_core::{Error, Result};

/// Turn-termination marker appended to human messages in instruct mode.
const HUMAN_CLOSE: &str = "[/INST]";
/// Marker appended to assistant messages, opening the next turn.
const ASSISTANT_OPEN: &str = "</s><s>[INST]";

const SYSTEM_LABEL: &str = "System";
const FUNCTION_LABEL: &str = "Function";

/// Chat-control-token mode for the target model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMarkers {
    #[default]
    None,
    /// Instruct-style markers: human turns close with `[/INST]`, assistant
    /// turns open the next with `</s><s>[INST]`.
    Llama2,
}

impl ChatMarkers {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(ChatMarkers::None),
            "llama2" => Ok(ChatMarkers::Llama2),
            other => Err(Error::Config(format!("unknown chat marker mode: {}", other))),
        }
    }
}

/// Normalize a message history: fill missing metadata with a generated
/// timestamp plus the session identifiers, and in marker mode suffix each
/// turn with its control token.
///
/// Pure list-to-list function; the suffix is applied at most once per
/// message, so repeated passes over the same history are no-ops.
pub fn normalize_history(
    messages: &[ConversationMessage],
    markers: ChatMarkers,
    user: &str,
    prompt_id: &str,
) -> Vec<ConversationMessage> {
    let now = Utc::now().timestamp();

    messages
        .iter()
        .map(|m| {
            let mut msg = m.clone();
            if msg.meta.is_none() {
                msg.meta = Some(MessageMeta {
                    timestamp: now,
                    user: user.to_string(),
                    prompt_id: prompt_id.to_string(),
                });
            }
            if markers == ChatMarkers::Llama2 {
                match msg.role.as_str() {
                    "user" | "human" if !msg.content.contains(HUMAN_CLOSE) => {
                        msg.content = format!("{} {}", msg.content, HUMAN_CLOSE);
                    }
                    "assistant" | "ai" if !msg.content.contains(ASSISTANT_OPEN) => {
                        msg.content = format!("{} {}", msg.content, ASSISTANT_OPEN);
                    }
                    _ => {}
                }
            }
            msg
        })
        .collect()
}

/// Ordered message history for one conversation session.
///
/// Owned by exactly one session: single writer, single reader. Sharing a
/// buffer across sessions needs external synchronization by design.
pub struct ConversationBuffer {
    messages: Vec<ConversationMessage>,
    human_label: String,
    ai_label: String,
    markers: ChatMarkers,
    user: String,
    prompt_id: String,
}

impl ConversationBuffer {
    pub fn new(config: &MemoryConfig) -> Result<Self> {
        Ok(Self {
            messages: Vec::new(),
            human_label: config.human_label.clone(),
            ai_label: config.ai_label.clone(),
            markers: ChatMarkers::parse(&config.chat_markers)?,
            user: config.user.clone(),
            prompt_id: config.prompt_id.clone(),
        })
    }

    pub fn append(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn label_for(&self, role: &str) -> Result<&str> {
        match role {
            "user" | "human" => Ok(self.human_label.as_str()),
            "assistant" | "ai" => Ok(self.ai_label.as_str()),
            "system" => Ok(SYSTEM_LABEL),
            "function" => Ok(FUNCTION_LABEL),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }

    fn normalize(&mut self) {
        self.messages = normalize_history(&self.messages, self.markers, &self.user, &self.prompt_id);
    }

    fn window(&self, n: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(2 * n);
        &self.messages[start..]
    }

    /// Render the last `n` exchanges as `"{label}: {content}"` lines.
    pub fn render(&mut self, n: usize) -> Result<String> {
        self.normalize();

        let mut lines = Vec::with_capacity(2 * n);
        for msg in self.window(n) {
            let label = self.label_for(&msg.role)?;
            lines.push(format!("{}: {}", label, msg.content));
        }
        Ok(lines.join("\n"))
    }

    /// Same window as `render`, as normalized messages.
    pub fn render_as_messages(&mut self, n: usize) -> &[ConversationMessage] {
        self.normalize();
        self.window(n)
    }
}
