//! Session state - ordered conversation history plus the intake artifacts
//! (birth data and the one-time astrological report).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validate::{DATE_FORMAT, TIME_FORMAT};

/// Role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single conversation message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Persona that authored an assistant message, if any.
    pub author: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            author: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            author: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, author: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            author,
            timestamp: Utc::now(),
        }
    }
}

/// Birth details captured during intake. Immutable once stored; the strings
/// keep the user's own wording (DD/MM/YYYY date, 12-hour time).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BirthData {
    pub date: String,
    pub time: String,
    pub place: String,
    pub name: Option<String>,
}

impl BirthData {
    pub fn new(
        date: impl Into<String>,
        time: impl Into<String>,
        place: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            place: place.into(),
            name: None,
        }
    }

    /// Re-parse the stored strings. The 12-hour clock is honored here, so
    /// "08:20 PM" maps to hour 20.
    pub fn as_moment(&self) -> Option<(NaiveDate, NaiveTime)> {
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()?;
        let time =
            NaiveTime::parse_from_str(&self.time.trim().to_uppercase(), TIME_FORMAT).ok()?;
        Some((date, time))
    }

    pub fn subject_name(&self) -> &str {
        self.name.as_deref().unwrap_or("User")
    }
}

/// One chat session: an append-only message history plus intake state.
/// Dropped when the session ends; nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    history: Vec<Message>,
    pub birth_data: Option<BirthData>,
    pub report: Option<String>,
}

impl Session {
    /// Create a session seeded with one opening system message.
    pub fn new(opening: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            history: vec![Message::system(opening)],
            birth_data: None,
            report: None,
        }
    }

    pub fn add_user(&mut self, content: impl Into<String>) {
        self.history.push(Message::user(content));
    }

    pub fn add_assistant(&mut self, content: impl Into<String>, author: Option<String>) {
        self.history.push(Message::assistant(content, author));
    }

    pub fn add_system(&mut self, content: impl Into<String>) {
        self.history.push(Message::system(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.history
    }

    /// Clone the history for a responder to read outside the session lock.
    pub fn snapshot(&self) -> Vec<Message> {
        self.history.clone()
    }

    /// Format history for prompt injection
    pub fn format_for_prompt(&self) -> String {
        self.history
            .iter()
            .map(|message| {
                let role_str = match message.role {
                    Role::User => "User",
                    Role::Assistant => {
                        if let Some(ref author) = message.author {
                            return format!("{}: {}", author, message.content);
                        }
                        "Assistant"
                    }
                    Role::System => "System",
                };
                format!("{}: {}", role_str, message.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Start over: keep the opening system message, drop everything else.
    pub fn reset(&mut self) {
        self.history.truncate(1);
        self.birth_data = None;
        self.report = None;
    }
}
