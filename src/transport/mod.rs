//! Transport seam between the orchestrator and whatever surface the user
//! is chatting on.
//!
//! A transport can announce personas, deliver whole messages, open an
//! incremental token stream for one reply, and ask the user a question,
//! suspending until the answer arrives.

mod terminal;

pub use terminal::TerminalTransport;

use anyhow::Result;
use async_trait::async_trait;

use crate::persona::Persona;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Announce a persona (name and avatar) to the surface.
    async fn register_persona(&self, persona: &Persona) -> Result<()>;

    /// Deliver a complete message, optionally attributed to a persona.
    async fn send_message(&self, author: Option<&str>, content: &str) -> Result<()>;

    /// Open an incremental stream for one reply by `author`.
    async fn open_stream(&self, author: &str) -> Result<Box<dyn MessageStream>>;

    /// Put a question to the user and wait for the reply.
    async fn ask_user(&self, question: &str) -> Result<String>;
}

/// One in-flight streamed reply. Tokens arrive in order; `finish` marks the
/// reply complete and releases it to the surface.
#[async_trait]
pub trait MessageStream: Send {
    async fn stream_token(&mut self, token: &str) -> Result<()>;

    async fn finish(&mut self) -> Result<()>;
}
