//! Terminal chat surface.

use anyhow::Result;
use async_trait::async_trait;
use std::io::{self, Write};
use tracing::debug;

use super::{MessageStream, Transport};
use crate::persona::Persona;

/// Prints to stdout and reads answers from stdin. Streamed replies buffer
/// until `finish`: sibling responders run concurrently and token-by-token
/// printing would interleave them on one screen.
pub struct TerminalTransport;

impl TerminalTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TerminalTransport {
    async fn register_persona(&self, persona: &Persona) -> Result<()> {
        // No avatars on a terminal; keep the registration visible in logs.
        debug!(persona = %persona.name, avatar = %persona.avatar_url, "registered persona");
        Ok(())
    }

    async fn send_message(&self, author: Option<&str>, content: &str) -> Result<()> {
        match author {
            Some(name) => println!("\n🪐 {}:\n{}", name, content),
            None => println!("\n🔮 {}", content),
        }
        Ok(())
    }

    async fn open_stream(&self, author: &str) -> Result<Box<dyn MessageStream>> {
        Ok(Box::new(TerminalStream {
            author: author.to_string(),
            buffer: String::new(),
        }))
    }

    async fn ask_user(&self, question: &str) -> Result<String> {
        println!("\n💬 {}", question);
        print!("   > ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim_end_matches(['\r', '\n']).to_string())
    }
}

struct TerminalStream {
    author: String,
    buffer: String,
}

#[async_trait]
impl MessageStream for TerminalStream {
    async fn stream_token(&mut self, token: &str) -> Result<()> {
        self.buffer.push_str(token);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        println!("\n🪐 {}:\n{}\n{}", self.author, self.buffer, "─".repeat(50));
        Ok(())
    }
}
