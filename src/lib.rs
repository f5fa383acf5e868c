//! Astral Chat
//!
//! Conversations with the celestial bodies of our solar system:
//! - Validated birth-data intake over any transport
//! - A deterministic natal chart and formatted report
//! - A tool-using advisor that consults one tool per planet
//! - A roundtable mode where personas stream answers concurrently

pub mod agent;
pub mod astrology;
pub mod config;
pub mod orchestrator;
pub mod persona;
pub mod session;
pub mod tools;
pub mod transport;
pub mod validate;

// Re-exports for convenience
pub use config::ChatConfig;
pub use orchestrator::{Conversation, ReplyMode};
pub use session::Session;
pub use tools::ToolRegistry;
