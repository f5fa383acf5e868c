//! Orchestrator Module
//!
//! Drives a chat session end to end: birth-data intake, chart and report
//! generation, then either the tool-using advisor or a roundtable fan-out
//! where several celestial personas answer every message.

pub mod conversation;
pub mod fanout;
pub mod intake;

pub use conversation::{Conversation, ReplyMode, OPENING_MESSAGE};
pub use fanout::{handle_user_message, respond_as, ResponderContext};
pub use intake::{collect_birth_data, confirmation_message, IntakeStage};
