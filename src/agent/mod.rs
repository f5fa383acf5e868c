//! Agent Module
//!
//! LLM provider seam plus the tool-using advisor agent.

mod advisor;
pub mod provider;

pub use advisor::{AdvisorAgent, AdvisorStep, AgentResponse};
pub use provider::{LLMProvider, OllamaProvider, OpenAICompatibleProvider, SamplingParams};

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Agent error types
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("ephemeris error: {0}")]
    Ephemeris(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("execution error: {0}")]
    Execution(String),
}
