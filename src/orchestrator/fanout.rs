//! Concurrent persona responses.
//!
//! Every user message is appended to the session once, then each responder
//! streams an answer from its own snapshot of the history. A responder that
//! fails is logged and skipped, the rest still answer.

use futures_util::future::join_all;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::agent::provider::{LLMProvider, SamplingParams};
use crate::agent::{AgentError, AgentResult};
use crate::persona::Persona;
use crate::session::{Message, Session};
use crate::transport::Transport;

/// Shared collaborators for one fan-out round.
#[derive(Clone)]
pub struct ResponderContext {
    pub provider: Arc<dyn LLMProvider>,
    pub transport: Arc<dyn Transport>,
    pub model: String,
    pub sampling: SamplingParams,
}

/// Stream one persona's reply and append it to the session.
///
/// The persona steering line lives only in this responder's snapshot, the
/// shared history never sees it. The assistant message is appended only once
/// the stream has run to completion, so an aborted stream leaves no trace.
#[tracing::instrument(skip_all, fields(persona = %persona.name))]
pub async fn respond_as(
    persona: &Persona,
    session: &Arc<Mutex<Session>>,
    ctx: &ResponderContext,
) -> AgentResult<String> {
    let mut messages = {
        let session = session.lock().await;
        session.snapshot()
    };
    messages.push(Message::user(format!("speak as {}", persona.name)));

    let mut stream = ctx
        .provider
        .chat_stream(&ctx.model, &messages, &ctx.sampling)
        .await
        .map_err(|e| AgentError::Provider(e.to_string()))?;

    let mut sink = ctx
        .transport
        .open_stream(persona.label())
        .await
        .map_err(|e| AgentError::Transport(e.to_string()))?;

    let mut full = String::new();
    while let Some(chunk) = stream.next().await {
        let token = chunk.map_err(|e| AgentError::Provider(e.to_string()))?;
        full.push_str(&token);
        sink.stream_token(&token)
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;
    }

    {
        let mut session = session.lock().await;
        session.add_assistant(full.clone(), Some(persona.name.clone()));
    }

    // The reply is complete and recorded. A failed display flush is not
    // worth un-saying it.
    if let Err(e) = sink.finish().await {
        warn!(error = %e, "failed to flush responder stream");
    }

    Ok(full)
}

/// Append the user message once, then let every responder answer it
/// concurrently. Returns the successful replies in responder order.
pub async fn handle_user_message(
    session: &Arc<Mutex<Session>>,
    text: &str,
    responders: &[Persona],
    ctx: &ResponderContext,
) -> AgentResult<Vec<String>> {
    {
        let mut session = session.lock().await;
        session.add_user(text);
    }

    let rounds = responders
        .iter()
        .map(|persona| respond_as(persona, session, ctx));
    let results = join_all(rounds).await;

    let mut replies = Vec::new();
    for (persona, result) in responders.iter().zip(results) {
        match result {
            Ok(reply) => replies.push(reply),
            Err(e) => warn!(persona = %persona.name, error = %e, "responder failed"),
        }
    }
    Ok(replies)
}
