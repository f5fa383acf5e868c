//! LLM provider seam.
//!
//! `chat` returns a full completion, `chat_stream` yields tokens as they
//! arrive. The OpenAI-compatible provider speaks the `/chat/completions`
//! wire format (SSE when streaming); the Ollama provider wraps the local
//! Ollama daemon.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::session::{Message, Role};

/// Sampling knobs sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 500,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        sampling: &SamplingParams,
    ) -> Result<String>;

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        sampling: &SamplingParams,
    ) -> Result<BoxStream<'static, Result<String>>>;
}

pub struct OllamaProvider {
    client: ollama_rs::Ollama,
}

impl OllamaProvider {
    pub fn new(client: ollama_rs::Ollama) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        _sampling: &SamplingParams,
    ) -> Result<String> {
        use ollama_rs::generation::chat::{request::ChatMessageRequest, ChatMessage};

        let mut chat_messages = Vec::new();
        for message in messages {
            let content = message.content.clone();
            chat_messages.push(match message.role {
                Role::System => ChatMessage::system(content),
                Role::User => ChatMessage::user(content),
                Role::Assistant => ChatMessage::assistant(content),
            });
        }

        let res = self
            .client
            .send_chat_messages(ChatMessageRequest::new(model.to_string(), chat_messages))
            .await?;

        Ok(res.message.content)
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        sampling: &SamplingParams,
    ) -> Result<BoxStream<'static, Result<String>>> {
        // The chat call above is a single completion; surface it as a
        // one-chunk stream so callers have a uniform interface.
        let full = self.chat(model, messages, sampling).await?;
        let stream = futures::stream::iter(vec![Ok(full)]);
        Ok(Box::pin(stream))
    }
}

pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(
        model: &str,
        messages: &[Message],
        sampling: &SamplingParams,
        stream: bool,
    ) -> Value {
        json!({
            "model": model,
            "messages": wire_messages(messages),
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
            "top_p": sampling.top_p,
            "frequency_penalty": sampling.frequency_penalty,
            "presence_penalty": sampling.presence_penalty,
            "stream": stream,
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        sampling: &SamplingParams,
    ) -> Result<String> {
        let body = Self::request_body(model, messages, sampling, false);

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?.error_for_status()?;
        let json: Value = res.json().await?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .context("Failed to parse content from chat completion response")?;

        Ok(content.to_string())
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        sampling: &SamplingParams,
    ) -> Result<BoxStream<'static, Result<String>>> {
        use eventsource_stream::Eventsource;

        let body = Self::request_body(model, messages, sampling, true);

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = tx.send(Err(anyhow!("SSE stream error: {}", e)));
                        return;
                    }
                };

                if event.data == "[DONE]" {
                    return;
                }

                let chunk: Value = match serde_json::from_str(&event.data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ =
                            tx.send(Err(anyhow!("SSE parsing error: {}, data: {}", e, event.data)));
                        return;
                    }
                };

                if let Some(message) = stream_error_message(&chunk) {
                    let _ = tx.send(Err(anyhow!("SSE API error: {}", message)));
                    return;
                }

                if let Some(token) = chunk["choices"][0]["delta"]["content"].as_str() {
                    if !token.is_empty() && tx.send(Ok(token.to_string())).is_err() {
                        return;
                    }
                }
            }
            // The server must terminate a healthy stream with [DONE].
            let _ = tx.send(Err(anyhow!("SSE stream closed before completion")));
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

fn wire_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| json!({ "role": message.role.as_str(), "content": message.content }))
        .collect()
}

fn stream_error_message(chunk: &Value) -> Option<String> {
    let error = chunk.get("error")?;
    if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("unspecified streaming error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_messages_map_roles() {
        let messages = vec![
            Message::system("greeting"),
            Message::user("hello"),
            Message::assistant("hi", Some("Sun".to_string())),
        ];
        let wire = wire_messages(&messages);

        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[2]["role"], "assistant");
        assert_eq!(wire[2]["content"], "hi");
        // Persona attribution stays local; the wire only carries role + content.
        assert!(wire[2].get("name").is_none());
    }

    #[test]
    fn stream_error_from_object_shape() {
        let chunk = json!({ "error": { "message": "rate limited" } });
        assert_eq!(stream_error_message(&chunk).as_deref(), Some("rate limited"));
    }

    #[test]
    fn stream_error_from_string_shape() {
        let chunk = json!({ "error": "boom" });
        assert_eq!(stream_error_message(&chunk).as_deref(), Some("boom"));
    }

    #[test]
    fn no_stream_error_on_normal_chunk() {
        let chunk = json!({ "choices": [{ "delta": { "content": "hi" } }] });
        assert!(stream_error_message(&chunk).is_none());
    }

    #[test]
    fn request_body_carries_sampling() {
        let sampling = SamplingParams::default();
        let body = OpenAICompatibleProvider::request_body(
            "gpt-3.5-turbo",
            &[Message::user("hi")],
            &sampling,
            true,
        );
        // f32 widens to f64 on the wire, so compare with a tolerance.
        let temperature = body["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["top_p"], 1.0);
        assert_eq!(body["stream"], true);
    }
}
