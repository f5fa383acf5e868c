//! End-to-end chat flows against scripted provider and transport mocks:
//! intake, report, advisor turns with tools, and the roundtable mode.

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use astral_chat::agent::provider::{LLMProvider, SamplingParams};
use astral_chat::agent::AgentError;
use astral_chat::astrology::MeanMotionEphemeris;
use astral_chat::orchestrator::{Conversation, IntakeStage, ReplyMode};
use astral_chat::persona::{Persona, PersonaRegistry};
use astral_chat::session::{Message, Role};
use astral_chat::transport::{MessageStream, Transport};
use astral_chat::validate::RETRY_MESSAGE;
use astral_chat::ChatConfig;

/// Provider with queued chat replies; streams route on the persona steering
/// line and can be poisoned to fail mid-stream.
struct ScriptedProvider {
    chat_replies: Mutex<VecDeque<String>>,
    poisoned: Vec<String>,
}

impl ScriptedProvider {
    fn new(chat_replies: Vec<&str>) -> Self {
        Self {
            chat_replies: Mutex::new(chat_replies.into_iter().map(String::from).collect()),
            poisoned: Vec::new(),
        }
    }

    fn with_poisoned(mut self, names: Vec<&str>) -> Self {
        self.poisoned = names.into_iter().map(String::from).collect();
        self
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        _model: &str,
        _messages: &[Message],
        _sampling: &SamplingParams,
    ) -> Result<String> {
        self.chat_replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("chat script exhausted"))
    }

    async fn chat_stream(
        &self,
        _model: &str,
        messages: &[Message],
        _sampling: &SamplingParams,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let persona = messages
            .last()
            .map(|m| m.content.trim_start_matches("speak as ").to_string())
            .unwrap_or_default();
        let chunks: Vec<Result<String>> = if self.poisoned.contains(&persona) {
            vec![
                Ok(format!("{} starts ", persona)),
                Err(anyhow::anyhow!("connection reset")),
            ]
        } else {
            vec![
                Ok(format!("{} counsels ", persona)),
                Ok("patience".to_string()),
            ]
        };
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}

struct SilentStream;

#[async_trait]
impl MessageStream for SilentStream {
    async fn stream_token(&mut self, _token: &str) -> Result<()> {
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Transport that answers intake questions from a script and records
/// everything sent back to the user.
struct ScriptedTransport {
    replies: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            asked: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn register_persona(&self, _persona: &Persona) -> Result<()> {
        Ok(())
    }

    async fn send_message(&self, _author: Option<&str>, content: &str) -> Result<()> {
        self.sent.lock().await.push(content.to_string());
        Ok(())
    }

    async fn open_stream(&self, _author: &str) -> Result<Box<dyn MessageStream>> {
        Ok(Box::new(SilentStream))
    }

    async fn ask_user(&self, question: &str) -> Result<String> {
        self.asked.lock().await.push(question.to_string());
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("reply script exhausted"))
    }
}

async fn conversation(
    provider: ScriptedProvider,
    transport: Arc<ScriptedTransport>,
    config: ChatConfig,
) -> Conversation {
    Conversation::new(
        Arc::new(provider),
        transport,
        Arc::new(MeanMotionEphemeris),
        PersonaRegistry::builtin(),
        config,
    )
    .await
}

#[tokio::test]
async fn full_reading_flow() {
    let transport = ScriptedTransport::new(vec!["12/04/1998", "08:20 AM", "Simferopol"]);
    let provider = ScriptedProvider::new(vec![
        "[THOUGHT]\nMercury rules interviews.\n[ACTION]\n{\"name\": \"Mercury\", \"parameters\": {\"input\": \"a job interview\"}}",
        "[ANSWER]\nLead with clarity and listen twice.",
        "[ANSWER]\nThe outlook holds.",
    ]);
    let mut convo = conversation(provider, transport.clone(), ChatConfig::default()).await;

    // Phase 1: the first message triggers intake and is consumed.
    convo.handle_message("Hello").await.unwrap();
    {
        let sent = transport.sent.lock().await;
        assert!(sent[0].starts_with("Thank you for providing your details."));
        assert!(sent[0].contains("Birth Date: 12/04/1998"));
        assert!(sent[0].contains("Birth Time: 08:20 AM"));
        assert!(sent[0].contains("Birth Place: Simferopol"));
    }
    let session = convo.session();
    {
        let session = session.lock().await;
        assert!(session.messages().iter().all(|m| m.content != "Hello"));
    }
    assert_eq!(convo.stage().await, IntakeStage::NeedReport);

    // Phase 2: the next message produces the chart report.
    convo.handle_message("I have a job interview coming up")
        .await
        .unwrap();
    {
        let sent = transport.sent.lock().await;
        assert!(sent[1].starts_with("Your Astrological Chart: "));
        assert!(sent[1].contains("NAME: User"));
        assert!(sent[1].contains("PLANET     POSITION"));
        assert!(sent[1].contains("HOUSES"));
    }
    assert!(convo.chart().is_some());
    assert_eq!(convo.stage().await, IntakeStage::Conversing);

    // Phase 3: advice flows through the Mercury tool.
    convo.handle_message("What should I focus on?").await.unwrap();
    {
        let sent = transport.sent.lock().await;
        assert_eq!(sent[2], "Lead with clarity and listen twice.");
    }
    {
        let session = session.lock().await;
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Lead with clarity and listen twice.");
        assert!(session
            .messages()
            .iter()
            .any(|m| m.role == Role::User && m.content == "What should I focus on?"));
    }

    // Phase 4: birth data and chart are remembered, nothing is asked again.
    convo.handle_message("Anything else?").await.unwrap();
    assert_eq!(transport.asked.lock().await.len(), 3);
    assert_eq!(convo.stage().await, IntakeStage::Conversing);
}

#[tokio::test]
async fn rejected_date_is_retried_with_the_fixed_message() {
    let transport =
        ScriptedTransport::new(vec!["31/02/2000", "12/04/1998", "08:20 AM", "Simferopol"]);
    let provider = ScriptedProvider::new(vec![]);
    let mut convo = conversation(provider, transport.clone(), ChatConfig::default()).await;

    convo.handle_message("hi").await.unwrap();

    let sent = transport.sent.lock().await;
    assert_eq!(sent.iter().filter(|m| *m == RETRY_MESSAGE).count(), 1);
    assert_eq!(sent[0], RETRY_MESSAGE);
    assert!(sent[1].contains("Birth Date: 12/04/1998"));
}

#[tokio::test]
async fn bounded_attempts_give_up_and_stay_at_intake() {
    let transport = ScriptedTransport::new(vec!["not a date", "also wrong"]);
    let provider = ScriptedProvider::new(vec![]);
    let mut config = ChatConfig::default();
    config.max_intake_attempts = Some(2);
    let mut convo = conversation(provider, transport.clone(), config).await;

    let err = convo.handle_message("hi").await;
    assert!(matches!(err, Err(AgentError::Validation(_))));
    assert_eq!(convo.stage().await, IntakeStage::NeedBirthData);
}

#[tokio::test]
async fn roundtable_survives_a_failing_responder() {
    let transport = ScriptedTransport::new(vec![]);
    let provider = ScriptedProvider::new(vec![]).with_poisoned(vec!["Sun"]);
    let mut convo = conversation(provider, transport.clone(), ChatConfig::default())
        .await
        .with_mode(ReplyMode::Roundtable);

    convo.handle_message("hello up there").await.unwrap();

    let session = convo.session();
    let session = session.lock().await;
    let users = session
        .messages()
        .iter()
        .filter(|m| m.role == Role::User)
        .count();
    assert_eq!(users, 1);

    // Sun failed mid-stream, so only Moon's complete reply is recorded.
    let replies: Vec<(&str, &str)> = session
        .messages()
        .iter()
        .filter_map(|m| m.author.as_deref().map(|a| (a, m.content.as_str())))
        .collect();
    assert_eq!(replies, vec![("Moon", "Moon counsels patience")]);
}

#[tokio::test]
async fn advisor_can_hand_a_question_back_to_the_user() {
    let transport = ScriptedTransport::new(vec![
        "12/04/1998",
        "08:20 AM",
        "Simferopol",
        "the teamwork project",
    ]);
    let provider = ScriptedProvider::new(vec![
        "[ACTION]\n{\"name\": \"human\", \"parameters\": {\"input\": \"What detail matters most to you?\"}}",
        "[ANSWER]\nOpen with the teamwork story.",
    ]);
    let mut convo = conversation(provider, transport.clone(), ChatConfig::default()).await;

    convo.handle_message("hi").await.unwrap();
    convo.handle_message("interview prep").await.unwrap();
    convo.handle_message("what do I say first?").await.unwrap();

    let asked = transport.asked.lock().await;
    assert_eq!(asked.len(), 4);
    assert_eq!(asked[3], "What detail matters most to you?");

    let sent = transport.sent.lock().await;
    assert_eq!(sent.last().unwrap(), "Open with the teamwork story.");
}
