//! Conversation driver.
//!
//! Owns one session and routes each incoming message: through the intake
//! state machine until a chart exists, then to the tool-using advisor, or
//! straight to the roundtable fan-out when that mode was chosen.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::agent::provider::LLMProvider;
use crate::agent::{AdvisorAgent, AgentError, AgentResult};
use crate::astrology::{Chart, Ephemeris};
use crate::config::ChatConfig;
use crate::orchestrator::fanout::{self, ResponderContext};
use crate::orchestrator::intake::{self, IntakeStage};
use crate::persona::{Persona, PersonaRegistry};
use crate::session::Session;
use crate::tools::{builtin_planet_tools, HumanInputTool, ToolContext, ToolRegistry};
use crate::transport::Transport;

pub const OPENING_MESSAGE: &str = "You're entering a conversation with the celestial bodies of \
    our solar system. Please ask them any question or advice you seek.";

/// How replies are produced once a message arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// One advisor agent answers, consulting the planet tools. Gated behind
    /// birth-data intake.
    Advisor,
    /// Every configured responder answers concurrently. No intake gate.
    Roundtable,
}

pub struct Conversation {
    session: Arc<Mutex<Session>>,
    provider: Arc<dyn LLMProvider>,
    transport: Arc<dyn Transport>,
    ephemeris: Arc<dyn Ephemeris>,
    personas: PersonaRegistry,
    responders: Vec<Persona>,
    mode: ReplyMode,
    config: ChatConfig,
    chart: Option<Arc<Chart>>,
    advisor: AdvisorAgent,
}

impl Conversation {
    pub async fn new(
        provider: Arc<dyn LLMProvider>,
        transport: Arc<dyn Transport>,
        ephemeris: Arc<dyn Ephemeris>,
        personas: PersonaRegistry,
        config: ChatConfig,
    ) -> Self {
        let tools = ToolRegistry::new();
        for tool in builtin_planet_tools() {
            tools.register_instance(tool).await;
        }
        tools.register_instance(HumanInputTool).await;
        let tools = Arc::new(tools);

        let responders = personas.subset(&config.responders);
        let advisor = AdvisorAgent::new(provider.clone(), tools, config.model.clone())
            .with_sampling(config.sampling.clone())
            .with_max_iterations(config.max_tool_iterations);

        Self {
            session: Arc::new(Mutex::new(Session::new(OPENING_MESSAGE))),
            provider,
            transport,
            ephemeris,
            personas,
            responders,
            mode: ReplyMode::Advisor,
            config,
            chart: None,
            advisor,
        }
    }

    pub fn with_mode(mut self, mode: ReplyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Announce the cast and the opening line.
    pub async fn open(&self) -> AgentResult<()> {
        for persona in self.personas.all() {
            self.transport
                .register_persona(persona)
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;
        }
        self.send(None, OPENING_MESSAGE).await
    }

    /// Route one user message. Intake turns consume the message; conversing
    /// turns append it and answer it.
    pub async fn handle_message(&mut self, text: &str) -> AgentResult<()> {
        if self.mode == ReplyMode::Roundtable {
            let ctx = self.responder_context();
            fanout::handle_user_message(&self.session, text, &self.responders, &ctx).await?;
            return Ok(());
        }

        let (stage, birth) = {
            let session = self.session.lock().await;
            (intake::stage_of(&session), session.birth_data.clone())
        };

        match stage {
            IntakeStage::NeedBirthData => {
                let birth = intake::collect_birth_data(
                    self.transport.as_ref(),
                    self.config.preset_birth_data.as_ref(),
                    self.config.max_intake_attempts,
                )
                .await?;
                let confirmation = intake::confirmation_message(&birth);
                {
                    let mut session = self.session.lock().await;
                    session.birth_data = Some(birth);
                    session.add_assistant(confirmation.clone(), None);
                }
                self.send(None, &confirmation).await
            }
            IntakeStage::NeedReport => {
                let birth = birth.ok_or_else(|| {
                    AgentError::Execution("report stage without birth data".to_string())
                })?;
                // On ephemeris failure nothing is stored, so the next turn
                // lands back here and retries.
                let (chart, report) =
                    intake::build_report(&birth, self.ephemeris.as_ref()).await?;
                let announcement = format!("Your Astrological Chart: {}", report);
                {
                    let mut session = self.session.lock().await;
                    session.report = Some(report);
                    session.add_system(announcement.clone());
                }
                self.chart = Some(Arc::new(chart));
                self.send(None, &announcement).await
            }
            IntakeStage::Conversing => {
                let context = {
                    let mut session = self.session.lock().await;
                    let context = session.format_for_prompt();
                    session.add_user(text);
                    context
                };
                let ctx = self.tool_context();
                let response = self.advisor.run(text, Some(&context), &ctx).await?;
                {
                    let mut session = self.session.lock().await;
                    session.add_assistant(response.answer.clone(), None);
                }
                self.send(None, &response.answer).await
            }
        }
    }

    pub async fn stage(&self) -> IntakeStage {
        let session = self.session.lock().await;
        intake::stage_of(&session)
    }

    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    pub fn chart(&self) -> Option<Arc<Chart>> {
        self.chart.clone()
    }

    /// Wipe everything back to the opening message.
    pub async fn clear(&mut self) {
        self.session.lock().await.reset();
        self.chart = None;
    }

    async fn send(&self, author: Option<&str>, content: &str) -> AgentResult<()> {
        self.transport
            .send_message(author, content)
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))
    }

    fn tool_context(&self) -> ToolContext {
        ToolContext {
            chart: self.chart.clone(),
            transport: self.transport.clone(),
            refiner: self.config.refine_advice.then(|| self.provider.clone()),
            model: self.config.model.clone(),
            sampling: self.config.sampling.clone(),
        }
    }

    fn responder_context(&self) -> ResponderContext {
        ResponderContext {
            provider: self.provider.clone(),
            transport: self.transport.clone(),
            model: self.config.model.clone(),
            sampling: self.config.sampling.clone(),
        }
    }
}
