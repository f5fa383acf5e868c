//! Runtime configuration, read once at startup from `ASTRAL_*` environment
//! variables. Everything has a sensible default so the binary runs with no
//! setup at all against a local Ollama daemon.

use std::env;
use std::sync::Arc;

use ollama_rs::Ollama;
use tracing::warn;

use crate::agent::provider::{
    LLMProvider, OllamaProvider, OpenAICompatibleProvider, SamplingParams,
};
use crate::session::BirthData;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub model: String,
    /// OpenAI-compatible endpoint. None selects the local Ollama daemon.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub sampling: SamplingParams,
    /// Personas answering in roundtable mode.
    pub responders: Vec<String>,
    /// Pass planet advice through one extra LLM completion.
    pub refine_advice: bool,
    /// Skips the intake prompts when set and valid.
    pub preset_birth_data: Option<BirthData>,
    /// None keeps re-prompting forever.
    pub max_intake_attempts: Option<usize>,
    pub max_tool_iterations: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            base_url: None,
            api_key: None,
            sampling: SamplingParams::default(),
            responders: vec!["Sun".to_string(), "Moon".to_string()],
            refine_advice: false,
            preset_birth_data: None,
            max_intake_attempts: None,
            max_tool_iterations: 5,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.base_url = env::var("ASTRAL_BASE_URL").ok().filter(|s| !s.is_empty());
        config.api_key = env::var("ASTRAL_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|s| !s.is_empty());

        config.model = env::var("ASTRAL_MODEL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                if config.base_url.is_some() {
                    "gpt-3.5-turbo".to_string()
                } else {
                    "llama3.2:3b".to_string()
                }
            });

        if let Ok(raw) = env::var("ASTRAL_RESPONDERS") {
            let responders: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !responders.is_empty() {
                config.responders = responders;
            }
        }

        config.refine_advice = env::var("ASTRAL_REFINE_ADVICE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if let Ok(raw) = env::var("ASTRAL_PRESET_BIRTH") {
            match parse_preset(&raw) {
                Some(preset) => config.preset_birth_data = Some(preset),
                None => warn!(raw = %raw, "malformed ASTRAL_PRESET_BIRTH, expected date|time|place"),
            }
        }

        if let Ok(raw) = env::var("ASTRAL_MAX_INTAKE_ATTEMPTS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.max_intake_attempts = Some(n),
                _ => warn!(raw = %raw, "ignoring non-positive ASTRAL_MAX_INTAKE_ATTEMPTS"),
            }
        }

        if let Ok(raw) = env::var("ASTRAL_TEMPERATURE") {
            match raw.parse::<f32>() {
                Ok(t) => config.sampling.temperature = t,
                Err(_) => warn!(raw = %raw, "ignoring unparseable ASTRAL_TEMPERATURE"),
            }
        }

        if let Ok(raw) = env::var("ASTRAL_MAX_TOKENS") {
            match raw.parse::<u32>() {
                Ok(n) => config.sampling.max_tokens = n,
                Err(_) => warn!(raw = %raw, "ignoring unparseable ASTRAL_MAX_TOKENS"),
            }
        }

        config
    }

    /// Pick the provider backend: an OpenAI-compatible endpoint when a base
    /// URL is configured, the local Ollama daemon otherwise.
    pub fn build_provider(&self) -> Arc<dyn LLMProvider> {
        match &self.base_url {
            Some(url) => Arc::new(OpenAICompatibleProvider::new(
                url.clone(),
                self.api_key.clone(),
            )),
            None => Arc::new(OllamaProvider::new(Ollama::default())),
        }
    }
}

/// `date|time|place` with an optional fourth `|name` segment.
fn parse_preset(raw: &str) -> Option<BirthData> {
    let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    match parts.as_slice() {
        [date, time, place] => Some(BirthData::new(*date, *time, *place)),
        [date, time, place, name] => {
            let mut birth = BirthData::new(*date, *time, *place);
            birth.name = Some((*name).to_string());
            Some(birth)
        }
        _ => None,
    }
}
