//! Tool-using advisor agent.
//!
//! Runs a tagged reasoning loop: the model emits [THOUGHT]/[ACTION]/[ANSWER]
//! blocks, tool outputs come back as [OBSERVATION] entries in the trace, and
//! the loop ends on an answer or after `max_iterations` turns. Parsing is
//! deliberately forgiving because small models drift on tag syntax.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::provider::{LLMProvider, SamplingParams};
use crate::agent::{AgentError, AgentResult};
use crate::session::Message;
use crate::tools::{ToolCall, ToolContext, ToolRegistry};

const DEFAULT_SYSTEM_PROMPT: &str = "You are an astrological advisor. You consult the celestial \
    bodies of the solar system through your tools and weave their readings into grounded, \
    practical advice.";

const DEFAULT_MAX_ITERATIONS: usize = 5;

/// One turn of the advisor loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorStep {
    /// The agent's thought/reasoning
    pub thought: String,
    /// The actions to take (tool calls)
    pub actions: Vec<ToolCall>,
    /// The observations from the actions
    pub observations: Vec<String>,
    /// Whether this is the final answer
    pub is_final: bool,
    /// The final answer (if is_final is true)
    pub answer: Option<String>,
}

impl AdvisorStep {
    pub fn thought(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            actions: Vec::new(),
            observations: Vec::new(),
            is_final: false,
            answer: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<ToolCall>) -> Self {
        self.actions = actions;
        self
    }

    pub fn final_answer(thought: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            actions: Vec::new(),
            observations: Vec::new(),
            is_final: true,
            answer: Some(answer.into()),
        }
    }
}

/// Response from an advisor run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The final answer shown to the user
    pub answer: String,
    /// All steps taken to reach the answer
    pub steps: Vec<AdvisorStep>,
    /// Whether the run reached an answer on its own
    pub success: bool,
    /// Any error message
    pub error: Option<String>,
}

impl AgentResponse {
    pub fn success(answer: impl Into<String>, steps: Vec<AdvisorStep>) -> Self {
        Self {
            answer: answer.into(),
            steps,
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, steps: Vec<AdvisorStep>) -> Self {
        let error = error.into();
        Self {
            answer: format!("I encountered an error: {}", error),
            steps,
            success: false,
            error: Some(error),
        }
    }
}

/// The advisor: one LLM, a closed tool set, and a bounded loop.
pub struct AdvisorAgent {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    model: String,
    sampling: SamplingParams,
    max_iterations: usize,
    system_prompt: String,
}

impl AdvisorAgent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            sampling: SamplingParams::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    async fn build_prompt(&self, query: &str, steps: &[AdvisorStep], context: Option<&str>) -> String {
        let mut prompt = String::new();

        if let Some(ctx) = context {
            prompt.push_str(&format!("## Context\n{}\n\n", ctx));
        }

        prompt.push_str("## Available Tools\n");
        prompt.push_str(&self.tools.describe_for_prompt().await);
        prompt.push_str("\n\n");

        prompt.push_str(
            r###"## Response Format
Respond using the EXACT format below.

[THOUGHT]
What the question needs and which celestial body can speak to it.

[ACTION]
{"name": "tool_name", "parameters": {"input": "the user's situation"}}

[ANSWER]
Your final advice to the user.

RULES:
1. Use [ACTION] for tool calls (JSON format). Do NOT wrap the JSON in code blocks.
2. Use [ANSWER] only when you are ready to give final advice.
3. NEVER output [OBSERVATION]. The system will provide it after your action.

"###,
        );

        prompt.push_str(&format!("## User Query\n{}\n\n", query));

        if !steps.is_empty() {
            prompt.push_str("## Trace\n");
            for step in steps {
                if !step.thought.is_empty() {
                    prompt.push_str(&format!("[THOUGHT]\n{}\n", step.thought));
                }
                for action in &step.actions {
                    if let Ok(action_json) = serde_json::to_string(action) {
                        prompt.push_str(&format!("[ACTION]\n{}\n", action_json));
                    }
                }
                for obs in &step.observations {
                    prompt.push_str(&format!("[OBSERVATION]\n{}\n", obs));
                }
                prompt.push('\n');
            }
        }

        prompt.push_str("Continue:\n");
        prompt
    }

    /// Run the loop to completion. Provider failures abort the run; tool
    /// failures become observations the model can react to.
    pub async fn run(
        &self,
        query: &str,
        context: Option<&str>,
        ctx: &ToolContext,
    ) -> AgentResult<AgentResponse> {
        let mut steps: Vec<AdvisorStep> = Vec::new();

        for iteration in 0..self.max_iterations {
            debug!(iteration = iteration + 1, "advisor iteration");

            let prompt = self.build_prompt(query, &steps, context).await;
            let messages = vec![
                Message::system(self.system_prompt.clone()),
                Message::user(prompt),
            ];
            let content = self
                .provider
                .chat(&self.model, &messages, &self.sampling)
                .await
                .map_err(|e| AgentError::Provider(e.to_string()))?;
            debug!("advisor raw reply:\n{}", content);

            let mut step = parse_advisor_reply(&content);

            if step.is_final {
                let answer = step.answer.clone().unwrap_or_else(|| step.thought.clone());
                steps.push(step);
                info!(iterations = iteration + 1, "advisor reached an answer");
                return Ok(AgentResponse::success(answer, steps));
            }

            if !step.actions.is_empty() {
                if let Some(last) = steps.last() {
                    if last.actions == step.actions {
                        warn!("redundant tool calls detected, hinting the model forward");
                        step.observations = vec!["SYSTEM HINT: Redundant tool call detected. \
                            Try a different approach or provide a final answer."
                            .to_string()];
                        steps.push(step);
                        continue;
                    }
                }

                let mut observations = Vec::new();
                for action in &step.actions {
                    let observation = match self.tools.execute(action, ctx).await {
                        Ok(output) => output.summary,
                        Err(e) => format!("Tool execution failed: {}", e),
                    };
                    observations.push(observation);
                }
                step.observations = observations;
            }

            steps.push(step);
        }

        // Out of turns. The freshest observation is usually a usable reading,
        // so prefer surfacing it over a bare error.
        let mut response = AgentResponse::failure(
            format!("reached maximum iterations ({})", self.max_iterations),
            steps,
        );
        if let Some(observation) = response
            .steps
            .iter()
            .rev()
            .find_map(|s| s.observations.last().cloned())
        {
            response.answer = observation;
        }
        Ok(response)
    }
}

const NEXT_TAGS: [&str; 10] = [
    "[THOUGHT]",
    "[ACTION]",
    "[ANSWER]",
    "[OBSERVATION]",
    "THOUGHT:",
    "ACTION:",
    "ANSWER:",
    "**THOUGHT**",
    "**ACTION**",
    "**ANSWER**",
];

/// Parse one model reply into a step.
fn parse_advisor_reply(response: &str) -> AdvisorStep {
    // The model must never speak for its tools. Cut everything from the
    // first simulated [OBSERVATION] onward.
    let clean = match response.to_ascii_uppercase().find("[OBSERVATION]") {
        Some(idx) => {
            warn!("hallucinated [OBSERVATION] detected, truncating reply");
            &response[..idx]
        }
        None => response,
    };

    let thought =
        extract_tag(clean, "[THOUGHT]").unwrap_or_else(|| "Consulting the chart...".to_string());

    let mut tool_calls = Vec::new();
    for action_text in extract_all_tags(clean, "[ACTION]") {
        if let Some(call) = parse_json_tool_call(&action_text) {
            tool_calls.push(call);
        }
    }

    // Small models sometimes emit the JSON without the tag.
    if tool_calls.is_empty() {
        if let Some(call) = find_raw_json_tool_call(clean) {
            warn!("found raw JSON tool call without [ACTION] tag");
            tool_calls.push(call);
        }
    }

    if !tool_calls.is_empty() {
        return AdvisorStep::thought(thought).with_actions(tool_calls);
    }

    if let Some(answer) = extract_tag(clean, "[ANSWER]") {
        return AdvisorStep::final_answer(thought, answer);
    }

    let trimmed = clean.trim();
    if !trimmed.is_empty() {
        return AdvisorStep::final_answer(thought, trimmed);
    }

    // Reply was nothing but a hallucinated observation. Ask again.
    AdvisorStep::thought(
        "The previous reply contained only a simulated observation. Provide your reasoning and \
         next action or final answer using the specified tags.",
    )
}

/// Tolerant tag search: [TAG], TAG:, **TAG**: and friends.
fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let tag_name = tag.trim_matches(|c| c == '[' || c == ']').to_ascii_uppercase();
    let patterns = [
        format!("[{}]", tag_name),
        format!("[{}]:", tag_name),
        format!("{}:", tag_name),
        format!("**{}**:", tag_name),
        format!("**{}**", tag_name),
        format!("### {}", tag_name),
    ];

    // ASCII-only uppercasing keeps byte offsets aligned with the source text.
    let text_upper = text.to_ascii_uppercase();

    for pattern in patterns {
        if let Some(start_idx) = text_upper.find(&pattern) {
            let start = start_idx + pattern.len();
            let end = end_of_section(&text_upper, start, text.len());
            let result = text[start..end].trim().trim_start_matches(':').trim().to_string();
            if !result.is_empty() {
                return Some(result);
            }
        }
    }
    None
}

fn extract_all_tags(text: &str, tag: &str) -> Vec<String> {
    let tag_name = tag.trim_matches(|c| c == '[' || c == ']').to_ascii_uppercase();
    let patterns = [
        format!("[{}]", tag_name),
        format!("{}:", tag_name),
        format!("**{}**:", tag_name),
    ];
    let text_upper = text.to_ascii_uppercase();
    let mut results = Vec::new();

    for pattern in patterns {
        let mut pos = 0;
        while let Some(start_idx) = text_upper[pos..].find(&pattern) {
            let start = pos + start_idx + pattern.len();
            let end = end_of_section(&text_upper, start, text.len());
            let result = text[start..end].trim().trim_start_matches(':').trim().to_string();
            if !result.is_empty() {
                results.push(result);
            }
            pos = end;
            if pos >= text.len() {
                break;
            }
        }
        // First matching pattern wins.
        if !results.is_empty() {
            break;
        }
    }
    results
}

fn end_of_section(text_upper: &str, start: usize, text_len: usize) -> usize {
    let mut end = text_len;
    for t in NEXT_TAGS {
        if let Some(next_idx) = text_upper[start..].find(t) {
            let abs = start + next_idx;
            if abs < end {
                end = abs;
            }
        }
    }
    end
}

fn find_raw_json_tool_call(text: &str) -> Option<ToolCall> {
    let markers = ["ACTION:", "Action:", "Call tool:", "Execute:"];
    for marker in markers {
        if let Some(start_idx) = text.find(marker) {
            if let Some(call) = parse_json_tool_call(&text[start_idx..]) {
                return Some(call);
            }
        }
    }
    parse_json_tool_call(text)
}

fn parse_json_tool_call(text: &str) -> Option<ToolCall> {
    let json_start = text.find('{')?;
    let json_text = &text[json_start..];

    // Match the closing brace by depth, tracking byte offsets.
    let mut depth = 0;
    let mut json_end = 0;
    for (i, c) in json_text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    json_end = i + c.len_utf8();
                    break;
                }
            }
            _ => {}
        }
    }
    if json_end == 0 {
        return None;
    }

    match serde_json::from_str::<ToolCall>(&json_text[..json_end]) {
        Ok(call) if !call.name.is_empty() => Some(call),
        _ => None,
    }
}
