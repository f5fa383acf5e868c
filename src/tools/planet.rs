//! One advisory tool per planet. Each reads the session's chart and turns
//! the body's placement into advice for the user's situation, optionally
//! refined through a single LLM completion.

use async_trait::async_trait;
use tracing::warn;

use super::{Tool, ToolContext, ToolOutput};
use crate::agent::AgentResult;
use crate::session::Message;

pub struct PlanetTool {
    name: String,
    description: String,
}

impl PlanetTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    fn advice_for(&self, ctx: &ToolContext, user_situation: &str) -> Option<String> {
        let chart = ctx.chart.as_ref()?;
        let advice = match chart.position_named(&self.name) {
            Some(position) => format!(
                "Given {}'s position in {} in your birth chart and considering {}, ...",
                self.name, position.sign, user_situation
            ),
            None => format!(
                "{} is not prominent in your chart. However, {}...",
                self.name, user_situation
            ),
        };
        Some(advice)
    }
}

#[async_trait]
impl Tool for PlanetTool {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    async fn invoke(&self, input: &str, ctx: &ToolContext) -> AgentResult<ToolOutput> {
        let advice = match self.advice_for(ctx, input) {
            Some(advice) => advice,
            None => {
                return Ok(ToolOutput::failure(format!(
                    "no birth chart available for {} to read",
                    self.name
                )))
            }
        };

        // Refinement is best effort. A provider outage degrades the answer,
        // it must not sink the whole advisor turn.
        if let Some(refiner) = &ctx.refiner {
            let prompt = format!("{} analyzes: {}", self.name, advice);
            let messages = vec![Message::user(prompt)];
            match refiner.chat(&ctx.model, &messages, &ctx.sampling).await {
                Ok(refined) => {
                    return Ok(ToolOutput::success_str(format!(
                        "{} says: {}",
                        self.name, refined
                    )))
                }
                Err(e) => warn!(planet = %self.name, error = %e, "advice refinement failed"),
            }
        }

        Ok(ToolOutput::success_str(advice))
    }
}

/// The nine advisory planets. Sun and Moon stay out of the tool set, they
/// answer in the roundtable instead.
pub fn builtin_planet_tools() -> Vec<PlanetTool> {
    vec![
        PlanetTool::new(
            "Mercury",
            "Mercury deals with communication, reasoning, and intellect.",
        ),
        PlanetTool::new("Venus", "Venus deals with love, beauty, and harmony."),
        PlanetTool::new(
            "Earth",
            "Earth deals with grounding, stability, and the material world.",
        ),
        PlanetTool::new("Mars", "Mars deals with drive, courage, and raw energy."),
        PlanetTool::new("Jupiter", "Jupiter deals with growth, luck, and expansion."),
        PlanetTool::new(
            "Saturn",
            "Saturn deals with discipline, structure, and long lessons.",
        ),
        PlanetTool::new(
            "Uranus",
            "Uranus deals with upheaval, invention, and sudden change.",
        ),
        PlanetTool::new(
            "Neptune",
            "Neptune deals with dreams, intuition, and illusion.",
        ),
        PlanetTool::new(
            "Pluto",
            "Pluto deals with transformation, power, and rebirth.",
        ),
    ]
}
