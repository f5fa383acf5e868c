use async_trait::async_trait;

use super::{Tool, ToolContext, ToolOutput};
use crate::agent::{AgentError, AgentResult};

/// Lets the advisor hand a question back to the person at the keyboard.
pub struct HumanInputTool;

#[async_trait]
impl Tool for HumanInputTool {
    fn name(&self) -> String {
        "human".to_string()
    }

    fn description(&self) -> String {
        "You can ask a human for guidance when you think you got stuck or you are not sure \
         what to do next. The input should be a question for the human."
            .to_string()
    }

    async fn invoke(&self, input: &str, ctx: &ToolContext) -> AgentResult<ToolOutput> {
        let reply = ctx
            .transport
            .ask_user(input)
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;
        Ok(ToolOutput::success_str(reply))
    }
}
