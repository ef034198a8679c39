//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供推理循环决定重试、继续还是终止。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous output was not valid JSON: {raw}. \
                 To call a tool, output ONLY one JSON object of the form \
                 {{\"tool\": \"<tool name>\", \"args\": {{...}}}}. \
                 To answer the user, reply with plain text and no JSON."
            )),
            AgentError::ToolExecutionFailed(msg) => RecoveryAction::Observe(format!("Error: {msg}")),
            AgentError::ToolTimeout(tool) => {
                RecoveryAction::Observe(format!("Error: tool {tool} timed out"))
            }
            AgentError::LlmError(_)
            | AgentError::HallucinatedTool(_)
            | AgentError::MaxStepsExceeded(_) => RecoveryAction::Abort,
        }
    }
}
