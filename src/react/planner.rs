//! Planner：调用 LLM 并解析 Tool Call
//!
//! parse_llm_output 从文本中提取 JSON 并解析为 ToolCall 或直接回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;

/// LLM 返回的 Tool Call（{"tool": "mail_search", "args": {"limit": 5}}）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Planner 输出
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 直接回复用户
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 解析 LLM 输出：含 JSON 且带非空 tool 字段则为 ToolCall，否则为 Response；JSON 无效返回 JsonParseError
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + "```json".len()..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else if trimmed.starts_with('{') {
        match trimmed.rfind('}') {
            Some(end) => &trimmed[..=end],
            None => trimmed,
        }
    } else {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    };

    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, json_str)))?;

    // 没有 tool 字段的 JSON 是回复里的数据块，不是工具调用
    if value.get("tool").is_none() {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    }

    let parsed: ToolCall = serde_json::from_value(value)
        .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, json_str)))?;

    if parsed.tool.is_empty() {
        Ok(PlannerOutput::Response(trimmed.to_string()))
    } else {
        Ok(PlannerOutput::ToolCall(parsed))
    }
}

/// Planner：持有 LLM 与 system prompt
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// system + 对话历史 -> LLM
    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        let mut full_messages = Vec::with_capacity(messages.len() + 1);
        full_messages.push(Message::system(self.system_prompt.clone()));
        full_messages.extend_from_slice(messages);
        self.llm
            .complete(&full_messages)
            .await
            .map_err(AgentError::LlmError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_response() {
        let out = parse_llm_output("  You have two meetings today. ").unwrap();
        assert_eq!(out, PlannerOutput::Response("You have two meetings today.".into()));
    }

    #[test]
    fn test_tool_call_in_fenced_block() {
        let out = parse_llm_output("```json\n{\"tool\": \"mail_search\", \"args\": {\"limit\": 5}}\n```").unwrap();
        match out {
            PlannerOutput::ToolCall(tc) => {
                assert_eq!(tc.tool, "mail_search");
                assert_eq!(tc.args["limit"], 5);
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_tool_call_without_args() {
        let out = parse_llm_output("{\"tool\": \"issues_search\"}").unwrap();
        assert!(matches!(out, PlannerOutput::ToolCall(tc) if tc.tool == "issues_search"));
    }

    #[test]
    fn test_json_data_block_without_tool_is_response() {
        let answer = "Here are your tickets:\n```json\n[{\"key\": \"PROJ-1\"}]\n```";
        let out = parse_llm_output(answer).unwrap();
        assert_eq!(out, PlannerOutput::Response(answer.to_string()));

        let object = "{\"key\": \"PROJ-1\", \"status\": \"blocked\"}";
        assert_eq!(
            parse_llm_output(object).unwrap(),
            PlannerOutput::Response(object.to_string())
        );
    }

    #[test]
    fn test_tool_key_with_wrong_type_is_parse_error() {
        let err = parse_llm_output("{\"tool\": 42}").unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
    }

    #[tokio::test]
    async fn test_planner_reports_client_token_usage() {
        struct MeteredLlm;

        #[async_trait::async_trait]
        impl LlmClient for MeteredLlm {
            async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
                Ok("ok".into())
            }

            fn token_usage(&self) -> (u64, u64, u64) {
                (12, 3, 15)
            }
        }

        let planner = Planner::new(Arc::new(MeteredLlm), "system");
        assert_eq!(planner.plan(&[Message::user("hi")]).await.unwrap(), "ok");
        assert_eq!(planner.token_usage(), (12, 3, 15));
    }

    #[test]
    fn test_broken_json_is_parse_error() {
        let err = parse_llm_output("{\"tool\": \"mail_search\", \"args\": ").unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
    }
}
