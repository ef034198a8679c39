//! 工具增强的推理循环
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到模型直接回复或超过最大步数。
//! 对话历史保存在 CheckpointStore 中，以 (会话键, 线程 id) 定位；
//! 一次调用在历史副本上推进，只有成功时才写回，失败的请求不会污染线程。

use std::sync::Arc;
use std::time::Duration;

use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::{parse_llm_output, CheckpointStore, Planner, PlannerOutput};
use crate::tools::{tool_call_schema_json, ToolExecutor, ToolSet};

/// 单次调用默认最大推理步数
pub const DEFAULT_MAX_STEPS: usize = 12;
/// 默认工具超时
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

const BASE_PROMPT: &str = "\
You are a personal productivity assistant with access to the user's work tools.\n\
Call a tool when you need data you do not have; otherwise answer in plain text.\n\
To call a tool, output ONLY one JSON object: {\"tool\": \"<tool name>\", \"args\": {...}}.";

/// 绑定到一组工具与一个模型的推理循环
pub struct ReasoningLoop {
    planner: Planner,
    executor: ToolExecutor,
    recovery: RecoveryEngine,
    checkpoints: Arc<CheckpointStore>,
    session_key: String,
    max_steps: usize,
}

impl ReasoningLoop {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolSet,
        checkpoints: Arc<CheckpointStore>,
        session_key: impl Into<String>,
    ) -> Self {
        let system_prompt = build_system_prompt(&tools);
        Self {
            planner: Planner::new(llm, system_prompt),
            executor: ToolExecutor::new(tools, DEFAULT_TOOL_TIMEOUT),
            recovery: RecoveryEngine::new(),
            checkpoints,
            session_key: session_key.into(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.executor = ToolExecutor::new(self.executor.tools().clone(), timeout);
        self
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tools().names()
    }

    /// 在指定线程上回答一条查询，返回最后一条回复文本
    pub async fn invoke(&self, query: &str, thread_id: &str) -> Result<String, AgentError> {
        let thread = self.checkpoints.thread(&self.session_key, thread_id);
        let mut committed = thread.lock().await;
        let mut conversation = committed.clone();
        conversation.push(Message::user(query));

        for step in 0..self.max_steps {
            tracing::debug!(session = %self.session_key, thread = thread_id, step, "reasoning step");
            let output = match self.planner.plan(conversation.messages()).await {
                Ok(o) => o,
                Err(e) => {
                    tracing::warn!(session = %self.session_key, error = %e, "planner failed");
                    return Err(e);
                }
            };

            match parse_llm_output(&output) {
                Ok(PlannerOutput::Response(answer)) => {
                    conversation.push(Message::assistant(answer.clone()));
                    *committed = conversation;
                    let (_, _, total_tokens) = self.planner.token_usage();
                    tracing::info!(
                        session = %self.session_key,
                        thread = thread_id,
                        steps = step + 1,
                        total_tokens,
                        "query answered"
                    );
                    return Ok(answer);
                }
                Ok(PlannerOutput::ToolCall(tc)) => {
                    let observation = match self.executor.execute(&tc.tool, tc.args).await {
                        Ok(content) => content,
                        Err(e) => match self.recovery.handle(&e) {
                            RecoveryAction::Observe(msg) => msg,
                            _ => return Err(e),
                        },
                    };
                    conversation.push(Message::assistant(output.trim()));
                    conversation.push(Message::user(format!(
                        "Observation from {}: {}",
                        tc.tool, observation
                    )));
                }
                Err(e) => match self.recovery.handle(&e) {
                    RecoveryAction::RetryWithPrompt(prompt) => {
                        tracing::debug!(session = %self.session_key, "malformed tool call, asking for retry");
                        conversation.push(Message::assistant(output.trim()));
                        conversation.push(Message::user(prompt));
                    }
                    _ => return Err(e),
                },
            }
        }

        tracing::warn!(session = %self.session_key, max_steps = self.max_steps, "reasoning loop exhausted its steps");
        Err(AgentError::MaxStepsExceeded(self.max_steps))
    }
}

fn build_system_prompt(tools: &ToolSet) -> String {
    let listing = tools
        .descriptions()
        .into_iter()
        .map(|(name, desc)| format!("- {}: {}", name, desc))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\n\nAvailable tools:\n{}\n\nTool parameters:\n{}\n\nTool call format (JSON Schema):\n{}",
        BASE_PROMPT,
        listing,
        tools.to_schema_json(),
        tool_call_schema_json()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::sources::{ConnectorError, FailingConnector, FetchCriteria, SourceKind, StaticConnector};
    use crate::tools::{ConnectorTool, Tool};

    const MAIL_CALL: &str = r#"{"tool": "mail_search", "args": {"limit": 2}}"#;

    fn mail_tools() -> ToolSet {
        ToolSet::new(vec![Arc::new(ConnectorTool::new(
            Arc::new(StaticConnector::demo(SourceKind::Mail)),
            FetchCriteria::today(),
        )) as Arc<dyn Tool>])
    }

    fn reasoning_loop(llm: Arc<ScriptedLlmClient>, tools: ToolSet) -> ReasoningLoop {
        ReasoningLoop::new(llm, tools, Arc::new(CheckpointStore::new(20)), "test-model_mail")
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let llm = Arc::new(ScriptedLlmClient::new([MAIL_CALL, "You have two unread emails."]));
        let agent = reasoning_loop(llm.clone(), mail_tools());

        let answer = agent.invoke("show me my unread mail", "default").await.unwrap();
        assert_eq!(answer, "You have two unread emails.");

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0][0].content.contains("mail_search"));
        let observation = &requests[1].last().unwrap().content;
        assert!(observation.starts_with("Observation from mail_search"));
    }

    #[tokio::test]
    async fn test_hallucinated_tool_is_error() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"tool": "shell", "args": {"cmd": "ls"}}"#]));
        let agent = reasoning_loop(llm, mail_tools());
        let err = agent.invoke("list files", "default").await.unwrap_err();
        assert!(matches!(err, AgentError::HallucinatedTool(name) if name == "shell"));
    }

    #[tokio::test]
    async fn test_malformed_json_gets_retry_prompt() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "mail_search", "args": "#,
            "Nothing urgent in your inbox.",
        ]));
        let agent = reasoning_loop(llm.clone(), mail_tools());
        let answer = agent.invoke("anything urgent?", "default").await.unwrap();
        assert_eq!(answer, "Nothing urgent in your inbox.");
        let requests = llm.requests();
        let retry = &requests[1].last().unwrap().content;
        assert!(retry.contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_observation() {
        let tools = ToolSet::new(vec![Arc::new(ConnectorTool::new(
            Arc::new(FailingConnector::new(
                SourceKind::Mail,
                ConnectorError::Network("connection reset".into()),
            )),
            FetchCriteria::today(),
        )) as Arc<dyn Tool>]);
        let llm = Arc::new(ScriptedLlmClient::new([MAIL_CALL, "Mail is unavailable right now."]));
        let agent = reasoning_loop(llm.clone(), tools);

        let answer = agent.invoke("check mail", "default").await.unwrap();
        assert_eq!(answer, "Mail is unavailable right now.");
        let requests = llm.requests();
        let observation = &requests[1].last().unwrap().content;
        assert!(observation.contains("Error: "));
        assert!(observation.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_max_steps_exceeded() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()).with_default(MAIL_CALL));
        let agent = reasoning_loop(llm.clone(), mail_tools()).with_max_steps(3);
        let err = agent.invoke("loop forever", "default").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxStepsExceeded(3)));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates_and_leaves_thread_untouched() {
        let checkpoints = Arc::new(CheckpointStore::new(20));
        let llm = Arc::new(ScriptedLlmClient::new(["first answer"]).then_error("503 from provider"));
        let agent = ReasoningLoop::new(llm, mail_tools(), checkpoints.clone(), "m_mail");

        agent.invoke("first", "t1").await.unwrap();
        let err = agent.invoke("second", "t1").await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError(msg) if msg.contains("503")));
        assert_eq!(checkpoints.history("m_mail", "t1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_threads_keep_separate_history() {
        let checkpoints = Arc::new(CheckpointStore::new(20));
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()).with_default("ok"));
        let agent = ReasoningLoop::new(llm.clone(), mail_tools(), checkpoints.clone(), "m_mail");

        agent.invoke("one", "a").await.unwrap();
        agent.invoke("two", "a").await.unwrap();
        agent.invoke("three", "b").await.unwrap();

        assert_eq!(checkpoints.history("m_mail", "a").await.len(), 4);
        assert_eq!(checkpoints.history("m_mail", "b").await.len(), 2);
        // system + 2 turns of history + new query
        assert_eq!(llm.requests()[1].len(), 4);
    }
}
