//! Mock / Scripted LLM 客户端（无需 API）
//!
//! MockLlmClient 回显最后一条 User 消息，便于在没有 API Key 时跑通整个流程；
//! ScriptedLlmClient 按顺序返回预设回复并记录每次请求，供测试断言调用次数与 prompt。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// 回显预览的最大字符数
const ECHO_PREVIEW_CHARS: usize = 160;

/// Mock 客户端：回显用户最后一条消息（作为最终回复，不产生 Tool Call）
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.trim())
            .unwrap_or("(no input)");
        let preview: String = last_user.chars().take(ECHO_PREVIEW_CHARS).collect();
        Ok(format!("[mock] {}", preview))
    }
}

/// 脚本化客户端：依次弹出预设回复；脚本耗尽后返回 default（未设置则报错）
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    default: Option<String>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(replies.into_iter().map(|s| Ok(s.into())).collect()),
            default: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 追加一次失败回复
    pub fn then_error(self, error: impl Into<String>) -> Self {
        self.lock_script().push_back(Err(error.into()));
        self
    }

    /// 脚本耗尽后的固定回复
    pub fn with_default(mut self, reply: impl Into<String>) -> Self {
        self.default = Some(reply.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// 所有请求（按调用顺序）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.lock_requests().clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<Vec<Message>>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.lock_requests().push(messages.to_vec());
        let next = self.lock_script().pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .default
                .clone()
                .ok_or_else(|| "Scripted LLM has no more replies".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_last_user_message() {
        let out = MockLlmClient
            .complete(&[Message::system("sys"), Message::user("hello")])
            .await
            .unwrap();
        assert_eq!(out, "[mock] hello");
    }

    #[tokio::test]
    async fn test_scripted_replays_in_order_then_default() {
        let llm = ScriptedLlmClient::new(["one"]).then_error("boom").with_default("rest");
        assert_eq!(llm.complete(&[]).await.unwrap(), "one");
        assert_eq!(llm.complete(&[]).await.unwrap_err(), "boom");
        assert_eq!(llm.complete(&[]).await.unwrap(), "rest");
        assert_eq!(llm.call_count(), 3);
    }
}
