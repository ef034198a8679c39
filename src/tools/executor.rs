//! 工具执行器
//!
//! 持有绑定的 ToolSet 与超时，execute(tool_name, args) 在超时内调用工具，
//! 未绑定的工具返回 HallucinatedTool，超时或失败转为 ToolTimeout / ToolExecutionFailed；
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::ToolSet;

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    tools: ToolSet,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(tools: ToolSet, timeout: Duration) -> Self {
        Self { tools, timeout }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// 执行指定工具并输出 JSON 审计日志
    pub async fn execute(&self, tool_name: &str, args: serde_json::Value) -> Result<String, AgentError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| AgentError::HallucinatedTool(tool_name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, tool.execute(args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e)),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn execute(&self, args: Value) -> Result<String, String> {
            if args.get("fail").is_some() {
                return Err("backend unavailable".to_string());
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("done".to_string())
        }
    }

    fn executor(timeout_ms: u64) -> ToolExecutor {
        ToolExecutor::new(
            ToolSet::new(vec![Arc::new(SlowTool) as Arc<dyn Tool>]),
            Duration::from_millis(timeout_ms),
        )
    }

    #[tokio::test]
    async fn test_unbound_tool_is_hallucinated() {
        let err = executor(500).execute("shell", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::HallucinatedTool(name) if name == "shell"));
    }

    #[tokio::test]
    async fn test_timeout_and_failure_mapping() {
        let err = executor(20).execute("slow", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(_)));

        let err = executor(500).execute("slow", json!({"fail": true})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecutionFailed(msg) if msg == "backend unavailable"));

        assert_eq!(executor(500).execute("slow", json!({})).await.unwrap(), "done");
    }
}
