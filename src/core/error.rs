//! 错误类型与恢复动作
//!
//! 采集与汇总路径上的 Connector / Oracle 错误会在各自边界降级为带错误文本的结果；
//! 只有 Configuration 与 Agent 错误会从 route_query 返回给调用方。

use thiserror::Error;

use crate::oracle::OracleError;
use crate::sources::ConnectorError;
use crate::workflow::WorkflowError;

/// 顶层错误
#[derive(Error, Debug)]
pub enum BriefingError {
    #[error("Connector failure: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Oracle failure: {0}")]
    Oracle(#[from] OracleError),

    /// 请求的类别组合没有任何可用工具等
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

/// 推理循环运行过程中的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Max reasoning steps exceeded ({0})")]
    MaxStepsExceeded(usize),
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将提示注入下一轮，让 LLM 重试（如 JSON 格式错误）
    RetryWithPrompt(String),
    /// 把错误作为 Observation 写回对话，继续推理
    Observe(String),
    /// 终止当前请求，错误返回调用方
    Abort,
}
