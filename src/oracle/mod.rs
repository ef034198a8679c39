//! Oracle：把 LLM 当作黑盒的摘要器 / 汇总器 / 分类器
//!
//! 每个来源一次 summarize，汇总一次 synthesize，工具选择一次 select_categories。
//! LlmOracle 基于任意 LlmClient 拼 prompt 实现。

mod prompts;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LlmClient;
use crate::memory::Message;
use crate::sources::{Record, SourceKind};

/// Oracle 调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,
}

/// 汇总输入：每个来源一段摘要（BTreeMap 保证按来源固定顺序）
pub type SourceSummaries = BTreeMap<SourceKind, String>;

/// 文本生成 Oracle
#[async_trait]
pub trait Oracle: Send + Sync {
    /// 对一个来源的整批记录生成摘要
    async fn summarize(&self, kind: SourceKind, records: &[Record]) -> Result<String, OracleError>;

    /// 跨来源汇总成一份简报
    async fn synthesize(&self, summaries: &SourceSummaries) -> Result<String, OracleError>;

    /// 返回与查询相关的类别名（逗号分隔的原始文本，由调用方解析）
    async fn select_categories(
        &self,
        query: &str,
        categories: &[SourceKind],
    ) -> Result<String, OracleError>;
}

/// 基于 LlmClient 的 Oracle
pub struct LlmOracle {
    llm: Arc<dyn LlmClient>,
}

impl LlmOracle {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn ask(&self, system: String, user: String) -> Result<String, OracleError> {
        let messages = vec![Message::system(system), Message::user(user)];
        self.llm
            .complete(&messages)
            .await
            .map_err(OracleError::Llm)
    }

    async fn ask_non_empty(&self, system: String, user: String) -> Result<String, OracleError> {
        let text = self.ask(system, user).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn summarize(&self, kind: SourceKind, records: &[Record]) -> Result<String, OracleError> {
        let batch = records
            .iter()
            .map(Record::render)
            .collect::<Vec<_>>()
            .join("\n");
        self.ask_non_empty(
            prompts::summary_prompt(kind).to_string(),
            format!("{} items:\n\n{}", kind, batch),
        )
        .await
    }

    async fn synthesize(&self, summaries: &SourceSummaries) -> Result<String, OracleError> {
        let sections = summaries
            .iter()
            .map(|(kind, summary)| format!("## {} summary:\n{}", prompts::section_title(*kind), summary))
            .collect::<Vec<_>>()
            .join("\n\n");
        self.ask_non_empty(prompts::SYNTHESIS_PROMPT.to_string(), sections)
            .await
    }

    async fn select_categories(
        &self,
        query: &str,
        categories: &[SourceKind],
    ) -> Result<String, OracleError> {
        let text = self
            .ask(prompts::selector_prompt(categories), format!("User query: \"{}\"", query))
            .await?;
        Ok(text.trim().to_string())
    }
}
