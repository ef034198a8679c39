//! 采集 Agent：一个来源的「拉取 + 摘要」单元
//!
//! run 永远返回完整的 SourceResult：
//! - 拉取为空时直接给出固定摘要，不调用 Oracle
//! - 拉取、摘要中的任何错误（包括 panic）都降级为带错误文本、记录为空的结果

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::core::BriefingError;
use crate::oracle::Oracle;
use crate::sources::{FetchCriteria, Record, SourceConnector, SourceKind};

/// 结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Summarized,
    Empty,
    Failed,
}

/// 单个来源的采集结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceResult {
    pub kind: SourceKind,
    pub summary: String,
    pub records: Vec<Record>,
    pub status: ResultStatus,
}

impl SourceResult {
    pub fn summarized(kind: SourceKind, summary: String, records: Vec<Record>) -> Self {
        Self {
            kind,
            summary,
            records,
            status: ResultStatus::Summarized,
        }
    }

    pub fn empty(kind: SourceKind) -> Self {
        Self {
            kind,
            summary: kind.empty_summary().to_string(),
            records: Vec::new(),
            status: ResultStatus::Empty,
        }
    }

    pub fn failed(kind: SourceKind, error: impl std::fmt::Display) -> Self {
        Self {
            kind,
            summary: kind.error_summary(error),
            records: Vec::new(),
            status: ResultStatus::Failed,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ResultStatus::Failed
    }
}

/// 采集 Agent
#[derive(Clone)]
pub struct CollectorAgent {
    kind: SourceKind,
    connector: Arc<dyn SourceConnector>,
    oracle: Arc<dyn Oracle>,
    criteria: Vec<FetchCriteria>,
}

impl CollectorAgent {
    pub fn new(
        connector: Arc<dyn SourceConnector>,
        oracle: Arc<dyn Oracle>,
        criteria: Vec<FetchCriteria>,
    ) -> Self {
        Self {
            kind: connector.kind(),
            connector,
            oracle,
            criteria,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// 执行采集；错误在此边界内全部吸收
    pub async fn run(&self) -> SourceResult {
        let kind = self.kind;
        let this = self.clone();
        match tokio::spawn(async move { this.collect().await }).await {
            Ok(Ok(result)) => {
                tracing::info!(source = %kind, records = result.records.len(), status = ?result.status, "collector finished");
                result
            }
            Ok(Err(e)) => {
                tracing::warn!(source = %kind, error = %e, "collector degraded to error result");
                SourceResult::failed(kind, e)
            }
            Err(join_err) => {
                tracing::error!(source = %kind, error = %join_err, "collector task aborted");
                SourceResult::failed(kind, format!("collector task aborted: {}", join_err))
            }
        }
    }

    async fn collect(&self) -> Result<SourceResult, BriefingError> {
        let mut records = Vec::new();
        for criteria in &self.criteria {
            records.extend(self.connector.fetch(criteria).await?);
        }
        let records = dedup_by_id(records);

        if records.is_empty() {
            return Ok(SourceResult::empty(self.kind));
        }

        let summary = self.oracle.summarize(self.kind, &records).await?;
        Ok(SourceResult::summarized(self.kind, summary, records))
    }
}

/// 按 id 去重，保留首次出现的顺序
fn dedup_by_id(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleError, SourceSummaries};
    use crate::sources::{ConnectorError, FailingConnector, FetchScope, StaticConnector};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingOracle {
        summarize_calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Oracle for CountingOracle {
        async fn summarize(&self, kind: SourceKind, records: &[Record]) -> Result<String, OracleError> {
            self.summarize_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(OracleError::Llm("quota".to_string()));
            }
            Ok(format!("{} summary of {}", kind, records.len()))
        }

        async fn synthesize(&self, _summaries: &SourceSummaries) -> Result<String, OracleError> {
            unreachable!("collectors never synthesize")
        }

        async fn select_categories(&self, _q: &str, _c: &[SourceKind]) -> Result<String, OracleError> {
            unreachable!("collectors never select")
        }
    }

    #[tokio::test]
    async fn test_failing_connector_yields_error_result_for_every_kind() {
        for kind in SourceKind::ALL {
            let oracle = Arc::new(CountingOracle::default());
            let agent = CollectorAgent::new(
                Arc::new(FailingConnector::new(kind, ConnectorError::Network("unreachable".into()))),
                oracle.clone(),
                vec![FetchCriteria::today()],
            );
            let result = agent.run().await;
            assert!(result.is_failed());
            assert!(result.records.is_empty());
            assert!(result.summary.contains("Error"));
            assert!(result.summary.contains("unreachable"));
            assert_eq!(oracle.summarize_calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_zero_records_skips_oracle() {
        let oracle = Arc::new(CountingOracle::default());
        let agent = CollectorAgent::new(
            Arc::new(StaticConnector::new(SourceKind::Mail, vec![])),
            oracle.clone(),
            vec![FetchCriteria::today()],
        );
        let result = agent.run().await;
        assert_eq!(result.summary, "No recent emails found.");
        assert_eq!(result.status, ResultStatus::Empty);
        assert_eq!(oracle.summarize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oracle_failure_degrades() {
        let oracle = Arc::new(CountingOracle {
            fail: true,
            ..Default::default()
        });
        let agent = CollectorAgent::new(
            Arc::new(StaticConnector::demo(SourceKind::Calendar)),
            oracle.clone(),
            vec![FetchCriteria::new(FetchScope::Upcoming { days: 2 })],
        );
        let result = agent.run().await;
        assert!(result.is_failed());
        assert!(result.summary.starts_with("Error in calendar collector"));
        assert_eq!(oracle.summarize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multiple_queries_are_deduplicated() {
        let oracle = Arc::new(CountingOracle::default());
        let connector = Arc::new(StaticConnector::demo(SourceKind::Issues));
        let agent = CollectorAgent::new(
            connector.clone(),
            oracle.clone(),
            vec![
                FetchCriteria::new(FetchScope::Assigned { days: 7 }),
                FetchCriteria::new(FetchScope::Updated { days: 7 }),
            ],
        );
        let result = agent.run().await;
        assert_eq!(connector.call_count(), 2);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.summary, "issues summary of 3");
        assert_eq!(oracle.summarize_calls.load(Ordering::SeqCst), 1);
    }
}
