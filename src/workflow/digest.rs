//! 每日简报工作流
//!
//! 固定拓扑：START -> 4 个采集节点（并发）-> synthesis -> END。
//! 每个采集节点只写自己的来源槽位；synthesis 在全部采集节点结束后执行一次。
//! 整个 run 不返回错误：采集与汇总失败都降级为带错误文本的字段。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collector::{CollectorAgent, SourceResult};
use crate::oracle::{Oracle, SourceSummaries};
use crate::sources::SourceKind;
use crate::workflow::builder::WorkflowBuilder;
use crate::workflow::types::*;

/// 汇总节点 id
pub const SYNTHESIS_NODE: &str = "synthesis";

/// 采集节点 id，如 `mail_collector`
pub fn collector_node_id(kind: SourceKind) -> NodeId {
    format!("{}_collector", kind)
}

/// 工作流共享状态
#[derive(Debug, Clone, Default)]
pub struct DigestState {
    /// 来源槽位；未写入的来源不在表中
    pub sources: BTreeMap<SourceKind, SourceResult>,
    pub synthesis: Option<String>,
    pub error: Option<String>,
}

/// 节点对状态的更新
#[derive(Debug)]
pub enum DigestUpdate {
    Source(SourceResult),
    Synthesis(String),
    SynthesisFailed(String),
}

impl WorkflowState for DigestState {
    type Update = DigestUpdate;

    fn apply(&mut self, update: DigestUpdate) {
        match update {
            DigestUpdate::Source(result) => {
                let kind = result.kind;
                if self.sources.contains_key(&kind) {
                    tracing::warn!(source = %kind, "source slot already written, ignoring update");
                    return;
                }
                self.sources.insert(kind, result);
            }
            DigestUpdate::Synthesis(text) => {
                if self.synthesis.is_none() {
                    self.synthesis = Some(text);
                }
            }
            DigestUpdate::SynthesisFailed(error) => {
                if self.error.is_none() {
                    self.error = Some(error);
                }
            }
        }
    }
}

impl DigestState {
    /// 某来源的摘要；槽位为空时给出占位文本
    pub fn summary_for(&self, kind: SourceKind) -> String {
        self.sources
            .get(&kind)
            .map(|r| r.summary.clone())
            .unwrap_or_else(|| kind.placeholder_summary())
    }

    /// 汇总输入：四个来源各一段
    pub fn summaries(&self) -> SourceSummaries {
        SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.summary_for(kind)))
            .collect()
    }
}

struct CollectorNode {
    agent: CollectorAgent,
}

#[async_trait]
impl Node<DigestState> for CollectorNode {
    async fn run(&self, _state: DigestState) -> DigestUpdate {
        DigestUpdate::Source(self.agent.run().await)
    }
}

struct SynthesisNode {
    oracle: Arc<dyn Oracle>,
}

#[async_trait]
impl Node<DigestState> for SynthesisNode {
    async fn run(&self, state: DigestState) -> DigestUpdate {
        let summaries = state.summaries();
        let oracle = self.oracle.clone();
        match tokio::spawn(async move { oracle.synthesize(&summaries).await }).await {
            Ok(Ok(text)) => DigestUpdate::Synthesis(text),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "synthesis failed");
                DigestUpdate::SynthesisFailed(format!("Error in synthesis: {}", e))
            }
            Err(e) => {
                tracing::error!(error = %e, "synthesis task aborted");
                DigestUpdate::SynthesisFailed(format!("Error in synthesis: {}", e))
            }
        }
    }
}

/// 待办事项（从汇总文本末尾的 json 代码块解析）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time: String,
}

/// 从文本中提取第一个 ```json 代码块并解析为待办列表；缺失或无效时为空
pub fn parse_todo_list(text: &str) -> Vec<TodoItem> {
    let Some(start) = text.find("```json") else {
        return Vec::new();
    };
    let body = &text[start + "```json".len()..];
    let Some(end) = body.find("```") else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<TodoItem>>(body[..end].trim()) {
        Ok(items) => items,
        Err(e) => {
            tracing::debug!(error = %e, "todo block is not a valid item list");
            Vec::new()
        }
    }
}

/// 一次工作流的扁平输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub mail_summary: String,
    pub calendar_summary: String,
    pub chat_summary: String,
    pub issues_summary: String,
    pub synthesis: Option<String>,
    pub todo_list: Vec<TodoItem>,
    /// 仅在汇总本身失败时出现
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Digest {
    pub fn from_state(state: &DigestState) -> Self {
        let todo_list = state
            .synthesis
            .as_deref()
            .map(parse_todo_list)
            .unwrap_or_default();
        Self {
            mail_summary: state.summary_for(SourceKind::Mail),
            calendar_summary: state.summary_for(SourceKind::Calendar),
            chat_summary: state.summary_for(SourceKind::Chat),
            issues_summary: state.summary_for(SourceKind::Issues),
            synthesis: state.synthesis.clone(),
            todo_list,
            error: state.error.clone(),
        }
    }

    pub fn summary(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Mail => &self.mail_summary,
            SourceKind::Calendar => &self.calendar_summary,
            SourceKind::Chat => &self.chat_summary,
            SourceKind::Issues => &self.issues_summary,
        }
    }
}

/// 运行报告
#[derive(Debug, Clone, Serialize)]
pub struct DigestRun {
    pub id: WorkflowId,
    pub status: WorkflowStatus,
    pub digest: Digest,
    /// 节点完成顺序
    pub completed_nodes: Vec<NodeId>,
    pub generated_at: DateTime<Utc>,
}

/// 简报工作流：图在构造时校验一次，之后每次 run 复用
pub struct DigestWorkflow {
    workflow: Workflow<DigestState>,
}

impl DigestWorkflow {
    pub fn new(
        collectors: Vec<CollectorAgent>,
        oracle: Arc<dyn Oracle>,
    ) -> Result<Self, WorkflowError> {
        let branch_ids: Vec<NodeId> = collectors
            .iter()
            .map(|agent| collector_node_id(agent.kind()))
            .collect();

        let mut builder = WorkflowBuilder::new("daily-digest")
            .description("Collect every source concurrently, then synthesize one briefing");
        for (id, agent) in branch_ids.iter().zip(collectors) {
            builder = builder.node(id.clone(), Arc::new(CollectorNode { agent }));
        }

        let workflow = builder
            .node(SYNTHESIS_NODE, Arc::new(SynthesisNode { oracle }))
            .fan_out(START, &branch_ids)
            .fan_in(&branch_ids, SYNTHESIS_NODE)
            .edge(SYNTHESIS_NODE, END)
            .build()?;

        Ok(Self { workflow })
    }

    /// 执行一次；永远返回结构完整的 Digest
    pub async fn run(&self) -> DigestRun {
        let generated_at = Utc::now();
        match self.workflow.invoke(DigestState::default()).await {
            Ok(run) => DigestRun {
                id: run.id,
                status: run.status,
                digest: Digest::from_state(&run.state),
                completed_nodes: run.completed,
                generated_at,
            },
            Err(e) => {
                tracing::error!(error = %e, "digest workflow failed");
                let state = DigestState {
                    error: Some(format!("Error in digest workflow: {}", e)),
                    ..Default::default()
                };
                DigestRun {
                    id: format!("wf_{}", uuid::Uuid::new_v4()),
                    status: WorkflowStatus::Failed,
                    digest: Digest::from_state(&state),
                    completed_nodes: Vec::new(),
                    generated_at,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::sources::{ConnectorError, FailingConnector, FetchCriteria, Record, StaticConnector};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingOracle {
        synthesis_inputs: Mutex<Vec<SourceSummaries>>,
        fail_synthesis: bool,
    }

    impl RecordingOracle {
        fn synthesis_inputs(&self) -> Vec<SourceSummaries> {
            self.synthesis_inputs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Oracle for RecordingOracle {
        async fn summarize(&self, kind: SourceKind, records: &[Record]) -> Result<String, OracleError> {
            Ok(format!("{} summary of {} records", kind, records.len()))
        }

        async fn synthesize(&self, summaries: &SourceSummaries) -> Result<String, OracleError> {
            self.synthesis_inputs.lock().unwrap().push(summaries.clone());
            if self.fail_synthesis {
                return Err(OracleError::Llm("model overloaded".to_string()));
            }
            Ok(format!(
                "Briefing over {} sources\n```json\n[{{\"title\": \"Review PROJ-123\", \"time\": \"10:00\"}}]\n```",
                summaries.len()
            ))
        }

        async fn select_categories(&self, _q: &str, _c: &[SourceKind]) -> Result<String, OracleError> {
            Ok(String::new())
        }
    }

    fn collector(
        connector: Arc<dyn crate::sources::SourceConnector>,
        oracle: &Arc<RecordingOracle>,
    ) -> CollectorAgent {
        CollectorAgent::new(connector, oracle.clone(), vec![FetchCriteria::today()])
    }

    fn scenario(oracle: &Arc<RecordingOracle>) -> DigestWorkflow {
        let collectors = vec![
            collector(Arc::new(StaticConnector::new(SourceKind::Mail, vec![])), oracle),
            collector(Arc::new(StaticConnector::demo(SourceKind::Calendar)), oracle),
            collector(
                Arc::new(FailingConnector::new(
                    SourceKind::Chat,
                    ConnectorError::Auth("token revoked".into()),
                )),
                oracle,
            ),
            collector(Arc::new(StaticConnector::demo(SourceKind::Issues)), oracle),
        ];
        DigestWorkflow::new(collectors, oracle.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_mixed_sources_end_to_end() {
        let oracle = Arc::new(RecordingOracle::default());
        let run = scenario(&oracle).run().await;
        let digest = &run.digest;

        assert_eq!(digest.mail_summary, "No recent emails found.");
        assert_eq!(digest.calendar_summary, "calendar summary of 2 records");
        assert!(digest.chat_summary.starts_with("Error in chat collector"));
        assert!(digest.chat_summary.contains("token revoked"));
        assert_eq!(digest.issues_summary, "issues summary of 3 records");
        assert!(digest.error.is_none());
        assert_eq!(digest.todo_list.len(), 1);
        assert_eq!(digest.todo_list[0].title, "Review PROJ-123");

        let inputs = oracle.synthesis_inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0][&SourceKind::Chat], digest.chat_summary);
        assert_eq!(inputs[0][&SourceKind::Mail], "No recent emails found.");
    }

    #[tokio::test]
    async fn test_synthesis_runs_once_after_all_collectors() {
        let mut seen_inputs = Vec::new();
        for delays in [[40u64, 1, 20, 5], [1, 40, 5, 20], [10, 10, 10, 10]] {
            let oracle = Arc::new(RecordingOracle::default());
            let collectors = SourceKind::ALL
                .into_iter()
                .zip(delays)
                .map(|(kind, ms)| {
                    let connector = StaticConnector::demo(kind).with_delay(Duration::from_millis(ms));
                    collector(Arc::new(connector), &oracle)
                })
                .collect();
            let run = DigestWorkflow::new(collectors, oracle.clone()).unwrap().run().await;

            assert_eq!(run.status, WorkflowStatus::Completed);
            assert_eq!(run.completed_nodes.len(), 5);
            assert_eq!(run.completed_nodes.last().map(String::as_str), Some(SYNTHESIS_NODE));
            let inputs = oracle.synthesis_inputs();
            assert_eq!(inputs.len(), 1);
            seen_inputs.push(inputs[0].clone());
        }
        assert!(seen_inputs.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_two_runs_produce_identical_digest() {
        let oracle = Arc::new(RecordingOracle::default());
        let workflow = scenario(&oracle);
        let first = workflow.run().await;
        let second = workflow.run().await;
        assert_eq!(first.digest, second.digest);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_recorded() {
        let oracle = Arc::new(RecordingOracle {
            fail_synthesis: true,
            ..Default::default()
        });
        let run = scenario(&oracle).run().await;
        assert_eq!(run.status, WorkflowStatus::Completed);
        assert!(run.digest.synthesis.is_none());
        assert!(run.digest.todo_list.is_empty());
        let error = run.digest.error.as_deref().unwrap_or_default();
        assert!(error.starts_with("Error in synthesis"));
        assert!(error.contains("model overloaded"));
        assert_eq!(run.digest.calendar_summary, "calendar summary of 2 records");
    }

    #[tokio::test]
    async fn test_absent_slot_uses_placeholder() {
        let oracle = Arc::new(RecordingOracle::default());
        let workflow = DigestWorkflow::new(
            vec![collector(Arc::new(StaticConnector::demo(SourceKind::Mail)), &oracle)],
            oracle.clone(),
        )
        .unwrap();
        let run = workflow.run().await;
        assert_eq!(run.digest.chat_summary, "No chat data available.");
        assert_eq!(oracle.synthesis_inputs()[0][&SourceKind::Issues], "No issues data available.");
    }

    #[test]
    fn test_duplicate_collector_kind_rejected() {
        let oracle = Arc::new(RecordingOracle::default());
        let result = DigestWorkflow::new(
            vec![
                collector(Arc::new(StaticConnector::demo(SourceKind::Mail)), &oracle),
                collector(Arc::new(StaticConnector::demo(SourceKind::Mail)), &oracle),
            ],
            oracle.clone(),
        );
        assert!(matches!(result, Err(WorkflowError::DuplicateNode(_))));
    }

    #[test]
    fn test_parse_todo_list() {
        let text = "Summary\n```json\n[{\"title\": \"Reply to Bob\", \"description\": \"budget\", \"time\": \"EOD\"}]\n```\n";
        let items = parse_todo_list(text);
        assert_eq!(
            items,
            vec![TodoItem {
                title: "Reply to Bob".into(),
                description: "budget".into(),
                time: "EOD".into(),
            }]
        );
        assert!(parse_todo_list("no block here").is_empty());
        assert!(parse_todo_list("```json\nnot json\n```").is_empty());
    }
}
