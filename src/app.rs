//! 应用上下文
//!
//! 进程启动时构造一次：工具注册表、会话缓存、工具选择器与简报工作流都在这里组装，
//! 之后以引用传给各个请求入口（digest / query / status）。

use std::sync::Arc;

use crate::collector::CollectorAgent;
use crate::config::AppConfig;
use crate::core::BriefingError;
use crate::llm::ModelFactory;
use crate::oracle::{LlmOracle, Oracle};
use crate::react::{CheckpointStore, DEFAULT_THREAD};
use crate::routing::ToolSelector;
use crate::session::{AgentSessionCache, SessionSettings};
use crate::sources::{FetchCriteria, SourceConnector, SourceKind};
use crate::tools::{ConnectorBackend, ToolBackend, ToolRegistry, ToolStatus};
use crate::workflow::{DigestRun, DigestWorkflow};

/// 进程级上下文
pub struct AppContext {
    config: AppConfig,
    digest: DigestWorkflow,
    registry: Arc<ToolRegistry>,
    selector: ToolSelector,
    sessions: AgentSessionCache,
}

impl AppContext {
    /// 用配置中的模型构建 Oracle（摘要 / 汇总用 llm.model，选择器用 llm.selector_model）
    ///
    /// 选择器模型无法创建时选择器不持有 Oracle，每条查询都使用全部可用类别。
    pub async fn new(
        config: AppConfig,
        connectors: Vec<Arc<dyn SourceConnector>>,
        models: Arc<dyn ModelFactory>,
    ) -> Result<Self, BriefingError> {
        let oracle: Arc<dyn Oracle> = Arc::new(LlmOracle::new(models.create(&config.llm.model)));
        let selector_model = config.llm.selector_model();
        let selector_oracle = match models.try_create(selector_model) {
            Some(llm) => Some(Arc::new(LlmOracle::new(llm)) as Arc<dyn Oracle>),
            None => {
                tracing::warn!(model = selector_model, "selector model unavailable, queries will use every category");
                None
            }
        };
        Self::with_oracles(
            config,
            connectors,
            models,
            oracle,
            ToolSelector::new(selector_oracle),
        )
        .await
    }

    /// 显式指定简报 Oracle 与选择器
    pub async fn with_oracles(
        config: AppConfig,
        connectors: Vec<Arc<dyn SourceConnector>>,
        models: Arc<dyn ModelFactory>,
        oracle: Arc<dyn Oracle>,
        selector: ToolSelector,
    ) -> Result<Self, BriefingError> {
        let collectors = connectors
            .iter()
            .map(|c| {
                CollectorAgent::new(c.clone(), oracle.clone(), config.sources.criteria_for(c.kind()))
            })
            .collect();
        let digest = DigestWorkflow::new(collectors, oracle)?;

        let backends: Vec<Arc<dyn ToolBackend>> = connectors
            .into_iter()
            .map(|c| {
                let criteria = config
                    .sources
                    .criteria_for(c.kind())
                    .into_iter()
                    .next()
                    .unwrap_or_else(FetchCriteria::today);
                Arc::new(ConnectorBackend::new(c, criteria)) as Arc<dyn ToolBackend>
            })
            .collect();
        let registry = Arc::new(ToolRegistry::initialize(backends).await);

        let checkpoints = Arc::new(CheckpointStore::new(config.agent.max_context_turns));
        let sessions = AgentSessionCache::new(
            registry.clone(),
            models,
            checkpoints,
            SessionSettings::from_config(&config.agent, &config.tools),
        );

        tracing::info!(
            app = config.app.name.as_deref().unwrap_or("briefing"),
            categories = ?registry.available_categories(),
            "application context ready"
        );

        Ok(Self {
            config,
            digest,
            registry,
            selector,
            sessions,
        })
    }

    pub fn sessions(&self) -> &AgentSessionCache {
        &self.sessions
    }

    /// 执行一次简报工作流；永远返回结构完整的结果
    pub async fn run_digest(&self) -> DigestRun {
        self.digest.run().await
    }

    /// 回答一条查询
    ///
    /// `categories` 非空时直接使用（未知名称忽略），缺省或为空时由选择器决定；
    /// `model` 缺省为 `[llm] model`，`thread_id` 缺省为 `default`。
    pub async fn route_query(
        &self,
        query: &str,
        thread_id: Option<&str>,
        model: Option<&str>,
        categories: Option<&[String]>,
    ) -> Result<String, BriefingError> {
        let categories = match categories {
            Some(names) if !names.is_empty() => parse_explicit(names),
            _ => {
                let available = self.registry.available_categories();
                self.selector.select(query, &available).await
            }
        };

        let model = model.unwrap_or(&self.config.llm.model);
        let agent = self.sessions.get_or_create(model, &categories)?;
        let answer = agent
            .invoke(query, thread_id.unwrap_or(DEFAULT_THREAD))
            .await?;
        Ok(answer)
    }

    pub fn tool_statuses(&self) -> Vec<ToolStatus> {
        self.registry.statuses()
    }
}

fn parse_explicit(names: &[String]) -> Vec<SourceKind> {
    let mut kinds = Vec::new();
    for name in names {
        match name.parse::<SourceKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unknown tool category"),
        }
    }
    kinds
}
