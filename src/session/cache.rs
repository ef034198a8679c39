//! Agent 会话缓存
//!
//! 以 (模型, 去重排序后的类别集合) 为键缓存已绑定工具的 ReasoningLoop。
//! 未命中时从 ToolRegistry 取工具子集构建新循环；命中时原样返回，不重新过滤工具。
//! 并发未命中同一键时可能各自构建一次，后写入者覆盖先写入者。

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{AgentSection, ToolsSection};
use crate::core::BriefingError;
use crate::llm::ModelFactory;
use crate::react::{CheckpointStore, ReasoningLoop};
use crate::sources::SourceKind;
use crate::tools::{ToolRegistry, ToolSet};

/// 会话键：与类别的输入顺序、重复无关
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentSessionKey {
    pub model: String,
    pub categories: BTreeSet<SourceKind>,
}

impl AgentSessionKey {
    pub fn new(model: impl Into<String>, categories: &[SourceKind]) -> Self {
        Self {
            model: model.into(),
            categories: categories.iter().copied().collect(),
        }
    }

    /// `<model>_<cat1>-<cat2>`，类别按名称排序
    pub fn cache_key(&self) -> String {
        let names: BTreeSet<&str> = self.categories.iter().map(|k| k.as_str()).collect();
        format!(
            "{}_{}",
            self.model,
            names.into_iter().collect::<Vec<_>>().join("-")
        )
    }
}

/// 新建推理循环使用的参数
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_steps: usize,
    pub tool_timeout: Duration,
    /// 0 表示不限容量、从不淘汰；> 0 时按最近最少使用淘汰
    pub capacity: usize,
}

impl SessionSettings {
    pub fn from_config(agent: &AgentSection, tools: &ToolsSection) -> Self {
        Self {
            max_steps: agent.max_steps,
            tool_timeout: Duration::from_secs(tools.tool_timeout_secs),
            capacity: agent.session_capacity,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AgentSection::default(), &ToolsSection::default())
    }
}

struct CachedSession {
    agent: Arc<ReasoningLoop>,
    last_used: u64,
}

#[derive(Default)]
struct SessionMap {
    entries: HashMap<String, CachedSession>,
    clock: u64,
}

impl SessionMap {
    fn touch(&mut self, key: &str) -> Option<Arc<ReasoningLoop>> {
        self.clock += 1;
        let now = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            entry.agent.clone()
        })
    }

    fn insert(&mut self, key: String, agent: Arc<ReasoningLoop>, capacity: usize) {
        self.clock += 1;
        self.entries.insert(
            key,
            CachedSession {
                agent,
                last_used: self.clock,
            },
        );
        while capacity > 0 && self.entries.len() > capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            tracing::debug!(session = %oldest, "evicting least recently used session");
            self.entries.remove(&oldest);
        }
    }
}

/// 进程内的会话缓存
pub struct AgentSessionCache {
    registry: Arc<ToolRegistry>,
    models: Arc<dyn ModelFactory>,
    checkpoints: Arc<CheckpointStore>,
    settings: SessionSettings,
    sessions: Mutex<SessionMap>,
}

impl AgentSessionCache {
    pub fn new(
        registry: Arc<ToolRegistry>,
        models: Arc<dyn ModelFactory>,
        checkpoints: Arc<CheckpointStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            registry,
            models,
            checkpoints,
            settings,
            sessions: Mutex::new(SessionMap::default()),
        }
    }

    /// 取出或创建 (model, categories) 对应的推理循环；工具集为空时返回 Configuration 错误
    pub fn get_or_create(
        &self,
        model: &str,
        categories: &[SourceKind],
    ) -> Result<Arc<ReasoningLoop>, BriefingError> {
        let key = AgentSessionKey::new(model, categories);
        let cache_key = key.cache_key();

        if let Some(agent) = self.lock().touch(&cache_key) {
            tracing::debug!(session = %cache_key, "session cache hit");
            return Ok(agent);
        }

        let requested: Vec<SourceKind> = key.categories.iter().copied().collect();
        let tools = self.registry.filtered_tools(&requested);
        if tools.is_empty() {
            return Err(BriefingError::Configuration(format!(
                "no tools available for categories [{}]",
                requested
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let agent = Arc::new(
            ReasoningLoop::new(
                self.models.create(model),
                ToolSet::new(tools),
                self.checkpoints.clone(),
                cache_key.clone(),
            )
            .with_max_steps(self.settings.max_steps)
            .with_tool_timeout(self.settings.tool_timeout),
        );
        tracing::info!(session = %cache_key, tools = ?agent.tool_names(), "created reasoning session");

        self.lock()
            .insert(cache_key, agent.clone(), self.settings.capacity);
        Ok(agent)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn checkpoints(&self) -> &Arc<CheckpointStore> {
        &self.checkpoints
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionMap> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
