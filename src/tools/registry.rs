//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / execute）。
//! 工具按类别由 ToolBackend 提供：ToolRegistry 在启动时对每个类别 discover 一次并记录 ToolStatus，
//! 某个类别初始化失败不影响其它类别。查询时按类别取出工具子集，组成 ToolSet 绑定到推理循环。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::sources::SourceKind;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 一个能力类别的工具提供方
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// 所属类别（显式标注，不从工具名推断）
    fn category(&self) -> SourceKind;

    /// 初始化并返回该类别的全部工具
    async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>, String>;
}

/// 类别状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatusKind {
    NotInitialized,
    Enabled,
    Error,
}

/// 单个类别的初始化结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: SourceKind,
    pub status: ToolStatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

struct CategoryEntry {
    status: ToolStatus,
    tools: Vec<Arc<dyn Tool>>,
}

/// 按类别组织的工具注册表；构造后只读
pub struct ToolRegistry {
    categories: BTreeMap<SourceKind, CategoryEntry>,
}

impl ToolRegistry {
    /// 对每个 backend 执行一次 discover；失败（包括 panic）记为 Error 状态
    pub async fn initialize(backends: Vec<Arc<dyn ToolBackend>>) -> Self {
        let mut categories: BTreeMap<SourceKind, CategoryEntry> = SourceKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    CategoryEntry {
                        status: ToolStatus {
                            name: kind,
                            status: ToolStatusKind::NotInitialized,
                            error_message: None,
                        },
                        tools: Vec::new(),
                    },
                )
            })
            .collect();

        for backend in backends {
            let kind = backend.category();
            let Some(entry) = categories.get_mut(&kind) else {
                continue;
            };
            if entry.status.status != ToolStatusKind::NotInitialized {
                tracing::warn!(category = %kind, "category already initialized, skipping backend");
                continue;
            }

            let discovered = tokio::spawn(async move { backend.discover().await })
                .await
                .unwrap_or_else(|e| Err(format!("backend initialization aborted: {}", e)));

            match discovered {
                Ok(tools) => {
                    tracing::info!(category = %kind, tools = tools.len(), "tool category enabled");
                    entry.status.status = ToolStatusKind::Enabled;
                    entry.tools = tools;
                }
                Err(e) => {
                    tracing::error!(category = %kind, error = %e, "tool category failed to initialize");
                    entry.status.status = ToolStatusKind::Error;
                    entry.status.error_message = Some(e);
                }
            }
        }

        Self { categories }
    }

    /// 所请求类别中已启用类别的全部工具；按类别固定顺序，再按 backend 给出的顺序
    pub fn filtered_tools(&self, categories: &[SourceKind]) -> Vec<Arc<dyn Tool>> {
        self.categories
            .iter()
            .filter(|(kind, entry)| {
                categories.contains(kind) && entry.status.status == ToolStatusKind::Enabled
            })
            .flat_map(|(_, entry)| entry.tools.iter().cloned())
            .collect()
    }

    /// 每个类别一条状态，按固定顺序
    pub fn statuses(&self) -> Vec<ToolStatus> {
        self.categories.values().map(|e| e.status.clone()).collect()
    }

    /// 已启用的类别
    pub fn available_categories(&self) -> Vec<SourceKind> {
        self.categories
            .iter()
            .filter(|(_, e)| e.status.status == ToolStatusKind::Enabled)
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// 绑定到一个推理循环的工具集合（按名查找）
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的 Available tools 段落
    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .iter()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    /// 工具列表 JSON（名称、描述、参数 schema）
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}
