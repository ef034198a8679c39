//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BRIEFING__*` 覆盖（双下划线表示嵌套，如 `BRIEFING__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::sources::{FetchCriteria, FetchScope, SourceKind};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub sources: SourcesSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：后端选择与默认模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 摘要、汇总与查询路由的默认模型
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 工具选择器使用的模型，未设置时用 model
    pub selector_model: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            selector_model: None,
        }
    }
}

impl LlmSection {
    pub fn selector_model(&self) -> &str {
        self.selector_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.model)
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [sources] 段：各来源的采集参数
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SourcesSection {
    pub mail: MailSource,
    pub calendar: CalendarSource,
    pub chat: ChatSource,
    pub issues: IssuesSource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSource {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for MailSource {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSource {
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
}

impl Default for CalendarSource {
    fn default() -> Self {
        Self {
            days_ahead: default_days_ahead(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSource {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for ChatSource {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesSource {
    #[serde(default = "default_days_back")]
    pub days_back: u32,
}

impl Default for IssuesSource {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
        }
    }
}

fn default_max_results() -> usize {
    20
}

fn default_days_ahead() -> u32 {
    2
}

fn default_days_back() -> u32 {
    7
}

impl SourcesSection {
    /// 每个来源的拉取条件（按顺序执行，结果按 id 去重）
    pub fn criteria_for(&self, kind: SourceKind) -> Vec<FetchCriteria> {
        match kind {
            SourceKind::Mail => vec![FetchCriteria::today().with_limit(self.mail.max_results)],
            SourceKind::Calendar => vec![FetchCriteria::new(FetchScope::Upcoming {
                days: self.calendar.days_ahead,
            })],
            SourceKind::Chat => vec![FetchCriteria::today().with_limit(self.chat.max_results)],
            SourceKind::Issues => {
                let days = self.issues.days_back;
                vec![
                    FetchCriteria::new(FetchScope::Assigned { days }),
                    FetchCriteria::new(FetchScope::Created { days }),
                    FetchCriteria::new(FetchScope::Updated { days }),
                ]
            }
        }
    }
}

/// [agent] 段：推理循环与会话缓存
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 单次查询最大推理步数
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// 每个会话线程保留的对话轮数
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
    /// 会话缓存容量；0 表示不限（从不淘汰）
    #[serde(default)]
    pub session_capacity: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_context_turns: default_max_context_turns(),
            session_capacity: 0,
        }
    }
}

fn default_max_steps() -> usize {
    12
}

fn default_max_context_turns() -> usize {
    20
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// 从 config 目录加载配置，环境变量 BRIEFING__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BRIEFING__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BRIEFING")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
