//! Briefing - 个人工作简报智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与恢复策略
//! - **sources**: 数据源连接器抽象、记录与演示数据
//! - **oracle**: 摘要 / 汇总 / 类别选择的文本生成抽象
//! - **collector**: 单个来源的「拉取 + 摘要」
//! - **workflow**: 静态图执行引擎与每日简报工作流
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话历史
//! - **tools**: 按类别组织的能力工具、注册表与执行器
//! - **routing**: 查询到工具类别的选择
//! - **react**: Planner 与工具调用推理循环
//! - **session**: 推理循环会话缓存
//! - **app**: 进程级上下文

pub mod app;
pub mod collector;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod oracle;
pub mod react;
pub mod routing;
pub mod session;
pub mod sources;
pub mod tools;
pub mod workflow;

pub use app::AppContext;
pub use config::{load_config, AppConfig};
pub use core::BriefingError;
