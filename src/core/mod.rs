//! 核心：错误分类与推理循环的恢复策略

pub mod error;
pub mod recovery;

pub use error::{AgentError, BriefingError, RecoveryAction};
pub use recovery::RecoveryEngine;
