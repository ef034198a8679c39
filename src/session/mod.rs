//! 推理循环会话缓存

pub mod cache;

pub use cache::{AgentSessionCache, AgentSessionKey, SessionSettings};
