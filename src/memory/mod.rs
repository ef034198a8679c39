//! 记忆层：对话消息与按线程保留的短期对话窗口

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
