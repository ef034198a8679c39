//! 会话线程检查点
//!
//! 每个 (会话键, 线程 id) 一份 ConversationMemory，首次使用时创建。
//! 同一线程的调用经 async Mutex 串行；不同线程互不阻塞。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::memory::{ConversationMemory, Message};

/// 默认线程 id
pub const DEFAULT_THREAD: &str = "default";

type ThreadKey = (String, String);

/// 所有推理循环共享的对话存储
pub struct CheckpointStore {
    max_turns: usize,
    threads: Mutex<HashMap<ThreadKey, Arc<AsyncMutex<ConversationMemory>>>>,
}

impl CheckpointStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// 取出（或创建）线程
    pub fn thread(&self, session_key: &str, thread_id: &str) -> Arc<AsyncMutex<ConversationMemory>> {
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads
            .entry((session_key.to_string(), thread_id.to_string()))
            .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationMemory::new(self.max_turns))))
            .clone()
    }

    /// 线程当前的对话历史（不存在时为空，不会创建线程）
    pub async fn history(&self, session_key: &str, thread_id: &str) -> Vec<Message> {
        let thread = {
            let threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
            threads
                .get(&(session_key.to_string(), thread_id.to_string()))
                .cloned()
        };
        match thread {
            Some(t) => t.lock().await.messages().to_vec(),
            None => Vec::new(),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_threads_are_keyed_by_session_and_id() {
        let store = CheckpointStore::new(10);
        store.thread("m_mail", "a").lock().await.push(Message::user("hi"));
        store.thread("m_mail", "b");
        store.thread("m_chat", "a");

        assert_eq!(store.thread_count(), 3);
        assert_eq!(store.history("m_mail", "a").await.len(), 1);
        assert!(store.history("m_chat", "a").await.is_empty());
        assert!(store.history("m_mail", "missing").await.is_empty());
        assert_eq!(store.thread_count(), 3);
    }
}
