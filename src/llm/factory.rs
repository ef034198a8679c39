//! 按模型 ID 构建 LLM 客户端
//!
//! 会话缓存以 (model, categories) 为键，每个新组合都需要一个绑定到该模型的客户端；
//! ModelFactory 把「模型 ID -> 客户端」的决定从缓存中剥离出来，测试可替换为脚本化实现。

use std::sync::Arc;

use crate::config::LlmSection;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};

/// 模型工厂
pub trait ModelFactory: Send + Sync {
    fn create(&self, model: &str) -> Arc<dyn LlmClient>;

    /// 只在能连上真实后端时返回客户端；工具选择器据此决定是否退回全部类别
    fn try_create(&self, model: &str) -> Option<Arc<dyn LlmClient>> {
        Some(self.create(model))
    }
}

impl<F> ModelFactory for F
where
    F: Fn(&str) -> Arc<dyn LlmClient> + Send + Sync,
{
    fn create(&self, model: &str) -> Arc<dyn LlmClient> {
        self(model)
    }
}

/// 根据 [llm] 配置构建客户端的工厂
pub struct ConfiguredModelFactory {
    llm: LlmSection,
}

impl ConfiguredModelFactory {
    pub fn new(llm: LlmSection) -> Self {
        Self { llm }
    }
}

impl ModelFactory for ConfiguredModelFactory {
    fn create(&self, model: &str) -> Arc<dyn LlmClient> {
        create_llm_from_config(&self.llm, model)
    }

    fn try_create(&self, model: &str) -> Option<Arc<dyn LlmClient>> {
        try_create_llm(&self.llm, model, std::env::var("OPENAI_API_KEY").ok())
    }
}

/// 根据配置与环境变量选择后端：provider = openai 且有 OPENAI_API_KEY 时走 OpenAI 兼容端点，否则 Mock
pub fn create_llm_from_config(cfg: &LlmSection, model: &str) -> Arc<dyn LlmClient> {
    try_create_llm(cfg, model, std::env::var("OPENAI_API_KEY").ok()).unwrap_or_else(|| {
        tracing::warn!(model, provider = %cfg.provider, "No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    })
}

/// provider = mock 时返回 Mock；openai 缺少 key 或 provider 未知时返回 None
fn try_create_llm(cfg: &LlmSection, model: &str, api_key: Option<String>) -> Option<Arc<dyn LlmClient>> {
    match (cfg.provider.to_lowercase().as_str(), api_key) {
        ("openai", Some(key)) => {
            tracing::info!(model, "Using OpenAI-compatible LLM");
            Some(Arc::new(OpenAiClient::new(cfg.base_url.as_deref(), model, Some(&key))))
        }
        ("mock", _) => Some(Arc::new(MockLlmClient)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(provider: &str) -> LlmSection {
        LlmSection {
            provider: provider.to_string(),
            ..LlmSection::default()
        }
    }

    #[test]
    fn test_missing_credentials_yield_no_model() {
        assert!(try_create_llm(&section("openai"), "gpt-4o-mini", None).is_none());
        assert!(try_create_llm(&section("anthropic"), "gpt-4o-mini", Some("k".into())).is_none());
    }

    #[test]
    fn test_mock_and_keyed_providers_yield_a_model() {
        assert!(try_create_llm(&section("Mock"), "m", None).is_some());
        assert!(try_create_llm(&section("openai"), "gpt-4o-mini", Some("sk-test".into())).is_some());
    }

    #[test]
    fn test_create_always_returns_a_client() {
        let factory = ConfiguredModelFactory::new(section("unknown"));
        assert!(factory.try_create("m").is_none());
        let _client = factory.create("m");
    }
}
