//! 工具类别选择器
//!
//! 把查询与可用类别交给 Oracle，解析其逗号分隔的回复。
//! 宁可多选也不漏选：回复无法解析、Oracle 失败或未配置时返回全部可用类别。

use std::sync::Arc;

use crate::oracle::Oracle;
use crate::sources::SourceKind;

/// 工具类别选择器
#[derive(Clone)]
pub struct ToolSelector {
    oracle: Option<Arc<dyn Oracle>>,
}

impl ToolSelector {
    /// oracle 为 None 表示选择模型未能初始化，所有查询都走全集
    pub fn new(oracle: Option<Arc<dyn Oracle>>) -> Self {
        Self { oracle }
    }

    /// 返回 available 的非空子集（available 为空时返回空）
    pub async fn select(&self, query: &str, available: &[SourceKind]) -> Vec<SourceKind> {
        let Some(oracle) = &self.oracle else {
            tracing::warn!("tool selector has no model, using every available category");
            return available.to_vec();
        };

        let reply = match oracle.select_categories(query, available).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "tool selection failed, using every available category");
                return available.to_vec();
            }
        };

        let selected = parse_categories(&reply, available);
        if selected.is_empty() {
            tracing::warn!(reply = %reply, "selector reply named no usable category, using every available category");
            return available.to_vec();
        }
        tracing::info!(query, categories = ?selected, "tool categories selected");
        selected
    }
}

/// 按逗号切分，去空白、忽略大小写，只保留 available 中的类别（去重，保持出现顺序）
pub fn parse_categories(reply: &str, available: &[SourceKind]) -> Vec<SourceKind> {
    let mut selected = Vec::new();
    for token in reply.split(',') {
        let Ok(kind) = token.parse::<SourceKind>() else {
            continue;
        };
        if available.contains(&kind) && !selected.contains(&kind) {
            selected.push(kind);
        }
    }
    selected
}
