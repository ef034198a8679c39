//! 数据源连接器抽象
//!
//! 每个外部服务实现 SourceConnector：按 FetchCriteria 拉取记录，失败返回 ConnectorError。
//! 超时、分页与鉴权都由连接器自身负责。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Record, SourceKind};

/// 连接器错误（网络 / 鉴权 / 配额 / 其它）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("{0}")]
    Other(String),
}

/// 拉取范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum FetchScope {
    /// 今天的条目
    Today,
    /// 未来 N 天
    Upcoming { days: u32 },
    /// 最近 N 天分配给我的
    Assigned { days: u32 },
    /// 最近 N 天我创建的
    Created { days: u32 },
    /// 最近 N 天有更新的
    Updated { days: u32 },
}

/// 拉取条件：范围 + 可选条数上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCriteria {
    #[serde(flatten)]
    pub scope: FetchScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FetchCriteria {
    pub fn new(scope: FetchScope) -> Self {
        Self { scope, limit: None }
    }

    pub fn today() -> Self {
        Self::new(FetchScope::Today)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 数据源连接器
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// 连接器对应的来源
    fn kind(&self) -> SourceKind;

    /// 拉取记录
    async fn fetch(&self, criteria: &FetchCriteria) -> Result<Vec<Record>, ConnectorError>;
}
