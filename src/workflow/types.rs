//! 工作流类型定义
//!
//! 图是静态的：节点列表 + 边列表，START / END 为虚拟节点。
//! 节点拿到状态快照，返回一个更新；只有引擎把更新写回状态，因此不存在并发写。

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type WorkflowId = String;
pub type NodeId = String;

/// 虚拟起点
pub const START: &str = "__start__";
/// 虚拟终点
pub const END: &str = "__end__";

/// 工作流状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    /// 正在执行
    Running,
    /// 所有节点已完成
    Completed,
    /// 执行失败（节点任务异常退出）
    Failed,
}

/// 节点状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// 等待前驱完成
    Waiting,
    /// 正在执行
    Running,
    /// 已完成
    Completed,
}

/// 工作流共享状态：节点返回 Update，由引擎串行 apply
pub trait WorkflowState: Clone + Send + Sync + 'static {
    type Update: Send + 'static;

    fn apply(&mut self, update: Self::Update);
}

/// 图节点
#[async_trait]
pub trait Node<S: WorkflowState>: Send + Sync {
    /// 基于启动时的状态快照执行，返回对状态的更新
    async fn run(&self, state: S) -> S::Update;
}

/// 闭包节点
pub struct FnNode<S, F> {
    f: F,
    _state: PhantomData<fn(S)>,
}

impl<S, F> FnNode<S, F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<S, F>
where
    S: WorkflowState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = S::Update> + Send + 'static,
{
    async fn run(&self, state: S) -> S::Update {
        (self.f)(state).await
    }
}

/// 用闭包构造节点
pub fn node_fn<S, F, Fut>(f: F) -> Arc<dyn Node<S>>
where
    S: WorkflowState,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = S::Update> + Send + 'static,
{
    Arc::new(FnNode::new(f))
}

/// 有向边
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// 已校验的工作流定义
pub struct Workflow<S: WorkflowState> {
    /// 工作流名称
    pub name: String,
    /// 工作流描述
    pub description: Option<String>,
    /// 节点（按添加顺序）
    pub(crate) order: Vec<NodeId>,
    pub(crate) nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    pub(crate) edges: Vec<Edge>,
}

impl<S: WorkflowState> Workflow<S> {
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// 一次执行的结果
#[derive(Debug, Clone)]
pub struct WorkflowRun<S> {
    pub id: WorkflowId,
    pub status: WorkflowStatus,
    pub state: S,
    /// 节点完成顺序
    pub completed: Vec<NodeId>,
}

/// 工作流错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),
    #[error("Cyclic dependency detected")]
    CyclicDependency,
    #[error("Node not reachable from start: {0}")]
    Unreachable(NodeId),
    #[error("Invalid workflow configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Node task panicked: {0}")]
    NodePanicked(String),
}
