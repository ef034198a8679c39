//! 静态工作流图
//!
//! - types: 节点 / 边 / 状态 trait 与错误
//! - graph: 邻接表 + 入度表，负责就绪判定与校验
//! - builder: 流式构建并校验拓扑
//! - engine: 并发执行到完成（join 语义：等待全部前驱）
//! - digest: 四路采集 + 汇总的每日简报工作流

pub mod builder;
pub mod digest;
pub mod engine;
pub mod graph;
pub mod types;

pub use builder::WorkflowBuilder;
pub use digest::{
    collector_node_id, parse_todo_list, Digest, DigestRun, DigestState, DigestUpdate,
    DigestWorkflow, TodoItem, SYNTHESIS_NODE,
};
pub use graph::WorkflowGraph;
pub use types::*;
