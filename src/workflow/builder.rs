//! 工作流构建器
//!
//! 提供流畅的 API 声明节点与边，build 时校验拓扑（未知节点、重复节点、环、不可达）。

use std::collections::HashMap;
use std::sync::Arc;

use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::*;

/// 工作流构建器
pub struct WorkflowBuilder<S: WorkflowState> {
    name: String,
    description: Option<String>,
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    edges: Vec<Edge>,
    duplicate: Option<NodeId>,
}

impl<S: WorkflowState> WorkflowBuilder<S> {
    /// 创建新的工作流构建器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            order: Vec::new(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            duplicate: None,
        }
    }

    /// 设置描述
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// 添加节点
    pub fn node(mut self, id: impl Into<NodeId>, node: Arc<dyn Node<S>>) -> Self {
        let id = id.into();
        if self.nodes.insert(id.clone(), node).is_some() {
            self.duplicate.get_or_insert(id);
        } else {
            self.order.push(id);
        }
        self
    }

    /// 添加边
    pub fn edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    /// 扇出：from -> 每个 targets
    pub fn fan_out(mut self, from: impl Into<NodeId>, targets: &[NodeId]) -> Self {
        let from = from.into();
        for to in targets {
            self.edges.push(Edge::new(from.clone(), to.clone()));
        }
        self
    }

    /// 扇入：每个 sources -> to（to 等待全部 sources 完成）
    pub fn fan_in(mut self, sources: &[NodeId], to: impl Into<NodeId>) -> Self {
        let to = to.into();
        for from in sources {
            self.edges.push(Edge::new(from.clone(), to.clone()));
        }
        self
    }

    /// 构建并校验工作流
    pub fn build(self) -> Result<Workflow<S>, WorkflowError> {
        if let Some(id) = self.duplicate {
            return Err(WorkflowError::DuplicateNode(id));
        }
        if self.order.is_empty() {
            return Err(WorkflowError::InvalidConfiguration(
                "workflow has no nodes".to_string(),
            ));
        }
        if let Some(id) = self.order.iter().find(|id| id.as_str() == START || id.as_str() == END) {
            return Err(WorkflowError::InvalidConfiguration(format!(
                "{} is a reserved node id",
                id
            )));
        }

        for edge in &self.edges {
            if edge.to == START || edge.from == END {
                return Err(WorkflowError::InvalidConfiguration(format!(
                    "invalid edge {} -> {}",
                    edge.from, edge.to
                )));
            }
            for end in [&edge.from, &edge.to] {
                if end != START && end != END && !self.nodes.contains_key(end) {
                    return Err(WorkflowError::UnknownNode(end.clone()));
                }
            }
        }

        let graph = WorkflowGraph::new(&self.order, &self.edges);
        graph.topological_order()?;
        graph.check_reachable(&self.edges)?;

        Ok(Workflow {
            name: self.name,
            description: self.description,
            order: self.order,
            nodes: self.nodes,
            edges: self.edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Counter(u32);

    impl WorkflowState for Counter {
        type Update = u32;

        fn apply(&mut self, update: u32) {
            self.0 += update;
        }
    }

    fn one() -> Arc<dyn Node<Counter>> {
        node_fn(|_: Counter| async { 1 })
    }

    #[test]
    fn test_build_fan_out_fan_in() {
        let branches = vec!["a".to_string(), "b".to_string()];
        let workflow = WorkflowBuilder::new("Test Workflow")
            .description("A test workflow")
            .node("a", one())
            .node("b", one())
            .node("join", one())
            .fan_out(START, &branches)
            .fan_in(&branches, "join")
            .edge("join", END)
            .build()
            .expect("Failed to build workflow");

        assert_eq!(workflow.name, "Test Workflow");
        assert_eq!(workflow.node_ids().len(), 3);
        assert_eq!(workflow.edges().len(), 5);
    }

    #[test]
    fn test_unknown_node_in_edge_fails() {
        let result = WorkflowBuilder::new("Test")
            .node("a", one())
            .edge(START, "a")
            .edge("a", "missing")
            .build();
        assert!(matches!(result, Err(WorkflowError::UnknownNode(id)) if id == "missing"));
    }

    #[test]
    fn test_duplicate_node_fails() {
        let result = WorkflowBuilder::new("Test")
            .node("a", one())
            .node("a", one())
            .edge(START, "a")
            .build();
        assert!(matches!(result, Err(WorkflowError::DuplicateNode(_))));
    }

    #[test]
    fn test_empty_workflow_fails() {
        let result = WorkflowBuilder::<Counter>::new("Test").build();
        assert!(result.is_err());
    }
}
