//! 工作流依赖图
//!
//! 使用邻接表和入度表实现 DAG 调度；START 出发的边不计入入度，指向 END 的边不参与调度。

use std::collections::{HashMap, HashSet, VecDeque};

use crate::workflow::types::*;

/// 工作流依赖图
pub struct WorkflowGraph {
    /// 节点（按添加顺序），保证就绪节点的启动顺序稳定
    order: Vec<NodeId>,
    /// 邻接表：节点 -> 依赖该节点的节点
    pub adjacency: HashMap<NodeId, Vec<NodeId>>,
    /// 入度表：节点 -> 未完成的前驱数
    pub in_degree: HashMap<NodeId, usize>,
}

impl WorkflowGraph {
    /// 创建依赖图；边必须已校验过（只引用已知节点或 START / END）
    pub fn new(nodes: &[NodeId], edges: &[Edge]) -> Self {
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();

        for id in nodes {
            in_degree.insert(id.clone(), 0);
            adjacency.insert(id.clone(), Vec::new());
        }

        for edge in edges {
            if edge.from == START || edge.to == END {
                continue;
            }
            adjacency.entry(edge.from.clone()).or_default().push(edge.to.clone());
            *in_degree.entry(edge.to.clone()).or_insert(0) += 1;
        }

        Self {
            order: nodes.to_vec(),
            adjacency,
            in_degree,
        }
    }

    /// 可执行的节点（入度为 0 且仍在等待），按添加顺序
    pub fn ready_nodes(&self, states: &HashMap<NodeId, NodeState>) -> Vec<NodeId> {
        self.order
            .iter()
            .filter(|id| {
                self.in_degree.get(*id) == Some(&0)
                    && matches!(states.get(*id), Some(NodeState::Waiting) | None)
            })
            .cloned()
            .collect()
    }

    /// 标记节点完成，返回入度降为 0 的后继
    pub fn mark_completed(&mut self, completed: &NodeId) -> Vec<NodeId> {
        let mut newly_ready = Vec::new();
        if let Some(dependents) = self.adjacency.get(completed) {
            for dependent in dependents {
                if let Some(degree) = self.in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        newly_ready.push(dependent.clone());
                    }
                }
            }
        }
        newly_ready
    }

    /// 拓扑排序（Kahn）；存在环时返回 CyclicDependency
    pub fn topological_order(&self) -> Result<Vec<NodeId>, WorkflowError> {
        let mut degree = self.in_degree.clone();
        let mut queue: VecDeque<NodeId> = self
            .order
            .iter()
            .filter(|id| degree.get(*id) == Some(&0))
            .cloned()
            .collect();
        let mut sorted = Vec::with_capacity(self.order.len());

        while let Some(id) = queue.pop_front() {
            if let Some(dependents) = self.adjacency.get(&id) {
                for dependent in dependents {
                    if let Some(d) = degree.get_mut(dependent) {
                        *d -= 1;
                        if *d == 0 {
                            queue.push_back(dependent.clone());
                        }
                    }
                }
            }
            sorted.push(id);
        }

        if sorted.len() != self.order.len() {
            return Err(WorkflowError::CyclicDependency);
        }
        Ok(sorted)
    }

    /// 所有节点都必须能从 START 到达
    pub fn check_reachable(&self, edges: &[Edge]) -> Result<(), WorkflowError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = edges
            .iter()
            .filter(|e| e.from == START && e.to != END)
            .map(|e| e.to.as_str())
            .collect();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(next) = self.adjacency.get(id) {
                queue.extend(next.iter().map(String::as_str));
            }
        }

        match self.order.iter().find(|id| !seen.contains(id.as_str())) {
            Some(id) => Err(WorkflowError::Unreachable(id.clone())),
            None => Ok(()),
        }
    }
}
