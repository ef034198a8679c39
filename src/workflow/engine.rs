//! 工作流引擎
//!
//! 就绪节点在 JoinSet 中并发执行；每个节点拿到启动时刻的状态快照，
//! 完成后由引擎串行 apply 更新，再把入度降为 0 的后继放进 JoinSet。

use std::collections::HashMap;

use tokio::task::JoinSet;
use uuid::Uuid;

use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::*;

impl<S: WorkflowState> Workflow<S> {
    /// 执行一次工作流，返回最终状态与节点完成顺序
    pub async fn invoke(&self, initial: S) -> Result<WorkflowRun<S>, WorkflowError> {
        let run_id: WorkflowId = format!("wf_{}", Uuid::new_v4());
        tracing::info!(workflow = %self.name, run_id = %run_id, nodes = self.order.len(), "workflow started");

        let mut graph = WorkflowGraph::new(&self.order, &self.edges);
        let mut states: HashMap<NodeId, NodeState> = self
            .order
            .iter()
            .map(|id| (id.clone(), NodeState::Waiting))
            .collect();
        let mut run = WorkflowRun {
            id: run_id,
            status: WorkflowStatus::Running,
            state: initial,
            completed: Vec::with_capacity(self.order.len()),
        };
        let mut tasks: JoinSet<(NodeId, S::Update)> = JoinSet::new();

        for id in graph.ready_nodes(&states) {
            self.spawn_node(&mut tasks, &mut states, id, &run.state)?;
        }

        while let Some(joined) = tasks.join_next().await {
            let (id, update) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(workflow = %self.name, run_id = %run.id, error = %e, "workflow node aborted");
                    tasks.abort_all();
                    return Err(WorkflowError::NodePanicked(e.to_string()));
                }
            };

            run.state.apply(update);
            states.insert(id.clone(), NodeState::Completed);
            tracing::debug!(workflow = %self.name, node = %id, "node completed");
            run.completed.push(id.clone());

            for next in graph.mark_completed(&id) {
                self.spawn_node(&mut tasks, &mut states, next, &run.state)?;
            }
        }

        if run.completed.len() != self.order.len() {
            run.status = WorkflowStatus::Failed;
            let pending: Vec<&str> = self
                .order
                .iter()
                .filter(|id| states.get(*id) != Some(&NodeState::Completed))
                .map(String::as_str)
                .collect();
            return Err(WorkflowError::InvalidConfiguration(format!(
                "nodes never became ready: {}",
                pending.join(", ")
            )));
        }

        run.status = WorkflowStatus::Completed;
        tracing::info!(workflow = %self.name, run_id = %run.id, "workflow completed");
        Ok(run)
    }

    fn spawn_node(
        &self,
        tasks: &mut JoinSet<(NodeId, S::Update)>,
        states: &mut HashMap<NodeId, NodeState>,
        id: NodeId,
        snapshot: &S,
    ) -> Result<(), WorkflowError> {
        let node = self
            .nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownNode(id.clone()))?;
        states.insert(id.clone(), NodeState::Running);
        let snapshot = snapshot.clone();
        tasks.spawn(async move {
            let update = node.run(snapshot).await;
            (id, update)
        });
        Ok(())
    }
}
