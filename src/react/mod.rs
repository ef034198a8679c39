//! 推理层：Planner、工具调用循环、会话线程检查点

pub mod checkpoint;
pub mod loop_;
pub mod planner;

pub use checkpoint::{CheckpointStore, DEFAULT_THREAD};
pub use loop_::ReasoningLoop;
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall};
