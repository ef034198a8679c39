pub mod connector;
pub mod executor;
pub mod registry;
pub mod schema;

pub use connector::{ConnectorBackend, ConnectorTool};
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolBackend, ToolRegistry, ToolSet, ToolStatus, ToolStatusKind};
pub use schema::tool_call_schema_json;
