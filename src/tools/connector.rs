//! 由数据源连接器提供的能力工具
//!
//! 每个来源一个工具（mail_search / calendar_events / chat_messages / issues_search）：
//! args 解析为 FetchCriteria，缺省时用该来源的默认条件；返回记录的 JSON 文本。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::sources::{FetchCriteria, SourceConnector, SourceKind};
use crate::tools::{Tool, ToolBackend};

/// 工具名
pub fn tool_name(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Mail => "mail_search",
        SourceKind::Calendar => "calendar_events",
        SourceKind::Chat => "chat_messages",
        SourceKind::Issues => "issues_search",
    }
}

fn tool_description(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Mail => "Search recent emails. Returns a JSON array of messages (id, title, body, from).",
        SourceKind::Calendar => "List calendar events. Returns a JSON array of events (id, title, time, location).",
        SourceKind::Chat => "Read recent chat messages. Returns a JSON array of messages (id, title, body, channel).",
        SourceKind::Issues => "Search issue tracker tickets. Returns a JSON array of tickets (id, title, status, priority).",
    }
}

/// 把一个 SourceConnector 暴露为能力工具
pub struct ConnectorTool {
    connector: Arc<dyn SourceConnector>,
    default_criteria: FetchCriteria,
}

impl ConnectorTool {
    pub fn new(connector: Arc<dyn SourceConnector>, default_criteria: FetchCriteria) -> Self {
        Self {
            connector,
            default_criteria,
        }
    }

    fn criteria_from_args(&self, args: &Value) -> Result<FetchCriteria, String> {
        let has_scope = args.get("scope").is_some();
        if !has_scope {
            let mut criteria = self.default_criteria;
            if let Some(limit) = args.get("limit").and_then(Value::as_u64) {
                criteria.limit = Some(limit as usize);
            }
            return Ok(criteria);
        }
        serde_json::from_value(args.clone()).map_err(|e| format!("invalid arguments: {}", e))
    }
}

#[async_trait]
impl Tool for ConnectorTool {
    fn name(&self) -> &str {
        tool_name(self.connector.kind())
    }

    fn description(&self) -> &str {
        tool_description(self.connector.kind())
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "scope": {
                    "type": "string",
                    "enum": ["today", "upcoming", "assigned", "created", "updated"],
                    "description": "Time window; omit to use the source default"
                },
                "days": {
                    "type": "integer",
                    "description": "Window size in days (required for every scope except today)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of records"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let criteria = self.criteria_from_args(&args)?;
        let records = self
            .connector
            .fetch(&criteria)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&records).map_err(|e| e.to_string())
    }
}

/// 基于连接器的工具后端：类别即连接器的来源
pub struct ConnectorBackend {
    connector: Arc<dyn SourceConnector>,
    default_criteria: FetchCriteria,
}

impl ConnectorBackend {
    pub fn new(connector: Arc<dyn SourceConnector>, default_criteria: FetchCriteria) -> Self {
        Self {
            connector,
            default_criteria,
        }
    }
}

#[async_trait]
impl ToolBackend for ConnectorBackend {
    fn category(&self) -> SourceKind {
        self.connector.kind()
    }

    async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>, String> {
        let tool: Arc<dyn Tool> = Arc::new(ConnectorTool::new(
            self.connector.clone(),
            self.default_criteria,
        ));
        Ok(vec![tool])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ConnectorError, FailingConnector, Record, StaticConnector};
    use serde_json::json;

    fn issues_tool() -> ConnectorTool {
        ConnectorTool::new(
            Arc::new(StaticConnector::demo(SourceKind::Issues)),
            FetchCriteria::today(),
        )
    }

    #[tokio::test]
    async fn test_execute_returns_records_json() {
        let tool = issues_tool();
        assert_eq!(tool.name(), "issues_search");
        let out = tool.execute(json!({})).await.unwrap();
        let records: Vec<Record> = serde_json::from_str(&out).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_limit_and_scope_args() {
        let tool = issues_tool();
        let out = tool.execute(json!({"limit": 1})).await.unwrap();
        assert_eq!(serde_json::from_str::<Vec<Record>>(&out).unwrap().len(), 1);

        let out = tool
            .execute(json!({"scope": "updated", "days": 3, "limit": 2}))
            .await
            .unwrap();
        assert_eq!(serde_json::from_str::<Vec<Record>>(&out).unwrap().len(), 2);

        let err = tool.execute(json!({"scope": "yesterday"})).await.unwrap_err();
        assert!(err.starts_with("invalid arguments"));
    }

    #[tokio::test]
    async fn test_connector_error_surfaces_as_tool_error() {
        let tool = ConnectorTool::new(
            Arc::new(FailingConnector::new(
                SourceKind::Chat,
                ConnectorError::Quota("rate limited".into()),
            )),
            FetchCriteria::today(),
        );
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(err.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_backend_category_is_connector_kind() {
        let backend = ConnectorBackend::new(
            Arc::new(StaticConnector::demo(SourceKind::Calendar)),
            FetchCriteria::today(),
        );
        assert_eq!(backend.category(), SourceKind::Calendar);
        let tools = backend.discover().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "calendar_events");
    }
}
