//! 来源类型与记录
//!
//! SourceKind 同时作为工具能力类别使用（mail / calendar / chat / issues），
//! Record 是来源中的一条原子数据（一封邮件、一个日程、一条消息、一张工单）。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 四种数据来源（也是工具类别）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Mail,
    Calendar,
    Chat,
    Issues,
}

impl SourceKind {
    /// 固定顺序：工具过滤、状态输出与缓存键都按此顺序
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Mail,
        SourceKind::Calendar,
        SourceKind::Chat,
        SourceKind::Issues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Mail => "mail",
            SourceKind::Calendar => "calendar",
            SourceKind::Chat => "chat",
            SourceKind::Issues => "issues",
        }
    }

    /// 采集结果为空时的固定摘要（不调用 Oracle）
    pub fn empty_summary(&self) -> &'static str {
        match self {
            SourceKind::Mail => "No recent emails found.",
            SourceKind::Calendar => "No upcoming meetings found.",
            SourceKind::Chat => "No recent chat messages found.",
            SourceKind::Issues => "No recent issue activity found.",
        }
    }

    /// 汇总时槽位缺失的占位摘要
    pub fn placeholder_summary(&self) -> String {
        format!("No {} data available.", self.as_str())
    }

    /// 采集失败时的摘要
    pub fn error_summary(&self, err: impl fmt::Display) -> String {
        format!("Error in {} collector: {}", self.as_str(), err)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    /// 大小写与首尾空白不敏感
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("Unknown source kind: {}", s.trim()))
    }
}

/// 单条记录：id 在同一来源内唯一，fields 保存来源特有字段（from / location / status / priority 等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: String::new(),
            timestamp: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// 渲染为摘要 prompt 使用的纯文本块
    pub fn render(&self) -> String {
        let mut out = format!("Id: {}\nTitle: {}\n", self.id, self.title);
        if let Some(ts) = &self.timestamp {
            out.push_str(&format!("Time: {}\n", ts.to_rfc3339()));
        }
        for (k, v) in &self.fields {
            out.push_str(&format!("{}: {}\n", k, v));
        }
        if !self.body.is_empty() {
            out.push_str(&format!("Body: {}\n", self.body));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_ignores_case_and_whitespace() {
        assert_eq!(" Mail ".parse::<SourceKind>(), Ok(SourceKind::Mail));
        assert_eq!("ISSUES".parse::<SourceKind>(), Ok(SourceKind::Issues));
        assert!("jira".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_render_contains_fields() {
        let record = Record::new("PROJ-1", "Fix login")
            .with_field("status", "In Progress")
            .with_body("Users cannot log in");
        let text = record.render();
        assert!(text.contains("Id: PROJ-1"));
        assert!(text.contains("status: In Progress"));
        assert!(text.contains("Body: Users cannot log in"));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SourceKind::Calendar).unwrap();
        assert_eq!(json, "\"calendar\"");
    }
}
