//! 静态连接器：演示数据与测试替身
//!
//! StaticConnector 返回固定记录（可选延迟，用于模拟慢速来源），并统计调用次数；
//! FailingConnector 每次都返回指定错误。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::{ConnectorError, FetchCriteria, Record, SourceConnector, SourceKind};

/// 返回固定记录的连接器
pub struct StaticConnector {
    kind: SourceKind,
    records: Vec<Record>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticConnector {
    pub fn new(kind: SourceKind, records: Vec<Record>) -> Self {
        Self {
            kind,
            records,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// 演示数据（CLI 无外部凭据时使用）
    pub fn demo(kind: SourceKind) -> Self {
        Self::new(kind, demo_records(kind))
    }

    /// 每次 fetch 前等待，用于打乱完成顺序
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceConnector for StaticConnector {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, criteria: &FetchCriteria) -> Result<Vec<Record>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let limit = criteria.limit.unwrap_or(usize::MAX);
        Ok(self.records.iter().take(limit).cloned().collect())
    }
}

/// 总是失败的连接器
pub struct FailingConnector {
    kind: SourceKind,
    error: ConnectorError,
    calls: AtomicUsize,
}

impl FailingConnector {
    pub fn new(kind: SourceKind, error: ConnectorError) -> Self {
        Self {
            kind,
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceConnector for FailingConnector {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _criteria: &FetchCriteria) -> Result<Vec<Record>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// 各来源的演示记录
pub fn demo_records(kind: SourceKind) -> Vec<Record> {
    let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2025, 6, 22, h, m, 0).single();
    let stamp = |r: Record, h: u32, m: u32| match at(h, m) {
        Some(ts) => r.with_timestamp(ts),
        None => r,
    };

    match kind {
        SourceKind::Mail => vec![
            stamp(
                Record::new("mail-1", "Project Status Update - Urgent Review Needed")
                    .with_field("from", "John Smith <john.smith@example.com>")
                    .with_body("We need your urgent review on the project status report before tomorrow's meeting."),
                8,
                30,
            ),
            stamp(
                Record::new("mail-2", "Quarterly Review Documents")
                    .with_field("from", "HR Department <hr@example.com>")
                    .with_body("Please complete your quarterly review documents by Wednesday."),
                7,
                15,
            ),
            stamp(
                Record::new("mail-3", "Team Weekly: Sprint Planning Agenda")
                    .with_field("from", "Team Lead <team.lead@example.com>")
                    .with_body("Come prepared with task estimates and blockers."),
                6,
                45,
            ),
        ],
        SourceKind::Calendar => vec![
            stamp(
                Record::new("event-1", "Daily Standup")
                    .with_field("location", "Video call")
                    .with_field("end", "10:15")
                    .with_body("Discuss ongoing tasks and blockers."),
                10,
                0,
            ),
            stamp(
                Record::new("event-2", "Project Review")
                    .with_field("location", "Conference Room A")
                    .with_field("end", "15:00")
                    .with_body("Prepare a brief update on team progress."),
                14,
                0,
            ),
        ],
        SourceKind::Chat => vec![
            stamp(
                Record::new("msg-1", "Project Alpha Team")
                    .with_field("from", "Project Manager")
                    .with_body("Can everyone update their tasks in the project board by EOD?"),
                16,
                45,
            ),
            stamp(
                Record::new("msg-2", "Cross-department Collaboration")
                    .with_field("from", "Marketing Director")
                    .with_body("We need technical specifications for the product launch by Thursday."),
                11,
                15,
            ),
        ],
        SourceKind::Issues => vec![
            Record::new("PROJ-123", "Fix critical authentication bug in login flow")
                .with_field("status", "In Progress")
                .with_field("priority", "High")
                .with_field("due", "2025-06-24")
                .with_body("Users are experiencing intermittent login failures."),
            Record::new("PROJ-456", "Implement new dashboard feature")
                .with_field("status", "To Do")
                .with_field("priority", "Medium")
                .with_field("due", "2025-06-30"),
            Record::new("PROJ-789", "Update documentation for API endpoints")
                .with_field("status", "To Do")
                .with_field("priority", "Low")
                .with_field("due", "2025-07-15"),
        ],
    }
}
