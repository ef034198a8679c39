//! 数据源层：来源类型、单条记录、采集条件与连接器抽象
//!
//! 具体的邮件 / 日历 / 聊天 / 工单 API 客户端不在本 crate 内，
//! 只通过 SourceConnector trait 接入；fixture 提供演示与测试用的静态连接器。

pub mod connector;
pub mod fixture;
pub mod record;

pub use connector::{ConnectorError, FetchCriteria, FetchScope, SourceConnector};
pub use fixture::{demo_records, FailingConnector, StaticConnector};
pub use record::{Record, SourceKind};
