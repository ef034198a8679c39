//! 查询路由：为一条自然语言查询挑选需要启用的工具类别

pub mod selector;

pub use selector::{parse_categories, ToolSelector};
