//! # 解析器模块
//!
//! 提供反应机理文件和网格快照的读取器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: mechanism, snapshot

pub mod mechanism;
pub mod snapshot;

pub use mechanism::parse_mechanism_file;
pub use snapshot::open_snapshot;
