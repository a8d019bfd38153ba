//! # 反应路径通量模块
//!
//! 从网格快照与反应机理生成反应路径图的核心流程。
//!
//! ## 子模块
//! - `aggregate`: 多层网格的体积积分（屏蔽被细层覆盖的单元）
//! - `graph`: 由机理与示踪元素构建组分对边集合
//! - `normalize`: 边通量汇总与参考边归一化
//! - `partner`: 指定组分的反应伙伴诊断
//! - `report`: 通量报告输出
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/`, `kinetics/`, `batch/`

pub mod aggregate;
pub mod graph;
pub mod normalize;
pub mod partner;
pub mod report;

pub use aggregate::{aggregate_hierarchy, required_fields, AggregateOptions, LevelSummary};
pub use graph::{build_edges, EdgeOptions, EdgeSet};
pub use normalize::{normalize, ReferencePair};
pub use partner::{partner_breakdown, PartnerBreakdown};
pub use report::FluxReport;
