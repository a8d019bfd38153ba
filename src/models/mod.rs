//! # 数据模型模块
//!
//! 定义反应机理、网格层级和反应累计量的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `kinetics/`, `flux/` 和 `commands/` 使用
//! - 子模块: mechanism, hierarchy, totals

pub mod hierarchy;
pub mod mechanism;
pub mod totals;

pub use hierarchy::{FieldSource, Hierarchy, IndexBox, Level, Patch, PatchData};
pub use mechanism::{Arrhenius, Mechanism, RateModel, Reaction, ReverseRate, Species, Troe};
pub use totals::ReactionTotals;
