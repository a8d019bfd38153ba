//! # 化学动力学模块
//!
//! 单元级反应速率计算（外部协作者的默认实现）。
//!
//! ## 子模块
//! - `thermo`: NASA-7 热力学多项式
//! - `evaluator`: 状态方程与质量作用定律速率计算
//!
//! ## 依赖关系
//! - 被 `flux/aggregate.rs` 和 `commands/run.rs` 使用
//! - 使用 `models/mechanism.rs`

pub mod evaluator;
pub mod thermo;

pub use evaluator::{MassActionEvaluator, RateEvaluator, RateScratch, ThermodynamicState};
