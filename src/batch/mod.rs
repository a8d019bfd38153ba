//! # 批量处理模块
//!
//! 提供统一的并行批量处理能力。
//!
//! ## 功能
//! - 固定大小的工作线程池
//! - 并行处理与结合律归约
//! - 进度反馈
//!
//! ## 依赖关系
//! - 被 `flux/aggregate.rs` 和 `commands/run.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod runner;

pub use runner::BatchRunner;
