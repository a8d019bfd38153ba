//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `run`: 由网格快照生成反应路径图
//! - `edges`: 仅由反应机理构建并打印边集合
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: run, edges

pub mod edges;
pub mod run;

use clap::{Parser, Subcommand};

/// qpd - 燃烧快照反应路径图后处理
#[derive(Parser)]
#[command(name = "qpd")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Reaction path diagrams from adaptive-mesh combustion snapshots", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Integrate reaction rates over a snapshot and write the path diagram fluxes
    Run(run::RunArgs),

    /// Build and print the species-pair edges of a mechanism for a tracer element
    Edges(edges::EdgesArgs),
}
