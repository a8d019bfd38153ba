//! # edges 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/edges.rs`

use clap::Args;
use std::path::PathBuf;

/// edges 子命令参数
#[derive(Args, Debug, Clone)]
pub struct EdgesArgs {
    /// Mechanism file (YAML)
    #[arg(short, long)]
    pub mechanism: PathBuf,

    /// Tracer element symbol
    #[arg(long = "QPDatom", default_value = "C")]
    pub atom: String,

    /// Maximum number of direct hops collapsed into one edge
    #[arg(long = "maxHops", default_value_t = 1)]
    pub max_hops: usize,
}
