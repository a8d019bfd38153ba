//! # run 子命令 CLI 定义
//!
//! 选项名沿用后处理工具的传统写法（`--QPDatom`, `--finestLevel` 等）。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 由 `config.rs` 解析为 `RunConfig`

use clap::Args;
use std::path::PathBuf;

/// run 子命令参数
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Snapshot directory (Header.yaml + patch data)
    #[arg(long)]
    pub infile: PathBuf,

    /// Finest refinement level to include (default: finest level present)
    #[arg(long = "finestLevel")]
    pub finest_level: Option<usize>,

    /// Tracer element symbol
    #[arg(long = "QPDatom", default_value = "C")]
    pub atom: String,

    /// Label written on the first line of the output (default: infile)
    #[arg(long = "QPDlabel")]
    pub label: Option<String>,

    /// Output file (default: <infile>_QPD.dat)
    #[arg(long = "QPDfileName")]
    pub file_name: Option<PathBuf>,

    /// Print the constructed edges
    #[arg(long = "dump_edges", default_value_t = false)]
    pub dump_edges: bool,

    /// Extra multiplicative scale on top of the reference normalization
    #[arg(long = "scaleNorm", allow_negative_numbers = true)]
    pub scale_norm: Option<f64>,

    /// Species for the per-partner flux diagnostic
    #[arg(long = "fuelSpec")]
    pub fuel_spec: Option<String>,

    /// Mechanism file (default: <infile>/mechanism.yaml)
    #[arg(short, long)]
    pub mechanism: Option<PathBuf>,

    /// Reference species pair; destruction of the first is counted positive
    #[arg(
        long = "refSpec",
        num_args = 2,
        value_names = ["FIRST", "SECOND"],
        default_values = ["CH4", "CH3"]
    )]
    pub ref_spec: Vec<String>,

    /// Maximum number of direct hops collapsed into one edge
    #[arg(long = "maxHops", default_value_t = 1)]
    pub max_hops: usize,

    /// Number of worker threads (0 = auto)
    #[arg(short, long, env = "QPD_JOBS", default_value_t = 0)]
    pub jobs: usize,

    /// Print per-level integration statistics
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
