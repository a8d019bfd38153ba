//! # qpd - 燃烧快照反应路径图后处理
//!
//! 对自适应网格燃烧模拟快照做多层体积积分，按示踪元素构建组分对
//! 通量图，并以参考边归一化后输出。
//!
//! ## 子命令
//! - `run`   - 生成反应路径图通量文件
//! - `edges` - 仅由机理构建并打印边集合
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── config.rs   (参数校验与默认值)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (机理与快照读取)
//!   │     ├── kinetics/  (单元反应速率)
//!   │     ├── flux/      (积分、建图、归一化、报告)
//!   │     ├── batch/     (线程池)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod config;
mod error;
mod flux;
mod kinetics;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
