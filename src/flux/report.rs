//! # 通量报告输出
//!
//! ## 文件格式
//! ```text
//! <标签>
//! <组分1> <组分2> ...
//! <左组分> <右组分> <归一化正向通量> <归一化逆向通量取负>
//! ...
//! ```
//! 数值以 `{:.9e}` 科学计数法输出，不输出 `-0`。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `flux/normalize.rs`

use crate::error::{QpdError, Result};
use crate::flux::normalize::FluxTable;

use std::fmt;
use std::fs;
use std::path::Path;

/// 完整的通量报告
#[derive(Debug, Clone, PartialEq)]
pub struct FluxReport {
    pub label: String,
    pub species: Vec<String>,
    pub table: FluxTable,
}

/// 格式化数值，`-0.0` 输出为 `0`
fn number(value: f64) -> String {
    format!("{:.9e}", value + 0.0)
}

impl fmt::Display for FluxReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        writeln!(f, "{}", self.species.join(" "))?;
        for row in &self.table.rows {
            writeln!(
                f,
                "{} {} {} {}",
                row.left,
                row.right,
                number(row.forward),
                number(row.reverse)
            )?;
        }
        Ok(())
    }
}

impl FluxReport {
    /// 写入文件
    pub fn write_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string()).map_err(|e| QpdError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }
}
