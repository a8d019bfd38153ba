//! # 运行配置
//!
//! 把 `run` 子命令参数解析为经过校验的 `RunConfig`，
//! 在任何耗时计算之前发现配置错误。
//!
//! ## 默认值
//! - 机理文件: `<infile>/mechanism.yaml`
//! - 标签: infile
//! - 输出文件: `<infile>_QPD.dat`
//! - 最细层: 快照中的最细层
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用
//! - 使用 `cli/run.rs`, `flux/`

use crate::cli::run::RunArgs;
use crate::error::{QpdError, Result};
use crate::flux::{EdgeOptions, ReferencePair};
use crate::models::{Hierarchy, Mechanism};

use std::path::PathBuf;

/// 默认机理文件名（位于快照目录内）
pub const MECHANISM_FILE: &str = "mechanism.yaml";

/// 校验后的运行配置
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub infile: PathBuf,
    pub mechanism: PathBuf,
    /// `None` 表示使用快照的最细层
    pub finest_level: Option<usize>,
    pub element: String,
    pub label: String,
    pub output: PathBuf,
    pub dump_edges: bool,
    pub scale: Option<f64>,
    pub fuel: Option<String>,
    pub reference: ReferencePair,
    pub edge_options: EdgeOptions,
    pub jobs: usize,
    pub verbose: bool,
}

impl RunConfig {
    pub fn from_args(args: RunArgs) -> Result<Self> {
        let infile_text = args.infile.display().to_string();
        let stem = infile_text.trim_end_matches(['/', '\\']);
        if stem.is_empty() {
            return Err(QpdError::Configuration("infile must not be empty".to_string()));
        }

        if args.atom.trim().is_empty() {
            return Err(QpdError::Configuration("QPDatom must name an element".to_string()));
        }
        if let Some(scale) = args.scale_norm {
            if !scale.is_finite() || scale == 0.0 {
                return Err(QpdError::Configuration(format!(
                    "scaleNorm must be finite and non-zero, got {}",
                    scale
                )));
            }
        }
        if args.max_hops == 0 {
            return Err(QpdError::Configuration("maxHops must be at least 1".to_string()));
        }
        let reference = match args.ref_spec.as_slice() {
            [first, second] if first != second => ReferencePair {
                first: first.clone(),
                second: second.clone(),
            },
            _ => {
                return Err(QpdError::Configuration(format!(
                    "refSpec needs two distinct species, got {:?}",
                    args.ref_spec
                )))
            }
        };

        let mechanism = args
            .mechanism
            .unwrap_or_else(|| args.infile.join(MECHANISM_FILE));
        let output = args
            .file_name
            .unwrap_or_else(|| PathBuf::from(format!("{}_QPD.dat", stem)));
        let label = args.label.unwrap_or_else(|| infile_text.clone());

        Ok(Self {
            infile: args.infile,
            mechanism,
            finest_level: args.finest_level,
            element: args.atom.trim().to_string(),
            label,
            output,
            dump_edges: args.dump_edges,
            scale: args.scale_norm,
            fuel: args.fuel_spec,
            reference,
            edge_options: EdgeOptions {
                max_hops: args.max_hops,
            },
            jobs: args.jobs,
            verbose: args.verbose,
        })
    }

    /// 参与积分的最细层
    pub fn resolve_finest_level(&self, hierarchy: &Hierarchy) -> Result<usize> {
        let present = hierarchy.finest_level();
        match self.finest_level {
            None => Ok(present),
            Some(level) if level <= present => Ok(level),
            Some(level) => Err(QpdError::Configuration(format!(
                "finestLevel {} exceeds the finest level {} of {}",
                level,
                present,
                self.infile.display()
            ))),
        }
    }

    /// 诊断组分必须存在于机理中
    pub fn check_species(&self, mechanism: &Mechanism) -> Result<()> {
        if let Some(fuel) = &self.fuel {
            if mechanism.species_index(fuel).is_none() {
                return Err(QpdError::Configuration(format!(
                    "fuelSpec '{}' is not a species of the mechanism",
                    fuel
                )));
            }
        }
        Ok(())
    }
}
