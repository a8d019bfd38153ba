//! # 层级积分器
//!
//! 在自适应网格层级上对每个反应的正/逆反应进度做体积积分。
//!
//! ## 算法概述
//! 1. 从粗到细逐层处理（到配置的最细层为止）
//! 2. 本层被更细层覆盖的单元被屏蔽，其体积计入更细层
//! 3. 未屏蔽单元: 读取状态 → 计算速率 → `rate × cell_volume` 累加
//! 4. 补丁的部分累计量在线程池中以 `ReactionTotals::merge` 归约，
//!    各层结果再按同样方式合并
//!
//! 每个物理位置只在覆盖它的最细层计入一次，因此结果与层、补丁的
//! 处理顺序无关（在浮点误差范围内）。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `models/hierarchy.rs` (FieldSource), `kinetics/evaluator.rs`
//! - 使用 `batch/runner.rs` 并行处理补丁, `utils/progress.rs` 显示进度

use crate::batch::BatchRunner;
use crate::error::{QpdError, Result};
use crate::kinetics::{RateEvaluator, RateScratch, ThermodynamicState};
use crate::models::{FieldSource, IndexBox, Mechanism, ReactionTotals};
use crate::utils::progress;

/// 温度场名称
pub const TEMPERATURE_FIELD: &str = "temp";
/// 密度场名称
pub const DENSITY_FIELD: &str = "density";

/// 组分摩尔分数场名称
pub fn mole_fraction_field(species: &str) -> String {
    format!("X({})", species)
}

/// 速率计算所需的场，按组分顺序排列，最后是温度与密度
pub fn required_fields(mechanism: &Mechanism) -> Vec<String> {
    let mut fields: Vec<String> = mechanism
        .species_names()
        .into_iter()
        .map(mole_fraction_field)
        .collect();
    fields.push(TEMPERATURE_FIELD.to_string());
    fields.push(DENSITY_FIELD.to_string());
    fields
}

/// 积分选项
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// 参与积分的最细层
    pub finest_level: usize,
    /// 是否显示每层进度条
    pub show_progress: bool,
}

/// 单层积分统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelSummary {
    pub level: usize,
    pub patches: usize,
    /// 参与积分的单元数
    pub cells: usize,
    /// 被更细层覆盖而屏蔽的单元数
    pub masked: usize,
    /// 参与积分的体积
    pub volume: f64,
}

/// 积分结果
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub totals: ReactionTotals,
    pub levels: Vec<LevelSummary>,
}

/// 一个补丁的部分结果
#[derive(Debug, Clone)]
struct PatchPartial {
    totals: ReactionTotals,
    cells: usize,
    masked: usize,
}

impl PatchPartial {
    fn zeros(num_reactions: usize) -> Self {
        Self {
            totals: ReactionTotals::zeros(num_reactions),
            cells: 0,
            masked: 0,
        }
    }

    fn merge(self, other: PatchPartial) -> PatchPartial {
        PatchPartial {
            totals: self.totals.merge(other.totals),
            cells: self.cells + other.cells,
            masked: self.masked + other.masked,
        }
    }
}

/// 每个工作线程复用的缓冲区
struct CellScratch {
    mole_fractions: Vec<f64>,
    rates: RateScratch,
}

/// 检查每一层是否提供全部所需场
pub fn check_fields<S>(source: &S, finest_level: usize, fields: &[String]) -> Result<()>
where
    S: FieldSource + ?Sized,
{
    for level in 0..=finest_level {
        if let Some(field) = fields.iter().find(|f| !source.has_field(level, f)) {
            return Err(QpdError::MissingField {
                level,
                field: field.clone(),
            });
        }
    }
    Ok(())
}

/// 本层单元的屏蔽表（按单元线性编号）
fn coverage_mask(region: &IndexBox, footprint: &[IndexBox]) -> Vec<bool> {
    let mut mask = vec![false; region.num_cells()];
    for covered in footprint.iter().filter_map(|b| region.intersection(b)) {
        for cell in covered.cells() {
            mask[region.linear_index(&cell)] = true;
        }
    }
    mask
}

/// 对单个补丁积分
#[allow(clippy::too_many_arguments)]
fn integrate_patch<S, E>(
    source: &S,
    evaluator: &E,
    level: usize,
    patch: usize,
    fields: &[String],
    footprint: &[IndexBox],
    cell_volume: f64,
    scratch: &mut CellScratch,
) -> Result<PatchPartial>
where
    S: FieldSource + ?Sized,
    E: RateEvaluator + ?Sized,
{
    let num_species = evaluator.num_species();
    let mut partial = PatchPartial::zeros(evaluator.num_reactions());

    let region = &source.hierarchy().levels[level].patches[patch].region;
    let mask = coverage_mask(region, footprint);
    partial.masked = mask.iter().filter(|&&m| m).count();
    if partial.masked == mask.len() {
        return Ok(partial);
    }

    let data = source.fill_patch(level, patch, fields)?;
    for (cell, &masked) in mask.iter().enumerate() {
        if masked {
            continue;
        }
        for (k, x) in scratch.mole_fractions.iter_mut().enumerate() {
            *x = data.value(k, cell);
        }
        let state = ThermodynamicState {
            mole_fractions: &scratch.mole_fractions,
            temperature: data.value(num_species, cell),
            density: data.value(num_species + 1, cell),
        };
        evaluator.evaluate(&state, &mut scratch.rates);
        partial.totals.accumulate(
            &scratch.rates.rates.forward,
            &scratch.rates.rates.reverse,
            cell_volume,
        );
        partial.cells += 1;
    }
    Ok(partial)
}

/// 对单层积分
pub fn integrate_level<S, E>(
    source: &S,
    evaluator: &E,
    level: usize,
    options: &AggregateOptions,
    fields: &[String],
    runner: &BatchRunner,
) -> Result<(ReactionTotals, LevelSummary)>
where
    S: FieldSource + ?Sized,
    E: RateEvaluator + ?Sized,
{
    let hierarchy = source.hierarchy();
    let footprint = hierarchy.footprint(level, options.finest_level);
    let cell_volume = hierarchy.cell_volume(level);
    let num_patches = hierarchy.levels[level].patches.len();
    let num_reactions = evaluator.num_reactions();

    let pb = progress::create_level_bar(level, num_patches, options.show_progress);
    let partial = runner.fold_reduce(
        num_patches,
        &pb,
        || CellScratch {
            mole_fractions: vec![0.0; evaluator.num_species()],
            rates: evaluator.scratch(),
        },
        |scratch, patch| {
            integrate_patch(
                source,
                evaluator,
                level,
                patch,
                fields,
                &footprint,
                cell_volume,
                scratch,
            )
        },
        || PatchPartial::zeros(num_reactions),
        PatchPartial::merge,
    )?;
    pb.finish_and_clear();

    let summary = LevelSummary {
        level,
        patches: num_patches,
        cells: partial.cells,
        masked: partial.masked,
        volume: partial.totals.volume,
    };
    Ok((partial.totals, summary))
}

/// 对整个层级积分，得到全局反应累计量
pub fn aggregate_hierarchy<S, E>(
    source: &S,
    evaluator: &E,
    fields: &[String],
    options: &AggregateOptions,
    runner: &BatchRunner,
) -> Result<Aggregation>
where
    S: FieldSource + ?Sized,
    E: RateEvaluator + ?Sized,
{
    check_fields(source, options.finest_level, fields)?;

    let mut totals = ReactionTotals::zeros(evaluator.num_reactions());
    let mut levels = Vec::with_capacity(options.finest_level + 1);
    for level in 0..=options.finest_level {
        let (level_totals, summary) =
            integrate_level(source, evaluator, level, options, fields, runner)?;
        totals = totals.merge(level_totals);
        levels.push(summary);
    }

    Ok(Aggregation { totals, levels })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::mechanism::tests::{reaction, species};
    use crate::models::{Hierarchy, Level, Patch, PatchData};

    /// 内存中的场数据：每个场在整个层上取常数或按单元编号给定
    pub(crate) struct MemorySource {
        pub hierarchy: Hierarchy,
        pub fields: Vec<String>,
        /// (层, 补丁) → 每个场按单元的取值
        pub values: Vec<Vec<Vec<Vec<f64>>>>,
    }

    impl MemorySource {
        /// 所有场在所有单元上取常数
        pub(crate) fn uniform(hierarchy: Hierarchy, fields: Vec<String>, value: f64) -> Self {
            let values = hierarchy
                .levels
                .iter()
                .map(|level| {
                    level
                        .patches
                        .iter()
                        .map(|p| vec![vec![value; p.region.num_cells()]; fields.len()])
                        .collect()
                })
                .collect();
            Self {
                hierarchy,
                fields,
                values,
            }
        }
    }

    impl FieldSource for MemorySource {
        fn hierarchy(&self) -> &Hierarchy {
            &self.hierarchy
        }

        fn has_field(&self, _level: usize, name: &str) -> bool {
            self.fields.iter().any(|f| f == name)
        }

        fn fill_patch(&self, level: usize, patch: usize, names: &[String]) -> Result<PatchData> {
            let components = names
                .iter()
                .map(|name| {
                    let k = self.fields.iter().position(|f| f == name).ok_or_else(|| {
                        QpdError::MissingField {
                            level,
                            field: name.clone(),
                        }
                    })?;
                    Ok(self.values[level][patch][k].clone())
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(PatchData { components })
        }
    }

    /// 每个单元每个反应的速率为常数（正向取温度值，便于区分层）
    pub(crate) struct TemperatureRates {
        pub num_species: usize,
        pub num_reactions: usize,
    }

    impl RateEvaluator for TemperatureRates {
        fn num_species(&self) -> usize {
            self.num_species
        }

        fn num_reactions(&self) -> usize {
            self.num_reactions
        }

        fn evaluate(&self, state: &ThermodynamicState, scratch: &mut RateScratch) {
            scratch.rates.forward.fill(state.temperature);
            scratch.rates.reverse.fill(0.0);
        }
    }

    fn level(lo: &[i64], hi: &[i64], ratio: Option<i64>, patches: &[(&[i64], &[i64])]) -> Level {
        Level {
            domain: IndexBox::new(lo.to_vec(), hi.to_vec()),
            ref_ratio: ratio,
            patches: patches
                .iter()
                .enumerate()
                .map(|(n, (lo, hi))| Patch {
                    region: IndexBox::new(lo.to_vec(), hi.to_vec()),
                    file: format!("patch_{}", n),
                })
                .collect(),
        }
    }

    fn ab_mechanism() -> Mechanism {
        Mechanism::new(
            vec![species("A", &[("C", 1)]), species("B", &[("C", 1)])],
            vec![reaction(&[(0, 1.0)], &[(1, 1.0)])],
        )
    }

    /// 2×2 的粗层（单元体积 1）+ 覆盖粗单元 (0,0) 的 2×2 细层
    fn two_level_hierarchy() -> Hierarchy {
        Hierarchy {
            prob_lo: vec![0.0, 0.0],
            prob_hi: vec![2.0, 2.0],
            levels: vec![
                level(&[0, 0], &[1, 1], Some(2), &[(&[0, 0], &[1, 1])]),
                level(&[0, 0], &[3, 3], None, &[(&[0, 0], &[1, 1])]),
            ],
        }
    }

    fn options(finest_level: usize) -> AggregateOptions {
        AggregateOptions {
            finest_level,
            show_progress: false,
        }
    }

    #[test]
    fn test_required_fields_order() {
        let fields = required_fields(&ab_mechanism());
        assert_eq!(fields, vec!["X(A)", "X(B)", "temp", "density"]);
    }

    #[test]
    fn test_single_level_uniform_rates() {
        // 4 个体积为 1 的单元，A → B 正向速率 1
        let hierarchy = Hierarchy {
            prob_lo: vec![0.0, 0.0],
            prob_hi: vec![2.0, 2.0],
            levels: vec![level(&[0, 0], &[1, 1], None, &[(&[0, 0], &[1, 1])])],
        };
        let mech = ab_mechanism();
        let fields = required_fields(&mech);
        let source = MemorySource::uniform(hierarchy, fields.clone(), 1.0);
        let evaluator = TemperatureRates {
            num_species: 2,
            num_reactions: 1,
        };
        let runner = BatchRunner::new(2).unwrap();

        let result = aggregate_hierarchy(&source, &evaluator, &fields, &options(0), &runner).unwrap();
        assert!((result.totals.forward[0] - 4.0).abs() < 1e-12);
        assert_eq!(result.totals.reverse[0], 0.0);
        assert_eq!(result.levels[0].cells, 4);
    }

    #[test]
    fn test_covered_coarse_cell_is_masked() {
        let mech = ab_mechanism();
        let fields = required_fields(&mech);
        let mut source = MemorySource::uniform(two_level_hierarchy(), fields.clone(), 1.0);
        // 粗层温度 = 1，被覆盖的单元 (0,0) 设为 1000；细层温度 = 10
        let t = fields.iter().position(|f| f == TEMPERATURE_FIELD).unwrap();
        source.values[0][0][t] = vec![1000.0, 1.0, 1.0, 1.0];
        source.values[1][0][t] = vec![10.0; 4];

        let evaluator = TemperatureRates {
            num_species: 2,
            num_reactions: 1,
        };
        let runner = BatchRunner::new(2).unwrap();
        let result = aggregate_hierarchy(&source, &evaluator, &fields, &options(1), &runner).unwrap();

        // 3 个粗单元 × 1 × 体积 1 + 4 个细单元 × 10 × 体积 0.25
        assert!((result.totals.forward[0] - 13.0).abs() < 1e-12);
        assert_eq!(result.levels[0].masked, 1);
        assert_eq!(result.levels[0].cells, 3);
        assert_eq!(result.levels[1].cells, 4);
    }

    #[test]
    fn test_included_volume_equals_domain() {
        let hierarchy = Hierarchy {
            prob_lo: vec![0.0, 0.0, 0.0],
            prob_hi: vec![1.0, 2.0, 0.5],
            levels: vec![
                level(
                    &[0, 0, 0],
                    &[3, 3, 1],
                    Some(2),
                    &[(&[0, 0, 0], &[1, 3, 1]), (&[2, 0, 0], &[3, 3, 1])],
                ),
                level(
                    &[0, 0, 0],
                    &[7, 7, 3],
                    Some(2),
                    &[(&[2, 2, 0], &[5, 3, 3]), (&[0, 6, 0], &[1, 7, 1])],
                ),
                level(&[0, 0, 0], &[15, 15, 7], None, &[(&[4, 4, 0], &[7, 7, 3])]),
            ],
        };
        let domain_volume = hierarchy.domain_volume();
        let mech = ab_mechanism();
        let fields = required_fields(&mech);
        let source = MemorySource::uniform(hierarchy, fields.clone(), 1.0);
        let evaluator = TemperatureRates {
            num_species: 2,
            num_reactions: 1,
        };
        let runner = BatchRunner::new(3).unwrap();

        let result = aggregate_hierarchy(&source, &evaluator, &fields, &options(2), &runner).unwrap();
        assert!((result.totals.volume - domain_volume).abs() < 1e-12);
        // 速率恒为 1 时正向累计量即体积
        assert!((result.totals.forward[0] - domain_volume).abs() < 1e-12);
    }

    #[test]
    fn test_finest_level_override_ignores_finer_data() {
        let mech = ab_mechanism();
        let fields = required_fields(&mech);
        let source = MemorySource::uniform(two_level_hierarchy(), fields.clone(), 1.0);
        let evaluator = TemperatureRates {
            num_species: 2,
            num_reactions: 1,
        };
        let runner = BatchRunner::new(1).unwrap();
        let result = aggregate_hierarchy(&source, &evaluator, &fields, &options(0), &runner).unwrap();
        assert_eq!(result.levels.len(), 1);
        assert_eq!(result.levels[0].masked, 0);
        assert!((result.totals.volume - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_level_order_independence() {
        let mech = ab_mechanism();
        let fields = required_fields(&mech);
        let mut source = MemorySource::uniform(two_level_hierarchy(), fields.clone(), 1.0);
        let t = fields.iter().position(|f| f == TEMPERATURE_FIELD).unwrap();
        source.values[0][0][t] = vec![3.0, 5.0, 7.0, 11.0];
        source.values[1][0][t] = vec![13.0, 17.0, 19.0, 23.0];
        let evaluator = TemperatureRates {
            num_species: 2,
            num_reactions: 1,
        };
        let runner = BatchRunner::new(4).unwrap();
        let opts = options(1);

        let (fine, _) = integrate_level(&source, &evaluator, 1, &opts, &fields, &runner).unwrap();
        let (coarse, _) = integrate_level(&source, &evaluator, 0, &opts, &fields, &runner).unwrap();
        let reversed = ReactionTotals::zeros(1).merge(fine).merge(coarse);
        let forward = aggregate_hierarchy(&source, &evaluator, &fields, &opts, &runner).unwrap();

        assert!((reversed.forward[0] - forward.totals.forward[0]).abs() < 1e-12);
        assert!((reversed.volume - forward.totals.volume).abs() < 1e-12);
    }

    #[test]
    fn test_missing_field_is_fatal() {
        let mech = ab_mechanism();
        let fields = required_fields(&mech);
        let available: Vec<String> = fields
            .iter()
            .filter(|f| f.as_str() != DENSITY_FIELD)
            .cloned()
            .collect();
        let source = MemorySource::uniform(two_level_hierarchy(), available, 1.0);
        let evaluator = TemperatureRates {
            num_species: 2,
            num_reactions: 1,
        };
        let runner = BatchRunner::new(1).unwrap();
        let err = aggregate_hierarchy(&source, &evaluator, &fields, &options(1), &runner).unwrap_err();
        match err {
            QpdError::MissingField { level, field } => {
                assert_eq!(level, 0);
                assert_eq!(field, DENSITY_FIELD);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
