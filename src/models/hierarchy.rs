//! # 自适应网格层级数据模型
//!
//! 描述嵌套网格层级的几何信息：索引盒、层、补丁。
//! 场数据本身由 `FieldSource` 按补丁提供，不在此处持有。
//!
//! ## 约定
//! - 索引盒为闭区间 `[lo, hi]`
//! - 单元遍历顺序为 x 最快（与补丁 CSV 行顺序一致）
//! - `ref_ratio` 为本层到下一更细层的加密比
//!
//! ## 依赖关系
//! - 被 `parsers/snapshot.rs` 构造（并实现 `FieldSource`）
//! - 被 `flux/aggregate.rs` 使用

use crate::error::Result;

/// 整数索引盒（闭区间）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBox {
    pub lo: Vec<i64>,
    pub hi: Vec<i64>,
}

impl IndexBox {
    pub fn new(lo: Vec<i64>, hi: Vec<i64>) -> Self {
        Self { lo, hi }
    }

    /// 空间维数
    pub fn dim(&self) -> usize {
        self.lo.len()
    }

    /// 各方向单元数
    pub fn lengths(&self) -> Vec<i64> {
        self.lo
            .iter()
            .zip(&self.hi)
            .map(|(lo, hi)| (hi - lo + 1).max(0))
            .collect()
    }

    pub fn num_cells(&self) -> usize {
        self.lengths().iter().product::<i64>() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.lo.iter().zip(&self.hi).any(|(lo, hi)| hi < lo)
    }

    /// 粗化到粗层分辨率
    pub fn coarsen(&self, ratio: i64) -> IndexBox {
        IndexBox {
            lo: self.lo.iter().map(|v| v.div_euclid(ratio)).collect(),
            hi: self.hi.iter().map(|v| v.div_euclid(ratio)).collect(),
        }
    }

    /// 是否落在粗层单元边界上（粗化后不丢失部分单元）
    pub fn is_aligned(&self, ratio: i64) -> bool {
        self.lo.iter().all(|v| v.rem_euclid(ratio) == 0)
            && self.hi.iter().all(|v| (v + 1).rem_euclid(ratio) == 0)
    }

    /// 与另一盒的交集
    pub fn intersection(&self, other: &IndexBox) -> Option<IndexBox> {
        let lo: Vec<i64> = self.lo.iter().zip(&other.lo).map(|(a, b)| *a.max(b)).collect();
        let hi: Vec<i64> = self.hi.iter().zip(&other.hi).map(|(a, b)| *a.min(b)).collect();
        let isect = IndexBox { lo, hi };
        if isect.is_empty() {
            None
        } else {
            Some(isect)
        }
    }

    pub fn contains(&self, index: &[i64]) -> bool {
        index
            .iter()
            .zip(self.lo.iter().zip(&self.hi))
            .all(|(i, (lo, hi))| lo <= i && i <= hi)
    }

    /// 另一盒是否完全包含于本盒
    pub fn contains_box(&self, other: &IndexBox) -> bool {
        self.contains(&other.lo) && self.contains(&other.hi)
    }

    /// 单元的线性编号（x 最快）
    pub fn linear_index(&self, index: &[i64]) -> usize {
        let lengths = self.lengths();
        let mut offset = 0i64;
        let mut stride = 1i64;
        for d in 0..self.dim() {
            offset += (index[d] - self.lo[d]) * stride;
            stride *= lengths[d];
        }
        offset as usize
    }

    /// 按 x 最快的顺序遍历所有单元索引
    pub fn cells(&self) -> Vec<Vec<i64>> {
        let mut cells = Vec::with_capacity(self.num_cells());
        if self.is_empty() {
            return cells;
        }
        let mut current = self.lo.clone();
        loop {
            cells.push(current.clone());
            let mut d = 0;
            loop {
                if d == self.dim() {
                    return cells;
                }
                if current[d] < self.hi[d] {
                    current[d] += 1;
                    break;
                }
                current[d] = self.lo[d];
                d += 1;
            }
        }
    }
}

/// 网格补丁（某层上的一个矩形块）
#[derive(Debug, Clone)]
pub struct Patch {
    pub region: IndexBox,
    /// 数据文件（相对快照根目录）
    pub file: String,
}

/// 加密层
#[derive(Debug, Clone)]
pub struct Level {
    /// 该层分辨率下的整个计算域
    pub domain: IndexBox,
    /// 到下一更细层的加密比
    pub ref_ratio: Option<i64>,
    pub patches: Vec<Patch>,
}

/// 网格层级
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub prob_lo: Vec<f64>,
    pub prob_hi: Vec<f64>,
    pub levels: Vec<Level>,
}

impl Hierarchy {
    pub fn dim(&self) -> usize {
        self.prob_lo.len()
    }

    /// 最细层编号
    pub fn finest_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// 计算域物理体积
    pub fn domain_volume(&self) -> f64 {
        self.prob_lo
            .iter()
            .zip(&self.prob_hi)
            .map(|(lo, hi)| hi - lo)
            .product()
    }

    /// 某层单元的物理体积（由该层网格间距决定）
    pub fn cell_volume(&self, level: usize) -> f64 {
        let lengths = self.levels[level].domain.lengths();
        self.prob_lo
            .iter()
            .zip(&self.prob_hi)
            .zip(&lengths)
            .map(|((lo, hi), n)| (hi - lo) / *n as f64)
            .product()
    }

    /// 更细层在本层分辨率下的覆盖区域
    ///
    /// `finest` 之外的层视为不存在，此时返回空覆盖。
    pub fn footprint(&self, level: usize, finest: usize) -> Vec<IndexBox> {
        if level >= finest || level + 1 >= self.levels.len() {
            return Vec::new();
        }
        let ratio = self.levels[level].ref_ratio.unwrap_or(1);
        self.levels[level + 1]
            .patches
            .iter()
            .map(|p| p.region.coarsen(ratio))
            .collect()
    }
}

/// 一个补丁上按名称提取的场数据
#[derive(Debug, Clone)]
pub struct PatchData {
    /// 按请求顺序排列的分量，每个分量按单元线性编号存储
    pub components: Vec<Vec<f64>>,
}

impl PatchData {
    pub fn value(&self, component: usize, cell: usize) -> f64 {
        self.components[component][cell]
    }
}

/// 网格层级与场数据的来源
pub trait FieldSource: Sync {
    fn hierarchy(&self) -> &Hierarchy;

    /// 该层是否提供指定名称的场
    fn has_field(&self, level: usize, name: &str) -> bool;

    /// 读取某个补丁上的指定场
    fn fill_patch(&self, level: usize, patch: usize, names: &[String]) -> Result<PatchData>;
}
