//! # 通量汇总与归一化
//!
//! 把全局反应累计量映射到每条边，并以参考边归一化。
//!
//! ## 算法概述
//! ```text
//! forward(e) = Σ_{(r,c) ∈ e} Qf[r] · c
//! reverse(e) = Σ_{(r,c) ∈ e} Qr[r] · c
//! factor     = 1 / (forward(ref) − reverse(ref))    右端点为第一个参考组分时取负
//! factor    *= scale                                 （若给定）
//! ```
//! 参考边缺失或差值为零时因子回退为 1，并返回 `Normalization` 诊断。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `flux/graph.rs`, `models/totals.rs`

use crate::error::QpdError;
use crate::flux::graph::EdgeSet;
use crate::models::ReactionTotals;

/// 单条边的未归一化通量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFlux {
    pub forward: f64,
    pub reverse: f64,
}

impl RawFlux {
    pub fn net(&self) -> f64 {
        self.forward - self.reverse
    }
}

/// 按边集合顺序计算每条边的未归一化通量
pub fn raw_fluxes(edges: &EdgeSet, totals: &ReactionTotals) -> Vec<RawFlux> {
    edges
        .iter()
        .map(|edge| {
            edge.weights
                .iter()
                .fold(RawFlux { forward: 0.0, reverse: 0.0 }, |acc, &(r, c)| RawFlux {
                    forward: acc.forward + totals.forward[r] * c,
                    reverse: acc.reverse + totals.reverse[r] * c,
                })
        })
        .collect()
}

/// 参考边的两个组分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePair {
    /// 该组分的消耗记为正
    pub first: String,
    pub second: String,
}

impl Default for ReferencePair {
    fn default() -> Self {
        Self {
            first: "CH4".to_string(),
            second: "CH3".to_string(),
        }
    }
}

/// 归一化结果
#[derive(Debug)]
pub struct Normalization {
    pub factor: f64,
    /// 参考边缺失或退化时的诊断
    pub issue: Option<QpdError>,
}

/// 由参考边计算归一化因子
pub fn normalization_factor(
    edges: &EdgeSet,
    raw: &[RawFlux],
    reference: &ReferencePair,
    scale: Option<f64>,
) -> Normalization {
    let found = edges
        .iter()
        .zip(raw)
        .find(|(edge, _)| edge.connects(&reference.first, &reference.second));

    let (factor, issue) = match found {
        None => (
            1.0,
            Some(QpdError::Normalization(format!(
                "no edge connects reference species {} and {}",
                reference.first, reference.second
            ))),
        ),
        Some((_, flux)) if flux.net() == 0.0 => (
            1.0,
            Some(QpdError::Normalization(format!(
                "net flux between {} and {} is zero",
                reference.first, reference.second
            ))),
        ),
        Some((edge, flux)) => {
            let factor = 1.0 / flux.net();
            if edge.right_name == reference.first {
                (-factor, None)
            } else {
                (factor, None)
            }
        }
    };

    Normalization {
        factor: factor * scale.unwrap_or(1.0),
        issue,
    }
}

/// 报告中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct FluxRow {
    pub left: String,
    pub right: String,
    /// 归一化正向通量
    pub forward: f64,
    /// 归一化逆向通量取负
    pub reverse: f64,
}

/// 按边集合顺序排列的归一化通量表
#[derive(Debug, Clone, PartialEq)]
pub struct FluxTable {
    pub rows: Vec<FluxRow>,
}

impl FluxTable {
    /// 以给定因子生成通量表
    pub fn from_raw(edges: &EdgeSet, raw: &[RawFlux], factor: f64) -> Self {
        let rows = edges
            .iter()
            .zip(raw)
            .map(|(edge, flux)| FluxRow {
                left: edge.left_name.clone(),
                right: edge.right_name.clone(),
                forward: factor * flux.forward,
                reverse: -factor * flux.reverse,
            })
            .collect();
        Self { rows }
    }

    /// 所有通量乘以同一因子
    #[cfg(test)]
    pub fn scaled(&self, factor: f64) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| FluxRow {
                forward: row.forward * factor,
                reverse: row.reverse * factor,
                ..row.clone()
            })
            .collect();
        Self { rows }
    }
}

/// 汇总、归一化并生成通量表
pub fn normalize(
    edges: &EdgeSet,
    totals: &ReactionTotals,
    reference: &ReferencePair,
    scale: Option<f64>,
) -> (FluxTable, Normalization) {
    let raw = raw_fluxes(edges, totals);
    let normalization = normalization_factor(edges, &raw, reference, scale);
    (FluxTable::from_raw(edges, &raw, normalization.factor), normalization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux::graph::tests::methane_chain;
    use crate::flux::graph::{build_edges, EdgeOptions};
    use crate::models::mechanism::tests::{reaction, species};
    use crate::models::Mechanism;

    fn totals(forward: &[f64], reverse: &[f64]) -> ReactionTotals {
        ReactionTotals {
            forward: forward.to_vec(),
            reverse: reverse.to_vec(),
            volume: 1.0,
        }
    }

    #[test]
    fn test_single_reaction_raw_flux() {
        // A → B，4 个单元各贡献 1
        let mech = Mechanism::new(
            vec![species("A", &[("C", 1)]), species("B", &[("C", 1)])],
            vec![reaction(&[(0, 1.0)], &[(1, 1.0)])],
        );
        let edges = build_edges(&mech, "C", &EdgeOptions::default());
        let raw = raw_fluxes(&edges, &totals(&[4.0], &[0.0]));
        assert_eq!(raw, vec![RawFlux { forward: 4.0, reverse: 0.0 }]);
    }

    #[test]
    fn test_missing_reference_falls_back_to_identity() {
        let mech = Mechanism::new(
            vec![
                species("A", &[("C", 1)]),
                species("B", &[("C", 1)]),
                species("CH4", &[("C", 1), ("H", 4)]),
                species("CH3", &[("C", 1), ("H", 3)]),
            ],
            vec![reaction(&[(0, 1.0)], &[(1, 1.0)])],
        );
        let edges = build_edges(&mech, "C", &EdgeOptions::default());
        let t = totals(&[4.0], &[1.5]);
        let (table, normalization) = normalize(&edges, &t, &ReferencePair::default(), None);

        assert_eq!(normalization.factor, 1.0);
        assert!(matches!(normalization.issue, Some(QpdError::Normalization(_))));
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].forward, 4.0);
        assert_eq!(table.rows[0].reverse, -1.5);
    }

    #[test]
    fn test_zero_reference_difference_is_reported() {
        let mech = methane_chain();
        let edges = build_edges(&mech, "C", &EdgeOptions::default());
        // CH4 → CH3 的两个反应净通量相互抵消
        let t = totals(&[1.0, 2.0, 5.0, 1.0, 1.0], &[2.0, 1.0, 0.0, 0.0, 0.0]);
        let (_, normalization) = normalize(&edges, &t, &ReferencePair::default(), Some(3.0));
        assert!(normalization.issue.is_some());
        assert_eq!(normalization.factor, 3.0);
    }

    #[test]
    fn test_sign_makes_first_species_destruction_positive() {
        let mech = methane_chain();
        let edges = build_edges(&mech, "C", &EdgeOptions::default());
        let t = totals(&[3.0, 1.0, 2.0, 0.5, 1.0], &[0.0; 5]);

        let (table, normalization) = normalize(&edges, &t, &ReferencePair::default(), None);
        assert!(normalization.issue.is_none());
        assert!((normalization.factor - 0.25).abs() < 1e-15);
        let reference = &table.rows[0];
        assert_eq!((reference.left.as_str(), reference.right.as_str()), ("CH4", "CH3"));
        assert!((reference.forward - 1.0).abs() < 1e-15);

        // 参考组分顺序对调：CH3 的消耗为正，右端点 CH3 → 因子取负
        let swapped = ReferencePair {
            first: "CH3".to_string(),
            second: "CH4".to_string(),
        };
        let (table, normalization) = normalize(&edges, &t, &swapped, None);
        assert!((normalization.factor + 0.25).abs() < 1e-15);
        assert!((table.rows[0].forward + 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_scale_multiplies_factor() {
        let mech = methane_chain();
        let edges = build_edges(&mech, "C", &EdgeOptions::default());
        let t = totals(&[3.0, 1.0, 2.0, 0.5, 1.0], &[0.0; 5]);
        let (_, normalization) = normalize(&edges, &t, &ReferencePair::default(), Some(100.0));
        assert!((normalization.factor - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_renormalization_round_trip() {
        let mech = methane_chain();
        let edges = build_edges(&mech, "C", &EdgeOptions::default());
        let t = totals(&[3.0, 1.0, 2.0, 0.5, 1.0], &[0.7, 0.2, 0.1, 0.0, 0.3]);

        let raw = raw_fluxes(&edges, &t);
        let (table, normalization) = normalize(&edges, &t, &ReferencePair::default(), Some(7.0));
        let restored = table.scaled(1.0 / normalization.factor);
        let expected = FluxTable::from_raw(&edges, &raw, 1.0);

        for (a, b) in restored.rows.iter().zip(&expected.rows) {
            assert_eq!(a.left, b.left);
            assert!((a.forward - b.forward).abs() < 1e-12 * b.forward.abs().max(1.0));
            assert!((a.reverse - b.reverse).abs() < 1e-12 * b.reverse.abs().max(1.0));
        }
    }
}
