//! # 反应伙伴诊断
//!
//! 对指定组分的每条相关边，把各反应的净通量归属到该反应中
//! 与该组分同侧的其他组分（“伙伴”），按伙伴名称合并。
//!
//! ```text
//! partner(r)  = r 中与指定组分净系数同号的其他组分，以 "+" 连接；无则为 "NP"
//! contrib(r)  = c · (Qf[r] − Qr[r]) · factor
//! ```
//! 同一条边上各伙伴贡献之和等于该边的归一化净通量。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `flux/graph.rs`, `models/`

use crate::flux::graph::{Edge, EdgeSet};
use crate::models::{Mechanism, ReactionTotals};

use std::collections::BTreeMap;

/// 无伙伴时使用的名称
pub const NO_PARTNER: &str = "NP";

/// 单条边的伙伴分解
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerBreakdown {
    pub left: String,
    pub right: String,
    /// 按伙伴名称排序的贡献
    pub contributions: Vec<(String, f64)>,
    /// 正贡献之和
    pub positive: f64,
    /// 负贡献之和
    pub negative: f64,
}

impl PartnerBreakdown {
    pub fn total(&self) -> f64 {
        self.positive + self.negative
    }
}

/// 反应中与指定组分同侧的伙伴名称
pub fn partner_name(mechanism: &Mechanism, reaction: usize, species: usize) -> String {
    let net = mechanism.net_coefficients(reaction);
    let sign = match net.iter().find(|&&(k, _)| k == species) {
        Some(&(_, nu)) => nu.signum(),
        None => return NO_PARTNER.to_string(),
    };

    let partners: Vec<&str> = net
        .iter()
        .filter(|&&(k, nu)| k != species && nu * sign > 0.0)
        .map(|&(k, _)| mechanism.species_name(k))
        .collect();
    if partners.is_empty() {
        NO_PARTNER.to_string()
    } else {
        partners.join("+")
    }
}

fn breakdown(
    mechanism: &Mechanism,
    edge: &Edge,
    species: usize,
    totals: &ReactionTotals,
    factor: f64,
) -> PartnerBreakdown {
    let mut merged: BTreeMap<String, f64> = BTreeMap::new();
    for &(reaction, coefficient) in &edge.weights {
        let partner = partner_name(mechanism, reaction, species);
        *merged.entry(partner).or_insert(0.0) += coefficient * totals.net(reaction) * factor;
    }

    let positive = merged.values().filter(|&&v| v > 0.0).sum();
    let negative = merged.values().filter(|&&v| v <= 0.0).sum();
    PartnerBreakdown {
        left: edge.left_name.clone(),
        right: edge.right_name.clone(),
        contributions: merged.into_iter().collect(),
        positive,
        negative,
    }
}

/// 指定组分所有相关边的伙伴分解（按边集合顺序）
pub fn partner_breakdown(
    mechanism: &Mechanism,
    edges: &EdgeSet,
    totals: &ReactionTotals,
    species: &str,
    factor: f64,
) -> Vec<PartnerBreakdown> {
    let index = match mechanism.species_index(species) {
        Some(index) => index,
        None => return Vec::new(),
    };
    edges
        .iter()
        .filter(|edge| edge.touches(species))
        .map(|edge| breakdown(mechanism, edge, index, totals, factor))
        .collect()
}
