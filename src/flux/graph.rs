//! # 反应路径图构建
//!
//! 由反应机理和示踪元素构建组分对之间的边及其反应权重表。
//!
//! ## 算法概述
//! 对每个反应（使用机理预计算的净系数索引）：
//! ```text
//! 消耗组分 i:  ν_i < 0,  a_i = −ν_i · atoms_i
//! 生成组分 j:  ν_j > 0,  b_j =  ν_j · atoms_j
//! T = Σ b_j
//! 边 {i, j} 加入 (反应, ± a_i b_j / T)
//! ```
//! 系数为正表示正反应把示踪原子从左端点搬到右端点。
//! 边以 `(左组分编号, 右组分编号)` 为键，左端点为机理中靠前的组分；
//! 全部中间结构为有序映射，结果只取决于机理与示踪元素。
//!
//! `max_hops > 1` 时折叠只连接两条边的中间组分（直通节点）。
//!
//! ## 依赖关系
//! - 被 `flux/normalize.rs`, `flux/partner.rs`, `commands/` 使用
//! - 使用 `models/mechanism.rs`

use crate::models::Mechanism;

use std::collections::{BTreeMap, BTreeSet};

/// 边的值键: (左组分编号, 右组分编号)，左 < 右
pub type EdgeKey = (usize, usize);

/// 组分对之间的示踪原子流动通道
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub left: usize,
    pub right: usize,
    pub left_name: String,
    pub right_name: String,
    /// (反应编号, 系数)，按反应编号排序
    pub weights: Vec<(usize, f64)>,
    /// 折叠的直接跳数
    pub hops: usize,
}

impl Edge {
    pub fn key(&self) -> EdgeKey {
        (self.left, self.right)
    }

    pub fn touches(&self, name: &str) -> bool {
        self.left_name == name || self.right_name == name
    }

    /// 是否连接两个指定组分（不分方向）
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.left_name == a && self.right_name == b) || (self.left_name == b && self.right_name == a)
    }
}

/// 构建选项
#[derive(Debug, Clone, Copy)]
pub struct EdgeOptions {
    /// 一条边最多折叠的直接跳数
    pub max_hops: usize,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self { max_hops: 1 }
    }
}

/// 某个示踪元素的全部边，按 `EdgeKey` 排序
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSet {
    pub element: String,
    edges: Vec<Edge>,
}

impl EdgeSet {
    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 连接两个组分的边
    pub fn between(&self, a: &str, b: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.connects(a, b))
    }
}

impl<'a> IntoIterator for &'a EdgeSet {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

/// 构建中的边：反应 → 系数，以及跳数
#[derive(Debug, Clone, Default)]
struct Pending {
    weights: BTreeMap<usize, f64>,
    hops: usize,
}

type Graph = BTreeMap<EdgeKey, Pending>;

/// 规范化方向：返回键与系数符号
fn canonical(from: usize, to: usize) -> (EdgeKey, f64) {
    if from < to {
        ((from, to), 1.0)
    } else {
        ((to, from), -1.0)
    }
}

/// 直接跳的边
fn direct_edges(mechanism: &Mechanism, element: &str) -> Graph {
    let atoms: Vec<f64> = mechanism
        .species()
        .iter()
        .map(|s| s.atoms(element) as f64)
        .collect();

    let mut graph = Graph::new();
    for reaction in 0..mechanism.num_reactions() {
        let net = mechanism.net_coefficients(reaction);
        let consumed: Vec<(usize, f64)> = net
            .iter()
            .filter(|&&(k, nu)| nu < 0.0 && atoms[k] > 0.0)
            .map(|&(k, nu)| (k, -nu * atoms[k]))
            .collect();
        let produced: Vec<(usize, f64)> = net
            .iter()
            .filter(|&&(k, nu)| nu > 0.0 && atoms[k] > 0.0)
            .map(|&(k, nu)| (k, nu * atoms[k]))
            .collect();
        let transferred: f64 = produced.iter().map(|(_, b)| b).sum();
        if consumed.is_empty() || transferred == 0.0 {
            continue;
        }

        for &(i, a) in &consumed {
            for &(j, b) in &produced {
                let (key, sign) = canonical(i, j);
                let pending = graph.entry(key).or_insert_with(|| Pending {
                    weights: BTreeMap::new(),
                    hops: 1,
                });
                *pending.weights.entry(reaction).or_insert(0.0) += sign * a * b / transferred;
            }
        }
    }
    graph
}

/// 把边的权重定向为 from → to
fn oriented(graph: &Graph, from: usize, to: usize) -> (BTreeMap<usize, f64>, usize) {
    let (key, sign) = canonical(from, to);
    let pending = &graph[&key];
    let weights = pending.weights.iter().map(|(&r, &c)| (r, sign * c)).collect();
    (weights, pending.hops)
}

/// 折叠直通中间组分，直到没有可折叠的节点
fn collapse_pass_through(graph: &mut Graph, num_species: usize, max_hops: usize) {
    loop {
        let mut changed = false;
        for s in 0..num_species {
            let neighbours: Vec<usize> = graph
                .keys()
                .filter_map(|&(l, r)| {
                    if l == s {
                        Some(r)
                    } else if r == s {
                        Some(l)
                    } else {
                        None
                    }
                })
                .collect();
            let (u, w) = match neighbours.as_slice() {
                &[u, w] => (u, w),
                _ => continue,
            };

            let (first, first_hops) = oriented(graph, u, s);
            let (second, second_hops) = oriented(graph, s, w);
            let hops = first_hops + second_hops;
            if hops > max_hops {
                continue;
            }

            let reactions: BTreeSet<usize> = first.keys().chain(second.keys()).copied().collect();
            let (key, sign) = canonical(u, w);
            graph.remove(&canonical(u, s).0);
            graph.remove(&canonical(s, w).0);

            let merged = graph.entry(key).or_default();
            merged.hops = merged.hops.max(hops);
            for r in reactions {
                let mean = 0.5
                    * (first.get(&r).copied().unwrap_or(0.0) + second.get(&r).copied().unwrap_or(0.0));
                *merged.weights.entry(r).or_insert(0.0) += sign * mean;
            }
            changed = true;
        }
        if !changed {
            return;
        }
    }
}

/// 构建示踪元素的边集合
pub fn build_edges(mechanism: &Mechanism, element: &str, options: &EdgeOptions) -> EdgeSet {
    let mut graph = direct_edges(mechanism, element);
    if options.max_hops > 1 {
        collapse_pass_through(&mut graph, mechanism.num_species(), options.max_hops);
    }

    let edges = graph
        .into_iter()
        .filter_map(|((left, right), pending)| {
            let weights: Vec<(usize, f64)> = pending
                .weights
                .into_iter()
                .filter(|&(_, c)| c != 0.0)
                .collect();
            if weights.is_empty() {
                return None;
            }
            Some(Edge {
                left,
                right,
                left_name: mechanism.species_name(left).to_string(),
                right_name: mechanism.species_name(right).to_string(),
                weights,
                hops: pending.hops,
            })
        })
        .collect();

    EdgeSet {
        element: element.to_string(),
        edges,
    }
}
