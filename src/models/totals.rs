//! # 全局反应累计量
//!
//! 每个反应的体积积分正/逆反应进度，以及参与积分的单元总体积。
//! 通过满足结合律的 `merge` 在补丁、层、工作线程之间合并。
//!
//! ## 依赖关系
//! - 被 `flux/aggregate.rs` 构造
//! - 被 `flux/normalize.rs`, `flux/partner.rs` 读取

/// 体积积分的反应进度累计
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionTotals {
    /// 正反应 Σ q_f · V (mol/s)
    pub forward: Vec<f64>,
    /// 逆反应 Σ q_r · V (mol/s)
    pub reverse: Vec<f64>,
    /// 已计入单元的总体积
    pub volume: f64,
}

impl ReactionTotals {
    /// 零累计量（合并运算的单位元）
    pub fn zeros(num_reactions: usize) -> Self {
        Self {
            forward: vec![0.0; num_reactions],
            reverse: vec![0.0; num_reactions],
            volume: 0.0,
        }
    }

    /// 计入一个单元
    pub fn accumulate(&mut self, forward: &[f64], reverse: &[f64], volume: f64) {
        for (sum, q) in self.forward.iter_mut().zip(forward) {
            *sum += q * volume;
        }
        for (sum, q) in self.reverse.iter_mut().zip(reverse) {
            *sum += q * volume;
        }
        self.volume += volume;
    }

    /// 合并两份累计量
    pub fn merge(mut self, other: ReactionTotals) -> ReactionTotals {
        for (a, b) in self.forward.iter_mut().zip(&other.forward) {
            *a += b;
        }
        for (a, b) in self.reverse.iter_mut().zip(&other.reverse) {
            *a += b;
        }
        self.volume += other.volume;
        self
    }

    /// 反应的净进度 (正 − 逆)
    pub fn net(&self, reaction: usize) -> f64 {
        self.forward[reaction] - self.reverse[reaction]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_weights_by_volume() {
        let mut totals = ReactionTotals::zeros(2);
        totals.accumulate(&[1.0, 2.0], &[0.5, 0.0], 0.25);
        totals.accumulate(&[1.0, 2.0], &[0.5, 0.0], 0.25);
        assert_eq!(totals.forward, vec![0.5, 1.0]);
        assert_eq!(totals.reverse, vec![0.25, 0.0]);
        assert_eq!(totals.volume, 0.5);
        assert_eq!(totals.net(0), 0.25);
    }

    #[test]
    fn test_merge_is_order_insensitive() {
        let mut a = ReactionTotals::zeros(1);
        a.accumulate(&[1.0], &[0.0], 1.0);
        let mut b = ReactionTotals::zeros(1);
        b.accumulate(&[3.0], &[1.0], 0.5);
        let mut c = ReactionTotals::zeros(1);
        c.accumulate(&[0.5], &[2.0], 2.0);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = c.merge(b).merge(a);
        assert!((left.forward[0] - right.forward[0]).abs() < 1e-12);
        assert!((left.reverse[0] - right.reverse[0]).abs() < 1e-12);
        assert!((left.volume - right.volume).abs() < 1e-12);
    }

    #[test]
    fn test_zeros_is_identity() {
        let mut a = ReactionTotals::zeros(1);
        a.accumulate(&[4.0], &[2.0], 1.0);
        assert_eq!(a.clone().merge(ReactionTotals::zeros(1)), a);
    }
}
