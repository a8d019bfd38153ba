//! # NASA-7 热力学多项式
//!
//! 用于由平衡常数推导逆反应速率常数。
//!
//! ## 公式
//! ```text
//! h/RT  = a0 + a1/2 T + a2/3 T² + a3/4 T³ + a4/5 T⁴ + a5/T
//! s/R   = a0 ln T + a1 T + a2/2 T² + a3/3 T³ + a4/4 T⁴ + a6
//! g/RT  = h/RT − s/R
//! ```
//!
//! ## 依赖关系
//! - 被 `models/mechanism.rs` 持有
//! - 被 `kinetics/evaluator.rs` 使用

/// 分段 NASA-7 多项式
#[derive(Debug, Clone, PartialEq)]
pub struct Nasa7 {
    /// 分段温度点，长度 = 段数 + 1
    pub temperature_ranges: Vec<f64>,
    pub pieces: Vec<[f64; 7]>,
}

impl Nasa7 {
    /// 选择温度所在的分段（超出范围时外推首/末段）
    pub fn piece(&self, temperature: f64) -> &[f64; 7] {
        let index = self
            .temperature_ranges
            .iter()
            .skip(1)
            .take(self.pieces.len().saturating_sub(1))
            .position(|&split| temperature <= split)
            .unwrap_or(self.pieces.len() - 1);
        &self.pieces[index]
    }

    pub fn enthalpy_rt(&self, t: f64) -> f64 {
        let a = self.piece(t);
        a[0] + t * (a[1] / 2.0 + t * (a[2] / 3.0 + t * (a[3] / 4.0 + t * a[4] / 5.0))) + a[5] / t
    }

    pub fn entropy_r(&self, t: f64) -> f64 {
        let a = self.piece(t);
        a[0] * t.ln() + t * (a[1] + t * (a[2] / 2.0 + t * (a[3] / 3.0 + t * a[4] / 4.0))) + a[6]
    }

    /// 标准态 Gibbs 自由能 g°/RT
    pub fn gibbs_rt(&self, t: f64) -> f64 {
        self.enthalpy_rt(t) - self.entropy_r(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_cp() -> Nasa7 {
        // cp/R = 3.5，h(298.15)=0 的简单理想气体
        Nasa7 {
            temperature_ranges: vec![200.0, 1000.0, 3500.0],
            pieces: vec![
                [3.5, 0.0, 0.0, 0.0, 0.0, -3.5 * 298.15, 1.0],
                [3.5, 0.0, 0.0, 0.0, 0.0, -3.5 * 298.15, 2.0],
            ],
        }
    }

    #[test]
    fn test_piece_selection() {
        let nasa = constant_cp();
        assert_eq!(nasa.piece(300.0)[6], 1.0);
        assert_eq!(nasa.piece(1000.0)[6], 1.0);
        assert_eq!(nasa.piece(1500.0)[6], 2.0);
        assert_eq!(nasa.piece(5000.0)[6], 2.0);
    }

    #[test]
    fn test_constant_heat_capacity() {
        let nasa = constant_cp();
        let t = 600.0;
        assert!((nasa.enthalpy_rt(t) - 3.5 * (t - 298.15) / t).abs() < 1e-12);
        let s = 3.5 * t.ln() + 1.0;
        assert!((nasa.entropy_r(t) - s).abs() < 1e-12);
        assert!((nasa.gibbs_rt(t) - (nasa.enthalpy_rt(t) - s)).abs() < 1e-12);
    }

    #[test]
    fn test_single_piece() {
        let nasa = Nasa7 {
            temperature_ranges: vec![200.0, 3500.0],
            pieces: vec![[2.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
        };
        // 仅 a0 非零时 h/RT = a0
        assert_eq!(nasa.enthalpy_rt(3000.0), 2.5);
    }
}
