//! # 反应速率计算器
//!
//! 由单元的局部热力学状态（摩尔分数、温度、密度）计算每个反应的
//! 正/逆反应进度速率。
//!
//! ## 算法概述
//! 1. 理想气体状态方程求压力 P = ρ R T / W̄
//! 2. 浓度 C_k = X_k P / (R T)
//! 3. 正反应: k_f Π C_i^ν'，三体/降压区修正
//! 4. 逆反应: 显式 Arrhenius 或 k_f / K_c
//!
//! 计算器无状态，可在多线程中对不同单元并行调用；
//! 所有临时存储位于调用方持有的 `RateScratch` 中，按机理尺寸一次分配。
//!
//! ## 依赖关系
//! - 被 `flux/aggregate.rs` 调用
//! - 使用 `models/mechanism.rs`, `kinetics/thermo.rs`

use crate::models::mechanism::{GAS_CONSTANT, STANDARD_PRESSURE};
use crate::models::{Mechanism, RateModel, ReverseRate, Troe};

/// 单个单元的热力学状态
#[derive(Debug, Clone, Copy)]
pub struct ThermodynamicState<'a> {
    /// 摩尔分数，按机理组分顺序
    pub mole_fractions: &'a [f64],
    /// 温度 (K)
    pub temperature: f64,
    /// 密度 (kg/m³)
    pub density: f64,
}

/// 单元内各反应的正/逆反应进度 (mol/m³/s)
#[derive(Debug, Clone, Default)]
pub struct ReactionRates {
    pub forward: Vec<f64>,
    pub reverse: Vec<f64>,
}

/// 每个工作线程复用的计算缓冲区
#[derive(Debug, Clone)]
pub struct RateScratch {
    pub concentrations: Vec<f64>,
    pub rates: ReactionRates,
}

impl RateScratch {
    pub fn new(num_species: usize, num_reactions: usize) -> Self {
        Self {
            concentrations: vec![0.0; num_species],
            rates: ReactionRates {
                forward: vec![0.0; num_reactions],
                reverse: vec![0.0; num_reactions],
            },
        }
    }
}

/// 单元反应速率计算接口
pub trait RateEvaluator: Sync {
    fn num_species(&self) -> usize;

    fn num_reactions(&self) -> usize;

    /// 按本计算器尺寸分配缓冲区
    fn scratch(&self) -> RateScratch {
        RateScratch::new(self.num_species(), self.num_reactions())
    }

    /// 计算结果写入 `scratch.rates`
    fn evaluate(&self, state: &ThermodynamicState, scratch: &mut RateScratch);
}

/// 理想气体状态方程求压力 (Pa)
pub fn ideal_gas_pressure(mechanism: &Mechanism, state: &ThermodynamicState) -> f64 {
    let mean_molar_mass = mechanism.mean_molar_mass(state.mole_fractions);
    if mean_molar_mass <= 0.0 {
        return 0.0;
    }
    state.density * GAS_CONSTANT * state.temperature / mean_molar_mass
}

/// 质量作用定律速率计算器
pub struct MassActionEvaluator<'m> {
    mechanism: &'m Mechanism,
}

impl<'m> MassActionEvaluator<'m> {
    pub fn new(mechanism: &'m Mechanism) -> Self {
        Self { mechanism }
    }

    /// 平衡常数 K_c（浓度基）
    fn equilibrium_constant(&self, reaction: usize, temperature: f64) -> Option<f64> {
        let mut delta_nu = 0.0;
        let mut delta_g = 0.0;
        for &(k, nu) in self.mechanism.net_coefficients(reaction) {
            let thermo = self.mechanism.species()[k].thermo.as_ref()?;
            delta_nu += nu;
            delta_g += nu * thermo.gibbs_rt(temperature);
        }
        let reference = STANDARD_PRESSURE / (GAS_CONSTANT * temperature);
        Some((-delta_g).exp() * reference.powf(delta_nu))
    }
}

impl RateEvaluator for MassActionEvaluator<'_> {
    fn num_species(&self) -> usize {
        self.mechanism.num_species()
    }

    fn num_reactions(&self) -> usize {
        self.mechanism.num_reactions()
    }

    fn evaluate(&self, state: &ThermodynamicState, scratch: &mut RateScratch) {
        let temperature = state.temperature;
        let pressure = ideal_gas_pressure(self.mechanism, state);
        let total = pressure / (GAS_CONSTANT * temperature);
        for (c, x) in scratch.concentrations.iter_mut().zip(state.mole_fractions) {
            *c = x * total;
        }
        let concentrations = &scratch.concentrations;

        for (r, reaction) in self.mechanism.reactions().iter().enumerate() {
            let k_inf = reaction.forward.rate(temperature);
            let modifier = match &reaction.model {
                RateModel::Elementary => 1.0,
                RateModel::ThreeBody { efficiencies } => third_body(efficiencies, concentrations),
                RateModel::Falloff {
                    efficiencies,
                    low_pressure,
                    troe,
                } => {
                    let m = third_body(efficiencies, concentrations);
                    falloff_modifier(k_inf, low_pressure.rate(temperature), m, temperature, troe)
                }
            };
            let k_f = k_inf * modifier;
            let k_r = match reaction.reverse {
                ReverseRate::Irreversible => 0.0,
                ReverseRate::Explicit(arrhenius) => arrhenius.rate(temperature) * modifier,
                ReverseRate::Equilibrium => match self.equilibrium_constant(r, temperature) {
                    Some(kc) if kc > 0.0 => k_f / kc,
                    _ => 0.0,
                },
            };

            scratch.rates.forward[r] = k_f * concentration_product(&reaction.reactants, concentrations);
            scratch.rates.reverse[r] = if k_r == 0.0 {
                0.0
            } else {
                k_r * concentration_product(&reaction.products, concentrations)
            };
        }
    }
}

/// 第三体浓度 [M] = Σ ε_k C_k
fn third_body(efficiencies: &[f64], concentrations: &[f64]) -> f64 {
    efficiencies
        .iter()
        .zip(concentrations)
        .map(|(e, c)| e * c)
        .sum()
}

/// Π C_k^ν
fn concentration_product(side: &[(usize, f64)], concentrations: &[f64]) -> f64 {
    side.iter()
        .map(|&(k, nu)| {
            let c = concentrations[k];
            if nu == 1.0 {
                c
            } else if nu.fract() == 0.0 {
                c.powi(nu as i32)
            } else {
                c.powf(nu)
            }
        })
        .product()
}

/// 降压区修正因子 k/k_∞ = P_r/(1+P_r) F
fn falloff_modifier(k_inf: f64, k_0: f64, m: f64, temperature: f64, troe: &Option<Troe>) -> f64 {
    if k_inf <= 0.0 {
        return 0.0;
    }
    let reduced_pressure = k_0 * m / k_inf;
    if reduced_pressure <= 0.0 {
        return 0.0;
    }
    let blending = match troe {
        Some(troe) => troe_blending(troe, temperature, reduced_pressure),
        None => 1.0,
    };
    reduced_pressure / (1.0 + reduced_pressure) * blending
}

/// Troe 混合函数 F
fn troe_blending(troe: &Troe, temperature: f64, reduced_pressure: f64) -> f64 {
    let decay = |scale: f64| {
        if scale == 0.0 {
            0.0
        } else {
            (-temperature / scale).exp()
        }
    };
    let mut f_cent = (1.0 - troe.a) * decay(troe.t3) + troe.a * decay(troe.t1);
    if let Some(t2) = troe.t2 {
        f_cent += (-t2 / temperature).exp();
    }
    let log_f_cent = f_cent.max(f64::MIN_POSITIVE).log10();
    let c = -0.4 - 0.67 * log_f_cent;
    let n = 0.75 - 1.27 * log_f_cent;
    let log_pr = reduced_pressure.log10() + c;
    let f1 = log_pr / (n - 0.14 * log_pr);
    10f64.powf(log_f_cent / (1.0 + f1 * f1))
}
