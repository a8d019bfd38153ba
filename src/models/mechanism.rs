//! # 反应机理数据模型
//!
//! 组分、反应以及预先计算的净化学计量系数索引。
//!
//! ## 约定
//! - 单位统一为 SI（mol, m³, K, Pa）
//! - 组分按机理文件中的顺序编号，该顺序即边的规范左右方向
//! - 净系数 = 生成物系数 − 反应物系数，只保存非零项
//!
//! ## 依赖关系
//! - 被 `parsers/mechanism.rs` 构造
//! - 被 `kinetics/`, `flux/` 使用
//! - 使用 `kinetics/thermo.rs` 的 NASA-7 多项式

use crate::kinetics::thermo::Nasa7;

use std::collections::BTreeMap;

/// 通用气体常数 J/(mol·K)
pub const GAS_CONSTANT: f64 = 8.314_462_618;

/// 标准压力 Pa
pub const STANDARD_PRESSURE: f64 = 101_325.0;

/// 标准原子量 (kg/mol)
pub fn atomic_weight(element: &str) -> Option<f64> {
    let grams = match element {
        "H" => 1.008,
        "He" => 4.002602,
        "C" => 12.011,
        "N" => 14.007,
        "O" => 15.999,
        "F" => 18.998403163,
        "Ne" => 20.1797,
        "S" => 32.06,
        "Cl" => 35.45,
        "Ar" => 39.95,
        "E" => 5.48579909e-4,
        _ => return None,
    };
    Some(grams / 1e3)
}

/// 修正 Arrhenius 速率常数 k = A T^b exp(-Ta/T)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrhenius {
    /// 指前因子（SI，量纲随反应级数变化）
    pub pre_exponential: f64,
    /// 温度指数 b
    pub temperature_exponent: f64,
    /// 活化温度 Ea/R (K)
    pub activation_temperature: f64,
}

impl Arrhenius {
    pub fn new(pre_exponential: f64, temperature_exponent: f64, activation_temperature: f64) -> Self {
        Self {
            pre_exponential,
            temperature_exponent,
            activation_temperature,
        }
    }

    /// 在温度 T 下求值
    pub fn rate(&self, temperature: f64) -> f64 {
        let mut k = self.pre_exponential;
        if self.temperature_exponent != 0.0 {
            k *= temperature.powf(self.temperature_exponent);
        }
        if self.activation_temperature != 0.0 {
            k *= (-self.activation_temperature / temperature).exp();
        }
        k
    }
}

/// Troe 降压区混合函数参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Troe {
    pub a: f64,
    pub t3: f64,
    pub t1: f64,
    pub t2: Option<f64>,
}

/// 速率模型
#[derive(Debug, Clone, PartialEq)]
pub enum RateModel {
    Elementary,
    /// 三体反应，效率按组分编号排列
    ThreeBody { efficiencies: Vec<f64> },
    /// 降压区反应（Lindemann 或 Troe）
    Falloff {
        efficiencies: Vec<f64>,
        low_pressure: Arrhenius,
        troe: Option<Troe>,
    },
}

/// 逆反应速率常数来源
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReverseRate {
    Irreversible,
    Explicit(Arrhenius),
    /// k_r = k_f / K_c
    Equilibrium,
}

/// 组分
#[derive(Debug, Clone)]
pub struct Species {
    pub name: String,
    /// 元素组成
    pub composition: BTreeMap<String, u32>,
    /// 摩尔质量 (kg/mol)
    pub molar_mass: f64,
    pub thermo: Option<Nasa7>,
}

impl Species {
    /// 该组分含有的某元素原子数
    pub fn atoms(&self, element: &str) -> u32 {
        self.composition.get(element).copied().unwrap_or(0)
    }
}

/// 基元反应
#[derive(Debug, Clone)]
pub struct Reaction {
    pub equation: String,
    /// (组分编号, 系数)
    pub reactants: Vec<(usize, f64)>,
    pub products: Vec<(usize, f64)>,
    pub forward: Arrhenius,
    pub reverse: ReverseRate,
    pub model: RateModel,
}

/// 反应机理
#[derive(Debug, Clone)]
pub struct Mechanism {
    species: Vec<Species>,
    reactions: Vec<Reaction>,
    /// 每个反应的净系数稀疏索引，按组分编号排序
    stoichiometry: Vec<Vec<(usize, f64)>>,
}

impl Mechanism {
    pub fn new(species: Vec<Species>, reactions: Vec<Reaction>) -> Self {
        let stoichiometry = reactions
            .iter()
            .map(|reaction| {
                let mut net: BTreeMap<usize, f64> = BTreeMap::new();
                for &(k, nu) in &reaction.reactants {
                    *net.entry(k).or_insert(0.0) -= nu;
                }
                for &(k, nu) in &reaction.products {
                    *net.entry(k).or_insert(0.0) += nu;
                }
                net.into_iter().filter(|&(_, nu)| nu != 0.0).collect()
            })
            .collect();

        Self {
            species,
            reactions,
            stoichiometry,
        }
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn species_name(&self, index: usize) -> &str {
        &self.species[index].name
    }

    pub fn species_names(&self) -> Vec<&str> {
        self.species.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }

    /// 反应的净化学计量系数（稀疏，非零）
    pub fn net_coefficients(&self, reaction: usize) -> &[(usize, f64)] {
        &self.stoichiometry[reaction]
    }

    /// 含有指定元素的组分编号
    pub fn species_containing(&self, element: &str) -> Vec<usize> {
        self.species
            .iter()
            .enumerate()
            .filter(|(_, s)| s.atoms(element) > 0)
            .map(|(k, _)| k)
            .collect()
    }

    /// 平均摩尔质量 W̄ = Σ X_k W_k
    pub fn mean_molar_mass(&self, mole_fractions: &[f64]) -> f64 {
        self.species
            .iter()
            .zip(mole_fractions)
            .map(|(s, x)| s.molar_mass * x)
            .sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 测试用组分（无热力学数据）
    pub(crate) fn species(name: &str, composition: &[(&str, u32)]) -> Species {
        let composition: BTreeMap<String, u32> = composition
            .iter()
            .map(|(e, n)| (e.to_string(), *n))
            .collect();
        let molar_mass = composition
            .iter()
            .map(|(e, n)| atomic_weight(e).unwrap() * *n as f64)
            .sum();
        Species {
            name: name.to_string(),
            composition,
            molar_mass,
            thermo: None,
        }
    }

    /// 测试用不可逆基元反应
    pub(crate) fn reaction(reactants: &[(usize, f64)], products: &[(usize, f64)]) -> Reaction {
        Reaction {
            equation: String::new(),
            reactants: reactants.to_vec(),
            products: products.to_vec(),
            forward: Arrhenius::new(1.0, 0.0, 0.0),
            reverse: ReverseRate::Irreversible,
            model: RateModel::Elementary,
        }
    }

    #[test]
    fn test_net_coefficients_skip_spectators() {
        // CH4 + OH => CH3 + H2O, 以 OH 为旁观者的 A + M => B + M 形式
        let mech = Mechanism::new(
            vec![
                species("CH4", &[("C", 1), ("H", 4)]),
                species("OH", &[("O", 1), ("H", 1)]),
                species("CH3", &[("C", 1), ("H", 3)]),
                species("H2O", &[("H", 2), ("O", 1)]),
            ],
            vec![
                reaction(&[(0, 1.0), (1, 1.0)], &[(2, 1.0), (3, 1.0)]),
                reaction(&[(0, 1.0), (1, 1.0)], &[(2, 1.0), (1, 1.0)]),
            ],
        );

        assert_eq!(
            mech.net_coefficients(0),
            &[(0, -1.0), (1, -1.0), (2, 1.0), (3, 1.0)]
        );
        assert_eq!(mech.net_coefficients(1), &[(0, -1.0), (2, 1.0)]);
    }

    #[test]
    fn test_species_containing() {
        let mech = Mechanism::new(
            vec![
                species("H2", &[("H", 2)]),
                species("CO", &[("C", 1), ("O", 1)]),
                species("CH4", &[("C", 1), ("H", 4)]),
            ],
            vec![],
        );
        assert_eq!(mech.species_containing("C"), vec![1, 2]);
        assert!(mech.species_containing("N").is_empty());
    }

    #[test]
    fn test_arrhenius_rate() {
        let k = Arrhenius::new(2.0, 1.0, 1000.0);
        let expected = 2.0 * 500.0 * (-2.0f64).exp();
        assert!((k.rate(500.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mean_molar_mass() {
        let mech = Mechanism::new(
            vec![species("H2", &[("H", 2)]), species("O2", &[("O", 2)])],
            vec![],
        );
        let w = mech.mean_molar_mass(&[0.5, 0.5]);
        assert!((w - 0.5 * (2.016e-3 + 31.998e-3)).abs() < 1e-12);
    }
}
