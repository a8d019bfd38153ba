//! # 反应机理 YAML 解析器
//!
//! 解析 Cantera 风格的机理文件。
//!
//! ## 格式说明
//! ```text
//! units: {length: cm, quantity: mol, activation-energy: cal/mol}
//! species:
//! - name: CH4
//!   composition: {C: 1, H: 4}
//!   thermo:
//!     temperature-ranges: [200.0, 1000.0, 3500.0]
//!     data: [[a0..a6], [a0..a6]]
//! reactions:
//! - equation: CH4 + H <=> CH3 + H2
//!   rate-constant: {A: 6.6e+08, b: 1.62, Ea: 1.084e+04}
//! - equation: 2 CH3 (+M) <=> C2H6 (+M)
//!   type: falloff
//!   high-P-rate-constant: {A: ..., b: ..., Ea: ...}
//!   low-P-rate-constant: {A: ..., b: ..., Ea: ...}
//!   Troe: {A: 0.5, T3: 100.0, T1: 1000.0}
//!   efficiencies: {H2O: 6.0}
//! ```
//!
//! 指前因子按反应级数换算为 SI 单位，活化能换算为活化温度 (K)。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/mechanism.rs`, `kinetics/thermo.rs`
//! - 使用 `serde_yaml` 反序列化, `regex` 解析反应方程式

use crate::error::{QpdError, Result};
use crate::kinetics::thermo::Nasa7;
use crate::models::mechanism::{atomic_weight, GAS_CONSTANT};
use crate::models::{Arrhenius, Mechanism, RateModel, Reaction, ReverseRate, Species, Troe};

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ─────────────────────────────────────────────────────────────
// YAML 文件结构
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MechanismFile {
    #[serde(default)]
    units: UnitsEntry,
    species: Vec<SpeciesEntry>,
    #[serde(default)]
    reactions: Vec<ReactionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct UnitsEntry {
    length: String,
    quantity: String,
    activation_energy: String,
}

impl Default for UnitsEntry {
    fn default() -> Self {
        UnitsEntry {
            length: "cm".to_string(),
            quantity: "mol".to_string(),
            activation_energy: "cal/mol".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpeciesEntry {
    name: String,
    composition: BTreeMap<String, u32>,
    thermo: Option<ThermoEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ThermoEntry {
    temperature_ranges: Vec<f64>,
    data: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ArrheniusEntry {
    #[serde(rename = "A")]
    a: f64,
    b: f64,
    #[serde(rename = "Ea")]
    ea: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct TroeEntry {
    #[serde(rename = "A")]
    a: f64,
    #[serde(rename = "T3")]
    t3: f64,
    #[serde(rename = "T1")]
    t1: f64,
    #[serde(rename = "T2")]
    t2: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReactionEntry {
    equation: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    rate_constant: Option<ArrheniusEntry>,
    #[serde(rename = "high-P-rate-constant")]
    high_pressure: Option<ArrheniusEntry>,
    #[serde(rename = "low-P-rate-constant")]
    low_pressure: Option<ArrheniusEntry>,
    #[serde(rename = "Troe")]
    troe: Option<TroeEntry>,
    #[serde(default)]
    efficiencies: BTreeMap<String, f64>,
    #[serde(default = "default_efficiency")]
    default_efficiency: f64,
    reverse_rate_constant: Option<ArrheniusEntry>,
}

fn default_efficiency() -> f64 {
    1.0
}

// ─────────────────────────────────────────────────────────────
// 反应方程式
// ─────────────────────────────────────────────────────────────

/// 第三体标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThirdBody {
    None,
    /// `+ M`
    Explicit,
    /// `(+M)`
    Falloff,
}

/// 解析后的反应方程式
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub reactants: Vec<(String, f64)>,
    pub products: Vec<(String, f64)>,
    pub reversible: bool,
    pub third_body: ThirdBody,
}

/// 反应方程式解析器（每个机理文件编译一次正则）
pub struct EquationParser {
    falloff: Regex,
    arrow: Regex,
    plus: Regex,
    term: Regex,
}

impl EquationParser {
    pub fn new() -> Self {
        Self {
            falloff: Regex::new(r"\(\s*\+\s*M\s*\)").unwrap(),
            arrow: Regex::new(r"\s*(<=>|=>|=)\s*").unwrap(),
            plus: Regex::new(r"\s+\+\s+").unwrap(),
            term: Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)?\s*(\S+)$").unwrap(),
        }
    }

    /// 解析反应方程式，`known` 用于识别以数字开头的组分名
    pub fn parse(&self, equation: &str, known: &[&str]) -> std::result::Result<Equation, String> {
        parse_equation(self, equation, known)
    }
}

fn parse_equation(
    parser: &EquationParser,
    equation: &str,
    known: &[&str],
) -> std::result::Result<Equation, String> {
    let (falloff, arrow) = (&parser.falloff, &parser.arrow);

    let mut third_body = ThirdBody::None;
    let stripped = if falloff.is_match(equation) {
        third_body = ThirdBody::Falloff;
        falloff.replace_all(equation, " ").to_string()
    } else {
        equation.to_string()
    };

    let found = arrow
        .captures(&stripped)
        .ok_or_else(|| format!("no reaction arrow in '{}'", equation))?;
    let whole = found.get(0).unwrap();
    let reversible = &found[1] != "=>";
    let (lhs, rhs) = (&stripped[..whole.start()], &stripped[whole.end()..]);
    if arrow.is_match(rhs) {
        return Err(format!("more than one reaction arrow in '{}'", equation));
    }

    let (reactants, lhs_m) = parse_side(parser, lhs, known)?;
    let (products, rhs_m) = parse_side(parser, rhs, known)?;
    if lhs_m != rhs_m {
        return Err(format!("unbalanced third body 'M' in '{}'", equation));
    }
    if lhs_m {
        if third_body == ThirdBody::Falloff {
            return Err(format!("both '+ M' and '(+M)' in '{}'", equation));
        }
        third_body = ThirdBody::Explicit;
    }
    if reactants.is_empty() || products.is_empty() {
        return Err(format!("empty side in '{}'", equation));
    }

    Ok(Equation {
        reactants,
        products,
        reversible,
        third_body,
    })
}

/// 解析方程式一侧，返回 (组分, 系数) 与是否出现 `M`
fn parse_side(
    parser: &EquationParser,
    side: &str,
    known: &[&str],
) -> std::result::Result<(Vec<(String, f64)>, bool), String> {
    let (plus, term) = (&parser.plus, &parser.term);

    let mut merged: Vec<(String, f64)> = Vec::new();
    let mut has_m = false;
    for raw in plus.split(side.trim()) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if raw == "M" {
            has_m = true;
            continue;
        }
        let (name, coefficient) = if known.contains(&raw) {
            (raw.to_string(), 1.0)
        } else {
            let caps = term
                .captures(raw)
                .ok_or_else(|| format!("cannot parse term '{}'", raw))?;
            let coefficient = match caps.get(1) {
                Some(m) => m
                    .as_str()
                    .parse::<f64>()
                    .map_err(|_| format!("bad coefficient in '{}'", raw))?,
                None => 1.0,
            };
            (caps[2].to_string(), coefficient)
        };
        match merged.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 += coefficient,
            None => merged.push((name, coefficient)),
        }
    }
    Ok((merged, has_m))
}

// ─────────────────────────────────────────────────────────────
// 单位换算
// ─────────────────────────────────────────────────────────────

/// 机理文件单位 → SI 的换算
struct UnitSystem {
    /// (quantity/length³) → mol/m³
    concentration: f64,
    /// 活化能 → 活化温度 (K)
    activation: f64,
}

impl UnitSystem {
    fn from_entry(units: &UnitsEntry) -> std::result::Result<Self, String> {
        let length = match units.length.as_str() {
            "cm" => 1e-2,
            "mm" => 1e-3,
            "m" => 1.0,
            other => return Err(format!("unsupported length unit '{}'", other)),
        };
        let quantity = match units.quantity.as_str() {
            "mol" => 1.0,
            "kmol" => 1e3,
            other => return Err(format!("unsupported quantity unit '{}'", other)),
        };
        let activation = match units.activation_energy.as_str() {
            "K" => 1.0,
            "cal/mol" => 4.184 / GAS_CONSTANT,
            "kcal/mol" => 4184.0 / GAS_CONSTANT,
            "J/mol" => 1.0 / GAS_CONSTANT,
            "kJ/mol" => 1e3 / GAS_CONSTANT,
            "J/kmol" => 1e-3 / GAS_CONSTANT,
            other => return Err(format!("unsupported activation-energy unit '{}'", other)),
        };
        Ok(UnitSystem {
            concentration: quantity / (length * length * length),
            activation,
        })
    }

    /// `order` 为该速率常数对应的浓度总级数
    fn arrhenius(&self, entry: &ArrheniusEntry, order: f64) -> Arrhenius {
        Arrhenius::new(
            entry.a * self.concentration.powf(1.0 - order),
            entry.b,
            entry.ea * self.activation,
        )
    }
}

// ─────────────────────────────────────────────────────────────
// 解析入口
// ─────────────────────────────────────────────────────────────

/// 解析机理文件
pub fn parse_mechanism_file(path: &Path) -> Result<Mechanism> {
    let content = fs::read_to_string(path).map_err(|e| QpdError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_mechanism_content(&content, &path.display().to_string())
}

/// 从字符串内容解析机理
pub fn parse_mechanism_content(content: &str, source: &str) -> Result<Mechanism> {
    let file: MechanismFile = serde_yaml::from_str(content).map_err(|e| QpdError::Yaml {
        path: source.to_string(),
        source: e,
    })?;
    let fail = |reason: String| QpdError::ParseError {
        format: "mechanism".to_string(),
        path: source.to_string(),
        reason,
    };

    let units = UnitSystem::from_entry(&file.units).map_err(fail)?;

    let mut species = Vec::with_capacity(file.species.len());
    for entry in file.species {
        if species.iter().any(|s: &Species| s.name == entry.name) {
            return Err(fail(format!("duplicate species '{}'", entry.name)));
        }
        species.push(build_species(entry).map_err(fail)?);
    }
    let names: Vec<&str> = species.iter().map(|s| s.name.as_str()).collect();

    let parser = EquationParser::new();
    let mut reactions = Vec::with_capacity(file.reactions.len());
    for (index, entry) in file.reactions.iter().enumerate() {
        let reaction = build_reaction(&parser, entry, &names, &units)
            .map_err(|reason| fail(format!("reaction {} '{}': {}", index, entry.equation, reason)))?;
        reactions.push(reaction);
    }

    let mechanism = Mechanism::new(species, reactions);

    // 由平衡常数求逆反应时需要所有参与组分的热力学数据
    for (index, reaction) in mechanism.reactions().iter().enumerate() {
        if reaction.reverse != ReverseRate::Equilibrium {
            continue;
        }
        for &(k, _) in mechanism.net_coefficients(index) {
            if mechanism.species()[k].thermo.is_none() {
                return Err(fail(format!(
                    "reaction {} '{}' is reversible but species '{}' has no thermo data",
                    index,
                    reaction.equation,
                    mechanism.species_name(k)
                )));
            }
        }
    }

    Ok(mechanism)
}

fn build_species(entry: SpeciesEntry) -> std::result::Result<Species, String> {
    let mut molar_mass = 0.0;
    for (element, count) in &entry.composition {
        let weight = atomic_weight(element)
            .ok_or_else(|| format!("species '{}': unknown element '{}'", entry.name, element))?;
        molar_mass += weight * *count as f64;
    }

    let thermo = match entry.thermo {
        Some(thermo) => {
            if thermo.data.is_empty() || thermo.temperature_ranges.len() != thermo.data.len() + 1 {
                return Err(format!(
                    "species '{}': {} temperature ranges for {} NASA-7 pieces",
                    entry.name,
                    thermo.temperature_ranges.len(),
                    thermo.data.len()
                ));
            }
            let mut pieces = Vec::with_capacity(thermo.data.len());
            for piece in &thermo.data {
                let piece: [f64; 7] = piece.as_slice().try_into().map_err(|_| {
                    format!("species '{}': NASA-7 piece needs 7 coefficients", entry.name)
                })?;
                pieces.push(piece);
            }
            Some(Nasa7 {
                temperature_ranges: thermo.temperature_ranges,
                pieces,
            })
        }
        None => None,
    };

    Ok(Species {
        name: entry.name,
        composition: entry.composition,
        molar_mass,
        thermo,
    })
}

fn build_reaction(
    parser: &EquationParser,
    entry: &ReactionEntry,
    names: &[&str],
    units: &UnitSystem,
) -> std::result::Result<Reaction, String> {
    let equation = parser.parse(&entry.equation, names)?;
    let index_of = |name: &str| {
        names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| format!("undeclared species '{}'", name))
    };
    let side = |terms: &[(String, f64)]| -> std::result::Result<Vec<(usize, f64)>, String> {
        terms.iter().map(|(name, nu)| Ok((index_of(name)?, *nu))).collect()
    };
    let reactants = side(&equation.reactants)?;
    let products = side(&equation.products)?;
    let reactant_order: f64 = reactants.iter().map(|(_, nu)| nu).sum();
    let product_order: f64 = products.iter().map(|(_, nu)| nu).sum();

    let efficiencies = || -> std::result::Result<Vec<f64>, String> {
        let mut efficiencies = vec![entry.default_efficiency; names.len()];
        for (name, value) in &entry.efficiencies {
            efficiencies[index_of(name)?] = *value;
        }
        Ok(efficiencies)
    };

    let kind = entry.kind.as_deref().unwrap_or(match equation.third_body {
        ThirdBody::None => "elementary",
        ThirdBody::Explicit => "three-body",
        ThirdBody::Falloff => "falloff",
    });

    let (forward, model, extra_order) = match kind {
        "elementary" => {
            if equation.third_body != ThirdBody::None {
                return Err("third body in an elementary reaction".to_string());
            }
            let k = entry.rate_constant.as_ref().ok_or("missing rate-constant")?;
            (units.arrhenius(k, reactant_order), RateModel::Elementary, 0.0)
        }
        "three-body" => {
            let k = entry.rate_constant.as_ref().ok_or("missing rate-constant")?;
            (
                units.arrhenius(k, reactant_order + 1.0),
                RateModel::ThreeBody {
                    efficiencies: efficiencies()?,
                },
                1.0,
            )
        }
        "falloff" => {
            let high = entry
                .high_pressure
                .as_ref()
                .ok_or("missing high-P-rate-constant")?;
            let low = entry
                .low_pressure
                .as_ref()
                .ok_or("missing low-P-rate-constant")?;
            let troe = entry.troe.map(|t| Troe {
                a: t.a,
                t3: t.t3,
                t1: t.t1,
                t2: t.t2,
            });
            (
                units.arrhenius(high, reactant_order),
                RateModel::Falloff {
                    efficiencies: efficiencies()?,
                    low_pressure: units.arrhenius(low, reactant_order + 1.0),
                    troe,
                },
                0.0,
            )
        }
        other => return Err(format!("unsupported reaction type '{}'", other)),
    };

    let reverse = match (&entry.reverse_rate_constant, equation.reversible) {
        (Some(k), true) => ReverseRate::Explicit(units.arrhenius(k, product_order + extra_order)),
        (Some(_), false) => return Err("reverse-rate-constant on an irreversible reaction".to_string()),
        (None, true) => ReverseRate::Equilibrium,
        (None, false) => ReverseRate::Irreversible,
    };

    Ok(Reaction {
        equation: entry.equation.clone(),
        reactants,
        products,
        forward,
        reverse,
        model,
    })
}
