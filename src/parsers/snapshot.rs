//! # 网格快照读取器
//!
//! 读取多层自适应网格快照目录。
//!
//! ## 目录结构
//! ```text
//! plt00100/
//!   Header.yaml            层级几何与变量列表
//!   Level_0/patch_0.csv    每个补丁一个 CSV
//!   Level_1/patch_0.csv
//!   mechanism.yaml         （可选）反应机理
//! ```
//!
//! ## Header.yaml
//! ```text
//! prob_lo: [0.0, 0.0]
//! prob_hi: [0.01, 0.01]
//! variables: ["X(CH4)", ..., "temp", "density"]
//! levels:
//! - domain: {lo: [0, 0], hi: [31, 31]}
//!   ref_ratio: 2
//!   patches:
//!   - {lo: [0, 0], hi: [31, 31], file: Level_0/patch_0.csv}
//! ```
//!
//! 补丁 CSV 首行为变量名，之后每行一个单元，x 索引变化最快。
//! 任何读取或一致性错误均为 `InputData` 致命错误。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/hierarchy.rs`
//! - 使用 `serde_yaml` 解析头文件, `csv` 读取补丁数据

use crate::error::{QpdError, Result};
use crate::models::{FieldSource, Hierarchy, IndexBox, Level, Patch, PatchData};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// 头文件名
pub const HEADER_FILE: &str = "Header.yaml";

#[derive(Debug, Deserialize)]
struct HeaderFile {
    prob_lo: Vec<f64>,
    prob_hi: Vec<f64>,
    variables: Vec<String>,
    levels: Vec<LevelEntry>,
}

#[derive(Debug, Deserialize)]
struct BoxEntry {
    lo: Vec<i64>,
    hi: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct LevelEntry {
    domain: BoxEntry,
    ref_ratio: Option<i64>,
    #[serde(default)]
    patches: Vec<PatchEntry>,
}

#[derive(Debug, Deserialize)]
struct PatchEntry {
    lo: Vec<i64>,
    hi: Vec<i64>,
    file: String,
}

/// 磁盘上的网格快照
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub root: PathBuf,
    pub variables: Vec<String>,
    pub hierarchy: Hierarchy,
}

/// 打开快照目录并校验层级几何
pub fn open_snapshot(root: &Path) -> Result<Snapshot> {
    let header_path = root.join(HEADER_FILE);
    let invalid = |reason: String| QpdError::InputData {
        path: header_path.display().to_string(),
        reason,
    };

    let content = fs::read_to_string(&header_path)
        .map_err(|e| invalid(format!("cannot read header: {}", e)))?;
    let header: HeaderFile =
        serde_yaml::from_str(&content).map_err(|e| invalid(format!("malformed header: {}", e)))?;

    let hierarchy = build_hierarchy(header.prob_lo, header.prob_hi, header.levels).map_err(invalid)?;

    Ok(Snapshot {
        root: root.to_path_buf(),
        variables: header.variables,
        hierarchy,
    })
}

fn build_hierarchy(
    prob_lo: Vec<f64>,
    prob_hi: Vec<f64>,
    entries: Vec<LevelEntry>,
) -> std::result::Result<Hierarchy, String> {
    let dim = prob_lo.len();
    if dim == 0 || dim > 3 || prob_hi.len() != dim {
        return Err(format!(
            "prob_lo/prob_hi must have the same length in 1..=3, got {} and {}",
            prob_lo.len(),
            prob_hi.len()
        ));
    }
    if prob_lo.iter().zip(&prob_hi).any(|(lo, hi)| hi <= lo) {
        return Err("prob_hi must exceed prob_lo in every direction".to_string());
    }
    if entries.is_empty() {
        return Err("snapshot has no levels".to_string());
    }

    let mut levels: Vec<Level> = Vec::with_capacity(entries.len());
    let num_levels = entries.len();
    for (lev, entry) in entries.into_iter().enumerate() {
        let domain = IndexBox::new(entry.domain.lo, entry.domain.hi);
        if domain.dim() != dim || domain.hi.len() != dim || domain.is_empty() {
            return Err(format!("level {}: invalid domain box", lev));
        }
        if lev + 1 < num_levels && entry.ref_ratio.map_or(true, |r| r < 1) {
            return Err(format!("level {}: missing or invalid ref_ratio", lev));
        }
        if let Some(coarser) = levels.last() {
            let ratio = coarser.ref_ratio.unwrap_or(1);
            let expected: Vec<i64> = coarser.domain.lengths().iter().map(|n| n * ratio).collect();
            if domain.lengths() != expected {
                return Err(format!(
                    "level {}: domain {:?} is not level {} refined by {}",
                    lev,
                    domain.lengths(),
                    lev - 1,
                    ratio
                ));
            }
        }

        let mut patches = Vec::with_capacity(entry.patches.len());
        for (n, p) in entry.patches.into_iter().enumerate() {
            let region = IndexBox::new(p.lo, p.hi);
            if region.dim() != dim || region.hi.len() != dim || region.is_empty() {
                return Err(format!("level {} patch {}: invalid box", lev, n));
            }
            if !domain.contains_box(&region) {
                return Err(format!("level {} patch {}: box outside the level domain", lev, n));
            }
            if let Some(ratio) = levels.last().and_then(|c| c.ref_ratio) {
                if !region.is_aligned(ratio) {
                    return Err(format!(
                        "level {} patch {}: box is not aligned to refinement ratio {}",
                        lev, n, ratio
                    ));
                }
            }
            if let Some(m) = patches
                .iter()
                .position(|other: &Patch| other.region.intersection(&region).is_some())
            {
                return Err(format!("level {} patch {}: box overlaps patch {}", lev, n, m));
            }
            patches.push(Patch {
                region,
                file: p.file,
            });
        }

        if lev == 0 {
            let covered: usize = patches.iter().map(|p| p.region.num_cells()).sum();
            if covered != domain.num_cells() {
                return Err(format!(
                    "level 0: patches cover {} of {} domain cells",
                    covered,
                    domain.num_cells()
                ));
            }
        }

        levels.push(Level {
            domain,
            ref_ratio: entry.ref_ratio,
            patches,
        });
    }

    Ok(Hierarchy {
        prob_lo,
        prob_hi,
        levels,
    })
}

impl FieldSource for Snapshot {
    fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    fn has_field(&self, _level: usize, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    fn fill_patch(&self, level: usize, patch: usize, names: &[String]) -> Result<PatchData> {
        let patch = &self.hierarchy.levels[level].patches[patch];
        let path = self.root.join(&patch.file);
        let invalid = |reason: String| QpdError::InputData {
            path: path.display().to_string(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| invalid(e.to_string()))?;
        let headers = reader.headers().map_err(|e| invalid(e.to_string()))?.clone();

        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| QpdError::MissingField {
                    level,
                    field: name.clone(),
                })?;
            columns.push(column);
        }

        let num_cells = patch.region.num_cells();
        let mut components = vec![Vec::with_capacity(num_cells); names.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| invalid(e.to_string()))?;
            if row >= num_cells {
                return Err(invalid(format!("more than {} cell rows", num_cells)));
            }
            for (component, &column) in components.iter_mut().zip(&columns) {
                let field = record.get(column).unwrap_or("");
                let value: f64 = field.parse().map_err(|_| {
                    invalid(format!(
                        "row {}: '{}' is not a number in column '{}'",
                        row + 1,
                        field,
                        &headers[column]
                    ))
                })?;
                component.push(value);
            }
        }

        if components.first().map_or(0, |c| c.len()) != num_cells && !names.is_empty() {
            return Err(invalid(format!(
                "expected {} cell rows, found {}",
                num_cells,
                components[0].len()
            )));
        }

        Ok(PatchData { components })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 在临时目录中写入一个快照
    pub(crate) fn write_snapshot(name: &str, header: &str, patches: &[(&str, &str)]) -> PathBuf {
        let root = std::env::temp_dir().join(format!("qpd-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(HEADER_FILE), header).unwrap();
        for (file, content) in patches {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        root
    }

    const HEADER: &str = r#"
prob_lo: [0.0, 0.0]
prob_hi: [1.0, 1.0]
variables: ["X(A)", "temp", "density"]
levels:
- domain: {lo: [0, 0], hi: [1, 1]}
  ref_ratio: 2
  patches:
  - {lo: [0, 0], hi: [1, 1], file: Level_0/patch_0.csv}
- domain: {lo: [0, 0], hi: [3, 3]}
  patches:
  - {lo: [0, 0], hi: [1, 1], file: Level_1/patch_0.csv}
"#;

    const PATCH: &str = "X(A),temp,density\n1,1000,0.1\n1,1100,0.1\n1,1200,0.1\n1,1300,0.1\n";

    #[test]
    fn test_open_snapshot() {
        let root = write_snapshot(
            "open",
            HEADER,
            &[("Level_0/patch_0.csv", PATCH), ("Level_1/patch_0.csv", PATCH)],
        );
        let snapshot = open_snapshot(&root).unwrap();
        assert_eq!(snapshot.hierarchy.levels.len(), 2);
        assert_eq!(snapshot.hierarchy.finest_level(), 1);
        assert!(snapshot.has_field(0, "temp"));
        assert!(!snapshot.has_field(0, "X(B)"));

        let data = snapshot
            .fill_patch(0, 0, &["temp".to_string(), "X(A)".to_string()])
            .unwrap();
        assert_eq!(data.components[0], vec![1000.0, 1100.0, 1200.0, 1300.0]);
        assert_eq!(data.value(1, 3), 1.0);
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_missing_column_is_missing_field() {
        let root = write_snapshot("missing-col", HEADER, &[("Level_0/patch_0.csv", PATCH)]);
        let snapshot = open_snapshot(&root).unwrap();
        let err = snapshot.fill_patch(0, 0, &["X(B)".to_string()]).unwrap_err();
        assert!(matches!(err, QpdError::MissingField { level: 0, .. }));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_short_patch_rejected() {
        let root = write_snapshot(
            "short",
            HEADER,
            &[("Level_0/patch_0.csv", "X(A),temp,density\n1,1000,0.1\n")],
        );
        let snapshot = open_snapshot(&root).unwrap();
        let err = snapshot.fill_patch(0, 0, &["temp".to_string()]).unwrap_err();
        assert!(matches!(err, QpdError::InputData { .. }));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_missing_header_is_input_error() {
        let root = std::env::temp_dir().join(format!("qpd-nothing-{}", std::process::id()));
        let err = open_snapshot(&root).unwrap_err();
        assert!(matches!(err, QpdError::InputData { .. }));
    }

    fn rejection(name: &str, header: &str) -> String {
        let root = write_snapshot(name, header, &[]);
        let err = open_snapshot(&root).unwrap_err();
        fs::remove_dir_all(root).ok();
        match err {
            QpdError::InputData { reason, .. } => reason,
            other => panic!("expected InputData, got {:?}", other),
        }
    }

    const LINE: &str = r#"
prob_lo: [0.0]
prob_hi: [1.0]
variables: ["X(A)", "temp", "density"]
levels:
- domain: {lo: [0], hi: [3]}
  ref_ratio: 2
  patches:
  - {lo: [0], hi: [3], file: Level_0/patch_0.csv}
- domain: {lo: [0], hi: [7]}
  patches:
  - {lo: [2], hi: [5], file: Level_1/patch_0.csv}
"#;

    #[test]
    fn test_aligned_line_accepted() {
        let root = write_snapshot("line-ok", LINE, &[]);
        let snapshot = open_snapshot(&root).unwrap();
        assert_eq!(snapshot.hierarchy.footprint(0, 1)[0], IndexBox::new(vec![1], vec![2]));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_misaligned_fine_patch_rejected() {
        let header = LINE.replace("{lo: [2], hi: [5]", "{lo: [1], hi: [2]");
        let reason = rejection("misaligned", &header);
        assert!(reason.contains("not aligned"), "{}", reason);
    }

    #[test]
    fn test_overlapping_patches_rejected() {
        let header = LINE.replace(
            "  - {lo: [0], hi: [3], file: Level_0/patch_0.csv}\n",
            "  - {lo: [0], hi: [3], file: Level_0/patch_0.csv}\n  - {lo: [2], hi: [3], file: Level_0/patch_1.csv}\n",
        );
        let reason = rejection("overlap", &header);
        assert!(reason.contains("overlaps patch 0"), "{}", reason);

        let header = LINE.replace(
            "  - {lo: [2], hi: [5], file: Level_1/patch_0.csv}",
            "  - {lo: [2], hi: [5], file: Level_1/patch_0.csv}\n  - {lo: [4], hi: [7], file: Level_1/patch_1.csv}",
        );
        let reason = rejection("overlap-fine", &header);
        assert!(reason.contains("level 1 patch 1"), "{}", reason);
    }

    #[test]
    fn test_partial_coarse_level_rejected() {
        let header = LINE.replace("{lo: [0], hi: [3], file", "{lo: [0], hi: [1], file");
        let reason = rejection("partial", &header);
        assert!(reason.contains("cover 2 of 4"), "{}", reason);
    }

    #[test]
    fn test_inconsistent_refinement_rejected() {
        let header = HEADER.replace("hi: [3, 3]}\n  patches", "hi: [5, 5]}\n  patches");
        let root = write_snapshot("bad-ratio", &header, &[]);
        assert!(open_snapshot(&root).is_err());
        fs::remove_dir_all(root).ok();
    }
}
