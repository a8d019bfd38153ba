//! # run 命令实现
//!
//! 由网格快照与反应机理生成反应路径图通量文件。
//!
//! ## 流程
//! 1. 解析并校验配置，读取机理与快照（任何错误立即中止，不写输出）
//! 2. 并行: 多层体积积分 ‖ 边集合构建
//! 3. 参考边归一化（失败时回退为 1 并警告）
//! 4. 写出报告，可选打印伙伴诊断
//!
//! ## 依赖关系
//! - 使用 `cli/run.rs` 定义的参数, `config.rs` 校验
//! - 使用 `parsers/`, `kinetics/`, `flux/`, `batch/`
//! - 使用 `utils/output.rs`，表格由 `tabled` 输出

use crate::batch::BatchRunner;
use crate::cli::run::RunArgs;
use crate::commands::edges::print_edge_table;
use crate::config::RunConfig;
use crate::error::Result;
use crate::flux::{
    aggregate_hierarchy, build_edges, normalize, partner_breakdown, required_fields,
    AggregateOptions, FluxReport, LevelSummary, PartnerBreakdown,
};
use crate::kinetics::MassActionEvaluator;
use crate::models::Hierarchy;
use crate::parsers;
use crate::utils::output;

use tabled::{Table, Tabled};

/// 层统计表格行
#[derive(Debug, Clone, Tabled)]
struct LevelRow {
    #[tabled(rename = "Level")]
    level: usize,
    #[tabled(rename = "Patches")]
    patches: usize,
    #[tabled(rename = "Cells")]
    cells: usize,
    #[tabled(rename = "Masked")]
    masked: usize,
    #[tabled(rename = "Cell volume")]
    cell_volume: String,
    #[tabled(rename = "Volume")]
    volume: String,
}

/// 伙伴诊断表格行
#[derive(Debug, Clone, Tabled)]
struct PartnerRow {
    #[tabled(rename = "Partner")]
    partner: String,
    #[tabled(rename = "Flux")]
    flux: String,
}

fn print_level_table(hierarchy: &Hierarchy, levels: &[LevelSummary]) {
    let rows: Vec<LevelRow> = levels
        .iter()
        .map(|s| LevelRow {
            level: s.level,
            patches: s.patches,
            cells: s.cells,
            masked: s.masked,
            cell_volume: format!("{:.4e}", hierarchy.cell_volume(s.level)),
            volume: format!("{:.6e}", s.volume),
        })
        .collect();
    output::print_header("Level Integration Summary");
    println!("{}", Table::new(&rows));
}

fn print_partner_tables(species: &str, breakdowns: &[PartnerBreakdown]) {
    for breakdown in breakdowns {
        output::print_header(&format!(
            "Partners of {} on {} -> {}",
            species, breakdown.left, breakdown.right
        ));
        let rows: Vec<PartnerRow> = breakdown
            .contributions
            .iter()
            .map(|(partner, flux)| PartnerRow {
                partner: partner.clone(),
                flux: format!("{:.6e}", flux),
            })
            .collect();
        println!("{}", Table::new(&rows));
        output::print_field(
            "sum +ve, -ve",
            &format!("{:.6e} {:.6e}", breakdown.positive, breakdown.negative),
        );
        output::print_field("net", &format!("{:.6e}", breakdown.total()));
    }
}

/// 执行 run 命令
pub fn execute(args: RunArgs) -> Result<()> {
    output::print_header("Reaction Path Diagram");

    let config = RunConfig::from_args(args)?;

    let mechanism = parsers::parse_mechanism_file(&config.mechanism)?;
    config.check_species(&mechanism)?;
    output::print_info(&format!(
        "Loaded mechanism {}: {} species, {} reactions",
        config.mechanism.display(),
        mechanism.num_species(),
        mechanism.num_reactions()
    ));

    let snapshot = parsers::open_snapshot(&config.infile)?;
    let finest_level = config.resolve_finest_level(&snapshot.hierarchy)?;
    output::print_info(&format!(
        "Loaded snapshot {}: {}D, levels 0..={} of {}",
        config.infile.display(),
        snapshot.hierarchy.dim(),
        finest_level,
        snapshot.hierarchy.levels.len()
    ));

    let runner = BatchRunner::new(config.jobs)?;
    output::print_field("Tracer", &config.element);
    output::print_field("Reference", &format!("{} {}", config.reference.first, config.reference.second));
    output::print_field("Workers", &runner.jobs().to_string());
    output::print_separator();

    let evaluator = MassActionEvaluator::new(&mechanism);
    let fields = required_fields(&mechanism);
    let options = AggregateOptions {
        finest_level,
        show_progress: true,
    };

    let (aggregation, edges) = runner.join(
        || aggregate_hierarchy(&snapshot, &evaluator, &fields, &options, &runner),
        || build_edges(&mechanism, &config.element, &config.edge_options),
    );
    let aggregation = aggregation?;

    if config.verbose {
        print_level_table(&snapshot.hierarchy, &aggregation.levels);
    }
    output::print_info(&format!(
        "Integrated volume {:.6e} (domain {:.6e})",
        aggregation.totals.volume,
        snapshot.hierarchy.domain_volume()
    ));

    if mechanism.species_containing(&config.element).is_empty() {
        output::print_warning(&format!(
            "No species of the mechanism contains element '{}'; the edge set is empty",
            config.element
        ));
    } else if edges.is_empty() {
        output::print_warning(&format!(
            "No reaction transfers element '{}' between species; the edge set is empty",
            config.element
        ));
    } else {
        output::print_info(&format!("Built {} edge(s) for element '{}'", edges.len(), config.element));
    }
    if config.dump_edges {
        print_edge_table(&edges);
    }

    let (table, normalization) = normalize(&edges, &aggregation.totals, &config.reference, config.scale);
    if let Some(issue) = &normalization.issue {
        output::print_warning(&issue.to_string());
    }
    output::print_field("Norm factor", &format!("{:.6e}", normalization.factor));

    let report = FluxReport {
        label: config.label.clone(),
        species: mechanism.species_names().iter().map(|s| s.to_string()).collect(),
        table,
    };
    report.write_file(&config.output)?;
    output::print_success(&format!(
        "Wrote {} edge flux(es) to '{}'",
        report.table.rows.len(),
        config.output.display()
    ));

    if let Some(fuel) = &config.fuel {
        let breakdowns = partner_breakdown(
            &mechanism,
            &edges,
            &aggregation.totals,
            fuel,
            normalization.factor,
        );
        print_partner_tables(fuel, &breakdowns);
    }

    output::print_done("Reaction path diagram complete");
    Ok(())
}
