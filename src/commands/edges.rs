//! # edges 命令实现
//!
//! 只读取反应机理，构建并打印示踪元素的边集合。
//!
//! ## 依赖关系
//! - 使用 `cli/edges.rs` 定义的参数
//! - 使用 `parsers/mechanism.rs`, `flux/graph.rs`
//! - 使用 `utils/output.rs`，表格由 `tabled` 输出

use crate::cli::edges::EdgesArgs;
use crate::error::{QpdError, Result};
use crate::flux::{build_edges, EdgeOptions, EdgeSet};
use crate::parsers;
use crate::utils::output;

use tabled::{Table, Tabled};

/// 边表格行
#[derive(Debug, Clone, Tabled)]
struct EdgeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Left")]
    left: String,
    #[tabled(rename = "Right")]
    right: String,
    #[tabled(rename = "Hops")]
    hops: usize,
    #[tabled(rename = "Reaction weights")]
    weights: String,
}

/// 打印边集合
pub fn print_edge_table(edges: &EdgeSet) {
    let rows: Vec<EdgeRow> = edges
        .iter()
        .enumerate()
        .map(|(index, edge)| EdgeRow {
            index,
            left: edge.left_name.clone(),
            right: edge.right_name.clone(),
            hops: edge.hops,
            weights: edge
                .weights
                .iter()
                .map(|(r, c)| format!("R{}({:+.4})", r, c))
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();

    output::print_header(&format!("{} Edges for Element {}", rows.len(), edges.element));
    println!("{}", Table::new(&rows));
}

/// 执行 edges 命令
pub fn execute(args: EdgesArgs) -> Result<()> {
    output::print_header("Building Reaction Path Edges");

    if args.max_hops == 0 {
        return Err(QpdError::Configuration("maxHops must be at least 1".to_string()));
    }

    let mechanism = parsers::parse_mechanism_file(&args.mechanism)?;
    output::print_info(&format!(
        "Loaded {}: {} species, {} reactions",
        args.mechanism.display(),
        mechanism.num_species(),
        mechanism.num_reactions()
    ));

    let edges = build_edges(
        &mechanism,
        &args.atom,
        &EdgeOptions {
            max_hops: args.max_hops,
        },
    );

    if edges.is_empty() {
        let reason = if mechanism.species_containing(&args.atom).is_empty() {
            "no species of the mechanism contains it"
        } else {
            "no reaction transfers it between species"
        };
        output::print_warning(&format!(
            "The edge set for element '{}' is empty: {}",
            args.atom, reason
        ));
        return Ok(());
    }

    print_edge_table(&edges);
    output::print_done(&format!("{} edge(s) for element '{}'", edges.len(), args.atom));
    Ok(())
}
