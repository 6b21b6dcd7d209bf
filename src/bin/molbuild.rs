use anyhow::{bail, Context, Result};
use molbuild::*;
use tracing::*;

const USAGE: &str = "usage: molbuild <description> [<output.dot> [<output.png>]]";

fn main() -> Result<()> {
    init_logging(&std::env::var("MOLBUILD_LOG").unwrap_or_else(|_| "info".to_string()));

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.len() > 3 {
        bail!(USAGE);
    }
    let text = std::fs::read_to_string(&args[0]).with_context(|| format!("Failed to read {}", args[0]))?;

    let mut description = Description::parse(&text)?;
    description.build()?;

    let graph = to_molecule_graph(&description.state.store)?;
    info!(
        "Built {} with {} atoms and {} bonds in {} pieces",
        formula(&description.state.store),
        graph.node_count(),
        graph.edge_count(),
        piece_count(&graph)
    );
    println!("{}", formula(&description.state.store));

    if let Some(dot_path) = args.get(1) {
        visualize_graph(&graph, dot_path, args.get(2).map(String::as_str))?;
    }
    Ok(())
}
