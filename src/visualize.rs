use std::fmt::Write as FmtWrite;
use std::io::Write;

use anyhow::{bail, Context, Result};
use petgraph::visit::EdgeRef;
use tracing::*;

use crate::{Element, GraphBond, GraphAtom, MoleculeGraph};

/// Visualizes the MoleculeGraph by exporting it to a DOT format and optionally rendering it as an image.
///
/// # Arguments
///
/// * `graph` - The MoleculeGraph to visualize.
/// * `output_dot` - The path to save the DOT file.
/// * `output_image` - Optional path to save the rendered image (e.g., "molecule.png").
pub fn visualize_graph(graph: &MoleculeGraph, output_dot: &str, output_image: Option<&str>) -> Result<()> {
    let dot_string = generate_dot(graph);

    let mut file = std::fs::File::create(output_dot).with_context(|| format!("Failed to create DOT file {output_dot}"))?;
    file.write_all(dot_string.as_bytes())
        .with_context(|| format!("Failed to write to DOT file {output_dot}"))?;
    info!("DOT file saved to {}", output_dot);

    if let Some(image_path) = output_image {
        // Graphviz must be installed with `dot` on the PATH
        let status = std::process::Command::new("dot")
            .args(["-Tpng", output_dot, "-o", image_path])
            .status()
            .context("Failed to execute Graphviz 'dot' command")?;
        if !status.success() {
            bail!("Graphviz 'dot' command failed with status: {}", status);
        }
        info!("Image rendered to {}", image_path);
    }

    Ok(())
}

/// Generates a DOT representation of the MoleculeGraph. Atoms are labelled
/// with their symbol, charge, and first locant; each unit of bond order is
/// drawn as its own edge.
pub fn generate_dot(graph: &MoleculeGraph) -> String {
    let mut dot_output = String::new();
    // writing into a String cannot fail
    let _ = writeln!(dot_output, "graph Molecule {{");
    let _ = writeln!(dot_output, "    layout=neato;");

    for node in graph.node_indices() {
        let atom = &graph[node];
        let _ = writeln!(
            dot_output,
            "    {} [label=\"{}\", fontcolor=white, shape=circle, style=filled, fillcolor={}];",
            node.index(),
            atom_label(atom),
            element_to_color(atom.element)
        );
    }

    for edge in graph.edge_references() {
        let style = match edge.weight() {
            GraphBond::Single => "solid",
            GraphBond::Double | GraphBond::Triple => "bold",
        };
        for _ in 0..edge.weight().order() {
            let _ = writeln!(
                dot_output,
                "    {} -- {} [style={}, penwidth=2.0];",
                edge.source().index(),
                edge.target().index(),
                style
            );
        }
    }

    let _ = writeln!(dot_output, "}}");
    dot_output
}

fn atom_label(atom: &GraphAtom) -> String {
    let mut label = atom.element.symbol().to_string();
    match atom.charge {
        0 => {}
        1 => label.push('+'),
        -1 => label.push('-'),
        c if c > 0 => label.push_str(&format!("{c}+")),
        c => label.push_str(&format!("{}-", -c)),
    }
    if let Some(locant) = atom.locants.first() {
        label.push_str(&format!("\\n{locant}"));
    }
    label
}

/// Assigns colors to elements for visualization.
fn element_to_color(element: Element) -> &'static str {
    use Element::*;
    match element {
        C => "black",
        H => "gray",
        O => "red",
        N => "blue",
        F | Cl => "darkgreen",
        Br => "brown",
        I => "purple",
        S | Se | Te => "gold4",
        P | As | Sb => "darkorange",
        B | Si | Ge => "tan4",
        _ => "slategray",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_logging, to_molecule_graph, Description};

    #[test]
    fn test_atom_label() {
        let atom = GraphAtom {
            element: Element::N,
            charge: 1,
            locants: vec!["4".into()],
            fragment: crate::FragmentId(0),
            spare_valency: 0,
        };
        assert_eq!(atom_label(&atom), "N+\\n4");
        let atom = GraphAtom {
            charge: -2,
            locants: Vec::new(),
            ..atom
        };
        assert_eq!(atom_label(&atom), "N2-");
    }

    #[test]
    fn draw_chloroethanol() -> Result<()> {
        init_logging("info");
        let mut description = Description::parse(
            "{word {substituent locant=2 {group chloro ClR}} {root {group ethan CC suffix=O@1}}}",
        )?;
        description.build()?;
        let graph = to_molecule_graph(&description.state.store)?;
        let dot = generate_dot(&graph);
        assert_eq!(dot.matches(" -- ").count(), 3);
        assert!(dot.contains("label=\"Cl"));
        assert!(dot.contains("fillcolor=red"));

        let path = std::env::temp_dir().join("molbuild_chloroethanol.dot");
        visualize_graph(&graph, &path.to_string_lossy(), None)?;
        assert_eq!(std::fs::read_to_string(&path)?, dot);
        Ok(())
    }

    #[test]
    fn test_double_bond_drawn_twice() -> Result<()> {
        let mut description = Description::parse("{word {root {group ethen C=C}}}")?;
        description.build()?;
        let dot = generate_dot(&to_molecule_graph(&description.state.store)?);
        assert_eq!(dot.matches("style=bold").count(), 2);
        Ok(())
    }
}
