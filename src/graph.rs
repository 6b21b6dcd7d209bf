//! The built molecule as a petgraph graph.

use std::collections::HashMap;

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use tracing::*;

use crate::{AtomId, Element, FragmentId, FragmentStore, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphAtom {
    pub element: Element,
    pub charge: i8,
    pub locants: Vec<String>,
    pub fragment: FragmentId,
    pub spare_valency: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphBond {
    Single,
    Double,
    Triple,
}

impl GraphBond {
    pub fn from_order(order: u8) -> Result<Self> {
        match order {
            1 => Ok(GraphBond::Single),
            2 => Ok(GraphBond::Double),
            3 => Ok(GraphBond::Triple),
            _ => Err(build_error!("Bond order {} cannot be drawn", order)),
        }
    }

    pub fn order(&self) -> u8 {
        match self {
            GraphBond::Single => 1,
            GraphBond::Double => 2,
            GraphBond::Triple => 3,
        }
    }
}

pub type MoleculeGraph = UnGraph<GraphAtom, GraphBond>;

/// Every atom and bond in `store`, fragment boundaries forgotten.
pub fn to_molecule_graph(store: &FragmentStore) -> Result<MoleculeGraph> {
    let mut graph = MoleculeGraph::default();
    let mut indices: HashMap<AtomId, NodeIndex> = HashMap::new();
    for atom in store.atoms() {
        let index = graph.add_node(GraphAtom {
            element: atom.element,
            charge: atom.charge,
            locants: atom.locants.clone(),
            fragment: atom.fragment,
            spare_valency: atom.spare_valency,
        });
        indices.insert(atom.id, index);
    }
    for bond in store.bonds() {
        graph.add_edge(indices[&bond.from], indices[&bond.to], GraphBond::from_order(bond.order)?);
    }
    debug!(
        "Molecule graph has {} atoms, {} bonds and {} pieces",
        graph.node_count(),
        graph.edge_count(),
        piece_count(&graph)
    );
    Ok(graph)
}

/// The number of disconnected pieces, e.g. 2 for a salt.
pub fn piece_count(graph: &MoleculeGraph) -> usize {
    connected_components(graph)
}

/// Empirical formula in Hill order, counting hydrogens left on each atom.
pub fn formula(store: &FragmentStore) -> String {
    let mut counts: HashMap<Element, usize> = HashMap::new();
    for atom in store.atoms() {
        *counts.entry(atom.element).or_default() += 1;
        let hydrogens = crate::valency::substitutable_hydrogens(atom).saturating_sub(atom.spare_valency) as usize;
        if hydrogens > 0 {
            *counts.entry(Element::H).or_default() += hydrogens;
        }
    }
    let mut symbols: Vec<(&str, usize)> = counts.iter().map(|(e, &n)| (e.symbol(), n)).collect();
    let has_carbon = counts.contains_key(&Element::C);
    symbols.sort_by_key(|&(symbol, _)| match symbol {
        "C" if has_carbon => (0, symbol),
        "H" if has_carbon => (1, symbol),
        _ => (2, symbol),
    });
    symbols
        .into_iter()
        .map(|(symbol, n)| if n == 1 { symbol.to_string() } else { format!("{symbol}{n}") })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{parse_template, Labels};

    #[test]
    fn test_graph_of_two_fragments() -> Result<()> {
        let mut store = FragmentStore::default();
        let ethene = store.instantiate(&parse_template("C=C").unwrap(), &Labels::Numeric)?;
        let water = store.instantiate(&parse_template("O").unwrap(), &Labels::None)?;
        let graph = to_molecule_graph(&store)?;
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(piece_count(&graph), 2);
        assert_eq!(graph.edge_weights().next(), Some(&GraphBond::Double));
        assert_eq!(graph[NodeIndex::new(2)].fragment, water);
        assert_eq!(graph[NodeIndex::new(0)].fragment, ethene);

        let c2 = store.atom_by_locant_or_throw(ethene, "2")?;
        let o = store.first_atom(water)?;
        store.create_bond(c2, o, 1)?;
        assert_eq!(piece_count(&to_molecule_graph(&store)?), 1);
        Ok(())
    }

    #[test]
    fn test_formula() -> Result<()> {
        let mut store = FragmentStore::default();
        store.instantiate(&parse_template("CCO").unwrap(), &Labels::None)?;
        assert_eq!(formula(&store), "C2H6O");

        let mut store = FragmentStore::default();
        store.instantiate(&parse_template("ClCl").unwrap(), &Labels::None)?;
        assert_eq!(formula(&store), "Cl2");

        let mut store = FragmentStore::default();
        store.instantiate(&parse_template("c1ccccc1").unwrap(), &Labels::None)?;
        assert_eq!(formula(&store), "C6H6");
        Ok(())
    }

    #[test]
    fn test_bond_orders() {
        assert_eq!(GraphBond::from_order(3).map(|b| b.order()), Ok(3));
        assert!(GraphBond::from_order(4).is_err());
    }
}
