//! Expansion of multiplied components, and the chain of additive bonds
//! that multiplicative nomenclature builds.
//!
//! Copies of a multiplied component are resolved one at a time while the
//! others are out of the tree, so copies never bond to each other.

use tracing::*;

use crate::resolve::{join_additively, perform_locanted_substitutive_operations, perform_unlocanted_substitutive_operations};
use crate::state::primes;
use crate::{BuildState, FragmentId, InLocants, NodeId, NodeKind, Result};

/// The open attachment points of a partly built structure, one entry per
/// attachment point naming the fragment that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResults {
    out_owners: Vec<FragmentId>,
}

impl BuildResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather the attachment points of every fragment below `node`.
    pub fn from_subtree(state: &BuildState, node: NodeId) -> Result<Self> {
        let mut results = Self::new();
        for group in state.tree.groups_in(node) {
            let frag = state.fragment_of(group)?;
            results
                .out_owners
                .extend(std::iter::repeat(frag).take(state.out_count(frag)));
        }
        Ok(results)
    }

    pub fn merge(&mut self, other: BuildResults) {
        self.out_owners.extend(other.out_owners);
    }

    pub fn out_count(&self) -> usize {
        self.out_owners.len()
    }

    pub fn owner(&self, index: usize) -> Result<FragmentId> {
        self.out_owners
            .get(index)
            .copied()
            .ok_or_else(|| build_error!("No attachment point {} among {}", index, self.out_owners.len()))
    }
}

fn take_multiplier(state: &mut BuildState, node: NodeId) -> Result<usize> {
    let kind = state.tree.kind(node).name();
    let multiplier = state
        .tree
        .component_mut(node)
        .and_then(|component| component.multiplier.take())
        .ok_or_else(|| build_error!("Expected a multiplier on {}", kind))?;
    if multiplier == 0 {
        bail_build!("A multiplier of zero on {} cannot be expanded", kind);
    }
    Ok(multiplier as usize)
}

/// Expand a multiplied component and substitute each copy, e.g. the ethyl
/// groups of 1,2-diethylbenzene or diethylbenzene.
///
/// A locant list, when present, gives each copy its own locant and must
/// have one entry per copy. Copies end up in the tree in reading order:
/// the original first, then the copies by number of primes.
pub fn multiply_out_and_substitute(state: &mut BuildState, node: NodeId) -> Result<()> {
    let multiplier = take_multiplier(state, node)?;
    let locants: Option<Vec<String>> = state
        .tree
        .locant(node)
        .map(|locants| locants.split(',').map(str::to_string).collect());
    if let Some(locants) = &locants {
        if locants.len() != multiplier {
            bail_build!(
                "Multiplier {} disagrees with the {} locants {}",
                multiplier,
                locants.len(),
                locants.join(",")
            );
        }
    }
    let (parent, index) = state
        .tree
        .detach(node)
        .ok_or_else(|| build_error!("Multiplied {} has no parent", state.tree.kind(node).name()))?;

    let mut instances = Vec::with_capacity(multiplier);
    for i in (0..multiplier).rev() {
        let instance = if i == 0 {
            node
        } else {
            state.clone_subtree(node, &primes(i))?
        };
        instances.push(instance);
        state.tree.insert_child(parent, index, instance);
        match &locants {
            Some(locants) => {
                if let Some(component) = state.tree.component_mut(instance) {
                    component.locant = Some(locants[i].clone());
                }
                perform_locanted_substitutive_operations(state, instance)?;
            }
            None => perform_unlocanted_substitutive_operations(state, instance)?,
        }
        state.tree.detach(instance);
    }
    trace!("Expanded {:?} into {} copies", node, instances.len());
    for instance in instances {
        state.tree.insert_child(parent, index, instance);
    }
    Ok(())
}

/// Expand a multiplied component and bond every copy additively to
/// `partner`, e.g. bis(methylamino)phosphoryl.
pub fn multiply_out_and_additively_bond(state: &mut BuildState, node: NodeId, partner: FragmentId) -> Result<()> {
    let multiplier = take_multiplier(state, node)?;
    let mut clones = Vec::new();
    for i in (0..multiplier).rev() {
        let instance = if i == 0 {
            node
        } else {
            let clone = state.clone_subtree(node, &primes(i))?;
            clones.push(clone);
            clone
        };
        let group = state.tree.effective_group(instance)?;
        let frag = state.fragment_of(group)?;
        let outs = state.out_count(frag);
        if outs != 1 {
            bail_build!(
                "Additive bond formation failure: fragment expected to have one attachment point in this case but had {}",
                outs
            );
        }
        join_additively(state, frag, partner)?;
        state.tree.mark_resolved(group);
    }
    for clone in clones {
        state.tree.insert_after(node, clone)?;
    }
    Ok(())
}

/// One link of a multiplicative name: `multiplied` is expanded into one copy
/// per open attachment point in `results`, and each copy is bonded to one of
/// them.
///
/// A root with in-locants ends the chain. Any other copy keeps its
/// remaining attachment points, which become the open points for the next
/// multiplied component.
pub fn perform_multiplicative_operations(state: &mut BuildState, results: BuildResults, multiplied: NodeId) -> Result<()> {
    let multiplier = take_multiplier(state, multiplied)?;
    if multiplier != results.out_count() {
        bail_build!(
            "Multiplication bond formation failure: multiplier {} disagrees with {} open attachment points",
            multiplier,
            results.out_count()
        );
    }
    debug!("{} multiplicative bonds to be formed", multiplier);

    let mut in_locants = match state.tree.kind(multiplied) {
        NodeKind::Root { in_locants, .. } => in_locants.clone(),
        _ => None,
    };
    if let Some(InLocants::Explicit(locants)) = &in_locants {
        if locants.len() != multiplier {
            bail_build!("Mismatch between multiplier and number of in-locants in multiplicative nomenclature");
        }
    }

    let mut clones = Vec::new();
    let mut next_results = BuildResults::new();
    for i in (0..multiplier).rev() {
        let instance = if i == 0 {
            multiplied
        } else {
            let clone = state.clone_subtree(multiplied, &primes(i))?;
            clones.push(clone);
            clone
        };
        let group = state.tree.effective_group(instance)?;
        state.tree.mark_resolved(group);
        let frag = state.fragment_of(group)?;

        match &mut in_locants {
            Some(InLocants::Default) => {
                let atom = state.store.default_in_atom(frag)?;
                state.store.add_in_id(frag, atom, 1)?;
            }
            Some(InLocants::Explicit(locants)) => {
                let found = (0..locants.len())
                    .rev()
                    .find_map(|j| state.store.atom_by_locant(frag, &locants[j]).map(|atom| (j, atom)));
                let Some((j, atom)) = found else {
                    bail_build!(
                        "In-locants {} were either misassigned to the root or were invalid",
                        locants.join(",")
                    );
                };
                locants.remove(j);
                state.store.add_in_id(frag, atom, 1)?;
            }
            None => {}
        }

        let fragment = state.store.fragment(frag);
        if fragment.in_ids.len() != 1 && fragment.out_ids.is_empty() {
            bail_build!(
                "Multiplication bond formation failure: {} has nowhere to accept a bond",
                state.describe(frag)
            );
        }
        join_additively(state, results.owner(i)?, frag)?;
        if in_locants.is_none() {
            next_results.merge(BuildResults::from_subtree(state, instance)?);
        }
    }

    if in_locants.is_none() {
        if next_results.out_count() < 2 {
            bail_build!(
                "Multiplicative nomenclature cannot continue with {} open attachment points",
                next_results.out_count()
            );
        }
        let next = next_multiplied_link(state, multiplied)?;
        perform_multiplicative_operations(state, next_results, next)?;
    }

    for clone in clones {
        state.tree.insert_after(multiplied, clone)?;
    }
    Ok(())
}

/// The component continuing a multiplicative chain after `node`: its next
/// substituent, bracket, or root sibling, or the one after its enclosing
/// bracket. It must carry a multiplier.
fn next_multiplied_link(state: &BuildState, node: NodeId) -> Result<NodeId> {
    let next_component = |node: NodeId| {
        state
            .tree
            .following_siblings(node)
            .into_iter()
            .find(|&sibling| state.tree.is_component(sibling))
    };
    let next = match next_component(node) {
        Some(next) => next,
        None => {
            let parent = state
                .tree
                .parent(node)
                .filter(|&parent| matches!(state.tree.kind(parent), NodeKind::Bracket(_)))
                .ok_or_else(|| build_error!("Could not find suitable component to continue multiplicative nomenclature"))?;
            next_component(parent)
                .ok_or_else(|| build_error!("Could not find suitable component to continue multiplicative nomenclature"))?
        }
    };
    if !state.tree.is_multiplied(next) {
        bail_build!("Multiplier not found where one was expected to continue multiplicative nomenclature");
    }
    Ok(next)
}
