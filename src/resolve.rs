//! Attachment resolution: the atom and bond level decisions made for one
//! substituent, bracket, or root.
//!
//! Non-bonding features (hydrogen markers, unsaturators, heteroatom
//! replacement) are applied to the component's own fragment first. Then
//! the component's pending attachment points are bonded either additively
//! (fragment to fragment, consuming an attachment point on both sides) or
//! substitutively (onto a particular atom of another fragment).

use std::collections::VecDeque;

use tracing::*;

use crate::multiply::{multiply_out_and_additively_bond, multiply_out_and_substitute, perform_multiplicative_operations};
use crate::scope::{find_alternative_fragments, find_fragment_with_locant, next_in_scope_fragment, next_in_scope_multi_valent_fragment};
use crate::valency::{check_valency_available_for_bond, check_valency_available_for_replacement_by_heteroatom, substitutable_hydrogens};
use crate::{AtomId, BuildResults, BuildState, FragmentId, FragmentStore, NodeId, NodeKind, ParseTree, Result};

/// The marker children of a substituent or root, in document order.
#[derive(Debug, Default)]
struct Features {
    unsaturators: Vec<NodeId>,
    heteroatoms: Vec<NodeId>,
    hydrogens: Vec<NodeId>,
}

impl Features {
    fn of(tree: &ParseTree, node: NodeId) -> Self {
        let mut features = Self::default();
        for &child in tree.children(node) {
            match tree.kind(child) {
                NodeKind::Unsaturator { .. } => features.unsaturators.push(child),
                NodeKind::Heteroatom { .. } => features.heteroatoms.push(child),
                NodeKind::Hydrogen { .. } => features.hydrogens.push(child),
                _ => {}
            }
        }
        features
    }
}

fn marker_locant(tree: &ParseTree, marker: NodeId) -> Option<String> {
    match tree.kind(marker) {
        NodeKind::Unsaturator { locant, .. }
        | NodeKind::Heteroatom { locant, .. }
        | NodeKind::Hydrogen { locant, .. }
        | NodeKind::Stereodescriptor { locant, .. } => locant.clone(),
        _ => None,
    }
}

/// Apply the hydrogen, unsaturation, and heteroatom markers of `node` that
/// name their atom by locant. Markers without one are left in place.
pub fn resolve_locanted_features(state: &mut BuildState, node: NodeId) -> Result<()> {
    let group = state.tree.group_child(node)?;
    let frag = state.fragment_of(group)?;
    let features = Features::of(&state.tree, node);

    for &marker in features.hydrogens.iter().rev() {
        if let Some(locant) = marker_locant(&state.tree, marker) {
            let atom = state.store.atom_by_locant_or_throw(frag, &locant)?;
            state.store.subtract_spare_valency(atom, 1)?;
            state.tree.detach(marker);
        }
    }

    for &marker in features.unsaturators.iter().rev() {
        let NodeKind::Unsaturator { bond_order, locant: Some(locant), compound_locant } = state.tree.kind(marker).clone() else {
            continue;
        };
        if bond_order <= 1 {
            continue;
        }
        let first = state.store.atom_by_locant_or_throw(frag, &locant)?;
        let second = match compound_locant {
            Some(compound) => Some(state.store.atom_by_locant_or_throw(frag, &compound)?),
            None => None,
        };
        state.store.unsaturate(first, second, bond_order)?;
        state.tree.detach(marker);
    }

    for &marker in features.heteroatoms.iter().rev() {
        let NodeKind::Heteroatom { element, locant: Some(locant) } = state.tree.kind(marker).clone() else {
            continue;
        };
        let atom = state.store.atom_by_locant_or_throw(frag, &locant)?;
        state.store.make_heteroatom(atom, element, true)?;
        state.tree.detach(marker);
    }
    Ok(())
}

/// Place the remaining markers of `node` and pin its unpinned attachment
/// points, scanning forward from the start of the fragment.
pub fn resolve_unlocanted_features(state: &mut BuildState, node: NodeId) -> Result<()> {
    let group = state.tree.group_child(node)?;
    let frag = state.fragment_of(group)?;
    let features = Features::of(&state.tree, node);

    if !features.hydrogens.is_empty() {
        apply_hydrogen_markers(state, frag, &features.hydrogens)?;
    }

    let atoms = state.store.fragment(frag).atoms.clone();
    let mut position = 0;
    for &marker in &features.unsaturators {
        let NodeKind::Unsaturator { bond_order, compound_locant, .. } = state.tree.kind(marker).clone() else {
            continue;
        };
        if bond_order <= 1 {
            continue;
        }
        let accepts = |store: &FragmentStore, atom: AtomId| {
            let atom = store.atom(atom);
            atom.spare_valency == 0 && check_valency_available_for_bond(atom, bond_order - 1 + atom.out_valency)
        };
        let first = loop {
            let (Some(&first), Some(&second)) = (atoms.get(position), atoms.get(position + 1)) else {
                bail_build!("No suitable atom found for a bond of order {}", bond_order);
            };
            if state.store.atom(first).is_suffix() || state.store.atom(second).is_suffix() {
                bail_build!("No suitable atom found for a bond of order {}", bond_order);
            }
            if accepts(&state.store, first) && accepts(&state.store, second) {
                break first;
            }
            position += 1;
        };
        trace!("Unlocanted unsaturation of order {} placed at atom {}", bond_order, first.0);
        let second = match compound_locant {
            Some(compound) => Some(state.store.atom_by_locant_or_throw(frag, &compound)?),
            None => None,
        };
        state.store.unsaturate(first, second, bond_order)?;
        position += 2;
        state.tree.detach(marker);
    }

    position = 0;
    for &marker in &features.heteroatoms {
        let NodeKind::Heteroatom { element, .. } = state.tree.kind(marker).clone() else {
            continue;
        };
        let atom = loop {
            let Some(&atom) = atoms.get(position) else {
                bail_build!("No suitable atom found for replacement by {}", element);
            };
            if state.store.atom(atom).is_suffix() {
                bail_build!("No suitable atom found for replacement by {}", element);
            }
            if check_valency_available_for_replacement_by_heteroatom(state.store.atom(atom), element) {
                break atom;
            }
            position += 1;
        };
        trace!("Unlocanted {} replacement placed at atom {}", element, atom.0);
        state.store.make_heteroatom(atom, element, true)?;
        position += 1;
        state.tree.detach(marker);
    }

    for index in 0..state.store.fragment(frag).out_ids.len() {
        let out = state.store.fragment(frag).out_ids[index];
        if out.pinned {
            continue;
        }
        let mut position = state.store.position_of(frag, out.atom)?;
        let atom = loop {
            let Some(&atom) = atoms.get(position) else {
                bail_build!("No suitable atom found for an attachment point of order {}", out.order);
            };
            let candidate = state.store.atom(atom);
            if candidate.is_suffix() {
                bail_build!("No suitable atom found for an attachment point of order {}", out.order);
            }
            if check_valency_available_for_bond(candidate, candidate.spare_valency + candidate.out_valency + out.order) {
                break atom;
            }
            position += 1;
        };
        state.store.pin_out_id(frag, index, atom);
    }
    Ok(())
}

/// Each marker removes one spare valency. Atoms whose spare valency a suffix
/// will take anyway are only used once the others run out.
fn apply_hydrogen_markers(state: &mut BuildState, frag: FragmentId, markers: &[NodeId]) -> Result<()> {
    let mut candidates = VecDeque::new();
    let mut implicitly_saturated = Vec::new();
    for atom in state.store.fragment(frag).atoms.clone() {
        if state.store.atom(atom).is_suffix() {
            break;
        }
        state.store.ensure_spare_valency_consistent(atom, false);
        let atom = state.store.atom(atom);
        if atom.spare_valency >= 1 {
            if atom.one_suffix_attached {
                implicitly_saturated.push(atom.id);
            } else {
                candidates.push_back(atom.id);
            }
        }
    }
    candidates.extend(implicitly_saturated);
    if markers.len() > candidates.len() {
        bail_build!(
            "Cannot find atom to add hydrogen to ({} hydrogen adding markers but only {} positions that can be hydrogenated)",
            markers.len(),
            candidates.len()
        );
    }
    for (&marker, atom) in markers.iter().zip(candidates) {
        state.store.subtract_spare_valency(atom, 1)?;
        state.tree.detach(marker);
    }
    Ok(())
}

/// Whether anything other than a hyphen follows `node` in its parent.
pub fn potentially_can_substitute(tree: &ParseTree, node: NodeId) -> bool {
    tree.following_siblings(node)
        .into_iter()
        .any(|sibling| !matches!(tree.kind(sibling), NodeKind::Hyphen))
}

/// Bond an unlocanted component additively where nomenclature demands it:
/// the first link of a multiplicative name, multi-radicals such as
/// ethyleneoxy, and prefixes onto multi-radicals such as chlorocarbonyl.
pub fn perform_additive_operations(state: &mut BuildState, node: NodeId) -> Result<()> {
    if state.tree.locant(node).is_some() {
        return Ok(());
    }
    let group = state.tree.effective_group(node)?;
    if state.tree.is_resolved(group) {
        return Ok(());
    }
    let frag = state.fragment_of(group)?;
    if state.out_count(frag) == 0 {
        return Ok(());
    }
    match state.tree.multiplier(node) {
        None => additive_operations_unmultiplied(state, node, group, frag),
        Some(multiplier) => additive_operations_multiplied(state, node, group, multiplier as usize),
    }
}

fn additive_operations_unmultiplied(state: &mut BuildState, node: NodeId, group: NodeId, frag: FragmentId) -> Result<()> {
    if let Some(next) = state.tree.next_sibling(node) {
        if let Some(multiplier) = state.tree.multiplier(next) {
            if state.out_count(frag) >= multiplier as usize {
                state.tree.mark_resolved(group);
                let component = state
                    .tree
                    .parent(group)
                    .ok_or_else(|| build_error!("Group {} has no parent", state.describe(frag)))?;
                let results = BuildResults::from_subtree(state, component)?;
                return perform_multiplicative_operations(state, results, next);
            }
        }
    }

    if state.is_multi_radical(frag)? {
        if let Some(partner) = next_in_scope_multi_valent_fragment(state, node)? {
            let partner_component = state.tree.parent(state.group_of(partner)?);
            if partner_component.is_some_and(|component| state.tree.is_multiplied(component)) {
                bail_build!("Attempted to form additive bond to a multiplied component");
            }
            state.tree.mark_resolved(group);
            join_additively(state, frag, partner)?;
        }
        return Ok(());
    }

    if let Some(partner) = next_in_scope_fragment(state, node)? {
        if state.out_count(partner) >= 1 && state.is_multi_radical(partner)? {
            let to = state.store.fragment(partner).out_ids[0].atom;
            state.tree.mark_resolved(group);
            return if substitutable_hydrogens(state.store.atom(to)) > 0 {
                // e.g. aminomethylene
                join_substitutively(state, frag, to)
            } else {
                // e.g. aminocarbonyl
                join_additively(state, frag, partner)
            };
        }
    }

    if let Some(&partner) = find_alternative_fragments(state, node)?.first() {
        if state.is_multi_radical(partner)? && state.out_count(partner) > 0 {
            // e.g. hydroxy(sulfanyl)phosphoryl
            state.tree.mark_resolved(group);
            join_additively(state, frag, partner)?;
        }
    }
    Ok(())
}

/// e.g. dimethoxyphosphoryl: every copy bonds additively to the same
/// multi-radical, which must have room for all of them.
fn additive_operations_multiplied(state: &mut BuildState, node: NodeId, group: NodeId, multiplier: usize) -> Result<()> {
    let Some(&partner) = find_alternative_fragments(state, node)?.first() else {
        return Ok(());
    };
    let partner_group = state.group_data(partner)?;
    let outs = state.out_count(partner);
    let has_room = if partner_group.is_resolved() {
        outs >= multiplier
    } else {
        outs > multiplier
    };
    if partner_group.is_multi_radical && has_room {
        state.tree.mark_resolved(group);
        multiply_out_and_additively_bond(state, node, partner)?;
    }
    Ok(())
}

/// Bond a locanted component onto the atom its locant names, anywhere in
/// scope. A multiplied component is expanded first, one locant per copy.
pub fn perform_locanted_substitutive_operations(state: &mut BuildState, node: NodeId) -> Result<()> {
    let group = state.tree.effective_group(node)?;
    if state.tree.is_resolved(group) {
        return Ok(());
    }
    let frag = state.fragment_of(group)?;
    let Some(locant) = state.tree.locant(node).map(str::to_string) else {
        return Ok(());
    };
    if state.out_count(frag) == 0 {
        return Ok(());
    }
    merge_out_ids_or_throw(&mut state.store, frag)?;
    if state.tree.is_multiplied(node) {
        return multiply_out_and_substitute(state, node);
    }

    let parent_frag = find_fragment_with_locant(state, node, &locant)?
        .ok_or_else(|| build_error!("Cannot find in scope fragment with atom with locant {}", locant))?;
    state.tree.mark_resolved(group);
    let atom = state.store.atom_by_locant_or_throw(parent_frag, &locant)?;
    if locant_on_multi_radical_is_additive(state, frag, parent_frag, atom)? {
        join_additively(state, frag, parent_frag)
    } else {
        join_substitutively(state, frag, atom)
    }
}

/// Bond an unlocanted component onto the first fragment in scope with an
/// atom able to take it.
pub fn perform_unlocanted_substitutive_operations(state: &mut BuildState, node: NodeId) -> Result<()> {
    let group = state.tree.effective_group(node)?;
    if state.tree.is_resolved(group) {
        return Ok(());
    }
    let frag = state.fragment_of(group)?;
    if state.out_count(frag) == 0 {
        return Ok(());
    }
    if state.tree.locant(node).is_some() {
        bail_build!(
            "{} has an unused attachment point and a locant but locanted substitution should already have been performed",
            state.describe(frag)
        );
    }
    merge_out_ids_or_throw(&mut state.store, frag)?;
    if state.tree.is_multiplied(node) {
        return multiply_out_and_substitute(state, node);
    }

    let out = state.store.fragment(frag).out_ids[0];
    let to = find_atom_for_substitution(state, node, out.order)?.ok_or_else(|| {
        build_error!(
            "Unlocanted substitution failed: unable to find suitable atom to bond atom {} to",
            out.atom.0
        )
    })?;
    state.tree.mark_resolved(group);
    join_substitutively(state, frag, to)
}

/// Rule `LOCANT_ON_MULTI_RADICAL_IS_ADDITIVE`.
///
/// A locant naming an atom that still carries an outgoing attachment point
/// of a multi-radical, when the substituent itself has a single bond to
/// make, is read as additive, e.g. C-methylcarbonimidoyl. This is a
/// deliberately narrow exception and should not be widened.
pub fn locant_on_multi_radical_is_additive(
    state: &BuildState,
    frag: FragmentId,
    parent_frag: FragmentId,
    atom: AtomId,
) -> Result<bool> {
    let parent = state.store.fragment(parent_frag);
    Ok(!parent.out_ids.is_empty()
        && state.is_multi_radical(parent_frag)?
        && state.store.atom(atom).out_valency > 0
        && state.store.fragment(frag).out_ids.first().is_some_and(|out| out.order == 1))
}

/// Collapse several attachment points on one atom into a single pinned one
/// whose order is their sum, e.g. the methylene of methylenecyclohexane.
/// Attachment points on different atoms cannot be combined.
pub fn merge_out_ids_or_throw(store: &mut FragmentStore, frag: FragmentId) -> Result<()> {
    let out_ids = &store.fragment(frag).out_ids;
    if out_ids.len() <= 1 {
        return Ok(());
    }
    let atom = out_ids[0].atom;
    if out_ids.iter().any(|out| out.atom != atom) {
        bail_build!(
            "Substitutive bond formation failure: fragment expected to have one attachment point but had {}",
            out_ids.len()
        );
    }
    let order: u8 = out_ids.iter().map(|out| out.order).sum();
    while let Some(last) = store.fragment(frag).out_ids.len().checked_sub(1) {
        store.remove_out_id(frag, last);
    }
    trace!("Merged attachment points of fragment {} into one of order {}", frag.0, order);
    store.add_out_id(frag, atom, order, true)
}

/// Bond `frag` to `parent_frag`, consuming an attachment point on each.
///
/// The parent offers its sole incoming attachment point if it has one,
/// otherwise its first outgoing one. The child offers its last attachment
/// point of that order, or failing that enough of its trailing ones to add
/// up to it (nitrilo bonding as -N=).
pub fn join_additively(state: &mut BuildState, frag: FragmentId, parent_frag: FragmentId) -> Result<()> {
    let (to, order) = if state.store.fragment(parent_frag).in_ids.len() == 1 {
        let in_id = state.store.remove_in_id(parent_frag, 0);
        (in_id.atom, in_id.order)
    } else {
        let Some(&out) = state.store.fragment(parent_frag).out_ids.first() else {
            bail_build!("Additive bond formation failure: fragment expected to have at least one attachment point but had none");
        };
        let to = if out.pinned {
            out.atom
        } else {
            state.store.atom_or_next_suitable_or_throw(out.atom, out.order)?
        };
        state.store.remove_out_id(parent_frag, 0);
        (to, out.order)
    };

    let out_ids = state.store.fragment(frag).out_ids.clone();
    if out_ids.is_empty() {
        bail_build!("Additive bond formation failure: fragment expected to have at least one attachment point but had none");
    }
    let chosen = match out_ids.iter().rposition(|out| out.order == order) {
        Some(index) => index,
        None => {
            if out_ids.len() < order as usize {
                bail_build!("Additive bond formation failure: bond order disagreement");
            }
            let mut total = 0;
            let mut chosen = None;
            for index in (0..out_ids.len()).rev() {
                total += out_ids[index].order;
                if total == order {
                    chosen = Some(index);
                    break;
                }
                state.store.remove_out_id(frag, index);
            }
            chosen.ok_or_else(|| build_error!("Additive bond formation failure: bond order disagreement"))?
        }
    };
    let out = state.store.fragment(frag).out_ids[chosen];
    let from = if out.pinned {
        out.atom
    } else {
        state.store.atom_or_next_suitable_or_throw(out.atom, order)?
    };
    state.store.remove_out_id(frag, chosen);

    state.store.create_bond(from, to, order)?;
    debug!(
        "Additively bonded {} ({}) {} ({})",
        from.0,
        state.describe(frag),
        to.0,
        state.describe(parent_frag)
    );
    Ok(())
}

/// Bond the sole attachment point of `frag` onto `to`.
pub fn join_substitutively(state: &mut BuildState, frag: FragmentId, to: AtomId) -> Result<()> {
    let out_ids = &state.store.fragment(frag).out_ids;
    if out_ids.len() != 1 {
        bail_build!(
            "Substitutive bond formation failure: fragment expected to have one attachment point but had {}",
            out_ids.len()
        );
    }
    let out = out_ids[0];
    let mut order = out.order;
    if order == 1 && state.group_data(frag)?.forms_double_bond_when_substituted {
        // methylene, imino
        order = 2;
    }
    let from = if out.pinned {
        out.atom
    } else {
        state.store.atom_or_next_suitable_or_throw(out.atom, order)?
    };
    state.store.remove_out_id(frag, 0);

    state.store.create_bond(from, to, order)?;
    debug!(
        "Substitutively bonded {} ({}) {} ({})",
        from.0,
        state.describe(frag),
        to.0,
        state.describe(state.store.atom(to).fragment)
    );
    Ok(())
}

/// The first atom in scope of `node`, trying each candidate fragment from
/// its default in-atom onward, that can take a bond of `order`.
pub fn find_atom_for_substitution(state: &BuildState, node: NodeId, order: u8) -> Result<Option<AtomId>> {
    for frag in find_alternative_fragments(state, node)? {
        let default = state.store.default_in_atom(frag)?;
        if let Some(atom) = state.store.atom_or_next_suitable(default, order, true) {
            return Ok(Some(atom));
        }
    }
    Ok(None)
}
