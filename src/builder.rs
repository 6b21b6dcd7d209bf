//! Walks a word (or bracket) and bonds everything in it together.
//!
//! Two whole-subtree passes are made: the first applies everything that
//! names its atom by locant, the second places what remains. Within each
//! pass the components of a word or bracket are visited right to left.
//! Expanding a multiplier only ever inserts copies at the position being
//! visited, so a snapshot of the children taken up front stays valid and
//! no component is visited twice.

use tracing::*;

use crate::resolve::{
    perform_additive_operations, perform_locanted_substitutive_operations, perform_unlocanted_substitutive_operations,
    potentially_can_substitute, resolve_locanted_features, resolve_unlocanted_features,
};
use crate::{BuildState, NodeId, NodeKind, Result};

fn require_word_or_bracket(state: &BuildState, node: NodeId) -> Result<()> {
    if !state.tree.is_word_or_bracket(node) {
        bail_build!("A word or bracket is the expected input, found a {}", state.tree.kind(node).name());
    }
    Ok(())
}

/// Resolve everything in a word or bracket, then check that nothing was
/// left over: every multiplier expanded, and every group but the last
/// bonded to something.
pub fn resolve_word_or_bracket(state: &mut BuildState, node: NodeId) -> Result<()> {
    require_word_or_bracket(state, node)?;
    resolve_locanted_pass(state, node)?;
    resolve_unlocanted_pass(state, node)?;

    for descendant in state.tree.descendants(node) {
        if state.tree.is_component(descendant) && state.tree.is_multiplied(descendant) {
            bail_build!("Multiplier on {} was never used", state.tree.kind(descendant).name());
        }
    }
    let groups = state.tree.groups_in(node);
    for (i, &group) in groups.iter().enumerate() {
        if !state.tree.is_resolved(group) && i != groups.len() - 1 {
            let text = state.tree.group(group).map(|group| group.text.as_str()).unwrap_or_default();
            bail_build!("Bond was not made from {} but one should have been", text);
        }
    }
    Ok(())
}

/// Locanted features, additive bonding, then locanted substitution.
pub fn resolve_locanted_pass(state: &mut BuildState, node: NodeId) -> Result<()> {
    require_word_or_bracket(state, node)?;
    let children = state.tree.component_children(node);
    for &child in children.iter().rev() {
        if matches!(state.tree.kind(child), NodeKind::Bracket(_)) {
            resolve_locanted_pass(state, child)?;
            if potentially_can_substitute(&state.tree, child) {
                perform_additive_operations(state, child)?;
                perform_locanted_substitutive_operations(state, child)?;
            }
        } else {
            resolve_component_locanted(state, child)?;
        }
    }
    Ok(())
}

/// Unlocanted features, then unlocanted substitution.
pub fn resolve_unlocanted_pass(state: &mut BuildState, node: NodeId) -> Result<()> {
    require_word_or_bracket(state, node)?;
    let children = state.tree.component_children(node);
    for &child in children.iter().rev() {
        if matches!(state.tree.kind(child), NodeKind::Bracket(_)) {
            resolve_unlocanted_pass(state, child)?;
            if potentially_can_substitute(&state.tree, child) {
                perform_unlocanted_substitutive_operations(state, child)?;
            }
        } else {
            resolve_component_unlocanted(state, child)?;
        }
    }
    Ok(())
}

fn resolve_component_locanted(state: &mut BuildState, node: NodeId) -> Result<()> {
    resolve_locanted_features(state, node)?;
    if potentially_can_substitute(&state.tree, node) {
        // e.g. ethylenediimino, then 2-methyltoluene
        perform_additive_operations(state, node)?;
        perform_locanted_substitutive_operations(state, node)?;
    }
    Ok(())
}

fn resolve_component_unlocanted(state: &mut BuildState, node: NodeId) -> Result<()> {
    // decided before the features are placed, since placing them may
    // consume what the decision depends on
    let can_substitute = potentially_can_substitute(&state.tree, node);
    resolve_unlocanted_features(state, node)?;
    if can_substitute {
        // e.g. tetramethylfuran
        perform_unlocanted_substitutive_operations(state, node)?;
    }
    Ok(())
}

/// Resolve each word of a name in turn. Words are independent of each
/// other here: joining them is left to the caller.
pub fn build_words(state: &mut BuildState, words: &[NodeId]) -> Result<()> {
    for &word in words {
        if !matches!(state.tree.kind(word), NodeKind::Word) {
            bail_build!("Expected a word, found a {}", state.tree.kind(word).name());
        }
        resolve_word_or_bracket(state, word)?;
        info!(
            "Built word with {} groups",
            state.tree.groups_in(word).len()
        );
    }
    Ok(())
}
