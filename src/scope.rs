//! Searches for the fragments a component may bond to.
//!
//! A component sees the siblings that follow it in its parent, and
//! everything nested inside those siblings' brackets. Siblings that still
//! carry a multiplier are invisible until they have been expanded.

use tracing::*;

use crate::{BuildState, FragmentId, NodeId, NodeKind, Result};

fn parent_or_throw(state: &BuildState, node: NodeId) -> Result<NodeId> {
    state
        .tree
        .parent(node)
        .ok_or_else(|| build_error!("{} did not have a parent", state.tree.kind(node).name()))
}

/// Unmultiplied substituents, brackets, and roots after `node`.
fn later_unmultiplied_components(state: &BuildState, node: NodeId) -> Result<Vec<NodeId>> {
    let parent = parent_or_throw(state, node)?;
    let index = state.tree.index_of(node).unwrap_or_default();
    Ok(state.tree.children(parent)[index + 1..]
        .iter()
        .copied()
        .filter(|&child| state.tree.is_component(child) && !state.tree.is_multiplied(child))
        .collect())
}

/// The substituents and roots a component stands for: itself, or for a
/// bracket everything below it in depth first order.
fn substituents_and_roots(state: &BuildState, node: NodeId) -> Vec<NodeId> {
    match state.tree.kind(node) {
        NodeKind::Bracket(_) => state
            .tree
            .descendants(node)
            .into_iter()
            .filter(|&n| matches!(state.tree.kind(n), NodeKind::Substituent(_) | NodeKind::Root { .. }))
            .collect(),
        _ => vec![node],
    }
}

/// The fragment of the first component after `node`.
pub fn next_in_scope_fragment(state: &BuildState, node: NodeId) -> Result<Option<FragmentId>> {
    for sibling in later_unmultiplied_components(state, node)? {
        if let Some(&first) = substituents_and_roots(state, sibling).first() {
            let group = state.tree.group_child(first)?;
            return state.fragment_of(group).map(Some);
        }
    }
    Ok(None)
}

/// The first fragment after `node` that is a multi-radical able to accept
/// another bond: two attachment points, or one once it has already bonded.
///
/// e.g. from oxy in oxy(dichloromethyl)methylene, methylene is found.
pub fn next_in_scope_multi_valent_fragment(state: &BuildState, node: NodeId) -> Result<Option<FragmentId>> {
    if !matches!(state.tree.kind(node), NodeKind::Substituent(_) | NodeKind::Bracket(_)) {
        bail_build!("Expected a substituent or bracket, found a {}", state.tree.kind(node).name());
    }
    for sibling in later_unmultiplied_components(state, node)? {
        for candidate in substituents_and_roots(state, sibling) {
            let group_node = state.tree.group_child(candidate)?;
            let frag = state.fragment_of(group_node)?;
            let group = state.group_data(frag)?;
            let outs = state.out_count(frag);
            if group.is_multi_radical && (outs >= 2 || (outs >= 1 && group.is_resolved())) {
                return Ok(Some(frag));
            }
        }
    }
    Ok(None)
}

/// Walk the scope of `start`, handing each fragment to `visit` in the
/// order it should be tried. Stops early when `visit` returns true.
fn walk_scope(state: &BuildState, start: NodeId, mut visit: impl FnMut(FragmentId) -> bool) -> Result<()> {
    let mut stack = vec![start];
    let mut first_iteration = true;
    while let Some(current) = stack.pop() {
        if let Some(group) = state.tree.group(current) {
            if visit(group.fragment) {
                return Ok(());
            }
            continue;
        }
        let parent = parent_or_throw(state, current)?;
        let current_index = state.tree.index_of(current).unwrap_or_default();
        for (index, &sibling) in state.tree.children(parent).iter().enumerate() {
            if !state.tree.is_component(sibling) || state.tree.is_multiplied(sibling) {
                continue;
            }
            if first_iteration && index <= current_index {
                continue;
            }
            match state.tree.kind(sibling) {
                NodeKind::Bracket(_) => {
                    // entering at the first child makes its siblings (the
                    // bracket's contents) the next to be pushed
                    if let Some(&first) = state.tree.children(sibling).first() {
                        stack.push(first);
                    }
                }
                _ => stack.push(state.tree.group_child(sibling)?),
            }
        }
        first_iteration = false;
    }
    Ok(())
}

/// Every fragment `start` could feasibly substitute onto, in the order to
/// try them.
pub fn find_alternative_fragments(state: &BuildState, start: NodeId) -> Result<Vec<FragmentId>> {
    let mut found = Vec::new();
    walk_scope(state, start, |frag| {
        found.push(frag);
        false
    })?;
    trace!("Alternative fragments for {:?}: {:?}", start, found);
    Ok(found)
}

/// The first fragment in scope of `start` with an atom bearing `locant`.
pub fn find_fragment_with_locant(state: &BuildState, start: NodeId, locant: &str) -> Result<Option<FragmentId>> {
    let mut found = None;
    walk_scope(state, start, |frag| {
        if state.store.has_locant(frag, locant) {
            found = Some(frag);
            true
        } else {
            false
        }
    })?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomType, Component, Element, Group};

    struct Scene {
        state: BuildState,
        word: NodeId,
    }

    impl Scene {
        fn new() -> Self {
            let mut state = BuildState::new();
            let word = state.tree.add_node(NodeKind::Word);
            Self { state, word }
        }

        fn component(&mut self, parent: NodeId, kind: NodeKind, locants: &[&str]) -> (NodeId, FragmentId) {
            let node = self.state.tree.add_node(kind);
            self.state.tree.append_child(parent, node);
            let frag = self.state.store.new_fragment();
            for locant in locants {
                let atom = self.state.store.add_atom(frag, Element::C, AtomType::Ordinary);
                self.state.store.atom_mut(atom).locants.push(locant.to_string());
            }
            self.state.add_group(node, Group::new(frag, "group"));
            (node, frag)
        }

        fn substituent(&mut self, parent: NodeId, locants: &[&str]) -> (NodeId, FragmentId) {
            self.component(parent, NodeKind::Substituent(Component::default()), locants)
        }

        fn bracket(&mut self, parent: NodeId) -> NodeId {
            let node = self.state.tree.add_node(NodeKind::Bracket(Component::default()));
            self.state.tree.append_child(parent, node);
            node
        }
    }

    #[test]
    fn test_alternatives_are_tried_last_pushed_first() -> Result<()> {
        // a-(b-c)-d: from a, the walk pushes the bracket entry then d
        let mut scene = Scene::new();
        let word = scene.word;
        let (a, _) = scene.substituent(word, &["1"]);
        let bracket = scene.bracket(word);
        let (_, b) = scene.substituent(bracket, &["1"]);
        let (_, c) = scene.substituent(bracket, &["1"]);
        let (_, d) = scene.component(
            word,
            NodeKind::Root {
                component: Component::default(),
                in_locants: None,
            },
            &["1"],
        );
        assert_eq!(find_alternative_fragments(&scene.state, a)?, vec![d, c, b]);
        assert_eq!(next_in_scope_fragment(&scene.state, a)?, Some(b));
        Ok(())
    }

    #[test]
    fn test_multiplied_siblings_are_invisible() -> Result<()> {
        let mut scene = Scene::new();
        let word = scene.word;
        let (a, _) = scene.substituent(word, &["1"]);
        let (multiplied, _) = scene.substituent(word, &["1", "2"]);
        scene.state.tree.component_mut(multiplied).unwrap().multiplier = Some(2);
        let (_, root) = scene.substituent(word, &["1", "2", "3"]);
        assert_eq!(find_alternative_fragments(&scene.state, a)?, vec![root]);
        assert_eq!(next_in_scope_fragment(&scene.state, a)?, Some(root));
        assert_eq!(find_fragment_with_locant(&scene.state, a, "2")?, Some(root));
        Ok(())
    }

    #[test]
    fn test_locant_search_looks_into_brackets() -> Result<()> {
        let mut scene = Scene::new();
        let word = scene.word;
        let (a, _) = scene.substituent(word, &["1"]);
        let bracket = scene.bracket(word);
        let (_, inner) = scene.substituent(bracket, &["1", "4"]);
        scene.substituent(word, &["1", "2"]);
        assert_eq!(find_fragment_with_locant(&scene.state, a, "4")?, Some(inner));
        assert_eq!(find_fragment_with_locant(&scene.state, a, "7")?, None);
        Ok(())
    }

    #[test]
    fn test_only_later_siblings_are_in_scope() -> Result<()> {
        let mut scene = Scene::new();
        let word = scene.word;
        scene.substituent(word, &["1", "2"]);
        let (last, _) = scene.substituent(word, &["1"]);
        assert!(find_alternative_fragments(&scene.state, last)?.is_empty());
        assert_eq!(find_fragment_with_locant(&scene.state, last, "2")?, None);
        Ok(())
    }

    #[test]
    fn test_multi_valent_search() -> Result<()> {
        let mut scene = Scene::new();
        let word = scene.word;
        let (oxy, _) = scene.substituent(word, &["1"]);
        let (_, chain) = scene.substituent(word, &["1", "2"]);
        assert_eq!(next_in_scope_multi_valent_fragment(&scene.state, oxy)?, None);

        let group = scene.state.group_of(chain)?;
        scene.state.tree.group_mut(group).unwrap().is_multi_radical = true;
        let c1 = scene.state.store.atom_at(chain, 0)?;
        let c2 = scene.state.store.atom_at(chain, 1)?;
        scene.state.store.add_out_id(chain, c1, 1, true)?;
        assert_eq!(next_in_scope_multi_valent_fragment(&scene.state, oxy)?, None);
        scene.state.store.add_out_id(chain, c2, 1, true)?;
        assert_eq!(next_in_scope_multi_valent_fragment(&scene.state, oxy)?, Some(chain));

        // one attachment point is enough once the group has bonded
        scene.state.store.remove_out_id(chain, 1);
        scene.state.tree.mark_resolved(group);
        assert_eq!(next_in_scope_multi_valent_fragment(&scene.state, oxy)?, Some(chain));
        Ok(())
    }

    #[test]
    fn test_detached_start_fails() {
        let mut scene = Scene::new();
        let (a, _) = scene.substituent(scene.word, &["1"]);
        scene.state.tree.detach(a);
        assert!(find_alternative_fragments(&scene.state, a).is_err());
        assert!(next_in_scope_fragment(&scene.state, a).is_err());
    }
}
