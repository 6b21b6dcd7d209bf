use std::collections::BTreeMap;

use tracing::*;

use crate::{FragmentId, FragmentStore, Group, NodeId, NodeKind, ParseTree, Result};

/// A parse tree together with the fragments its groups stand for.
#[derive(Debug, Clone, Default)]
pub struct BuildState {
    pub tree: ParseTree,
    pub store: FragmentStore,
}

impl BuildState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group node under `parent` standing for `fragment`.
    pub fn add_group(&mut self, parent: NodeId, group: Group) -> NodeId {
        let fragment = group.fragment;
        let node = self.tree.add_node(NodeKind::Group(group));
        self.tree.append_child(parent, node);
        self.store.fragment_mut(fragment).group = Some(node);
        node
    }

    pub fn fragment_of(&self, group: NodeId) -> Result<FragmentId> {
        self.tree
            .group(group)
            .map(|group| group.fragment)
            .ok_or_else(|| build_error!("Expected a group, found a {}", self.tree.kind(group).name()))
    }

    pub fn group_of(&self, frag: FragmentId) -> Result<NodeId> {
        self.store
            .fragment(frag)
            .group
            .ok_or_else(|| build_error!("Fragment {} is not associated with a group", frag.0))
    }

    pub fn group_data(&self, frag: FragmentId) -> Result<&Group> {
        let node = self.group_of(frag)?;
        self.tree
            .group(node)
            .ok_or_else(|| build_error!("Fragment {} is associated with a non-group node", frag.0))
    }

    pub fn is_multi_radical(&self, frag: FragmentId) -> Result<bool> {
        Ok(self.group_data(frag)?.is_multi_radical)
    }

    pub fn out_count(&self, frag: FragmentId) -> usize {
        self.store.fragment(frag).out_ids.len()
    }

    /// Surface text of the group a fragment came from, for log messages.
    pub fn describe(&self, frag: FragmentId) -> String {
        self.group_data(frag)
            .map(|group| group.text.clone())
            .unwrap_or_else(|_| format!("fragment {}", frag.0))
    }

    /// Deep-copy the subtree at `node` along with every fragment in it.
    ///
    /// `locant_suffix` is appended to the locants of all cloned atoms, and to
    /// stereodescriptor locants nested below the clone's direct children, so
    /// repeated centres stay distinguishable. The clone is returned detached.
    pub fn clone_subtree(&mut self, node: NodeId, locant_suffix: &str) -> Result<NodeId> {
        let mut frags = Vec::new();
        for group in self.tree.groups_in(node) {
            frags.push(self.fragment_of(group)?);
        }
        let fragment_map = self.store.clone_fragments(&frags, locant_suffix);
        let clone = self.copy_node(node, 0, locant_suffix, &fragment_map);
        trace!("Cloned {} {:?} as {:?}", self.tree.kind(node).name(), node, clone);
        Ok(clone)
    }

    fn copy_node(
        &mut self,
        node: NodeId,
        depth: usize,
        locant_suffix: &str,
        fragment_map: &BTreeMap<FragmentId, FragmentId>,
    ) -> NodeId {
        let mut kind = self.tree.kind(node).clone();
        match &mut kind {
            NodeKind::Group(group) => group.fragment = fragment_map[&group.fragment],
            NodeKind::Stereodescriptor { locant: Some(locant), .. } if depth >= 2 => {
                locant.push_str(locant_suffix);
            }
            _ => {}
        }
        let fragment = match &kind {
            NodeKind::Group(group) => Some(group.fragment),
            _ => None,
        };
        let copy = self.tree.add_node(kind);
        if let Some(fragment) = fragment {
            self.store.fragment_mut(fragment).group = Some(copy);
        }
        for child in self.tree.children(node).to_vec() {
            let child_copy = self.copy_node(child, depth + 1, locant_suffix, fragment_map);
            self.tree.append_child(copy, child_copy);
        }
        copy
    }
}

/// `count` prime marks.
pub fn primes(count: usize) -> String {
    "'".repeat(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomType, Component, Element};

    #[test]
    fn test_clone_bracket_primes_nested_stereo() {
        let mut state = BuildState::new();
        let word = state.tree.add_node(NodeKind::Word);
        let bracket = state.tree.add_node(NodeKind::Bracket(Component::default()));
        state.tree.append_child(word, bracket);
        let direct_stereo = state.tree.add_node(NodeKind::Stereodescriptor {
            descriptor: "R".into(),
            locant: Some("1".into()),
        });
        state.tree.append_child(bracket, direct_stereo);
        let sub = state.tree.add_node(NodeKind::Substituent(Component::default()));
        state.tree.append_child(bracket, sub);
        let nested_stereo = state.tree.add_node(NodeKind::Stereodescriptor {
            descriptor: "S".into(),
            locant: Some("2".into()),
        });
        state.tree.append_child(sub, nested_stereo);

        let frag = state.store.new_fragment();
        let atom = state.store.add_atom(frag, Element::C, AtomType::Ordinary);
        state.store.atom_mut(atom).locants.push("1".into());
        let group = state.add_group(sub, Group::new(frag, "methyl"));

        let clone = state.clone_subtree(bracket, &primes(2)).unwrap();
        assert_eq!(state.tree.parent(clone), None);

        let descendants = state.tree.descendants(clone);
        let stereo_locants: Vec<_> = descendants
            .iter()
            .filter_map(|&n| match state.tree.kind(n) {
                NodeKind::Stereodescriptor { locant, .. } => locant.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(stereo_locants, vec!["1".to_string(), "2''".to_string()]);

        let cloned_group = state.tree.groups_in(clone)[0];
        assert_ne!(cloned_group, group);
        let cloned_frag = state.fragment_of(cloned_group).unwrap();
        assert_ne!(cloned_frag, frag);
        assert_eq!(state.group_of(cloned_frag).unwrap(), cloned_group);
        assert!(state.store.has_locant(cloned_frag, "1''"));
        // the original keeps its association
        assert_eq!(state.group_of(frag).unwrap(), group);
    }
}
