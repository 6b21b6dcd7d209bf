//! The parse tree of a chemical name, held in an arena.
//!
//! Nodes are addressed by [`NodeId`] and hold their children by id, so
//! detaching a node is removing it from its parent's child list and
//! reinserting it is putting the id back. Ids stay valid for the life of
//! the tree; positions do not, so nothing should hold on to a child index
//! across a call that may expand a multiplier.

use crate::{Element, FragmentId, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// What substituents, brackets, and roots have in common.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    /// A single locant, or a comma separated list when multiplied.
    pub locant: Option<String>,
    /// Not yet expanded repetition count.
    pub multiplier: Option<u32>,
}

/// Where the branches of a multiplicative name attach to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InLocants {
    /// Every branch attaches at the root's default in-atom.
    Default,
    Explicit(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Unresolved,
    /// The group's fragment has been bonded outward. Happens once.
    Resolved,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub fragment: FragmentId,
    pub text: String,
    pub state: GroupState,
    /// The fragment deliberately carries more than one attachment point,
    /// e.g. methylene or oxy used as a linker.
    pub is_multi_radical: bool,
    pub forms_double_bond_when_substituted: bool,
}

impl Group {
    pub fn new(fragment: FragmentId, text: impl Into<String>) -> Self {
        Self {
            fragment,
            text: text.into(),
            state: GroupState::Unresolved,
            is_multi_radical: false,
            forms_double_bond_when_substituted: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state == GroupState::Resolved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrogenKind {
    /// "dihydro" style prefixes.
    Hydro,
    /// Added hydrogen, e.g. "4(1H)".
    Added,
    /// Indicated hydrogen, e.g. "1H".
    Indicated,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Word,
    Bracket(Component),
    Substituent(Component),
    Root {
        component: Component,
        in_locants: Option<InLocants>,
    },
    Group(Group),
    Unsaturator {
        bond_order: u8,
        locant: Option<String>,
        /// Names the second atom of the multiple bond when it is not simply
        /// the next one.
        compound_locant: Option<String>,
    },
    Heteroatom {
        element: Element,
        locant: Option<String>,
    },
    Hydrogen {
        kind: HydrogenKind,
        locant: Option<String>,
    },
    Stereodescriptor {
        descriptor: String,
        locant: Option<String>,
    },
    Hyphen,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Word => "word",
            NodeKind::Bracket(_) => "bracket",
            NodeKind::Substituent(_) => "substituent",
            NodeKind::Root { .. } => "root",
            NodeKind::Group(_) => "group",
            NodeKind::Unsaturator { .. } => "unsaturator",
            NodeKind::Heteroatom { .. } => "heteroatom",
            NodeKind::Hydrogen { .. } => "hydrogen",
            NodeKind::Stereodescriptor { .. } => "stereodescriptor",
            NodeKind::Hyphen => "hyphen",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ParseTree {
    nodes: Vec<Node>,
}

impl ParseTree {
    /// Create a detached node.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let index = self.nodes[parent.0].children.len();
        self.insert_child(parent, index, child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        let parent = self
            .parent(anchor)
            .ok_or_else(|| build_error!("Cannot insert after a {} with no parent", self.kind(anchor).name()))?;
        self.detach(node);
        let index = self.index_of(anchor).unwrap_or_default();
        self.insert_child(parent, index + 1, node);
        Ok(())
    }

    /// Remove `node` from its parent, returning where it was.
    pub fn detach(&mut self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes[node.0].parent.take()?;
        let siblings = &mut self.nodes[parent.0].children;
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.remove(index);
        Some((parent, index))
    }

    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.0]
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    pub fn kind_mut(&mut self, node: NodeId) -> &mut NodeKind {
        &mut self.nodes[node.0].kind
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    pub fn is_component(&self, node: NodeId) -> bool {
        matches!(
            self.kind(node),
            NodeKind::Substituent(_) | NodeKind::Bracket(_) | NodeKind::Root { .. }
        )
    }

    pub fn is_word_or_bracket(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Word | NodeKind::Bracket(_))
    }

    pub fn component(&self, node: NodeId) -> Option<&Component> {
        match self.kind(node) {
            NodeKind::Substituent(component) | NodeKind::Bracket(component) => Some(component),
            NodeKind::Root { component, .. } => Some(component),
            _ => None,
        }
    }

    pub fn component_mut(&mut self, node: NodeId) -> Option<&mut Component> {
        match self.kind_mut(node) {
            NodeKind::Substituent(component) | NodeKind::Bracket(component) => Some(component),
            NodeKind::Root { component, .. } => Some(component),
            _ => None,
        }
    }

    pub fn locant(&self, node: NodeId) -> Option<&str> {
        self.component(node)?.locant.as_deref()
    }

    pub fn multiplier(&self, node: NodeId) -> Option<u32> {
        self.component(node)?.multiplier
    }

    pub fn is_multiplied(&self, node: NodeId) -> bool {
        self.multiplier(node).is_some()
    }

    /// The substituent, bracket, and root children of `node`, in order.
    pub fn component_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&child| self.is_component(child))
            .collect()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index_of(node)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Siblings positioned after `node`, in order.
    pub fn following_siblings(&self, node: NodeId) -> Vec<NodeId> {
        match (self.parent(node), self.index_of(node)) {
            (Some(parent), Some(index)) => self.children(parent)[index + 1..].to_vec(),
            _ => Vec::new(),
        }
    }

    /// Every node below `node` in depth-first document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            found.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        found
    }

    pub fn group(&self, node: NodeId) -> Option<&Group> {
        match self.kind(node) {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn group_mut(&mut self, node: NodeId) -> Option<&mut Group> {
        match self.kind_mut(node) {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    /// The Group nodes below `node` in document order.
    pub fn groups_in(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&n| self.group(n).is_some())
            .collect()
    }

    /// The single group child of a substituent or root.
    pub fn group_child(&self, node: NodeId) -> Result<NodeId> {
        let groups: Vec<NodeId> = self
            .children(node)
            .iter()
            .copied()
            .filter(|&child| self.group(child).is_some())
            .collect();
        match groups.as_slice() {
            [group] => Ok(*group),
            [] => Err(build_error!("{} is missing its group", self.kind(node).name())),
            _ => Err(build_error!(
                "Each substituent or root should only have one group, found {}",
                groups.len()
            )),
        }
    }

    /// Follow the last child of nested brackets down to a substituent or
    /// root and return its group.
    pub fn rightmost_group_in_bracket(&self, bracket: NodeId) -> Result<NodeId> {
        let mut current = bracket;
        loop {
            let last = self
                .component_children(current)
                .last()
                .copied()
                .ok_or_else(|| build_error!("Bracket contains no substituents"))?;
            if matches!(self.kind(last), NodeKind::Bracket(_)) {
                current = last;
            } else {
                return self.group_child(last);
            }
        }
    }

    /// The group a substituent, root, or bracket stands for.
    pub fn effective_group(&self, node: NodeId) -> Result<NodeId> {
        match self.kind(node) {
            NodeKind::Bracket(_) => self.rightmost_group_in_bracket(node),
            NodeKind::Substituent(_) | NodeKind::Root { .. } => self.group_child(node),
            other => Err(build_error!("Expected a substituent, bracket or root, found a {}", other.name())),
        }
    }

    pub fn is_resolved(&self, group: NodeId) -> bool {
        self.group(group).is_some_and(Group::is_resolved)
    }

    pub fn mark_resolved(&mut self, group: NodeId) {
        if let Some(group) = self.group_mut(group) {
            group.state = GroupState::Resolved;
        }
    }
}
