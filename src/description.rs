//! Reads a textual parse tree description into a [`BuildState`].
//!
//! A description is a sequence of words. Each word holds components
//! (substituents, brackets, a root) and hyphens; each substituent or root
//! holds exactly one group along with its feature markers.
//!
//! ```text
//! {word
//!   {substituent locant=2 {group chloro ClR}}
//!   {root {group ethan CC suffix=O@1} }}
//! ```
//!
//! Components take `locant=` and `multiplier=` options; a root may also
//! take `in-locants=default` or `in-locants=1,4`. A group is written
//! `{group <text> <template> options...}` where the options are
//!
//! * `labels=numeric|none|a/b/c`: how template atoms are numbered
//! * `suffix=O@1` or `suffix=O@1:2`: a suffix atom on the atom at a locant
//! * `default-in=<locant>`: the atom additive bonds land on by default
//! * `in=<locant>` or `in=<locant>:<order>`: an incoming attachment point
//! * `multiradical`: the group is meant to bond to more than one partner
//! * `double-when-substituted`: bonds to the group are raised to order two
//! * `pinned`: every attachment point stays on the atom the template put it
//!
//! Only these names are split on `=`, so a template such as `C=C` or
//! `"RC(=O)R"` is read as written.
//!
//! Markers are `{unsaturator <order> locant= compound-locant=}`,
//! `{heteroatom <element> locant=}`, `{hydro locant=}`,
//! `{added-hydrogen locant=}`, `{indicated-hydrogen locant=}`,
//! `{stereo <descriptor> locant=}` and `{hyphen}`.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use tracing::*;

use crate::sexpr::{self, SExpr};
use crate::template::{parse_template, Labels};
use crate::{BuildState, Component, Element, Group, HydrogenKind, InLocants, NodeId, NodeKind};

/// A parse tree ready for building, with the ids of its words.
#[derive(Debug, Clone)]
pub struct Description {
    pub state: BuildState,
    pub words: Vec<NodeId>,
}

impl Description {
    pub fn parse(text: &str) -> Result<Self> {
        let sexprs = sexpr::parse(text).map_err(|e| anyhow!("Malformed description:\n{e}"))?;
        let mut reader = Reader {
            state: BuildState::new(),
        };
        let mut words = Vec::new();
        for sexpr in &sexprs {
            words.push(reader.word(sexpr).with_context(|| format!("While reading {sexpr}"))?);
        }
        if words.is_empty() {
            bail!("Description has no words");
        }
        debug!("Read {} words", words.len());
        Ok(Self {
            state: reader.state,
            words,
        })
    }

    /// Bond every word of the description.
    pub fn build(&mut self) -> crate::Result<()> {
        crate::build_words(&mut self.state, &self.words)
    }
}

/// The head of a list and its remaining items: `key=value` options, bare
/// atoms, and nested lists. Atoms stay positional until
/// [`Form::take_options`] claims the ones whose key the form knows, so
/// templates such as `C=C` pass through untouched.
struct Form<'a> {
    head: &'a str,
    positional: Vec<&'a str>,
    options: BTreeMap<&'a str, Vec<&'a str>>,
    lists: Vec<&'a SExpr>,
}

impl<'a> Form<'a> {
    fn of(sexpr: &'a SExpr) -> Result<Self> {
        let items = sexpr.as_list().ok_or_else(|| anyhow!("Expected a list, found {sexpr}"))?;
        let head = items
            .first()
            .and_then(SExpr::as_atom)
            .ok_or_else(|| anyhow!("Expected a list starting with a name, found {sexpr}"))?;
        let mut form = Self {
            head,
            positional: Vec::new(),
            options: BTreeMap::new(),
            lists: Vec::new(),
        };
        for item in &items[1..] {
            match item {
                SExpr::List(_) => form.lists.push(item),
                SExpr::Atom(atom) => form.positional.push(atom),
            }
        }
        Ok(form)
    }

    /// Move every `key=value` atom with a key in `known` into the options.
    fn take_options(&mut self, known: &[&str]) {
        let options = &mut self.options;
        self.positional.retain(|&atom| match atom.split_once('=') {
            Some((key, value)) if known.contains(&key) => {
                options.entry(key).or_default().push(value);
                false
            }
            _ => true,
        });
    }

    fn expect(&mut self, known: &[&str], positional: usize) -> Result<()> {
        self.take_options(known);
        self.check_no_extra(positional)
    }

    /// Fail on anything left after the first `expected` positional atoms.
    fn check_no_extra(&self, expected: usize) -> Result<()> {
        if let Some(extra) = self.positional.get(expected) {
            match extra.split_once('=') {
                Some((key, _)) if !key.is_empty() => bail!("Unknown option {key} on {}", self.head),
                _ => bail!("Unexpected {extra} in {}", self.head),
            }
        }
        Ok(())
    }

    fn option(&self, key: &str) -> Result<Option<&'a str>> {
        match self.options.get(key).map(Vec::as_slice) {
            None => Ok(None),
            Some([value]) => Ok(Some(*value)),
            Some(_) => bail!("Option {key} given more than once to {}", self.head),
        }
    }

    fn all(&self, key: &str) -> &[&'a str] {
        self.options.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    fn flag(&mut self, name: &str) -> bool {
        match self.positional.iter().position(|&p| p == name) {
            Some(i) => {
                self.positional.remove(i);
                true
            }
            None => false,
        }
    }

    fn positional(&self, index: usize, what: &str) -> Result<&'a str> {
        self.positional
            .get(index)
            .copied()
            .ok_or_else(|| anyhow!("{} is missing its {what}", self.head))
    }

    fn component(&self) -> Result<Component> {
        let multiplier = self
            .option("multiplier")?
            .map(|m| m.parse::<u32>().with_context(|| format!("Invalid multiplier {m}")))
            .transpose()?;
        Ok(Component {
            locant: self.option("locant")?.map(str::to_string),
            multiplier,
        })
    }
}

struct Reader {
    state: BuildState,
}

impl Reader {
    fn word(&mut self, sexpr: &SExpr) -> Result<NodeId> {
        let mut form = Form::of(sexpr)?;
        if form.head != "word" {
            bail!("Expected a word at the top level, found {}", form.head);
        }
        form.expect(&[], 0)?;
        let word = self.state.tree.add_node(NodeKind::Word);
        self.children(word, &form.lists)?;
        Ok(word)
    }

    /// Components and hyphens of a word or bracket.
    fn children(&mut self, parent: NodeId, lists: &[&SExpr]) -> Result<()> {
        for &child in lists {
            let mut form = Form::of(child)?;
            let node = match form.head {
                "substituent" => {
                    form.expect(&["locant", "multiplier"], 0)?;
                    let node = self.state.tree.add_node(NodeKind::Substituent(form.component()?));
                    self.state.tree.append_child(parent, node);
                    self.component_contents(node, &form.lists)?;
                    node
                }
                "root" => {
                    form.expect(&["locant", "multiplier", "in-locants"], 0)?;
                    let in_locants = match form.option("in-locants")? {
                        None => None,
                        Some("default") => Some(InLocants::Default),
                        Some(list) => Some(InLocants::Explicit(list.split(',').map(str::to_string).collect())),
                    };
                    let node = self.state.tree.add_node(NodeKind::Root {
                        component: form.component()?,
                        in_locants,
                    });
                    self.state.tree.append_child(parent, node);
                    self.component_contents(node, &form.lists)?;
                    node
                }
                "bracket" => {
                    form.expect(&["locant", "multiplier"], 0)?;
                    let node = self.state.tree.add_node(NodeKind::Bracket(form.component()?));
                    self.state.tree.append_child(parent, node);
                    self.children(node, &form.lists)?;
                    node
                }
                "hyphen" => {
                    form.expect(&[], 0)?;
                    let node = self.state.tree.add_node(NodeKind::Hyphen);
                    self.state.tree.append_child(parent, node);
                    node
                }
                other => bail!("Unexpected {other} inside a word or bracket"),
            };
            trace!("Read {} {:?}", form.head, node);
        }
        Ok(())
    }

    /// The group and markers of a substituent or root.
    fn component_contents(&mut self, node: NodeId, lists: &[&SExpr]) -> Result<()> {
        for &child in lists {
            let mut form = Form::of(child)?;
            let kind = match form.head {
                "group" => {
                    self.group(node, &mut form)?;
                    continue;
                }
                "unsaturator" => {
                    form.expect(&["locant", "compound-locant"], 1)?;
                    let order = form.positional(0, "bond order")?;
                    NodeKind::Unsaturator {
                        bond_order: order.parse().with_context(|| format!("Invalid bond order {order}"))?,
                        locant: form.option("locant")?.map(str::to_string),
                        compound_locant: form.option("compound-locant")?.map(str::to_string),
                    }
                }
                "heteroatom" => {
                    form.expect(&["locant"], 1)?;
                    NodeKind::Heteroatom {
                        element: form.positional(0, "element")?.parse::<Element>()?,
                        locant: form.option("locant")?.map(str::to_string),
                    }
                }
                "hydro" | "added-hydrogen" | "indicated-hydrogen" => {
                    form.expect(&["locant"], 0)?;
                    let kind = match form.head {
                        "hydro" => HydrogenKind::Hydro,
                        "added-hydrogen" => HydrogenKind::Added,
                        _ => HydrogenKind::Indicated,
                    };
                    NodeKind::Hydrogen {
                        kind,
                        locant: form.option("locant")?.map(str::to_string),
                    }
                }
                "stereo" => {
                    form.expect(&["locant"], 1)?;
                    NodeKind::Stereodescriptor {
                        descriptor: form.positional(0, "descriptor")?.to_string(),
                        locant: form.option("locant")?.map(str::to_string),
                    }
                }
                other => bail!("Unexpected {other} inside a {}", self.state.tree.kind(node).name()),
            };
            let marker = self.state.tree.add_node(kind);
            self.state.tree.append_child(node, marker);
        }
        // surfaces a missing or doubled group now rather than mid-build
        self.state.tree.group_child(node)?;
        Ok(())
    }

    fn group(&mut self, parent: NodeId, form: &mut Form) -> Result<()> {
        form.take_options(&["labels", "suffix", "default-in", "in"]);
        let is_multi_radical = form.flag("multiradical");
        let forms_double_bond_when_substituted = form.flag("double-when-substituted");
        let pinned = form.flag("pinned");
        let text = form.positional(0, "text")?;
        let template_text = form.positional(1, "template")?;
        form.check_no_extra(2)?;

        let template = parse_template(template_text)?;
        let labels = form.option("labels")?.map(str::parse::<Labels>).transpose()?.unwrap_or_default();
        let store = &mut self.state.store;
        let frag = store.instantiate(&template, &labels)?;

        for suffix in form.all("suffix") {
            let (element, rest) = suffix
                .split_once('@')
                .ok_or_else(|| anyhow!("Suffix {suffix} should look like O@1"))?;
            let (locant, order) = locant_and_order(rest)?;
            let attach_to = store.atom_by_locant_or_throw(frag, locant)?;
            store.add_suffix_atom(attach_to, element.parse()?, order)?;
        }
        if let Some(locant) = form.option("default-in")? {
            let atom = store.atom_by_locant_or_throw(frag, locant)?;
            store.fragment_mut(frag).default_in_atom = Some(atom);
        }
        for in_id in form.all("in") {
            let (locant, order) = locant_and_order(in_id)?;
            let atom = store.atom_by_locant_or_throw(frag, locant)?;
            store.add_in_id(frag, atom, order)?;
        }
        if pinned {
            for i in 0..store.fragment(frag).out_ids.len() {
                let atom = store.fragment(frag).out_ids[i].atom;
                store.pin_out_id(frag, i, atom);
            }
        }

        let mut group = Group::new(frag, text);
        group.is_multi_radical = is_multi_radical;
        group.forms_double_bond_when_substituted = forms_double_bond_when_substituted;
        self.state.add_group(parent, group);
        debug!("Read group {} with {} atoms", text, template.atoms.len());
        Ok(())
    }
}

/// `1` or `1:2`
fn locant_and_order(text: &str) -> Result<(&str, u8)> {
    match text.split_once(':') {
        Some((locant, order)) => Ok((locant, order.parse().with_context(|| format!("Invalid bond order {order}"))?)),
        None => Ok((text, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_logging;

    #[test]
    fn test_read_chloroethanol() -> Result<()> {
        init_logging("trace");
        let description = Description::parse(
            "{word
               {substituent locant=2 {group chloro ClR}}
               {root {group ethan CC suffix=O@1}}}",
        )?;
        let state = &description.state;
        assert_eq!(description.words.len(), 1);
        let word = description.words[0];
        let children = state.tree.children(word);
        assert_eq!(children.len(), 2);
        assert_eq!(state.tree.locant(children[0]), Some("2"));

        let ethan = state.fragment_of(state.tree.group_child(children[1])?)?;
        assert_eq!(state.store.fragment(ethan).atoms.len(), 3);
        let oxygen = *state.store.fragment(ethan).atoms.last().unwrap();
        assert!(state.store.atom(oxygen).is_suffix());
        Ok(())
    }

    #[test]
    fn test_read_markers_and_options() -> Result<()> {
        let description = Description::parse(
            "{word
               {bracket multiplier=2
                 {substituent {group methylene CRR multiradical pinned}}
                 {hyphen}}
               {root in-locants=1,4
                 {unsaturator 2 locant=1 compound-locant=3}
                 {heteroatom N}
                 {indicated-hydrogen locant=2}
                 {stereo R locant=4}
                 {group cyclohexan C1CCCCC1 default-in=4}}}",
        )?;
        let state = &description.state;
        let word = description.words[0];
        let bracket = state.tree.children(word)[0];
        assert_eq!(state.tree.multiplier(bracket), Some(2));
        let methylene_node = state.tree.groups_in(bracket)[0];
        let methylene = state.tree.group(methylene_node).unwrap();
        assert!(methylene.is_multi_radical);
        assert!(state.store.fragment(methylene.fragment).out_ids.iter().all(|out| out.pinned));

        let root = state.tree.children(word)[1];
        match state.tree.kind(root) {
            NodeKind::Root { in_locants, .. } => {
                assert_eq!(in_locants, &Some(InLocants::Explicit(vec!["1".into(), "4".into()])))
            }
            other => panic!("unexpected {}", other.name()),
        }
        assert_eq!(state.tree.children(root).len(), 5);
        let ring = state.fragment_of(state.tree.group_child(root)?)?;
        assert_eq!(
            state.store.default_in_atom(ring)?,
            state.store.atom_by_locant_or_throw(ring, "4")?
        );
        Ok(())
    }

    #[test]
    fn test_templates_with_double_bonds() -> Result<()> {
        let description = Description::parse(
            "{word
               {substituent {group carbonyl \"RC(=O)R\" multiradical labels=none}}
               {root {group ethen C=C}}}",
        )?;
        let state = &description.state;
        let word = description.words[0];
        let children = state.tree.children(word);
        let carbonyl = state.fragment_of(state.tree.group_child(children[0])?)?;
        assert_eq!(state.store.fragment(carbonyl).atoms.len(), 2);
        assert_eq!(state.store.fragment(carbonyl).out_ids.len(), 2);
        assert!(state.tree.group(state.tree.group_child(children[0])?).unwrap().is_multi_radical);

        let orders: Vec<u8> = state.store.bonds().map(|bond| bond.order).collect();
        assert_eq!(orders, vec![2, 2]);
        Ok(())
    }

    #[test]
    fn test_several_words() -> Result<()> {
        let description = Description::parse("{word {root {group methan C}}} {word {root {group ethan CC}}}")?;
        assert_eq!(description.words.len(), 2);
        Ok(())
    }

    #[test]
    fn test_rejects_malformed() {
        for text in [
            "",
            "{root {group methan C}}",
            "{word {root}}",
            "{word {root {group methan C} {group ethan CC}}}",
            "{word {substituent {group methyl}}}",
            "{word {substituent {group methyl CR}} {root {group methan C}}",
            "{word {root {group methan C labels=1/2}}}",
            "{word {root {group methan C suffix=O}}}",
            "{word {root {group methan C suffix=O@9}}}",
            "{word {root colour=red {group methan C}}}",
            "{word {root {group methan C colour=red}}}",
            "{word {root {hydro 2} {group methan C}}}",
            "{word {root {heteroatom Qq} {group methan C}}}",
            "{word {root {group methan C}} {group ethan CC}}",
        ] {
            assert!(Description::parse(text).is_err(), "{text} should not be read");
        }
    }

    #[test]
    fn test_build() -> Result<()> {
        let mut description = Description::parse(
            "{word {substituent {group methyl CR}} {root {group ethan CC}}}",
        )?;
        description.build()?;
        assert_eq!(description.state.store.bonds().count(), 2);
        Ok(())
    }
}
