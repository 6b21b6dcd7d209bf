//! Fragment templates, written in a small SMILES dialect.
//!
//! Supported: organic subset atoms (`B C N O P S F Cl Br I`), aromatic
//! lowercase atoms (`b c n o p s`, given one spare valency), bracket atoms
//! with an optional charge (`[Si]`, `[N+]`, `[O-]`, `[nH]`), bonds `-`,
//! `=`, `#`, branches, and single digit ring closures. `R` marks an
//! attachment point on the preceding atom (or the next one, at the start),
//! with the order of the bond written before it: `C(=R)` is an attachment
//! point of order 2.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::{AtomId, AtomType, Element, FragmentId, FragmentStore};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Unclosed branch")]
    UnclosedBranch,
    #[error("Ring closure digit '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(char, usize),
    #[error("Ring closure {0} was never closed")]
    UnclosedRing(u8),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Cannot read bracket atom [{0}] at position {1}")]
    InvalidBracketAtom(String, usize),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Attachment point 'R' at position {0} is never followed by an atom")]
    DanglingAttachment(usize),
}

/// How the atoms of an instantiated template are numbered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Labels {
    /// `1`, `2`, ... in template order.
    #[default]
    Numeric,
    None,
    /// One entry per atom; an empty entry leaves that atom without a locant.
    Explicit(Vec<String>),
}

impl FromStr for Labels {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "numeric" => Labels::Numeric,
            "none" => Labels::None,
            _ => Labels::Explicit(s.split('/').map(str::to_string).collect()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAtom {
    pub element: Element,
    pub charge: i8,
    pub aromatic: bool,
}

/// A parsed template, ready to be instantiated any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub atoms: Vec<TemplateAtom>,
    pub bonds: Vec<(usize, usize, u8)>,
    pub out_ids: Vec<(usize, u8)>,
}

impl FromStr for Template {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_template(s)
    }
}

pub fn parse_template(template: &str) -> Result<Template> {
    parse_template_helper(template).context(format!("Failed to parse fragment template {template}"))
}

fn parse_template_helper(template: &str) -> Result<Template, TemplateError> {
    let mut parsed = Template::default();
    let mut current: Option<usize> = None;
    let mut bond_order = 1;
    let mut branch_stack = Vec::new();
    let mut rings: BTreeMap<u8, (usize, u8)> = BTreeMap::new();
    let mut pending_outs: Vec<(usize, u8)> = Vec::new();

    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut atom = None;
        match c {
            '(' => {
                branch_stack.push(current.ok_or(TemplateError::BranchNoCurrentAtom(i))?);
            }
            ')' => {
                current = Some(branch_stack.pop().ok_or(TemplateError::BranchEndNoStart(i))?);
            }
            '-' => bond_order = 1,
            '=' => bond_order = 2,
            '#' => bond_order = 3,
            '0'..='9' => {
                let digit = c as u8 - b'0';
                let here = current.ok_or(TemplateError::RingClosureNoCurrentAtom(c, i))?;
                match rings.remove(&digit) {
                    Some((start, opening_order)) => {
                        parsed.bonds.push((start, here, opening_order.max(bond_order)));
                    }
                    None => {
                        rings.insert(digit, (here, bond_order));
                    }
                }
                bond_order = 1;
            }
            'R' => {
                match current {
                    Some(here) => parsed.out_ids.push((here, bond_order)),
                    None => pending_outs.push((i, bond_order)),
                }
                bond_order = 1;
                // R, R', R'' are all the same to us
                while chars.get(i + 1) == Some(&'\'') {
                    i += 1;
                }
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or(TemplateError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..i + close].iter().collect();
                atom = Some(parse_bracket_atom(&content, i)?);
                i += close;
            }
            'B' | 'C' => {
                let (two_letter, symbol) = match (c, chars.get(i + 1)) {
                    ('B', Some('r')) => (true, Element::Br),
                    ('C', Some('l')) => (true, Element::Cl),
                    ('B', _) => (false, Element::B),
                    _ => (false, Element::C),
                };
                if two_letter {
                    i += 1;
                }
                atom = Some(TemplateAtom { element: symbol, charge: 0, aromatic: false });
            }
            'N' | 'O' | 'P' | 'S' | 'F' | 'I' => {
                let element = Element::from_symbol(&c.to_string()).map_err(|_| TemplateError::UnexpectedCharacter(c, i))?;
                atom = Some(TemplateAtom { element, charge: 0, aromatic: false });
            }
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                let element = Element::from_symbol(&c.to_ascii_uppercase().to_string())
                    .map_err(|_| TemplateError::UnexpectedCharacter(c, i))?;
                atom = Some(TemplateAtom { element, charge: 0, aromatic: true });
            }
            _ => return Err(TemplateError::UnexpectedCharacter(c, i)),
        }

        if let Some(atom) = atom {
            let index = parsed.atoms.len();
            parsed.atoms.push(atom);
            if let Some(previous) = current {
                parsed.bonds.push((previous, index, bond_order));
            }
            bond_order = 1;
            current = Some(index);
            parsed.out_ids.extend(pending_outs.drain(..).map(|(_, order)| (index, order)));
        }
        i += 1;
    }

    if let Some(&(position, _)) = pending_outs.first() {
        return Err(TemplateError::DanglingAttachment(position));
    }
    if !branch_stack.is_empty() {
        return Err(TemplateError::UnclosedBranch);
    }
    if let Some((&digit, _)) = rings.iter().next() {
        return Err(TemplateError::UnclosedRing(digit));
    }
    Ok(parsed)
}

/// e.g. `Si`, `N+`, `O-`, `nH`, `Fe+2`
fn parse_bracket_atom(content: &str, position: usize) -> Result<TemplateAtom, TemplateError> {
    let invalid = || TemplateError::InvalidBracketAtom(content.to_string(), position);
    let chars: Vec<char> = content.chars().collect();
    let first = *chars.first().ok_or_else(invalid)?;
    let aromatic = first.is_ascii_lowercase();
    let mut symbol = first.to_ascii_uppercase().to_string();
    let mut rest = 1;
    if !aromatic {
        if let Some(&second) = chars.get(1).filter(|c| c.is_ascii_lowercase()) {
            let candidate = format!("{symbol}{second}");
            if Element::from_symbol(&candidate).is_ok() {
                symbol = candidate;
                rest = 2;
            }
        }
    }
    let element = Element::from_symbol(&symbol).map_err(|_| invalid())?;

    // explicit hydrogen counts carry no information we keep
    if chars.get(rest) == Some(&'H') {
        rest += 1;
        while chars.get(rest).is_some_and(|c| c.is_ascii_digit()) {
            rest += 1;
        }
    }

    let mut charge: i8 = 0;
    if let Some(&sign) = chars.get(rest).filter(|&&c| c == '+' || c == '-') {
        let unit = if sign == '+' { 1 } else { -1 };
        let tail: String = chars[rest + 1..].iter().collect();
        charge = if tail.is_empty() {
            unit
        } else if tail.chars().all(|c| c == sign) {
            unit * (tail.len() as i8 + 1)
        } else {
            unit * tail.parse::<i8>().map_err(|_| invalid())?
        };
        rest = chars.len();
    }
    if rest != chars.len() {
        return Err(invalid());
    }
    Ok(TemplateAtom { element, charge, aromatic })
}

impl FragmentStore {
    /// Create a fragment from `template`, numbering its atoms by `labels`.
    pub fn instantiate(&mut self, template: &Template, labels: &Labels) -> crate::Result<FragmentId> {
        if let Labels::Explicit(locants) = labels {
            if locants.len() != template.atoms.len() {
                bail_build!(
                    "Template has {} atoms but {} locant labels",
                    template.atoms.len(),
                    locants.len()
                );
            }
        }
        let frag = self.new_fragment();
        let mut atoms = Vec::with_capacity(template.atoms.len());
        for (i, template_atom) in template.atoms.iter().enumerate() {
            let atom = self.add_atom(frag, template_atom.element, AtomType::Ordinary);
            let new_atom = self.atom_mut(atom);
            new_atom.charge = template_atom.charge;
            if template_atom.aromatic {
                new_atom.spare_valency = 1;
            }
            match labels {
                Labels::Numeric => new_atom.locants.push((i + 1).to_string()),
                Labels::Explicit(locants) if !locants[i].is_empty() => new_atom.locants.push(locants[i].clone()),
                _ => {}
            }
            atoms.push(atom);
        }
        for &(from, to, order) in &template.bonds {
            self.create_bond(atoms[from], atoms[to], order)?;
        }
        for &(atom, order) in &template.out_ids {
            self.add_out_id(frag, atoms[atom], order, false)?;
        }
        Ok(frag)
    }

    /// Attach a suffix atom, e.g. the oxygen of -ol, to `attach_to`.
    pub fn add_suffix_atom(&mut self, attach_to: AtomId, element: Element, order: u8) -> crate::Result<AtomId> {
        let frag = self.atom(attach_to).fragment;
        let atom = self.add_atom(frag, element, AtomType::Suffix);
        self.create_bond(attach_to, atom, order)?;
        self.atom_mut(attach_to).one_suffix_attached = true;
        Ok(atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benzene() -> Result<()> {
        let benzene = parse_template("c1ccccc1")?;
        assert_eq!(benzene.atoms.len(), 6);
        assert_eq!(benzene.bonds.len(), 6);
        assert!(benzene.atoms.iter().all(|atom| atom.aromatic && atom.element == Element::C));

        let mut store = FragmentStore::default();
        let frag = store.instantiate(&benzene, &Labels::Numeric)?;
        let c6 = store.atom_by_locant_or_throw(frag, "6")?;
        assert_eq!(store.atom(c6).spare_valency, 1);
        assert_eq!(store.atom(c6).bonded_valency, 2);
        Ok(())
    }

    #[test]
    fn test_attachment_points() -> Result<()> {
        let carbonimidoyl = parse_template("C(R)(R)=N")?;
        assert_eq!(carbonimidoyl.out_ids, vec![(0, 1), (0, 1)]);
        assert_eq!(carbonimidoyl.bonds, vec![(0, 1, 2)]);

        let ylidene = parse_template("CC=R")?;
        assert_eq!(ylidene.out_ids, vec![(1, 2)]);

        let leading = parse_template("RCl")?;
        assert_eq!(leading.out_ids, vec![(0, 1)]);
        assert_eq!(leading.atoms[0].element, Element::Cl);

        let primed = parse_template("RCCR'")?;
        assert_eq!(primed.out_ids, vec![(0, 1), (1, 1)]);
        Ok(())
    }

    #[test]
    fn test_bracket_atoms() -> Result<()> {
        let parsed = parse_template("[N+](C)[O-]")?;
        assert_eq!(parsed.atoms[0].element, Element::N);
        assert_eq!(parsed.atoms[0].charge, 1);
        assert_eq!(parsed.atoms[2].charge, -1);
        assert_eq!(parsed.bonds, vec![(0, 1, 1), (0, 2, 1)]);

        let parsed = parse_template("[Si][nH][Se]")?;
        assert_eq!(parsed.atoms[0].element, Element::Si);
        assert!(parsed.atoms[1].aromatic);
        assert_eq!(parsed.atoms[2].element, Element::Se);
        Ok(())
    }

    #[test]
    fn test_errors() {
        let error = |template: &str| {
            parse_template_helper(template).unwrap_err()
        };
        assert_eq!(error("(C"), TemplateError::BranchNoCurrentAtom(0));
        assert_eq!(error("C)"), TemplateError::BranchEndNoStart(1));
        assert_eq!(error("C(C"), TemplateError::UnclosedBranch);
        assert_eq!(error("C1CC"), TemplateError::UnclosedRing(1));
        assert_eq!(error("C[Si"), TemplateError::UnclosedBracket(1));
        assert_eq!(error("CX"), TemplateError::UnexpectedCharacter('X', 1));
        assert_eq!(error("RR"), TemplateError::DanglingAttachment(0));
        assert!(parse_template("[Xx]").is_err());
        assert!(parse_template("R").is_err());
    }

    #[test]
    fn test_labels() -> Result<()> {
        assert_eq!("numeric".parse::<Labels>()?, Labels::Numeric);
        assert_eq!("none".parse::<Labels>()?, Labels::None);
        assert_eq!(
            "1/2//N".parse::<Labels>()?,
            Labels::Explicit(vec!["1".into(), "2".into(), "".into(), "N".into()])
        );

        let mut store = FragmentStore::default();
        let template = parse_template("CCCN")?;
        let frag = store.instantiate(&template, &"1/2//N".parse()?)?;
        assert!(store.has_locant(frag, "N"));
        assert!(store.atom(store.atom_at(frag, 2)?).locants.is_empty());
        assert!(store.instantiate(&template, &Labels::Explicit(vec!["1".into()])).is_err());
        Ok(())
    }

    #[test]
    fn test_instantiate_checks_valency() -> Result<()> {
        let mut store = FragmentStore::default();
        assert!(store.instantiate(&parse_template("O(C)(C)C")?, &Labels::None).is_err());
        Ok(())
    }

    #[test]
    fn test_suffix_atom() -> Result<()> {
        let mut store = FragmentStore::default();
        let frag = store.instantiate(&parse_template("CC")?, &Labels::Numeric)?;
        let c1 = store.atom_by_locant_or_throw(frag, "1")?;
        let o = store.add_suffix_atom(c1, Element::O, 1)?;
        assert!(store.atom(o).is_suffix());
        assert!(store.atom(c1).one_suffix_attached);
        assert_eq!(store.fragment(frag).atoms.last(), Some(&o));
        Ok(())
    }
}
