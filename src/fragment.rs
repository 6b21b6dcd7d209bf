//! Atoms, bonds, and the fragments that own them.
//!
//! Every atom and fragment lives in one [`FragmentStore`] arena and is
//! addressed by id. Bonds between fragments are created by the structure
//! builder; bonds inside a fragment come from its template.

use std::collections::BTreeMap;

use tracing::*;

use crate::valency::{check_valency_available_for_bond, check_valency_available_for_replacement_by_heteroatom, is_within_valency};
use crate::{Element, NodeId, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BondId(pub usize);

/// Suffix atoms come from a trailing functional suffix. They sit at the end
/// of a fragment and are never picked by default placement scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomType {
    Ordinary,
    Suffix,
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub id: AtomId,
    pub fragment: FragmentId,
    pub element: Element,
    pub charge: i8,
    /// Explicitly specified total valency, e.g. from lambda notation.
    pub lambda_valency: Option<u8>,
    pub spare_valency: u8,
    /// Sum of the orders of pinned outgoing attachment points.
    pub out_valency: u8,
    /// Sum of the orders of incoming attachment points.
    pub in_valency: u8,
    /// Sum of the orders of the bonds formed to this atom.
    pub bonded_valency: u8,
    pub locants: Vec<String>,
    pub atom_type: AtomType,
    /// Spare valency here will be removed anyway by a suffix.
    pub one_suffix_attached: bool,
    pub bonds: Vec<BondId>,
}

impl Atom {
    pub fn incoming_valency(&self) -> u8 {
        self.bonded_valency + self.in_valency
    }

    pub fn total_valency(&self) -> u8 {
        self.incoming_valency() + self.out_valency + self.spare_valency
    }

    pub fn has_locant(&self, locant: &str) -> bool {
        self.locants.iter().any(|l| l == locant)
    }

    pub fn is_suffix(&self) -> bool {
        self.atom_type == AtomType::Suffix
    }

    pub fn first_locant(&self) -> Option<&str> {
        self.locants.first().map(String::as_str)
    }
}

/// A pending outgoing bond of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutId {
    pub atom: AtomId,
    pub order: u8,
    /// Whether `atom` was named explicitly. Unpinned attachment points may be
    /// moved to the next atom that can actually take the bond.
    pub pinned: bool,
}

/// A pending incoming bond, used by the root of a multiplicative name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InId {
    pub atom: AtomId,
    pub order: u8,
}

#[derive(Debug, Clone)]
pub struct Fragment {
    pub id: FragmentId,
    pub atoms: Vec<AtomId>,
    pub out_ids: Vec<OutId>,
    pub in_ids: Vec<InId>,
    /// The atom that takes incoming substituents when no locant says
    /// otherwise. Defaults to the first atom.
    pub default_in_atom: Option<AtomId>,
    /// The group node this fragment was introduced by.
    pub group: Option<NodeId>,
}

impl Fragment {
    pub fn first_atom(&self) -> Option<AtomId> {
        self.atoms.first().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub from: AtomId,
    pub to: AtomId,
    pub order: u8,
}

impl Bond {
    pub fn other(&self, atom: AtomId) -> AtomId {
        if self.from == atom {
            self.to
        } else {
            self.from
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FragmentStore {
    atoms: Vec<Atom>,
    fragments: Vec<Fragment>,
    bonds: Vec<Bond>,
}

impl FragmentStore {
    pub fn new_fragment(&mut self) -> FragmentId {
        let id = FragmentId(self.fragments.len());
        self.fragments.push(Fragment {
            id,
            atoms: Vec::new(),
            out_ids: Vec::new(),
            in_ids: Vec::new(),
            default_in_atom: None,
            group: None,
        });
        id
    }

    pub fn add_atom(&mut self, frag: FragmentId, element: Element, atom_type: AtomType) -> AtomId {
        let id = AtomId(self.atoms.len());
        self.atoms.push(Atom {
            id,
            fragment: frag,
            element,
            charge: 0,
            lambda_valency: None,
            spare_valency: 0,
            out_valency: 0,
            in_valency: 0,
            bonded_valency: 0,
            locants: Vec::new(),
            atom_type,
            one_suffix_attached: false,
            bonds: Vec::new(),
        });
        self.fragments[frag.0].atoms.push(id);
        id
    }

    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.atoms[id.0]
    }

    pub fn atom_mut(&mut self, id: AtomId) -> &mut Atom {
        &mut self.atoms[id.0]
    }

    pub fn fragment(&self, id: FragmentId) -> &Fragment {
        &self.fragments[id.0]
    }

    pub fn fragment_mut(&mut self, id: FragmentId) -> &mut Fragment {
        &mut self.fragments[id.0]
    }

    pub fn bond(&self, id: BondId) -> &Bond {
        &self.bonds[id.0]
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    pub fn bonds(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.iter()
    }

    pub fn find_bond(&self, a: AtomId, b: AtomId) -> Option<BondId> {
        self.atom(a)
            .bonds
            .iter()
            .copied()
            .find(|&bond| self.bond(bond).other(a) == b)
    }

    pub fn bonded_atoms(&self, atom: AtomId) -> Vec<AtomId> {
        self.atom(atom)
            .bonds
            .iter()
            .map(|&bond| self.bond(bond).other(atom))
            .collect()
    }

    /// Connect two atoms. Both must still be within their permissible
    /// valency afterwards.
    pub fn create_bond(&mut self, from: AtomId, to: AtomId, order: u8) -> Result<BondId> {
        if order == 0 {
            bail_build!("Cannot create a bond of order 0");
        }
        if from == to {
            bail_build!("Cannot bond atom {} to itself", from.0);
        }
        let id = BondId(self.bonds.len());
        self.bonds.push(Bond { from, to, order });
        for atom in [from, to] {
            let atom = self.atom_mut(atom);
            atom.bonds.push(id);
            atom.bonded_valency += order;
        }
        for atom in [from, to] {
            self.check_valency(atom)?;
        }
        Ok(id)
    }

    fn check_valency(&self, atom: AtomId) -> Result<()> {
        let atom = self.atom(atom);
        if !is_within_valency(atom) {
            bail_build!(
                "Atom {} ({}) would exceed its permissible valency ({} in use)",
                atom.id.0,
                atom.element,
                atom.total_valency()
            );
        }
        Ok(())
    }

    pub fn atom_by_locant(&self, frag: FragmentId, locant: &str) -> Option<AtomId> {
        self.fragment(frag)
            .atoms
            .iter()
            .copied()
            .find(|&atom| self.atom(atom).has_locant(locant))
    }

    pub fn atom_by_locant_or_throw(&self, frag: FragmentId, locant: &str) -> Result<AtomId> {
        self.atom_by_locant(frag, locant)
            .ok_or_else(|| build_error!("Cannot find atom with locant {}", locant))
    }

    pub fn has_locant(&self, frag: FragmentId, locant: &str) -> bool {
        self.atom_by_locant(frag, locant).is_some()
    }

    /// Where `atom` sits in its fragment's atom list.
    pub fn position_of(&self, frag: FragmentId, atom: AtomId) -> Result<usize> {
        self.fragment(frag)
            .atoms
            .iter()
            .position(|&a| a == atom)
            .ok_or_else(|| build_error!("Atom {} is not part of fragment {}", atom.0, frag.0))
    }

    pub fn atom_at(&self, frag: FragmentId, position: usize) -> Result<AtomId> {
        self.fragment(frag)
            .atoms
            .get(position)
            .copied()
            .ok_or_else(|| build_error!("Fragment {} has no atom at position {}", frag.0, position))
    }

    pub fn first_atom(&self, frag: FragmentId) -> Result<AtomId> {
        self.fragment(frag)
            .first_atom()
            .ok_or_else(|| build_error!("Fragment {} has no atoms", frag.0))
    }

    pub fn default_in_atom(&self, frag: FragmentId) -> Result<AtomId> {
        match self.fragment(frag).default_in_atom {
            Some(atom) => Ok(atom),
            None => self.first_atom(frag),
        }
    }

    pub fn add_out_id(&mut self, frag: FragmentId, atom: AtomId, order: u8, pinned: bool) -> Result<()> {
        self.check_attachment(frag, atom, order)?;
        if pinned {
            self.atom_mut(atom).out_valency += order;
        }
        self.fragment_mut(frag).out_ids.push(OutId { atom, order, pinned });
        Ok(())
    }

    pub fn remove_out_id(&mut self, frag: FragmentId, index: usize) -> OutId {
        let out = self.fragment_mut(frag).out_ids.remove(index);
        if out.pinned {
            self.atom_mut(out.atom).out_valency -= out.order;
        }
        out
    }

    /// Move an attachment point onto `atom` and pin it there.
    pub fn pin_out_id(&mut self, frag: FragmentId, index: usize, atom: AtomId) {
        let out = self.fragment(frag).out_ids[index];
        if out.pinned {
            self.atom_mut(out.atom).out_valency -= out.order;
        }
        self.atom_mut(atom).out_valency += out.order;
        self.fragment_mut(frag).out_ids[index] = OutId {
            atom,
            order: out.order,
            pinned: true,
        };
    }

    pub fn add_in_id(&mut self, frag: FragmentId, atom: AtomId, order: u8) -> Result<()> {
        self.check_attachment(frag, atom, order)?;
        self.atom_mut(atom).in_valency += order;
        self.fragment_mut(frag).in_ids.push(InId { atom, order });
        Ok(())
    }

    pub fn remove_in_id(&mut self, frag: FragmentId, index: usize) -> InId {
        let in_id = self.fragment_mut(frag).in_ids.remove(index);
        self.atom_mut(in_id.atom).in_valency -= in_id.order;
        in_id
    }

    fn check_attachment(&self, frag: FragmentId, atom: AtomId, order: u8) -> Result<()> {
        if order == 0 {
            bail_build!("Attachment points must have a positive bond order");
        }
        if self.atom(atom).fragment != frag {
            bail_build!("Atom {} does not belong to fragment {}", atom.0, frag.0);
        }
        Ok(())
    }

    pub fn subtract_spare_valency(&mut self, atom: AtomId, amount: u8) -> Result<()> {
        let atom = self.atom_mut(atom);
        if atom.spare_valency < amount {
            bail_build!(
                "Atom {} ({}) does not have enough spare valency to remove {}",
                atom.id.0,
                atom.element,
                amount
            );
        }
        atom.spare_valency -= amount;
        Ok(())
    }

    /// Spare valency the atom could never realise is dropped. Only bonds
    /// inside the fragment count unless `include_external` is set.
    pub fn ensure_spare_valency_consistent(&mut self, atom: AtomId, include_external: bool) {
        let (element, charge, lambda, frag) = {
            let atom = self.atom(atom);
            (atom.element, atom.charge, atom.lambda_valency, atom.fragment)
        };
        let Some(max) = lambda.or_else(|| crate::valency::maximum_valency(element, charge)) else {
            return;
        };
        let used = if include_external {
            let atom = self.atom(atom);
            atom.incoming_valency() + atom.out_valency
        } else {
            self.atom(atom)
                .bonds
                .iter()
                .map(|&bond| self.bond(bond))
                .filter(|bond| self.atom(bond.other(atom)).fragment == frag)
                .map(|bond| bond.order)
                .sum()
        };
        let atom = self.atom_mut(atom);
        let max_spare = max.saturating_sub(used);
        if atom.spare_valency > max_spare {
            atom.spare_valency = max_spare;
        }
    }

    /// Raise the bond between `first` and `second` to `order`. Without a
    /// second atom the bond goes to the atom that follows `first` in its
    /// fragment. Asking for the order the bond already has changes nothing;
    /// asking for a lower one fails.
    pub fn unsaturate(&mut self, first: AtomId, second: Option<AtomId>, order: u8) -> Result<()> {
        let frag = self.atom(first).fragment;
        let second = match second {
            Some(second) => second,
            None => {
                let position = self.position_of(frag, first)?;
                self.atom_at(frag, position + 1)?
            }
        };
        let bond = self.find_bond(first, second).ok_or_else(|| {
            build_error!("Cannot unsaturate: atoms {} and {} are not bonded", first.0, second.0)
        })?;
        let previous = self.bonds[bond.0].order;
        if order < previous {
            bail_build!(
                "Cannot unsaturate: atoms {} and {} already share a bond of order {}, not {}",
                first.0,
                second.0,
                previous,
                order
            );
        }
        if order == previous {
            trace!("Bond between atoms {} and {} already has order {}", first.0, second.0, order);
            return Ok(());
        }
        self.bonds[bond.0].order = order;
        for atom in [first, second] {
            self.atom_mut(atom).bonded_valency += order - previous;
        }
        for atom in [first, second] {
            self.check_valency(atom)?;
        }
        Ok(())
    }

    /// Replace the element of `atom`. With `assign_locant` the atom also
    /// gains an element locant, primed as needed to stay unique in its
    /// fragment, e.g. the second nitrogen of a diaza ring gets `N'`.
    ///
    /// Fails, leaving the atom untouched, when its bonds and reserved
    /// valency do not fit `element`.
    pub fn make_heteroatom(&mut self, atom: AtomId, element: Element, assign_locant: bool) -> Result<()> {
        if !check_valency_available_for_replacement_by_heteroatom(self.atom(atom), element) {
            bail_build!(
                "Atom {} ({}) cannot be replaced by {}: {} valency already in use",
                atom.0,
                self.atom(atom).element,
                element,
                self.atom(atom).incoming_valency() + self.atom(atom).spare_valency + self.atom(atom).out_valency
            );
        }
        let frag = self.atom(atom).fragment;
        if assign_locant {
            let mut locant = element.symbol().to_string();
            while self.has_locant(frag, &locant) {
                locant.push('\'');
            }
            self.atom_mut(atom).locants.push(locant);
        }
        self.atom_mut(atom).element = element;
        Ok(())
    }

    /// Starting at `atom` and wrapping around the fragment, find the first
    /// non-suffix atom able to take `additional` more valency on top of its
    /// spare valency (and outgoing valency when asked).
    pub fn atom_or_next_suitable(&self, atom: AtomId, additional: u8, take_out_valency: bool) -> Option<AtomId> {
        let frag = self.atom(atom).fragment;
        let atoms = &self.fragment(frag).atoms;
        let start = atoms.iter().position(|&a| a == atom)?;
        (0..atoms.len())
            .map(|offset| atoms[(start + offset) % atoms.len()])
            .find(|&candidate| {
                let candidate = self.atom(candidate);
                if candidate.is_suffix() {
                    return false;
                }
                let out = if take_out_valency { candidate.out_valency } else { 0 };
                check_valency_available_for_bond(candidate, additional + candidate.spare_valency + out)
            })
    }

    pub fn atom_or_next_suitable_or_throw(&self, atom: AtomId, additional: u8) -> Result<AtomId> {
        self.atom_or_next_suitable(atom, additional, false).ok_or_else(|| {
            build_error!(
                "Cannot find a suitable atom for a bond of order {} starting at atom {}",
                additional,
                atom.0
            )
        })
    }

    /// Deep-copy a set of fragments, together with the bonds between them.
    /// `locant_suffix` is appended to every cloned locant.
    pub fn clone_fragments(&mut self, frags: &[FragmentId], locant_suffix: &str) -> BTreeMap<FragmentId, FragmentId> {
        let mut fragment_map = BTreeMap::new();
        let mut atom_map: BTreeMap<AtomId, AtomId> = BTreeMap::new();
        for &frag in frags {
            let clone = self.new_fragment();
            fragment_map.insert(frag, clone);
            let originals = self.fragment(frag).atoms.clone();
            for original in originals {
                let source = self.atom(original).clone();
                let id = self.add_atom(clone, source.element, source.atom_type);
                let atom = self.atom_mut(id);
                atom.charge = source.charge;
                atom.lambda_valency = source.lambda_valency;
                atom.spare_valency = source.spare_valency;
                atom.out_valency = source.out_valency;
                atom.in_valency = source.in_valency;
                atom.one_suffix_attached = source.one_suffix_attached;
                atom.locants = source
                    .locants
                    .iter()
                    .map(|locant| format!("{locant}{locant_suffix}"))
                    .collect();
                atom_map.insert(original, id);
            }
        }

        let bonds: Vec<Bond> = self
            .bonds
            .iter()
            .filter(|bond| atom_map.contains_key(&bond.from) && atom_map.contains_key(&bond.to))
            .copied()
            .collect();
        for bond in bonds {
            let (from, to) = (atom_map[&bond.from], atom_map[&bond.to]);
            let id = BondId(self.bonds.len());
            self.bonds.push(Bond { from, to, order: bond.order });
            for atom in [from, to] {
                let atom = self.atom_mut(atom);
                atom.bonds.push(id);
                atom.bonded_valency += bond.order;
            }
        }

        for (&frag, &clone) in &fragment_map {
            let source = self.fragment(frag).clone();
            let target = self.fragment_mut(clone);
            target.out_ids = source
                .out_ids
                .iter()
                .map(|out| OutId { atom: atom_map[&out.atom], ..*out })
                .collect();
            target.in_ids = source
                .in_ids
                .iter()
                .map(|in_id| InId { atom: atom_map[&in_id.atom], ..*in_id })
                .collect();
            target.default_in_atom = source.default_in_atom.map(|atom| atom_map[&atom]);
        }
        trace!("Cloned fragments {:?} with locant suffix {:?}", fragment_map, locant_suffix);
        fragment_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{parse_template, Labels};

    /// A two carbon chain with an oxygen suffix on the first carbon.
    fn ethanol(store: &mut FragmentStore) -> FragmentId {
        let frag = store.new_fragment();
        let c1 = store.add_atom(frag, Element::C, AtomType::Ordinary);
        let c2 = store.add_atom(frag, Element::C, AtomType::Ordinary);
        let o = store.add_atom(frag, Element::O, AtomType::Suffix);
        store.atom_mut(c1).locants.push("1".into());
        store.atom_mut(c2).locants.push("2".into());
        store.create_bond(c1, c2, 1).unwrap();
        store.create_bond(c1, o, 1).unwrap();
        frag
    }

    #[test]
    fn test_locants() {
        let mut store = FragmentStore::default();
        let frag = ethanol(&mut store);
        let c2 = store.atom_by_locant_or_throw(frag, "2").unwrap();
        assert_eq!(store.atom(c2).element, Element::C);
        assert_eq!(store.position_of(frag, c2).unwrap(), 1);
        assert!(store.atom_by_locant_or_throw(frag, "3").is_err());
        assert_eq!(store.default_in_atom(frag).unwrap(), store.first_atom(frag).unwrap());
    }

    #[test]
    fn test_bond_valency_is_enforced() {
        let mut store = FragmentStore::default();
        let frag = store.new_fragment();
        let o = store.add_atom(frag, Element::O, AtomType::Ordinary);
        let c1 = store.add_atom(frag, Element::C, AtomType::Ordinary);
        let c2 = store.add_atom(frag, Element::C, AtomType::Ordinary);
        store.create_bond(o, c1, 2).unwrap();
        let err = store.create_bond(o, c2, 1).unwrap_err();
        assert!(err.reason.contains("permissible valency"));
    }

    #[test]
    fn test_out_ids_reserve_valency_only_when_pinned() {
        let mut store = FragmentStore::default();
        let frag = ethanol(&mut store);
        let c1 = store.first_atom(frag).unwrap();
        store.add_out_id(frag, c1, 1, false).unwrap();
        assert_eq!(store.atom(c1).out_valency, 0);
        store.pin_out_id(frag, 0, c1);
        assert_eq!(store.atom(c1).out_valency, 1);
        let out = store.remove_out_id(frag, 0);
        assert!(out.pinned);
        assert_eq!(store.atom(c1).out_valency, 0);
        assert!(store.add_out_id(frag, c1, 0, true).is_err());
    }

    #[test]
    fn test_unsaturate() {
        let mut store = FragmentStore::default();
        let frag = ethanol(&mut store);
        let c1 = store.first_atom(frag).unwrap();
        store.unsaturate(c1, None, 2).unwrap();
        let bond = store.find_bond(c1, store.atom_at(frag, 1).unwrap()).unwrap();
        assert_eq!(store.bond(bond).order, 2);
        assert_eq!(store.atom(c1).bonded_valency, 3);
        // with one spare valency left on C1 a triple bond would take it to 5
        store.atom_mut(c1).spare_valency = 1;
        assert!(store.unsaturate(c1, None, 3).is_err());
    }

    #[test]
    fn test_unsaturate_never_lowers_a_bond() -> Result<()> {
        let mut store = FragmentStore::default();
        let propene = store.instantiate(&parse_template("C=CC").unwrap(), &Labels::Numeric)?;
        let c1 = store.atom_by_locant_or_throw(propene, "1")?;
        let c2 = store.atom_by_locant_or_throw(propene, "2")?;
        store.unsaturate(c1, None, 2)?;
        assert_eq!(store.atom(c1).bonded_valency, 2);

        let error = store.unsaturate(c1, Some(c2), 1).unwrap_err();
        assert!(error.reason.contains("already share a bond of order 2"), "{}", error.reason);
        let bond = store.find_bond(c1, c2).unwrap();
        assert_eq!(store.bond(bond).order, 2);
        Ok(())
    }

    #[test]
    fn test_make_heteroatom_primes_locants() {
        let mut store = FragmentStore::default();
        let frag = ethanol(&mut store);
        let c1 = store.atom_at(frag, 0).unwrap();
        let c2 = store.atom_at(frag, 1).unwrap();
        store.make_heteroatom(c1, Element::N, true).unwrap();
        store.make_heteroatom(c2, Element::N, true).unwrap();
        assert!(store.atom(c1).has_locant("N"));
        assert!(store.atom(c2).has_locant("N'"));
        assert_eq!(store.atom(c2).element, Element::N);
    }

    #[test]
    fn test_make_heteroatom_respects_valency() -> Result<()> {
        let mut store = FragmentStore::default();
        let isobutane = store.instantiate(&parse_template("CC(C)C").unwrap(), &Labels::Numeric)?;
        let c2 = store.atom_by_locant_or_throw(isobutane, "2")?;
        // three carbons on C2 leave no room for oxygen, but nitrogen fits
        assert!(store.make_heteroatom(c2, Element::O, true).is_err());
        assert_eq!(store.atom(c2).element, Element::C);
        assert!(!store.atom(c2).has_locant("O"));
        store.make_heteroatom(c2, Element::N, true)?;
        assert_eq!(store.atom(c2).element, Element::N);
        Ok(())
    }

    #[test]
    fn test_next_suitable_atom_skips_suffix_and_wraps() {
        let mut store = FragmentStore::default();
        let frag = ethanol(&mut store);
        let c1 = store.atom_at(frag, 0).unwrap();
        let c2 = store.atom_at(frag, 1).unwrap();
        // C1 has two bonds, C2 one: only C2 can take a triple bond
        assert_eq!(store.atom_or_next_suitable(c1, 3, false), Some(c2));
        assert_eq!(store.atom_or_next_suitable(c2, 2, false), Some(c2));
        assert_eq!(store.atom_or_next_suitable(c1, 4, false), None);
    }

    #[test]
    fn test_clone_fragments() {
        let mut store = FragmentStore::default();
        let frag = ethanol(&mut store);
        let c1 = store.first_atom(frag).unwrap();
        store.add_out_id(frag, c1, 1, true).unwrap();
        let map = store.clone_fragments(&[frag], "''");
        let clone = map[&frag];
        assert_ne!(clone, frag);
        assert_eq!(store.fragment(clone).atoms.len(), 3);
        assert!(store.has_locant(clone, "2''"));
        assert!(!store.has_locant(clone, "2"));
        let out = store.fragment(clone).out_ids[0];
        assert_eq!(store.atom(out.atom).fragment, clone);
        assert_eq!(store.atom(out.atom).out_valency, 1);
        let c1_clone = store.first_atom(clone).unwrap();
        assert_eq!(store.atom(c1_clone).bonded_valency, 2);
        assert!(store.atom(store.atom_at(clone, 2).unwrap()).is_suffix());
        // the original is untouched
        assert_eq!(store.bonded_atoms(c1).len(), 2);
    }
}
