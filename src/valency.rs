//! Standard and alternate valence states, and the availability checks that
//! every bonding decision goes through.
//!
//! The tables are fixed data keyed by `(element, formal charge)`. A missing
//! entry means "unknown": availability checks then succeed, because there is
//! nothing to check against.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::{Atom, Element};

lazy_static! {
    static ref DEFAULT_VALENCIES: HashMap<(Element, i8), u8> = {
        use Element::*;
        let mut table = HashMap::new();
        for (element, valency) in [
            (H, 1), (Li, 1), (B, 3), (C, 4), (N, 3), (O, 2), (F, 1),
            (Na, 1), (Mg, 2), (Al, 3), (Si, 4), (P, 3), (S, 2), (Cl, 1),
            (K, 1), (Ga, 3), (Ge, 4), (As, 3), (Se, 2), (Br, 1), (In, 3),
            (Sn, 4), (Sb, 3), (Te, 2), (I, 1), (Hg, 2), (Tl, 3), (Pb, 4),
            (Bi, 3), (Po, 2), (At, 1),
        ] {
            table.insert((element, 0), valency);
        }
        for (element, charge, valency) in [
            (B, -1, 4), (C, -1, 3), (C, 1, 3), (N, -1, 2), (N, 1, 4),
            (O, -1, 1), (O, 1, 3), (P, 1, 4), (As, 1, 4), (S, -1, 1),
            (S, 1, 3), (Se, 1, 3),
        ] {
            table.insert((element, charge), valency);
        }
        table
    };

    static ref POSSIBLE_VALENCIES: HashMap<(Element, i8), Vec<u8>> = {
        use Element::*;
        let mut table = HashMap::new();
        for (element, valencies) in [
            (H, vec![1]), (Li, vec![1]), (B, vec![3]), (C, vec![4]),
            (N, vec![3]), (O, vec![2]), (F, vec![1]), (Na, vec![1]),
            (Mg, vec![2]), (Al, vec![3]), (Si, vec![4]), (P, vec![3, 5]),
            (S, vec![2, 4, 6]), (Cl, vec![1, 3, 5, 7]), (K, vec![1]),
            (Ga, vec![3]), (Ge, vec![4]), (As, vec![3, 5]),
            (Se, vec![2, 4, 6]), (Br, vec![1, 3, 5, 7]), (In, vec![3]),
            (Sn, vec![2, 4]), (Sb, vec![3, 5]), (Te, vec![2, 4, 6]),
            (I, vec![1, 3, 5, 7]), (Hg, vec![1, 2]), (Tl, vec![1, 3]),
            (Pb, vec![2, 4]), (Bi, vec![3, 5]), (Po, vec![2, 4, 6]),
            (At, vec![1, 3, 5, 7]),
        ] {
            table.insert((element, 0), valencies);
        }
        for (element, charge, valencies) in [
            (B, -1, vec![4]), (C, -1, vec![3]), (C, 1, vec![3]),
            (N, -1, vec![2]), (N, 1, vec![4]), (O, -1, vec![1]),
            (O, 1, vec![3]), (P, 1, vec![4]), (As, 1, vec![4]),
            (S, -1, vec![1]), (S, 1, vec![3, 5]), (Se, 1, vec![3, 5]),
        ] {
            table.insert((element, charge), valencies);
        }
        table
    };
}

pub fn default_valency(element: Element, charge: i8) -> Option<u8> {
    DEFAULT_VALENCIES.get(&(element, charge)).copied()
}

/// Stable valencies in increasing order.
pub fn possible_valencies(element: Element, charge: i8) -> Option<&'static [u8]> {
    POSSIBLE_VALENCIES
        .get(&(element, charge))
        .map(|valencies| valencies.as_slice())
}

pub fn maximum_valency(element: Element, charge: i8) -> Option<u8> {
    possible_valencies(element, charge)
        .and_then(|valencies| valencies.last().copied())
        .or_else(|| default_valency(element, charge))
}

/// The most this atom may ever carry: its explicit (lambda) valency if one
/// was given, otherwise the element's maximum.
fn valency_ceiling(atom: &Atom) -> Option<u8> {
    atom.lambda_valency
        .or_else(|| maximum_valency(atom.element, atom.charge))
}

/// Can `atom` take on `bond_order` more units on top of what is already
/// bonded to it? Callers fold spare and outgoing valency into `bond_order`
/// when those must also fit.
pub fn check_valency_available_for_bond(atom: &Atom, bond_order: u8) -> bool {
    match valency_ceiling(atom) {
        Some(max) => atom.incoming_valency() as u16 + bond_order as u16 <= max as u16,
        None => true,
    }
}

pub fn check_valency_available_for_replacement_by_heteroatom(atom: &Atom, element: Element) -> bool {
    let required = atom.incoming_valency() as u16 + atom.spare_valency as u16 + atom.out_valency as u16;
    match maximum_valency(element, atom.charge) {
        Some(max) => required <= max as u16,
        None => true,
    }
}

/// Whether everything bonded to, reserved on, and spare on the atom fits
/// within its permissible valency.
pub fn is_within_valency(atom: &Atom) -> bool {
    match valency_ceiling(atom) {
        Some(max) => atom.total_valency() as u16 <= max as u16,
        None => true,
    }
}

/// Hydrogens that could still be substituted on `atom`, using the lowest
/// valence state that accommodates what is already bonded or reserved.
///
/// e.g. thio carries two outgoing attachments and no bonds, so the lowest
/// state of sulfur (2) is already used up: no substitutable hydrogen.
/// Phosphonoyl carries two outgoing attachments and a double bond; the
/// lowest state that fits is 5, leaving one.
pub fn substitutable_hydrogens(atom: &Atom) -> u8 {
    let current = atom.incoming_valency() + atom.out_valency;
    let valency = atom.lambda_valency.or_else(|| {
        default_valency(atom.element, atom.charge)
            .filter(|&default| current <= default)
            .or_else(|| {
                possible_valencies(atom.element, atom.charge)?
                    .iter()
                    .copied()
                    .find(|&possible| current <= possible)
            })
    });
    valency.map_or(0, |valency| valency.saturating_sub(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomType, FragmentStore};

    fn lone_atom(element: Element) -> (FragmentStore, crate::AtomId) {
        let mut store = FragmentStore::default();
        let frag = store.new_fragment();
        let atom = store.add_atom(frag, element, AtomType::Ordinary);
        (store, atom)
    }

    #[test]
    fn test_tables() {
        assert_eq!(default_valency(Element::C, 0), Some(4));
        assert_eq!(default_valency(Element::N, 1), Some(4));
        assert_eq!(default_valency(Element::C, 3), None);
        assert_eq!(possible_valencies(Element::S, 0), Some(&[2, 4, 6][..]));
        assert_eq!(maximum_valency(Element::S, 0), Some(6));
        assert_eq!(maximum_valency(Element::O, 0), Some(2));
        assert_eq!(maximum_valency(Element::O, 2), None);
    }

    #[test]
    fn test_bond_availability() {
        let (mut store, o) = lone_atom(Element::O);
        assert!(check_valency_available_for_bond(store.atom(o), 2));
        assert!(!check_valency_available_for_bond(store.atom(o), 3));

        // an explicit valency overrides the element's table
        store.atom_mut(o).lambda_valency = Some(1);
        assert!(!check_valency_available_for_bond(store.atom(o), 2));

        // unknown charge states are not constrained
        store.atom_mut(o).lambda_valency = None;
        store.atom_mut(o).charge = 3;
        assert!(check_valency_available_for_bond(store.atom(o), 5));
    }

    #[test]
    fn test_heteroatom_replacement() {
        let (mut store, c) = lone_atom(Element::C);
        store.atom_mut(c).bonded_valency = 2;
        store.atom_mut(c).spare_valency = 1;
        assert!(check_valency_available_for_replacement_by_heteroatom(store.atom(c), Element::N));
        assert!(!check_valency_available_for_replacement_by_heteroatom(store.atom(c), Element::O));
        assert!(check_valency_available_for_replacement_by_heteroatom(store.atom(c), Element::S));
    }

    #[test]
    fn test_substitutable_hydrogens() {
        // thio: S with two outgoing attachments
        let (mut store, s) = lone_atom(Element::S);
        store.atom_mut(s).out_valency = 2;
        assert_eq!(substitutable_hydrogens(store.atom(s)), 0);

        // phosphonoyl: P(=O) with two outgoing attachments
        let (mut store, p) = lone_atom(Element::P);
        store.atom_mut(p).bonded_valency = 2;
        store.atom_mut(p).out_valency = 2;
        assert_eq!(substitutable_hydrogens(store.atom(p)), 1);

        // methylene: C with two outgoing attachments
        let (mut store, c) = lone_atom(Element::C);
        store.atom_mut(c).out_valency = 2;
        assert_eq!(substitutable_hydrogens(store.atom(c)), 2);
    }

    #[test]
    fn test_within_valency() {
        let (mut store, c) = lone_atom(Element::C);
        store.atom_mut(c).bonded_valency = 3;
        store.atom_mut(c).spare_valency = 1;
        assert!(is_within_valency(store.atom(c)));
        store.atom_mut(c).out_valency = 1;
        assert!(!is_within_valency(store.atom(c)));
    }
}
