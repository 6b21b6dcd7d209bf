use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::{Result, StructureBuildingError};

/// The elements that appear in fragment templates and heteroatom
/// replacement prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    H,
    Li,
    B,
    C,
    N,
    O,
    F,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    K,
    Ga,
    Ge,
    As,
    Se,
    Br,
    In,
    Sn,
    Sb,
    Te,
    I,
    Hg,
    Tl,
    Pb,
    Bi,
    Po,
    At,
}

impl Element {
    pub fn symbol(&self) -> &'static str {
        use Element::*;
        match self {
            H => "H",
            Li => "Li",
            B => "B",
            C => "C",
            N => "N",
            O => "O",
            F => "F",
            Na => "Na",
            Mg => "Mg",
            Al => "Al",
            Si => "Si",
            P => "P",
            S => "S",
            Cl => "Cl",
            K => "K",
            Ga => "Ga",
            Ge => "Ge",
            As => "As",
            Se => "Se",
            Br => "Br",
            In => "In",
            Sn => "Sn",
            Sb => "Sb",
            Te => "Te",
            I => "I",
            Hg => "Hg",
            Tl => "Tl",
            Pb => "Pb",
            Bi => "Bi",
            Po => "Po",
            At => "At",
        }
    }

    pub fn from_symbol(symbol: &str) -> Result<Self> {
        use Element::*;
        Ok(match symbol {
            "H" => H,
            "Li" => Li,
            "B" => B,
            "C" => C,
            "N" => N,
            "O" => O,
            "F" => F,
            "Na" => Na,
            "Mg" => Mg,
            "Al" => Al,
            "Si" => Si,
            "P" => P,
            "S" => S,
            "Cl" => Cl,
            "K" => K,
            "Ga" => Ga,
            "Ge" => Ge,
            "As" => As,
            "Se" => Se,
            "Br" => Br,
            "In" => In,
            "Sn" => Sn,
            "Sb" => Sb,
            "Te" => Te,
            "I" => I,
            "Hg" => Hg,
            "Tl" => Tl,
            "Pb" => Pb,
            "Bi" => Bi,
            "Po" => Po,
            "At" => At,
            _ => bail_build!("Unknown element symbol: {}", symbol),
        })
    }

    pub fn is_carbon(&self) -> bool {
        *self == Element::C
    }
}

impl FromStr for Element {
    type Err = StructureBuildingError;

    fn from_str(s: &str) -> Result<Self> {
        Element::from_symbol(s)
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}
