//! Value domains of inputs and outputs.

use std::{collections::BTreeSet, fmt};

use indexmap::IndexMap;
use pretty::RcDoc;

use crate::text::{Name, ToDoc};

/// The domain of a free variable or of the value a term produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Real numbers.
    Real,
    /// Bounded integers `0..n`.
    Bint(usize),
}

impl Domain {
    /// Number of values in a bounded domain, `None` for reals.
    pub fn size(self) -> Option<usize> {
        match self {
            Domain::Real => None,
            Domain::Bint(n) => Some(n),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Real => write!(f, "real"),
            Domain::Bint(n) => write!(f, "bint({n})"),
        }
    }
}

impl ToDoc for Domain {
    fn to_doc(&self) -> RcDoc<'_> {
        RcDoc::as_string(self)
    }
}

/// Free variables of a term with their domains, in insertion order.
pub type Inputs = IndexMap<Name, Domain>;

/// A set of variable names.
pub type VarSet = BTreeSet<Name>;

/// Build a `VarSet` from anything name-like.
pub fn var_set<N: Into<Name>>(names: impl IntoIterator<Item = N>) -> VarSet {
    names.into_iter().map(Into::into).collect()
}

/// Merge `other` into `inputs`, keeping first-seen order.
/// Returns the offending name and both domains on a clash.
pub(crate) fn merge_inputs(
    inputs: &mut Inputs,
    other: &Inputs,
) -> Result<(), (Name, Domain, Domain)> {
    for (name, domain) in other {
        match inputs.get(name) {
            Some(existing) if existing != domain => {
                return Err((name.clone(), *existing, *domain));
            }
            Some(_) => {}
            None => {
                inputs.insert(name.clone(), *domain);
            }
        }
    }
    Ok(())
}

pub(crate) fn fmt_vars<'a>(names: impl IntoIterator<Item = &'a Name>) -> String {
    names
        .into_iter()
        .map(Name::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
