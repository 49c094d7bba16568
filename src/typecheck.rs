//! Checking raw syntax against an environment of `let` bindings.

use std::collections::HashMap;

use thiserror::Error;

use crate::{error::TermError, term::Term, text::Name};

/// Errors raised while turning raw syntax into terms.
#[derive(Clone, Debug, Error)]
pub enum CheckError<S> {
    /// A name that no earlier `let` binds.
    #[error("unknown symbol `{name}`")]
    UnknownSymbol {
        /// The name as written
        name: Name,
        /// Where it was written
        span: S,
    },
    /// Building a term failed.
    #[error("{error}")]
    Term {
        /// What went wrong
        error: TermError,
        /// The offending term
        span: S,
    },
}

impl<S> CheckError<S> {
    /// Location of the error in the source text.
    pub fn span(&self) -> &S {
        match self {
            CheckError::UnknownSymbol { span, .. } | CheckError::Term { span, .. } => span,
        }
    }
}

/// Terms bound by `let`, by name.
#[derive(Clone, Debug, Default)]
pub struct Env(pub(crate) HashMap<Name, Term>);

impl Env {
    /// Look up a bound name.
    pub fn get(&self, name: &Name) -> Option<&Term> {
        self.0.get(name)
    }
}
