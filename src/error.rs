//! Errors raised while building, rewriting, or evaluating terms.

use thiserror::Error;

use crate::{domain::Domain, text::Name};

/// Errors from the term algebra.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TermError {
    /// A contraction was asked to reduce variables that neither operand has.
    #[error("cannot contract over [{missing}]: operands only have free variables [{available}]")]
    ReducedVarsNotFree {
        /// The offending variables
        missing: String,
        /// Free variables of both operands
        available: String,
    },
    /// A reduction named variables the term does not have.
    #[error("cannot reduce over [{missing}]: term only has free variables [{available}]")]
    UnknownReducedVars {
        /// The offending variables
        missing: String,
        /// Free variables of the term
        available: String,
    },
    /// Substitution would capture variables bound by a reduction.
    #[error("substitution would capture bound variables [{captured}]; alpha-conversion is not supported")]
    UnsupportedCapture {
        /// Bound variables that occur free in a replacement
        captured: String,
    },
    /// The two operands of a contraction produce different domains.
    #[error("contraction operands have different outputs: lhs is {lhs}, rhs is {rhs}")]
    OutputMismatch {
        /// Output of the left operand
        lhs: Domain,
        /// Output of the right operand
        rhs: Domain,
    },
    /// The same variable appears with two different domains.
    #[error("variable {name} is used with domain {first} and with domain {second}")]
    DomainMismatch {
        /// The variable
        name: Name,
        /// Domain seen first
        first: Domain,
        /// Conflicting domain
        second: Domain,
    },
    /// A replacement term does not produce values of the replaced variable's domain.
    #[error("cannot substitute a term of output {found} for {name}, which has domain {expected}")]
    SubstitutionDomain {
        /// The replaced variable
        name: Name,
        /// Domain of the variable
        expected: Domain,
        /// Output of the replacement
        found: Domain,
    },
    /// A substituted index fell outside the variable's domain.
    #[error("index {index} is out of range for {name} of domain {domain}")]
    IndexOutOfRange {
        /// The indexed variable
        name: Name,
        /// Offending value
        index: f64,
        /// Domain of the variable
        domain: Domain,
    },
    /// Free variables must range over bounded integers.
    #[error("variable {name} has domain {domain}; only bounded integer inputs are supported")]
    UnboundedInput {
        /// The variable
        name: Name,
        /// Its domain
        domain: Domain,
    },
    /// Tensor data does not match the shape given by its inputs.
    #[error("tensor data has {found} entries but its inputs require {expected}")]
    ShapeMismatch {
        /// Entries required by the inputs
        expected: usize,
        /// Entries supplied
        found: usize,
    },
}

/// Result type of term operations.
pub type TermResult<T> = Result<T, TermError>;
