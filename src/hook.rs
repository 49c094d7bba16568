//! Observing contraction rewrites.
//!
//! An interpreter may carry a [`ContractHook`], which is told about every
//! push-down step and every base rule that fires. Nothing is logged unless a
//! hook is installed.

use crate::{domain::VarSet, domain::fmt_vars, ops::AssocOp};

/// Which operand a reduction was pushed into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The left operand
    Lhs,
    /// The right operand
    Rhs,
}

/// A rewrite performed while constructing a contraction.
#[derive(Clone, Debug, PartialEq)]
pub enum ContractEvent<'a> {
    /// Variables private to one operand were reduced inside it.
    PushDown {
        /// Operand that was reduced
        side: Side,
        /// Variables reduced there
        vars: &'a VarSet,
        /// Variables still reduced at the join
        remaining: &'a VarSet,
    },
    /// No variables remain to reduce; the contraction is a plain join.
    Join {
        /// The product operator
        prod_op: AssocOp,
    },
    /// Every reduced variable is shared; a base rule is about to run.
    Balanced {
        /// The sum operator
        sum_op: AssocOp,
        /// The product operator
        prod_op: AssocOp,
        /// Variables reduced at the join
        reduced_vars: &'a VarSet,
    },
    /// A base rule produced the result.
    Rule {
        /// Name of the rule
        name: &'static str,
    },
}

/// Receives contraction events.
pub trait ContractHook: Send + Sync {
    /// Called once per event, in order.
    fn observe(&self, event: &ContractEvent<'_>);
}

/// Emits each event as a `tracing` debug event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHook;

impl ContractHook for TracingHook {
    fn observe(&self, event: &ContractEvent<'_>) {
        match event {
            ContractEvent::PushDown {
                side,
                vars,
                remaining,
            } => tracing::debug!(
                ?side,
                vars = %fmt_vars(*vars),
                remaining = %fmt_vars(*remaining),
                "pushed reduction into operand"
            ),
            ContractEvent::Join { prod_op } => {
                tracing::debug!(%prod_op, "nothing to reduce, joining")
            }
            ContractEvent::Balanced {
                sum_op,
                prod_op,
                reduced_vars,
            } => tracing::debug!(
                %sum_op,
                %prod_op,
                reduced_vars = %fmt_vars(*reduced_vars),
                "contraction balanced"
            ),
            ContractEvent::Rule { name } => tracing::debug!(rule = name, "base rule fired"),
        }
    }
}
