//! Sum-product contractions.
//!
//! A contraction is the term
//!
//! ```text
//! reduce(sum_op, prod_op(lhs, rhs), reduced_vars)
//! ```
//!
//! Constructing one never builds that term naively. Variables that only one
//! operand depends on are reduced inside that operand first (see
//! [`simplify`]), and only once every remaining reduced variable is shared by
//! both operands does a base rule from the [`Dispatch`] table join them.

pub mod dispatch;
pub mod simplify;

use pretty::RcDoc;

pub use dispatch::{BaseRule, Dispatch, EagerContract, MatMulContract};
pub use simplify::{Step, simplify};

use crate::{
    domain::{Domain, Inputs, VarSet, fmt_vars, merge_inputs},
    error::{TermError, TermResult},
    interpreter::{Bindings, Interpretation, Interpreter},
    ops::AssocOp,
    term::{Term, call_doc, var_set_doc},
    text::ToDoc,
};

/// The arguments of a contraction.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractParams {
    /// Operator reducing over `reduced_vars`
    pub sum_op: AssocOp,
    /// Operator joining `lhs` and `rhs`
    pub prod_op: AssocOp,
    /// Left operand
    pub lhs: Term,
    /// Right operand
    pub rhs: Term,
    /// Variables to eliminate
    pub reduced_vars: VarSet,
}

/// A contraction node. Only produced by [`Interpreter::contract`] under a
/// lazy interpretation, after simplification has balanced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Contraction(ContractParams);

impl Contraction {
    /// The reducing operator.
    pub fn sum_op(&self) -> AssocOp {
        self.0.sum_op
    }

    /// The joining operator.
    pub fn prod_op(&self) -> AssocOp {
        self.0.prod_op
    }

    /// Left operand.
    pub fn lhs(&self) -> &Term {
        &self.0.lhs
    }

    /// Right operand.
    pub fn rhs(&self) -> &Term {
        &self.0.rhs
    }

    /// Variables bound by this node.
    pub fn reduced_vars(&self) -> &VarSet {
        &self.0.reduced_vars
    }

    /// The arguments this node was built from.
    pub fn params(&self) -> &ContractParams {
        &self.0
    }

    /// Free variables: those of `lhs` then `rhs`, less `reduced_vars`.
    pub fn inputs(&self) -> Inputs {
        let reduced = &self.0.reduced_vars;
        self.0
            .lhs
            .inputs()
            .iter()
            .chain(self.0.rhs.inputs())
            .filter(|(k, _)| !reduced.contains(*k))
            .map(|(k, d)| (k.clone(), *d))
            .collect()
    }

    /// Domain of the result: the join of the operand outputs, reduced.
    pub fn output(&self) -> Domain {
        let joined = self
            .0
            .prod_op
            .result_domain(self.0.lhs.output(), self.0.rhs.output());
        self.0.sum_op.reduce_domain(joined)
    }
}

impl ToDoc for Contraction {
    fn to_doc(&self) -> RcDoc<'_> {
        call_doc(
            "contract",
            vec![
                self.0.sum_op.to_doc(),
                self.0.prod_op.to_doc(),
                self.0.lhs.to_doc(),
                self.0.rhs.to_doc(),
                var_set_doc(&self.0.reduced_vars),
            ],
        )
    }
}

/// Substitute into the operands of the contraction `node`.
///
/// Bindings of reduced variables are ignored, since the node binds them. If
/// nothing else applies the node itself is returned. A replacement mentioning
/// a reduced variable would be captured and is rejected with
/// [`TermError::UnsupportedCapture`].
pub(crate) fn substitute_contraction(
    interp: &Interpreter,
    node: &Term,
    contraction: &Contraction,
    bindings: &Bindings,
) -> TermResult<Term> {
    let reduced = contraction.reduced_vars();
    let bindings: Bindings = bindings
        .iter()
        .filter(|(k, _)| !reduced.contains(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !bindings.keys().any(|k| node.inputs().contains_key(k)) {
        return Ok(node.clone());
    }
    check_capture(reduced, &bindings)?;
    let lhs = interp.substitute(contraction.lhs(), &bindings)?;
    let rhs = interp.substitute(contraction.rhs(), &bindings)?;
    interp.rebuild_contraction(ContractParams {
        lhs,
        rhs,
        ..contraction.params().clone()
    })
}

/// Reject bindings whose replacements mention any of `bound`.
pub(crate) fn check_capture(bound: &VarSet, bindings: &Bindings) -> TermResult<()> {
    let captured: VarSet = bindings
        .values()
        .flat_map(|v| v.inputs().keys())
        .filter(|k| bound.contains(*k))
        .cloned()
        .collect();
    if captured.is_empty() {
        Ok(())
    } else {
        Err(TermError::UnsupportedCapture {
            captured: fmt_vars(&captured),
        })
    }
}

impl Interpreter {
    /// Contract `lhs` and `rhs`: reduce `prod_op(lhs, rhs)` over
    /// `reduced_vars` under `sum_op`.
    ///
    /// With nothing to reduce this is exactly `prod_op(lhs, rhs)`. Otherwise
    /// the operands must have the same output, reductions are pushed into the
    /// operand that owns each private variable until every reduced variable
    /// is shared, and the balanced problem goes to the base rules (eager) or
    /// becomes a node (lazy).
    pub fn contract(
        &self,
        sum_op: AssocOp,
        prod_op: AssocOp,
        lhs: Term,
        rhs: Term,
        reduced_vars: VarSet,
    ) -> TermResult<Term> {
        check_scope(&lhs, &rhs, &reduced_vars)?;
        if !reduced_vars.is_empty() && lhs.output() != rhs.output() {
            return Err(TermError::OutputMismatch {
                lhs: lhs.output(),
                rhs: rhs.output(),
            });
        }
        self.simplify_loop(ContractParams {
            sum_op,
            prod_op,
            lhs,
            rhs,
            reduced_vars,
        })
    }

    /// Contract operands taken from an existing node.
    ///
    /// Push-down may already have reduced one operand into a different
    /// domain, so operand outputs are not compared here.
    pub(crate) fn rebuild_contraction(&self, params: ContractParams) -> TermResult<Term> {
        check_scope(&params.lhs, &params.rhs, &params.reduced_vars)?;
        self.simplify_loop(params)
    }

    fn simplify_loop(&self, mut params: ContractParams) -> TermResult<Term> {
        loop {
            match simplify(self, params)? {
                Step::FurtherReducible(next) => params = next,
                Step::Balanced(balanced) => return self.contract_balanced(balanced),
                Step::Terminal(term) => return Ok(term),
            }
        }
    }

    fn contract_balanced(&self, params: ContractParams) -> TermResult<Term> {
        match self.interpretation() {
            Interpretation::Lazy => Ok(Term::contract_node(Contraction(params))),
            Interpretation::Eager => self.dispatch().run(self, &params),
        }
    }
}

/// The operands must agree on shared variables, and every reduced variable
/// must be free in one of them.
fn check_scope(lhs: &Term, rhs: &Term, reduced_vars: &VarSet) -> TermResult<()> {
    let mut available = lhs.inputs().clone();
    merge_inputs(&mut available, rhs.inputs()).map_err(|(name, first, second)| {
        TermError::DomainMismatch {
            name,
            first,
            second,
        }
    })?;
    let missing: VarSet = reduced_vars
        .iter()
        .filter(|k| !available.contains_key(*k))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TermError::ReducedVarsNotFree {
            missing: fmt_vars(&missing),
            available: fmt_vars(available.keys()),
        })
    }
}
