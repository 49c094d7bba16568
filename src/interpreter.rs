//! Building and evaluating terms.
//!
//! Every term is built through an [`Interpreter`], which decides how much
//! work happens at construction time:
//!
//! - [`Interpretation::Eager`] computes whenever operands are materialised
//!   and hands balanced contractions to the base rules.
//! - [`Interpretation::Lazy`] computes nothing and keeps balanced
//!   contractions as nodes, to be evaluated later with [`Interpreter::eval`].
//!
//! Both interpretations push reductions below joins.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    contract::{ContractParams, Dispatch, check_capture, substitute_contraction},
    domain::{Domain, VarSet, fmt_vars},
    error::{TermError, TermResult},
    hook::{ContractEvent, ContractHook},
    ops::AssocOp,
    tensor::Tensor,
    term::{Term, TermKind},
    text::Name,
};

/// Replacement terms for free variables.
pub type Bindings = IndexMap<Name, Term>;

/// When constructed terms are evaluated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpretation {
    /// Compute as soon as operands allow.
    #[default]
    Eager,
    /// Only build nodes.
    Lazy,
}

/// Term constructor and evaluator.
#[derive(Clone, Default)]
pub struct Interpreter {
    interpretation: Interpretation,
    dispatch: Dispatch,
    hook: Option<Arc<dyn ContractHook>>,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("interpretation", &self.interpretation)
            .field("dispatch", &self.dispatch)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl Interpreter {
    /// An eager interpreter with the default base rules.
    pub fn eager() -> Self {
        Interpreter::default()
    }

    /// A lazy interpreter with the default base rules.
    pub fn lazy() -> Self {
        Interpreter::default().with_interpretation(Interpretation::Lazy)
    }

    /// Replace the interpretation.
    pub fn with_interpretation(mut self, interpretation: Interpretation) -> Self {
        self.interpretation = interpretation;
        self
    }

    /// Replace the base-rule table.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Report contraction rewrites to `hook`.
    pub fn with_hook(mut self, hook: Arc<dyn ContractHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// The current interpretation.
    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    /// The base-rule table.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub(crate) fn notify(&self, event: &ContractEvent<'_>) {
        if let Some(hook) = &self.hook {
            hook.observe(event);
        }
    }

    /// Apply `op` pointwise.
    pub fn binary(&self, op: AssocOp, lhs: Term, rhs: Term) -> TermResult<Term> {
        if self.interpretation == Interpretation::Eager {
            if let (Some(x), Some(y)) = (lhs.as_tensor(), rhs.as_tensor()) {
                return Tensor::binary(op, x, y).map(Term::tensor);
            }
        }
        Term::binary_node(op, lhs, rhs)
    }

    /// Reduce `arg` over `vars` with `op`.
    ///
    /// Every variable must be free in `arg`. Reducing a contraction with its
    /// own sum operator extends the contraction, and reducing a product with
    /// an operator that distributes over it becomes a contraction; both are
    /// then simplified as usual.
    pub fn reduce(&self, arg: Term, op: AssocOp, vars: VarSet) -> TermResult<Term> {
        let missing: VarSet = vars
            .iter()
            .filter(|v| !arg.inputs().contains_key(*v))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(TermError::UnknownReducedVars {
                missing: fmt_vars(&missing),
                available: fmt_vars(arg.inputs().keys()),
            });
        }
        if vars.is_empty() {
            return Ok(arg);
        }
        match arg.kind() {
            TermKind::Contract(c) if c.sum_op() == op => {
                let reduced_vars = c.reduced_vars().union(&vars).cloned().collect();
                self.rebuild_contraction(ContractParams {
                    reduced_vars,
                    ..c.params().clone()
                })
            }
            TermKind::Binary {
                op: prod_op,
                lhs,
                rhs,
            } if op.distributes_over(*prod_op) && lhs.output() == rhs.output() => {
                self.contract(op, *prod_op, lhs.clone(), rhs.clone(), vars)
            }
            _ => Ok(self.reduce_join(arg, op, vars)),
        }
    }

    /// Reduce without rewriting products into contractions. Used by base
    /// rules, whose argument is already the join.
    pub(crate) fn reduce_join(&self, arg: Term, op: AssocOp, vars: VarSet) -> Term {
        match arg.kind() {
            TermKind::Tensor(t) if self.interpretation == Interpretation::Eager => {
                Term::tensor(t.reduce(op, &vars))
            }
            TermKind::Reduce {
                op: inner_op,
                arg: inner,
                reduced_vars,
            } if *inner_op == op => {
                let merged = reduced_vars.union(&vars).cloned().collect();
                Term::reduce_node(op, inner.clone(), merged)
            }
            _ => Term::reduce_node(op, arg, vars),
        }
    }

    /// Simultaneously replace free variables.
    ///
    /// Bindings for variables `term` does not have are ignored; if none
    /// remain, `term` is returned as is. Replacements must produce values in
    /// the domain of the variable they replace, and dense replacements must
    /// hold indices within it.
    pub fn substitute(&self, term: &Term, bindings: &Bindings) -> TermResult<Term> {
        let relevant: Bindings = bindings
            .iter()
            .filter(|(k, _)| term.inputs().contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if relevant.is_empty() {
            return Ok(term.clone());
        }
        for (name, value) in &relevant {
            let expected = term.inputs()[name];
            if value.output() != expected {
                return Err(TermError::SubstitutionDomain {
                    name: name.clone(),
                    expected,
                    found: value.output(),
                });
            }
            if let Some(t) = value.as_tensor() {
                t.check_indices(name)?;
            }
        }

        match term.kind() {
            TermKind::Tensor(t) => {
                let indices = relevant
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.materialize(v)?)))
                    .collect::<TermResult<IndexMap<_, _>>>()?;
                t.substitute(&indices).map(Term::tensor)
            }
            TermKind::Variable(name) => Ok(relevant[name].clone()),
            TermKind::Binary { op, lhs, rhs } => self.binary(
                *op,
                self.substitute(lhs, &relevant)?,
                self.substitute(rhs, &relevant)?,
            ),
            TermKind::Reduce {
                op,
                arg,
                reduced_vars,
            } => {
                check_capture(reduced_vars, &relevant)?;
                let arg = self.substitute(arg, &relevant)?;
                self.reduce(arg, *op, reduced_vars.clone())
            }
            TermKind::Contract(c) => substitute_contraction(self, term, c, &relevant),
        }
    }

    /// Rebuild `term` bottom-up under this interpreter.
    ///
    /// Under an eager interpreter this evaluates every contraction left by a
    /// lazy one.
    pub fn eval(&self, term: &Term) -> TermResult<Term> {
        match term.kind() {
            TermKind::Tensor(_) | TermKind::Variable(_) => Ok(term.clone()),
            TermKind::Binary { op, lhs, rhs } => {
                self.binary(*op, self.eval(lhs)?, self.eval(rhs)?)
            }
            TermKind::Reduce {
                op,
                arg,
                reduced_vars,
            } => self.reduce(self.eval(arg)?, *op, reduced_vars.clone()),
            TermKind::Contract(c) => self.rebuild_contraction(ContractParams {
                lhs: self.eval(c.lhs())?,
                rhs: self.eval(c.rhs())?,
                ..c.params().clone()
            }),
        }
    }

    /// Compute every entry of `term`, treating each free variable as ranging
    /// over its whole domain.
    pub fn materialize(&self, term: &Term) -> TermResult<Tensor> {
        match term.kind() {
            TermKind::Tensor(t) => Ok(t.clone()),
            TermKind::Variable(name) => match term.output() {
                domain @ Domain::Real => Err(TermError::UnboundedInput {
                    name: name.clone(),
                    domain,
                }),
                Domain::Bint(n) => Ok(Tensor::arange(name.clone(), n)),
            },
            TermKind::Binary { op, lhs, rhs } => {
                Tensor::binary(*op, &self.materialize(lhs)?, &self.materialize(rhs)?)
            }
            TermKind::Reduce {
                op,
                arg,
                reduced_vars,
            } => Ok(self.materialize(arg)?.reduce(*op, reduced_vars)),
            TermKind::Contract(c) => {
                let eager = self.clone().with_interpretation(Interpretation::Eager);
                let result = eager.rebuild_contraction(ContractParams {
                    lhs: Term::tensor(self.materialize(c.lhs())?),
                    rhs: Term::tensor(self.materialize(c.rhs())?),
                    ..c.params().clone()
                })?;
                match result.as_tensor() {
                    Some(t) => Ok(t.clone()),
                    None => eager.materialize(&result),
                }
            }
        }
    }
}
