//! Terms of the algebra.
//!
//! A `Term` is an immutable, reference-counted node. Sub-terms are shared, so
//! an expression is a DAG; "changing" a term always means building a new one
//! through an [`Interpreter`](crate::interpreter::Interpreter).

use std::sync::Arc;

use float_pretty_print::PrettyPrintFloat;
use pretty::RcDoc;

use crate::{
    contract::Contraction,
    domain::{Domain, Inputs, VarSet, merge_inputs},
    error::{TermError, TermResult},
    ops::AssocOp,
    tensor::Tensor,
    text::{Name, ToDoc},
};

/// A shared, immutable term.
#[derive(Clone, Debug)]
pub struct Term(Arc<TermNode>);

#[derive(Debug)]
struct TermNode {
    kind: TermKind,
    inputs: Inputs,
    output: Domain,
}

/// The kinds of term.
#[derive(Debug)]
pub enum TermKind {
    /// A materialised tensor (scalars included).
    Tensor(Tensor),
    /// A free variable whose value is its own index.
    Variable(Name),
    /// A pointwise operator applied to two terms.
    Binary {
        /// The operator
        op: AssocOp,
        /// Left operand
        lhs: Term,
        /// Right operand
        rhs: Term,
    },
    /// A reduction, binding `reduced_vars`.
    Reduce {
        /// The reducing operator
        op: AssocOp,
        /// The reduced term
        arg: Term,
        /// Variables eliminated
        reduced_vars: VarSet,
    },
    /// A sum-product contraction.
    Contract(Contraction),
}

impl Term {
    fn from_parts(kind: TermKind, inputs: Inputs, output: Domain) -> Self {
        Term(Arc::new(TermNode {
            kind,
            inputs,
            output,
        }))
    }

    /// Wrap a tensor.
    pub fn tensor(tensor: Tensor) -> Self {
        let inputs = tensor.inputs().clone();
        let output = tensor.output();
        Term::from_parts(TermKind::Tensor(tensor), inputs, output)
    }

    /// A real constant.
    pub fn number(value: f64) -> Self {
        Term::tensor(Tensor::scalar(value))
    }

    /// A free variable ranging over `0..size`.
    pub fn variable(name: impl Into<Name>, size: usize) -> Self {
        let name = name.into();
        let inputs = Inputs::from([(name.clone(), Domain::Bint(size))]);
        Term::from_parts(TermKind::Variable(name), inputs, Domain::Bint(size))
    }

    /// A lazy pointwise operation. Interpreters decide when to build one;
    /// this only checks that shared names agree on their domain.
    pub(crate) fn binary_node(op: AssocOp, lhs: Term, rhs: Term) -> TermResult<Self> {
        let mut inputs = lhs.inputs().clone();
        merge_inputs(&mut inputs, rhs.inputs()).map_err(|(name, first, second)| {
            TermError::DomainMismatch {
                name,
                first,
                second,
            }
        })?;
        let output = op.result_domain(lhs.output(), rhs.output());
        Ok(Term::from_parts(
            TermKind::Binary { op, lhs, rhs },
            inputs,
            output,
        ))
    }

    /// A lazy reduction over variables already known to be free in `arg`.
    pub(crate) fn reduce_node(op: AssocOp, arg: Term, reduced_vars: VarSet) -> Self {
        let inputs = arg
            .inputs()
            .iter()
            .filter(|(k, _)| !reduced_vars.contains(*k))
            .map(|(k, d)| (k.clone(), *d))
            .collect();
        let output = op.reduce_domain(arg.output());
        Term::from_parts(
            TermKind::Reduce {
                op,
                arg,
                reduced_vars,
            },
            inputs,
            output,
        )
    }

    pub(crate) fn contract_node(contraction: Contraction) -> Self {
        let inputs = contraction.inputs();
        let output = contraction.output();
        Term::from_parts(TermKind::Contract(contraction), inputs, output)
    }

    /// The kind of this term.
    pub fn kind(&self) -> &TermKind {
        &self.0.kind
    }

    /// Free variables and their domains, in insertion order.
    pub fn inputs(&self) -> &Inputs {
        &self.0.inputs
    }

    /// Domain of the values this term produces.
    pub fn output(&self) -> Domain {
        self.0.output
    }

    /// Names of the free variables.
    pub fn free_vars(&self) -> VarSet {
        self.0.inputs.keys().cloned().collect()
    }

    /// Variables bound directly by this node.
    pub fn bound_vars(&self) -> VarSet {
        match self.kind() {
            TermKind::Reduce { reduced_vars, .. } => reduced_vars.clone(),
            TermKind::Contract(c) => c.reduced_vars().clone(),
            _ => VarSet::new(),
        }
    }

    /// The tensor, if this term is materialised.
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self.kind() {
            TermKind::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// The contraction, if this term is one.
    pub fn as_contraction(&self) -> Option<&Contraction> {
        match self.kind() {
            TermKind::Contract(c) => Some(c),
            _ => None,
        }
    }

    /// Whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Term) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Structural equality. Shared nodes compare equal without being walked.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (TermKind::Tensor(a), TermKind::Tensor(b)) => a == b,
            (TermKind::Variable(a), TermKind::Variable(b)) => {
                a == b && self.output() == other.output()
            }
            (
                TermKind::Binary { op, lhs, rhs },
                TermKind::Binary {
                    op: op2,
                    lhs: lhs2,
                    rhs: rhs2,
                },
            ) => op == op2 && lhs == lhs2 && rhs == rhs2,
            (
                TermKind::Reduce {
                    op,
                    arg,
                    reduced_vars,
                },
                TermKind::Reduce {
                    op: op2,
                    arg: arg2,
                    reduced_vars: reduced_vars2,
                },
            ) => op == op2 && reduced_vars == reduced_vars2 && arg == arg2,
            (TermKind::Contract(a), TermKind::Contract(b)) => a == b,
            _ => false,
        }
    }
}

pub(crate) fn var_set_doc(vars: &VarSet) -> RcDoc<'_> {
    RcDoc::text("{")
        .append(RcDoc::intersperse(
            vars.iter().map(Name::to_doc),
            RcDoc::text(",").append(RcDoc::space()),
        ))
        .append("}")
}

pub(crate) fn call_doc<'a>(head: &'a str, args: Vec<RcDoc<'a>>) -> RcDoc<'a> {
    RcDoc::text(head)
        .append("(")
        .append(
            RcDoc::line_()
                .append(RcDoc::intersperse(
                    args,
                    RcDoc::text(",").append(RcDoc::line()),
                ))
                .nest(2),
        )
        .append(RcDoc::line_())
        .append(")")
        .group()
}

impl ToDoc for Tensor {
    fn to_doc(&self) -> RcDoc<'_> {
        if let Some(value) = self.item() {
            return RcDoc::as_string(PrettyPrintFloat(value));
        }
        let dims = RcDoc::intersperse(
            self.inputs()
                .iter()
                .map(|(k, d)| k.to_doc().append(": ").append(d.to_doc())),
            RcDoc::text(",").append(RcDoc::space()),
        );
        RcDoc::text("tensor[").append(dims).append("]")
    }
}

impl ToDoc for Term {
    fn to_doc(&self) -> RcDoc<'_> {
        match self.kind() {
            TermKind::Tensor(t) => t.to_doc(),
            TermKind::Variable(name) => call_doc(
                "var",
                vec![
                    name.to_doc(),
                    RcDoc::as_string(self.output().size().unwrap_or_default()),
                ],
            ),
            TermKind::Binary { op, lhs, rhs } => {
                call_doc(op.name(), vec![lhs.to_doc(), rhs.to_doc()])
            }
            TermKind::Reduce {
                op,
                arg,
                reduced_vars,
            } => call_doc(
                "reduce",
                vec![op.to_doc(), arg.to_doc(), var_set_doc(reduced_vars)],
            ),
            TermKind::Contract(c) => c.to_doc(),
        }
    }
}
