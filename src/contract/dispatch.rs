//! Base rules for balanced contractions.
//!
//! Once simplification has balanced a contraction, the interpreter asks each
//! registered [`BaseRule`] in turn to evaluate it. Specialised rules decline
//! (return `None`) for shapes they do not handle. [`EagerContract`] is not
//! part of the table: it runs when every registered rule has declined.

use std::sync::Arc;

use faer::Mat;

use crate::{
    contract::ContractParams,
    domain::{Inputs, VarSet},
    error::TermResult,
    hook::ContractEvent,
    interpreter::Interpreter,
    ops::AssocOp,
    tensor::Tensor,
    term::Term,
    text::Name,
};

/// An evaluation rule for balanced contractions.
pub trait BaseRule: Send + Sync {
    /// Name reported to hooks.
    fn name(&self) -> &'static str;

    /// Evaluate `params`, or return `None` to defer to the next rule.
    fn apply(&self, interp: &Interpreter, params: &ContractParams) -> TermResult<Option<Term>>;
}

/// Join the operands with `prod_op`, then reduce the join.
#[derive(Clone, Copy, Debug, Default)]
pub struct EagerContract;

impl BaseRule for EagerContract {
    fn name(&self) -> &'static str {
        "eager_contract"
    }

    fn apply(&self, interp: &Interpreter, params: &ContractParams) -> TermResult<Option<Term>> {
        eager_contract(interp, params).map(Some)
    }
}

fn eager_contract(interp: &Interpreter, params: &ContractParams) -> TermResult<Term> {
    let joined = interp.binary(params.prod_op, params.lhs.clone(), params.rhs.clone())?;
    Ok(interp.reduce_join(joined, params.sum_op, params.reduced_vars.clone()))
}

/// Sum-of-products over two dense tensors as a matrix product.
///
/// Applies to `(add, mul)` when both operands are materialised and no
/// variable is kept by both (no batch dimensions).
#[derive(Clone, Copy, Debug, Default)]
pub struct MatMulContract;

impl BaseRule for MatMulContract {
    fn name(&self) -> &'static str {
        "matmul_contract"
    }

    fn apply(&self, _interp: &Interpreter, params: &ContractParams) -> TermResult<Option<Term>> {
        if (params.sum_op, params.prod_op) != (AssocOp::Add, AssocOp::Mul) {
            return Ok(None);
        }
        let (Some(lhs), Some(rhs)) = (params.lhs.as_tensor(), params.rhs.as_tensor()) else {
            return Ok(None);
        };
        let reduced = &params.reduced_vars;
        let rows: Vec<Name> = kept(lhs.inputs(), reduced);
        let cols: Vec<Name> = kept(rhs.inputs(), reduced);
        if rows.iter().any(|n| cols.contains(n)) {
            return Ok(None);
        }
        let inner: Vec<Name> = reduced.iter().cloned().collect();

        let lhs = lhs.permute(&[rows.as_slice(), inner.as_slice()].concat());
        let rhs = rhs.permute(&[inner.as_slice(), cols.as_slice()].concat());
        let m = volume(lhs.inputs(), &rows);
        let k = volume(lhs.inputs(), &inner);
        let n = volume(rhs.inputs(), &cols);

        let a = Mat::<f64>::from_fn(m, k, |i, j| lhs.data()[i * k + j]);
        let b = Mat::<f64>::from_fn(k, n, |i, j| rhs.data()[i * n + j]);
        let c = &a * &b;

        let inputs: Inputs = rows
            .iter()
            .map(|r| (r.clone(), lhs.inputs()[r]))
            .chain(cols.iter().map(|col| (col.clone(), rhs.inputs()[col])))
            .collect();
        let output = params
            .sum_op
            .reduce_domain(params.prod_op.result_domain(lhs.output(), rhs.output()));
        let mut data = Vec::with_capacity(m * n);
        for i in 0..m {
            for j in 0..n {
                data.push(c[(i, j)]);
            }
        }
        Tensor::new(inputs, output, data).map(|t| Some(Term::tensor(t)))
    }
}

fn kept(inputs: &Inputs, reduced: &VarSet) -> Vec<Name> {
    inputs
        .keys()
        .filter(|k| !reduced.contains(*k))
        .cloned()
        .collect()
}

fn volume(inputs: &Inputs, names: &[Name]) -> usize {
    names
        .iter()
        .filter_map(|n| inputs.get(n).and_then(|d| d.size()))
        .product()
}

/// Ordered table of specialised base rules, backed by [`EagerContract`].
#[derive(Clone)]
pub struct Dispatch {
    rules: Vec<Arc<dyn BaseRule>>,
}

impl Default for Dispatch {
    /// The matrix-product rule.
    fn default() -> Self {
        Dispatch {
            rules: vec![Arc::new(MatMulContract)],
        }
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rule_names())
            .finish()
    }
}

impl Dispatch {
    /// No specialised rules: everything goes to [`EagerContract`].
    pub fn generic() -> Self {
        Dispatch { rules: Vec::new() }
    }

    /// Add `rule`, consulted before every rule already registered.
    pub fn with_rule(mut self, rule: impl BaseRule + 'static) -> Self {
        self.rules.insert(0, Arc::new(rule));
        self
    }

    /// Names of the rules in the order they are tried, ending with
    /// [`EagerContract`].
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules
            .iter()
            .map(|r| r.name())
            .chain([EagerContract.name()])
            .collect()
    }

    /// Evaluate a balanced contraction with the first rule that accepts it,
    /// or with [`EagerContract`] if none does.
    pub fn run(&self, interp: &Interpreter, params: &ContractParams) -> TermResult<Term> {
        for rule in &self.rules {
            if let Some(term) = rule.apply(interp, params)? {
                interp.notify(&ContractEvent::Rule { name: rule.name() });
                return Ok(term);
            }
        }
        let term = eager_contract(interp, params)?;
        interp.notify(&ContractEvent::Rule {
            name: EagerContract.name(),
        });
        Ok(term)
    }
}
