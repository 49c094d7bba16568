//! Pushing reductions below the join.

use crate::{
    contract::ContractParams,
    domain::VarSet,
    error::TermResult,
    hook::{ContractEvent, Side},
    interpreter::Interpreter,
    term::Term,
};

/// Outcome of one simplification step.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Some reductions were pushed into an operand. The new problem has
    /// strictly fewer reduced variables and should be simplified again.
    FurtherReducible(ContractParams),
    /// Every reduced variable occurs in both operands; a base rule is needed.
    Balanced(ContractParams),
    /// Nothing is left to reduce; the term is the plain join.
    Terminal(Term),
}

/// Perform one push-down step on `params`.
///
/// Variables reduced by the contraction but absent from `lhs` can only come
/// from `rhs`, so `rhs` is reduced over them on its own; symmetrically for
/// `lhs`. Requires every reduced variable to be free in some operand.
pub fn simplify(interp: &Interpreter, params: ContractParams) -> TermResult<Step> {
    let ContractParams {
        sum_op,
        prod_op,
        mut lhs,
        mut rhs,
        mut reduced_vars,
    } = params;

    if reduced_vars.is_empty() {
        interp.notify(&ContractEvent::Join { prod_op });
        return interp.binary(prod_op, lhs, rhs).map(Step::Terminal);
    }

    let lhs_vars = lhs.free_vars();
    let rhs_vars = rhs.free_vars();
    debug_assert!(
        reduced_vars
            .iter()
            .all(|v| lhs_vars.contains(v) || rhs_vars.contains(v))
    );

    let mut progress = false;
    if !reduced_vars.is_subset(&lhs_vars) {
        let rhs_only: VarSet = reduced_vars.difference(&lhs_vars).cloned().collect();
        rhs = interp.reduce(rhs, sum_op, rhs_only.clone())?;
        reduced_vars = reduced_vars.intersection(&lhs_vars).cloned().collect();
        interp.notify(&ContractEvent::PushDown {
            side: Side::Rhs,
            vars: &rhs_only,
            remaining: &reduced_vars,
        });
        progress = true;
    }
    if !reduced_vars.is_subset(&rhs_vars) {
        let lhs_only: VarSet = reduced_vars.difference(&rhs_vars).cloned().collect();
        lhs = interp.reduce(lhs, sum_op, lhs_only.clone())?;
        reduced_vars = reduced_vars.intersection(&rhs_vars).cloned().collect();
        interp.notify(&ContractEvent::PushDown {
            side: Side::Lhs,
            vars: &lhs_only,
            remaining: &reduced_vars,
        });
        progress = true;
    }

    let params = ContractParams {
        sum_op,
        prod_op,
        lhs,
        rhs,
        reduced_vars,
    };
    if progress {
        Ok(Step::FurtherReducible(params))
    } else {
        interp.notify(&ContractEvent::Balanced {
            sum_op,
            prod_op,
            reduced_vars: &params.reduced_vars,
        });
        Ok(Step::Balanced(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::var_set, ops::AssocOp, tensor::Tensor, text::Name};

    fn params(lhs: Term, rhs: Term, vars: &[&str]) -> ContractParams {
        ContractParams {
            sum_op: AssocOp::Add,
            prod_op: AssocOp::Mul,
            lhs,
            rhs,
            reduced_vars: var_set(vars.iter().copied()),
        }
    }

    #[test]
    fn empty_reduction_is_terminal_join() {
        let interp = Interpreter::lazy();
        let step = simplify(
            &interp,
            params(Term::variable("i", 2), Term::variable("j", 3), &[]),
        )
        .unwrap();
        let Step::Terminal(term) = step else {
            panic!("expected a terminal join, got {step:?}");
        };
        assert_eq!(term.free_vars(), var_set(["i", "j"]));
    }

    #[test]
    fn private_variables_are_pushed_down() {
        let interp = Interpreter::lazy();
        let lhs = Term::variable("i", 2);
        let rhs = Term::variable("k", 3);
        let step = simplify(&interp, params(lhs, rhs, &["i", "k"])).unwrap();
        let Step::FurtherReducible(next) = step else {
            panic!("expected progress, got {step:?}");
        };
        assert!(next.reduced_vars.is_empty());
        assert!(next.lhs.free_vars().is_empty());
        assert!(next.rhs.free_vars().is_empty());
    }

    #[test]
    fn shared_variables_are_balanced() {
        let interp = Interpreter::lazy();
        let lhs = Term::variable("j", 4);
        let rhs = Term::tensor(Tensor::arange(Name::from("j"), 4));
        let step = simplify(&interp, params(lhs.clone(), rhs.clone(), &["j"])).unwrap();
        assert_eq!(step, Step::Balanced(params(lhs, rhs, &["j"])));
    }

    #[test]
    fn reduced_set_strictly_shrinks() {
        let interp = Interpreter::lazy();
        let lhs = Term::tensor(
            Tensor::new(
                [("i", 2), ("j", 2)]
                    .into_iter()
                    .map(|(n, s)| (Name::from(n), crate::domain::Domain::Bint(s)))
                    .collect(),
                crate::domain::Domain::Real,
                vec![1.0, 2.0, 3.0, 4.0],
            )
            .unwrap(),
        );
        let rhs = Term::variable("j", 2);
        let mut current = params(lhs, rhs, &["i", "j"]);
        let mut sizes = vec![current.reduced_vars.len()];
        loop {
            match simplify(&interp, current).unwrap() {
                Step::FurtherReducible(next) => {
                    sizes.push(next.reduced_vars.len());
                    current = next;
                }
                Step::Balanced(p) => {
                    assert_eq!(p.reduced_vars, var_set(["j"]));
                    break;
                }
                Step::Terminal(_) => break,
            }
        }
        assert!(sizes.windows(2).all(|w| w[1] < w[0]), "{sizes:?}");
    }
}
