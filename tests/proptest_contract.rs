//! Property tests for contraction construction.

mod generators;

use generators::{arb_operands, arb_semiring, tensors_close};
use proptest::prelude::*;
use sumprod::{
    contract::{ContractParams, Dispatch, Step, simplify},
    domain::{VarSet, var_set},
    interpreter::Interpreter,
    ops::AssocOp,
    tensor::Tensor,
    term::Term,
};

/// Any subset of the three variables `i`, `j`, `k`.
fn arb_reduced_vars() -> impl Strategy<Value = VarSet> {
    proptest::sample::subsequence(vec!["i", "j", "k"], 0..=3).prop_map(|names| var_set(names))
}

fn brute_force(
    sum_op: AssocOp,
    prod_op: AssocOp,
    lhs: &Tensor,
    rhs: &Tensor,
    vars: &VarSet,
) -> Tensor {
    Tensor::binary(prod_op, lhs, rhs).unwrap().reduce(sum_op, vars)
}

proptest! {
    /// Contracting equals joining then reducing, whatever is reduced.
    #[test]
    fn contraction_matches_brute_force(
        (lhs, rhs) in arb_operands(),
        (sum_op, prod_op) in arb_semiring(),
        vars in arb_reduced_vars(),
    ) {
        let interp = Interpreter::eager();
        let got = interp
            .contract(sum_op, prod_op, Term::tensor(lhs.clone()), Term::tensor(rhs.clone()), vars.clone())
            .unwrap();
        let want = brute_force(sum_op, prod_op, &lhs, &rhs, &vars);
        prop_assert!(tensors_close(got.as_tensor().unwrap(), &want));
    }

    /// Reducing a private variable of `rhs` up front changes nothing.
    #[test]
    fn push_down_equivalence(
        (lhs, rhs) in arb_operands(),
        (sum_op, prod_op) in arb_semiring(),
        with_j in any::<bool>(),
    ) {
        let interp = Interpreter::eager();
        let vars = if with_j { var_set(["j", "k"]) } else { var_set(["k"]) };
        let direct = interp
            .contract(sum_op, prod_op, Term::tensor(lhs.clone()), Term::tensor(rhs.clone()), vars.clone())
            .unwrap();
        let reduced_rhs = interp.reduce(Term::tensor(rhs), sum_op, var_set(["k"])).unwrap();
        let rest: VarSet = vars.difference(&var_set(["k"])).cloned().collect();
        let staged = interp
            .contract(sum_op, prod_op, Term::tensor(lhs), reduced_rhs, rest)
            .unwrap();
        prop_assert!(tensors_close(direct.as_tensor().unwrap(), staged.as_tensor().unwrap()));
    }

    /// Every push-down step strictly shrinks the reduced set, and the loop
    /// ends balanced on shared variables or with a plain join.
    #[test]
    fn simplification_terminates(
        (lhs, rhs) in arb_operands(),
        (sum_op, prod_op) in arb_semiring(),
        vars in arb_reduced_vars(),
    ) {
        let interp = Interpreter::lazy();
        let mut params = ContractParams {
            sum_op,
            prod_op,
            lhs: Term::tensor(lhs),
            rhs: Term::tensor(rhs),
            reduced_vars: vars,
        };
        loop {
            let before = params.reduced_vars.len();
            match simplify(&interp, params).unwrap() {
                Step::FurtherReducible(next) => {
                    prop_assert!(next.reduced_vars.len() < before);
                    params = next;
                }
                Step::Balanced(balanced) => {
                    let shared: VarSet = balanced
                        .lhs
                        .free_vars()
                        .intersection(&balanced.rhs.free_vars())
                        .cloned()
                        .collect();
                    prop_assert!(!balanced.reduced_vars.is_empty());
                    prop_assert!(balanced.reduced_vars.is_subset(&shared));
                    break;
                }
                Step::Terminal(_) => break,
            }
        }
    }

    /// The lazy node evaluates to what the eager interpreter computes.
    #[test]
    fn lazy_then_eval_agrees(
        (lhs, rhs) in arb_operands(),
        (sum_op, prod_op) in arb_semiring(),
        vars in arb_reduced_vars(),
    ) {
        let eager = Interpreter::eager();
        let lazy = Interpreter::lazy();
        let direct = eager
            .contract(sum_op, prod_op, Term::tensor(lhs.clone()), Term::tensor(rhs.clone()), vars.clone())
            .unwrap();
        let node = lazy
            .contract(sum_op, prod_op, Term::tensor(lhs), Term::tensor(rhs), vars)
            .unwrap();
        let evaluated = eager.eval(&node).unwrap();
        prop_assert!(tensors_close(
            &eager.materialize(&evaluated).unwrap(),
            direct.as_tensor().unwrap(),
        ));
    }

    /// The matrix-product rule agrees with the generic one.
    #[test]
    fn matmul_rule_agrees_with_generic((lhs, rhs) in arb_operands(), vars in arb_reduced_vars()) {
        let fast = Interpreter::eager();
        let slow = Interpreter::eager().with_dispatch(Dispatch::generic());
        let contract = |interp: &Interpreter| {
            interp
                .contract(
                    AssocOp::Add,
                    AssocOp::Mul,
                    Term::tensor(lhs.clone()),
                    Term::tensor(rhs.clone()),
                    vars.clone(),
                )
                .unwrap()
        };
        let (fast, slow) = (contract(&fast), contract(&slow));
        prop_assert!(tensors_close(fast.as_tensor().unwrap(), slow.as_tensor().unwrap()));
    }
}
