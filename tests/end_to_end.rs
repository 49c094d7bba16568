//! Whole contractions checked entry by entry against brute force.

mod generators;

use generators::{assert_tensors_close, close, tensor};
use sumprod::{
    domain::var_set,
    interpreter::Interpreter,
    ops::AssocOp,
    tensor::Tensor,
    term::Term,
};

const I: usize = 3;
const J: usize = 4;
const K: usize = 5;

fn log_sum_exp(xs: impl IntoIterator<Item = f64>) -> f64 {
    let xs: Vec<f64> = xs.into_iter().collect();
    let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    hi + xs.iter().map(|x| (x - hi).exp()).sum::<f64>().ln()
}

/// `i + j` and `j + k` as unevaluated sums of variables.
fn symbolic(interp: &Interpreter) -> (Term, Term) {
    let lhs = interp
        .binary(AssocOp::Add, Term::variable("i", I), Term::variable("j", J))
        .unwrap();
    let rhs = interp
        .binary(AssocOp::Add, Term::variable("j", J), Term::variable("k", K))
        .unwrap();
    (lhs, rhs)
}

/// `i + j` and `j + k` as dense tensors.
fn materialized() -> (Term, Term) {
    (
        Term::tensor(tensor(&[("i", I), ("j", J)], |x| (x[0] + x[1]) as f64)),
        Term::tensor(tensor(&[("j", J), ("k", K)], |x| (x[0] + x[1]) as f64)),
    )
}

fn check_log_sum_product(result: &Tensor) {
    assert_eq!(result.shape().len(), 2);
    for i in 0..I {
        for k in 0..K {
            let want = log_sum_exp((0..J).map(|j| ((i + j) + (j + k)) as f64));
            let got = result.at(&[("i", i), ("k", k)]).unwrap();
            assert!(close(got, want), "({i}, {k}): {got} != {want}");
        }
    }
}

fn log_sum_product(interp: &Interpreter, (lhs, rhs): (Term, Term)) -> Term {
    interp
        .contract(AssocOp::LogAddExp, AssocOp::Add, lhs, rhs, var_set(["j"]))
        .unwrap()
}

#[test]
fn log_sum_product_eager_symbolic() {
    let eager = Interpreter::eager();
    let result = log_sum_product(&eager, symbolic(&eager));
    check_log_sum_product(&eager.materialize(&result).unwrap());
}

#[test]
fn log_sum_product_eager_materialized() {
    let eager = Interpreter::eager();
    let result = log_sum_product(&eager, materialized());
    let tensor = result.as_tensor().expect("dense operands contract to a tensor");
    check_log_sum_product(tensor);
}

#[test]
fn log_sum_product_lazy_symbolic() {
    let lazy = Interpreter::lazy();
    let node = log_sum_product(&lazy, symbolic(&lazy));
    assert!(node.as_contraction().is_some());
    let eager = Interpreter::eager();
    let evaluated = eager.eval(&node).unwrap();
    check_log_sum_product(&eager.materialize(&evaluated).unwrap());
}

#[test]
fn log_sum_product_lazy_materialized() {
    let lazy = Interpreter::lazy();
    let node = log_sum_product(&lazy, materialized());
    assert!(node.as_contraction().is_some());
    let evaluated = Interpreter::eager().eval(&node).unwrap();
    check_log_sum_product(evaluated.as_tensor().unwrap());
}

#[test]
fn symbolic_operands_materialize_to_the_dense_ones() {
    let eager = Interpreter::eager();
    let (lhs, rhs) = symbolic(&eager);
    let (dense_lhs, dense_rhs) = materialized();
    assert_tensors_close(
        &eager.materialize(&lhs).unwrap(),
        dense_lhs.as_tensor().unwrap(),
    );
    assert_tensors_close(
        &eager.materialize(&rhs).unwrap(),
        dense_rhs.as_tensor().unwrap(),
    );
}

#[test]
fn matrix_product() {
    let a = tensor(&[("i", 2), ("j", 3)], |x| (x[0] * 3 + x[1]) as f64);
    let b = tensor(&[("j", 3), ("k", 2)], |x| (x[0] as f64) - (x[1] as f64));
    let eager = Interpreter::eager();
    let c = eager
        .contract(
            AssocOp::Add,
            AssocOp::Mul,
            Term::tensor(a.clone()),
            Term::tensor(b.clone()),
            var_set(["j"]),
        )
        .unwrap();
    let c = c.as_tensor().unwrap();
    for i in 0..2 {
        for k in 0..2 {
            let want: f64 = (0..3)
                .map(|j| a.get(&[i, j]).unwrap() * b.get(&[j, k]).unwrap())
                .sum();
            assert_eq!(c.at(&[("i", i), ("k", k)]), Some(want));
        }
    }

    let generic = Interpreter::eager().with_dispatch(sumprod::contract::Dispatch::generic());
    let slow = generic
        .contract(
            AssocOp::Add,
            AssocOp::Mul,
            Term::tensor(a),
            Term::tensor(b),
            var_set(["j"]),
        )
        .unwrap();
    assert_tensors_close(c, slow.as_tensor().unwrap());
}

#[test]
fn tropical_shortest_paths() {
    // Two-hop shortest path distances through a middle layer.
    let first = tensor(&[("a", 2), ("m", 3)], |x| [[1.0, 4.0, 2.0], [3.0, 1.0, 5.0]][x[0]][x[1]]);
    let second = tensor(&[("m", 3), ("b", 2)], |x| [[2.0, 6.0], [1.0, 1.0], [7.0, 0.5]][x[0]][x[1]]);
    let eager = Interpreter::eager();
    let dist = eager
        .contract(
            AssocOp::Min,
            AssocOp::Add,
            Term::tensor(first),
            Term::tensor(second),
            var_set(["m"]),
        )
        .unwrap();
    let dist = dist.as_tensor().unwrap();
    assert_eq!(dist.at(&[("a", 0), ("b", 0)]), Some(3.0));
    assert_eq!(dist.at(&[("a", 0), ("b", 1)]), Some(2.5));
    assert_eq!(dist.at(&[("a", 1), ("b", 0)]), Some(2.0));
    assert_eq!(dist.at(&[("a", 1), ("b", 1)]), Some(2.0));
}
