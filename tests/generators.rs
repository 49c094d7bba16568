//! Strategies and comparison helpers shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use sumprod::{
    domain::{Domain, Inputs},
    ops::AssocOp,
    tensor::Tensor,
    text::Name,
};

/// Inputs with the given names and sizes, in order.
pub fn inputs(dims: &[(&str, usize)]) -> Inputs {
    dims.iter()
        .map(|(n, s)| (Name::from(*n), Domain::Bint(*s)))
        .collect()
}

/// A real tensor over `dims` with entries `f(index)`.
pub fn tensor(dims: &[(&str, usize)], f: impl Fn(&[usize]) -> f64) -> Tensor {
    Tensor::from_fn(inputs(dims), Domain::Real, f).unwrap()
}

/// Equal up to rounding; equal infinities count as close.
pub fn close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

/// Whether two tensors hold the same entries, matching dimensions by name.
pub fn tensors_close(a: &Tensor, b: &Tensor) -> bool {
    let names = |t: &Tensor| t.inputs().keys().cloned().collect::<BTreeSet<_>>();
    if names(a) != names(b) {
        return false;
    }
    a.entries().into_iter().all(|(index, value)| {
        let named: Vec<(&str, usize)> = a
            .inputs()
            .keys()
            .map(Name::as_str)
            .zip(index.iter().copied())
            .collect();
        b.at(&named).is_some_and(|other| close(value, other))
    })
}

#[track_caller]
pub fn assert_tensors_close(a: &Tensor, b: &Tensor) {
    assert!(tensors_close(a, b), "tensors differ:\n{a:?}\n{b:?}");
}

/// A real tensor over `dims` with entries in `-3..3`.
pub fn arb_tensor(dims: Vec<(&'static str, usize)>) -> impl Strategy<Value = Tensor> {
    let len: usize = dims.iter().map(|(_, s)| s).product();
    proptest::collection::vec(-3.0f64..3.0, len)
        .prop_map(move |data| Tensor::new(inputs(&dims), Domain::Real, data).unwrap())
}

/// Operands `lhs(i, j)` and `rhs(j, k)` of random small sizes.
pub fn arb_operands() -> impl Strategy<Value = (Tensor, Tensor)> {
    (1usize..4, 1usize..4, 1usize..4).prop_flat_map(|(i, j, k)| {
        (
            arb_tensor(vec![("i", i), ("j", j)]),
            arb_tensor(vec![("j", j), ("k", k)]),
        )
    })
}

/// A `(sum, product)` pair where the sum distributes over the product.
pub fn arb_semiring() -> impl Strategy<Value = (AssocOp, AssocOp)> {
    prop_oneof![
        Just((AssocOp::Add, AssocOp::Mul)),
        Just((AssocOp::LogAddExp, AssocOp::Add)),
        Just((AssocOp::Max, AssocOp::Add)),
        Just((AssocOp::Min, AssocOp::Add)),
        Just((AssocOp::Max, AssocOp::Min)),
    ]
}
