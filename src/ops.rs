//! Associative operators used as the "sum" and "product" of a contraction.

use std::fmt;

use pretty::RcDoc;
use winnow::{
    LocatingSlice, ModalResult, Parser,
    combinator::alt,
    error::{StrContext, StrContextValue},
};

use crate::{
    domain::Domain,
    text::{HasParser, ToDoc},
};

/// A commutative, associative binary operator on reals.
///
/// Operators are identified by tag rather than by function pointer so that
/// they can key base-rule dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssocOp {
    /// `x + y`
    Add,
    /// `x * y`
    Mul,
    /// `max(x, y)`
    Max,
    /// `min(x, y)`
    Min,
    /// `log(exp(x) + exp(y))`
    LogAddExp,
}

impl AssocOp {
    /// All operators, in parsing order.
    pub const ALL: [AssocOp; 5] = [
        AssocOp::Add,
        AssocOp::Mul,
        AssocOp::Max,
        AssocOp::Min,
        AssocOp::LogAddExp,
    ];

    /// Apply the operator.
    pub fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            AssocOp::Add => x + y,
            AssocOp::Mul => x * y,
            AssocOp::Max => x.max(y),
            AssocOp::Min => x.min(y),
            AssocOp::LogAddExp => log_add_exp(x, y),
        }
    }

    /// The identity element, used to seed reductions.
    pub fn identity(self) -> f64 {
        match self {
            AssocOp::Add => 0.0,
            AssocOp::Mul => 1.0,
            AssocOp::Max | AssocOp::LogAddExp => f64::NEG_INFINITY,
            AssocOp::Min => f64::INFINITY,
        }
    }

    /// Whether `self` distributes over `prod`, i.e. the pair forms a semiring
    /// and `self`-reductions may be pushed through `prod`.
    pub fn distributes_over(self, prod: AssocOp) -> bool {
        matches!(
            (self, prod),
            (AssocOp::Add, AssocOp::Mul)
                | (AssocOp::LogAddExp, AssocOp::Add)
                | (AssocOp::Max, AssocOp::Add)
                | (AssocOp::Min, AssocOp::Add)
                | (AssocOp::Max, AssocOp::Min)
                | (AssocOp::Min, AssocOp::Max)
        )
    }

    /// Domain of `op(x, y)` for operands of domains `x` and `y`.
    /// Only `max` and `min` can preserve an integer domain.
    pub fn result_domain(self, x: Domain, y: Domain) -> Domain {
        match self {
            AssocOp::Max | AssocOp::Min if x == y => x,
            _ => Domain::Real,
        }
    }

    /// Domain of a reduction under this operator of values in `domain`.
    pub fn reduce_domain(self, domain: Domain) -> Domain {
        self.result_domain(domain, domain)
    }

    /// Name used in the surface syntax.
    pub fn name(self) -> &'static str {
        match self {
            AssocOp::Add => "add",
            AssocOp::Mul => "mul",
            AssocOp::Max => "max",
            AssocOp::Min => "min",
            AssocOp::LogAddExp => "logaddexp",
        }
    }
}

fn log_add_exp(x: f64, y: f64) -> f64 {
    if x == f64::NEG_INFINITY {
        return y;
    }
    if y == f64::NEG_INFINITY {
        return x;
    }
    let (hi, lo) = if x >= y { (x, y) } else { (y, x) };
    hi + (lo - hi).exp().ln_1p()
}

impl fmt::Display for AssocOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ToDoc for AssocOp {
    fn to_doc(&self) -> RcDoc<'_> {
        RcDoc::text(self.name())
    }
}

impl HasParser for AssocOp {
    fn parser(input: &mut LocatingSlice<&str>) -> ModalResult<Self> {
        alt((
            "add".value(AssocOp::Add),
            "mul".value(AssocOp::Mul),
            "max".value(AssocOp::Max),
            "min".value(AssocOp::Min),
            "logaddexp".value(AssocOp::LogAddExp),
        ))
        .context(StrContext::Label("operator"))
        .context(StrContext::Expected(StrContextValue::Description(
            "one of add, mul, max, min, logaddexp",
        )))
        .parse_next(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_neutral() {
        for op in AssocOp::ALL {
            for x in [-3.5, 0.0, 2.0, 7.25] {
                assert!((op.apply(op.identity(), x) - x).abs() < 1e-12, "{op} {x}");
            }
        }
    }

    #[test]
    fn log_add_exp_matches_definition() {
        let got = AssocOp::LogAddExp.apply(1.0, 2.0);
        let want = (1f64.exp() + 2f64.exp()).ln();
        assert!((got - want).abs() < 1e-12);
        assert_eq!(
            AssocOp::LogAddExp.apply(f64::NEG_INFINITY, f64::NEG_INFINITY),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn semiring_pairs() {
        assert!(AssocOp::Add.distributes_over(AssocOp::Mul));
        assert!(AssocOp::LogAddExp.distributes_over(AssocOp::Add));
        assert!(!AssocOp::Mul.distributes_over(AssocOp::Add));
        assert!(!AssocOp::Add.distributes_over(AssocOp::Add));
    }
}
