//! Raw syntax terms.

use std::ops::Range;

use pretty::RcDoc;
use winnow::{
    LocatingSlice, ModalResult, Parser,
    ascii::{dec_uint, float, multispace0},
    combinator::{alt, cut_err, delimited, peek, preceded, separated, seq},
    error::{StrContext, StrContextValue},
    token::one_of,
};

use crate::{
    domain::{Inputs, VarSet},
    error::TermError,
    interpreter::{Bindings, Interpreter},
    ops::AssocOp,
    tensor::Tensor,
    term::{Term, call_doc},
    text::{HasParser, Name, Spanned, ToDoc},
    typecheck::{CheckError, Env},
};

/// Raw syntax term with text span.
pub type TermR<S> = Spanned<S, TermRInner<S>>;

/// A name with its text span, as written in a variable set or binding.
pub type NameR<S> = Spanned<S, Name>;

/// Raw syntax term without text span.
#[derive(Clone, Debug, PartialEq)]
pub enum TermRInner<S> {
    /// A real constant, e.g. "2.5"
    Number(f64),
    /// A free variable "var(i, 3)"
    Var {
        /// Variable name
        name: Name,
        /// Size of its domain
        size: usize,
    },
    /// The tensor "arange(i, 3)" holding `0, 1, 2` along `i`
    Arange {
        /// Dimension name
        name: Name,
        /// Length
        size: usize,
    },
    /// A pointwise operator "add(x, y)"
    Binary {
        /// The operator
        op: AssocOp,
        /// First argument
        lhs: Box<TermR<S>>,
        /// Second argument
        rhs: Box<TermR<S>>,
    },
    /// "reduce(op, x, {i, j})"
    Reduce {
        /// The reducing operator
        op: AssocOp,
        /// The reduced term
        arg: Box<TermR<S>>,
        /// Variables to reduce
        vars: Vec<NameR<S>>,
    },
    /// "contract(sum, prod, x, y, {i, j})"
    Contract {
        /// The reducing operator
        sum_op: AssocOp,
        /// The joining operator
        prod_op: AssocOp,
        /// Left operand
        lhs: Box<TermR<S>>,
        /// Right operand
        rhs: Box<TermR<S>>,
        /// Variables to reduce
        vars: Vec<NameR<S>>,
    },
    /// "subs(x, i = t, ...)"
    Subs {
        /// Term substituted into
        arg: Box<TermR<S>>,
        /// Replacements, applied simultaneously
        bindings: Vec<(NameR<S>, TermR<S>)>,
    },
    /// A term enclosed in parentheses
    Brackets(Box<TermR<S>>),
    /// A name bound by an earlier `let`
    Symbol(Name),
}

fn vars_doc<S>(vars: &[NameR<S>]) -> RcDoc<'_> {
    RcDoc::text("{")
        .append(RcDoc::intersperse(
            vars.iter().map(NameR::to_doc),
            RcDoc::text(", "),
        ))
        .append("}")
}

impl<S> ToDoc for TermRInner<S> {
    fn to_doc(&self) -> RcDoc<'_> {
        match self {
            TermRInner::Number(x) => RcDoc::as_string(x),
            TermRInner::Var { name, size } => {
                call_doc("var", vec![name.to_doc(), RcDoc::as_string(size)])
            }
            TermRInner::Arange { name, size } => {
                call_doc("arange", vec![name.to_doc(), RcDoc::as_string(size)])
            }
            TermRInner::Binary { op, lhs, rhs } => {
                call_doc(op.name(), vec![lhs.to_doc(), rhs.to_doc()])
            }
            TermRInner::Reduce { op, arg, vars } => {
                call_doc("reduce", vec![op.to_doc(), arg.to_doc(), vars_doc(vars)])
            }
            TermRInner::Contract {
                sum_op,
                prod_op,
                lhs,
                rhs,
                vars,
            } => call_doc(
                "contract",
                vec![
                    sum_op.to_doc(),
                    prod_op.to_doc(),
                    lhs.to_doc(),
                    rhs.to_doc(),
                    vars_doc(vars),
                ],
            ),
            TermRInner::Subs { arg, bindings } => call_doc(
                "subs",
                std::iter::once(arg.to_doc())
                    .chain(
                        bindings
                            .iter()
                            .map(|(name, value)| name.to_doc().append(" = ").append(value.to_doc())),
                    )
                    .collect(),
            ),
            TermRInner::Brackets(term) => RcDoc::text("(")
                .append(RcDoc::line_().append(term.to_doc()).nest(2))
                .append(RcDoc::line_())
                .append(")")
                .group(),
            TermRInner::Symbol(name) => name.to_doc(),
        }
    }
}

impl<S: Clone> TermR<S> {
    /// Check a raw term in the given environment, building it with `interp`.
    pub fn check(&self, env: &Env, interp: &Interpreter) -> Result<Term, CheckError<S>> {
        let wrap = |error: TermError| CheckError::Term {
            error,
            span: self.span.clone(),
        };
        match &self.inner {
            TermRInner::Number(x) => Ok(Term::number(*x)),
            TermRInner::Var { name, size } => Ok(Term::variable(name.clone(), *size)),
            TermRInner::Arange { name, size } => {
                Ok(Term::tensor(Tensor::arange(name.clone(), *size)))
            }
            TermRInner::Binary { op, lhs, rhs } => {
                let lhs = lhs.check(env, interp)?;
                let rhs = rhs.check(env, interp)?;
                interp.binary(*op, lhs, rhs).map_err(wrap)
            }
            TermRInner::Reduce { op, arg, vars } => {
                let arg = arg.check(env, interp)?;
                interp.reduce(arg, *op, var_set(vars)).map_err(wrap)
            }
            TermRInner::Contract {
                sum_op,
                prod_op,
                lhs,
                rhs,
                vars,
            } => {
                let lhs = lhs.check(env, interp)?;
                let rhs = rhs.check(env, interp)?;
                interp
                    .contract(*sum_op, *prod_op, lhs, rhs, var_set(vars))
                    .map_err(wrap)
            }
            TermRInner::Subs { arg, bindings } => {
                let arg = arg.check(env, interp)?;
                let bindings = bindings
                    .iter()
                    .map(|(name, value)| {
                        // Literals take the domain of the variable they replace.
                        let term = match (&value.inner, arg.inputs().get(&name.inner)) {
                            (TermRInner::Number(x), Some(domain)) => Tensor::new(
                                Inputs::new(),
                                *domain,
                                vec![*x],
                            )
                            .map(Term::tensor)
                            .map_err(|error| CheckError::Term {
                                error,
                                span: value.span.clone(),
                            })?,
                            _ => value.check(env, interp)?,
                        };
                        Ok((name.inner.clone(), term))
                    })
                    .collect::<Result<Bindings, CheckError<S>>>()?;
                interp.substitute(&arg, &bindings).map_err(wrap)
            }
            TermRInner::Brackets(term) => term.check(env, interp),
            TermRInner::Symbol(name) => {
                env.0
                    .get(name)
                    .cloned()
                    .ok_or_else(|| CheckError::UnknownSymbol {
                        name: name.clone(),
                        span: self.span.clone(),
                    })
            }
        }
    }
}

fn var_set<S>(vars: &[NameR<S>]) -> VarSet {
    vars.iter().map(|v| v.inner.clone()).collect()
}

fn comma(input: &mut LocatingSlice<&str>) -> ModalResult<()> {
    (multispace0, ',', multispace0).void().parse_next(input)
}

fn open(keyword: &'static str) -> impl FnMut(&mut LocatingSlice<&str>) -> ModalResult<()> {
    move |input: &mut LocatingSlice<&str>| {
        (keyword, multispace0, '(', multispace0)
            .void()
            .parse_next(input)
    }
}

fn close(input: &mut LocatingSlice<&str>) -> ModalResult<()> {
    (multispace0, ')')
        .void()
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)
}

fn size(input: &mut LocatingSlice<&str>) -> ModalResult<usize> {
    dec_uint
        .context(StrContext::Label("size"))
        .context(StrContext::Expected(StrContextValue::Description(
            "natural number",
        )))
        .parse_next(input)
}

fn number(input: &mut LocatingSlice<&str>) -> ModalResult<f64> {
    preceded(
        peek(one_of(|c: char| c.is_ascii_digit() || c == '-' || c == '.')),
        float,
    )
    .parse_next(input)
}

fn var_list(input: &mut LocatingSlice<&str>) -> ModalResult<Vec<NameR<Range<usize>>>> {
    delimited(
        ('{', multispace0),
        separated(0.., NameR::parser, comma),
        cut_err(
            (multispace0, '}').context(StrContext::Expected(StrContextValue::CharLiteral('}'))),
        ),
    )
    .context(StrContext::Label("variable set"))
    .parse_next(input)
}

fn binding(
    input: &mut LocatingSlice<&str>,
) -> ModalResult<(NameR<Range<usize>>, TermR<Range<usize>>)> {
    seq!(NameR::parser, _: (multispace0, '=', multispace0), TermR::parser).parse_next(input)
}

impl HasParser for TermRInner<Range<usize>> {
    fn parser(input: &mut LocatingSlice<&str>) -> ModalResult<Self> {
        let term = || TermR::parser.map(Box::new);
        alt((
            preceded(
                open("reduce"),
                cut_err(seq!(AssocOp::parser, _: comma, term(), _: comma, var_list, _: close)),
            )
            .map(|(op, arg, vars)| TermRInner::Reduce { op, arg, vars }),
            preceded(
                open("contract"),
                cut_err(seq!(
                    AssocOp::parser,
                    _: comma,
                    AssocOp::parser,
                    _: comma,
                    term(),
                    _: comma,
                    term(),
                    _: comma,
                    var_list,
                    _: close
                )),
            )
            .map(|(sum_op, prod_op, lhs, rhs, vars)| TermRInner::Contract {
                sum_op,
                prod_op,
                lhs,
                rhs,
                vars,
            }),
            preceded(
                open("subs"),
                cut_err(seq!(term(), _: comma, separated(1.., binding, comma), _: close)),
            )
            .map(|(arg, bindings)| TermRInner::Subs { arg, bindings }),
            preceded(
                open("var"),
                cut_err(seq!(Name::parser, _: comma, size, _: close)),
            )
            .map(|(name, size)| TermRInner::Var { name, size }),
            preceded(
                open("arange"),
                cut_err(seq!(Name::parser, _: comma, size, _: close)),
            )
            .map(|(name, size)| TermRInner::Arange { name, size }),
            (
                AssocOp::parser,
                preceded(
                    (multispace0, '(', multispace0),
                    cut_err(seq!(term(), _: comma, term(), _: close)),
                ),
            )
                .map(|(op, (lhs, rhs))| TermRInner::Binary { op, lhs, rhs }),
            number.map(TermRInner::Number),
            delimited(('(', multispace0), cut_err(term()), cut_err(close))
                .map(TermRInner::Brackets),
            Name::parser.map(TermRInner::Symbol),
        ))
        .context(StrContext::Label("term"))
        .context(StrContext::Expected(StrContextValue::Description("number")))
        .context(StrContext::Expected(StrContextValue::CharLiteral('(')))
        .context(StrContext::Expected(StrContextValue::Description(
            "identifier",
        )))
        .parse_next(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> TermR<Range<usize>> {
        TermR::parser.parse(LocatingSlice::new(src)).unwrap()
    }

    #[test]
    fn parses_nested_calls() {
        let t = parse("contract(logaddexp, add, add(var(i, 2), var(j, 3)), x, {j})");
        let TermRInner::Contract {
            sum_op,
            prod_op,
            lhs,
            rhs,
            vars,
        } = &t.inner
        else {
            panic!("expected a contraction, got {t:?}");
        };
        assert_eq!((*sum_op, *prod_op), (AssocOp::LogAddExp, AssocOp::Add));
        assert!(matches!(lhs.inner, TermRInner::Binary { op: AssocOp::Add, .. }));
        assert_eq!(rhs.inner, TermRInner::Symbol(Name::from("x")));
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].inner, Name::from("j"));
        assert_eq!(vars[0].span, 56..57);
    }

    #[test]
    fn operator_names_are_not_reserved() {
        assert_eq!(parse("max").inner, TermRInner::Symbol(Name::from("max")));
        assert_eq!(parse("maxi").inner, TermRInner::Symbol(Name::from("maxi")));
        assert!(matches!(
            parse("max(1, 2)").inner,
            TermRInner::Binary { op: AssocOp::Max, .. }
        ));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse("-2.5").inner, TermRInner::Number(-2.5));
        assert_eq!(parse("3").inner, TermRInner::Number(3.0));
    }

    #[test]
    fn unclosed_call_is_an_error() {
        assert!(TermR::<Range<usize>>::parser.parse(LocatingSlice::new("var(i, 3")).is_err());
        assert!(TermR::<Range<usize>>::parser.parse(LocatingSlice::new("reduce(add, x, {i)")).is_err());
    }

    #[test]
    fn prints_source_syntax() {
        let t = parse("subs(reduce(add, var(i,3), {i}), i = 2)");
        assert_eq!(
            t.to_doc().pretty(80).to_string(),
            "subs(reduce(add, var(i, 3), {i}), i = 2)"
        );
    }
}
