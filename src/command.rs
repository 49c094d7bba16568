//! Whole programs: a list of `let` bindings followed by a term.

use std::ops::Range;

use winnow::{
    LocatingSlice, ModalResult, Parser,
    ascii::{multispace0, multispace1},
    combinator::{cut_err, preceded, repeat, seq, terminated},
    error::{StrContext, StrContextValue},
};

use crate::{
    interpreter::Interpreter,
    raw_syntax::{NameR, TermR},
    term::Term,
    text::{HasParser, comment},
    typecheck::{CheckError, Env},
};

/// A parsed program.
#[derive(Clone, Debug)]
pub struct Command<S> {
    /// `let name = term,` bindings, in order
    pub bindings: Vec<(NameR<S>, TermR<S>)>,
    /// The final term
    pub term: TermR<S>,
}

impl<S: Clone> Command<S> {
    /// Check every binding in order, then the final term. Later bindings
    /// shadow earlier ones.
    pub fn check(&self, interp: &Interpreter) -> Result<(Env, Term), CheckError<S>> {
        let mut env = Env::default();
        for (name, tm) in &self.bindings {
            let t = tm.check(&env, interp)?;
            env.0.insert(name.inner.clone(), t);
        }
        let tm = self.term.check(&env, interp)?;
        Ok((env, tm))
    }
}

fn binding(
    input: &mut LocatingSlice<&str>,
) -> ModalResult<(NameR<Range<usize>>, TermR<Range<usize>>)> {
    preceded(
        ("let", multispace1),
        cut_err(seq!(
            NameR::parser,
            _: (multispace0, '=', multispace0)
                .context(StrContext::Expected(StrContextValue::CharLiteral('='))),
            TermR::parser,
            _: (multispace0, ',')
                .context(StrContext::Expected(StrContextValue::CharLiteral(','))),
            _: comment
        )),
    )
    .parse_next(input)
}

impl HasParser for Command<Range<usize>> {
    fn parser(input: &mut LocatingSlice<&str>) -> ModalResult<Self> {
        preceded(
            comment,
            (repeat(0.., binding), terminated(TermR::parser, comment)),
        )
        .map(|(bindings, term)| Command { bindings, term })
        .parse_next(input)
    }
}
