//! Helpers for parsing and pretty printing.

use std::{fmt, ops::Range};

use pretty::RcDoc;
use winnow::{
    LocatingSlice, ModalResult, Parser,
    ascii::{multispace0, till_line_ending},
    combinator::repeat,
    error::{StrContext, StrContextValue},
    token::take_while,
};

/// Trait for types which can be pretty-printed
pub trait ToDoc {
    /// Produce an `RcDoc` for pretty-printing.
    fn to_doc(&self) -> RcDoc<'_>;
}

/// Trait for types which can be parsed
pub trait HasParser: Sized {
    /// Parse an element of this type.
    fn parser(input: &mut LocatingSlice<&str>) -> ModalResult<Self>;
}

/// Wraps data of type `T` in a span of type `S`, locating it in the source text.
/// The span is ignored when printing.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned<S, T> {
    /// Wrapped data
    pub inner: T,
    /// Text span
    pub span: S,
}

impl<S, T: ToDoc> ToDoc for Spanned<S, T> {
    fn to_doc(&self) -> RcDoc<'_> {
        self.inner.to_doc()
    }
}

impl<T: HasParser> HasParser for Spanned<Range<usize>, T> {
    fn parser(input: &mut LocatingSlice<&str>) -> ModalResult<Self> {
        T::parser
            .with_span()
            .map(|(inner, span)| Spanned { inner, span })
            .parse_next(input)
    }
}

/// Parse any amount of whitespace and `//` line comments.
pub fn comment(input: &mut LocatingSlice<&str>) -> ModalResult<()> {
    (
        multispace0,
        repeat::<_, _, (), _, _>(0.., ("//", till_line_ending, multispace0).value(())),
    )
        .parse_next(input)?;
    Ok(())
}

/// The name of a variable (a tensor dimension) or of a `let` binding.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);

impl Name {
    /// Create a name from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Name(name.into())
    }

    /// The underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToDoc for Name {
    fn to_doc(&self) -> RcDoc<'_> {
        RcDoc::text(self.0.as_str())
    }
}

impl HasParser for Name {
    fn parser(input: &mut LocatingSlice<&str>) -> ModalResult<Self> {
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_')
            .map(|s: &str| Name(s.to_owned()))
            .context(StrContext::Label("identifier"))
            .context(StrContext::Expected(StrContextValue::Description(
                "alphanumeric string",
            )))
            .parse_next(input)
    }
}
