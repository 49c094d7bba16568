//! Raw syntax, as parsed from source text.

mod term;

pub use term::*;
