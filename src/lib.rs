//! Symbolic sum-product contractions over named tensor dimensions.
//!
//! A contraction reduces the pointwise product of two terms over a set of
//! variables, e.g. a matrix product is `contract(add, mul, A, B, {j})`. Any
//! commutative semiring-like operator pair can be used: `(logaddexp, add)`
//! gives log-space matrix products, `(max, add)` tropical ones.
//!
//! Construction is where the work happens. Variables that only one operand
//! depends on are reduced inside that operand before the operands are ever
//! joined, and only the balanced remainder reaches a base rule (or, under a
//! lazy [`Interpreter`](interpreter::Interpreter), becomes a node that can be
//! substituted into and evaluated later).
//!
//! ## Running
//!
//! A program of `let` bindings followed by a term can be run using:
//!
//! ```bash
//! cargo run -- <FILENAME>
//! ```
//!
//! or passed in through stdin. For all options see:
//! ```bash
//! cargo run -- --help
//! ```

pub mod command;
pub mod contract;
pub mod domain;
pub mod error;
pub mod hook;
pub mod interpreter;
pub mod ops;
pub mod raw_syntax;
pub mod tensor;
pub mod term;
pub mod text;
pub mod typecheck;
