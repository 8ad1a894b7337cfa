//! Untyped lambda calculus over de Bruijn indices: terms, capture-avoiding
//! substitution and three beta-reduction strategies, plus the parsers and
//! printers for the classic and de Bruijn notations.

pub mod parser;
pub mod printer;
pub mod reduce;
pub mod term;

pub use reduce::{reduce, Reducer, Strategy};
pub use term::Term;
