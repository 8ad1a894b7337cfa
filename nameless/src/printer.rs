use std::fmt::{self, Write as _};

use crate::term::{Index, Term};

#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub enum Notation {
    /// `λa.λb.a b`
    #[default]
    Classic,
    /// `λλ2 1`
    DeBruijn,
}

#[derive(PartialEq, Eq, Clone, Copy, Default, derive_more::Display, Debug)]
pub enum Glyph {
    #[default]
    #[display(fmt = "λ")]
    Unicode,
    #[display(fmt = "\\")]
    Ascii,
}

#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub struct PrintConfig {
    pub notation: Notation,
    pub glyph: Glyph,
}

impl PrintConfig {
    pub fn new(notation: Notation, glyph: Glyph) -> Self {
        Self { notation, glyph }
    }
}

/// Where a subterm sits relative to its parent; decides the parentheses.
#[derive(PartialEq, Eq, Clone, Copy)]
enum Position {
    /// Whole term or abstraction body.
    Open,
    /// Left operand of an application.
    Function,
    /// Right operand of an application.
    Argument,
}

pub struct Display<'a> {
    term: &'a Term,
    config: PrintConfig,
}

impl Term {
    pub fn display(&self, config: PrintConfig) -> Display<'_> {
        Display { term: self, config }
    }
}

/// Name of the variable introduced by the abstraction at `depth`.
fn binder_name(depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let letter = char::from(b'a' + (depth % 26) as u8);
    f.write_char(letter)?;
    if depth >= 26 {
        write!(f, "{}", depth / 26)?;
    }
    Ok(())
}

fn variable_name(depth: usize, index: Index, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if depth >= index {
        binder_name(depth - index, f)
    } else {
        binder_name(index - 1, f)
    }
}

impl fmt::Display for Display<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fmt_rec(
            term: &Term,
            config: PrintConfig,
            position: Position,
            depth: usize,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            match term {
                Term::Var(index) => match config.notation {
                    Notation::Classic => variable_name(depth, *index, f),
                    Notation::DeBruijn => write!(f, "{index}"),
                },
                Term::Abs(body) => {
                    let parenthesize = position != Position::Open;
                    if parenthesize {
                        f.write_char('(')?;
                    }
                    write!(f, "{}", config.glyph)?;
                    if config.notation == Notation::Classic {
                        binder_name(depth, f)?;
                        f.write_char('.')?;
                    }
                    fmt_rec(body, config, Position::Open, depth + 1, f)?;
                    if parenthesize {
                        f.write_char(')')?;
                    }
                    Ok(())
                }
                Term::App(lhs, rhs) => {
                    let parenthesize = position == Position::Argument;
                    if parenthesize {
                        f.write_char('(')?;
                    }
                    fmt_rec(lhs, config, Position::Function, depth, f)?;
                    f.write_char(' ')?;
                    fmt_rec(rhs, config, Position::Argument, depth, f)?;
                    if parenthesize {
                        f.write_char(')')?;
                    }
                    Ok(())
                }
            }
        }
        fmt_rec(self.term, self.config, Position::Open, 0, f)
    }
}
