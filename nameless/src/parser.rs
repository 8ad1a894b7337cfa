use chumsky::prelude::*;
use thiserror::Error;

use crate::{
    printer::Notation,
    term::{Index, Term},
};

pub type Span = std::ops::Range<usize>;
#[derive(derive_more::Deref, Clone, Debug)]
pub struct Spanned<T>(#[deref] T, Span);
impl<T> Spanned<T> {
    pub fn value(&self) -> &T {
        &self.0
    }
    pub fn span(&self) -> Span {
        self.1.clone()
    }
}

pub trait SimpleParser<I: Clone + std::hash::Hash, O>: Parser<I, O, Error = Simple<I>> {}
impl<I: Clone + std::hash::Hash, O, T> SimpleParser<I, O> for T where
    T: Parser<I, O, Error = Simple<I>>
{
}

#[derive(PartialEq, Eq, Hash, Clone, derive_more::Display, Debug)]
pub enum Token {
    #[display(fmt = "(")]
    LParen,
    #[display(fmt = ")")]
    RParen,
    /// `\` or `λ`
    #[display(fmt = "{}", "_0")]
    Lambda(char),
    #[display(fmt = ".")]
    Dot,
    #[display(fmt = "{}", "_0")]
    Index(String),
    #[display(fmt = "{}", "_0")]
    Ident(String),
}

fn is_delimiter(c: &char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '\\' | 'λ' | '.' | ';')
}

pub fn lexer() -> impl SimpleParser<char, Vec<Spanned<Token>>> {
    let ident = filter(|c: &char| !is_delimiter(c) && !c.is_ascii_digit())
        .chain(filter(|c: &char| !is_delimiter(c)).repeated())
        .collect::<String>()
        .map(Token::Ident);
    let token = choice((
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        one_of("\\λ").map(Token::Lambda),
        just('.').to(Token::Dot),
        text::digits(10).map(Token::Index),
        ident,
    ));
    // `;` comments run to the end of the line
    let comment = just(';')
        .then(filter(|c: &char| *c != '\n').repeated())
        .ignored();
    let skip = filter(|c: &char| c.is_whitespace())
        .ignored()
        .or(comment)
        .repeated();
    skip.clone()
        .ignore_then(token.map_with_span(Spanned).then_ignore(skip).repeated())
        .then_ignore(end())
}

#[derive(PartialEq, Eq, Clone, Copy, derive_more::Display, Debug)]
pub enum Cause {
    #[display(fmt = "unknown error")]
    Unknown,
    #[display(fmt = "unexpected token")]
    UnexpectedToken,
    #[display(fmt = "unmatched parenthesis")]
    UnmatchedParenthesis,
    #[display(fmt = "unbound variable")]
    UnboundVariable,
}

/// A parse failure located at the token that caused it.
///
/// `line` and `column` are 1-based and count characters. `span` is the
/// character range of `lexeme`; at the end of the input `lexeme` is empty
/// and `span` covers the one character slot just past the last character.
#[derive(PartialEq, Eq, Clone, Debug, Error)]
#[error("{cause} {}", describe(.lexeme))]
pub struct ParseError {
    pub cause: Cause,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    pub span: Span,
}

fn describe(lexeme: &str) -> String {
    if lexeme.is_empty() {
        "at end of input".to_string()
    } else {
        format!("`{lexeme}`")
    }
}

impl ParseError {
    fn new(source: &str, cause: Cause, lexeme: String, span: Span) -> Self {
        let (line, column) = source
            .chars()
            .take(span.start)
            .fold((1, 1), |(line, column), c| {
                if c == '\n' {
                    (line + 1, 1)
                } else {
                    (line, column + 1)
                }
            });
        Self {
            cause,
            lexeme,
            line,
            column,
            span,
        }
    }
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Recursive descent over the token stream.
///
/// Application is juxtaposition and associates to the left; an abstraction
/// body extends as far to the right as possible.
struct TermParser<'a> {
    source: &'a str,
    notation: Notation,
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    paren_depth: usize,
    /// Names bound by the enclosing classic abstractions, innermost last.
    binders: Vec<String>,
}

impl<'a> TermParser<'a> {
    fn new(source: &'a str, notation: Notation, tokens: Vec<Spanned<Token>>) -> Self {
        Self {
            source,
            notation,
            tokens,
            pos: 0,
            paren_depth: 0,
            binders: vec![],
        }
    }

    fn current(&self) -> Option<Spanned<Token>> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error(&self, cause: Cause, token: Option<&Spanned<Token>>) -> ParseError {
        match token {
            Some(token) => {
                ParseError::new(self.source, cause, token.value().to_string(), token.span())
            }
            None => {
                let len = self.source.chars().count();
                ParseError::new(self.source, cause, String::new(), len..len + 1)
            }
        }
    }

    /// Error at the current token, or at the end of the input.
    fn unexpected(&self) -> ParseError {
        self.error(Cause::UnexpectedToken, self.current().as_ref())
    }

    /// Parses terms up to the closing parenthesis of the current group, or to
    /// the end of the input, and folds them into a left-nested application.
    fn sequence(&mut self) -> Result<Option<Term>> {
        let mut term: Option<Term> = None;
        while let Some(token) = self.current() {
            let next = match token.value() {
                Token::RParen if self.paren_depth == 0 => {
                    return Err(self.error(Cause::UnmatchedParenthesis, Some(&token)))
                }
                Token::RParen => break,
                Token::LParen => self.group(&token)?,
                Token::Lambda(_) => self.abstraction()?,
                Token::Index(digits) => self.index(&token, digits)?,
                Token::Ident(name) => self.variable(&token, name)?,
                Token::Dot => return Err(self.error(Cause::UnexpectedToken, Some(&token))),
            };
            term = Some(match term {
                Some(lhs) => Term::app(lhs, next),
                None => next,
            });
        }
        Ok(term)
    }

    fn required(&mut self) -> Result<Term> {
        match self.sequence()? {
            Some(term) => Ok(term),
            None => Err(self.unexpected()),
        }
    }

    fn group(&mut self, open: &Spanned<Token>) -> Result<Term> {
        self.advance();
        self.paren_depth += 1;
        let inner = self.sequence()?;
        self.paren_depth -= 1;
        match self.current() {
            Some(close) if close.value() == &Token::RParen => {
                self.advance();
                inner.ok_or_else(|| self.error(Cause::UnexpectedToken, Some(&close)))
            }
            _ => Err(self.error(Cause::UnmatchedParenthesis, Some(open))),
        }
    }

    fn abstraction(&mut self) -> Result<Term> {
        self.advance();
        match self.notation {
            Notation::DeBruijn => Ok(Term::abs(self.required()?)),
            Notation::Classic => {
                let name = match self.current().as_deref() {
                    Some(Token::Ident(name)) => name.clone(),
                    _ => return Err(self.unexpected()),
                };
                self.advance();
                if self.current().as_deref() != Some(&Token::Dot) {
                    return Err(self.unexpected());
                }
                self.advance();
                self.binders.push(name);
                let body = self.required()?;
                self.binders.pop();
                Ok(Term::abs(body))
            }
        }
    }

    fn index(&mut self, token: &Spanned<Token>, digits: &str) -> Result<Term> {
        if self.notation != Notation::DeBruijn {
            return Err(self.error(Cause::UnexpectedToken, Some(token)));
        }
        // capped at `u32::MAX` so shifting during reduction cannot overflow
        match digits.parse::<u32>() {
            Ok(index) if index > 0 => {
                self.advance();
                Ok(Term::var(index as Index))
            }
            _ => Err(self.error(Cause::UnexpectedToken, Some(token))),
        }
    }

    fn variable(&mut self, token: &Spanned<Token>, name: &str) -> Result<Term> {
        if self.notation != Notation::Classic {
            return Err(self.error(Cause::UnexpectedToken, Some(token)));
        }
        let index = self
            .binders
            .iter()
            .rev()
            .position(|binder| binder == name)
            .ok_or_else(|| self.error(Cause::UnboundVariable, Some(token)))?;
        self.advance();
        Ok(Term::var(index + 1))
    }
}

pub fn parse(source: &str, notation: Notation) -> Result<Term> {
    let tokens = lexer().parse(source).map_err(|es| {
        let e = es
            .into_iter()
            .next()
            .expect("chumsky reports at least one error on failure");
        let lexeme = e.found().map(char::to_string).unwrap_or_default();
        ParseError::new(source, Cause::Unknown, lexeme, e.span())
    })?;
    let mut parser = TermParser::new(source, notation, tokens);
    parser.required()
}

pub fn parse_classic(source: &str) -> Result<Term> {
    parse(source, Notation::Classic)
}

pub fn parse_de_bruijn(source: &str) -> Result<Term> {
    parse(source, Notation::DeBruijn)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        printer::{Glyph, PrintConfig},
        term::test::{abs, app, succ, var},
    };

    fn lex(s: &str) -> Result<Vec<Token>, Vec<Simple<char>>> {
        Ok(lexer()
            .parse(s)?
            .iter()
            .map(Spanned::value)
            .cloned()
            .collect::<Vec<_>>())
    }

    fn cause_at(result: Result<Term>) -> (Cause, usize, usize) {
        let e = result.unwrap_err();
        (e.cause, e.line, e.column)
    }

    #[test]
    fn test_lexer() {
        assert_eq!(
            lex("\\x.x1").unwrap(),
            vec![
                Token::Lambda('\\'),
                Token::Ident("x".into()),
                Token::Dot,
                Token::Ident("x1".into())
            ]
        );
        assert_eq!(
            lex("λλ12 (3)").unwrap(),
            vec![
                Token::Lambda('λ'),
                Token::Lambda('λ'),
                Token::Index("12".into()),
                Token::LParen,
                Token::Index("3".into()),
                Token::RParen
            ]
        );
        assert_eq!(
            lex("  ; a comment (\n 1 ; another\n").unwrap(),
            vec![Token::Index("1".into())]
        );
        assert_eq!(lex("").unwrap(), vec![]);
    }

    #[test]
    fn test_lexer_spans() {
        let tokens = lexer().parse("(\\1)\n x").unwrap();
        let spans = tokens.iter().map(Spanned::span).collect::<Vec<_>>();
        assert_eq!(spans, vec![0..1, 1..2, 2..3, 3..4, 6..7]);
    }

    #[test]
    fn test_parse_de_bruijn() {
        assert_eq!(parse_de_bruijn("1").unwrap(), var!(1));
        assert_eq!(parse_de_bruijn("\\\\1").unwrap(), abs!(abs!(var!(1))));
        assert_eq!(
            parse_de_bruijn("(\\\\1) (\\1)").unwrap(),
            app!(abs!(abs!(var!(1))), abs!(var!(1)))
        );
        assert_eq!(
            parse_de_bruijn("(\\\\1) (\\1) (\\1)").unwrap(),
            app!(app!(abs!(abs!(var!(1))), abs!(var!(1))), abs!(var!(1)))
        );
        assert_eq!(
            parse_de_bruijn("(\\\\1) ((\\1) (\\1))").unwrap(),
            app!(abs!(abs!(var!(1))), app!(abs!(var!(1)), abs!(var!(1))))
        );
        assert_eq!(parse_de_bruijn("λλλ2 (3 2 1)").unwrap(), succ());
    }

    #[test]
    fn test_parse_classic() {
        assert_eq!(parse_classic("\\x.\\y.x").unwrap(), abs!(abs!(var!(2))));
        assert_eq!(
            parse_classic("λn.λf.λx.f (n f x)").unwrap(),
            succ()
        );
        // shadowing resolves to the innermost binder
        assert_eq!(
            parse_classic("\\x.\\x.x").unwrap(),
            abs!(abs!(var!(1)))
        );
        assert_eq!(
            parse_classic("(\\x.x) \\y.y y").unwrap(),
            app!(abs!(var!(1)), abs!(app!(var!(1), var!(1))))
        );
    }

    #[test]
    fn test_unmatched_parenthesis() {
        for parse in [parse_de_bruijn, parse_classic] {
            assert_eq!(cause_at(parse("(")), (Cause::UnmatchedParenthesis, 1, 1));
            assert_eq!(cause_at(parse(")")), (Cause::UnmatchedParenthesis, 1, 1));
        }
        assert_eq!(
            cause_at(parse_de_bruijn("((\\1)))")),
            (Cause::UnmatchedParenthesis, 1, 7)
        );
        assert_eq!(
            cause_at(parse_de_bruijn("\\1\n  (1")),
            (Cause::UnmatchedParenthesis, 2, 3)
        );
    }

    #[test]
    fn test_unbound_variable() {
        let e = parse_classic("\\x.\n x y").unwrap_err();
        assert_eq!(e.cause, Cause::UnboundVariable);
        assert_eq!((e.line, e.column), (2, 4));
        assert_eq!(e.lexeme, "y");
        assert_eq!(e.span, 7..8);
        assert_eq!(e.to_string(), "unbound variable `y`");
    }

    #[test]
    fn test_unexpected_token() {
        assert_eq!(
            cause_at(parse_classic("\\.x")),
            (Cause::UnexpectedToken, 1, 2)
        );
        assert_eq!(
            cause_at(parse_classic("\\x x")),
            (Cause::UnexpectedToken, 1, 4)
        );
        assert_eq!(cause_at(parse_classic("1")), (Cause::UnexpectedToken, 1, 1));
        assert_eq!(cause_at(parse_de_bruijn("x")), (Cause::UnexpectedToken, 1, 1));
        assert_eq!(cause_at(parse_de_bruijn("0")), (Cause::UnexpectedToken, 1, 1));
        assert_eq!(
            cause_at(parse_de_bruijn("\\4294967296")),
            (Cause::UnexpectedToken, 1, 2)
        );
        assert_eq!(
            cause_at(parse_de_bruijn(&format!("(\\\\2) {}", usize::MAX))),
            (Cause::UnexpectedToken, 1, 7)
        );
        assert_eq!(cause_at(parse_de_bruijn("1 . 2")), (Cause::UnexpectedToken, 1, 3));
        assert_eq!(cause_at(parse_de_bruijn("()")), (Cause::UnexpectedToken, 1, 2));
    }

    #[test]
    fn test_largest_index() {
        let term = parse_de_bruijn("(\\\\2) 4294967295").unwrap();
        assert_eq!(
            crate::reduce::normal_order(term),
            abs!(var!(u32::MAX as Index + 1))
        );
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let e = parse_de_bruijn("  ").unwrap_err();
        assert_eq!(e.cause, Cause::UnexpectedToken);
        assert_eq!((e.line, e.column), (1, 3));
        assert_eq!(e.span, 2..3);
        assert_eq!(e.to_string(), "unexpected token at end of input");

        let e = parse_classic("\\x.").unwrap_err();
        assert_eq!(e.cause, Cause::UnexpectedToken);
        assert_eq!(e.lexeme, "");
        assert_eq!(
            cause_at(parse_de_bruijn("(\\)")),
            (Cause::UnexpectedToken, 1, 3)
        );
    }

    #[test]
    fn test_round_trip() {
        for glyph in [Glyph::Unicode, Glyph::Ascii] {
            for notation in [Notation::Classic, Notation::DeBruijn] {
                let printed = succ().display(PrintConfig::new(notation, glyph)).to_string();
                assert_eq!(parse(&printed, notation).unwrap(), succ());
            }
        }
    }
}
