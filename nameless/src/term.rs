use std::cmp::Ordering;

use crate::printer::PrintConfig;

/// 1-based de Bruijn index: `1` refers to the nearest enclosing abstraction.
pub type Index = usize;

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Term {
    /// `n`
    Var(Index),
    /// `λ. t`
    Abs(Box<Term>),
    /// `t t`
    App(Box<Term>, Box<Term>),
}

impl Term {
    pub fn var(index: Index) -> Self {
        Term::Var(index)
    }

    pub fn abs(body: Term) -> Self {
        Term::Abs(body.into())
    }

    pub fn app(lhs: Term, rhs: Term) -> Self {
        Term::App(lhs.into(), rhs.into())
    }

    pub fn is_abs(&self) -> bool {
        matches!(self, Term::Abs(_))
    }

    /// `(λ. t) u`
    pub fn is_redex(&self) -> bool {
        matches!(self, Term::App(lhs, _) if lhs.is_abs())
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        match self {
            Term::Var(_) => 1,
            Term::Abs(body) => 1 + body.size(),
            Term::App(lhs, rhs) => 1 + lhs.size() + rhs.size(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Term::Var(_) => 1,
            Term::Abs(body) => 1 + body.depth(),
            Term::App(lhs, rhs) => 1 + lhs.depth().max(rhs.depth()),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(PrintConfig::default()))
    }
}

trait VarMapper {
    /// `depth` is the number of abstractions crossed since the traversal started.
    fn on_var(&mut self, depth: usize, index: Index) -> Term;
}

/// Rebuilds `term` bottom-up, reusing its boxes, with every variable replaced
/// by whatever `mapper` returns for it.
fn map_var(term: Term, mapper: &mut impl VarMapper, depth: usize) -> Term {
    match term {
        Term::Var(index) => mapper.on_var(depth, index),
        Term::Abs(mut body) => {
            *body = map_var(*body, mapper, depth + 1);
            Term::Abs(body)
        }
        Term::App(mut lhs, mut rhs) => {
            *lhs = map_var(*lhs, mapper, depth);
            *rhs = map_var(*rhs, mapper, depth);
            Term::App(lhs, rhs)
        }
    }
}

/// Adds `amount` to every variable that is free in `term`.
fn shift(term: Term, amount: usize) -> Term {
    struct M(usize);
    impl VarMapper for M {
        fn on_var(&mut self, depth: usize, index: Index) -> Term {
            Term::Var(if index > depth { index + self.0 } else { index })
        }
    }
    if amount == 0 {
        return term;
    }
    map_var(term, &mut M(amount), 0)
}

/// Computes `body[1 := replacement]` where `body` is the body of the
/// abstraction being eliminated.
///
/// Every occurrence of the eliminated variable receives its own copy of
/// `replacement`, with the copy's free variables lifted over the binders that
/// sit between the occurrence and the eliminated abstraction. Variables free
/// in `body` lose one level since their outermost binder is gone.
pub fn substitute(body: Term, replacement: Term) -> Term {
    struct M(Term);
    impl VarMapper for M {
        fn on_var(&mut self, depth: usize, index: Index) -> Term {
            match index.cmp(&depth) {
                Ordering::Equal => shift(self.0.clone(), depth - 1),
                Ordering::Greater => Term::Var(index - 1),
                Ordering::Less => Term::Var(index),
            }
        }
    }
    map_var(body, &mut M(replacement), 1)
}

/// Contracts the redex `(λ. body) arg` into `body[1 := arg]`.
///
/// # Panics
///
/// Panics if `redex` is not an application of an abstraction.
pub fn beta_step(redex: Term) -> Term {
    if let Term::App(lhs, rhs) = redex {
        if let Term::Abs(body) = *lhs {
            return substitute(*body, *rhs);
        }
    }
    panic!("beta_step called on a term that is not a redex")
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    macro_rules! var {
        ($n:expr) => {
            $crate::term::Term::var($n)
        };
    }
    macro_rules! abs {
        ($body:expr) => {
            $crate::term::Term::abs($body)
        };
    }
    macro_rules! app {
        ($lhs:expr, $rhs:expr) => {
            $crate::term::Term::app($lhs, $rhs)
        };
    }
    pub(crate) use {abs, app, var};

    pub(crate) fn succ() -> Term {
        abs!(abs!(abs!(app!(var!(2), app!(app!(var!(3), var!(2)), var!(1))))))
    }

    pub(crate) fn pred() -> Term {
        abs!(abs!(abs!(app!(
            app!(
                app!(var!(3), abs!(abs!(app!(var!(1), app!(var!(2), var!(4)))))),
                abs!(var!(2))
            ),
            abs!(var!(1))
        ))))
    }

    #[test]
    fn test_equality() {
        let a = app!(abs!(var!(1)), var!(2));
        let b = app!(abs!(var!(1)), var!(2));
        let c = app!(abs!(var!(1)), var!(2));
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(b, c);
        assert_eq!(a, c);
        assert_ne!(a, app!(abs!(var!(1)), var!(1)));
        assert_ne!(var!(1), abs!(var!(1)));
        assert_ne!(app!(var!(1), var!(2)), app!(var!(2), var!(1)));
    }

    #[test]
    fn test_copy_is_independent() {
        let original = succ();
        let copy = original.clone();
        assert_eq!(copy, original);

        let rewritten = beta_step(app!(copy, abs!(abs!(var!(1)))));
        assert_ne!(rewritten, original);
        assert_eq!(original, succ());
    }

    #[test]
    fn test_size_and_depth() {
        assert_eq!(var!(1).size(), 1);
        assert_eq!(succ().size(), 10);
        assert_eq!(succ().depth(), 7);
        assert!(app!(abs!(var!(1)), var!(1)).is_redex());
        assert!(!app!(var!(1), abs!(var!(1))).is_redex());
    }

    #[test]
    fn test_substitute_replaces_bound_variable() {
        assert_eq!(substitute(var!(1), var!(5)), var!(5));
        assert_eq!(
            substitute(app!(var!(1), var!(1)), abs!(var!(1))),
            app!(abs!(var!(1)), abs!(var!(1)))
        );
    }

    #[test]
    fn test_substitute_lifts_replacement_under_binders() {
        // (λ. λ. 2) 3  ->  λ. 4
        assert_eq!(substitute(abs!(var!(2)), var!(3)), abs!(var!(4)));
        // bound variables of the replacement stay put
        assert_eq!(
            substitute(abs!(abs!(var!(3))), abs!(app!(var!(1), var!(2)))),
            abs!(abs!(abs!(app!(var!(1), var!(4)))))
        );
    }

    #[test]
    fn test_substitute_lowers_free_variables() {
        assert_eq!(substitute(var!(2), var!(1)), var!(1));
        assert_eq!(
            substitute(abs!(app!(var!(1), var!(3))), var!(7)),
            abs!(app!(var!(1), var!(2)))
        );
    }

    #[test]
    fn test_beta_step() {
        assert_eq!(
            beta_step(app!(abs!(abs!(app!(var!(1), var!(2)))), var!(5))),
            abs!(app!(var!(1), var!(6)))
        );
        assert_eq!(beta_step(app!(abs!(var!(1)), succ())), succ());
    }

    #[test]
    #[should_panic]
    fn test_beta_step_on_non_redex() {
        beta_step(app!(var!(1), var!(2)));
    }

    #[test]
    #[should_panic]
    fn test_beta_step_on_abstraction() {
        beta_step(abs!(var!(1)));
    }
}
