use thiserror::Error;
use tracing::{debug, trace};

use crate::term::{beta_step, Term};

#[derive(PartialEq, Eq, Clone, Copy, derive_more::Display, Debug)]
pub enum Strategy {
    /// Weak head reduction; never reduces under an abstraction or inside an argument.
    #[display(fmt = "call-by-name")]
    CallByName,
    /// Leftmost-outermost full reduction.
    #[display(fmt = "normal order")]
    NormalOrder,
    /// Innermost-first full reduction.
    #[display(fmt = "applicative order")]
    ApplicativeOrder,
}

#[derive(Debug, Error)]
#[error("reduction did not finish within {limit} beta steps")]
pub struct OutOfFuel {
    pub limit: usize,
}

/// Runs the reduction strategies in place and counts contracted redexes.
///
/// Without fuel a run either finishes or never returns. With fuel the run
/// stops before the first contraction that would exceed the budget; the term
/// is left well-formed and partially reduced.
#[derive(Default, Debug)]
pub struct Reducer {
    fuel: Option<usize>,
    steps: usize,
}

impl Reducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fuel(limit: usize) -> Self {
        Self {
            fuel: Some(limit),
            steps: 0,
        }
    }

    /// Redexes contracted so far, over every run of this reducer.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn run(&mut self, strategy: Strategy, term: &mut Term) -> Result<(), OutOfFuel> {
        let before = self.steps;
        let result = match strategy {
            Strategy::CallByName => self.call_by_name(term),
            Strategy::NormalOrder => self.normal_order(term),
            Strategy::ApplicativeOrder => self.applicative_order(term),
        };
        debug!(
            %strategy,
            steps = self.steps - before,
            finished = result.is_ok(),
            "reduction stopped"
        );
        result
    }

    fn contract(&mut self, term: &mut Term) -> Result<(), OutOfFuel> {
        if let Some(limit) = self.fuel {
            if self.steps >= limit {
                return Err(OutOfFuel { limit });
            }
        }
        let redex = std::mem::replace(term, Term::Var(0));
        *term = beta_step(redex);
        self.steps += 1;
        trace!(step = self.steps, size = term.size(), "contracted redex");
        Ok(())
    }

    pub fn call_by_name(&mut self, term: &mut Term) -> Result<(), OutOfFuel> {
        while let Term::App(lhs, _) = &mut *term {
            self.call_by_name(lhs)?;
            if !lhs.is_abs() {
                break;
            }
            self.contract(term)?;
        }
        Ok(())
    }

    pub fn normal_order(&mut self, term: &mut Term) -> Result<(), OutOfFuel> {
        loop {
            match &mut *term {
                Term::Var(_) => return Ok(()),
                Term::Abs(body) => return self.normal_order(body),
                Term::App(lhs, rhs) => {
                    self.call_by_name(lhs)?;
                    if !lhs.is_abs() {
                        self.normal_order(lhs)?;
                        return self.normal_order(rhs);
                    }
                }
            }
            self.contract(term)?;
        }
    }

    pub fn applicative_order(&mut self, term: &mut Term) -> Result<(), OutOfFuel> {
        loop {
            match &mut *term {
                Term::Var(_) => return Ok(()),
                Term::Abs(body) => return self.applicative_order(body),
                Term::App(lhs, rhs) => {
                    self.applicative_order(lhs)?;
                    self.applicative_order(rhs)?;
                    if !lhs.is_abs() {
                        return Ok(());
                    }
                }
            }
            self.contract(term)?;
        }
    }
}

/// Reduces `term` with `strategy` and no step limit. May not return.
pub fn reduce(strategy: Strategy, mut term: Term) -> Term {
    Reducer::new()
        .run(strategy, &mut term)
        .expect("a reducer without fuel never runs out of it");
    term
}

pub fn call_by_name(term: Term) -> Term {
    reduce(Strategy::CallByName, term)
}

pub fn normal_order(term: Term) -> Term {
    reduce(Strategy::NormalOrder, term)
}

pub fn applicative_order(term: Term) -> Term {
    reduce(Strategy::ApplicativeOrder, term)
}
