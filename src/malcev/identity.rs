//! Term conditions written as argument patterns.
//!
//! An [`Equation`] `t(v[p0], ..., v[pk-1]) = v[r]` uses small integers for
//! identity variables (`0 = x`, `1 = y`, ...). Substituting every assignment
//! of the identity variables into every pattern gives the finite set of
//! argument tuples the condition talks about, the [`Domain`]. A term satisfies
//! the condition exactly when its restriction to the domain equals the
//! condition's target vector.

use std::fmt;

use indexmap::IndexSet;

use crate::algebra::AlgebraView;
use crate::error::{MalcevError, Result};
use crate::term::eval::Evaluator;
use crate::term::{variable_name, TermArena, TermId};
use crate::tuples::Tuples;

/// `t(v[pattern[0]], ..., v[pattern[k-1]]) = v[rhs]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equation {
    pub pattern: Vec<usize>,
    pub rhs: usize,
}

impl Equation {
    pub fn new(pattern: impl Into<Vec<usize>>, rhs: usize) -> Self {
        Self {
            pattern: pattern.into(),
            rhs,
        }
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.pattern.iter().map(|&v| variable_name(v)).collect();
        write!(f, "t({}) = {}", args.join(","), variable_name(self.rhs))
    }
}

/// A condition on a single term of fixed arity.
#[derive(Clone, Debug)]
pub struct Condition {
    pub name: String,
    pub arity: usize,
    /// Number of identity variables
    pub vars: usize,
    pub equations: Vec<Equation>,
}

impl Condition {
    /// `m(x,x,y) = m(x,y,x) = m(y,x,x) = x`
    pub fn majority() -> Self {
        Self {
            name: "majority".to_string(),
            arity: 3,
            vars: 2,
            equations: vec![
                Equation::new([0, 0, 1], 0),
                Equation::new([0, 1, 0], 0),
                Equation::new([1, 0, 0], 0),
            ],
        }
    }

    /// `m(x,y,y) = m(y,x,y) = m(y,y,x) = x`
    pub fn minority() -> Self {
        Self {
            name: "minority".to_string(),
            arity: 3,
            vars: 2,
            equations: vec![
                Equation::new([0, 1, 1], 0),
                Equation::new([1, 0, 1], 0),
                Equation::new([1, 1, 0], 0),
            ],
        }
    }

    /// `p(x,y,y) = x`, `p(x,x,y) = y`
    pub fn maltsev() -> Self {
        Self {
            name: "Maltsev".to_string(),
            arity: 3,
            vars: 2,
            equations: vec![Equation::new([0, 1, 1], 0), Equation::new([0, 0, 1], 1)],
        }
    }

    /// `p(x,x,y) = y`, `p(x,y,x) = x`, `p(y,x,x) = y`
    pub fn pixley() -> Self {
        Self {
            name: "Pixley".to_string(),
            arity: 3,
            vars: 2,
            equations: vec![
                Equation::new([0, 0, 1], 1),
                Equation::new([0, 1, 0], 0),
                Equation::new([1, 0, 0], 1),
            ],
        }
    }

    /// `t(y,x,...,x) = t(x,y,x,...,x) = ... = t(x,...,x,y) = x`, `k ≥ 3`.
    pub fn near_unanimity(arity: usize) -> Result<Self> {
        if arity < 3 {
            return Err(MalcevError::InvalidArgument(format!(
                "near-unanimity terms need arity at least 3, got {arity}"
            )));
        }
        let equations = (0..arity)
            .map(|odd| {
                let pattern = (0..arity).map(|i| usize::from(i == odd)).collect::<Vec<_>>();
                Equation::new(pattern, 0)
            })
            .collect();
        Ok(Self {
            name: format!("NU({arity})"),
            arity,
            vars: 2,
            equations,
        })
    }

    pub fn patterns(&self) -> Vec<&[usize]> {
        self.equations.iter().map(|e| e.pattern.as_slice()).collect()
    }

    /// Target values on `domain`, or `None` if two equations demand
    /// different values at the same tuple (no term can satisfy them).
    pub fn target(&self, domain: &Domain, n: usize) -> Option<Vec<usize>> {
        let mut target = vec![usize::MAX; domain.len()];
        let mut tuple = Vec::with_capacity(self.arity);
        let mut assignments = Tuples::new(n, self.vars);
        while let Some(v) = assignments.advance() {
            for eq in &self.equations {
                tuple.clear();
                tuple.extend(eq.pattern.iter().map(|&p| v[p]));
                let idx = domain.index_of(&tuple)?;
                let want = v[eq.rhs];
                if target[idx] == usize::MAX {
                    target[idx] = want;
                } else if target[idx] != want {
                    return None;
                }
            }
        }
        Some(target)
    }

    /// Check `term` against every equation under every assignment,
    /// stopping at the first counterexample.
    pub fn holds<A: AlgebraView + ?Sized>(
        &self,
        algebra: &A,
        arena: &TermArena,
        term: TermId,
    ) -> Result<bool> {
        let mut ev = Evaluator::new(algebra, arena);
        let compiled = ev.compile(term)?;
        let mut tuple = Vec::with_capacity(self.arity);
        let mut assignments = Tuples::new(algebra.cardinality(), self.vars);
        while let Some(v) = assignments.advance() {
            for eq in &self.equations {
                tuple.clear();
                tuple.extend(eq.pattern.iter().map(|&p| v[p]));
                if ev.run(&compiled, &tuple)? != v[eq.rhs] {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eqs: Vec<String> = self.equations.iter().map(ToString::to_string).collect();
        write!(f, "{}: {}", self.name, eqs.join(", "))
    }
}

/// The argument tuples a set of patterns reaches, in discovery order.
#[derive(Clone, Debug)]
pub struct Domain {
    arity: usize,
    points: IndexSet<Box<[usize]>>,
}

impl Domain {
    /// Instantiate `patterns` (each of length `arity`, over `vars` identity
    /// variables) with every assignment into `0..n`.
    pub fn from_patterns(n: usize, arity: usize, vars: usize, patterns: &[&[usize]]) -> Self {
        let mut points = IndexSet::new();
        let mut assignments = Tuples::new(n, vars);
        while let Some(v) = assignments.advance() {
            for pattern in patterns {
                let point: Box<[usize]> = pattern.iter().map(|&p| v[p]).collect();
                points.insert(point);
            }
        }
        Self { arity, points }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn index_of(&self, point: &[usize]) -> Option<usize> {
        self.points.get_index_of(point)
    }

    pub fn point(&self, i: usize) -> &[usize] {
        &self.points[i]
    }

    pub fn points(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.points.iter().map(|p| &**p)
    }

    /// Restricted table of the `i`-th projection
    pub fn projection(&self, i: usize) -> Vec<usize> {
        self.points.iter().map(|p| p[i]).collect()
    }
}
