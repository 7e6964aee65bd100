//! Evaluating terms in a finite algebra.
//!
//! A term is first compiled into a flat list of steps, one per distinct DAG
//! node in bottom-up order; evaluation then fills one slot per step, so shared
//! subterms are computed once per assignment and nothing recurses.

use tracing::trace;

use super::{TermArena, TermId, TermNode};
use crate::algebra::AlgebraView;
use crate::error::{MalcevError, Result};
use crate::tuples::Tuples;

#[derive(Clone, Debug)]
enum Step {
    Var(usize),
    Apply { op: usize, args: Box<[usize]> },
}

/// A term resolved against one algebra's operation list.
#[derive(Clone, Debug)]
pub struct CompiledTerm {
    steps: Vec<Step>,
    /// One more than the largest variable index, 0 for ground terms
    arity: usize,
}

impl CompiledTerm {
    /// Number of variables an assignment must cover
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Evaluate under `assignment`, using `slots` as scratch space.
    pub fn run<A: AlgebraView + ?Sized>(
        &self,
        algebra: &A,
        assignment: &[usize],
        slots: &mut Vec<usize>,
    ) -> Result<usize> {
        let n = algebra.cardinality();
        slots.clear();
        let mut args = Vec::new();
        for step in &self.steps {
            let value = match step {
                Step::Var(i) => {
                    let v = *assignment.get(*i).ok_or(MalcevError::MissingVariable(*i))?;
                    if v >= n {
                        return Err(MalcevError::element(v, n));
                    }
                    v
                }
                Step::Apply { op, args: children } => {
                    args.clear();
                    args.extend(children.iter().map(|&c| slots[c]));
                    algebra.apply(*op, &args)?
                }
            };
            slots.push(value);
        }
        slots.last().copied().ok_or(MalcevError::Incomplete)
    }
}

/// Evaluates terms of one arena in one algebra.
pub struct Evaluator<'a, A: AlgebraView + ?Sized> {
    algebra: &'a A,
    arena: &'a TermArena,
    slots: Vec<usize>,
}

impl<'a, A: AlgebraView + ?Sized> Evaluator<'a, A> {
    pub fn new(algebra: &'a A, arena: &'a TermArena) -> Self {
        Self {
            algebra,
            arena,
            slots: Vec::new(),
        }
    }

    /// Resolve symbols and arities once.
    pub fn compile(&self, t: TermId) -> Result<CompiledTerm> {
        let order = self.arena.subterms(t)?;
        let mut steps = Vec::with_capacity(order.len());
        let mut arity = 0;
        for &s in &order {
            let step = match self.arena.node(s)? {
                TermNode::Var(i) => {
                    // No assignment can be long enough to bind index usize::MAX
                    let bound = i.checked_add(1).ok_or(MalcevError::MissingVariable(*i))?;
                    arity = arity.max(bound);
                    Step::Var(*i)
                }
                TermNode::App { symbol, children } => {
                    let name = self.arena.symbol_name(*symbol);
                    let op = self
                        .algebra
                        .operation_index(name)
                        .ok_or_else(|| MalcevError::UnknownOperation(name.to_string()))?;
                    let expected = self.algebra.operations()[op].arity();
                    if expected != children.len() {
                        return Err(MalcevError::ArityMismatch {
                            symbol: name.to_string(),
                            expected,
                            found: children.len(),
                        });
                    }
                    // `order` is sorted, so slots can be found by binary search
                    let args = children
                        .iter()
                        .map(|c| order.binary_search(c).map_err(|_| MalcevError::Incomplete))
                        .collect::<Result<Box<[usize]>>>()?;
                    Step::Apply { op, args }
                }
            };
            steps.push(step);
        }
        Ok(CompiledTerm { steps, arity })
    }

    /// Value of `t` with variable `i` bound to `assignment[i]`.
    pub fn eval(&mut self, t: TermId, assignment: &[usize]) -> Result<usize> {
        let compiled = self.compile(t)?;
        compiled.run(self.algebra, assignment, &mut self.slots)
    }

    /// Run an already compiled term, reusing this evaluator's scratch space.
    pub fn run(&mut self, compiled: &CompiledTerm, assignment: &[usize]) -> Result<usize> {
        compiled.run(self.algebra, assignment, &mut self.slots)
    }

    /// The full table of `t` as an `arity`-ary operation, row-major.
    pub fn term_operation(&mut self, t: TermId, arity: usize) -> Result<Vec<usize>> {
        let compiled = self.compile(t)?;
        if compiled.arity > arity {
            return Err(MalcevError::MissingVariable(compiled.arity - 1));
        }
        let n = self.algebra.cardinality();
        let mut table = Vec::with_capacity(Tuples::total(n, arity));
        let mut tuples = Tuples::new(n, arity);
        while let Some(args) = tuples.advance() {
            table.push(compiled.run(self.algebra, args, &mut self.slots)?);
        }
        trace!(term = %self.arena.display(t), arity, "tabulated term operation");
        Ok(table)
    }
}
