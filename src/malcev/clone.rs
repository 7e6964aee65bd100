//! Breadth-first generation of term operations, restricted to a domain.
//!
//! A term of arity `k` is represented by its values on the domain's points
//! (its *restricted table*). Depth 0 holds the `k` projections; depth `d`
//! applies every operation to every tuple of known tables with at least one
//! argument from depth `d-1`, computing the result pointwise. A table already
//! seen is dropped, so each distinct restriction keeps its first, shallowest
//! term. A depth that adds nothing means every term operation restricted to
//! the domain has been enumerated.

use std::ops::Range;

use indexmap::IndexSet;
use tracing::trace;

use super::identity::Domain;
use super::SearchConfig;
use crate::algebra::AlgebraView;
use crate::error::{MalcevError, Result};
use crate::progress::Monitor;
use crate::term::{TermArena, TermId};
use crate::tuples::Tuples;

/// What one call to [`CloneGenerator::next_level`] achieved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Round {
    /// New tables at these indices
    Grew(Range<usize>),
    /// The stop predicate accepted the table at this index. The level was
    /// abandoned part way, so the generator should not be advanced further.
    Hit(usize),
    /// Nothing new: the restricted clone is complete
    Exhausted,
}

/// Restricted tables of term operations of one arity, in generation order.
#[derive(Debug)]
pub struct CloneGenerator {
    domain: Domain,
    tables: IndexSet<Box<[usize]>>,
    /// `terms[i]` produced `tables[i]`
    terms: Vec<TermId>,
    /// First index of the newest depth
    level_start: usize,
    depth: usize,
    candidates: usize,
}

impl CloneGenerator {
    /// Start at depth 0 with the projections.
    pub fn new(domain: Domain, arena: &mut TermArena) -> Self {
        let mut gen = Self {
            tables: IndexSet::new(),
            terms: Vec::new(),
            level_start: 0,
            depth: 0,
            candidates: 0,
            domain,
        };
        for i in 0..gen.domain.arity() {
            let table = gen.domain.projection(i).into_boxed_slice();
            if gen.tables.insert(table) {
                gen.terms.push(arena.make_variable(i));
            }
        }
        gen
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Depth of the newest level
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, i: usize) -> &[usize] {
        &self.tables[i]
    }

    pub fn term(&self, i: usize) -> TermId {
        self.terms[i]
    }

    /// Index of `table`, if some generated term has it
    pub fn position(&self, table: &[usize]) -> Option<usize> {
        self.tables.get_index_of(table)
    }

    /// Candidate applications evaluated so far
    pub fn candidates(&self) -> usize {
        self.candidates
    }

    /// Generate the next depth. `stop` sees every new table in generation
    /// order; the first one it accepts ends the level early.
    pub fn next_level<A: AlgebraView + ?Sized>(
        &mut self,
        algebra: &A,
        arena: &mut TermArena,
        config: &SearchConfig,
        monitor: &mut Monitor,
        stop: &mut dyn FnMut(&[usize]) -> bool,
    ) -> Result<Round> {
        let old = self.level_start;
        let total = self.tables.len();
        self.depth += 1;
        let interval = config.checkpoint_interval.max(1);
        let points = self.domain.len();
        let mut args = Vec::new();
        let mut children = Vec::new();
        let mut table = Vec::with_capacity(points);

        for (op_idx, op) in algebra.operations().iter().enumerate() {
            let k = op.arity();
            let symbol = arena.symbol(op.symbol());
            // Each tuple is enumerated once, keyed by its first newest-level argument
            let shapes: Vec<Vec<Range<usize>>> = if k == 0 {
                if self.depth == 1 {
                    vec![Vec::new()]
                } else {
                    Vec::new()
                }
            } else {
                (0..k)
                    .map(|first| {
                        (0..k)
                            .map(|p| match p.cmp(&first) {
                                std::cmp::Ordering::Less => 0..old,
                                std::cmp::Ordering::Equal => old..total,
                                std::cmp::Ordering::Greater => 0..total,
                            })
                            .collect()
                    })
                    .collect()
            };

            for ranges in shapes {
                let mut tuples = Tuples::ranges(ranges);
                while let Some(idx) = tuples.advance() {
                    self.candidates += 1;
                    if self.candidates % interval == 0 {
                        let fraction = self.depth as f64 / config.max_depth.max(1) as f64;
                        monitor.checkpoint(
                            fraction,
                            &format!(
                                "depth {}: {} term operations, {} candidates",
                                self.depth,
                                self.tables.len(),
                                self.candidates
                            ),
                        )?;
                    }

                    table.clear();
                    for s in 0..points {
                        args.clear();
                        args.extend(idx.iter().map(|&t| self.tables[t][s]));
                        table.push(algebra.apply(op_idx, &args)?);
                    }
                    if self.tables.contains(table.as_slice()) {
                        continue;
                    }

                    children.clear();
                    children.extend(idx.iter().map(|&t| self.terms[t]));
                    let term = arena.make_app(symbol, &children)?;
                    let (new_index, _) = self.tables.insert_full(table.as_slice().into());
                    self.terms.push(term);
                    if self.tables.len() > config.max_terms {
                        return Err(MalcevError::ResourceLimitExceeded {
                            resource: "term operations",
                            limit: config.max_terms,
                        });
                    }
                    if stop(&self.tables[new_index]) {
                        trace!(depth = self.depth, index = new_index, "stop predicate hit");
                        return Ok(Round::Hit(new_index));
                    }
                }
            }
        }

        self.level_start = total;
        let grown = total..self.tables.len();
        trace!(
            depth = self.depth,
            new = grown.len(),
            total = self.tables.len(),
            "generated level"
        );
        if grown.is_empty() {
            Ok(Round::Exhausted)
        } else {
            Ok(Round::Grew(grown))
        }
    }
}
