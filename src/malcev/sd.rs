//! Meet- and join-semidistributivity.
//!
//! SD(∧) terms are a ternary weak near-unanimity term `w3` and a quaternary
//! one `w4` with `w3(y,x,x) = w4(y,x,x,x)`. A weak NU term is idempotent and
//! takes the same value whichever single argument is `y`, so it is determined
//! on its domain by the *signature* `(x, y) ↦ w(y,x,...,x)`. The search
//! generates ternary and quaternary term operations in lockstep and matches
//! signatures as they appear.
//!
//! For idempotent algebras the lattice-level checks look for a failing triple
//! in `Con(A)` directly.

use std::collections::HashMap;

use tracing::debug;

use super::clone::{CloneGenerator, Round};
use super::identity::Domain;
use super::{MalcevSearch, Outcome, Reason};
use crate::algebra::AlgebraView;
use crate::error::{MalcevError, Result};
use crate::lattice::SdFailure;
use crate::term::eval::Evaluator;
use crate::term::{TermArena, TermId};
use crate::tuples::Tuples;

/// A witness pair for SD(∧).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdTerms {
    pub ternary: TermId,
    pub quaternary: TermId,
}

/// Where a weak NU term of one arity is read off its restricted table.
#[derive(Clone, Debug)]
pub(crate) struct WeakNu {
    arity: usize,
    domain: Domain,
    /// For each `(x, y)` in `Tuples(n, 2)` order, the points
    /// `(y,x,..,x), (x,y,..,x), ..., (x,..,x,y)`
    rows: Vec<Vec<usize>>,
    /// `(point of (x,...,x), x)`
    diagonal: Vec<(usize, usize)>,
}

impl WeakNu {
    pub(crate) fn new(n: usize, arity: usize) -> Self {
        let patterns: Vec<Vec<usize>> = (0..arity)
            .map(|odd| (0..arity).map(|i| usize::from(i == odd)).collect())
            .collect();
        let refs: Vec<&[usize]> = patterns.iter().map(Vec::as_slice).collect();
        let domain = Domain::from_patterns(n, arity, 2, &refs);

        let mut rows = Vec::with_capacity(n * n);
        let mut diagonal = Vec::with_capacity(n);
        let mut tuple = Vec::with_capacity(arity);
        let mut pairs = Tuples::new(n, 2);
        while let Some(v) = pairs.advance() {
            let row: Vec<usize> = patterns
                .iter()
                .filter_map(|p| {
                    tuple.clear();
                    tuple.extend(p.iter().map(|&i| v[i]));
                    domain.index_of(&tuple)
                })
                .collect();
            if v[0] == v[1] {
                if let Some(&point) = row.first() {
                    diagonal.push((point, v[0]));
                }
            }
            rows.push(row);
        }
        Self {
            arity,
            domain,
            rows,
            diagonal,
        }
    }

    pub(crate) fn domain(&self) -> &Domain {
        &self.domain
    }

    /// `Some((x,y) ↦ w(y,x,...,x))` when the table is weak NU and idempotent.
    pub(crate) fn signature(&self, table: &[usize]) -> Option<Vec<usize>> {
        if self.diagonal.iter().any(|&(p, x)| table[p] != x) {
            return None;
        }
        self.rows
            .iter()
            .map(|row| {
                let value = table[row[0]];
                row.iter().all(|&p| table[p] == value).then_some(value)
            })
            .collect()
    }

    /// Exhaustive check of `term` as a weak NU term; returns its signature.
    fn evaluate<A: AlgebraView + ?Sized>(
        &self,
        algebra: &A,
        arena: &TermArena,
        term: TermId,
    ) -> Result<Option<Vec<usize>>> {
        let mut ev = Evaluator::new(algebra, arena);
        let compiled = ev.compile(term)?;
        let n = algebra.cardinality();
        let mut signature = Vec::with_capacity(n * n);
        let mut pairs = Tuples::new(n, 2);
        let mut tuple = vec![0; self.arity];
        while let Some(v) = pairs.advance() {
            let (x, y) = (v[0], v[1]);
            let mut first = None;
            for odd in 0..self.arity {
                tuple.fill(x);
                tuple[odd] = y;
                let value = ev.run(&compiled, &tuple)?;
                match first {
                    None => first = Some(value),
                    Some(f) if f != value => return Ok(None),
                    Some(_) => {}
                }
            }
            match first {
                Some(value) if x != y || value == x => signature.push(value),
                _ => return Ok(None),
            }
        }
        Ok(Some(signature))
    }
}

impl<A: AlgebraView + ?Sized> MalcevSearch<'_, A> {
    /// A ternary and a quaternary weak NU term with `w3(y,x,x) = w4(y,x,x,x)`.
    pub fn sd_terms(&mut self) -> Result<Outcome<SdTerms>> {
        let algebra = self.algebra;
        let n = algebra.cardinality();
        debug!(size = n, "searching for SD(∧) terms");
        let shapes = [WeakNu::new(n, 3), WeakNu::new(n, 4)];
        let mut gens = [
            CloneGenerator::new(shapes[0].domain().clone(), &mut self.arena),
            CloneGenerator::new(shapes[1].domain().clone(), &mut self.arena),
        ];
        let mut seen: [HashMap<Vec<usize>, usize>; 2] = [HashMap::new(), HashMap::new()];
        let mut scanned = [0usize; 2];
        let mut exhausted = [false; 2];
        let mut depth = 0;
        loop {
            for side in 0..2 {
                for i in scanned[side]..gens[side].len() {
                    let Some(sig) = shapes[side].signature(gens[side].table(i)) else {
                        continue;
                    };
                    if let Some(&j) = seen[1 - side].get(&sig) {
                        let (t3, t4) = if side == 0 {
                            (gens[0].term(i), gens[1].term(j))
                        } else {
                            (gens[0].term(j), gens[1].term(i))
                        };
                        return self.confirm_sd(&shapes, t3, t4);
                    }
                    seen[side].entry(sig).or_insert(i);
                }
                scanned[side] = gens[side].len();
            }
            if exhausted[0] && exhausted[1] {
                debug!("SD(∧) terms provably absent");
                return Ok(Outcome::NotFound(Reason::Exhausted));
            }
            if depth >= self.config.max_depth {
                return Ok(Outcome::NotFound(Reason::BoundReached));
            }
            depth += 1;
            for side in 0..2 {
                if exhausted[side] {
                    continue;
                }
                let round = gens[side].next_level(
                    algebra,
                    &mut self.arena,
                    &self.config,
                    &mut self.monitor,
                    &mut |_| false,
                )?;
                exhausted[side] = round == Round::Exhausted;
            }
        }
    }

    fn confirm_sd(
        &self,
        shapes: &[WeakNu; 2],
        ternary: TermId,
        quaternary: TermId,
    ) -> Result<Outcome<SdTerms>> {
        let s3 = shapes[0].evaluate(self.algebra, &self.arena, ternary)?;
        let s4 = shapes[1].evaluate(self.algebra, &self.arena, quaternary)?;
        match (s3, s4) {
            (Some(a), Some(b)) if a == b => {
                debug!(
                    w3 = %self.arena.display(ternary),
                    w4 = %self.arena.display(quaternary),
                    "found SD(∧) terms"
                );
                Ok(Outcome::Found(SdTerms {
                    ternary,
                    quaternary,
                }))
            }
            _ => Err(MalcevError::InvalidArgument(format!(
                "SD(∧) witness {} / {} failed re-verification",
                self.arena.display(ternary),
                self.arena.display(quaternary)
            ))),
        }
    }

    /// For an idempotent algebra: the first `(α, β, γ)` in `Con(A)` with
    /// `α∧β = α∧γ` but `α∧(β∨γ) ≠ α∧β`, or `None` when `Con(A)` is SD(∧).
    pub fn sd_meet_idempotent(&mut self) -> Result<Option<SdFailure>> {
        self.require_idempotent("sd_meet_idempotent")?;
        let mut lattice = self.lattice();
        lattice.find_sd_meet_failure()
    }

    /// Dual of [`sd_meet_idempotent`](Self::sd_meet_idempotent).
    pub fn sd_join_idempotent(&mut self) -> Result<Option<SdFailure>> {
        self.require_idempotent("sd_join_idempotent")?;
        let mut lattice = self.lattice();
        lattice.find_sd_join_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Algebra;

    #[test]
    fn test_signature_of_projection_fails_weak_nu() {
        let shape = WeakNu::new(2, 3);
        let x = shape.domain().projection(0);
        assert!(shape.signature(&x).is_none());
    }

    #[test]
    fn test_majority_is_weak_nu() {
        let ba = Algebra::boolean_algebra().unwrap();
        let mut arena = TermArena::new();
        let m = arena
            .parse("join(join(meet(x,y),meet(y,z)),meet(x,z))")
            .unwrap();
        let shape = WeakNu::new(2, 3);
        let sig = shape.evaluate(&ba, &arena, m).unwrap().unwrap();
        // m(y,x,x) = x
        assert_eq!(sig, vec![0, 0, 1, 1]);
    }
}
