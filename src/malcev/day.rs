//! Day quadruples in the square of an algebra.
//!
//! For `x0, x1, y0, y1 ∈ A` let `B = Sg^{A²}{a, b, c, d}` with
//! `a = (x0,y0)`, `b = (x0,y1)`, `c = (x1,y0)`, `d = (x1,y1)`. The quadruple
//! is a Day quadruple when, in `Con(B)`,
//!
//! ```text
//! (a, b) ∉ Cg(c,d) ∨ ((Cg(a,c) ∨ Cg(b,d)) ∧ (Cg(a,b) ∨ Cg(c,d)))
//! ```
//!
//! Only principal congruences of `B` and a few joins are needed, so the full
//! lattice of `B` is never built.

use std::fmt;

use tracing::{debug, trace};

use crate::algebra::AlgebraView;
use crate::cc::{join_congruences, principal_congruence};
use crate::error::{MalcevError, Result};
use crate::progress::Monitor;
use crate::subalgebra::SquareSubalgebra;

/// Elements `(x0, x1, y0, y1)` of the base algebra.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DayQuadruple {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl fmt::Display for DayQuadruple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x0, self.x1, self.y0, self.y1)
    }
}

impl DayQuadruple {
    /// `a, b, c, d` as pairs of the square
    pub fn generators(&self) -> [(usize, usize); 4] {
        [
            (self.x0, self.y0),
            (self.x0, self.y1),
            (self.x1, self.y0),
            (self.x1, self.y1),
        ]
    }
}

/// Test one quadruple.
pub fn is_day_quadruple<A: AlgebraView + ?Sized>(algebra: &A, q: DayQuadruple) -> Result<bool> {
    let gens = q.generators();
    let sub = SquareSubalgebra::generate(algebra, &gens)?;
    let b_alg = sub.algebra();
    let mut idx = [0; 4];
    for (slot, &pair) in idx.iter_mut().zip(gens.iter()) {
        // Generators are always in the subuniverse
        *slot = sub.index_of(pair).ok_or(MalcevError::Incomplete)?;
    }
    let [a, b, c, d] = idx;

    let cg_cd = principal_congruence(b_alg, c, d)?;
    // Cg(c,d) lies below the whole join
    if cg_cd.related(a, b) {
        return Ok(false);
    }
    let left = join_congruences(
        b_alg,
        &principal_congruence(b_alg, a, c)?,
        &principal_congruence(b_alg, b, d)?,
    )?;
    let right = join_congruences(b_alg, &principal_congruence(b_alg, a, b)?, &cg_cd)?;
    let meet = left.meet(&right)?;
    let whole = join_congruences(b_alg, &cg_cd, &meet)?;
    Ok(!whole.related(a, b))
}

/// First Day quadruple in lexicographic order of `(x0, x1, y0, y1)`.
pub fn find_day_quadruple_in_square<A: AlgebraView + ?Sized>(
    algebra: &A,
    monitor: &mut Monitor,
) -> Result<Option<DayQuadruple>> {
    let n = algebra.cardinality();
    debug!(size = n, "searching the square for a Day quadruple");
    for x0 in 0..n {
        monitor.checkpoint(
            x0 as f64 / n as f64,
            &format!("Day quadruples with x0 = {x0}"),
        )?;
        for x1 in 0..n {
            // x0 = x1 gives a = c and b = d, so (a,b) ∈ Cg(c,d)
            if x0 == x1 {
                continue;
            }
            for y0 in 0..n {
                for y1 in 0..n {
                    if y0 == y1 {
                        continue;
                    }
                    let q = DayQuadruple { x0, x1, y0, y1 };
                    if is_day_quadruple(algebra, q)? {
                        debug!(%q, "found Day quadruple");
                        return Ok(Some(q));
                    }
                    trace!(%q, "not a Day quadruple");
                }
            }
        }
    }
    Ok(None)
}
