//! Subalgebras of the square `A²` generated by a set of pairs.
//!
//! The generated subuniverse is interned in an [`IndexSet`], so element `i` of
//! the resulting [`Algebra`] is the `i`-th pair discovered: generators first,
//! in the order given, then closure results in discovery order.
//!
//! Closure is semi-naive: each round only applies operations to tuples that
//! mention at least one pair discovered in the previous round.

use indexmap::IndexSet;
use tracing::debug;

use crate::algebra::{Algebra, AlgebraView};
use crate::error::{MalcevError, Result};
use crate::tuples::Tuples;

/// Default ceiling on the number of table entries materialized per operation.
pub const DEFAULT_TABLE_LIMIT: usize = 1 << 24;

/// `Sg^{A²}(generators)` together with its pair labels.
#[derive(Clone, Debug)]
pub struct SquareSubalgebra {
    universe: IndexSet<(usize, usize)>,
    algebra: Algebra,
}

impl SquareSubalgebra {
    /// Generate with the default table ceiling.
    pub fn generate<A: AlgebraView + ?Sized>(
        base: &A,
        generators: &[(usize, usize)],
    ) -> Result<Self> {
        Self::generate_with_limit(base, generators, DEFAULT_TABLE_LIMIT)
    }

    pub fn generate_with_limit<A: AlgebraView + ?Sized>(
        base: &A,
        generators: &[(usize, usize)],
        table_limit: usize,
    ) -> Result<Self> {
        let n = base.cardinality();
        let mut universe: IndexSet<(usize, usize)> = IndexSet::new();
        for &(a, b) in generators {
            for x in [a, b] {
                if x >= n {
                    return Err(MalcevError::element(x, n));
                }
            }
            universe.insert((a, b));
        }

        // Constants belong to every subuniverse
        for (op_idx, op) in base.operations().iter().enumerate() {
            if op.arity() == 0 {
                let c = base.apply(op_idx, &[])?;
                universe.insert((c, c));
            }
        }

        let mut fresh_from = 0;
        let mut left = Vec::new();
        let mut right = Vec::new();
        loop {
            let before = universe.len();
            for (op_idx, op) in base.operations().iter().enumerate() {
                let k = op.arity();
                if k == 0 {
                    continue;
                }
                let mut tuples = Tuples::new(before, k);
                while let Some(idx) = tuples.advance() {
                    if idx.iter().all(|&i| i < fresh_from) {
                        continue;
                    }
                    left.clear();
                    right.clear();
                    for &i in idx {
                        let (a, b) = universe[i];
                        left.push(a);
                        right.push(b);
                    }
                    let pair = (base.apply(op_idx, &left)?, base.apply(op_idx, &right)?);
                    universe.insert(pair);
                }
            }
            if universe.len() == before {
                break;
            }
            fresh_from = before;
        }

        let size = universe.len();
        debug!(generators = generators.len(), size, "generated subalgebra of the square");

        let mut algebra = Algebra::new("Sg(A²)", size)?;
        for (op_idx, op) in base.operations().iter().enumerate() {
            let k = op.arity();
            let total = Tuples::total(size, k);
            if total > table_limit {
                return Err(MalcevError::ResourceLimitExceeded {
                    resource: "subalgebra table entries",
                    limit: table_limit,
                });
            }
            let mut values = Vec::with_capacity(total);
            let mut tuples = Tuples::new(size, k);
            while let Some(idx) = tuples.advance() {
                left.clear();
                right.clear();
                for &i in idx {
                    let (a, b) = universe[i];
                    left.push(a);
                    right.push(b);
                }
                let pair = (base.apply(op_idx, &left)?, base.apply(op_idx, &right)?);
                let value = universe
                    .get_index_of(&pair)
                    .ok_or(MalcevError::Incomplete)?;
                values.push(value);
            }
            algebra = algebra.with_table(op.symbol(), k, values)?;
        }

        Ok(Self { universe, algebra })
    }

    pub fn algebra(&self) -> &Algebra {
        &self.algebra
    }

    pub fn size(&self) -> usize {
        self.universe.len()
    }

    /// Index of a pair, if it lies in the subuniverse
    pub fn index_of(&self, pair: (usize, usize)) -> Option<usize> {
        self.universe.get_index_of(&pair)
    }

    /// The pair labelling element `i`
    pub fn element(&self, i: usize) -> Result<(usize, usize)> {
        self.universe
            .get_index(i)
            .copied()
            .ok_or(MalcevError::element(i, self.universe.len()))
    }

    /// All pairs in element order
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.universe.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_is_closed() {
        let z3 = Algebra::cyclic_group(3).unwrap();
        let diag: Vec<_> = (0..3).map(|x| (x, x)).collect();
        let sub = SquareSubalgebra::generate(&z3, &diag).unwrap();
        assert_eq!(sub.size(), 3);
        assert_eq!(sub.element(1).unwrap(), (1, 1));
    }

    #[test]
    fn test_group_generates_whole_square() {
        let z3 = Algebra::cyclic_group(3).unwrap();
        let sub = SquareSubalgebra::generate(&z3, &[(1, 0), (0, 1)]).unwrap();
        assert_eq!(sub.size(), 9);
        // Generators keep their positions
        assert_eq!(sub.index_of((1, 0)), Some(0));
        assert_eq!(sub.index_of((0, 1)), Some(1));
    }

    #[test]
    fn test_tables_follow_componentwise_operations() {
        let chain = Algebra::lattice_chain(3).unwrap();
        let sub = SquareSubalgebra::generate(&chain, &[(0, 2), (2, 0)]).unwrap();
        // {(0,2), (2,0), (0,0), (2,2)} under meet and join
        assert_eq!(sub.size(), 4);
        let meet = sub.algebra().operation_index("meet").unwrap();
        let a = sub.index_of((0, 2)).unwrap();
        let b = sub.index_of((2, 0)).unwrap();
        let m = sub.algebra().apply(meet, &[a, b]).unwrap();
        assert_eq!(sub.element(m).unwrap(), (0, 0));
    }

    #[test]
    fn test_table_limit() {
        let z3 = Algebra::cyclic_group(3).unwrap();
        let err = SquareSubalgebra::generate_with_limit(&z3, &[(1, 0), (0, 1)], 10).unwrap_err();
        assert!(matches!(err, MalcevError::ResourceLimitExceeded { .. }));
    }
}
