//! Congruence closure over a finite algebra.
//!
//! [`CongruenceClosure`] wraps a union-find and a queue of pairs that were
//! just merged. Draining the queue pushes each merged pair `(x, y)` through
//! every basic translation `f(c_1, .., x, .., c_k)`; images that are not yet
//! related get merged and queued in turn. At the fixpoint the partition is
//! compatible with every operation and is the least such partition containing
//! the seeds.
//!
//! # Key Types
//!
//! - [`CongruenceClosure`]: union-find + pending queue, bound to one algebra
//! - [`PendingPair`]: a merged pair whose translations are not yet processed
//! - [`MergeReason`]: why a pair was merged (for tracing/explanations)
//! - [`Congruence`]: a partition known to be compatible with the algebra
//!
//! # Usage
//!
//! ```ignore
//! use malcev::cc::principal_congruence;
//!
//! let cg = principal_congruence(&algebra, 0, 1)?;
//! assert!(cg.is_related(0, 1)?);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;

use egglog_union_find::UnionFind;
use tracing::trace;

use crate::algebra::AlgebraView;
use crate::error::{MalcevError, Result};
use crate::partition::Partition;
use crate::tuples::Tuples;

/// A merged pair whose images still have to be compared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPair {
    pub lhs: usize,
    pub rhs: usize,
    pub reason: MergeReason,
}

/// Why two elements were merged
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeReason {
    /// Generator of the congruence
    Seed,
    /// Images of a related pair under operation `op` at argument `position`
    Translation { op: usize, position: usize },
}

/// Congruence closure state for one algebra.
pub struct CongruenceClosure<'a, A: AlgebraView + ?Sized> {
    algebra: &'a A,
    uf: UnionFind<usize>,
    pending: VecDeque<PendingPair>,
    /// Number of merges performed (for statistics)
    merge_count: usize,
}

impl<A: AlgebraView + ?Sized> fmt::Debug for CongruenceClosure<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CongruenceClosure")
            .field("pending", &self.pending)
            .field("merge_count", &self.merge_count)
            .finish_non_exhaustive()
    }
}

impl<'a, A: AlgebraView + ?Sized> CongruenceClosure<'a, A> {
    /// Start from the identity partition.
    pub fn new(algebra: &'a A) -> Self {
        Self {
            algebra,
            uf: UnionFind::default(),
            pending: VecDeque::new(),
            merge_count: 0,
        }
    }

    /// Start from a known congruence. Its pairs are merged but not queued:
    /// their images are already related.
    pub fn from_congruence(algebra: &'a A, theta: &Congruence) -> Self {
        let mut cc = Self::new(algebra);
        for i in 0..theta.size() {
            let r = theta.rep(i);
            if r != i {
                cc.uf.union(r, i);
            }
        }
        cc
    }

    fn check(&self, a: usize) -> Result<()> {
        let n = self.algebra.cardinality();
        if a >= n {
            Err(MalcevError::element(a, n))
        } else {
            Ok(())
        }
    }

    pub fn find(&mut self, a: usize) -> usize {
        self.uf.find(a)
    }

    pub fn are_equal(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Merge two elements, returning true if they were not already equal
    pub fn merge(&mut self, a: usize, b: usize) -> bool {
        let ra = self.uf.find(a);
        let rb = self.uf.find(b);
        if ra != rb {
            self.uf.union(ra, rb);
            self.merge_count += 1;
            true
        } else {
            false
        }
    }

    /// Merge `a` and `b` and queue the pair if that changed anything.
    pub fn add_seed(&mut self, a: usize, b: usize) -> Result<()> {
        self.check(a)?;
        self.check(b)?;
        self.merge_and_queue(a, b, MergeReason::Seed);
        Ok(())
    }

    fn merge_and_queue(&mut self, a: usize, b: usize, reason: MergeReason) {
        if self.merge(a, b) {
            trace!(lhs = a, rhs = b, ?reason, "merge");
            self.pending.push_back(PendingPair {
                lhs: a,
                rhs: b,
                reason,
            });
        }
    }

    pub fn pop_pending(&mut self) -> Option<PendingPair> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Statistics: (merges, pending)
    pub fn stats(&self) -> (usize, usize) {
        (self.merge_count, self.pending.len())
    }

    /// Drain the queue to the fixpoint.
    pub fn run(&mut self) -> Result<()> {
        let algebra = self.algebra;
        let n = algebra.cardinality();
        let mut args = Vec::new();
        while let Some(pair) = self.pop_pending() {
            for (op_idx, op) in algebra.operations().iter().enumerate() {
                let k = op.arity();
                for position in 0..k {
                    let mut others = Tuples::new(n, k - 1);
                    while let Some(rest) = others.advance() {
                        args.clear();
                        args.extend_from_slice(&rest[..position]);
                        args.push(pair.lhs);
                        args.extend_from_slice(&rest[position..]);
                        let fx = algebra.apply(op_idx, &args)?;
                        args[position] = pair.rhs;
                        let fy = algebra.apply(op_idx, &args)?;
                        let reason = MergeReason::Translation {
                            op: op_idx,
                            position,
                        };
                        self.merge_and_queue(fx, fy, reason);
                    }
                }
            }
        }
        Ok(())
    }

    /// Snapshot the current classes. Call after [`run`](Self::run).
    pub fn into_congruence(mut self) -> Congruence {
        let n = self.algebra.cardinality();
        Congruence(Partition::from_union_find(&mut self.uf, n))
    }
}

/// The least congruence relating `a` and `b`, `Cg(a, b)`.
pub fn principal_congruence<A: AlgebraView + ?Sized>(
    algebra: &A,
    a: usize,
    b: usize,
) -> Result<Congruence> {
    let n = algebra.cardinality();
    for x in [a, b] {
        if x >= n {
            return Err(MalcevError::element(x, n));
        }
    }
    if a == b {
        return Congruence::zero(n);
    }
    close(algebra, [(a, b)])
}

/// The least congruence containing every seed pair.
pub fn close<A: AlgebraView + ?Sized>(
    algebra: &A,
    seeds: impl IntoIterator<Item = (usize, usize)>,
) -> Result<Congruence> {
    if algebra.cardinality() == 0 {
        return Err(MalcevError::InvalidArgument(
            "algebra has an empty universe".to_string(),
        ));
    }
    let mut cc = CongruenceClosure::new(algebra);
    for (a, b) in seeds {
        cc.add_seed(a, b)?;
    }
    cc.run()?;
    let (merges, _) = cc.stats();
    trace!(merges, "closure reached fixpoint");
    Ok(cc.into_congruence())
}

/// `θ ∨ φ`: merge the blocks of `φ` into `θ` and re-close, seeding the queue
/// with exactly the pairs that the block union merged.
pub fn join_congruences<A: AlgebraView + ?Sized>(
    algebra: &A,
    theta: &Congruence,
    phi: &Congruence,
) -> Result<Congruence> {
    if theta.size() != phi.size() {
        return Err(MalcevError::SizeMismatch {
            left: theta.size(),
            right: phi.size(),
        });
    }
    let mut cc = CongruenceClosure::from_congruence(algebra, theta);
    for i in 0..phi.size() {
        let r = phi.rep(i);
        if r != i {
            cc.add_seed(r, i)?;
        }
    }
    cc.run()?;
    Ok(cc.into_congruence())
}

// ============================================================================
// CONGRUENCES
// ============================================================================

/// A partition compatible with every operation of its algebra.
///
/// Only closure, lattice join/meet and [`Congruence::verify`] produce values
/// of this type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Congruence(Partition);

impl Congruence {
    /// The identity congruence on `0..n`
    pub fn zero(n: usize) -> Result<Self> {
        Ok(Self(Partition::zero(n)?))
    }

    /// The universal congruence on `0..n`
    pub fn one(n: usize) -> Result<Self> {
        Ok(Self(Partition::one(n)?))
    }

    /// Check `partition` against every operation, returning it as a
    /// congruence when compatible.
    pub fn verify<A: AlgebraView + ?Sized>(
        algebra: &A,
        partition: Partition,
    ) -> Result<Option<Self>> {
        if partition.size() != algebra.cardinality() {
            return Err(MalcevError::SizeMismatch {
                left: algebra.cardinality(),
                right: partition.size(),
            });
        }
        let closed = close(algebra, partition.related_pairs())?;
        if closed.0 == partition {
            Ok(Some(Self(partition)))
        } else {
            Ok(None)
        }
    }

    /// Meet of congruences is the partition meet.
    pub fn meet(&self, other: &Congruence) -> Result<Congruence> {
        Ok(Self(self.0.meet(&other.0)?))
    }

    pub fn partition(&self) -> &Partition {
        &self.0
    }

    pub fn into_partition(self) -> Partition {
        self.0
    }
}

impl Deref for Congruence {
    type Target = Partition;

    fn deref(&self) -> &Partition {
        &self.0
    }
}

impl fmt::Display for Congruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Congruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Congruence({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Algebra;

    #[test]
    fn test_congruence_closure_basic() {
        let alg = Algebra::new("set", 3).unwrap();
        let mut cc = CongruenceClosure::new(&alg);

        // Initially all different
        assert!(!cc.are_equal(0, 1));
        assert!(!cc.are_equal(1, 2));

        assert!(cc.merge(0, 1));
        assert!(cc.are_equal(0, 1));
        assert!(!cc.are_equal(1, 2));

        // Merge b and c (should transitively merge a and c)
        assert!(cc.merge(1, 2));
        assert!(cc.are_equal(0, 2));

        // Merging already equal elements returns false
        assert!(!cc.merge(0, 2));
        assert_eq!(cc.stats(), (2, 0));
    }

    #[test]
    fn test_seed_queues_only_new_merges() {
        let alg = Algebra::new("set", 3).unwrap();
        let mut cc = CongruenceClosure::new(&alg);
        cc.add_seed(0, 1).unwrap();
        cc.add_seed(1, 0).unwrap();
        assert_eq!(cc.stats(), (1, 1));
        let pair = cc.pop_pending().unwrap();
        assert_eq!((pair.lhs, pair.rhs, pair.reason), (0, 1, MergeReason::Seed));
        assert!(!cc.has_pending());
        assert!(cc.add_seed(0, 3).is_err());
    }

    #[test]
    fn test_principal_in_z4() {
        // In Z4, Cg(0,2) = {0,2}{1,3}; Cg(0,1) is everything
        let z4 = Algebra::cyclic_group(4).unwrap();
        let cg = principal_congruence(&z4, 0, 2).unwrap();
        assert_eq!(cg.blocks(), vec![vec![0, 2], vec![1, 3]]);
        let cg = principal_congruence(&z4, 0, 1).unwrap();
        assert!(cg.is_one());
    }

    #[test]
    fn test_principal_reflexive_pair_is_identity() {
        let z4 = Algebra::cyclic_group(4).unwrap();
        assert!(principal_congruence(&z4, 2, 2).unwrap().is_zero());
        assert!(principal_congruence(&z4, 2, 4).is_err());
    }

    #[test]
    fn test_chain_congruences() {
        // Every convex partition of a chain is a lattice congruence
        let chain = Algebra::lattice_chain(4).unwrap();
        let cg = principal_congruence(&chain, 1, 2).unwrap();
        assert_eq!(cg.blocks(), vec![vec![0], vec![1, 2], vec![3]]);
        let cg = principal_congruence(&chain, 0, 2).unwrap();
        assert_eq!(cg.blocks(), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_join_congruences() {
        let chain = Algebra::lattice_chain(4).unwrap();
        let a = principal_congruence(&chain, 0, 1).unwrap();
        let b = principal_congruence(&chain, 2, 3).unwrap();
        let j = join_congruences(&chain, &a, &b).unwrap();
        assert_eq!(j.blocks(), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(join_congruences(&chain, &a, &a).unwrap(), a);
    }

    #[test]
    fn test_verify() {
        let z4 = Algebra::cyclic_group(4).unwrap();
        let parity = Partition::from_blocks(4, &[vec![0, 2], vec![1, 3]]).unwrap();
        assert!(Congruence::verify(&z4, parity).unwrap().is_some());
        let bad = Partition::from_blocks(4, &[vec![0, 1], vec![2], vec![3]]).unwrap();
        assert!(Congruence::verify(&z4, bad).unwrap().is_none());
    }

    #[test]
    fn test_bad_operation_detected_during_closure() {
        let alg = Algebra::new("bad", 2)
            .unwrap()
            .with_fn("f", 1, |args| args[0] + 1)
            .unwrap();
        let err = principal_congruence(&alg, 0, 1).unwrap_err();
        assert!(matches!(err, MalcevError::InvalidOperationResult { .. }));
    }
}
