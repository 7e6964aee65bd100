//! Arbitrary binary relations on a finite universe.
//!
//! Pairs `(a, b)` are stored as the bit `a * n + b` of a roaring bitmap, so
//! iteration order is lexicographic and sparse relations stay small.

use std::fmt;

use roaring::RoaringTreemap;

use crate::error::{MalcevError, Result};
use crate::partition::Partition;

/// A subset of `0..n × 0..n`.
#[derive(Clone, PartialEq)]
pub struct BinaryRelation {
    n: usize,
    bits: RoaringTreemap,
}

impl BinaryRelation {
    /// The empty relation.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(MalcevError::InvalidArgument(
                "a relation needs a nonempty universe".to_string(),
            ));
        }
        Ok(Self {
            n,
            bits: RoaringTreemap::new(),
        })
    }

    /// The diagonal `{(a, a)}`.
    pub fn identity(n: usize) -> Result<Self> {
        let mut rel = Self::new(n)?;
        for a in 0..n {
            rel.bits.insert(rel.key(a, a));
        }
        Ok(rel)
    }

    pub fn universal(n: usize) -> Result<Self> {
        let mut rel = Self::new(n)?;
        rel.bits.insert_range(0..(n as u64 * n as u64));
        Ok(rel)
    }

    pub fn from_pairs(n: usize, pairs: impl IntoIterator<Item = (usize, usize)>) -> Result<Self> {
        let mut rel = Self::new(n)?;
        for (a, b) in pairs {
            rel.add(a, b)?;
        }
        Ok(rel)
    }

    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    fn key(&self, a: usize, b: usize) -> u64 {
        (a * self.n + b) as u64
    }

    fn check(&self, a: usize, b: usize) -> Result<()> {
        for x in [a, b] {
            if x >= self.n {
                return Err(MalcevError::element(x, self.n));
            }
        }
        Ok(())
    }

    fn check_same_size(&self, other: &BinaryRelation) -> Result<()> {
        if self.n != other.n {
            return Err(MalcevError::SizeMismatch {
                left: self.n,
                right: other.n,
            });
        }
        Ok(())
    }

    /// Add a pair, returns true if newly added
    pub fn add(&mut self, a: usize, b: usize) -> Result<bool> {
        self.check(a, b)?;
        let key = self.key(a, b);
        Ok(self.bits.insert(key))
    }

    /// Remove a pair, returns true if it was present
    pub fn remove(&mut self, a: usize, b: usize) -> Result<bool> {
        self.check(a, b)?;
        let key = self.key(a, b);
        Ok(self.bits.remove(key))
    }

    pub fn is_related(&self, a: usize, b: usize) -> Result<bool> {
        self.check(a, b)?;
        Ok(self.bits.contains(self.key(a, b)))
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.bits.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Pairs in lexicographic order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.n;
        self.bits.iter().map(move |k| {
            let k = k as usize;
            (k / n, k % n)
        })
    }

    /// `successors[a]` = every `b` with `(a, b)` in the relation
    fn successors(&self) -> Vec<Vec<usize>> {
        let mut rows = vec![Vec::new(); self.n];
        for (a, b) in self.pairs() {
            rows[a].push(b);
        }
        rows
    }

    pub fn is_reflexive(&self) -> bool {
        (0..self.n).all(|a| self.bits.contains(self.key(a, a)))
    }

    pub fn is_symmetric(&self) -> bool {
        self.pairs()
            .all(|(a, b)| self.bits.contains(self.key(b, a)))
    }

    pub fn is_transitive(&self) -> bool {
        let rows = self.successors();
        self.pairs().all(|(a, b)| {
            rows[b]
                .iter()
                .all(|&c| self.bits.contains(self.key(a, c)))
        })
    }

    pub fn is_equivalence(&self) -> bool {
        self.is_reflexive() && self.is_symmetric() && self.is_transitive()
    }

    /// Relational product: `(a, c)` iff some `b` has `self(a, b)` and `other(b, c)`.
    pub fn compose(&self, other: &BinaryRelation) -> Result<BinaryRelation> {
        self.check_same_size(other)?;
        let rows = other.successors();
        let mut out = BinaryRelation::new(self.n)?;
        for (a, b) in self.pairs() {
            for &c in &rows[b] {
                out.bits.insert(out.key(a, c));
            }
        }
        Ok(out)
    }

    pub fn converse(&self) -> BinaryRelation {
        let mut out = BinaryRelation {
            n: self.n,
            bits: RoaringTreemap::new(),
        };
        for (a, b) in self.pairs() {
            out.bits.insert(out.key(b, a));
        }
        out
    }

    pub fn union(&self, other: &BinaryRelation) -> Result<BinaryRelation> {
        self.check_same_size(other)?;
        Ok(BinaryRelation {
            n: self.n,
            bits: &self.bits | &other.bits,
        })
    }

    pub fn intersection(&self, other: &BinaryRelation) -> Result<BinaryRelation> {
        self.check_same_size(other)?;
        Ok(BinaryRelation {
            n: self.n,
            bits: &self.bits & &other.bits,
        })
    }

    /// Least transitive relation containing `self` (Warshall).
    pub fn transitive_closure(&self) -> BinaryRelation {
        let n = self.n;
        let mut matrix = vec![false; n * n];
        for (a, b) in self.pairs() {
            matrix[a * n + b] = true;
        }
        for k in 0..n {
            for i in 0..n {
                if !matrix[i * n + k] {
                    continue;
                }
                for j in 0..n {
                    if matrix[k * n + j] {
                        matrix[i * n + j] = true;
                    }
                }
            }
        }
        let mut out = BinaryRelation {
            n,
            bits: RoaringTreemap::new(),
        };
        for (idx, _) in matrix.iter().enumerate().filter(|(_, set)| **set) {
            out.bits.insert(idx as u64);
        }
        out
    }

    /// The partition this relation describes, if it is an equivalence.
    pub fn to_partition(&self) -> Result<Partition> {
        if !self.is_equivalence() {
            return Err(MalcevError::InvalidArgument(
                "relation is not an equivalence".to_string(),
            ));
        }
        let mut p = Partition::zero(self.n)?;
        for (a, b) in self.pairs() {
            p.union(a, b)?;
        }
        Ok(p)
    }
}

impl From<&Partition> for BinaryRelation {
    fn from(p: &Partition) -> Self {
        let n = p.size();
        let mut bits = RoaringTreemap::new();
        for a in 0..n {
            for b in 0..n {
                if p.related(a, b) {
                    bits.insert((a * n + b) as u64);
                }
            }
        }
        Self { n, bits }
    }
}

impl fmt::Debug for BinaryRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryRelation")
            .field("n", &self.n)
            .field("pairs", &self.pairs().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for BinaryRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.pairs().map(|(a, b)| format!("({a},{b})")).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove() {
        let mut rel = BinaryRelation::new(3).unwrap();
        assert!(rel.add(0, 1).unwrap());
        assert!(!rel.add(0, 1).unwrap());
        assert!(rel.is_related(0, 1).unwrap());
        assert!(!rel.is_related(1, 0).unwrap());
        assert!(rel.remove(0, 1).unwrap());
        assert!(!rel.remove(0, 1).unwrap());
        assert!(rel.is_empty());
        assert_eq!(rel.add(3, 0), Err(MalcevError::element(3, 3)));
    }

    #[test]
    fn test_compose_chain() {
        let r = BinaryRelation::from_pairs(3, [(0, 1)]).unwrap();
        let s = BinaryRelation::from_pairs(3, [(0, 1), (1, 2)]).unwrap();
        let rs = r.compose(&s).unwrap();
        assert_eq!(rs.pairs().collect::<Vec<_>>(), vec![(0, 2)]);
    }

    #[test]
    fn test_properties() {
        let id = BinaryRelation::identity(3).unwrap();
        assert!(id.is_equivalence());
        let lt = BinaryRelation::from_pairs(3, [(0, 1), (1, 2), (0, 2)]).unwrap();
        assert!(lt.is_transitive());
        assert!(!lt.is_symmetric());
        assert!(!lt.is_reflexive());
        let path = BinaryRelation::from_pairs(3, [(0, 1), (1, 2)]).unwrap();
        assert!(!path.is_transitive());
        assert_eq!(path.transitive_closure(), lt);
    }

    #[test]
    fn test_partition_round_trip() {
        let p = Partition::from_blocks(4, &[vec![0, 3], vec![1, 2]]).unwrap();
        let rel = BinaryRelation::from(&p);
        assert_eq!(rel.len(), 8);
        assert_eq!(rel.to_partition().unwrap(), p);
        assert!(BinaryRelation::new(2).unwrap().to_partition().is_err());
    }

    #[test]
    fn test_universal_and_converse() {
        let all = BinaryRelation::universal(3).unwrap();
        assert_eq!(all.len(), 9);
        let r = BinaryRelation::from_pairs(3, [(0, 2)]).unwrap();
        assert_eq!(r.converse().pairs().collect::<Vec<_>>(), vec![(2, 0)]);
        assert_eq!(r.union(&r.converse()).unwrap().len(), 2);
        assert!(r.intersection(&r.converse()).unwrap().is_empty());
        assert_eq!(r.to_string(), "{(0,2)}");
    }
}
