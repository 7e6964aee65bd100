//! Partitions of a finite universe `0..n`.
//!
//! A [`Partition`] stores, for every element, the least element of its block.
//! That labeling is canonical, so the derived `Eq`/`Hash` agree with equality
//! of normalized block lists (elements sorted within blocks, blocks sorted by
//! minimum), and partitions can be interned directly.
//!
//! Partitions are only mutated through [`Partition::union`] while a closure is
//! being computed; everything handed out afterwards is an owned value.

use std::collections::HashMap;
use std::fmt;

use egglog_union_find::UnionFind;

use crate::error::{MalcevError, Result};

/// An equivalence relation on `0..n`, as a normalized block labeling.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    /// `reps[i]` = least element of the block containing `i`
    reps: Vec<usize>,
}

impl Partition {
    /// The identity partition (all singletons).
    pub fn zero(n: usize) -> Result<Self> {
        check_size(n)?;
        Ok(Self {
            reps: (0..n).collect(),
        })
    }

    /// The universal partition (one block).
    pub fn one(n: usize) -> Result<Self> {
        check_size(n)?;
        Ok(Self { reps: vec![0; n] })
    }

    /// Build from explicit blocks, which must be disjoint and cover `0..n`.
    pub fn from_blocks(n: usize, blocks: &[Vec<usize>]) -> Result<Self> {
        check_size(n)?;
        let mut labels = vec![usize::MAX; n];
        for (b, block) in blocks.iter().enumerate() {
            for &x in block {
                if x >= n {
                    return Err(MalcevError::element(x, n));
                }
                if labels[x] != usize::MAX {
                    return Err(MalcevError::InvalidArgument(format!(
                        "element {x} appears in more than one block"
                    )));
                }
                labels[x] = b;
            }
        }
        if let Some(missing) = labels.iter().position(|&l| l == usize::MAX) {
            return Err(MalcevError::InvalidArgument(format!(
                "element {missing} is not covered by any block"
            )));
        }
        Self::from_labels(&labels)
    }

    /// Elements with equal labels share a block. Labels are arbitrary.
    pub fn from_labels(labels: &[usize]) -> Result<Self> {
        check_size(labels.len())?;
        let mut first: HashMap<usize, usize> = HashMap::new();
        let reps = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| *first.entry(label).or_insert(i))
            .collect();
        Ok(Self { reps })
    }

    /// Snapshot a union-find over `0..n` as a partition.
    pub(crate) fn from_union_find(uf: &mut UnionFind<usize>, n: usize) -> Self {
        let labels: Vec<usize> = (0..n).map(|i| uf.find(i)).collect();
        let mut first: HashMap<usize, usize> = HashMap::new();
        let reps = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| *first.entry(label).or_insert(i))
            .collect();
        Self { reps }
    }

    /// Size of the universe
    pub fn size(&self) -> usize {
        self.reps.len()
    }

    fn check(&self, a: usize) -> Result<()> {
        if a >= self.reps.len() {
            Err(MalcevError::element(a, self.reps.len()))
        } else {
            Ok(())
        }
    }

    fn check_same_size(&self, other: &Partition) -> Result<()> {
        if self.size() != other.size() {
            return Err(MalcevError::SizeMismatch {
                left: self.size(),
                right: other.size(),
            });
        }
        Ok(())
    }

    /// Least element of the block of `a`.
    pub fn find(&self, a: usize) -> Result<usize> {
        self.check(a)?;
        Ok(self.reps[a])
    }

    /// Unchecked `find`, for loops that already range over `0..n`.
    #[inline]
    pub(crate) fn rep(&self, a: usize) -> usize {
        self.reps[a]
    }

    pub fn is_related(&self, a: usize, b: usize) -> Result<bool> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.reps[a] == self.reps[b])
    }

    #[inline]
    pub(crate) fn related(&self, a: usize, b: usize) -> bool {
        self.reps[a] == self.reps[b]
    }

    /// Merge the blocks of `a` and `b`. Returns whether anything changed.
    pub fn union(&mut self, a: usize, b: usize) -> Result<bool> {
        self.check(a)?;
        self.check(b)?;
        let (ra, rb) = (self.reps[a], self.reps[b]);
        if ra == rb {
            return Ok(false);
        }
        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
        for r in self.reps.iter_mut().skip(drop) {
            if *r == drop {
                *r = keep;
            }
        }
        Ok(true)
    }

    /// Blocks, sorted within and ordered by least element.
    pub fn blocks(&self) -> Vec<Vec<usize>> {
        let mut index: HashMap<usize, usize> = HashMap::new();
        let mut blocks: Vec<Vec<usize>> = Vec::new();
        for (i, &r) in self.reps.iter().enumerate() {
            let b = *index.entry(r).or_insert_with(|| {
                blocks.push(Vec::new());
                blocks.len() - 1
            });
            blocks[b].push(i);
        }
        blocks
    }

    pub fn number_of_blocks(&self) -> usize {
        self.reps.iter().enumerate().filter(|&(i, &r)| i == r).count()
    }

    /// `n - number_of_blocks`, the height in the partition lattice.
    pub fn rank(&self) -> usize {
        self.size() - self.number_of_blocks()
    }

    pub fn is_zero(&self) -> bool {
        self.reps.iter().enumerate().all(|(i, &r)| i == r)
    }

    pub fn is_one(&self) -> bool {
        self.reps.iter().all(|&r| r == 0)
    }

    /// Finer-than: every block of `self` lies inside a block of `other`.
    pub fn leq(&self, other: &Partition) -> Result<bool> {
        self.check_same_size(other)?;
        Ok(self
            .reps
            .iter()
            .enumerate()
            .all(|(i, &r)| other.reps[i] == other.reps[r]))
    }

    /// Least partition above both.
    pub fn join(&self, other: &Partition) -> Result<Partition> {
        self.check_same_size(other)?;
        let n = self.size();
        let mut uf: UnionFind<usize> = UnionFind::default();
        for i in 0..n {
            uf.union(i, self.reps[i]);
            uf.union(i, other.reps[i]);
        }
        Ok(Self::from_union_find(&mut uf, n))
    }

    /// Greatest partition below both: blocks are the nonempty intersections.
    pub fn meet(&self, other: &Partition) -> Result<Partition> {
        self.check_same_size(other)?;
        let mut first: HashMap<(usize, usize), usize> = HashMap::new();
        let reps = (0..self.size())
            .map(|i| *first.entry((self.reps[i], other.reps[i])).or_insert(i))
            .collect();
        Ok(Self { reps })
    }

    /// Pairs `(a, b)` with `a < b` in the same block
    pub fn related_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.size();
        (0..n).flat_map(move |a| {
            (a + 1..n)
                .filter(move |&b| self.reps[a] == self.reps[b])
                .map(move |b| (a, b))
        })
    }
}

fn check_size(n: usize) -> Result<()> {
    if n == 0 {
        return Err(MalcevError::InvalidArgument(
            "a partition needs a nonempty universe".to_string(),
        ));
    }
    Ok(())
}

/// UACalc block notation, e.g. `|0,1|2|`.
impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|")?;
        for block in self.blocks() {
            let items: Vec<String> = block.iter().map(ToString::to_string).collect();
            write!(f, "{}|", items.join(","))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Partition({self})")
    }
}
