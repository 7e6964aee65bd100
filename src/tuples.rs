//! Argument-tuple enumeration.
//!
//! Every place that needs "all tuples in `0..base` of length `k`" goes through
//! [`Tuples`], whatever the arity (including `k = 0`, which yields the single
//! empty tuple). Tuples come out in lexicographic order with the last
//! coordinate varying fastest, which is also the row-major order of operation
//! tables.
//!
//! [`Tuples::ranges`] generalizes the odometer to a product of per-position
//! ranges, which the term search uses to enumerate only argument tuples that
//! touch the newest generation.

use std::ops::Range;

/// Lexicographic odometer over a product of ranges, usually `[0, base)^arity`.
#[derive(Clone, Debug)]
pub struct Tuples {
    ranges: Vec<Range<usize>>,
    current: Vec<usize>,
    started: bool,
    done: bool,
}

impl Tuples {
    pub fn new(base: usize, arity: usize) -> Self {
        Self::ranges(vec![0..base; arity])
    }

    /// All `t` with `t[i] ∈ ranges[i]`.
    pub fn ranges(ranges: Vec<Range<usize>>) -> Self {
        Self {
            current: ranges.iter().map(|r| r.start).collect(),
            // Any empty factor empties the product; the empty product has one tuple
            done: ranges.iter().any(|r| r.is_empty()),
            started: false,
            ranges,
        }
    }

    /// Step to the next tuple and borrow it, without allocating.
    pub fn advance(&mut self) -> Option<&[usize]> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(&self.current);
        }
        for i in (0..self.current.len()).rev() {
            self.current[i] += 1;
            if self.current[i] < self.ranges[i].end {
                return Some(&self.current);
            }
            self.current[i] = self.ranges[i].start;
        }
        self.done = true;
        None
    }

    /// Number of tuples, `base^arity`, saturating at `usize::MAX`.
    pub fn total(base: usize, arity: usize) -> usize {
        u32::try_from(arity)
            .ok()
            .and_then(|a| base.checked_pow(a))
            .unwrap_or(usize::MAX)
    }
}

impl Iterator for Tuples {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        self.advance().map(<[usize]>::to_vec)
    }
}

/// Row-major index of `args` in a table over `[0, base)^args.len()`.
#[inline]
pub fn table_index(base: usize, args: &[usize]) -> usize {
    args.iter().fold(0, |acc, &a| acc * base + a)
}
