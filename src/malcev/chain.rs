//! Chains of terms joined by alternating identities.
//!
//! Jónsson terms and Day terms share one shape: every member satisfies some
//! fixed identities, the first member is one projection and the last another,
//! and consecutive members agree on the *even* pattern after an even index and
//! on the *odd* pattern after an odd one. Given the restricted tables generated
//! so far, the shortest chain is a breadth-first search over
//! `(table, parity)` states, where a step moves to any member with the same
//! values on that parity's pattern.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use tracing::{debug, trace};

use super::clone::{CloneGenerator, Round};
use super::identity::{Domain, Equation};
use super::{MalcevSearch, Outcome, Reason, TermChain};
use crate::algebra::AlgebraView;
use crate::error::{MalcevError, Result};
use crate::term::eval::Evaluator;
use crate::term::{TermArena, TermId};
use crate::tuples::Tuples;

/// A family of term chains.
#[derive(Clone, Debug)]
pub struct ChainShape {
    pub name: String,
    pub arity: usize,
    /// Number of identity variables
    pub vars: usize,
    /// Identities each member satisfies
    pub fixed: Vec<Equation>,
    /// `d_i(even) = d_{i+1}(even)` for even `i`
    pub even: Vec<usize>,
    /// `d_i(odd) = d_{i+1}(odd)` for odd `i`
    pub odd: Vec<usize>,
    /// `d_0` is this projection
    pub first: usize,
    /// `d_k` is this projection
    pub last: usize,
}

impl ChainShape {
    /// `d_0 = x`, `d_k = z`, `d_i(x,y,x) = x`,
    /// `d_i(x,x,z) = d_{i+1}(x,x,z)` (even `i`),
    /// `d_i(x,z,z) = d_{i+1}(x,z,z)` (odd `i`).
    pub fn jonsson() -> Self {
        Self {
            name: "Jónsson".to_string(),
            arity: 3,
            vars: 3,
            fixed: vec![Equation::new([0, 1, 0], 0)],
            even: vec![0, 0, 2],
            odd: vec![0, 2, 2],
            first: 0,
            last: 2,
        }
    }

    /// `m_0 = x`, `m_k = u`, `m_i(x,y,y,x) = x`,
    /// `m_i(x,x,u,u) = m_{i+1}(x,x,u,u)` (even `i`),
    /// `m_i(x,y,y,u) = m_{i+1}(x,y,y,u)` (odd `i`).
    pub fn day() -> Self {
        Self {
            name: "Day".to_string(),
            arity: 4,
            vars: 4,
            fixed: vec![Equation::new([0, 1, 1, 0], 0)],
            even: vec![0, 0, 3, 3],
            odd: vec![0, 1, 1, 3],
            first: 0,
            last: 3,
        }
    }

    fn patterns(&self) -> Vec<&[usize]> {
        self.fixed
            .iter()
            .map(|e| e.pattern.as_slice())
            .chain([self.even.as_slice(), self.odd.as_slice()])
            .collect()
    }

    pub fn domain(&self, n: usize) -> Domain {
        Domain::from_patterns(n, self.arity, self.vars, &self.patterns())
    }

    /// Exhaustive check of a chain `d_0, ..., d_k` against every identity.
    pub fn holds<A: AlgebraView + ?Sized>(
        &self,
        algebra: &A,
        arena: &TermArena,
        chain: &[TermId],
    ) -> Result<bool> {
        if chain.len() < 2 {
            return Ok(false);
        }
        let mut ev = Evaluator::new(algebra, arena);
        let compiled = chain
            .iter()
            .map(|&t| ev.compile(t))
            .collect::<Result<Vec<_>>>()?;
        let (head, tail) = (&compiled[0], &compiled[compiled.len() - 1]);
        let patterns = self.patterns();
        let mut tuple = Vec::with_capacity(self.arity);
        let mut assignments = Tuples::new(algebra.cardinality(), self.vars);
        while let Some(v) = assignments.advance() {
            for pattern in &patterns {
                tuple.clear();
                tuple.extend(pattern.iter().map(|&p| v[p]));
                if ev.run(head, &tuple)? != tuple[self.first]
                    || ev.run(tail, &tuple)? != tuple[self.last]
                {
                    return Ok(false);
                }
            }
            for eq in &self.fixed {
                tuple.clear();
                tuple.extend(eq.pattern.iter().map(|&p| v[p]));
                for d in &compiled {
                    if ev.run(d, &tuple)? != v[eq.rhs] {
                        return Ok(false);
                    }
                }
            }
            for (i, pair) in compiled.windows(2).enumerate() {
                let pattern = if i % 2 == 0 { &self.even } else { &self.odd };
                tuple.clear();
                tuple.extend(pattern.iter().map(|&p| v[p]));
                if ev.run(&pair[0], &tuple)? != ev.run(&pair[1], &tuple)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Domain positions a [`ChainShape`] inspects.
#[derive(Clone, Debug)]
pub(crate) struct ChainIndex {
    /// `(point, required value)` for the fixed identities
    fixed: Vec<(usize, usize)>,
    /// Points of the even and odd link patterns
    links: [Vec<usize>; 2],
}

impl ChainIndex {
    pub(crate) fn new(shape: &ChainShape, domain: &Domain, n: usize) -> Self {
        let mut fixed: HashMap<usize, usize> = HashMap::new();
        let mut even = IndexSet::new();
        let mut odd = IndexSet::new();
        let mut tuple = Vec::with_capacity(shape.arity);
        let mut assignments = Tuples::new(n, shape.vars);
        while let Some(v) = assignments.advance() {
            for eq in &shape.fixed {
                tuple.clear();
                tuple.extend(eq.pattern.iter().map(|&p| v[p]));
                if let Some(idx) = domain.index_of(&tuple) {
                    fixed.insert(idx, v[eq.rhs]);
                }
            }
            for (pattern, points) in [(&shape.even, &mut even), (&shape.odd, &mut odd)] {
                tuple.clear();
                tuple.extend(pattern.iter().map(|&p| v[p]));
                if let Some(idx) = domain.index_of(&tuple) {
                    points.insert(idx);
                }
            }
        }
        let mut fixed: Vec<(usize, usize)> = fixed.into_iter().collect();
        fixed.sort_unstable();
        Self {
            fixed,
            links: [even.into_iter().collect(), odd.into_iter().collect()],
        }
    }

    fn is_member(&self, table: &[usize]) -> bool {
        self.fixed.iter().all(|&(p, v)| table[p] == v)
    }

    fn key(&self, table: &[usize], parity: usize) -> Vec<usize> {
        self.links[parity].iter().map(|&p| table[p]).collect()
    }

    /// Table indices `first = d_0, ..., d_k = last` of a shortest chain among
    /// the tables generated so far.
    pub(crate) fn shortest_chain(
        &self,
        gen: &CloneGenerator,
        first: usize,
        last: usize,
    ) -> Option<Vec<usize>> {
        let members: Vec<usize> = (0..gen.len())
            .filter(|&i| self.is_member(gen.table(i)))
            .collect();
        if !members.contains(&first) || !members.contains(&last) {
            return None;
        }
        let mut groups: [HashMap<Vec<usize>, Vec<usize>>; 2] = [HashMap::new(), HashMap::new()];
        for &m in &members {
            for (parity, group) in groups.iter_mut().enumerate() {
                group.entry(self.key(gen.table(m), parity)).or_default().push(m);
            }
        }

        let start = (first, 0);
        let mut parent: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        let mut visited: HashSet<(usize, usize)> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some((c, parity)) = queue.pop_front() {
            let key = self.key(gen.table(c), parity);
            let Some(next) = groups[parity].get(&key) else {
                continue;
            };
            for &d in next {
                let state = (d, 1 - parity);
                if !visited.insert(state) {
                    continue;
                }
                parent.insert(state, (c, parity));
                if d == last {
                    let mut path = vec![d];
                    let mut cur = state;
                    while let Some(&prev) = parent.get(&cur) {
                        path.push(prev.0);
                        cur = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(state);
            }
        }
        None
    }
}

impl<A: AlgebraView + ?Sized> MalcevSearch<'_, A> {
    /// Shortest Jónsson chain `x = d_0, d_1, ..., d_k = z`.
    pub fn jonsson_terms(&mut self) -> Result<Outcome<TermChain>> {
        self.find_chain(&ChainShape::jonsson())
    }

    /// Number of links in the shortest Jónsson chain, `-1` when none was found.
    pub fn jonsson_level(&mut self) -> Result<i64> {
        Ok(self.jonsson_terms()?.level())
    }

    /// Shortest chain of Day terms `x = m_0, ..., m_k = u`.
    pub fn day_terms(&mut self) -> Result<Outcome<TermChain>> {
        self.find_chain(&ChainShape::day())
    }

    /// Number of links in the shortest Day chain, `-1` when none was found.
    pub fn day_level(&mut self) -> Result<i64> {
        Ok(self.day_terms()?.level())
    }

    /// Grow term operations depth by depth and keep the shortest chain of
    /// `shape` seen at any depth.
    ///
    /// Finding a chain does not end the search: deeper terms can close a
    /// shorter one. The search stops once the clone is exhausted, the depth
    /// bound is reached, or the chain has two links. One link is only
    /// possible between the two projections themselves, which depth 0
    /// already settles. Hitting the term ceiling after a chain was found
    /// returns that chain.
    pub fn find_chain(&mut self, shape: &ChainShape) -> Result<Outcome<TermChain>> {
        let algebra = self.algebra;
        let n = algebra.cardinality();
        let domain = shape.domain(n);
        debug!(shape = %shape.name, points = domain.len(), "searching for term chain");
        let index = ChainIndex::new(shape, &domain, n);
        let first_table = domain.projection(shape.first);
        let last_table = domain.projection(shape.last);
        let mut gen = CloneGenerator::new(domain, &mut self.arena);
        let (Some(first), Some(last)) = (gen.position(&first_table), gen.position(&last_table))
        else {
            return Err(MalcevError::Incomplete);
        };

        let mut best: Option<Vec<TermId>> = None;
        let reason = loop {
            if let Some(path) = index.shortest_chain(&gen, first, last) {
                if best.as_ref().map_or(true, |b| path.len() < b.len()) {
                    trace!(
                        shape = %shape.name,
                        level = path.len() - 1,
                        depth = gen.depth(),
                        "shorter term chain"
                    );
                    best = Some(path.iter().map(|&i| gen.term(i)).collect());
                }
            }
            if best.as_ref().is_some_and(|b| b.len() <= 3) {
                break Reason::Exhausted;
            }
            if gen.depth() >= self.config.max_depth {
                debug!(shape = %shape.name, depth = gen.depth(), "term chain search hit depth bound");
                break Reason::BoundReached;
            }
            let round = match gen.next_level(
                algebra,
                &mut self.arena,
                &self.config,
                &mut self.monitor,
                &mut |_| false,
            ) {
                Ok(round) => round,
                Err(MalcevError::ResourceLimitExceeded { limit, .. }) if best.is_some() => {
                    debug!(shape = %shape.name, limit, "term ceiling reached, keeping best chain");
                    break Reason::BoundReached;
                }
                Err(e) => return Err(e),
            };
            trace!(shape = %shape.name, ?round, "chain search round");
            if round == Round::Exhausted {
                break Reason::Exhausted;
            }
        };

        let Some(mut terms) = best else {
            debug!(shape = %shape.name, ?reason, "no term chain");
            return Ok(Outcome::NotFound(reason));
        };
        let k = terms.len() - 1;
        // The ends are the named projections even when tables coincide
        terms[0] = self.arena.make_variable(shape.first);
        terms[k] = self.arena.make_variable(shape.last);
        if !shape.holds(algebra, &self.arena, &terms)? {
            return Err(MalcevError::InvalidArgument(format!(
                "{} chain of length {k} failed re-verification",
                shape.name
            )));
        }
        debug!(shape = %shape.name, level = k, depth = gen.depth(), "found term chain");
        Ok(Outcome::Found(TermChain { terms }))
    }
}
