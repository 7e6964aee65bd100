//! The congruence lattice `Con(A)` of a finite algebra.
//!
//! # Construction
//!
//! ```text
//! L := {0} ∪ { Cg(a,b) : a < b }            (deduplicated)
//! repeat:
//!     for θ, φ in L with at least one of them new last round:
//!         L := L ∪ { θ ∨ φ }
//! until no round adds anything
//! ```
//!
//! Every congruence is the join of the principal congruences below it, so the
//! fixpoint is all of `Con(A)`; it is closed under meet as well. Joins are
//! computed by [`join_congruences`], which re-closes the block union from the
//! merged pairs.
//!
//! Construction is lazy: the first query builds the lattice. A [`Monitor`]
//! is checkpointed once per round; if it reports cancellation (or a ceiling in
//! [`LatticeConfig`] is hit) the lattice is left *incomplete* and every query
//! fails with [`MalcevError::Incomplete`] until [`CongruenceLattice::rebuild`].

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::algebra::AlgebraView;
use crate::cc::{join_congruences, principal_congruence, Congruence};
use crate::error::{MalcevError, Result};
use crate::progress::{CancelToken, Monitor};

/// Resource ceilings for lattice construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LatticeConfig {
    /// Maximum number of distinct congruences
    pub max_congruences: usize,
    /// Maximum number of join rounds
    pub max_rounds: usize,
}

impl LatticeConfig {
    pub fn new(max_congruences: usize, max_rounds: usize) -> Self {
        Self {
            max_congruences,
            max_rounds,
        }
    }

    /// A small ceiling for interactive use
    pub fn quick() -> Self {
        Self::new(1_000, 100)
    }
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self::new(100_000, 1_000)
    }
}

/// A triple of congruence indices `(α, β, γ)` witnessing a failure of
/// semidistributivity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdFailure {
    pub alpha: usize,
    pub beta: usize,
    pub gamma: usize,
}

/// Finished, read-only lattice data.
#[derive(Debug)]
struct Built {
    congruences: IndexSet<Congruence>,
    /// `(a, b)` with `a < b` → index of `Cg(a, b)`
    principals: HashMap<(usize, usize), usize>,
    /// Row-major `k × k` order matrix
    order: Vec<bool>,
    covers: Vec<(usize, usize)>,
    zero: usize,
    one: usize,
    /// Join and meet tables, filled on first use
    tables: Option<(Vec<usize>, Vec<usize>)>,
}

impl Built {
    fn size(&self) -> usize {
        self.congruences.len()
    }

    fn check(&self, i: usize) -> Result<()> {
        if i >= self.size() {
            Err(MalcevError::congruence(i, self.size()))
        } else {
            Ok(())
        }
    }

    #[inline]
    fn leq(&self, i: usize, j: usize) -> bool {
        self.order[i * self.size() + j]
    }

    fn lookup(&self, c: &Congruence) -> Result<usize> {
        // The set is closed under join and meet; a miss means it was not built
        self.congruences.get_index_of(c).ok_or(MalcevError::Incomplete)
    }

    fn compute_join(&self, i: usize, j: usize) -> Result<usize> {
        if self.leq(i, j) {
            return Ok(j);
        }
        if self.leq(j, i) {
            return Ok(i);
        }
        let p = self.congruences[i].join(&self.congruences[j])?;
        self.congruences
            .iter()
            .position(|c| *c.partition() == p)
            .ok_or(MalcevError::Incomplete)
    }

    fn compute_meet(&self, i: usize, j: usize) -> Result<usize> {
        if self.leq(i, j) {
            return Ok(i);
        }
        if self.leq(j, i) {
            return Ok(j);
        }
        let m = self.congruences[i].meet(&self.congruences[j])?;
        self.lookup(&m)
    }

    fn ensure_tables(&mut self) -> Result<()> {
        if self.tables.is_some() {
            return Ok(());
        }
        let k = self.size();
        let mut joins = vec![0; k * k];
        let mut meets = vec![0; k * k];
        for i in 0..k {
            for j in i..k {
                let jn = self.compute_join(i, j)?;
                let mt = self.compute_meet(i, j)?;
                joins[i * k + j] = jn;
                joins[j * k + i] = jn;
                meets[i * k + j] = mt;
                meets[j * k + i] = mt;
            }
        }
        self.tables = Some((joins, meets));
        Ok(())
    }

    fn tables(&self) -> (&[usize], &[usize]) {
        match &self.tables {
            Some((j, m)) => (j, m),
            None => (&[], &[]),
        }
    }
}

#[derive(Debug)]
enum State {
    Unbuilt,
    Incomplete,
    Complete(Box<Built>),
}

/// Lazily built congruence lattice of one algebra.
pub struct CongruenceLattice<'a, A: AlgebraView + ?Sized> {
    algebra: &'a A,
    config: LatticeConfig,
    monitor: Monitor,
    state: State,
}

impl<A: AlgebraView + ?Sized> std::fmt::Debug for CongruenceLattice<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Unbuilt => "unbuilt".to_string(),
            State::Incomplete => "incomplete".to_string(),
            State::Complete(b) => format!("{} congruences", b.size()),
        };
        f.debug_struct("CongruenceLattice")
            .field("config", &self.config)
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl<'a, A: AlgebraView + ?Sized> CongruenceLattice<'a, A> {
    pub fn new(algebra: &'a A) -> Self {
        Self {
            algebra,
            config: LatticeConfig::default(),
            monitor: Monitor::new(),
            state: State::Unbuilt,
        }
    }

    pub fn with_config(mut self, config: LatticeConfig) -> Self {
        self.config = config;
        self
    }

    /// Called once per construction round with `(fraction, message)`.
    pub fn with_progress_callback<F>(mut self, f: F) -> Self
    where
        F: FnMut(f64, &str) + Send + 'static,
    {
        self.monitor.set_callback(Box::new(f));
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.monitor = std::mem::take(&mut self.monitor).with_cancel_token(token);
        self
    }

    /// Request cancellation; observed at the next checkpoint.
    pub fn cancel(&self) {
        self.monitor.cancel();
    }

    /// A handle for cancelling from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.monitor.cancel_token()
    }

    pub fn algebra(&self) -> &'a A {
        self.algebra
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete(_))
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self.state, State::Incomplete)
    }

    /// Build now if not built yet.
    pub fn build(&mut self) -> Result<()> {
        match self.state {
            State::Complete(_) => Ok(()),
            State::Incomplete => Err(MalcevError::Incomplete),
            State::Unbuilt => match self.construct() {
                Ok(built) => {
                    self.state = State::Complete(Box::new(built));
                    Ok(())
                }
                Err(err) => {
                    debug!(%err, "congruence lattice construction interrupted");
                    self.state = State::Incomplete;
                    Err(err)
                }
            },
        }
    }

    /// Discard any previous (possibly interrupted) build, clear the
    /// cancellation flag and build again.
    pub fn rebuild(&mut self) -> Result<()> {
        self.monitor.cancel_token().reset();
        self.state = State::Unbuilt;
        self.build()
    }

    fn built(&mut self) -> Result<&mut Built> {
        self.build()?;
        match &mut self.state {
            State::Complete(b) => Ok(&mut **b),
            _ => Err(MalcevError::Incomplete),
        }
    }

    fn insert(&self, set: &mut IndexSet<Congruence>, c: Congruence) -> Result<usize> {
        let (idx, inserted) = set.insert_full(c);
        if inserted && set.len() > self.config.max_congruences {
            return Err(MalcevError::ResourceLimitExceeded {
                resource: "congruences",
                limit: self.config.max_congruences,
            });
        }
        Ok(idx)
    }

    fn construct(&mut self) -> Result<Built> {
        let algebra = self.algebra;
        let n = algebra.cardinality();
        debug!(size = n, ops = algebra.operations().len(), "building congruence lattice");

        let mut set: IndexSet<Congruence> = IndexSet::new();
        let zero = self.insert(&mut set, Congruence::zero(n)?)?;
        let mut principals = HashMap::new();
        for a in 0..n {
            for b in a + 1..n {
                let idx = self.insert(&mut set, principal_congruence(algebra, a, b)?)?;
                principals.insert((a, b), idx);
            }
        }
        self.monitor.checkpoint(
            0.0,
            &format!("{} principal congruences", set.len()),
        )?;

        let mut fresh_from = 0;
        let mut round = 0;
        loop {
            if round >= self.config.max_rounds {
                return Err(MalcevError::ResourceLimitExceeded {
                    resource: "lattice rounds",
                    limit: self.config.max_rounds,
                });
            }
            round += 1;
            let before = set.len();
            for j in fresh_from..before {
                for i in 0..j {
                    if set[i].leq(&set[j])? || set[j].leq(&set[i])? {
                        continue;
                    }
                    let joined = join_congruences(algebra, &set[i], &set[j])?;
                    self.insert(&mut set, joined)?;
                }
            }
            trace!(round, size = set.len(), "join round");
            self.monitor.checkpoint(
                before as f64 / set.len() as f64,
                &format!("round {round}: {} congruences", set.len()),
            )?;
            if set.len() == before {
                break;
            }
            fresh_from = before;
        }

        let k = set.len();
        let mut order = vec![false; k * k];
        for i in 0..k {
            for j in 0..k {
                order[i * k + j] = set[i].leq(&set[j])?;
            }
        }
        let one = (0..k)
            .find(|&i| set[i].is_one())
            .ok_or(MalcevError::Incomplete)?;

        let mut covers = Vec::new();
        for lo in 0..k {
            for hi in 0..k {
                if lo == hi || !order[lo * k + hi] {
                    continue;
                }
                let between = (0..k).any(|mid| {
                    mid != lo && mid != hi && order[lo * k + mid] && order[mid * k + hi]
                });
                if !between {
                    covers.push((lo, hi));
                }
            }
        }
        debug!(congruences = k, covers = covers.len(), rounds = round, "congruence lattice complete");

        Ok(Built {
            congruences: set,
            principals,
            order,
            covers,
            zero,
            one,
            tables: None,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of congruences
    pub fn size(&mut self) -> Result<usize> {
        Ok(self.built()?.size())
    }

    /// Snapshot of all congruences; index `i` is congruence `i` everywhere.
    pub fn congruences(&mut self) -> Result<Vec<Congruence>> {
        Ok(self.built()?.congruences.iter().cloned().collect())
    }

    pub fn congruence(&mut self, i: usize) -> Result<Congruence> {
        let built = self.built()?;
        built.check(i)?;
        Ok(built.congruences[i].clone())
    }

    /// Index of `theta`, if it is a congruence of this algebra
    pub fn index_of(&mut self, theta: &Congruence) -> Result<Option<usize>> {
        Ok(self.built()?.congruences.get_index_of(theta))
    }

    /// Index of the identity congruence
    pub fn zero(&mut self) -> Result<usize> {
        Ok(self.built()?.zero)
    }

    /// Index of the universal congruence
    pub fn one(&mut self) -> Result<usize> {
        Ok(self.built()?.one)
    }

    pub fn leq(&mut self, i: usize, j: usize) -> Result<bool> {
        let built = self.built()?;
        built.check(i)?;
        built.check(j)?;
        Ok(built.leq(i, j))
    }

    pub fn join(&mut self, i: usize, j: usize) -> Result<usize> {
        let built = self.built()?;
        built.check(i)?;
        built.check(j)?;
        match &built.tables {
            Some((joins, _)) => Ok(joins[i * built.size() + j]),
            None => built.compute_join(i, j),
        }
    }

    pub fn meet(&mut self, i: usize, j: usize) -> Result<usize> {
        let built = self.built()?;
        built.check(i)?;
        built.check(j)?;
        match &built.tables {
            Some((_, meets)) => Ok(meets[i * built.size() + j]),
            None => built.compute_meet(i, j),
        }
    }

    /// `Cg(a, b)`: looked up when the lattice is built, computed directly
    /// otherwise (without triggering a build).
    pub fn principal_congruence(&mut self, a: usize, b: usize) -> Result<Congruence> {
        let n = self.algebra.cardinality();
        for x in [a, b] {
            if x >= n {
                return Err(MalcevError::element(x, n));
            }
        }
        if let State::Complete(built) = &self.state {
            let idx = if a == b {
                built.zero
            } else {
                built.principals[&(a.min(b), a.max(b))]
            };
            return Ok(built.congruences[idx].clone());
        }
        principal_congruence(self.algebra, a, b)
    }

    /// Index of `Cg(a, b)` in the built lattice
    pub fn principal_index(&mut self, a: usize, b: usize) -> Result<usize> {
        let n = self.algebra.cardinality();
        for x in [a, b] {
            if x >= n {
                return Err(MalcevError::element(x, n));
            }
        }
        let built = self.built()?;
        Ok(if a == b {
            built.zero
        } else {
            built.principals[&(a.min(b), a.max(b))]
        })
    }

    /// All covering pairs `(lower, upper)`.
    pub fn covering_relation(&mut self) -> Result<Vec<(usize, usize)>> {
        Ok(self.built()?.covers.clone())
    }

    /// Congruences covering the identity
    pub fn atoms(&mut self) -> Result<Vec<usize>> {
        let built = self.built()?;
        Ok(built
            .covers
            .iter()
            .filter(|&&(lo, _)| lo == built.zero)
            .map(|&(_, hi)| hi)
            .collect())
    }

    /// Congruences covered by the universal congruence
    pub fn coatoms(&mut self) -> Result<Vec<usize>> {
        let built = self.built()?;
        Ok(built
            .covers
            .iter()
            .filter(|&&(_, hi)| hi == built.one)
            .map(|&(lo, _)| lo)
            .collect())
    }

    /// Elements with exactly one lower cover
    pub fn join_irreducibles(&mut self) -> Result<Vec<usize>> {
        let built = self.built()?;
        let mut lower = vec![0usize; built.size()];
        for &(_, hi) in &built.covers {
            lower[hi] += 1;
        }
        Ok((0..built.size()).filter(|&i| lower[i] == 1).collect())
    }

    /// Elements with exactly one upper cover
    pub fn meet_irreducibles(&mut self) -> Result<Vec<usize>> {
        let built = self.built()?;
        let mut upper = vec![0usize; built.size()];
        for &(lo, _) in &built.covers {
            upper[lo] += 1;
        }
        Ok((0..built.size()).filter(|&i| upper[i] == 1).collect())
    }

    fn with_tables(&mut self) -> Result<(&[usize], &[usize], usize)> {
        let built = self.built()?;
        built.ensure_tables()?;
        let k = built.size();
        let (j, m) = built.tables();
        Ok((j, m, k))
    }

    /// `a ∧ (b ∨ c) = (a ∧ b) ∨ (a ∧ c)` for all triples.
    pub fn is_distributive(&mut self) -> Result<bool> {
        let (join, meet, k) = self.with_tables()?;
        for a in 0..k {
            for b in 0..k {
                for c in 0..k {
                    let lhs = meet[a * k + join[b * k + c]];
                    let rhs = join[meet[a * k + b] * k + meet[a * k + c]];
                    if lhs != rhs {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// `a ≤ c ⇒ a ∨ (b ∧ c) = (a ∨ b) ∧ c` for all triples.
    pub fn is_modular(&mut self) -> Result<bool> {
        let (join, meet, k) = self.with_tables()?;
        for a in 0..k {
            for c in 0..k {
                // a ≤ c iff a ∨ c = c
                if join[a * k + c] != c {
                    continue;
                }
                for b in 0..k {
                    let lhs = join[a * k + meet[b * k + c]];
                    let rhs = meet[join[a * k + b] * k + c];
                    if lhs != rhs {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// First `(α, β, γ)` with `α∧β = α∧γ` but `α∧(β∨γ) ≠ α∧β`.
    pub fn find_sd_meet_failure(&mut self) -> Result<Option<SdFailure>> {
        let (join, meet, k) = self.with_tables()?;
        for alpha in 0..k {
            for beta in 0..k {
                for gamma in beta + 1..k {
                    let ab = meet[alpha * k + beta];
                    if ab != meet[alpha * k + gamma] {
                        continue;
                    }
                    if meet[alpha * k + join[beta * k + gamma]] != ab {
                        return Ok(Some(SdFailure { alpha, beta, gamma }));
                    }
                }
            }
        }
        Ok(None)
    }

    /// First `(α, β, γ)` with `α∨β = α∨γ` but `α∨(β∧γ) ≠ α∨β`.
    pub fn find_sd_join_failure(&mut self) -> Result<Option<SdFailure>> {
        let (join, meet, k) = self.with_tables()?;
        for alpha in 0..k {
            for beta in 0..k {
                for gamma in beta + 1..k {
                    let ab = join[alpha * k + beta];
                    if ab != join[alpha * k + gamma] {
                        continue;
                    }
                    if join[alpha * k + meet[beta * k + gamma]] != ab {
                        return Ok(Some(SdFailure { alpha, beta, gamma }));
                    }
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Algebra;

    #[test]
    fn test_lazy_build() {
        let z3 = Algebra::cyclic_group(3).unwrap();
        let mut lat = CongruenceLattice::new(&z3);
        assert!(!lat.is_complete());
        assert_eq!(lat.size().unwrap(), 2);
        assert!(lat.is_complete());
    }

    #[test]
    fn test_chain_lattice_is_boolean() {
        // Con of a 3-chain is the 4-element Boolean lattice
        let chain = Algebra::lattice_chain(3).unwrap();
        let mut lat = CongruenceLattice::new(&chain);
        assert_eq!(lat.size().unwrap(), 4);
        assert_eq!(lat.atoms().unwrap().len(), 2);
        assert_eq!(lat.coatoms().unwrap().len(), 2);
        assert_eq!(lat.covering_relation().unwrap().len(), 4);
        assert!(lat.is_distributive().unwrap());
        assert!(lat.is_modular().unwrap());
        assert_eq!(lat.find_sd_meet_failure().unwrap(), None);
    }

    #[test]
    fn test_z2_squared_lattice_is_m3() {
        // Klein four-group: three subgroups of order 2 give Con ≅ M3
        let v4 = Algebra::new("V4", 4)
            .unwrap()
            .with_fn("+", 2, |a| a[0] ^ a[1])
            .unwrap();
        let mut lat = CongruenceLattice::new(&v4);
        assert_eq!(lat.size().unwrap(), 5);
        assert_eq!(lat.atoms().unwrap().len(), 3);
        assert!(lat.is_modular().unwrap());
        assert!(!lat.is_distributive().unwrap());
        assert!(lat.find_sd_meet_failure().unwrap().is_some());
        assert!(lat.find_sd_join_failure().unwrap().is_some());
        assert_eq!(lat.join_irreducibles().unwrap().len(), 3);
    }

    #[test]
    fn test_principal_lookup_matches_closure() {
        let chain = Algebra::lattice_chain(4).unwrap();
        let mut lat = CongruenceLattice::new(&chain);
        let direct = lat.principal_congruence(1, 3).unwrap();
        assert!(!lat.is_complete());
        lat.build().unwrap();
        assert_eq!(lat.principal_congruence(3, 1).unwrap(), direct);
        let idx = lat.principal_index(1, 3).unwrap();
        assert_eq!(lat.congruence(idx).unwrap(), direct);
        assert_eq!(lat.principal_index(2, 2).unwrap(), lat.zero().unwrap());
    }

    #[test]
    fn test_index_errors() {
        let z3 = Algebra::cyclic_group(3).unwrap();
        let mut lat = CongruenceLattice::new(&z3);
        assert_eq!(lat.join(0, 7), Err(MalcevError::congruence(7, 2)));
        assert!(lat.principal_congruence(0, 3).is_err());
    }

    #[test]
    fn test_cancel_leaves_lattice_incomplete() {
        let chain = Algebra::lattice_chain(4).unwrap();
        let mut lat = CongruenceLattice::new(&chain);
        lat.cancel();
        assert_eq!(lat.build(), Err(MalcevError::Cancelled));
        assert!(lat.is_incomplete());
        assert_eq!(lat.size(), Err(MalcevError::Incomplete));
        lat.rebuild().unwrap();
        assert_eq!(lat.size().unwrap(), 8);
    }

    #[test]
    fn test_ceiling() {
        let chain = Algebra::lattice_chain(4).unwrap();
        let mut lat = CongruenceLattice::new(&chain).with_config(LatticeConfig::new(3, 10));
        assert!(matches!(
            lat.build(),
            Err(MalcevError::ResourceLimitExceeded { resource: "congruences", limit: 3 })
        ));
        assert!(lat.is_incomplete());
    }
}
