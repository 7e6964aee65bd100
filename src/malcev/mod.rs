//! Bounded search for terms witnessing Maltsev conditions.
//!
//! # Key Types
//!
//! - [`MalcevSearch`]: owns the [`TermArena`] witnesses live in, plus the
//!   bounds and the progress/cancellation [`Monitor`]
//! - [`SearchConfig`]: depth, term-count and checkpoint bounds, with presets
//! - [`Outcome`]: `Found(witness)` or `NotFound(reason)`; "no witness" is a
//!   normal result, never an error
//!
//! # Search
//!
//! Each condition is compiled to a finite [`Domain`](identity::Domain) of
//! argument tuples. Terms are generated breadth-first by depth and compared by
//! their values on that domain only ([`clone`]). The first term (or chain, or
//! pair) meeting the condition in generation order is the witness, and it is
//! re-checked by exhaustive evaluation before it is returned.
//!
//! A depth that produces no new restricted table means every term operation
//! has been seen, so [`Reason::Exhausted`] is a proof of absence;
//! [`Reason::BoundReached`] only means `max_depth` was hit.
//!
//! # Usage
//!
//! ```ignore
//! let ba = Algebra::boolean_algebra()?;
//! let mut search = MalcevSearch::new(&ba);
//! if let Outcome::Found(m) = search.majority_term()? {
//!     println!("majority: {}", search.arena().display(m));
//! }
//! assert_eq!(search.jonsson_level()?, 2);
//! ```

pub mod chain;
pub mod clone;
pub mod day;
pub mod identity;
pub mod sd;

use tracing::debug;

use self::clone::{CloneGenerator, Round};
use self::identity::{Condition, Domain};
use crate::algebra::AlgebraView;
use crate::error::{MalcevError, Result};
use crate::lattice::{CongruenceLattice, LatticeConfig};
use crate::progress::{CancelToken, Monitor};
use crate::term::{TermArena, TermId};

pub use self::chain::ChainShape;
pub use self::day::DayQuadruple;
pub use self::sd::SdTerms;

// ============================================================================
// CONFIGURATION AND OUTCOMES
// ============================================================================

/// Bounds for one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    /// Deepest term generated
    pub max_depth: usize,
    /// Distinct restricted tables kept before giving up
    pub max_terms: usize,
    /// Candidate applications between progress/cancellation checkpoints
    pub checkpoint_interval: usize,
}

impl SearchConfig {
    pub fn new(max_depth: usize, max_terms: usize, checkpoint_interval: usize) -> Self {
        Self {
            max_depth,
            max_terms,
            checkpoint_interval,
        }
    }

    /// Shallow bounds for interactive checks
    pub fn quick() -> Self {
        Self::new(4, 2_000, 1_024)
    }

    /// Deep bounds for conditions with long witnesses
    pub fn thorough() -> Self {
        Self::new(12, 200_000, 16_384)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new(8, 20_000, 4_096)
    }
}

/// Why a search ended without a witness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reason {
    /// `max_depth` was reached; a deeper witness may exist
    BoundReached,
    /// Every term operation was generated; no witness exists
    Exhausted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<W> {
    Found(W),
    NotFound(Reason),
}

impl<W> Outcome<W> {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    /// Absence was proven, not just unobserved
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Outcome::NotFound(Reason::Exhausted))
    }

    pub fn witness(&self) -> Option<&W> {
        match self {
            Outcome::Found(w) => Some(w),
            Outcome::NotFound(_) => None,
        }
    }

    pub fn into_witness(self) -> Option<W> {
        match self {
            Outcome::Found(w) => Some(w),
            Outcome::NotFound(_) => None,
        }
    }
}

/// Terms `d_0, ..., d_k` of a chain condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermChain {
    pub terms: Vec<TermId>,
}

impl TermChain {
    /// Number of links `k`
    pub fn level(&self) -> usize {
        self.terms.len().saturating_sub(1)
    }
}

impl Outcome<TermChain> {
    /// Chain length, or `-1` when nothing was found.
    pub fn level(&self) -> i64 {
        match self {
            Outcome::Found(chain) => chain.level() as i64,
            Outcome::NotFound(_) => -1,
        }
    }
}

// ============================================================================
// SEARCH
// ============================================================================

/// Term searches over one algebra, sharing one arena.
pub struct MalcevSearch<'a, A: AlgebraView + ?Sized> {
    algebra: &'a A,
    arena: TermArena,
    config: SearchConfig,
    lattice_config: LatticeConfig,
    monitor: Monitor,
}

impl<A: AlgebraView + ?Sized> std::fmt::Debug for MalcevSearch<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MalcevSearch")
            .field("config", &self.config)
            .field("terms", &self.arena.len())
            .finish_non_exhaustive()
    }
}

impl<'a, A: AlgebraView + ?Sized> MalcevSearch<'a, A> {
    pub fn new(algebra: &'a A) -> Self {
        Self {
            algebra,
            arena: TermArena::new(),
            config: SearchConfig::default(),
            lattice_config: LatticeConfig::default(),
            monitor: Monitor::new(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Bounds for the congruence lattices the idempotent checks build
    pub fn with_lattice_config(mut self, config: LatticeConfig) -> Self {
        self.lattice_config = config;
        self
    }

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

    pub fn cancel_token(&self) -> CancelToken {
        self.monitor.cancel_token()
    }

    pub fn cancel(&self) {
        self.monitor.cancel();
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn algebra(&self) -> &'a A {
        self.algebra
    }

    /// The arena every returned [`TermId`] belongs to.
    pub fn arena(&self) -> &TermArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut TermArena {
        &mut self.arena
    }

    pub(crate) fn lattice(&self) -> CongruenceLattice<'a, A> {
        CongruenceLattice::new(self.algebra)
            .with_config(self.lattice_config.clone())
            .with_cancel_token(self.monitor.cancel_token())
    }

    pub(crate) fn require_idempotent(&self, operation: &str) -> Result<()> {
        if self.algebra.is_idempotent()? {
            Ok(())
        } else {
            Err(MalcevError::InvalidArgument(format!(
                "{operation} requires an idempotent algebra"
            )))
        }
    }

    // ========================================================================
    // Single-term conditions
    // ========================================================================

    /// First term in generation order satisfying `condition`.
    pub fn find_term(&mut self, condition: &Condition) -> Result<Outcome<TermId>> {
        let algebra = self.algebra;
        let n = algebra.cardinality();
        let domain = Domain::from_patterns(n, condition.arity, condition.vars, &condition.patterns());
        debug!(condition = %condition.name, points = domain.len(), "searching for term");
        let Some(target) = condition.target(&domain, n) else {
            debug!(condition = %condition.name, "identities are inconsistent");
            return Ok(Outcome::NotFound(Reason::Exhausted));
        };

        let mut gen = CloneGenerator::new(domain, &mut self.arena);
        if let Some(i) = gen.position(&target) {
            return self.confirm(condition, gen.term(i), 0);
        }
        loop {
            if gen.depth() >= self.config.max_depth {
                debug!(condition = %condition.name, depth = gen.depth(), "term search hit depth bound");
                return Ok(Outcome::NotFound(Reason::BoundReached));
            }
            let round = gen.next_level(
                algebra,
                &mut self.arena,
                &self.config,
                &mut self.monitor,
                &mut |table| table == target.as_slice(),
            )?;
            match round {
                Round::Hit(i) => return self.confirm(condition, gen.term(i), gen.depth()),
                Round::Grew(_) => {}
                Round::Exhausted => {
                    debug!(condition = %condition.name, terms = gen.len(), "term provably absent");
                    return Ok(Outcome::NotFound(Reason::Exhausted));
                }
            }
        }
    }

    fn confirm(&self, condition: &Condition, term: TermId, depth: usize) -> Result<Outcome<TermId>> {
        if !condition.holds(self.algebra, &self.arena, term)? {
            return Err(MalcevError::InvalidArgument(format!(
                "{} witness {} failed re-verification",
                condition.name,
                self.arena.display(term)
            )));
        }
        debug!(
            condition = %condition.name,
            depth,
            witness = %self.arena.display(term),
            "found term"
        );
        Ok(Outcome::Found(term))
    }

    /// `p(x,y,y) = x`, `p(x,x,y) = y`
    pub fn malcev_term(&mut self) -> Result<Outcome<TermId>> {
        self.find_term(&Condition::maltsev())
    }

    /// `m(x,x,y) = m(x,y,x) = m(y,x,x) = x`
    pub fn majority_term(&mut self) -> Result<Outcome<TermId>> {
        self.find_term(&Condition::majority())
    }

    /// `m(x,y,y) = m(y,x,y) = m(y,y,x) = x`
    pub fn minority_term(&mut self) -> Result<Outcome<TermId>> {
        self.find_term(&Condition::minority())
    }

    /// `p(x,x,y) = y`, `p(x,y,x) = x`, `p(y,x,x) = y`
    pub fn pixley_term(&mut self) -> Result<Outcome<TermId>> {
        self.find_term(&Condition::pixley())
    }

    /// Near-unanimity term of arity `k ≥ 3`.
    pub fn nu_term(&mut self, arity: usize) -> Result<Outcome<TermId>> {
        let condition = Condition::near_unanimity(arity)?;
        self.find_term(&condition)
    }

    // ========================================================================
    // Idempotent algebras
    // ========================================================================

    /// First Day quadruple in the square; see [`day`].
    pub fn find_day_quadruple_in_square(&mut self) -> Result<Option<DayQuadruple>> {
        day::find_day_quadruple_in_square(self.algebra, &mut self.monitor)
    }

    /// `Con(A)` is modular and `A²` has no Day quadruple.
    pub fn is_congruence_modular_idempotent(&mut self) -> Result<bool> {
        self.require_idempotent("is_congruence_modular_idempotent")?;
        if !self.lattice().is_modular()? {
            return Ok(false);
        }
        Ok(self.find_day_quadruple_in_square()?.is_none())
    }

    /// `Con(A)` is distributive and Jónsson terms exist. A search that hits
    /// its depth bound cannot decide and fails with `ResourceLimitExceeded`.
    pub fn is_congruence_dist_idempotent(&mut self) -> Result<bool> {
        self.require_idempotent("is_congruence_dist_idempotent")?;
        if !self.lattice().is_distributive()? {
            return Ok(false);
        }
        match self.jonsson_terms()? {
            Outcome::Found(_) => Ok(true),
            Outcome::NotFound(Reason::Exhausted) => Ok(false),
            Outcome::NotFound(Reason::BoundReached) => Err(MalcevError::ResourceLimitExceeded {
                resource: "term depth",
                limit: self.config.max_depth,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Algebra;
    use crate::term::eval::Evaluator;

    #[test]
    fn test_trivial_algebra_finds_projections() {
        let one = Algebra::trivial();
        let mut search = MalcevSearch::new(&one);
        let x = search.arena_mut().make_variable(0);
        assert_eq!(search.majority_term().unwrap(), Outcome::Found(x));
        assert_eq!(search.malcev_term().unwrap(), Outcome::Found(x));
        assert_eq!(search.jonsson_level().unwrap(), 1);
        assert_eq!(search.day_level().unwrap(), 1);
        assert!(search.sd_terms().unwrap().is_found());
    }

    #[test]
    fn test_group_has_malcev_but_no_majority() {
        let z3 = Algebra::cyclic_group(3).unwrap();
        let mut search = MalcevSearch::new(&z3);
        let p = search.malcev_term().unwrap().into_witness().unwrap();
        assert!(Condition::maltsev().holds(&z3, search.arena(), p).unwrap());
        assert_eq!(
            search.majority_term().unwrap(),
            Outcome::NotFound(Reason::Exhausted)
        );
        // ax + by + cz with a = b = c = 1 and b + c = 0 has no solution mod 3
        assert!(search.minority_term().unwrap().is_exhausted());
    }

    #[test]
    fn test_boolean_majority_is_the_median() {
        let ba = Algebra::boolean_algebra().unwrap();
        let mut search = MalcevSearch::new(&ba);
        let m = search.majority_term().unwrap().into_witness().unwrap();
        let median = search
            .arena_mut()
            .parse("join(join(meet(x,y),meet(y,z)),meet(x,z))")
            .unwrap();
        let mut ev = Evaluator::new(&ba, search.arena());
        assert_eq!(
            ev.term_operation(m, 3).unwrap(),
            ev.term_operation(median, 3).unwrap()
        );
    }

    #[test]
    fn test_depth_bound() {
        let ba = Algebra::boolean_algebra().unwrap();
        let mut search = MalcevSearch::new(&ba).with_config(SearchConfig::new(1, 20_000, 4_096));
        assert_eq!(
            search.majority_term().unwrap(),
            Outcome::NotFound(Reason::BoundReached)
        );
        assert_eq!(search.jonsson_level().unwrap(), -1);
    }

    #[test]
    fn test_nu_arity_checked() {
        let ba = Algebra::boolean_algebra().unwrap();
        let mut search = MalcevSearch::new(&ba);
        assert!(matches!(
            search.nu_term(2),
            Err(MalcevError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_idempotent_checks_reject_groups() {
        let z3 = Algebra::cyclic_group(3).unwrap();
        let mut search = MalcevSearch::new(&z3);
        assert!(matches!(
            search.sd_meet_idempotent(),
            Err(MalcevError::InvalidArgument(_))
        ));
        assert!(matches!(
            search.is_congruence_modular_idempotent(),
            Err(MalcevError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_cancelled_search() {
        let ba = Algebra::boolean_algebra().unwrap();
        let mut search =
            MalcevSearch::new(&ba).with_config(SearchConfig::new(8, 20_000, 1));
        search.cancel();
        assert_eq!(search.nu_term(4), Err(MalcevError::Cancelled));
    }
}
