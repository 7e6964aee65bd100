//! Malcev: congruences and Maltsev conditions for finite algebras
//!
//! A finite algebra is a universe `{0, .., n-1}` with a list of operations.
//! This crate computes its congruences (principal ones, joins, the whole
//! lattice `Con(A)`) and searches for terms witnessing Maltsev conditions:
//! Maltsev, majority, minority, Pixley and near-unanimity terms, Jónsson and
//! Day chains, SD(∧) terms, and Day quadruples in the square.
//!
//! Long computations are bounded by explicit limits and can be observed and
//! cancelled through a [`Monitor`].

pub mod algebra;
pub mod cc;
pub mod error;
pub mod lattice;
pub mod malcev;
pub mod partition;
pub mod progress;
pub mod relation;
pub mod subalgebra;
pub mod term;
pub mod tuples;

pub use algebra::{Algebra, AlgebraView, Operation};
pub use cc::{close, join_congruences, principal_congruence, Congruence, CongruenceClosure};
pub use error::{MalcevError, Result};
pub use lattice::{CongruenceLattice, LatticeConfig, SdFailure};
pub use malcev::{MalcevSearch, Outcome, Reason, SearchConfig, TermChain};
pub use partition::Partition;
pub use progress::{CancelToken, Monitor};
pub use relation::BinaryRelation;
pub use subalgebra::SquareSubalgebra;
pub use term::eval::Evaluator;
pub use term::{TermArena, TermId};
pub use tuples::Tuples;

/// Parse a term into a fresh arena.
pub fn parse_term(input: &str) -> Result<(TermArena, TermId)> {
    let mut arena = TermArena::new();
    let t = arena.parse(input)?;
    Ok((arena, t))
}
