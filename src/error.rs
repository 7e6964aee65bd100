//! Error type shared by every module of the crate.
//!
//! "No witness" is never an error: searches report it through
//! [`crate::malcev::Outcome`]. Errors here are either contract violations by
//! the caller (bad indices, ill-formed operations) or a computation that was
//! stopped (resource ceiling, cancellation).

use thiserror::Error;

/// Errors produced by closure, lattice construction, evaluation and search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalcevError {
    /// A configured ceiling was hit before the computation finished
    #[error("resource limit exceeded: {resource} (limit {limit})")]
    ResourceLimitExceeded { resource: &'static str, limit: usize },

    /// Cooperative cancellation was observed at a checkpoint
    #[error("computation cancelled")]
    Cancelled,

    /// The congruence lattice was interrupted and must be rebuilt
    #[error("congruence lattice is incomplete; rebuild it before querying")]
    Incomplete,

    /// An operation returned a value outside `0..n`
    #[error("operation `{symbol}` applied to {args:?} returned {value}, outside the universe")]
    InvalidOperationResult {
        symbol: String,
        args: Vec<usize>,
        value: usize,
    },

    /// An element, congruence or variable index was out of bounds
    #[error("{what} index {index} out of range (bound {bound})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two relations over different universes were combined
    #[error("size mismatch: {left} vs {right}")]
    SizeMismatch { left: usize, right: usize },

    /// The assignment does not bind a variable the term uses
    #[error("no value assigned to variable {0}")]
    MissingVariable(usize),

    /// The term uses a symbol the algebra does not declare
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("operation `{symbol}` expects {expected} arguments, got {found}")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },

    /// Term text could not be parsed (message is a rendered report)
    #[error("parse error:\n{0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, MalcevError>;

impl MalcevError {
    pub(crate) fn element(index: usize, bound: usize) -> Self {
        Self::IndexOutOfRange {
            what: "element",
            index,
            bound,
        }
    }

    pub(crate) fn congruence(index: usize, bound: usize) -> Self {
        Self::IndexOutOfRange {
            what: "congruence",
            index,
            bound,
        }
    }

    /// Whether the error means "stopped early" rather than "called wrongly"
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            Self::ResourceLimitExceeded { .. } | Self::Cancelled | Self::Incomplete
        )
    }
}
