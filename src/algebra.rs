//! Finite algebras: the read-only view the engine consumes, plus a concrete
//! table-backed implementation.
//!
//! The engine never loads algebras itself. Anything that can answer
//! "how many elements" and "what are the operations" implements
//! [`AlgebraView`]; [`Algebra`] is the ready-made implementation used by
//! loaders, by the subalgebra construction and by the tests.
//!
//! Operations obey one uniform contract, `evaluate(&[usize]) -> usize`, whatever
//! their arity. Results outside `0..n` are caught lazily by
//! [`AlgebraView::apply`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MalcevError, Result};
use crate::term::is_symbol_name;
use crate::tuples::{table_index, Tuples};

type OpFn = dyn Fn(&[usize]) -> usize + Send + Sync;

#[derive(Clone)]
enum OpKind {
    /// Row-major table over `[0, size)^arity`
    Table { size: usize, values: Vec<usize> },
    Function(Arc<OpFn>),
}

/// A named finitary operation.
#[derive(Clone)]
pub struct Operation {
    symbol: String,
    arity: usize,
    kind: OpKind,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            OpKind::Table { .. } => "table",
            OpKind::Function(_) => "function",
        };
        f.debug_struct("Operation")
            .field("symbol", &self.symbol)
            .field("arity", &self.arity)
            .field("kind", &kind)
            .finish()
    }
}

impl Operation {
    /// Operation given by its full table (row-major, last argument fastest).
    pub fn from_table(
        symbol: impl Into<String>,
        size: usize,
        arity: usize,
        values: Vec<usize>,
    ) -> Result<Self> {
        let symbol = symbol.into();
        let expected = Tuples::total(size, arity);
        if values.len() != expected {
            return Err(MalcevError::InvalidArgument(format!(
                "table for `{symbol}` has {} entries, expected {expected}",
                values.len()
            )));
        }
        Ok(Self {
            symbol,
            arity,
            kind: OpKind::Table { size, values },
        })
    }

    /// Operation computed on demand. Range violations surface at evaluation.
    pub fn from_fn<F>(symbol: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&[usize]) -> usize + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.into(),
            arity,
            kind: OpKind::Function(Arc::new(f)),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Raw evaluation. `args.len()` must equal the arity.
    pub fn evaluate(&self, args: &[usize]) -> usize {
        debug_assert_eq!(args.len(), self.arity, "arity mismatch for {}", self.symbol);
        match &self.kind {
            OpKind::Table { size, values } => values[table_index(*size, args)],
            OpKind::Function(f) => f(args),
        }
    }
}

/// Read-only view of a finite algebra on the universe `0..cardinality()`.
pub trait AlgebraView {
    fn cardinality(&self) -> usize;

    /// The operations, in declaration order.
    fn operations(&self) -> &[Operation];

    /// Position of the operation named `symbol`
    fn operation_index(&self, symbol: &str) -> Option<usize> {
        self.operations().iter().position(|op| op.symbol() == symbol)
    }

    /// Evaluate operation `op` and check the result lies in the universe.
    fn apply(&self, op: usize, args: &[usize]) -> Result<usize> {
        let ops = self.operations();
        let operation = ops.get(op).ok_or(MalcevError::IndexOutOfRange {
            what: "operation",
            index: op,
            bound: ops.len(),
        })?;
        let value = operation.evaluate(args);
        if value >= self.cardinality() {
            return Err(MalcevError::InvalidOperationResult {
                symbol: operation.symbol().to_string(),
                args: args.to_vec(),
                value,
            });
        }
        Ok(value)
    }

    /// Every operation satisfies `f(x,...,x) = x`.
    ///
    /// Constants only count as idempotent on a one-element universe.
    fn is_idempotent(&self) -> Result<bool> {
        let n = self.cardinality();
        for (op_idx, op) in self.operations().iter().enumerate() {
            if op.arity() == 0 {
                if n > 1 {
                    return Ok(false);
                }
                continue;
            }
            let mut args = vec![0; op.arity()];
            for x in 0..n {
                args.fill(x);
                if self.apply(op_idx, &args)? != x {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl<A: AlgebraView + ?Sized> AlgebraView for &A {
    fn cardinality(&self) -> usize {
        (**self).cardinality()
    }

    fn operations(&self) -> &[Operation] {
        (**self).operations()
    }

    fn operation_index(&self, symbol: &str) -> Option<usize> {
        (**self).operation_index(symbol)
    }
}

/// A finite algebra with owned operations.
#[derive(Clone, Debug)]
pub struct Algebra {
    name: String,
    size: usize,
    operations: Vec<Operation>,
    by_symbol: HashMap<String, usize>,
}

impl Algebra {
    /// An algebra on `0..size` with no operations yet.
    pub fn new(name: impl Into<String>, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(MalcevError::InvalidArgument(
                "an algebra needs at least one element".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            size,
            operations: Vec::new(),
            by_symbol: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an already-built operation.
    pub fn with_operation(mut self, op: Operation) -> Result<Self> {
        if !is_symbol_name(op.symbol()) {
            return Err(MalcevError::InvalidArgument(format!(
                "`{}` is not a valid operation symbol",
                op.symbol()
            )));
        }
        if self.by_symbol.contains_key(op.symbol()) {
            return Err(MalcevError::InvalidArgument(format!(
                "duplicate operation symbol `{}`",
                op.symbol()
            )));
        }
        if let OpKind::Table { size, .. } = &op.kind {
            if *size != self.size {
                return Err(MalcevError::SizeMismatch {
                    left: self.size,
                    right: *size,
                });
            }
        }
        self.by_symbol
            .insert(op.symbol().to_string(), self.operations.len());
        self.operations.push(op);
        Ok(self)
    }

    /// Add an operation by table. Entries are range-checked eagerly.
    pub fn with_table(
        self,
        symbol: impl Into<String>,
        arity: usize,
        values: Vec<usize>,
    ) -> Result<Self> {
        let op = Operation::from_table(symbol, self.size, arity, values)?;
        if let OpKind::Table { values, .. } = &op.kind {
            if let Some(pos) = values.iter().position(|&v| v >= self.size) {
                let args = Tuples::new(self.size, arity)
                    .nth(pos)
                    .unwrap_or_default();
                return Err(MalcevError::InvalidOperationResult {
                    symbol: op.symbol().to_string(),
                    args,
                    value: values[pos],
                });
            }
        }
        self.with_operation(op)
    }

    /// Add an operation given as a closure.
    pub fn with_fn<F>(self, symbol: impl Into<String>, arity: usize, f: F) -> Result<Self>
    where
        F: Fn(&[usize]) -> usize + Send + Sync + 'static,
    {
        self.with_operation(Operation::from_fn(symbol, arity, f))
    }

    /// Tabulate every function-backed operation.
    ///
    /// Fails with `InvalidOperationResult` on the first out-of-range value.
    pub fn tabulated(&self) -> Result<Self> {
        let mut out = Algebra::new(self.name.clone(), self.size)?;
        for (idx, op) in self.operations.iter().enumerate() {
            let mut values = Vec::with_capacity(Tuples::total(self.size, op.arity()));
            let mut tuples = Tuples::new(self.size, op.arity());
            while let Some(args) = tuples.advance() {
                values.push(self.apply(idx, args)?);
            }
            out = out.with_table(op.symbol(), op.arity(), values)?;
        }
        Ok(out)
    }
}

impl AlgebraView for Algebra {
    fn cardinality(&self) -> usize {
        self.size
    }

    fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn operation_index(&self, symbol: &str) -> Option<usize> {
        self.by_symbol.get(symbol).copied()
    }
}

// ============================================================================
// Well-known algebras
// ============================================================================

impl Algebra {
    /// The one-element algebra with a single binary operation.
    pub fn trivial() -> Self {
        Self {
            name: "trivial".to_string(),
            size: 1,
            operations: vec![Operation {
                symbol: "*".to_string(),
                arity: 2,
                kind: OpKind::Table {
                    size: 1,
                    values: vec![0],
                },
            }],
            by_symbol: HashMap::from([("*".to_string(), 0)]),
        }
    }

    /// ℤ/n under addition.
    pub fn cyclic_group(n: usize) -> Result<Self> {
        let values = Tuples::new(n, 2).map(|t| (t[0] + t[1]) % n).collect();
        Algebra::new(format!("Z{n}"), n)?.with_table("+", 2, values)
    }

    /// `0..n` with the unary successor map `x ↦ x+1 mod n`.
    pub fn cyclic_unary(n: usize) -> Result<Self> {
        let values = (0..n).map(|x| (x + 1) % n).collect();
        Algebra::new(format!("C{n}"), n)?.with_table("s", 1, values)
    }

    /// The two-element Boolean algebra with `meet`, `join` and `neg`.
    pub fn boolean_algebra() -> Result<Self> {
        Algebra::new("ba2", 2)?
            .with_table("meet", 2, vec![0, 0, 0, 1])?
            .with_table("join", 2, vec![0, 1, 1, 1])?
            .with_table("neg", 1, vec![1, 0])
    }

    /// A lattice with `meet` and `join` read off a partial order.
    ///
    /// `leq(a, b)` must be a lattice order on `0..n`; otherwise
    /// `InvalidArgument` names the pair lacking a bound.
    pub fn lattice_from_order(
        name: impl Into<String>,
        n: usize,
        leq: impl Fn(usize, usize) -> bool,
    ) -> Result<Self> {
        let mut meet = Vec::with_capacity(n * n);
        let mut join = Vec::with_capacity(n * n);
        for a in 0..n {
            for b in 0..n {
                let uppers: Vec<usize> = (0..n).filter(|&c| leq(a, c) && leq(b, c)).collect();
                let lowers: Vec<usize> = (0..n).filter(|&c| leq(c, a) && leq(c, b)).collect();
                let lub = uppers
                    .iter()
                    .copied()
                    .find(|&c| uppers.iter().all(|&d| leq(c, d)));
                let glb = lowers
                    .iter()
                    .copied()
                    .find(|&c| lowers.iter().all(|&d| leq(d, c)));
                match (lub, glb) {
                    (Some(j), Some(m)) => {
                        join.push(j);
                        meet.push(m);
                    }
                    _ => {
                        return Err(MalcevError::InvalidArgument(format!(
                            "elements {a} and {b} have no least upper or greatest lower bound"
                        )))
                    }
                }
            }
        }
        Algebra::new(name, n)?
            .with_table("meet", 2, meet)?
            .with_table("join", 2, join)
    }

    /// The diamond M3: bottom 0, atoms 1, 2, 3, top 4.
    pub fn lattice_m3() -> Result<Self> {
        Self::lattice_from_order("M3", 5, |a, b| a == b || a == 0 || b == 4)
    }

    /// The pentagon N5: 0 < 1 < 2 < 4 and 0 < 3 < 4.
    pub fn lattice_n5() -> Result<Self> {
        Self::lattice_from_order("N5", 5, |a, b| {
            a == b || a == 0 || b == 4 || (a == 1 && b == 2)
        })
    }

    /// The chain `0 < 1 < ... < n-1`.
    pub fn lattice_chain(n: usize) -> Result<Self> {
        Self::lattice_from_order(format!("chain{n}"), n, |a, b| a <= b)
    }
}
