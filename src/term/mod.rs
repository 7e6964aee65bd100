//! Hash-consed terms over an algebra's operation symbols.
//!
//! # Key Types
//!
//! - [`TermArena`]: owns every term node; structurally identical subterms are
//!   interned once and share a [`TermId`]
//! - [`TermId`]: a handle into one arena, meaningless for any other
//! - [`TermNode`]: a variable index or an application of a symbol
//!
//! Children are always interned before their parent, so a node's id is larger
//! than the ids of all of its subterms. Traversals rely on that: the reachable
//! nodes of a term, sorted by id, are already in bottom-up order.
//!
//! # Usage
//!
//! ```ignore
//! let mut arena = TermArena::new();
//! let x = arena.make_variable(0);
//! let y = arena.make_variable(1);
//! let t = arena.make_term("meet", &[x, y])?;
//! assert_eq!(arena.to_string(t), "meet(x,y)");
//! assert_eq!(arena.parse("meet(x,y)")?, t);
//! ```

pub mod eval;
pub mod parse;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexSet;

use crate::error::{MalcevError, Result};

static NEXT_ARENA: AtomicU32 = AtomicU32::new(0);

/// Handle to a term in a [`TermArena`].
///
/// Handles are tagged with their arena, and every arena method rejects a
/// handle minted by another arena. A cloned arena keeps its source's tag, so
/// handles taken before the clone work in both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId {
    arena: u32,
    index: usize,
}

impl TermId {
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.index)
    }
}

/// Interned operation symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(usize);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermNode {
    Var(usize),
    App {
        symbol: SymbolId,
        children: Box<[TermId]>,
    },
}

/// Conventional display name of variable `i`: `x, y, z, u, v, w`, then `x6, x7, ...`
pub fn variable_name(i: usize) -> String {
    match i {
        0 => "x".to_string(),
        1 => "y".to_string(),
        2 => "z".to_string(),
        3 => "u".to_string(),
        4 => "v".to_string(),
        5 => "w".to_string(),
        _ => format!("x{i}"),
    }
}

/// Whether `name` can be printed as an operation symbol and read back:
/// nonempty, with no whitespace, parentheses or commas.
pub fn is_symbol_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ','))
}

/// Inverse of [`variable_name`]; also accepts `x0` through `x5`.
pub fn variable_index(name: &str) -> Option<usize> {
    match name {
        "x" => Some(0),
        "y" => Some(1),
        "z" => Some(2),
        "u" => Some(3),
        "v" => Some(4),
        "w" => Some(5),
        _ => {
            let digits = name.strip_prefix('x')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok()
        }
    }
}

/// Arena of hash-consed terms.
#[derive(Clone, Debug)]
pub struct TermArena {
    id: u32,
    nodes: IndexSet<TermNode>,
    symbols: IndexSet<String>,
    /// `depths[i]` = depth of node `i`
    depths: Vec<usize>,
}

impl Default for TermArena {
    fn default() -> Self {
        Self {
            id: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            nodes: IndexSet::new(),
            symbols: IndexSet::new(),
            depths: Vec::new(),
        }
    }
}

impl TermArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct nodes interned so far
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn intern(&mut self, node: TermNode, depth: usize) -> TermId {
        let (idx, inserted) = self.nodes.insert_full(node);
        if inserted {
            self.depths.push(depth);
        }
        TermId {
            arena: self.id,
            index: idx,
        }
    }

    fn check(&self, t: TermId) -> Result<()> {
        if t.arena != self.id {
            return Err(MalcevError::InvalidArgument(format!(
                "term {t} belongs to another arena"
            )));
        }
        if t.index >= self.nodes.len() {
            return Err(MalcevError::IndexOutOfRange {
                what: "term",
                index: t.index,
                bound: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// The variable with index `i`.
    pub fn make_variable(&mut self, i: usize) -> TermId {
        self.intern(TermNode::Var(i), 0)
    }

    /// Intern a symbol without building a term
    pub fn symbol(&mut self, name: &str) -> SymbolId {
        match self.symbols.get_index_of(name) {
            Some(idx) => SymbolId(idx),
            None => SymbolId(self.symbols.insert_full(name.to_string()).0),
        }
    }

    pub fn symbol_name(&self, symbol: SymbolId) -> &str {
        self.symbols
            .get_index(symbol.0)
            .map(String::as_str)
            .unwrap_or("?")
    }

    /// `symbol(children...)`, shared with any existing identical term.
    pub fn make_term(&mut self, symbol: &str, children: &[TermId]) -> Result<TermId> {
        if !is_symbol_name(symbol) {
            return Err(MalcevError::InvalidArgument(format!(
                "`{symbol}` is not a valid operation symbol"
            )));
        }
        let symbol = self.symbol(symbol);
        self.make_app(symbol, children)
    }

    pub fn make_app(&mut self, symbol: SymbolId, children: &[TermId]) -> Result<TermId> {
        if symbol.0 >= self.symbols.len() {
            return Err(MalcevError::IndexOutOfRange {
                what: "symbol",
                index: symbol.0,
                bound: self.symbols.len(),
            });
        }
        let mut depth = 0;
        for &child in children {
            self.check(child)?;
            depth = depth.max(self.depths[child.index]);
        }
        let node = TermNode::App {
            symbol,
            children: children.into(),
        };
        Ok(self.intern(node, depth + 1))
    }

    pub fn node(&self, t: TermId) -> Result<&TermNode> {
        self.check(t)?;
        Ok(&self.nodes[t.index])
    }

    /// Height of the term tree; variables have depth 0, constants depth 1.
    pub fn depth(&self, t: TermId) -> Result<usize> {
        self.check(t)?;
        Ok(self.depths[t.index])
    }

    /// Every node reachable from `t` (including `t`), bottom-up.
    pub fn subterms(&self, t: TermId) -> Result<Vec<TermId>> {
        self.check(t)?;
        let mut seen = BTreeSet::new();
        let mut stack = vec![t];
        while let Some(s) = stack.pop() {
            if !seen.insert(s) {
                continue;
            }
            if let TermNode::App { children, .. } = &self.nodes[s.index] {
                stack.extend(children.iter().copied());
            }
        }
        Ok(seen.into_iter().collect())
    }

    /// Number of distinct nodes in the DAG of `t`.
    pub fn size(&self, t: TermId) -> Result<usize> {
        Ok(self.subterms(t)?.len())
    }

    /// Variable indices occurring in `t`, ascending.
    pub fn variables(&self, t: TermId) -> Result<Vec<usize>> {
        let vars: BTreeSet<usize> = self
            .subterms(t)?
            .into_iter()
            .filter_map(|s| match self.nodes[s.index] {
                TermNode::Var(i) => Some(i),
                TermNode::App { .. } => None,
            })
            .collect();
        Ok(vars.into_iter().collect())
    }

    /// Replace each variable `i` in `mapping` by `mapping[i]`; other
    /// variables are kept.
    pub fn substitute(&mut self, t: TermId, mapping: &HashMap<usize, TermId>) -> Result<TermId> {
        for &image in mapping.values() {
            self.check(image)?;
        }
        let order = self.subterms(t)?;
        let mut image: HashMap<TermId, TermId> = HashMap::with_capacity(order.len());
        let mut children = Vec::new();
        for s in order {
            let new = match self.nodes[s.index].clone() {
                TermNode::Var(i) => mapping.get(&i).copied().unwrap_or(s),
                TermNode::App { symbol, children: kids } => {
                    children.clear();
                    children.extend(kids.iter().map(|k| image[k]));
                    self.make_app(symbol, &children)?
                }
            };
            image.insert(s, new);
        }
        Ok(image[&t])
    }

    /// `f(x_0, ..., x_{k-1})` applied to given arguments: substitute
    /// `args[i]` for variable `i`.
    pub fn compose(&mut self, t: TermId, args: &[TermId]) -> Result<TermId> {
        let mapping: HashMap<usize, TermId> = args.iter().copied().enumerate().collect();
        self.substitute(t, &mapping)
    }

    /// Display adapter
    pub fn display(&self, t: TermId) -> TermDisplay<'_> {
        TermDisplay { arena: self, term: t }
    }

    /// `f(x,g(y,z))` syntax; see [`variable_name`].
    pub fn to_string(&self, t: TermId) -> String {
        self.display(t).to_string()
    }
}

pub struct TermDisplay<'a> {
    arena: &'a TermArena,
    term: TermId,
}

impl TermDisplay<'_> {
    fn write(&self, f: &mut fmt::Formatter<'_>, t: TermId) -> fmt::Result {
        let node = if t.arena == self.arena.id {
            self.arena.nodes.get_index(t.index)
        } else {
            None
        };
        match node {
            None => write!(f, "<invalid {t}>"),
            Some(TermNode::Var(i)) => write!(f, "{}", variable_name(*i)),
            Some(TermNode::App { symbol, children }) => {
                write!(f, "{}(", self.arena.symbol_name(*symbol))?;
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    self.write(f, child)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut arena = TermArena::new();
        let x = arena.make_variable(0);
        let y = arena.make_variable(1);
        let a = arena.make_term("f", &[x, y]).unwrap();
        let b = arena.make_term("f", &[x, y]).unwrap();
        assert_eq!(a, b);
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.make_variable(0), x);
    }

    #[test]
    fn test_display() {
        let mut arena = TermArena::new();
        let x = arena.make_variable(0);
        let w = arena.make_variable(5);
        let x7 = arena.make_variable(7);
        let c = arena.make_term("c", &[]).unwrap();
        let t = arena.make_term("+", &[x, w]).unwrap();
        let t = arena.make_term("g", &[t, x7, c]).unwrap();
        assert_eq!(arena.to_string(t), "g(+(x,w),x7,c())");
    }

    #[test]
    fn test_depth_size_variables() {
        let mut arena = TermArena::new();
        let x = arena.make_variable(0);
        let z = arena.make_variable(2);
        let m = arena.make_term("m", &[x, z]).unwrap();
        let t = arena.make_term("m", &[m, m]).unwrap();
        assert_eq!(arena.depth(x).unwrap(), 0);
        assert_eq!(arena.depth(t).unwrap(), 2);
        // shared subterm counted once
        assert_eq!(arena.size(t).unwrap(), 4);
        assert_eq!(arena.variables(t).unwrap(), vec![0, 2]);
        let c = arena.make_term("c", &[]).unwrap();
        assert_eq!(arena.depth(c).unwrap(), 1);
    }

    #[test]
    fn test_substitute() {
        let mut arena = TermArena::new();
        let x = arena.make_variable(0);
        let y = arena.make_variable(1);
        let t = arena.make_term("f", &[x, y]).unwrap();
        let fyy = arena.make_term("f", &[y, y]).unwrap();
        let swapped = arena
            .substitute(t, &HashMap::from([(0, y)]))
            .unwrap();
        assert_eq!(swapped, fyy);
        let nested = arena.compose(t, &[t, x]).unwrap();
        assert_eq!(arena.to_string(nested), "f(f(x,y),x)");
    }

    #[test]
    fn test_variable_names_round_trip() {
        for i in 0..12 {
            assert_eq!(variable_index(&variable_name(i)), Some(i));
        }
        assert_eq!(variable_index("x3"), Some(3));
        assert_eq!(variable_index("xy"), None);
        assert_eq!(variable_index("a"), None);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut a = TermArena::new();
        let mut b = TermArena::new();
        a.parse("f(x,y)").unwrap();
        let foreign = b.make_variable(0);
        // In range for `a`, but minted by `b`
        assert!(foreign.index() < a.len());
        assert!(matches!(a.depth(foreign), Err(MalcevError::InvalidArgument(_))));
        assert!(a.node(foreign).is_err());
        assert!(a.compose(foreign, &[]).is_err());
        assert_eq!(a.to_string(foreign), "<invalid t0>");

        let copy = a.clone();
        let x = a.make_variable(0);
        assert_eq!(copy.depth(x).unwrap(), 0);
    }

    #[test]
    fn test_symbol_names_must_print_back() {
        let mut arena = TermArena::new();
        let x = arena.make_variable(0);
        for bad in ["", "a b", "f(", ")", "p,q"] {
            assert!(!is_symbol_name(bad));
            assert!(matches!(
                arena.make_term(bad, &[x]),
                Err(MalcevError::InvalidArgument(_))
            ));
        }
        assert!(is_symbol_name("+"));
        let t = arena.make_term("+", &[x, x]).unwrap();
        let printed = arena.to_string(t);
        assert_eq!(arena.parse(&printed).unwrap(), t);
    }
}
