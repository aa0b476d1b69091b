//! The factory: node construction, handle discipline, variable bookkeeping.
//!
//! All operations go through a [`Factory`]. It owns the node store, the
//! operator cache, the variable ordering, and the finite-domain table; the
//! reduction rule is fixed by the [`Mode`] chosen at construction.
//!
//! # Handles
//!
//! User code never touches raw [`Ref`]s for lifetime purposes; it holds
//! [`Bdd`] handles. Every operation that returns a handle performs exactly
//! one `incref` on the underlying node, and [`Factory::free`] performs
//! exactly one `decref`. Handles are affine (neither `Copy` nor `Clone`),
//! so consuming operations (the `*_with` family) take their released
//! operand by value and the type system rules out double-free and
//! use-after-consumption. Dropping a handle without `free` does not corrupt
//! anything; it merely keeps the node alive until the factory goes away.
//!
//! # Garbage collection
//!
//! A GC may run inside any `mk` once the free list drains. Recursive
//! operations pin their in-flight results on the store's ref stack, so a
//! collection at an interior point of an apply is safe. After every sweep
//! the operator cache is cleared wholesale.

use std::fmt::Debug;

use log::debug;

use crate::cache::{OpCache, OpKey};
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::store::NodeStore;
use crate::types::{Level, Mode, Ref, Var};

/// An owned, reference-counted handle to a node.
///
/// Equality is node-id equality: two handles of the same factory compare
/// equal iff they denote the same function (canonicity).
#[must_use]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Bdd {
    root: Ref,
}

impl Bdd {
    pub(crate) fn new(root: Ref) -> Self {
        Bdd { root }
    }

    /// The raw node id behind this handle.
    #[inline]
    pub fn node(&self) -> Ref {
        self.root
    }
}

pub struct Factory {
    mode: Mode,
    pub(crate) store: NodeStore,
    pub(crate) cache: OpCache<OpKey, Ref>,
    var2level: Vec<Level>,
    level2var: Vec<Var>,
    pub(crate) domains: Vec<Domain>,
}

/// Default size of the node store (`2^16` slots).
const DEFAULT_NODE_BITS: usize = 16;
/// Default pre-sizing of the operator cache (`2^14` entries).
const DEFAULT_CACHE_BITS: usize = 14;

impl Factory {
    /// Creates a factory with default table sizes and no variables.
    pub fn new(mode: Mode) -> Self {
        Self::with_capacity(mode, DEFAULT_NODE_BITS, DEFAULT_CACHE_BITS)
    }

    /// Creates a factory with `2^node_bits` node slots and an operator
    /// cache pre-sized for `2^cache_bits` entries.
    pub fn with_capacity(mode: Mode, node_bits: usize, cache_bits: usize) -> Self {
        Self {
            mode,
            store: NodeStore::new(node_bits),
            cache: OpCache::new(cache_bits),
            var2level: Vec::new(),
            level2var: Vec::new(),
            domains: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_zdd(&self) -> bool {
        self.mode == Mode::Zdd
    }

    /// Number of declared variables.
    pub fn var_num(&self) -> usize {
        self.var2level.len()
    }

    /// Number of live inner nodes in the store.
    pub fn num_nodes(&self) -> usize {
        self.store.live_count()
    }

    /// Operator-cache statistics `(hits, misses)`.
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache.hits(), self.cache.misses())
    }

    /// Extends the ordering to `num` variables; new variables are appended
    /// at the bottom. The count can only grow.
    pub fn set_var_num(&mut self, num: usize) {
        assert!(num >= self.var_num(), "cannot shrink the variable count");
        while self.var_num() < num {
            let index = self.var_num() as u32;
            self.var2level.push(Level::new(index));
            self.level2var.push(Var::new(index));
        }
    }

    /// Declares `count` fresh variables and returns them.
    pub fn declare_vars(&mut self, count: usize) -> Vec<Var> {
        let first = self.var_num();
        self.set_var_num(first + count);
        (first..first + count)
            .map(|i| Var::new(i as u32))
            .collect()
    }

    /// The level a variable currently occupies.
    pub fn level_of_var(&self, var: Var) -> Result<Level> {
        self.var2level.get(var.usize()).copied().ok_or_else(|| {
            Error::OutOfRange {
                value: var.index().into(),
                bound: (self.var_num() as u64).into(),
            }
        })
    }

    /// The variable sitting at a level.
    pub fn var_at_level(&self, level: Level) -> Var {
        self.level2var[level.usize()]
    }

    // ─── Terminals and inspectors ───────────────────────────────────────────

    pub fn zero(&mut self) -> Bdd {
        self.acquire(Ref::ZERO)
    }

    pub fn one(&mut self) -> Bdd {
        self.acquire(Ref::ONE)
    }

    /// The always-true function. In BDD mode this is the TRUE terminal; in
    /// ZDD mode it is the chain of don't-care nodes over every declared
    /// variable, which is *not* the same node as `one()`.
    pub fn universe(&mut self) -> Bdd {
        let r = self.universe_ref();
        self.acquire(r)
    }

    pub(crate) fn universe_ref(&mut self) -> Ref {
        match self.mode {
            Mode::Bdd => Ref::ONE,
            Mode::Zdd => {
                let mut r = Ref::ONE;
                for level in (0..self.var_num() as u32).rev() {
                    self.store.push_ref(r);
                    let next = self.mk(Level::new(level), r, r);
                    self.store.pop_ref(1);
                    r = next;
                }
                r
            }
        }
    }

    pub fn is_zero(&self, f: &Bdd) -> bool {
        f.root.is_zero()
    }

    pub fn is_one(&self, f: &Bdd) -> bool {
        f.root.is_one()
    }

    pub fn is_universe(&mut self, f: &Bdd) -> bool {
        let u = self.universe_ref();
        f.root == u
    }

    /// The variable tested at the root, or `None` for a terminal.
    pub fn var_of(&self, f: &Bdd) -> Option<Var> {
        self.level_of(f).map(|level| self.var_at_level(level))
    }

    /// The level of the root, or `None` for a terminal.
    pub fn level_of(&self, f: &Bdd) -> Option<Level> {
        let level = self.store.level(f.root);
        if level.is_terminal() {
            None
        } else {
            Some(level)
        }
    }

    /// A fresh handle to the low child, or `None` for a terminal.
    pub fn low(&mut self, f: &Bdd) -> Option<Bdd> {
        if f.root.is_terminal() {
            return None;
        }
        let low = self.store.low(f.root);
        Some(self.acquire(low))
    }

    /// A fresh handle to the high child, or `None` for a terminal.
    pub fn high(&mut self, f: &Bdd) -> Option<Bdd> {
        if f.root.is_terminal() {
            return None;
        }
        let high = self.store.high(f.root);
        Some(self.acquire(high))
    }

    // ─── Handle discipline ──────────────────────────────────────────────────

    /// A second handle to the same node (one extra reference).
    pub fn id(&mut self, f: &Bdd) -> Bdd {
        self.acquire(f.root)
    }

    /// Releases a handle: exactly one `decref`.
    pub fn free(&mut self, f: Bdd) {
        self.store.decref(f.root);
    }

    /// Wraps a raw ref in an owning handle, bumping its refcount.
    pub(crate) fn acquire(&mut self, r: Ref) -> Bdd {
        self.store.incref(r);
        Bdd::new(r)
    }

    /// Replaces the node a handle owns: used by the `*_with` mutators.
    pub(crate) fn reroot(&mut self, f: &mut Bdd, r: Ref) {
        self.store.incref(r);
        let old = std::mem::replace(&mut f.root, r);
        self.store.decref(old);
    }

    // ─── Variables and cubes ────────────────────────────────────────────────

    /// The function of a single positive literal.
    pub fn ith_var(&mut self, var: Var) -> Result<Bdd> {
        let level = self.level_of_var(var)?;
        let r = self.mk(level, Ref::ZERO, Ref::ONE);
        Ok(self.acquire(r))
    }

    /// The function of a single negative literal.
    ///
    /// In ZDD mode the reduction rule collapses `(level, 1, 0)`; the result
    /// is then the low child, which matches the zero-suppressed reading of
    /// an absent variable.
    pub fn nith_var(&mut self, var: Var) -> Result<Bdd> {
        let level = self.level_of_var(var)?;
        let r = self.mk(level, Ref::ONE, Ref::ZERO);
        Ok(self.acquire(r))
    }

    /// Builds the conjunction of the given literals.
    ///
    /// Contradictory literals yield `zero`; duplicate literals collapse.
    pub fn cube(&mut self, literals: &[(Var, bool)]) -> Result<Bdd> {
        let mut lits: Vec<(Level, bool)> = Vec::with_capacity(literals.len());
        for &(var, polarity) in literals {
            lits.push((self.level_of_var(var)?, polarity));
        }
        lits.sort();
        lits.dedup();
        for pair in lits.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Ok(self.zero());
            }
        }

        let mut r = Ref::ONE;
        for &(level, polarity) in lits.iter().rev() {
            self.store.push_ref(r);
            let next = if polarity {
                self.mk(level, Ref::ZERO, r)
            } else {
                self.mk(level, r, Ref::ZERO)
            };
            self.store.pop_ref(1);
            r = next;
        }
        Ok(self.acquire(r))
    }

    // ─── Node construction ──────────────────────────────────────────────────

    /// Reduce, hash-cons, or allocate the node `(level, low, high)`.
    ///
    /// When the free list is empty a GC runs; if that reclaims less than a
    /// quarter of the store, the store also grows (which rehashes but keeps
    /// all node ids stable).
    pub(crate) fn mk(&mut self, level: Level, low: Ref, high: Ref) -> Ref {
        debug_assert!(!level.is_terminal());
        debug_assert!(
            level < self.store.level(low) && level < self.store.level(high),
            "mk would break the ordering invariant"
        );

        match self.mode {
            Mode::Bdd => {
                if low == high {
                    return low;
                }
            }
            Mode::Zdd => {
                if high.is_zero() {
                    return low;
                }
            }
        }

        if let Some(r) = self.store.find(level, low, high) {
            return r;
        }

        if !self.store.has_free() {
            debug!("mk: free list empty, collecting");
            let freed = self.gc();
            if freed < self.store.capacity() / 4 {
                self.store.grow();
            }
        }

        self.store.insert(level, low, high)
    }

    /// The single-node function of the variable at `level`.
    pub(crate) fn mk_level_var(&mut self, level: Level) -> Ref {
        self.mk(level, Ref::ZERO, Ref::ONE)
    }

    /// Effective level used in structural recursions: terminals compare
    /// below everything.
    #[inline]
    pub(crate) fn level_ref(&self, r: Ref) -> Level {
        self.store.level(r)
    }

    #[inline]
    pub(crate) fn low_ref(&self, r: Ref) -> Ref {
        self.store.low(r)
    }

    #[inline]
    pub(crate) fn high_ref(&self, r: Ref) -> Ref {
        self.store.high(r)
    }

    /// Runs a mark-and-sweep collection and clears the operator cache.
    /// Returns the number of reclaimed nodes.
    pub fn gc(&mut self) -> usize {
        let freed = self.store.gc();
        self.cache.clear();
        freed
    }

    /// Number of external references on the node behind `f` (diagnostic).
    pub fn refcount(&self, f: &Bdd) -> u32 {
        self.store.refcount(f.root)
    }
}

impl Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("mode", &self.mode)
            .field("vars", &self.var_num())
            .field("nodes", &self.num_nodes())
            .finish()
    }
}

impl Default for Factory {
    fn default() -> Self {
        Factory::new(Mode::Bdd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mk_reduction_bdd() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(2);
        let r = f.mk(Level::new(0), Ref::ONE, Ref::ONE);
        assert_eq!(r, Ref::ONE);
    }

    #[test]
    fn test_mk_reduction_zdd() {
        let mut f = Factory::new(Mode::Zdd);
        f.set_var_num(2);
        let r = f.mk(Level::new(0), Ref::ONE, Ref::ZERO);
        assert_eq!(r, Ref::ONE);
        // A don't-care node is legal in ZDD mode.
        let d = f.mk(Level::new(0), Ref::ONE, Ref::ONE);
        assert!(!d.is_terminal());
    }

    #[test]
    fn test_mk_hash_consing() {
        let mut f = Factory::default();
        f.set_var_num(3);
        let a = f.mk(Level::new(1), Ref::ZERO, Ref::ONE);
        let b = f.mk(Level::new(1), Ref::ZERO, Ref::ONE);
        assert_eq!(a, b);
        assert_eq!(f.num_nodes(), 1);
    }

    #[test]
    fn test_handle_refcounting() {
        let mut f = Factory::default();
        f.set_var_num(1);
        let x = f.ith_var(Var::new(0)).unwrap();
        assert_eq!(f.refcount(&x), 1);

        let y = f.id(&x);
        assert_eq!(f.refcount(&x), 2);

        f.free(y);
        assert_eq!(f.refcount(&x), 1);

        f.free(x);
        f.gc();
        assert_eq!(f.num_nodes(), 0);
    }

    #[test]
    fn test_ith_var_out_of_range() {
        let mut f = Factory::default();
        f.set_var_num(2);
        assert!(f.ith_var(Var::new(1)).is_ok());
        assert!(matches!(
            f.ith_var(Var::new(2)),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_cube_builds_conjunction() {
        let mut f = Factory::default();
        f.set_var_num(3);
        let c = f
            .cube(&[(Var::new(0), true), (Var::new(2), false)])
            .unwrap();

        // Root tests x0, its high child tests x2 negatively.
        assert_eq!(f.var_of(&c), Some(Var::new(0)));
        let high = f.high(&c).unwrap();
        assert_eq!(f.var_of(&high), Some(Var::new(2)));
        let high_high = f.high(&high).unwrap();
        assert!(f.is_zero(&high_high));

        let contradiction = f
            .cube(&[(Var::new(1), true), (Var::new(1), false)])
            .unwrap();
        assert!(f.is_zero(&contradiction));
    }

    #[test]
    fn test_universe_zdd_differs_from_one() {
        let mut f = Factory::new(Mode::Zdd);
        f.set_var_num(3);
        let u = f.universe();
        let one = f.one();
        assert_ne!(u, one);
        assert!(f.is_universe(&u));
        assert!(!f.is_universe(&one));
    }

    #[test]
    fn test_gc_returns_store_to_initial_size() {
        let mut f = Factory::default();
        f.set_var_num(4);
        let a = f.ith_var(Var::new(0)).unwrap();
        let b = f.ith_var(Var::new(1)).unwrap();
        let c = f.cube(&[(Var::new(2), true), (Var::new(3), true)]).unwrap();
        assert!(f.num_nodes() > 0);

        f.free(a);
        f.free(b);
        f.free(c);
        f.gc();
        assert_eq!(f.num_nodes(), 0);
    }
}
