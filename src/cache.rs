//! Operator cache (computed table) for the apply family.
//!
//! A memoizing map from operation keys to result node ids, backed by
//! `hashbrown::HashMap` with the crate's position-independent [`MyHash`]
//! hashing. The cache is semantically transparent: hits and misses must
//! produce bitwise-identical results.
//!
//! Cache entries are *not* GC roots. After every garbage-collection sweep
//! the whole cache is cleared, since surviving entries could refer to
//! swept nodes.

use std::cell::Cell;
use std::hash::{BuildHasherDefault, Hash, Hasher};

use hashbrown::HashMap;

use crate::apply::Op;
use crate::quant::Quant;
use crate::types::{Level, Ref};
use crate::utils::{pairing2, pairing3, MyHash};

/// Key of a memoized operation.
///
/// Each variant carries the operand node ids that determine the result, plus
/// whatever extra input the operation depends on: the quantified cube, the
/// level of a composed variable, or a pairing's generation stamp.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OpKey {
    Not(Ref),
    Apply(Op, Ref, Ref),
    Ite(Ref, Ref, Ref),
    /// (quantifier, cube, operand)
    Quant(Quant, Ref, Ref),
    /// (operator, quantifier, cube, left, right)
    ApplyQuant(Op, Quant, Ref, Ref, Ref),
    /// (level of the replaced variable, replacement, operand)
    Compose(Level, Ref, Ref),
    /// (pairing generation, operand)
    VecCompose(u64, Ref),
    /// (pairing generation, operand)
    Replace(u64, Ref),
    Restrict(Ref, Ref),
    Constrain(Ref, Ref),
    Simplify(Ref, Ref),
    Support(Ref),
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        // A distinct tag per variant keeps e.g. Restrict(f, c) and
        // Constrain(f, c) from colliding.
        match *self {
            OpKey::Not(f) => pairing2(1, MyHash::hash(&f)),
            OpKey::Apply(op, f, g) => pairing2(2, pairing3(op as u64, MyHash::hash(&f), MyHash::hash(&g))),
            OpKey::Ite(f, g, h) => pairing2(3, MyHash::hash(&(f, g, h))),
            OpKey::Quant(q, cube, f) => pairing2(4, pairing3(q as u64, MyHash::hash(&cube), MyHash::hash(&f))),
            OpKey::ApplyQuant(op, q, cube, f, g) => pairing2(
                5,
                pairing2(pairing2(op as u64, q as u64), MyHash::hash(&(cube, f, g))),
            ),
            OpKey::Compose(level, g, f) => {
                pairing2(6, pairing3(level.index() as u64, MyHash::hash(&g), MyHash::hash(&f)))
            }
            OpKey::VecCompose(generation, f) => pairing2(7, pairing2(generation, MyHash::hash(&f))),
            OpKey::Replace(generation, f) => pairing2(8, pairing2(generation, MyHash::hash(&f))),
            OpKey::Restrict(f, c) => pairing2(9, MyHash::hash(&(f, c))),
            OpKey::Constrain(f, c) => pairing2(10, MyHash::hash(&(f, c))),
            OpKey::Simplify(f, d) => pairing2(11, MyHash::hash(&(f, d))),
            OpKey::Support(f) => pairing2(12, MyHash::hash(&f)),
        }
    }
}

/// A hasher that passes through a precomputed [`MyHash`] value.
#[derive(Default)]
pub struct MyHasher {
    hash: u64,
}

impl Hasher for MyHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    #[inline]
    fn write(&mut self, _bytes: &[u8]) {
        unreachable!("MyHasher only supports write_u64")
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

/// Wrapper that implements `std::hash::Hash` for any [`MyHash`] type,
/// allowing such keys in a `HashMap`.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
struct HashableKey<K>(K);

impl<K: MyHash> Hash for HashableKey<K> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash());
    }
}

/// The operator cache.
///
/// Tracks hit/miss counters for diagnostics. `clear()` drops every entry;
/// the factory calls it after each GC sweep.
pub struct OpCache<K, V> {
    map: HashMap<HashableKey<K>, V, BuildHasherDefault<MyHasher>>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<K, V> OpCache<K, V> {
    /// Creates a cache pre-sized for `2^bits` entries.
    pub fn new(bits: usize) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(1 << bits, BuildHasherDefault::default()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Drops all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K, V> OpCache<K, V>
where
    K: MyHash + Eq + Copy,
    V: Copy,
{
    #[inline]
    pub fn get(&self, key: K) -> Option<V> {
        match self.map.get(&HashableKey(key)) {
            Some(&v) => {
                self.hits.set(self.hits.get() + 1);
                Some(v)
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(HashableKey(key), value);
    }
}
