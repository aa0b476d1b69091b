//! Type-safe wrappers for node references, variables, and levels.
//!
//! This module provides newtype wrappers that enforce compile-time distinction
//! between node ids, variable indices, and level indices, preventing common
//! mistakes in decision-diagram manipulation code.

use std::fmt;

/// A reference to a node in the store.
///
/// Plain node id: the two terminals occupy ids 0 and 1, inner nodes follow.
/// `Ref` is a raw, non-owning pointer; the refcounted [`Bdd`][crate::factory::Bdd]
/// handle is built on top of it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ref(u32);

impl Ref {
    /// The FALSE terminal.
    pub const ZERO: Self = Self(0);
    /// The TRUE terminal.
    pub const ONE: Self = Self(1);
    /// Sentinel for "no node": end of a hash chain or free list.
    pub const NONE: Self = Self(u32::MAX);

    pub const fn new(index: u32) -> Self {
        Ref(index)
    }

    /// Returns the raw node index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn usize(self) -> usize {
        self.0 as usize
    }

    /// True for the two terminal nodes.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        self.0 <= 1
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_one(self) -> bool {
        self.0 == 1
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A variable index (0-indexed).
///
/// Variables are stable across any change of the ordering; the factory
/// maintains the bijection between variables and [`Level`]s.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    pub const fn new(index: u32) -> Self {
        Var(index)
    }

    /// Returns the raw variable index as a `u32`.
    pub const fn index(self) -> u32 {
        self.0
    }

    pub const fn usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<u32> for Var {
    fn from(index: u32) -> Self {
        Var(index)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A level in the variable ordering (0 is topmost, closest to the root).
///
/// All structural comparisons inside the factory use levels, never variable
/// indices. Terminals sit at the pseudo-level [`Level::TERMINAL`], below
/// every real level, so `min(level(f), level(g))` picks inner nodes first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(u32);

impl Level {
    /// Pseudo-level of the two terminals; compares greater than any real level.
    pub const TERMINAL: Self = Level(u32::MAX);

    pub const fn new(index: u32) -> Self {
        Level(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    pub const fn usize(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns the next level down (towards the terminals).
    pub const fn next(self) -> Self {
        Level(self.0 + 1)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminal() {
            write!(f, "L#")
        } else {
            write!(f, "L{}", self.0)
        }
    }
}

impl From<u32> for Level {
    fn from(index: u32) -> Self {
        Level(index)
    }
}

/// One position of a ternary satisfying vector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Trit {
    Zero,
    One,
    /// The assignment satisfies the function with either value here.
    DontCare,
}

impl fmt::Display for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trit::Zero => write!(f, "0"),
            Trit::One => write!(f, "1"),
            Trit::DontCare => write!(f, "*"),
        }
    }
}

/// Which reduction rule the factory applies in `mk`.
///
/// The mode is fixed at construction; it also governs the meaning of
/// "universe", the default polarity of absent variables, and don't-care
/// detection during enumeration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Mode {
    /// Reduced ordered BDD: a branch with `low == high` collapses to its child.
    Bdd,
    /// Zero-suppressed DD: a branch with `high == 0` collapses to its low child.
    Zdd,
}
