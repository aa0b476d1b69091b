//! Substitution tables: finite maps from variables to replacements.
//!
//! A [`Pairing`] maps old variables to either a new variable (for
//! `replace`) or an arbitrary diagram (for `vec_compose`). Every mutation
//! bumps a monotone generation counter, which participates in operator
//! cache keys so stale memoization cannot survive a pairing edit.
//!
//! A pairing owns one reference on each replacement diagram, which makes
//! the replacements GC roots for as long as the pairing is alive; release
//! with [`Factory::free_pairing`].

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::factory::{Bdd, Factory};
use crate::types::{Level, Ref, Var};

#[derive(Debug, Copy, Clone)]
pub(crate) struct PairTarget {
    /// Replacement diagram (for a variable target, its literal node).
    pub repl: Ref,
    /// `Some` for variable-to-variable entries.
    pub var: Option<Var>,
}

/// A mutable substitution table.
#[derive(Debug, Default)]
pub struct Pairing {
    targets: HashMap<Level, PairTarget>,
    generation: u64,
}

impl Pairing {
    /// Stamp used in cache keys; bumped on every mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub(crate) fn target(&self, level: Level) -> Option<PairTarget> {
        self.targets.get(&level).copied()
    }
}

impl Factory {
    pub fn make_pairing(&mut self) -> Pairing {
        Pairing::default()
    }

    /// Maps `old` to the variable `new`.
    pub fn pair_set(&mut self, pairing: &mut Pairing, old: Var, new: Var) -> Result<()> {
        let old_level = self.level_of_var(old)?;
        let new_level = self.level_of_var(new)?;
        let repl = self.mk_level_var(new_level);
        self.store.incref(repl);
        self.install(pairing, old_level, PairTarget { repl, var: Some(new) });
        Ok(())
    }

    /// Maps each of `olds` to the corresponding entry of `news`.
    pub fn pair_set_many(&mut self, pairing: &mut Pairing, olds: &[Var], news: &[Var]) -> Result<()> {
        if olds.len() != news.len() {
            return Err(Error::SizeMismatch {
                left: olds.len(),
                right: news.len(),
            });
        }
        for (&old, &new) in olds.iter().zip(news) {
            self.pair_set(pairing, old, new)?;
        }
        Ok(())
    }

    /// Maps `old` to an arbitrary diagram.
    pub fn pair_set_bdd(&mut self, pairing: &mut Pairing, old: Var, g: &Bdd) -> Result<()> {
        let old_level = self.level_of_var(old)?;
        let repl = g.node();
        self.store.incref(repl);
        self.install(pairing, old_level, PairTarget { repl, var: None });
        Ok(())
    }

    fn install(&mut self, pairing: &mut Pairing, old_level: Level, target: PairTarget) {
        if let Some(previous) = pairing.targets.insert(old_level, target) {
            self.store.decref(previous.repl);
        }
        pairing.generation += 1;
    }

    /// Clears all entries.
    pub fn pair_reset(&mut self, pairing: &mut Pairing) {
        for (_, target) in pairing.targets.drain() {
            self.store.decref(target.repl);
        }
        pairing.generation += 1;
    }

    /// Releases the pairing and the references it holds.
    pub fn free_pairing(&mut self, mut pairing: Pairing) {
        for (_, target) in pairing.targets.drain() {
            self.store.decref(target.repl);
        }
    }

    /// First old variable whose entry maps to a diagram, if any.
    pub(crate) fn pairing_diagram_entry(&self, pairing: &Pairing) -> Option<Var> {
        pairing
            .targets
            .iter()
            .find(|(_, t)| t.var.is_none())
            .map(|(&level, _)| self.var_at_level(level))
    }
}
