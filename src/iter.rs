//! Enumeration of satisfying assignments.
//!
//! [`AllSatIter`] walks the diagram depth-first (low before high) and
//! yields one ternary vector per path to TRUE; don't-care positions are
//! left for the consumer to expand. [`MintermIter`] does that expansion
//! over a chosen variable set with odometer semantics: don't-care bits
//! within the set are stepped through in descending level order.
//!
//! `AllSatIter` borrows the factory, which statically rules out a GC while
//! it runs. `MintermIter` instead *owns* references on the nodes of its
//! pending stacks (released as it walks), so the factory can be used, and
//! can collect, between steps; each of its methods takes the factory
//! explicitly.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::{Error, Result};
use crate::factory::{Bdd, Factory};
use crate::types::{Level, Mode, Ref, Trit, Var};
use crate::varset::VarSet;

impl Factory {
    /// Iterator over the satisfying ternary vectors of `f`, indexed by
    /// variable.
    pub fn all_sat<'a>(&'a self, f: &Bdd) -> AllSatIter<'a> {
        AllSatIter::new(self, f.node())
    }

    /// Minterm iterator over the variables of `set`.
    ///
    /// The iterator holds references on its pending nodes, so it stays
    /// valid across factory mutations and garbage collections; pass the
    /// factory to every call. Release it with [`MintermIter::free`] if you
    /// abandon it before exhaustion.
    pub fn minterm_iter(&mut self, f: &Bdd, set: &VarSet) -> MintermIter {
        MintermIter::new(self, f, set)
    }

    fn default_trit(&self) -> Trit {
        match self.mode() {
            Mode::Bdd => Trit::DontCare,
            Mode::Zdd => Trit::Zero,
        }
    }
}

/// Depth-first enumeration of satisfying paths as ternary vectors.
pub struct AllSatIter<'a> {
    fac: &'a Factory,
    lo_stack: Vec<Ref>,
    hi_stack: Vec<Ref>,
    profile: Vec<Trit>,
    pending: bool,
}

impl<'a> AllSatIter<'a> {
    fn new(fac: &'a Factory, root: Ref) -> Self {
        let profile = vec![fac.default_trit(); fac.var_num()];
        let mut it = AllSatIter {
            fac,
            lo_stack: Vec::new(),
            hi_stack: Vec::new(),
            profile,
            pending: false,
        };
        if root.is_one() {
            it.pending = true;
        } else if !root.is_zero() {
            it.lo_stack.push(root);
            it.pending = it.advance();
        }
        it
    }

    /// Moves to the next path to TRUE, updating the profile in place.
    fn advance(&mut self) -> bool {
        let fac = self.fac;
        loop {
            let (r, from_hi) = if let Some(r) = self.lo_stack.pop() {
                (r, false)
            } else if let Some(r) = self.hi_stack.pop() {
                (r, true)
            } else {
                return false;
            };

            let level = fac.level_ref(r);
            let var = fac.var_at_level(level);
            self.profile[var.usize()] = if from_hi { Trit::One } else { Trit::Zero };

            let rn = if from_hi {
                fac.high_ref(r)
            } else {
                fac.low_ref(r)
            };

            // Everything between this node and the child is unconstrained.
            let below = if rn.is_terminal() {
                fac.var_num()
            } else {
                fac.level_ref(rn).usize()
            };
            for l in level.usize() + 1..below {
                let v = fac.var_at_level(Level::new(l as u32));
                self.profile[v.usize()] = fac.default_trit();
            }

            if !from_hi {
                if fac.is_zdd() && rn == fac.high_ref(r) {
                    // low == high: a ZDD don't-care level, no separate
                    // high branch to come back for.
                    self.profile[var.usize()] = Trit::DontCare;
                } else {
                    self.hi_stack.push(r);
                }
            }

            if rn.is_one() {
                return true;
            }
            if rn.is_zero() {
                continue;
            }
            self.lo_stack.push(rn);
        }
    }
}

impl Iterator for AllSatIter<'_> {
    type Item = Vec<Trit>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.pending {
            return None;
        }
        let result = self.profile.clone();
        self.pending = self.advance();
        Some(result)
    }
}

/// Streaming iterator over concrete minterms of a variable set.
///
/// The `remove`/subtract operation takes the diagram to mutate as an
/// explicit handle: `remove(&mut fac, &mut original)` subtracts the most
/// recently returned minterm from `original` in place.
pub struct MintermIter {
    lo_stack: Vec<Ref>,
    hi_stack: Vec<Ref>,
    /// Working ternary profile of the inner all-sat walk, by level.
    profile: Vec<Trit>,
    /// Current ternary path, or `None` once exhausted.
    a: Option<Vec<Trit>>,
    /// Iterated levels, ascending.
    levels: Vec<Level>,
    /// Odometer over `levels`.
    bits: Vec<bool>,
    /// Literals of the most recently returned minterm.
    last: Option<Vec<(Var, bool)>>,
}

impl MintermIter {
    fn new(fac: &mut Factory, f: &Bdd, set: &VarSet) -> Self {
        let levels = fac.set_levels(set);
        let mut it = MintermIter {
            lo_stack: Vec::new(),
            hi_stack: Vec::new(),
            profile: vec![fac.default_trit(); fac.var_num()],
            a: None,
            bits: vec![false; levels.len()],
            levels,
            last: None,
        };

        let root = f.node();
        if root.is_one() {
            it.a = Some(it.profile.clone());
        } else if !root.is_zero() {
            fac.store.incref(root);
            it.lo_stack.push(root);
            if it.advance_inner(fac) {
                it.a = Some(it.profile.clone());
            }
        }
        it.load_bits();
        it
    }

    /// Releases the references held by the pending stacks.
    pub fn free(mut self, fac: &mut Factory) {
        for r in self.lo_stack.drain(..).chain(self.hi_stack.drain(..)) {
            fac.store.decref(r);
        }
    }

    pub fn has_next(&self) -> bool {
        self.a.is_some()
    }

    /// Inner all-sat step with reference-count pinning of the stacks.
    fn advance_inner(&mut self, fac: &mut Factory) -> bool {
        loop {
            let (r, from_hi) = if let Some(r) = self.lo_stack.pop() {
                (r, false)
            } else if let Some(r) = self.hi_stack.pop() {
                (r, true)
            } else {
                return false;
            };

            let level = fac.level_ref(r);
            self.profile[level.usize()] = if from_hi { Trit::One } else { Trit::Zero };

            let rn = if from_hi {
                fac.high_ref(r)
            } else {
                fac.low_ref(r)
            };

            let below = if rn.is_terminal() {
                fac.var_num()
            } else {
                fac.level_ref(rn).usize()
            };
            for l in level.usize() + 1..below {
                self.profile[l] = fac.default_trit();
            }

            if from_hi {
                // Done with r: the high branch was its last.
                fac.store.decref(r);
            } else if fac.is_zdd() && rn == fac.high_ref(r) {
                self.profile[level.usize()] = Trit::DontCare;
                fac.store.decref(r);
            } else {
                // Pin carries over from the lo stack to the hi stack.
                self.hi_stack.push(r);
            }

            if rn.is_one() {
                return true;
            }
            if rn.is_zero() {
                continue;
            }
            fac.store.incref(rn);
            self.lo_stack.push(rn);
        }
    }

    fn load_bits(&mut self) {
        if let Some(a) = &self.a {
            for (i, &level) in self.levels.iter().enumerate() {
                self.bits[i] = a[level.usize()] == Trit::One;
            }
        }
    }

    /// Odometer step over the don't-care positions, descending level order.
    fn step_odometer(&mut self) -> bool {
        let a = match &self.a {
            Some(a) => a,
            None => return false,
        };
        for i in (0..self.levels.len()).rev() {
            if a[self.levels[i].usize()] != Trit::DontCare {
                continue;
            }
            if !self.bits[i] {
                self.bits[i] = true;
                return true;
            }
            self.bits[i] = false;
        }
        false
    }

    /// Advances to the next minterm: odometer first, then the next path.
    fn step(&mut self, fac: &mut Factory) {
        if !self.step_odometer() {
            self.a = if self.advance_inner(fac) {
                Some(self.profile.clone())
            } else {
                None
            };
            self.load_bits();
        }
    }

    fn record_last(&mut self, fac: &Factory) -> Vec<(Var, bool)> {
        let lits: Vec<(Var, bool)> = self
            .levels
            .iter()
            .zip(&self.bits)
            .map(|(&level, &bit)| (fac.var_at_level(level), bit))
            .collect();
        self.last = Some(lits.clone());
        lits
    }

    /// The next minterm as a cube over the iterated variables.
    pub fn next_cube(&mut self, fac: &mut Factory) -> Option<Bdd> {
        self.a.as_ref()?;
        let lits = self.record_last(fac);
        let cube = fac.cube(&lits).expect("iterated variables are declared");
        self.step(fac);
        Some(cube)
    }

    /// The next minterm as a full assignment indexed by variable;
    /// variables outside the iterated set read as `false`.
    pub fn next_assignment(&mut self, fac: &mut Factory) -> Option<Vec<bool>> {
        self.a.as_ref()?;
        self.record_last(fac);
        let mut assignment = vec![false; fac.var_num()];
        for (&level, &bit) in self.levels.iter().zip(&self.bits) {
            assignment[fac.var_at_level(level).usize()] = bit;
        }
        self.step(fac);
        Some(assignment)
    }

    /// The next minterm, decoded as a value of domain `d`. The domain's
    /// variables must all be part of the iterated set.
    pub fn next_value(&mut self, fac: &mut Factory, d: usize) -> Option<BigUint> {
        self.a.as_ref()?;
        self.record_last(fac);
        let value = self.decode_domain(fac, d).unwrap_or_else(BigUint::zero);
        self.step(fac);
        Some(value)
    }

    /// The next minterm, decoded as one value per declared domain; `None`
    /// entries mark domains not fully covered by the iterated set.
    pub fn next_tuple(&mut self, fac: &mut Factory) -> Option<Vec<Option<BigUint>>> {
        self.a.as_ref()?;
        self.record_last(fac);
        let tuple = (0..fac.num_domains())
            .map(|d| self.decode_domain(fac, d))
            .collect();
        self.step(fac);
        Some(tuple)
    }

    fn decode_domain(&self, fac: &Factory, d: usize) -> Option<BigUint> {
        let dom_vars: Vec<Var> = fac.domain(d).vars().to_vec();
        let mut value = BigUint::zero();
        for &var in dom_vars.iter().rev() {
            value <<= 1;
            let level = fac.level_of_var(var).ok()?;
            let i = self.levels.binary_search(&level).ok()?;
            if self.bits[i] {
                value += BigUint::one();
            }
        }
        Some(value)
    }

    /// Subtracts the most recently returned minterm from `original`,
    /// replacing the handle's contents in place. This mutates a diagram
    /// the iterator does not own; the iteration itself is unaffected
    /// because the pending paths are pinned independently.
    pub fn remove(&mut self, fac: &mut Factory, original: &mut Bdd) -> Result<()> {
        let lits = self
            .last
            .take()
            .ok_or(Error::IteratorState("remove before next"))?;
        let cube = fac.cube(&lits).expect("iterated variables are declared");
        fac.diff_with(original, cube);
        Ok(())
    }

    /// True if the current path leaves `var` unconstrained.
    pub fn is_dont_care(&self, fac: &Factory, var: Var) -> bool {
        let level = match fac.level_of_var(var) {
            Ok(level) => level,
            Err(_) => return false,
        };
        match &self.a {
            Some(a) => a[level.usize()] == Trit::DontCare,
            None => false,
        }
    }

    /// True if the current path leaves every variable of `d` unconstrained.
    pub fn is_dont_care_domain(&self, fac: &Factory, d: usize) -> bool {
        fac.domain(d)
            .vars()
            .iter()
            .all(|&var| self.is_dont_care(fac, var))
    }

    /// Forces a don't-care position to 1, skipping half of its expansion.
    pub fn fast_forward(&mut self, fac: &Factory, var: Var) -> Result<()> {
        let level = fac
            .level_of_var(var)
            .map_err(|_| Error::IteratorState("fast_forward on unknown variable"))?;
        let a = self
            .a
            .as_ref()
            .ok_or(Error::IteratorState("fast_forward after exhaustion"))?;
        let i = self
            .levels
            .binary_search(&level)
            .map_err(|_| Error::IteratorState("fast_forward outside the iterated set"))?;
        if a[level.usize()] != Trit::DontCare {
            return Err(Error::IteratorState("fast_forward on a constrained position"));
        }
        self.bits[i] = true;
        Ok(())
    }

    pub fn fast_forward_all(&mut self, fac: &Factory, vars: &[Var]) -> Result<()> {
        for &var in vars {
            self.fast_forward(fac, var)?;
        }
        Ok(())
    }

    /// Assuming domain `d` is all don't-care, skips the rest of its
    /// expansion.
    pub fn skip_dont_care(&mut self, fac: &mut Factory, d: usize) -> Result<()> {
        let dom_vars: Vec<Var> = fac.domain(d).vars().to_vec();
        self.fast_forward_all(fac, &dom_vars)?;
        self.step(fac);
        Ok(())
    }
}
