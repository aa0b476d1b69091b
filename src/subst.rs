//! Substitution and cofactor operations: compose, vector composition,
//! variable renaming, literal-cube restriction, generalized cofactor, and
//! Coudert–Madre simplification.

use log::debug;

use crate::cache::OpKey;
use crate::error::{Error, Result};
use crate::factory::{Bdd, Factory};
use crate::pairing::Pairing;
use crate::types::{Level, Ref, Var};

impl Factory {
    /// `compose(f, g, v)`: substitutes the diagram `g` for the variable `v`
    /// in `f`.
    pub fn compose(&mut self, f: &Bdd, g: &Bdd, var: Var) -> Result<Bdd> {
        debug!("compose({}, {}, {})", f.node(), g.node(), var);
        let level = self.level_of_var(var)?;
        let r = self.compose_rec(f.node(), g.node(), level);
        Ok(self.acquire(r))
    }

    fn compose_rec(&mut self, f: Ref, g: Ref, level: Level) -> Ref {
        let lf = self.level_ref(f);
        if lf > level {
            // f does not depend on the substituted variable.
            return f;
        }

        let key = OpKey::Compose(level, g, f);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let res = if lf == level {
            self.ite_rec(g, self.high_ref(f), self.low_ref(f))
        } else {
            let low = self.compose_rec(self.low_ref(f), g, level);
            self.store.push_ref(low);
            let high = self.compose_rec(self.high_ref(f), g, level);
            self.store.push_ref(high);
            let r = self.mk(lf, low, high);
            self.store.pop_ref(2);
            r
        };

        self.cache.insert(key, res);
        res
    }

    /// Simultaneous composition: substitutes every pairing entry at once.
    pub fn vec_compose(&mut self, f: &Bdd, pairing: &Pairing) -> Bdd {
        debug!("vec_compose({}, gen {})", f.node(), pairing.generation());
        let r = self.veccompose_rec(f.node(), pairing);
        self.acquire(r)
    }

    fn veccompose_rec(&mut self, f: Ref, pairing: &Pairing) -> Ref {
        if f.is_terminal() {
            return f;
        }

        let key = OpKey::VecCompose(pairing.generation(), f);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let low = self.veccompose_rec(self.low_ref(f), pairing);
        self.store.push_ref(low);
        let high = self.veccompose_rec(self.high_ref(f), pairing);
        self.store.push_ref(high);

        let level = self.level_ref(f);
        let repl = match pairing.target(level) {
            Some(target) => target.repl,
            None => self.mk_level_var(level),
        };
        self.store.push_ref(repl);
        let res = self.ite_rec(repl, high, low);
        self.store.pop_ref(3);

        self.cache.insert(key, res);
        res
    }

    /// Renames variables according to a variable-to-variable pairing.
    ///
    /// Errors with [`Error::PairingKind`] if the pairing maps any variable
    /// to a general diagram.
    pub fn replace(&mut self, f: &Bdd, pairing: &Pairing) -> Result<Bdd> {
        debug!("replace({}, gen {})", f.node(), pairing.generation());
        if let Some(var) = self.pairing_diagram_entry(pairing) {
            return Err(Error::PairingKind(var));
        }
        let r = self.replace_rec(f.node(), pairing);
        Ok(self.acquire(r))
    }

    /// Consuming variant: `f` becomes `replace(f, pairing)`.
    pub fn replace_with(&mut self, f: &mut Bdd, pairing: &Pairing) -> Result<()> {
        if let Some(var) = self.pairing_diagram_entry(pairing) {
            return Err(Error::PairingKind(var));
        }
        let r = self.replace_rec(f.node(), pairing);
        self.reroot(f, r);
        Ok(())
    }

    fn replace_rec(&mut self, f: Ref, pairing: &Pairing) -> Ref {
        if f.is_terminal() {
            return f;
        }

        let key = OpKey::Replace(pairing.generation(), f);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let low = self.replace_rec(self.low_ref(f), pairing);
        self.store.push_ref(low);
        let high = self.replace_rec(self.high_ref(f), pairing);
        self.store.push_ref(high);

        let level = self.level_ref(f);
        let target = match pairing.target(level) {
            // The target of a var-to-var entry is that variable's level.
            Some(t) => self.level_ref(t.repl),
            None => level,
        };
        let res = self.correctify(target, low, high);
        self.store.pop_ref(2);

        self.cache.insert(key, res);
        res
    }

    /// Rebuilds a node at `level` over already-substituted children. When
    /// the replacement level is not above both children, a naive `mk` would
    /// break the ordering invariant; fall back to an ITE on the variable.
    fn correctify(&mut self, level: Level, low: Ref, high: Ref) -> Ref {
        if level < self.level_ref(low) && level < self.level_ref(high) {
            return self.mk(level, low, high);
        }
        let var = self.mk_level_var(level);
        self.store.push_ref(var);
        let res = self.ite_rec(var, high, low);
        self.store.pop_ref(1);
        res
    }

    /// Restricts `f` by a cube of literals: each variable of `c` is fixed
    /// to the literal's polarity. This is plain cofactoring, not the
    /// Coudert–Madre operator (see [`Factory::simplify`] for that).
    pub fn restrict(&mut self, f: &Bdd, c: &Bdd) -> Bdd {
        debug!("restrict({}, {})", f.node(), c.node());
        let r = self.restrict_rec(f.node(), c.node());
        self.acquire(r)
    }

    /// Consuming variant: `f` becomes `restrict(f, c)` and `c` is released.
    pub fn restrict_with(&mut self, f: &mut Bdd, c: Bdd) {
        let r = self.restrict_rec(f.node(), c.node());
        self.reroot(f, r);
        self.free(c);
    }

    fn restrict_rec(&mut self, f: Ref, c: Ref) -> Ref {
        if c.is_one() || f.is_terminal() {
            return f;
        }

        let key = OpKey::Restrict(f, c);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let lf = self.level_ref(f);
        let lc = self.level_ref(c);
        let res = if lc < lf {
            // The restricted variable is absent from f.
            let next = self.cube_tail(c);
            self.restrict_rec(f, next)
        } else if lc == lf {
            let (positive, next) = self.cube_literal(c);
            let child = if positive {
                self.high_ref(f)
            } else {
                self.low_ref(f)
            };
            self.restrict_rec(child, next)
        } else {
            let low = self.restrict_rec(self.low_ref(f), c);
            self.store.push_ref(low);
            let high = self.restrict_rec(self.high_ref(f), c);
            self.store.push_ref(high);
            let r = self.mk(lf, low, high);
            self.store.pop_ref(2);
            r
        };

        self.cache.insert(key, res);
        res
    }

    /// Polarity and continuation of the topmost literal of a cube.
    fn cube_literal(&self, c: Ref) -> (bool, Ref) {
        let low = self.low_ref(c);
        if low.is_zero() {
            (true, self.high_ref(c))
        } else {
            (false, low)
        }
    }

    fn cube_tail(&self, c: Ref) -> Ref {
        self.cube_literal(c).1
    }

    /// Generalized cofactor `f ↓ c`.
    pub fn constrain(&mut self, f: &Bdd, c: &Bdd) -> Bdd {
        debug!("constrain({}, {})", f.node(), c.node());
        let r = self.constrain_rec(f.node(), c.node());
        self.acquire(r)
    }

    fn constrain_rec(&mut self, f: Ref, c: Ref) -> Ref {
        if c.is_zero() {
            return Ref::ZERO;
        }
        if c.is_one() || f.is_terminal() {
            return f;
        }

        let key = OpKey::Constrain(f, c);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let v = self.level_ref(c).min(self.level_ref(f));
        let (f0, f1) = self.cofactors(f, v);
        let (c0, c1) = self.cofactors(c, v);

        let res = if c0.is_zero() {
            self.constrain_rec(f1, c1)
        } else if c1.is_zero() {
            self.constrain_rec(f0, c0)
        } else {
            let low = self.constrain_rec(f0, c0);
            self.store.push_ref(low);
            let high = self.constrain_rec(f1, c1);
            self.store.push_ref(high);
            let r = self.mk(v, low, high);
            self.store.pop_ref(2);
            r
        };

        self.cache.insert(key, res);
        res
    }

    /// Coudert–Madre restriction: uses the care set `d` to shrink `f`.
    /// The result agrees with `f` wherever `d` holds; no size check is
    /// performed, callers decide whether to keep the result. In ZDD mode
    /// the same recursion runs with the zero-suppressed reduction in `mk`.
    pub fn simplify(&mut self, f: &Bdd, d: &Bdd) -> Bdd {
        debug!("simplify({}, {})", f.node(), d.node());
        let r = self.simplify_rec(f.node(), d.node());
        self.acquire(r)
    }

    fn simplify_rec(&mut self, f: Ref, d: Ref) -> Ref {
        if d.is_one() || f.is_terminal() {
            return f;
        }
        if d == f {
            return Ref::ONE;
        }
        if d.is_zero() {
            return Ref::ZERO;
        }

        let key = OpKey::Simplify(f, d);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let lf = self.level_ref(f);
        let ld = self.level_ref(d);
        let res = if lf == ld {
            let (d0, d1) = (self.low_ref(d), self.high_ref(d));
            let (f0, f1) = (self.low_ref(f), self.high_ref(f));
            if d0.is_zero() {
                self.simplify_rec(f1, d1)
            } else if d1.is_zero() {
                self.simplify_rec(f0, d0)
            } else {
                let low = self.simplify_rec(f0, d0);
                self.store.push_ref(low);
                let high = self.simplify_rec(f1, d1);
                self.store.push_ref(high);
                let r = self.mk(lf, low, high);
                self.store.pop_ref(2);
                r
            }
        } else if lf < ld {
            let low = self.simplify_rec(self.low_ref(f), d);
            self.store.push_ref(low);
            let high = self.simplify_rec(self.high_ref(f), d);
            self.store.push_ref(high);
            let r = self.mk(lf, low, high);
            self.store.pop_ref(2);
            r
        } else {
            // The care set branches on a variable f ignores: f must agree
            // with itself on both halves of the care space.
            let low = self.simplify_rec(f, self.low_ref(d));
            self.store.push_ref(low);
            let high = self.simplify_rec(f, self.high_ref(d));
            self.store.push_ref(high);
            let r = self.apply_rec(crate::apply::Op::Or, low, high);
            self.store.pop_ref(2);
            r
        };

        self.cache.insert(key, res);
        res
    }
}
