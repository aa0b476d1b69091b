//! Quantification: ∃, ∀, unique (⊕), fused apply-quantify, relational
//! product, and support computation.
//!
//! `apply_ex(f, g, op, V)` fuses a dyadic apply with an existential
//! quantification into a single recursion over the combined levels. This is
//! asymptotically better than `apply` followed by `exist` and is the
//! backbone of the relational product used in symbolic reachability.

use std::collections::HashSet;

use log::debug;

use crate::apply::Op;
use crate::cache::OpKey;
use crate::factory::{Bdd, Factory};
use crate::types::{Level, Ref};
use crate::varset::VarSet;

/// A quantifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Quant {
    Exist,
    ForAll,
    /// Unique ("exactly one"): combines cofactors with ⊕.
    Unique,
}

impl Quant {
    /// The operator that joins the two cofactors at a quantified level.
    fn dual(self) -> Op {
        match self {
            Quant::Exist => Op::Or,
            Quant::ForAll => Op::And,
            Quant::Unique => Op::Xor,
        }
    }
}

impl Factory {
    /// Membership table of the cube's levels, indexed by level.
    fn quant_profile(&self, cube: Ref) -> Vec<bool> {
        let mut in_set = vec![false; self.var_num()];
        let mut r = cube;
        while !r.is_terminal() {
            in_set[self.level_ref(r).usize()] = true;
            r = self.high_ref(r);
        }
        in_set
    }

    /// ∃ / ∀ recursion; `cube` only identifies the set in cache keys.
    fn quant_rec(&mut self, f: Ref, q: Quant, in_set: &[bool], cube: Ref) -> Ref {
        debug_assert!(q != Quant::Unique);
        if f.is_terminal() {
            return f;
        }

        let key = OpKey::Quant(q, cube, f);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let level = self.level_ref(f);
        let low = self.quant_rec(self.low_ref(f), q, in_set, cube);
        self.store.push_ref(low);
        let high = self.quant_rec(self.high_ref(f), q, in_set, cube);
        self.store.push_ref(high);
        let res = if in_set[level.usize()] {
            self.apply_rec(q.dual(), low, high)
        } else {
            self.mk(level, low, high)
        };
        self.store.pop_ref(2);

        self.cache.insert(key, res);
        res
    }

    /// Unique quantification walks the cube alongside `f`: a quantified
    /// variable absent from `f` contributes `f ⊕ f = 0`.
    fn unique_rec(&mut self, f: Ref, cube: Ref) -> Ref {
        if cube.is_one() {
            return f;
        }
        let lf = self.level_ref(f);
        let lq = self.level_ref(cube);
        if lq < lf {
            return Ref::ZERO;
        }
        if f.is_terminal() {
            // Reachable only with a degenerate (terminal, non-ONE) cube.
            return f;
        }

        let key = OpKey::Quant(Quant::Unique, cube, f);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let res = if lf == lq {
            let next = self.high_ref(cube);
            let low = self.unique_rec(self.low_ref(f), next);
            self.store.push_ref(low);
            let high = self.unique_rec(self.high_ref(f), next);
            self.store.push_ref(high);
            let r = self.apply_rec(Op::Xor, low, high);
            self.store.pop_ref(2);
            r
        } else {
            let low = self.unique_rec(self.low_ref(f), cube);
            self.store.push_ref(low);
            let high = self.unique_rec(self.high_ref(f), cube);
            self.store.push_ref(high);
            let r = self.mk(lf, low, high);
            self.store.pop_ref(2);
            r
        };

        self.cache.insert(key, res);
        res
    }

    /// Fused ∃/∀ apply: one recursion per combined level.
    fn appquant_rec(
        &mut self,
        op: Op,
        q: Quant,
        f: Ref,
        g: Ref,
        in_set: &[bool],
        cube: Ref,
    ) -> Ref {
        debug_assert!(q != Quant::Unique);
        if let Some(t) = self.terminal_case(op, f, g) {
            // Quantifying a constant changes nothing; an operand that
            // survives the shortcut still has to be quantified.
            return if t.is_terminal() {
                t
            } else {
                self.quant_rec(t, q, in_set, cube)
            };
        }

        let key = OpKey::ApplyQuant(op, q, cube, f, g);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let v = self.level_ref(f).min(self.level_ref(g));
        let (f0, f1) = self.cofactors(f, v);
        let (g0, g1) = self.cofactors(g, v);

        let low = self.appquant_rec(op, q, f0, g0, in_set, cube);
        self.store.push_ref(low);
        let high = self.appquant_rec(op, q, f1, g1, in_set, cube);
        self.store.push_ref(high);
        let res = if in_set[v.usize()] {
            self.apply_rec(q.dual(), low, high)
        } else {
            self.mk(v, low, high)
        };
        self.store.pop_ref(2);

        self.cache.insert(key, res);
        res
    }

    /// Fused unique apply, walking the cube alongside both operands.
    fn appuni_rec(&mut self, op: Op, f: Ref, g: Ref, cube: Ref) -> Ref {
        let lq = self.level_ref(cube);
        let lf = self.level_ref(f);
        let lg = self.level_ref(g);
        if lq < lf && lq < lg {
            // The quantified variable occurs in neither operand.
            return Ref::ZERO;
        }

        if let Some(t) = self.terminal_case(op, f, g) {
            if cube.is_one() {
                return t;
            }
            return if t.is_terminal() {
                Ref::ZERO
            } else {
                self.unique_rec(t, cube)
            };
        }

        let key = OpKey::ApplyQuant(op, Quant::Unique, cube, f, g);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let v = lf.min(lg);
        let (f0, f1) = self.cofactors(f, v);
        let (g0, g1) = self.cofactors(g, v);

        let res = if v == lq {
            let next = self.high_ref(cube);
            let low = self.appuni_rec(op, f0, g0, next);
            self.store.push_ref(low);
            let high = self.appuni_rec(op, f1, g1, next);
            self.store.push_ref(high);
            let r = self.apply_rec(Op::Xor, low, high);
            self.store.pop_ref(2);
            r
        } else {
            let low = self.appuni_rec(op, f0, g0, cube);
            self.store.push_ref(low);
            let high = self.appuni_rec(op, f1, g1, cube);
            self.store.push_ref(high);
            let r = self.mk(v, low, high);
            self.store.pop_ref(2);
            r
        };

        self.cache.insert(key, res);
        res
    }

    // ─── Public surface ─────────────────────────────────────────────────────

    /// Existential quantification `∃ V. f`.
    pub fn exist(&mut self, f: &Bdd, set: &VarSet) -> Bdd {
        debug!("exist({}, {})", f.node(), set.node());
        if set.is_empty() {
            return self.id(f);
        }
        let in_set = self.quant_profile(set.node());
        let r = self.quant_rec(f.node(), Quant::Exist, &in_set, set.node());
        self.acquire(r)
    }

    /// Universal quantification `∀ V. f`.
    pub fn for_all(&mut self, f: &Bdd, set: &VarSet) -> Bdd {
        debug!("for_all({}, {})", f.node(), set.node());
        if set.is_empty() {
            return self.id(f);
        }
        let in_set = self.quant_profile(set.node());
        let r = self.quant_rec(f.node(), Quant::ForAll, &in_set, set.node());
        self.acquire(r)
    }

    /// Unique quantification `⊕ V. f`.
    pub fn unique(&mut self, f: &Bdd, set: &VarSet) -> Bdd {
        debug!("unique({}, {})", f.node(), set.node());
        let r = self.unique_rec(f.node(), set.node());
        self.acquire(r)
    }

    /// Fused `∃ V. (f op g)`.
    pub fn apply_ex(&mut self, f: &Bdd, g: &Bdd, op: Op, set: &VarSet) -> Bdd {
        debug!("apply_ex({:?}, {}, {}, {})", op, f.node(), g.node(), set.node());
        let in_set = self.quant_profile(set.node());
        let r = self.appquant_rec(op, Quant::Exist, f.node(), g.node(), &in_set, set.node());
        self.acquire(r)
    }

    /// Fused `∀ V. (f op g)`.
    pub fn apply_all(&mut self, f: &Bdd, g: &Bdd, op: Op, set: &VarSet) -> Bdd {
        debug!("apply_all({:?}, {}, {}, {})", op, f.node(), g.node(), set.node());
        let in_set = self.quant_profile(set.node());
        let r = self.appquant_rec(op, Quant::ForAll, f.node(), g.node(), &in_set, set.node());
        self.acquire(r)
    }

    /// Fused `⊕ V. (f op g)`.
    pub fn apply_uni(&mut self, f: &Bdd, g: &Bdd, op: Op, set: &VarSet) -> Bdd {
        debug!("apply_uni({:?}, {}, {}, {})", op, f.node(), g.node(), set.node());
        let r = self.appuni_rec(op, f.node(), g.node(), set.node());
        self.acquire(r)
    }

    /// Relational product `∃ V. (f ∧ g)`.
    pub fn rel_prod(&mut self, f: &Bdd, g: &Bdd, set: &VarSet) -> Bdd {
        self.apply_ex(f, g, Op::And, set)
    }

    /// The set of variables `f` depends on.
    pub fn support(&mut self, f: &Bdd) -> VarSet {
        let key = OpKey::Support(f.node());
        if let Some(cube) = self.cache.get(key) {
            self.store.incref(cube);
            return VarSet::new(cube);
        }

        let mut levels: Vec<Level> = Vec::new();
        let mut seen: HashSet<Ref> = HashSet::new();
        let mut stack = vec![f.node()];
        while let Some(r) = stack.pop() {
            if r.is_terminal() || !seen.insert(r) {
                continue;
            }
            levels.push(self.level_ref(r));
            stack.push(self.low_ref(r));
            stack.push(self.high_ref(r));
        }

        let set = self.make_set_levels(levels);
        self.cache.insert(key, set.node());
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mode, Var};

    fn setup(n: usize) -> (Factory, Vec<Bdd>) {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(n);
        let vars = (0..n)
            .map(|i| f.ith_var(Var::new(i as u32)).unwrap())
            .collect();
        (f, vars)
    }

    #[test]
    fn test_exist_drops_variable() {
        let (mut f, vars) = setup(2);
        let ab = f.and(&vars[0], &vars[1]);
        let set = f.make_set(&[Var::new(0)]).unwrap();
        let r = f.exist(&ab, &set);
        // ∃a. (a ∧ b) == b
        assert_eq!(r, f.id(&vars[1]));
    }

    #[test]
    fn test_forall_via_de_morgan() {
        let (mut f, vars) = setup(2);
        let ab = f.or(&vars[0], &vars[1]);
        let set = f.make_set(&[Var::new(0)]).unwrap();

        let direct = f.for_all(&ab, &set);
        let not_ab = f.not(&ab);
        let ex = f.exist(&not_ab, &set);
        let expected = f.not(&ex);
        assert_eq!(direct, expected);
    }

    #[test]
    fn test_unique_of_independent_function_is_zero() {
        let (mut f, vars) = setup(2);
        let set = f.make_set(&[Var::new(0)]).unwrap();
        // x1 does not depend on x0: ⊕x0. x1 == x1 ⊕ x1 == 0
        let r = f.unique(&vars[1], &set);
        assert!(f.is_zero(&r));
    }

    #[test]
    fn test_unique_of_variable_is_one() {
        let (mut f, _vars) = setup(1);
        let x = f.ith_var(Var::new(0)).unwrap();
        let set = f.make_set(&[Var::new(0)]).unwrap();
        // ⊕x. x == x|1 ⊕ x|0 == 1 ⊕ 0 == 1
        let r = f.unique(&x, &set);
        assert!(f.is_one(&r));
    }

    #[test]
    fn test_relprod_matches_exist_of_and() {
        let (mut f, vars) = setup(3);
        let fg = f.and(&vars[0], &vars[1]);
        let gh = f.or(&vars[1], &vars[2]);
        let set = f.make_set(&[Var::new(1)]).unwrap();

        let fused = f.rel_prod(&fg, &gh, &set);
        let conj = f.and(&fg, &gh);
        let expected = f.exist(&conj, &set);
        assert_eq!(fused, expected);
    }

    #[test]
    fn test_relprod_of_independent_literals() {
        // relprod(x, y, {x}) == y
        let (mut f, vars) = setup(2);
        let set = f.make_set(&[Var::new(0)]).unwrap();
        let r = f.rel_prod(&vars[0], &vars[1], &set);
        assert_eq!(r, f.id(&vars[1]));
    }

    #[test]
    fn test_apply_all_matches_unfused() {
        let (mut f, vars) = setup(3);
        let fg = f.xor(&vars[0], &vars[1]);
        let gh = f.imp(&vars[1], &vars[2]);
        let set = f.make_set(&[Var::new(1), Var::new(2)]).unwrap();

        let fused = f.apply_all(&fg, &gh, Op::Or, &set);
        let dis = f.or(&fg, &gh);
        let expected = f.for_all(&dis, &set);
        assert_eq!(fused, expected);
    }

    #[test]
    fn test_apply_uni_matches_unfused() {
        let (mut f, vars) = setup(3);
        let fg = f.and(&vars[0], &vars[1]);
        let gh = f.xor(&vars[1], &vars[2]);
        let set = f.make_set(&[Var::new(0), Var::new(2)]).unwrap();

        let fused = f.apply_uni(&fg, &gh, Op::Or, &set);
        let dis = f.or(&fg, &gh);
        let expected = f.unique(&dis, &set);
        assert_eq!(fused, expected);
    }

    #[test]
    fn test_support() {
        let (mut f, vars) = setup(4);
        let ab = f.and(&vars[0], &vars[2]);
        let s = f.support(&ab);
        assert_eq!(f.set_vars(&s), vec![Var::new(0), Var::new(2)]);

        let one = f.one();
        let empty = f.support(&one);
        assert!(empty.is_empty());
    }
}
