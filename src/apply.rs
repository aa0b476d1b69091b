//! The recursive apply family: dyadic operators, negation, ITE.
//!
//! All of these compute Boolean operators by structural recursion over the
//! operand DAGs, splitting at the minimum level and hash-consing the result,
//! with memoization through the factory's operator cache. Results are
//! pinned on the store's ref stack while in flight, so a GC triggered by an
//! interior `mk` cannot sweep them.

use log::debug;

use crate::cache::OpKey;
use crate::factory::{Bdd, Factory};
use crate::types::{Level, Ref};

/// A dyadic Boolean operator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Op {
    And,
    Or,
    Xor,
    Nand,
    Nor,
    /// Implication `a → b`.
    Imp,
    /// Biimplication `a ↔ b`.
    Biimp,
    /// Difference `a ∧ ¬b`.
    Diff,
    /// Strictly-less `¬a ∧ b`.
    Less,
    /// Inverse implication `a ∨ ¬b`.
    Invimp,
}

impl Op {
    /// Truth table of the operator.
    pub fn eval(self, a: bool, b: bool) -> bool {
        match self {
            Op::And => a && b,
            Op::Or => a || b,
            Op::Xor => a ^ b,
            Op::Nand => !(a && b),
            Op::Nor => !(a || b),
            Op::Imp => !a || b,
            Op::Biimp => a == b,
            Op::Diff => a && !b,
            Op::Less => !a && b,
            Op::Invimp => a || !b,
        }
    }
}

fn terminal_of(value: bool) -> Ref {
    if value {
        Ref::ONE
    } else {
        Ref::ZERO
    }
}

impl Factory {
    /// Terminal shortcuts of `op` on `(f, g)`: cases where the result is an
    /// operand, its constant, or follows from the truth table.
    pub(crate) fn terminal_case(&self, op: Op, f: Ref, g: Ref) -> Option<Ref> {
        let res = match op {
            Op::And => {
                if f == g {
                    Some(f)
                } else if f.is_zero() || g.is_zero() {
                    Some(Ref::ZERO)
                } else if f.is_one() {
                    Some(g)
                } else if g.is_one() {
                    Some(f)
                } else {
                    None
                }
            }
            Op::Or => {
                if f == g {
                    Some(f)
                } else if f.is_one() || g.is_one() {
                    Some(Ref::ONE)
                } else if f.is_zero() {
                    Some(g)
                } else if g.is_zero() {
                    Some(f)
                } else {
                    None
                }
            }
            Op::Xor => {
                if f == g {
                    Some(Ref::ZERO)
                } else if f.is_zero() {
                    Some(g)
                } else if g.is_zero() {
                    Some(f)
                } else {
                    None
                }
            }
            Op::Nand => {
                if f.is_zero() || g.is_zero() {
                    Some(Ref::ONE)
                } else {
                    None
                }
            }
            Op::Nor => {
                if f.is_one() || g.is_one() {
                    Some(Ref::ZERO)
                } else {
                    None
                }
            }
            Op::Imp => {
                if f == g || f.is_zero() || g.is_one() {
                    Some(Ref::ONE)
                } else if f.is_one() {
                    Some(g)
                } else {
                    None
                }
            }
            Op::Biimp => {
                if f == g {
                    Some(Ref::ONE)
                } else if f.is_one() {
                    Some(g)
                } else if g.is_one() {
                    Some(f)
                } else {
                    None
                }
            }
            Op::Diff => {
                if f == g || f.is_zero() || g.is_one() {
                    Some(Ref::ZERO)
                } else if g.is_zero() {
                    Some(f)
                } else {
                    None
                }
            }
            Op::Less => {
                if f == g || f.is_one() || g.is_zero() {
                    Some(Ref::ZERO)
                } else if f.is_zero() {
                    Some(g)
                } else {
                    None
                }
            }
            Op::Invimp => {
                if f == g || f.is_one() || g.is_zero() {
                    Some(Ref::ONE)
                } else if g.is_one() {
                    Some(f)
                } else {
                    None
                }
            }
        };
        if res.is_some() {
            return res;
        }
        if f.is_terminal() && g.is_terminal() {
            return Some(terminal_of(op.eval(f.is_one(), g.is_one())));
        }
        None
    }

    /// Top cofactors of `r` with respect to the variable at `level`.
    ///
    /// When `r` is rooted below `level` (or is a terminal), it does not
    /// depend on that variable and both cofactors are `r` itself.
    #[inline]
    pub(crate) fn cofactors(&self, r: Ref, level: Level) -> (Ref, Ref) {
        if self.level_ref(r) == level {
            (self.low_ref(r), self.high_ref(r))
        } else {
            (r, r)
        }
    }

    pub(crate) fn apply_rec(&mut self, op: Op, f: Ref, g: Ref) -> Ref {
        if let Some(r) = self.terminal_case(op, f, g) {
            return r;
        }

        let key = OpKey::Apply(op, f, g);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let v = self.level_ref(f).min(self.level_ref(g));
        let (f0, f1) = self.cofactors(f, v);
        let (g0, g1) = self.cofactors(g, v);

        let low = self.apply_rec(op, f0, g0);
        self.store.push_ref(low);
        let high = self.apply_rec(op, f1, g1);
        self.store.push_ref(high);
        let res = self.mk(v, low, high);
        self.store.pop_ref(2);

        self.cache.insert(key, res);
        res
    }

    pub(crate) fn not_rec(&mut self, f: Ref) -> Ref {
        if f.is_zero() {
            return Ref::ONE;
        }
        if f.is_one() {
            return Ref::ZERO;
        }

        let key = OpKey::Not(f);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let low = self.not_rec(self.low_ref(f));
        self.store.push_ref(low);
        let high = self.not_rec(self.high_ref(f));
        self.store.push_ref(high);
        let res = self.mk(self.level_ref(f), low, high);
        self.store.pop_ref(2);

        self.cache.insert(key, res);
        res
    }

    pub(crate) fn ite_rec(&mut self, f: Ref, g: Ref, h: Ref) -> Ref {
        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        if f.is_one() {
            return g;
        }
        if f.is_zero() {
            return h;
        }
        if g == h {
            return g;
        }
        if g.is_one() && h.is_zero() {
            return f;
        }

        let key = OpKey::Ite(f, g, h);
        if let Some(r) = self.cache.get(key) {
            return r;
        }

        let v = self
            .level_ref(f)
            .min(self.level_ref(g))
            .min(self.level_ref(h));
        let (f0, f1) = self.cofactors(f, v);
        let (g0, g1) = self.cofactors(g, v);
        let (h0, h1) = self.cofactors(h, v);

        let low = self.ite_rec(f0, g0, h0);
        self.store.push_ref(low);
        let high = self.ite_rec(f1, g1, h1);
        self.store.push_ref(high);
        let res = self.mk(v, low, high);
        self.store.pop_ref(2);

        self.cache.insert(key, res);
        res
    }

    // ─── Public surface ─────────────────────────────────────────────────────

    /// Generic dyadic apply.
    pub fn apply(&mut self, f: &Bdd, g: &Bdd, op: Op) -> Bdd {
        debug!("apply({:?}, {}, {})", op, f.node(), g.node());
        let r = self.apply_rec(op, f.node(), g.node());
        self.acquire(r)
    }

    /// Consuming apply: `f` becomes `f op g`, and `g` is released.
    pub fn apply_with(&mut self, f: &mut Bdd, g: Bdd, op: Op) {
        let r = self.apply_rec(op, f.node(), g.node());
        self.reroot(f, r);
        self.free(g);
    }

    pub fn not(&mut self, f: &Bdd) -> Bdd {
        let r = self.not_rec(f.node());
        self.acquire(r)
    }

    pub fn and(&mut self, f: &Bdd, g: &Bdd) -> Bdd {
        self.apply(f, g, Op::And)
    }

    pub fn or(&mut self, f: &Bdd, g: &Bdd) -> Bdd {
        self.apply(f, g, Op::Or)
    }

    pub fn xor(&mut self, f: &Bdd, g: &Bdd) -> Bdd {
        self.apply(f, g, Op::Xor)
    }

    pub fn imp(&mut self, f: &Bdd, g: &Bdd) -> Bdd {
        self.apply(f, g, Op::Imp)
    }

    pub fn biimp(&mut self, f: &Bdd, g: &Bdd) -> Bdd {
        self.apply(f, g, Op::Biimp)
    }

    pub fn diff(&mut self, f: &Bdd, g: &Bdd) -> Bdd {
        self.apply(f, g, Op::Diff)
    }

    pub fn and_with(&mut self, f: &mut Bdd, g: Bdd) {
        self.apply_with(f, g, Op::And);
    }

    pub fn or_with(&mut self, f: &mut Bdd, g: Bdd) {
        self.apply_with(f, g, Op::Or);
    }

    pub fn xor_with(&mut self, f: &mut Bdd, g: Bdd) {
        self.apply_with(f, g, Op::Xor);
    }

    pub fn imp_with(&mut self, f: &mut Bdd, g: Bdd) {
        self.apply_with(f, g, Op::Imp);
    }

    pub fn biimp_with(&mut self, f: &mut Bdd, g: Bdd) {
        self.apply_with(f, g, Op::Biimp);
    }

    pub fn diff_with(&mut self, f: &mut Bdd, g: Bdd) {
        self.apply_with(f, g, Op::Diff);
    }

    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`.
    pub fn ite(&mut self, f: &Bdd, g: &Bdd, h: &Bdd) -> Bdd {
        debug!("ite({}, {}, {})", f.node(), g.node(), h.node());
        let r = self.ite_rec(f.node(), g.node(), h.node());
        self.acquire(r)
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
    fn test_and_canonicity() {
        let (mut f, vars) = setup(2);
        let ab = f.and(&vars[0], &vars[1]);
        let ba = f.and(&vars[1], &vars[0]);
        assert_eq!(ab, ba);

        let aa = f.and(&vars[0], &vars[0]);
        assert_eq!(aa, f.id(&vars[0]));
    }

    #[test]
    fn test_double_negation() {
        let (mut f, vars) = setup(2);
        let ab = f.xor(&vars[0], &vars[1]);
        let n = f.not(&ab);
        let nn = f.not(&n);
        assert_eq!(nn, ab);
    }

    #[test]
    fn test_de_morgan() {
        let (mut f, vars) = setup(2);
        let ab = f.and(&vars[0], &vars[1]);
        let lhs = f.not(&ab);

        let na = f.not(&vars[0]);
        let nb = f.not(&vars[1]);
        let rhs = f.or(&na, &nb);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_xor_as_ite() {
        let (mut f, vars) = setup(2);
        let x = f.xor(&vars[0], &vars[1]);
        let nb = f.not(&vars[1]);
        let ite = f.ite(&vars[0], &nb, &vars[1]);
        assert_eq!(x, ite);
    }

    #[test]
    fn test_ite_laws() {
        let (mut f, vars) = setup(3);
        let one = f.one();
        let zero = f.zero();

        // ite(a, 1, 0) == a
        let r = f.ite(&vars[0], &one, &zero);
        assert_eq!(r, f.id(&vars[0]));

        // ite(a, b, b) == b
        let r = f.ite(&vars[0], &vars[1], &vars[1]);
        assert_eq!(r, f.id(&vars[1]));

        // ite(1, b, c) == b
        let r = f.ite(&one, &vars[1], &vars[2]);
        assert_eq!(r, f.id(&vars[1]));
    }

    #[test]
    fn test_implication_table() {
        let (mut f, vars) = setup(2);
        // a → b  ==  ¬a ∨ b
        let imp = f.imp(&vars[0], &vars[1]);
        let na = f.not(&vars[0]);
        let expected = f.or(&na, &vars[1]);
        assert_eq!(imp, expected);

        // a ↔ b  ==  ¬(a ⊕ b)
        let biimp = f.biimp(&vars[0], &vars[1]);
        let x = f.xor(&vars[0], &vars[1]);
        let expected = f.not(&x);
        assert_eq!(biimp, expected);

        // diff, less, invimp, nand, nor against their definitions
        let nb = f.not(&vars[1]);
        let diff = f.apply(&vars[0], &vars[1], Op::Diff);
        let expected = f.and(&vars[0], &nb);
        assert_eq!(diff, expected);

        let less = f.apply(&vars[0], &vars[1], Op::Less);
        let expected = f.and(&na, &vars[1]);
        assert_eq!(less, expected);

        let invimp = f.apply(&vars[0], &vars[1], Op::Invimp);
        let expected = f.or(&vars[0], &nb);
        assert_eq!(invimp, expected);

        let nand = f.apply(&vars[0], &vars[1], Op::Nand);
        let ab = f.and(&vars[0], &vars[1]);
        let expected = f.not(&ab);
        assert_eq!(nand, expected);

        let nor = f.apply(&vars[0], &vars[1], Op::Nor);
        let aob = f.or(&vars[0], &vars[1]);
        let expected = f.not(&aob);
        assert_eq!(nor, expected);
    }

    #[test]
    fn test_apply_with_consumes() {
        let (mut f, mut vars) = setup(2);
        let b = vars.pop().unwrap();
        let mut a = vars.pop().unwrap();

        let expected = f.and(&a, &b);
        let b_rc_before = f.refcount(&b);
        f.and_with(&mut a, b);
        assert_eq!(a, expected);
        // `b` (a single-literal node) lost the reference the handle held.
        let expected_b = f.ith_var(Var::new(1)).unwrap();
        assert_eq!(f.refcount(&expected_b), b_rc_before);
    }

    #[test]
    fn test_apply_survives_gc_pressure() {
        // A store this small must collect and grow mid-apply.
        let mut f = Factory::with_capacity(Mode::Bdd, 4, 4);
        f.set_var_num(8);
        let mut acc = f.one();
        for i in 0..8 {
            let x = f.ith_var(Var::new(i)).unwrap();
            f.and_with(&mut acc, x);
        }
        // acc is the cube x0..x7: one path of 8 nodes.
        let mut r = acc.node();
        let mut len = 0;
        while !r.is_one() {
            r = f.high_ref(r);
            len += 1;
        }
        assert_eq!(len, 8);
    }
}
