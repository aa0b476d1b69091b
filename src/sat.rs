//! Model counting, structural statistics, and single-model extraction.

use std::collections::{HashMap, HashSet};

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::factory::{Bdd, Factory};
use crate::types::{Level, Mode, Ref};
use crate::varset::VarSet;

impl Factory {
    /// Level of `r` with terminals mapped to the variable count, so that
    /// level differences measure skipped variables.
    fn counting_level(&self, r: Ref) -> usize {
        let level = self.level_ref(r);
        if level.is_terminal() {
            self.var_num()
        } else {
            level.usize()
        }
    }

    /// Number of distinct inner nodes reachable from `f`.
    pub fn node_count(&self, f: &Bdd) -> usize {
        let mut seen: HashSet<Ref> = HashSet::new();
        let mut stack = vec![f.node()];
        while let Some(r) = stack.pop() {
            if r.is_terminal() || !seen.insert(r) {
                continue;
            }
            stack.push(self.low_ref(r));
            stack.push(self.high_ref(r));
        }
        seen.len()
    }

    /// Number of paths from `f` to the TRUE terminal.
    pub fn path_count(&self, f: &Bdd) -> BigUint {
        let mut memo: HashMap<Ref, BigUint> = HashMap::new();
        self.path_count_rec(f.node(), &mut memo)
    }

    fn path_count_rec(&self, r: Ref, memo: &mut HashMap<Ref, BigUint>) -> BigUint {
        if r.is_zero() {
            return BigUint::zero();
        }
        if r.is_one() {
            return BigUint::from(1u32);
        }
        if let Some(count) = memo.get(&r) {
            return count.clone();
        }
        let count = self.path_count_rec(self.low_ref(r), memo)
            + self.path_count_rec(self.high_ref(r), memo);
        memo.insert(r, count.clone());
        count
    }

    /// Number of satisfying assignments over all declared variables.
    ///
    /// In BDD mode, `sat_count(one) == 2^var_num` and the count is exact.
    /// In ZDD mode, each combination of the represented family counts once;
    /// the universe then counts `2^var_num` while the ONE terminal counts 1.
    pub fn sat_count(&self, f: &Bdd) -> BigUint {
        match self.mode() {
            Mode::Bdd => {
                let mut memo: HashMap<Ref, BigUint> = HashMap::new();
                let scaled = self.sat_count_rec(f.node(), &mut memo);
                scaled << self.counting_level(f.node())
            }
            Mode::Zdd => {
                let mut memo: HashMap<Ref, BigUint> = HashMap::new();
                self.combination_count_rec(f.node(), &mut memo)
            }
        }
    }

    /// BDD-mode count of assignments over the variables below `r`'s level.
    fn sat_count_rec(&self, r: Ref, memo: &mut HashMap<Ref, BigUint>) -> BigUint {
        if r.is_zero() {
            return BigUint::zero();
        }
        if r.is_one() {
            return BigUint::from(1u32);
        }
        if let Some(count) = memo.get(&r) {
            return count.clone();
        }

        let level = self.counting_level(r);
        let (low, high) = (self.low_ref(r), self.high_ref(r));
        let count_low = self.sat_count_rec(low, memo) << (self.counting_level(low) - level - 1);
        let count_high = self.sat_count_rec(high, memo) << (self.counting_level(high) - level - 1);
        let count = count_low + count_high;

        memo.insert(r, count.clone());
        count
    }

    fn combination_count_rec(&self, r: Ref, memo: &mut HashMap<Ref, BigUint>) -> BigUint {
        if r.is_zero() {
            return BigUint::zero();
        }
        if r.is_one() {
            return BigUint::from(1u32);
        }
        if let Some(count) = memo.get(&r) {
            return count.clone();
        }
        let count = self.combination_count_rec(self.low_ref(r), memo)
            + self.combination_count_rec(self.high_ref(r), memo);
        memo.insert(r, count.clone());
        count
    }

    /// Satisfying assignments counted over `set` only.
    ///
    /// Assumes `f` does not constrain variables outside `set` (quantify
    /// them away first), mirroring the classic `bdd_satcountset`.
    pub fn sat_count_over(&self, f: &Bdd, set: &VarSet) -> BigUint {
        if set.is_empty() || f.node().is_zero() {
            return BigUint::zero();
        }
        match self.mode() {
            Mode::Bdd => {
                let unused = self.var_num() - self.set_size(set);
                self.sat_count(f) >> unused
            }
            Mode::Zdd => self.sat_count(f),
        }
    }

    /// Natural logarithm of the satisfying-assignment count.
    pub fn log_sat_count(&self, f: &Bdd) -> f64 {
        self.sat_count(f).to_f64().unwrap_or(f64::INFINITY).ln()
    }

    /// Number of nodes per variable, indexed by variable.
    pub fn var_profile(&self, f: &Bdd) -> Vec<usize> {
        let mut profile = vec![0usize; self.var_num()];
        let mut seen: HashSet<Ref> = HashSet::new();
        let mut stack = vec![f.node()];
        while let Some(r) = stack.pop() {
            if r.is_terminal() || !seen.insert(r) {
                continue;
            }
            let var = self.var_at_level(self.level_ref(r));
            profile[var.usize()] += 1;
            stack.push(self.low_ref(r));
            stack.push(self.high_ref(r));
        }
        profile
    }

    /// One cube implied by `f`; variables `f` does not constrain along the
    /// chosen path are absent from the result. `sat_one(zero) == zero`.
    pub fn sat_one(&mut self, f: &Bdd) -> Bdd {
        let r = self.sat_one_rec(f.node());
        self.acquire(r)
    }

    fn sat_one_rec(&mut self, r: Ref) -> Ref {
        if r.is_terminal() {
            return r;
        }
        let level = self.level_ref(r);
        let low = self.low_ref(r);
        if low.is_zero() {
            let t = self.sat_one_rec(self.high_ref(r));
            self.store.push_ref(t);
            let res = self.mk(level, Ref::ZERO, t);
            self.store.pop_ref(1);
            res
        } else {
            let t = self.sat_one_rec(low);
            self.store.push_ref(t);
            let res = self.mk(level, t, Ref::ZERO);
            self.store.pop_ref(1);
            res
        }
    }

    /// One full minterm implied by `f`: every declared variable appears;
    /// unconstrained variables default to 0.
    pub fn full_sat_one(&mut self, f: &Bdd) -> Bdd {
        if f.node().is_zero() {
            return self.zero();
        }
        let mut r = self.full_sat_one_rec(f.node());
        let top = self.counting_level(f.node());
        for level in (0..top).rev() {
            self.store.push_ref(r);
            let next = self.mk(Level::new(level as u32), r, Ref::ZERO);
            self.store.pop_ref(1);
            r = next;
        }
        self.acquire(r)
    }

    fn full_sat_one_rec(&mut self, r: Ref) -> Ref {
        if r.is_terminal() {
            return r;
        }
        let level = self.level_ref(r);
        let low = self.low_ref(r);
        let (child, take_high) = if low.is_zero() {
            (self.high_ref(r), true)
        } else {
            (low, false)
        };

        let mut t = self.full_sat_one_rec(child);
        // Default the variables skipped between this node and the child to 0.
        let child_level = self.counting_level(child);
        for skipped in ((level.usize() + 1)..child_level).rev() {
            self.store.push_ref(t);
            let next = self.mk(Level::new(skipped as u32), t, Ref::ZERO);
            self.store.pop_ref(1);
            t = next;
        }

        self.store.push_ref(t);
        let res = if take_high {
            self.mk(level, Ref::ZERO, t)
        } else {
            self.mk(level, t, Ref::ZERO)
        };
        self.store.pop_ref(1);
        res
    }

    /// One cube implied by `f`, mentioning exactly the variables of `set`
    /// that `f` constrains plus the rest of `set` forced to polarity `pol`.
    pub fn sat_one_over(&mut self, f: &Bdd, set: &VarSet, pol: bool) -> Bdd {
        if f.node().is_zero() {
            return self.zero();
        }
        let r = self.sat_one_set_rec(f.node(), set.node(), pol);
        self.acquire(r)
    }

    fn sat_one_set_rec(&mut self, r: Ref, cube: Ref, pol: bool) -> Ref {
        if r.is_terminal() && cube.is_terminal() {
            return r;
        }
        let lr = self.level_ref(r);
        let lc = self.level_ref(cube);

        if lr < lc {
            let low = self.low_ref(r);
            if low.is_zero() {
                let t = self.sat_one_set_rec(self.high_ref(r), cube, pol);
                self.store.push_ref(t);
                let res = self.mk(lr, Ref::ZERO, t);
                self.store.pop_ref(1);
                res
            } else {
                let t = self.sat_one_set_rec(low, cube, pol);
                self.store.push_ref(t);
                let res = self.mk(lr, t, Ref::ZERO);
                self.store.pop_ref(1);
                res
            }
        } else if lc < lr {
            // A set variable f does not constrain: force `pol`.
            let t = self.sat_one_set_rec(r, self.high_ref(cube), pol);
            self.store.push_ref(t);
            let res = if pol {
                self.mk(lc, Ref::ZERO, t)
            } else {
                self.mk(lc, t, Ref::ZERO)
            };
            self.store.pop_ref(1);
            res
        } else {
            let next = self.high_ref(cube);
            let low = self.low_ref(r);
            if low.is_zero() {
                let t = self.sat_one_set_rec(self.high_ref(r), next, pol);
                self.store.push_ref(t);
                let res = self.mk(lr, Ref::ZERO, t);
                self.store.pop_ref(1);
                res
            } else {
                let t = self.sat_one_set_rec(low, next, pol);
                self.store.push_ref(t);
                let res = self.mk(lr, t, Ref::ZERO);
                self.store.pop_ref(1);
                res
            }
        }
    }

    /// Evaluates `f` under a total assignment indexed by variable.
    pub fn eval(&self, f: &Bdd, assignment: &[bool]) -> Result<bool> {
        if assignment.len() < self.var_num() {
            return Err(Error::SizeMismatch {
                left: assignment.len(),
                right: self.var_num(),
            });
        }
        let bit = |fac: &Self, level: Level| {
            let var = fac.var_at_level(level);
            assignment[var.usize()]
        };
        match self.mode() {
            Mode::Bdd => {
                let mut r = f.node();
                while !r.is_terminal() {
                    r = if bit(self, self.level_ref(r)) {
                        self.high_ref(r)
                    } else {
                        self.low_ref(r)
                    };
                }
                Ok(r.is_one())
            }
            Mode::Zdd => {
                // A variable absent along a ZDD path is fixed to 0.
                let mut r = f.node();
                for index in 0..self.var_num() as u32 {
                    let level = Level::new(index);
                    if !r.is_terminal() && self.level_ref(r) == level {
                        r = if bit(self, level) {
                            self.high_ref(r)
                        } else {
                            self.low_ref(r)
                        };
                    } else if bit(self, level) {
                        return Ok(false);
                    }
                }
                Ok(r.is_one())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Var;

    fn setup(n: usize) -> (Factory, Vec<Bdd>) {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(n);
        let vars = (0..n)
            .map(|i| f.ith_var(Var::new(i as u32)).unwrap())
            .collect();
        (f, vars)
    }

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_sat_count_terminals() {
        let (mut f, _) = setup(3);
        let zero = f.zero();
        let one = f.one();
        assert_eq!(f.sat_count(&zero), big(0));
        assert_eq!(f.sat_count(&one), big(8));
    }

    #[test]
    fn test_sat_count_literals_and_cubes() {
        let (mut f, vars) = setup(3);
        assert_eq!(f.sat_count(&vars[0]), big(4));
        assert_eq!(f.sat_count(&vars[2]), big(4));

        let ab = f.and(&vars[0], &vars[1]);
        assert_eq!(f.sat_count(&ab), big(2));

        let tauto = {
            let na = f.not(&vars[0]);
            f.or(&vars[0], &na)
        };
        assert_eq!(f.sat_count(&tauto), big(8));
    }

    #[test]
    fn test_sat_count_inclusion_exclusion() {
        let (mut f, vars) = setup(4);
        let a = f.xor(&vars[0], &vars[1]);
        let b = f.imp(&vars[2], &vars[3]);
        let union = f.or(&a, &b);
        let inter = f.and(&a, &b);
        assert_eq!(
            f.sat_count(&union) + f.sat_count(&inter),
            f.sat_count(&a) + f.sat_count(&b)
        );
    }

    #[test]
    fn test_sat_count_over_set() {
        let (mut f, vars) = setup(4);
        let ab = f.and(&vars[0], &vars[1]);
        let set = f.make_set(&[Var::new(0), Var::new(1)]).unwrap();
        assert_eq!(f.sat_count_over(&ab, &set), big(1));

        let empty = f.make_set(&[]).unwrap();
        assert_eq!(f.sat_count_over(&ab, &empty), big(0));
    }

    #[test]
    fn test_path_count() {
        let (mut f, vars) = setup(3);
        let one = f.one();
        let zero = f.zero();
        assert_eq!(f.path_count(&one), big(1));
        assert_eq!(f.path_count(&zero), big(0));

        // a ∧ b ∨ c: paths {a=1,b=1}, {a=1,b=0,c=1}, {a=0,c=1}
        let ab = f.and(&vars[0], &vars[1]);
        let g = f.or(&ab, &vars[2]);
        assert_eq!(f.path_count(&g), big(3));
    }

    #[test]
    fn test_node_count() {
        let (mut f, vars) = setup(3);
        let zero = f.zero();
        let one = f.one();
        assert_eq!(f.node_count(&zero), 0);
        assert_eq!(f.node_count(&one), 0);
        assert_eq!(f.node_count(&vars[0]), 1);

        let ab = f.and(&vars[0], &vars[1]);
        let g = f.or(&ab, &vars[2]);
        assert_eq!(f.node_count(&g), 3);
    }

    #[test]
    fn test_var_profile() {
        let (mut f, vars) = setup(3);
        let ab = f.and(&vars[0], &vars[1]);
        let g = f.or(&ab, &vars[2]);
        assert_eq!(f.var_profile(&g), vec![1, 1, 1]);
    }

    #[test]
    fn test_sat_one_implies_function() {
        let (mut f, vars) = setup(3);
        let ab = f.and(&vars[0], &vars[1]);
        let g = f.or(&ab, &vars[2]);
        let m = f.sat_one(&g);

        assert!(!f.is_zero(&m));
        // m → g must be a tautology.
        let implication = f.imp(&m, &g);
        assert!(f.is_one(&implication));
    }

    #[test]
    fn test_full_sat_one_mentions_all_variables() {
        let (mut f, vars) = setup(3);
        let g = f.id(&vars[1]);
        let m = f.full_sat_one(&g);

        assert_eq!(f.sat_count(&m), big(1));
        let implication = f.imp(&m, &g);
        assert!(f.is_one(&implication));
        // The cube touches all three levels.
        assert_eq!(f.node_count(&m), 3);
    }

    #[test]
    fn test_sat_one_over_forces_polarity() {
        let (mut f, vars) = setup(3);
        // f = x0; x1, x2 free.
        let set = f.make_set(&[Var::new(1), Var::new(2)]).unwrap();
        let m = f.sat_one_over(&vars[0], &set, true);

        // x1 and x2 are forced to 1.
        let c = f.cube(&[(Var::new(1), true), (Var::new(2), true)]).unwrap();
        let implication = f.imp(&m, &c);
        assert!(f.is_one(&implication));
    }

    #[test]
    fn test_eval() {
        let (mut f, vars) = setup(3);
        let ab = f.and(&vars[0], &vars[1]);
        let g = f.or(&ab, &vars[2]);

        assert!(f.eval(&g, &[true, true, false]).unwrap());
        assert!(f.eval(&g, &[false, false, true]).unwrap());
        assert!(!f.eval(&g, &[true, false, false]).unwrap());
        assert!(matches!(
            f.eval(&g, &[true]),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_zdd_counts() {
        let mut f = Factory::new(Mode::Zdd);
        f.set_var_num(3);

        let zero = f.zero();
        assert_eq!(f.sat_count(&zero), big(0));

        let one = f.one();
        assert_eq!(f.sat_count(&one), big(1));

        let u = f.universe();
        assert_eq!(f.sat_count(&u), big(8));
        assert_ne!(u, one);
    }
}
