//! Sets of variables, canonically represented as positive cubes.
//!
//! A [`VarSet`] is a handle to the conjunction of its variables (in ZDD
//! mode, the equivalent all-positive path). Set operations go through the
//! factory; like every handle, a `VarSet` owns one reference on its cube
//! and must be released with [`Factory::free_set`].

use crate::factory::{Bdd, Factory};
use crate::types::{Level, Ref, Var};

/// A set of variables backed by a cube diagram.
#[must_use]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct VarSet {
    cube: Ref,
}

impl VarSet {
    pub(crate) fn new(cube: Ref) -> Self {
        VarSet { cube }
    }

    /// The root of the underlying cube.
    #[inline]
    pub fn node(&self) -> Ref {
        self.cube
    }

    pub fn is_empty(&self) -> bool {
        self.cube.is_one()
    }
}

impl Factory {
    /// Builds the set of the given variables.
    pub fn make_set(&mut self, vars: &[Var]) -> crate::error::Result<VarSet> {
        let mut levels = Vec::with_capacity(vars.len());
        for &v in vars {
            levels.push(self.level_of_var(v)?);
        }
        Ok(self.make_set_levels(levels))
    }

    pub(crate) fn make_set_levels(&mut self, mut levels: Vec<Level>) -> VarSet {
        levels.sort();
        levels.dedup();
        let mut r = Ref::ONE;
        for &level in levels.iter().rev() {
            self.store.push_ref(r);
            let next = self.mk(level, Ref::ZERO, r);
            self.store.pop_ref(1);
            r = next;
        }
        self.store.incref(r);
        VarSet::new(r)
    }

    /// Levels of the set's variables, ascending.
    pub fn set_levels(&self, set: &VarSet) -> Vec<Level> {
        let mut levels = Vec::new();
        let mut r = set.cube;
        while !r.is_terminal() {
            levels.push(self.level_ref(r));
            r = self.high_ref(r);
        }
        levels
    }

    /// The set's variables, in level order.
    pub fn set_vars(&self, set: &VarSet) -> Vec<Var> {
        self.set_levels(set)
            .into_iter()
            .map(|level| self.var_at_level(level))
            .collect()
    }

    /// Number of variables in the set.
    pub fn set_size(&self, set: &VarSet) -> usize {
        let mut n = 0;
        let mut r = set.cube;
        while !r.is_terminal() {
            n += 1;
            r = self.high_ref(r);
        }
        n
    }

    /// True if the set mentions `var`. Undeclared variables are in no set.
    pub fn set_contains(&self, set: &VarSet, var: Var) -> bool {
        match self.level_of_var(var) {
            Ok(level) => self.set_levels(set).contains(&level),
            Err(_) => false,
        }
    }

    pub fn set_union(&mut self, a: &VarSet, b: &VarSet) -> VarSet {
        let mut levels = self.set_levels(a);
        levels.extend(self.set_levels(b));
        self.make_set_levels(levels)
    }

    pub fn set_intersect(&mut self, a: &VarSet, b: &VarSet) -> VarSet {
        let other = self.set_levels(b);
        let levels = self
            .set_levels(a)
            .into_iter()
            .filter(|level| other.contains(level))
            .collect();
        self.make_set_levels(levels)
    }

    /// Variables of `a` not in `b`.
    pub fn set_difference(&mut self, a: &VarSet, b: &VarSet) -> VarSet {
        let other = self.set_levels(b);
        let levels = self
            .set_levels(a)
            .into_iter()
            .filter(|level| !other.contains(level))
            .collect();
        self.make_set_levels(levels)
    }

    /// A second handle to the same set.
    pub fn set_id(&mut self, set: &VarSet) -> VarSet {
        self.store.incref(set.cube);
        VarSet::new(set.cube)
    }

    /// A `Bdd` handle to the set's cube.
    pub fn set_as_bdd(&mut self, set: &VarSet) -> Bdd {
        self.acquire(set.cube)
    }

    /// Releases the set's reference on its cube.
    pub fn free_set(&mut self, set: VarSet) {
        self.store.decref(set.cube);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mode;

    fn vars(indices: &[u32]) -> Vec<Var> {
        indices.iter().map(|&i| Var::new(i)).collect()
    }

    #[test]
    fn test_make_set_and_levels() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(5);
        let s = f.make_set(&vars(&[3, 0, 4])).unwrap();

        assert_eq!(f.set_size(&s), 3);
        assert_eq!(
            f.set_levels(&s),
            vec![Level::new(0), Level::new(3), Level::new(4)]
        );
        assert!(f.set_contains(&s, Var::new(3)));
        assert!(!f.set_contains(&s, Var::new(1)));
        assert!(!f.set_contains(&s, Var::new(99)));
    }

    #[test]
    fn test_empty_set() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(2);
        let s = f.make_set(&[]).unwrap();
        assert!(s.is_empty());
        assert_eq!(f.set_size(&s), 0);
        assert!(f.set_levels(&s).is_empty());
    }

    #[test]
    fn test_set_algebra() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(4);
        let a = f.make_set(&vars(&[0, 1, 2])).unwrap();
        let b = f.make_set(&vars(&[1, 3])).unwrap();

        let u = f.set_union(&a, &b);
        assert_eq!(f.set_vars(&u), vars(&[0, 1, 2, 3]));

        let i = f.set_intersect(&a, &b);
        assert_eq!(f.set_vars(&i), vars(&[1]));

        let d = f.set_difference(&a, &b);
        assert_eq!(f.set_vars(&d), vars(&[0, 2]));

        // Sets are canonical: rebuilding the same variables gives the
        // same cube node.
        let u2 = f.make_set(&vars(&[3, 2, 1, 0])).unwrap();
        assert_eq!(u, u2);
    }

    #[test]
    fn test_set_refcounting() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(2);
        let s = f.make_set(&vars(&[0, 1])).unwrap();
        let s2 = f.set_id(&s);
        f.free_set(s);

        // The cube survives the first free.
        assert_eq!(f.set_size(&s2), 2);
        f.free_set(s2);
        f.gc();
        assert_eq!(f.num_nodes(), 0);
    }

    #[test]
    fn test_set_in_zdd_mode_is_positive_path() {
        let mut f = Factory::new(Mode::Zdd);
        f.set_var_num(3);
        let s = f.make_set(&vars(&[0, 2])).unwrap();
        assert_eq!(f.set_size(&s), 2);
        assert_eq!(f.set_levels(&s), vec![Level::new(0), Level::new(2)]);
    }
}
