//! Finite-domain variables: integers encoded across groups of Boolean
//! variables.
//!
//! A [`Domain`] of range `r` occupies `ceil(log2(r))` fresh variables,
//! least-significant bit first. Domains are created with
//! [`Factory::ext_domain`] and live for the factory's lifetime; the
//! factory owns a reference on each domain's variable cube, so the cubes
//! are permanent GC roots.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::factory::{Bdd, Factory};
use crate::types::{Ref, Var};
use crate::varset::VarSet;

/// A named block of variables encoding an integer in `[0, size)`.
#[derive(Debug)]
pub struct Domain {
    name: String,
    index: usize,
    size: BigUint,
    /// Encoding variables, least-significant first.
    ivars: Vec<Var>,
    /// All-positive cube of `ivars`; one reference owned by the factory.
    set_cube: Ref,
}

impl Domain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of values the domain can take.
    pub fn size(&self) -> &BigUint {
        &self.size
    }

    /// The encoding variables, least-significant first.
    pub fn vars(&self) -> &[Var] {
        &self.ivars
    }

    /// Number of bits the domain occupies.
    pub fn var_num(&self) -> usize {
        self.ivars.len()
    }
}

/// Bits needed to hold values in `[0, size)`; at least one.
fn bits_for(size: &BigUint) -> usize {
    let mut bits = 1;
    let mut reach = BigUint::from(2u32);
    while &reach < size {
        bits += 1;
        reach <<= 1;
    }
    bits
}

impl Factory {
    /// Creates one finite domain per entry of `sizes`, allocating fresh
    /// variables for each; returns the new domain indices.
    pub fn ext_domain(&mut self, sizes: &[u64]) -> Result<Vec<usize>> {
        let big: Vec<BigUint> = sizes.iter().map(|&s| BigUint::from(s)).collect();
        self.ext_domain_big(&big)
    }

    pub fn ext_domain_big(&mut self, sizes: &[BigUint]) -> Result<Vec<usize>> {
        for size in sizes {
            if size.is_zero() {
                return Err(Error::EmptyDomain);
            }
        }

        let mut created = Vec::with_capacity(sizes.len());
        for size in sizes {
            let index = self.domains.len();
            let bits = bits_for(size);
            let ivars = self.declare_vars(bits);

            let levels = ivars
                .iter()
                .map(|&v| self.level_of_var(v).expect("fresh variable"))
                .collect();
            let set = self.make_set_levels(levels);
            let set_cube = set.node();
            // The factory keeps the set's reference for the domain's lifetime.
            std::mem::forget(set);

            self.domains.push(Domain {
                name: index.to_string(),
                index,
                size: size.clone(),
                ivars,
                set_cube,
            });
            created.push(index);
        }
        Ok(created)
    }

    pub fn num_domains(&self) -> usize {
        self.domains.len()
    }

    pub fn domain(&self, d: usize) -> &Domain {
        &self.domains[d]
    }

    pub fn set_domain_name(&mut self, d: usize, name: impl Into<String>) {
        self.domains[d].name = name.into();
    }

    /// The variable set of the domain's encoding bits.
    pub fn domain_set(&mut self, d: usize) -> VarSet {
        let cube = self.domains[d].set_cube;
        self.store.incref(cube);
        VarSet::new(cube)
    }

    /// The diagram that is true exactly when the domain equals `value`.
    pub fn domain_value(&mut self, d: usize, value: u64) -> Result<Bdd> {
        self.domain_value_big(d, BigUint::from(value))
    }

    pub fn domain_value_big(&mut self, d: usize, value: BigUint) -> Result<Bdd> {
        let (size, ivars) = {
            let dom = &self.domains[d];
            (dom.size.clone(), dom.ivars.clone())
        };
        if value >= size {
            return Err(Error::OutOfRange {
                value,
                bound: size,
            });
        }

        let mut v = self.universe();
        let mut rest = value;
        for &var in &ivars {
            let lit = if rest.bit(0) {
                self.ith_var(var)?
            } else {
                self.nith_var(var)?
            };
            self.and_with(&mut v, lit);
            rest >>= 1;
        }
        Ok(v)
    }

    /// The diagram of all values the domain can take: `V ≤ size − 1`.
    pub fn domain_all(&mut self, d: usize) -> Bdd {
        let ivars = self.domains[d].ivars.clone();
        let mut val = self.domains[d].size.clone() - BigUint::one();

        let mut res = self.universe();
        for &var in &ivars {
            let lit = self.nith_var(var).expect("domain variable");
            if val.bit(0) {
                self.or_with(&mut res, lit);
            } else {
                self.and_with(&mut res, lit);
            }
            val >>= 1;
        }
        res
    }

    /// The diagram of the interval `[lo, hi]`, built as a union of
    /// aligned-block cubes: at each step the largest block `[lo, lo+2^k-1]`
    /// with `2^k` dividing `lo` that still fits below `hi` is emitted.
    pub fn domain_range(&mut self, d: usize, lo: u64, hi: u64) -> Result<Bdd> {
        self.domain_range_big(d, BigUint::from(lo), BigUint::from(hi))
    }

    pub fn domain_range_big(&mut self, d: usize, lo: BigUint, hi: BigUint) -> Result<Bdd> {
        let (size, ivars) = {
            let dom = &self.domains[d];
            (dom.size.clone(), dom.ivars.clone())
        };
        if lo > hi || hi >= size {
            return Err(Error::InvalidRange { lo, hi });
        }

        let bits = ivars.len();
        let mut result = self.zero();
        let mut lo = lo;
        while lo <= hi {
            let trailing = lo
                .trailing_zeros()
                .map(|t| (t as usize).min(bits))
                .unwrap_or(bits);
            let mut k = trailing;
            // Shrink until the block fits under hi.
            while k > 0 {
                let top = &lo + ((BigUint::one() << k) - BigUint::one());
                if top <= hi {
                    break;
                }
                k -= 1;
            }

            let mut cube = self.universe();
            for n in k..bits {
                let lit = if lo.bit(n as u64) {
                    self.ith_var(ivars[n])?
                } else {
                    self.nith_var(ivars[n])?
                };
                self.and_with(&mut cube, lit);
            }
            self.or_with(&mut result, cube);

            lo += BigUint::one() << k;
        }
        Ok(result)
    }

    /// The diagram constraining two equally-sized domains to be equal,
    /// one biconditional per bit.
    pub fn domains_equal(&mut self, d: usize, e: usize) -> Result<Bdd> {
        let (d_vars, e_vars) = (self.domains[d].ivars.clone(), self.domains[e].ivars.clone());
        if self.domains[d].size != self.domains[e].size {
            return Err(Error::SizeMismatch {
                left: d_vars.len(),
                right: e_vars.len(),
            });
        }

        let mut res = self.universe();
        for (&a, &b) in d_vars.iter().zip(&e_vars) {
            let mut bit = self.ith_var(a)?;
            let other = self.ith_var(b)?;
            self.biimp_with(&mut bit, other);
            self.and_with(&mut res, bit);
        }
        Ok(res)
    }

    /// The diagram constraining `d = e + value (mod 2^bits)`, expressed
    /// through a ripple-carry bit-vector equivalence. With `value == 0`
    /// this degenerates to a biconditional per bit. Bits above `bits` in
    /// either domain are forced to zero.
    pub fn domain_add(&mut self, d: usize, e: usize, bits: usize, value: u64) -> Result<Bdd> {
        let (d_vars, e_vars) = (self.domains[d].ivars.clone(), self.domains[e].ivars.clone());
        if bits > d_vars.len() || bits > e_vars.len() {
            return Err(Error::SizeMismatch {
                left: bits,
                right: d_vars.len().min(e_vars.len()),
            });
        }

        let mut res = self.universe();
        if value == 0 {
            for n in 0..bits {
                let mut bit = self.ith_var(d_vars[n])?;
                let other = self.ith_var(e_vars[n])?;
                self.biimp_with(&mut bit, other);
                self.and_with(&mut res, bit);
            }
        } else {
            // sum[n] = e[n] ⊕ value[n] ⊕ carry; ripple the carry upward.
            let mut carry = self.zero();
            for n in 0..bits {
                let en = self.ith_var(e_vars[n])?;
                let vn = if value >> n & 1 == 1 {
                    self.one()
                } else {
                    self.zero()
                };

                let mut sum = self.xor(&en, &vn);
                let c = self.id(&carry);
                self.xor_with(&mut sum, c);

                // carry' = (e[n] ∧ v[n]) ∨ (carry ∧ (e[n] ∨ v[n]))
                let and_ev = self.and(&en, &vn);
                let or_ev = self.or(&en, &vn);
                let mut carry_next = self.and(&carry, &or_ev);
                self.or_with(&mut carry_next, and_ev);
                self.free(or_ev);

                let mut bit = self.ith_var(d_vars[n])?;
                self.biimp_with(&mut bit, sum);
                self.and_with(&mut res, bit);

                self.free(en);
                self.free(vn);
                self.free(carry);
                carry = carry_next;
            }
            self.free(carry);
        }

        for n in bits..d_vars.len().max(e_vars.len()) {
            if n < d_vars.len() {
                let lit = self.nith_var(d_vars[n])?;
                self.and_with(&mut res, lit);
            }
            if n < e_vars.len() {
                let lit = self.nith_var(e_vars[n])?;
                self.and_with(&mut res, lit);
            }
        }
        Ok(res)
    }

    /// Widens the recorded range so values up to `bound` (inclusive) are
    /// legal. Only works within the already-allocated bit width; asking
    /// for more bits fails with [`Error::BitWidth`].
    pub fn ensure_capacity(&mut self, d: usize, bound: u64) -> Result<usize> {
        self.ensure_capacity_big(d, BigUint::from(bound))
    }

    pub fn ensure_capacity_big(&mut self, d: usize, bound: BigUint) -> Result<usize> {
        let dom = &self.domains[d];
        if bound < dom.size {
            return Ok(dom.var_num());
        }

        let mut bits = 1;
        let mut reach = BigUint::from(2u32);
        while reach <= bound {
            bits += 1;
            reach <<= 1;
        }
        if dom.var_num() != bits {
            return Err(Error::BitWidth {
                domain: dom.name.clone(),
                requested: bound,
            });
        }
        self.domains[d].size = bound + BigUint::one();
        Ok(bits)
    }

    /// One satisfying value of domain `d` in `f`, or `None` if `f` is
    /// unsatisfiable.
    pub fn scan_domain(&self, f: &Bdd, d: usize) -> Option<BigUint> {
        self.scan_all_domains(f).map(|values| values[d].clone())
    }

    /// One satisfying value per declared domain, extracted from a single
    /// arbitrary minterm of `f`.
    pub fn scan_all_domains(&self, f: &Bdd) -> Option<Vec<BigUint>> {
        if f.node().is_zero() {
            return None;
        }

        let mut assignment = vec![false; self.var_num()];
        let mut r = f.node();
        while !r.is_terminal() {
            let var = self.var_at_level(self.level_ref(r));
            let low = self.low_ref(r);
            if low.is_zero() {
                assignment[var.usize()] = true;
                r = self.high_ref(r);
            } else {
                assignment[var.usize()] = false;
                r = low;
            }
        }

        let mut values = Vec::with_capacity(self.domains.len());
        for dom in &self.domains {
            let mut val = BigUint::zero();
            for &var in dom.ivars.iter().rev() {
                val <<= 1;
                if assignment[var.usize()] {
                    val += BigUint::one();
                }
            }
            values.push(val);
        }
        Some(values)
    }

    /// Up to `max` values of domain `d` present in `f` (all of them when
    /// `max` is `None`). Assumes `f` constrains only `d`'s variables.
    pub fn domain_values(&mut self, f: &Bdd, d: usize, max: Option<usize>) -> Vec<BigUint> {
        let set = self.domain_set(d);
        let count = self
            .sat_count_over(f, &set)
            .to_usize()
            .unwrap_or(usize::MAX);
        let count = match max {
            Some(m) => count.min(m),
            None => count,
        };

        let mut it = self.minterm_iter(f, &set);
        let mut values = Vec::with_capacity(count);
        while values.len() < count {
            match it.next_value(self, d) {
                Some(v) => values.push(v),
                None => break,
            }
        }
        it.free(self);
        self.free_set(set);
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mode;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_bits_for() {
        assert_eq!(bits_for(&big(1)), 1);
        assert_eq!(bits_for(&big(2)), 1);
        assert_eq!(bits_for(&big(3)), 2);
        assert_eq!(bits_for(&big(4)), 2);
        assert_eq!(bits_for(&big(5)), 3);
        assert_eq!(bits_for(&big(8)), 3);
        assert_eq!(bits_for(&big(9)), 4);
    }

    #[test]
    fn test_ext_domain_allocates_bits() {
        let mut f = Factory::new(Mode::Bdd);
        let ids = f.ext_domain(&[8, 3]).unwrap();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(f.num_domains(), 2);
        assert_eq!(f.domain(0).var_num(), 3);
        assert_eq!(f.domain(1).var_num(), 2);
        assert_eq!(f.var_num(), 5);
        assert_eq!(f.domain(0).name(), "0");

        assert!(matches!(f.ext_domain(&[0]), Err(Error::EmptyDomain)));
    }

    #[test]
    fn test_domain_value_encoding() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[8]).unwrap()[0];

        // 5 = 101: bit0 = 1, bit1 = 0, bit2 = 1.
        let v = f.domain_value(d, 5).unwrap();
        let vars = f.domain(d).vars().to_vec();
        let expected = f
            .cube(&[(vars[0], true), (vars[1], false), (vars[2], true)])
            .unwrap();
        assert_eq!(v, expected);
        let set = f.domain_set(d);
        assert_eq!(f.sat_count_over(&v, &set), big(1));
        f.free_set(set);

        assert!(matches!(
            f.domain_value(d, 8),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_distinct_values_are_disjoint() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[8]).unwrap()[0];
        let a = f.domain_value(d, 2).unwrap();
        let b = f.domain_value(d, 3).unwrap();
        let both = f.and(&a, &b);
        assert!(f.is_zero(&both));
    }

    #[test]
    fn test_domain_all_is_union_of_values() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[5]).unwrap()[0];

        let all = f.domain_all(d);
        let mut union = f.zero();
        for v in 0..5 {
            let value = f.domain_value(d, v).unwrap();
            f.or_with(&mut union, value);
        }
        assert_eq!(all, union);
    }

    #[test]
    fn test_domain_range_equals_value_union() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[8]).unwrap()[0];

        let range = f.domain_range(d, 2, 5).unwrap();
        let mut union = f.zero();
        for v in 2..=5 {
            let value = f.domain_value(d, v).unwrap();
            f.or_with(&mut union, value);
        }
        assert_eq!(range, union);

        let set = f.domain_set(d);
        assert_eq!(f.sat_count_over(&range, &set), big(4));
        f.free_set(set);

        assert!(matches!(
            f.domain_range(d, 5, 2),
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            f.domain_range(d, 0, 8),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_domains_equal() {
        let mut f = Factory::new(Mode::Bdd);
        let ids = f.ext_domain(&[4, 4, 8]).unwrap();

        let eq = f.domains_equal(ids[0], ids[1]).unwrap();
        for v in 0..4 {
            let a = f.domain_value(ids[0], v).unwrap();
            let b = f.domain_value(ids[1], v).unwrap();
            let mut pair = f.and(&a, &b);
            let holds = f.imp(&pair, &eq);
            assert!(f.is_one(&holds));

            // A mismatched pair contradicts eq.
            let c = f.domain_value(ids[1], (v + 1) % 4).unwrap();
            f.free(pair);
            pair = f.and(&a, &c);
            let both = f.and(&pair, &eq);
            assert!(f.is_zero(&both));
        }

        assert!(matches!(
            f.domains_equal(ids[0], ids[2]),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_domain_add_zero_is_equality() {
        let mut f = Factory::new(Mode::Bdd);
        let ids = f.ext_domain(&[8, 8]).unwrap();
        let bits = f.domain(ids[0]).var_num();

        let add = f.domain_add(ids[0], ids[1], bits, 0).unwrap();
        let eq = f.domains_equal(ids[0], ids[1]).unwrap();
        assert_eq!(add, eq);
    }

    #[test]
    fn test_domain_add_wraps_modulo() {
        let mut f = Factory::new(Mode::Bdd);
        let ids = f.ext_domain(&[8, 8]).unwrap();
        let bits = 3;

        // d0 = d1 + 3 (mod 8)
        let add = f.domain_add(ids[0], ids[1], bits, 3).unwrap();
        for v in 0..8u64 {
            let expect = (v + 3) % 8;
            let rhs = f.domain_value(ids[1], v).unwrap();
            let lhs = f.domain_value(ids[0], expect).unwrap();
            let pair = f.and(&lhs, &rhs);
            let holds = f.imp(&pair, &add);
            assert!(f.is_one(&holds), "{} + 3 should be {}", v, expect);
        }

        let set0 = f.domain_set(ids[0]);
        let set1 = f.domain_set(ids[1]);
        let both = f.set_union(&set0, &set1);
        // The relation is a bijection: 8 satisfying pairs.
        assert_eq!(f.sat_count_over(&add, &both), big(8));
    }

    #[test]
    fn test_ensure_capacity() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[5]).unwrap()[0];
        assert_eq!(f.domain(d).var_num(), 3);

        // Can widen within 3 bits: up to value 7.
        assert_eq!(f.ensure_capacity(d, 7).unwrap(), 3);
        assert_eq!(f.domain(d).size(), &big(8));
        assert!(f.domain_value(d, 7).is_ok());

        // Needs a 4th bit: fails.
        assert!(matches!(
            f.ensure_capacity(d, 8),
            Err(Error::BitWidth { .. })
        ));

        // Smaller bound is a no-op.
        assert_eq!(f.ensure_capacity(d, 2).unwrap(), 3);
    }

    #[test]
    fn test_scan_domains() {
        let mut f = Factory::new(Mode::Bdd);
        let ids = f.ext_domain(&[8, 4]).unwrap();

        let a = f.domain_value(ids[0], 6).unwrap();
        let b = f.domain_value(ids[1], 1).unwrap();
        let both = f.and(&a, &b);

        let values = f.scan_all_domains(&both).unwrap();
        assert_eq!(values, vec![big(6), big(1)]);
        assert_eq!(f.scan_domain(&both, ids[0]), Some(big(6)));
        assert_eq!(f.scan_domain(&both, ids[1]), Some(big(1)));

        let zero = f.zero();
        assert_eq!(f.scan_all_domains(&zero), None);
    }

    #[test]
    fn test_domain_values_enumeration() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[8]).unwrap()[0];
        let range = f.domain_range(d, 2, 5).unwrap();

        let mut values = f.domain_values(&range, d, None);
        values.sort();
        assert_eq!(values, vec![big(2), big(3), big(4), big(5)]);

        let capped = f.domain_values(&range, d, Some(2));
        assert_eq!(capped.len(), 2);
    }
}
