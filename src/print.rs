//! Textual renderings: set-of-minterms notation and the compacted
//! finite-domain form.
//!
//! The exact layout is advisory; what these functions guarantee is
//! soundness of the enumeration: every printed (partial) assignment
//! satisfies the diagram, and together they cover it exactly.

use num_bigint::BigUint;
use num_traits::One;

use crate::factory::{Bdd, Factory};
use crate::types::{Mode, Ref};

/// Naming hook for the finite-domain rendering; the default prints plain
/// numbers. Implement this to render symbolic element names.
pub trait DomainNamer {
    fn element_name(&self, domain: usize, value: &BigUint) -> String {
        let _ = domain;
        value.to_string()
    }

    fn element_range(&self, domain: usize, lo: &BigUint, hi: &BigUint) -> String {
        let _ = domain;
        format!("{}-{}", lo, hi)
    }
}

/// The numeric default namer.
pub struct DefaultNamer;

impl DomainNamer for DefaultNamer {}

/// Accumulates domain values, coalescing consecutive runs into `lo-hi`
/// ranges separated by `/`.
struct OutputBuffer<'a, 'n> {
    namer: &'n dyn DomainNamer,
    out: &'a mut String,
    domain: usize,
    pending: Option<(BigUint, BigUint)>,
    done: bool,
}

impl<'a, 'n> OutputBuffer<'a, 'n> {
    fn new(namer: &'n dyn DomainNamer, out: &'a mut String, domain: usize) -> Self {
        OutputBuffer {
            namer,
            out,
            domain,
            pending: None,
            done: false,
        }
    }

    fn append(&mut self, lo: BigUint, hi: BigUint) {
        match &mut self.pending {
            Some((_, pending_hi)) if lo == &*pending_hi + BigUint::one() => {
                *pending_hi = hi;
            }
            _ => {
                self.finish();
                self.pending = Some((lo, hi));
            }
        }
    }

    fn finish(&mut self) {
        if let Some((lo, hi)) = self.pending.take() {
            if self.done {
                self.out.push('/');
            }
            if lo == hi {
                self.out.push_str(&self.namer.element_name(self.domain, &hi));
            } else {
                self.out
                    .push_str(&self.namer.element_range(self.domain, &lo, &hi));
            }
            self.done = true;
        }
    }
}

/// Branch codes used while walking: 0 = unconstrained, 1 = low branch
/// taken, 2 = high branch taken.
const UNSET: u8 = 0;
const LOW: u8 = 1;
const HIGH: u8 = 2;

impl Factory {
    /// Set-of-minterms notation over variable indices: one `<v:b, …>`
    /// group per path to TRUE.
    pub fn to_string_set(&self, f: &Bdd) -> String {
        let initial = match self.mode() {
            Mode::Bdd => UNSET,
            Mode::Zdd => LOW,
        };
        let mut set = vec![initial; self.var_num()];
        let mut out = String::new();
        self.printset_rec(&mut out, f.node(), &mut set);
        out
    }

    fn printset_rec(&self, out: &mut String, r: Ref, set: &mut [u8]) {
        if r.is_zero() {
            return;
        }
        if r.is_one() {
            out.push('<');
            let mut first = true;
            for (level, &code) in set.iter().enumerate() {
                if code == UNSET {
                    continue;
                }
                if !first {
                    out.push_str(", ");
                }
                first = false;
                let var = self.var_at_level(crate::types::Level::new(level as u32));
                out.push_str(&format!(
                    "{}:{}",
                    var.index(),
                    if code == HIGH { 1 } else { 0 }
                ));
            }
            out.push('>');
            return;
        }

        let level = self.level_ref(r).usize();
        let (low, high) = (self.low_ref(r), self.high_ref(r));
        match self.mode() {
            Mode::Bdd => {
                set[level] = LOW;
                self.printset_rec(out, low, set);
                set[level] = HIGH;
                self.printset_rec(out, high, set);
                set[level] = UNSET;
            }
            Mode::Zdd => {
                if low == high {
                    set[level] = UNSET;
                } else {
                    self.printset_rec(out, low, set);
                    set[level] = HIGH;
                }
                self.printset_rec(out, high, set);
                set[level] = LOW;
            }
        }
    }

    /// Finite-domain notation with the default numeric namer.
    pub fn to_string_with_domains(&self, f: &Bdd) -> String {
        self.to_string_with_domains_named(f, &DefaultNamer)
    }

    /// Finite-domain notation: `<dom:val, …>` groups, with consecutive
    /// values of a domain coalesced into `lo-hi` ranges.
    pub fn to_string_with_domains_named(&self, f: &Bdd, namer: &dyn DomainNamer) -> String {
        if f.node().is_zero() {
            return "F".to_string();
        }
        if f.node().is_one() {
            return "T".to_string();
        }

        let mut set = vec![UNSET; self.var_num()];
        let mut out = String::new();
        self.domains_rec(&mut out, namer, f.node(), &mut set);
        out
    }

    fn domains_rec(&self, out: &mut String, namer: &dyn DomainNamer, r: Ref, set: &mut [u8]) {
        if r.is_zero() {
            return;
        }
        if !r.is_one() {
            let var = self.var_at_level(self.level_ref(r)).usize();
            set[var] = LOW;
            self.domains_rec(out, namer, self.low_ref(r), set);
            set[var] = HIGH;
            self.domains_rec(out, namer, self.high_ref(r), set);
            set[var] = UNSET;
            return;
        }

        out.push('<');
        let mut first = true;
        for d in 0..self.num_domains() {
            let dom_vars: Vec<usize> = self.domain(d).vars().iter().map(|v| v.usize()).collect();
            let used = dom_vars.iter().any(|&v| set[v] != UNSET);
            if !used {
                continue;
            }
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(self.domain(d).name());
            out.push(':');

            // Fixed bits of the value, and the contiguous free prefix that
            // can be folded into a single aligned range.
            let mut pos = BigUint::ZERO;
            let mut max_skip: isize = -1;
            let mut has_dont_care = false;
            for (i, &v) in dom_vars.iter().enumerate() {
                if set[v] == UNSET {
                    has_dont_care = true;
                    if max_skip == i as isize - 1 {
                        max_skip = i as isize;
                    }
                }
            }
            for &v in dom_vars.iter().rev() {
                pos <<= 1;
                if set[v] == HIGH {
                    pos += BigUint::one();
                }
            }

            if !has_dont_care {
                out.push_str(&namer.element_name(d, &pos));
            } else {
                let mut ob = OutputBuffer::new(namer, out, d);
                expand_free_bits(&mut ob, pos, dom_vars.len() as isize - 1, set, &dom_vars, max_skip);
                ob.finish();
            }
        }
        out.push('>');
    }
}

/// Enumerates the values covered by the partially-fixed bits, recursing
/// over free bits from the top; the contiguous free prefix `0..=max_skip`
/// is emitted as one aligned range instead of being expanded.
fn expand_free_bits(
    ob: &mut OutputBuffer<'_, '_>,
    value: BigUint,
    i: isize,
    set: &[u8],
    vars: &[usize],
    max_skip: isize,
) {
    if i == max_skip {
        let top = &value | &((BigUint::one() << (i + 1) as usize) - BigUint::one());
        ob.append(value, top);
        return;
    }
    let code = set[vars[i as usize]];
    if code == UNSET {
        let mut with_bit = value.clone();
        with_bit.set_bit(i as u64, true);
        expand_free_bits(ob, with_bit, i - 1, set, vars, max_skip);
    }
    expand_free_bits(ob, value, i - 1, set, vars, max_skip);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Var;

    #[test]
    fn test_to_string_set_literals() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(2);
        let x0 = f.ith_var(Var::new(0)).unwrap();
        assert_eq!(f.to_string_set(&x0), "<0:1>");

        let n0 = f.nith_var(Var::new(0)).unwrap();
        assert_eq!(f.to_string_set(&n0), "<0:0>");

        let zero = f.zero();
        assert_eq!(f.to_string_set(&zero), "");
    }

    #[test]
    fn test_to_string_set_enumerates_paths() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(2);
        let x0 = f.ith_var(Var::new(0)).unwrap();
        let x1 = f.ith_var(Var::new(1)).unwrap();
        let any = f.or(&x0, &x1);
        // Low branch first: ¬x0 ∧ x1, then x0.
        assert_eq!(f.to_string_set(&any), "<0:0, 1:1><0:1>");
    }

    #[test]
    fn test_to_string_with_domains_single_value() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[8]).unwrap()[0];
        let v = f.domain_value(d, 5).unwrap();
        assert_eq!(f.to_string_with_domains(&v), "<0:5>");
    }

    #[test]
    fn test_to_string_with_domains_coalesces_ranges() {
        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[8]).unwrap()[0];
        // [4,7] is the aligned block "bit2 = 1": a single path whose low
        // bits are free, rendered as one range.
        let range = f.domain_range(d, 4, 7).unwrap();
        assert_eq!(f.to_string_with_domains(&range), "<0:4-7>");
    }

    #[test]
    fn test_to_string_with_domains_terminals() {
        let mut f = Factory::new(Mode::Bdd);
        let _ = f.ext_domain(&[4]).unwrap();
        let zero = f.zero();
        let one = f.one();
        assert_eq!(f.to_string_with_domains(&zero), "F");
        assert_eq!(f.to_string_with_domains(&one), "T");
    }

    #[test]
    fn test_custom_namer() {
        struct Weekday;
        impl DomainNamer for Weekday {
            fn element_name(&self, _domain: usize, value: &BigUint) -> String {
                ["mon", "tue", "wed", "thu"][usize::try_from(value.clone()).unwrap()].to_string()
            }
        }

        let mut f = Factory::new(Mode::Bdd);
        let d = f.ext_domain(&[4]).unwrap()[0];
        let v = f.domain_value(d, 2).unwrap();
        assert_eq!(
            f.to_string_with_domains_named(&v, &Weekday),
            "<0:wed>"
        );
    }
}
