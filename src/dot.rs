//! Graphviz rendering of a diagram.
//!
//! Produces a `digraph` with the two terminals as boxes, one circle per
//! inner node labelled with its variable, dotted edges to low children
//! and solid edges to high children.

use std::collections::HashSet;

use crate::factory::{Bdd, Factory};
use crate::types::Ref;

impl Factory {
    pub fn to_dot(&self, f: &Bdd) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph G {{")?;
        writeln!(
            dot,
            "0 [shape=box, label=\"0\", style=filled, height=0.3, width=0.3];"
        )?;
        writeln!(
            dot,
            "1 [shape=box, label=\"1\", style=filled, height=0.3, width=0.3];"
        )?;

        let mut nodes = self.descendants(f.node());
        nodes.sort();

        for &r in &nodes {
            let var = self.var_at_level(self.level_ref(r));
            writeln!(dot, "{} [label=\"{}\"];", r.index(), var)?;
        }
        for &r in &nodes {
            let low = self.low_ref(r);
            let high = self.high_ref(r);
            writeln!(dot, "{} -> {} [style=dotted];", r.index(), low.index())?;
            writeln!(dot, "{} -> {} [style=solid];", r.index(), high.index())?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    /// All inner nodes reachable from `root`.
    pub(crate) fn descendants(&self, root: Ref) -> Vec<Ref> {
        let mut seen: HashSet<Ref> = HashSet::new();
        let mut stack = vec![root];
        while let Some(r) = stack.pop() {
            if r.is_terminal() || !seen.insert(r) {
                continue;
            }
            stack.push(self.low_ref(r));
            stack.push(self.high_ref(r));
        }
        seen.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mode, Var};

    #[test]
    fn test_to_dot_shape() {
        let mut f = Factory::new(Mode::Bdd);
        f.set_var_num(2);
        let x0 = f.ith_var(Var::new(0)).unwrap();
        let x1 = f.ith_var(Var::new(1)).unwrap();
        let g = f.and(&x0, &x1);

        let dot = f.to_dot(&g).unwrap();
        assert!(dot.starts_with("digraph G {"));
        assert!(dot.trim_end().ends_with('}'));
        // Two terminal boxes, two inner nodes with their variables.
        assert!(dot.contains("0 [shape=box"));
        assert!(dot.contains("1 [shape=box"));
        assert!(dot.contains("[label=\"x0\"]"));
        assert!(dot.contains("[label=\"x1\"]"));
        // Each inner node has a dotted low edge and a solid high edge.
        assert_eq!(dot.matches("style=dotted").count(), 2);
        assert_eq!(dot.matches("style=solid").count(), 2);
        assert_eq!(dot.matches("style=filled").count(), 2);
    }

    #[test]
    fn test_to_dot_terminal_only() {
        let mut f = Factory::new(Mode::Bdd);
        let one = f.one();
        let dot = f.to_dot(&one).unwrap();
        assert!(dot.contains("digraph G {"));
        assert!(!dot.contains("->"));
    }
}
