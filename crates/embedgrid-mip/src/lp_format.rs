//! CPLEX-LP rendering, readable by glpk, cbc, cplex, gurobi and scip.
//!
//! Names are sanitized to the LP character set and prefixed with their
//! index (`x12_node_mapping_u_p`) so they stay unique.

use std::fmt::Write;

use crate::problem::{LinearProblem, ObjectiveSense, Term, VarKind};

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || "_.".contains(c) { c } else { '_' })
        .collect()
}

fn write_terms(out: &mut String, terms: &[Term], names: &[String]) {
    if terms.is_empty() {
        match names.first() {
            Some(first) => out.push_str(&format!("0 {first}")),
            None => out.push('0'),
        }
        return;
    }
    for (i, &(var, coef)) in terms.iter().enumerate() {
        let sign = if coef < 0.0 { "-" } else { "+" };
        if i == 0 {
            if coef < 0.0 {
                out.push_str("- ");
            }
        } else {
            let _ = write!(out, " {sign} ");
        }
        let _ = write!(out, "{} {}", coef.abs(), names[var.0]);
    }
}

impl LinearProblem {
    /// Render the problem in CPLEX-LP format.
    pub fn to_lp_format(&self) -> String {
        let names: Vec<String> = self
            .variables()
            .iter()
            .enumerate()
            .map(|(i, v)| format!("x{i}_{}", sanitize(&v.name)))
            .collect();

        let mut out = String::new();
        let _ = writeln!(out, "\\ Problem: {}", self.name());
        out.push_str(match self.sense() {
            ObjectiveSense::Minimize => "Minimize\n",
            ObjectiveSense::Maximize => "Maximize\n",
        });
        out.push_str(" obj: ");
        write_terms(&mut out, self.objective(), &names);
        out.push_str("\nSubject To\n");
        for (i, c) in self.constraints().iter().enumerate() {
            let _ = write!(out, " c{i}_{}: ", sanitize(&c.name));
            write_terms(&mut out, &c.terms, &names);
            let _ = writeln!(out, " {} {}", c.sense.symbol(), c.rhs);
        }

        out.push_str("Bounds\n");
        for (v, name) in self.variables().iter().zip(&names) {
            if v.kind == VarKind::Binary {
                continue;
            }
            match v.upper {
                Some(upper) => {
                    let _ = writeln!(out, " {} <= {name} <= {upper}", v.lower);
                }
                None => {
                    let _ = writeln!(out, " {name} >= {}", v.lower);
                }
            }
        }

        for (section, kind) in [("Binaries", VarKind::Binary), ("Generals", VarKind::Integer)] {
            let listed: Vec<&str> = self
                .variables()
                .iter()
                .zip(&names)
                .filter(|(v, _)| v.kind == kind)
                .map(|(_, n)| n.as_str())
                .collect();
            if !listed.is_empty() {
                let _ = writeln!(out, "{section}\n {}", listed.join(" "));
            }
        }
        out.push_str("End\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::problem::{LinearProblem, ObjectiveSense, Sense, VarKind};

    #[test]
    fn renders_sections_in_order() {
        let mut p = LinearProblem::new("demo", ObjectiveSense::Minimize);
        let a = p.add_binary("node_mapping[u][h1]".into()).unwrap();
        let f = p.add_var("flow".into(), VarKind::Continuous, 0.0, Some(1.0)).unwrap();
        p.add_constraint("assign u".into(), vec![(a, 1.0), (f, -2.5)], Sense::Eq, 1.0);
        p.set_objective(vec![(a, 1.0)]);
        let lp = p.to_lp_format();

        assert!(lp.starts_with("\\ Problem: demo\nMinimize\n obj: 1 x0_node_mapping_u__h1_\n"));
        assert!(lp.contains(" c0_assign_u: 1 x0_node_mapping_u__h1_ - 2.5 x1_flow = 1\n"));
        assert!(lp.contains("Bounds\n 0 <= x1_flow <= 1\n"));
        assert!(lp.contains("Binaries\n x0_node_mapping_u__h1_\n"));
        assert!(!lp.contains("Generals"));
        assert!(lp.ends_with("End\n"));
    }
}
