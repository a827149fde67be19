//! Linear problem model.

use std::collections::HashMap;
use std::fmt;

use crate::error::{MipError, MipResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
    Continuous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    /// `None` means unbounded above.
    pub upper: Option<f64>,
}

/// `coefficient * variable`.
pub type Term = (VarId, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    pub fn symbol(self) -> &'static str {
        match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<Term>,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.0]).sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tolerance,
            Sense::Ge => lhs >= self.rhs - tolerance,
            Sense::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// A mixed-integer linear program with named variables and constraints.
#[derive(Debug, Clone)]
pub struct LinearProblem {
    name: String,
    sense: ObjectiveSense,
    variables: Vec<Variable>,
    index: HashMap<String, VarId>,
    constraints: Vec<Constraint>,
    objective: Vec<Term>,
}

impl LinearProblem {
    pub fn new(name: &str, sense: ObjectiveSense) -> Self {
        Self {
            name: name.to_string(),
            sense,
            variables: Vec::new(),
            index: HashMap::new(),
            constraints: Vec::new(),
            objective: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn add_var(&mut self, name: String, kind: VarKind, lower: f64, upper: Option<f64>) -> MipResult<VarId> {
        if self.index.contains_key(&name) {
            return Err(MipError::DuplicateVariable(name));
        }
        let id = VarId(self.variables.len());
        self.index.insert(name.clone(), id);
        self.variables.push(Variable {
            name,
            kind,
            lower,
            upper,
        });
        Ok(id)
    }

    pub fn add_binary(&mut self, name: String) -> MipResult<VarId> {
        self.add_var(name, VarKind::Binary, 0.0, Some(1.0))
    }

    pub fn add_constraint(&mut self, name: String, terms: Vec<Term>, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint {
            name,
            terms,
            sense,
            rhs,
        });
    }

    pub fn set_objective(&mut self, terms: Vec<Term>) {
        self.objective = terms;
    }

    pub fn objective(&self) -> &[Term] {
        &self.objective
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn var_index(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().map(|&(v, c)| c * values[v.0]).sum()
    }

    /// Names of the constraints and bounds `values` violates.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<String> {
        let mut violated = Vec::new();
        for (var, &value) in self.variables.iter().zip(values) {
            let below = value < var.lower - tolerance;
            let above = var.upper.is_some_and(|u| value > u + tolerance);
            let fractional = var.kind != VarKind::Continuous && (value - value.round()).abs() > tolerance;
            if below || above || fractional {
                violated.push(format!("bounds of {}", var.name));
            }
        }
        violated.extend(
            self.constraints
                .iter()
                .filter(|c| !c.is_satisfied(values, tolerance))
                .map(|c| c.name.clone()),
        );
        violated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_knapsack() -> (LinearProblem, VarId, VarId) {
        let mut p = LinearProblem::new("knapsack", ObjectiveSense::Maximize);
        let a = p.add_binary("take_a".into()).unwrap();
        let b = p.add_binary("take_b".into()).unwrap();
        p.add_constraint("weight".into(), vec![(a, 3.0), (b, 4.0)], Sense::Le, 5.0);
        p.set_objective(vec![(a, 2.0), (b, 3.0)]);
        (p, a, b)
    }

    #[test]
    fn variables_are_found_by_name() {
        let (p, _, b) = make_knapsack();
        assert_eq!(p.var_index("take_b"), Some(b));
        assert_eq!(p.var_index("take_c"), None);
    }

    #[test]
    fn duplicate_variable_is_rejected() {
        let (mut p, _, _) = make_knapsack();
        assert_eq!(
            p.add_binary("take_a".into()),
            Err(MipError::DuplicateVariable("take_a".into()))
        );
    }

    #[test]
    fn violations_report_constraints_and_bounds() {
        let (p, _, _) = make_knapsack();
        assert!(p.violations(&[0.0, 1.0], 1e-6).is_empty());
        assert_eq!(p.violations(&[1.0, 1.0], 1e-6), vec!["weight".to_string()]);
        assert_eq!(p.violations(&[0.5, 0.0], 1e-6), vec!["bounds of take_a".to_string()]);
        assert_eq!(p.objective_value(&[0.0, 1.0]), 3.0);
    }
}
