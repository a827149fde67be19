//! Exact packing delegated to a [`MipSolver`].
//!
//! Each instance type gets as many candidate instances as a first-fit pass
//! over the request would open of that type alone. Variables:
//!
//! - `vm_used[t][i]`: instance `i` of type `t` is rented
//! - `node_mapping[u][t][i]`: virtual node `u` runs on it (only for types
//!   that can hold `u`)
//!
//! The objective is the total hourly cost of rented instances.

use std::collections::BTreeMap;

use tracing::info;

use embedgrid_core::{PlacementError, PlacementResult, Verification};
use embedgrid_mip::{
    LinearProblem, MipError, MipOutcome, MipSolver, MipStatus, ObjectiveSense, Sense, SolveOptions, Term, VarId,
};
use embedgrid_topology::{CloudCatalog, InstanceType, InstanceTypeId, VirtId, VirtualNetwork};

use crate::PackStrategy;
use crate::bins::{Bin, demand};
use crate::solution::PackingSolution;

type InstanceKey = (InstanceTypeId, usize);

#[derive(Debug, Clone)]
pub struct PackFormulation {
    problem: LinearProblem,
    used_vars: BTreeMap<InstanceKey, VarId>,
    node_vars: BTreeMap<(VirtId, InstanceTypeId, usize), VarId>,
}

fn mip_error(err: MipError) -> PlacementError {
    PlacementError::Solver(err.to_string())
}

/// Instances of type `t` a first-fit pass over all nodes would open;
/// nodes `t` cannot hold are skipped.
pub fn instance_bound(virtual_net: &VirtualNetwork, t: &InstanceType) -> usize {
    let (cap_cores, cap_memory) = (u64::from(t.cores), u64::from(t.memory));
    let (mut n, mut left_cores, mut left_memory) = (0, 0, 0);
    for u in virtual_net.node_ids() {
        let (cores, memory) = demand(virtual_net, u);
        if cores <= left_cores && memory <= left_memory {
            left_cores -= cores;
            left_memory -= memory;
        } else if t.fits(cores, memory) {
            left_cores = cap_cores - cores;
            left_memory = cap_memory - memory;
            n += 1;
        }
    }
    n
}

pub fn formulate(virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> PlacementResult<PackFormulation> {
    let mut problem = LinearProblem::new("packing", ObjectiveSense::Minimize);
    let bounds: BTreeMap<InstanceTypeId, usize> = catalog
        .types()
        .map(|(id, t)| (id, instance_bound(virtual_net, t)))
        .collect();

    let mut used_vars = BTreeMap::new();
    for (id, t) in catalog.types() {
        for i in 0..bounds[&id] {
            let var = problem
                .add_binary(format!("vm_used[{}][{i}]", t.name))
                .map_err(mip_error)?;
            used_vars.insert((id, i), var);
        }
    }

    let mut node_vars = BTreeMap::new();
    for (u, vnode) in virtual_net.nodes() {
        let (cores, memory) = demand(virtual_net, u);
        let mut assignment: Vec<Term> = Vec::new();
        for (id, t) in catalog.types() {
            if !t.fits(cores, memory) {
                continue;
            }
            for i in 0..bounds[&id] {
                let var = problem
                    .add_binary(format!("node_mapping[{}][{}][{i}]", vnode.name, t.name))
                    .map_err(mip_error)?;
                node_vars.insert((u, id, i), var);
                assignment.push((var, 1.0));
            }
        }
        if assignment.is_empty() {
            return Err(PlacementError::Infeasible);
        }
        problem.add_constraint(format!("assignment of {}", vnode.name), assignment, Sense::Eq, 1.0);
    }

    for (&(id, i), &used) in &used_vars {
        let t = catalog.get(id);
        let hosted: Vec<(VirtId, VarId)> = node_vars
            .iter()
            .filter(|&(&(_, tid, j), _)| tid == id && j == i)
            .map(|(&(u, _, _), &var)| (u, var))
            .collect();

        let mut cores: Vec<Term> = hosted
            .iter()
            .map(|&(u, var)| (var, f64::from(virtual_net.req_cores(u))))
            .collect();
        cores.push((used, -f64::from(t.cores)));
        problem.add_constraint(format!("core capacity of {}#{i}", t.name), cores, Sense::Le, 0.0);

        let mut memory: Vec<Term> = hosted
            .iter()
            .map(|&(u, var)| (var, f64::from(virtual_net.req_memory(u))))
            .collect();
        memory.push((used, -f64::from(t.memory)));
        problem.add_constraint(format!("memory capacity of {}#{i}", t.name), memory, Sense::Le, 0.0);
    }

    let objective = used_vars
        .iter()
        .map(|(&(id, _), &var)| (var, catalog.get(id).hourly_cost))
        .collect();
    problem.set_objective(objective);

    Ok(PackFormulation {
        problem,
        used_vars,
        node_vars,
    })
}

impl PackFormulation {
    pub fn problem(&self) -> &LinearProblem {
        &self.problem
    }

    pub fn into_problem(self) -> LinearProblem {
        self.problem
    }

    /// Variable values describing known bins; bin `k` of type `t` becomes
    /// candidate instance `k` of that type. Bins beyond the bound are
    /// dropped.
    pub fn encode(&self, bins: &[Bin]) -> Vec<f64> {
        let mut values = vec![0.0; self.problem.num_vars()];
        let mut seen: BTreeMap<InstanceTypeId, usize> = BTreeMap::new();
        for bin in bins {
            let slot = seen.entry(bin.instance_type).or_default();
            let i = *slot;
            *slot += 1;
            if let Some(&var) = self.used_vars.get(&(bin.instance_type, i)) {
                values[var.0] = 1.0;
            }
            for &u in bin.items() {
                if let Some(&var) = self.node_vars.get(&(u, bin.instance_type, i)) {
                    values[var.0] = 1.0;
                }
            }
        }
        values
    }

    /// Rebuild bins from solver values; a node goes to every candidate
    /// instance whose variable rounds to one.
    pub fn decode(&self, virtual_net: &VirtualNetwork, outcome: &MipOutcome) -> Vec<Bin> {
        let mut bins: BTreeMap<InstanceKey, Bin> = BTreeMap::new();
        for (&(u, id, i), &var) in &self.node_vars {
            if outcome.value(var).round() == 1.0 {
                let (cores, memory) = demand(virtual_net, u);
                bins.entry((id, i)).or_insert_with(|| Bin::new(id)).add(u, cores, memory);
            }
        }
        bins.into_values().collect()
    }
}

pub struct IlpPacking {
    solver: Box<dyn MipSolver>,
    options: SolveOptions,
}

impl IlpPacking {
    pub fn new(solver: Box<dyn MipSolver>, options: SolveOptions) -> Self {
        Self { solver, options }
    }
}

impl PackStrategy for IlpPacking {
    fn name(&self) -> &'static str {
        "ilp"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, catalog: &CloudCatalog) -> PlacementResult<PackingSolution> {
        let model = formulate(virtual_net, catalog)?;
        let outcome = self.solver.solve(model.problem(), &self.options).map_err(mip_error)?;
        outcome.check_against(model.problem()).map_err(mip_error)?;
        info!(
            backend = %self.options.solver_name,
            status = ?outcome.status,
            objective = ?outcome.objective,
            "solver returned"
        );

        match outcome.status {
            MipStatus::Infeasible => return Err(PlacementError::Infeasible),
            MipStatus::NotSolved if !outcome.has_values() => return Err(PlacementError::TimeLimit),
            _ => {}
        }
        let bins = model.decode(virtual_net, &outcome);
        match PackingSolution::build(virtual_net, catalog, &bins, Verification::Check) {
            // An incomplete incumbent is as good as none.
            Err(PlacementError::Assignment(_) | PlacementError::EmptySolution)
                if outcome.status == MipStatus::NotSolved =>
            {
                Err(PlacementError::TimeLimit)
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct FixedSolver(MipOutcome);

    impl MipSolver for FixedSolver {
        fn solve(&self, _problem: &LinearProblem, _options: &SolveOptions) -> embedgrid_mip::MipResult<MipOutcome> {
            Ok(self.0.clone())
        }
    }

    fn make_catalog() -> CloudCatalog {
        CloudCatalog::new(vec![
            InstanceType {
                name: "big".into(),
                cores: 4,
                memory: 8192,
                hourly_cost: 0.3,
            },
            InstanceType {
                name: "small".into(),
                cores: 1,
                memory: 2048,
                hourly_cost: 0.1,
            },
        ])
        .unwrap()
    }

    fn make_request() -> VirtualNetwork {
        let mut b = VirtualNetwork::builder();
        b.add_node("a", 2, 2048).unwrap();
        b.add_node("b", 1, 1024).unwrap();
        b.add_node("c", 1, 1024).unwrap();
        b.build().unwrap()
    }

    fn make_ilp(outcome: MipOutcome) -> IlpPacking {
        let options = SolveOptions::new("cbc", Duration::from_secs(5)).unwrap();
        IlpPacking::new(Box::new(FixedSolver(outcome)), options)
    }

    #[test]
    fn bounds_follow_first_fit() {
        let v = make_request();
        let catalog = make_catalog();
        assert_eq!(instance_bound(&v, catalog.get(InstanceTypeId(0))), 1);
        // `a` does not fit a small instance and is skipped.
        assert_eq!(instance_bound(&v, catalog.get(InstanceTypeId(1))), 2);
    }

    #[test]
    fn model_only_offers_types_that_hold_the_node() {
        let v = make_request();
        let model = formulate(&v, &make_catalog()).unwrap();
        let p = model.problem();
        assert_eq!(p.num_vars(), 3 + 1 + 3 + 3);
        assert!(p.var_index("vm_used[small][1]").is_some());
        assert!(p.var_index("node_mapping[a][big][0]").is_some());
        assert!(p.var_index("node_mapping[a][small][0]").is_none());
        assert_eq!(p.objective().len(), 3);
    }

    #[test]
    fn known_packing_satisfies_the_model() {
        let v = make_request();
        let catalog = make_catalog();
        let model = formulate(&v, &catalog).unwrap();
        let mut bin = Bin::new(InstanceTypeId(0));
        for u in v.node_ids() {
            let (c, m) = demand(&v, u);
            bin.add(u, c, m);
        }
        let values = model.encode(&[bin]);
        assert_eq!(model.problem().violations(&values, 1e-6), Vec::<String>::new());
        assert!((model.problem().objective_value(&values) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn solver_values_become_a_verified_packing() {
        let v = make_request();
        let catalog = make_catalog();
        let model = formulate(&v, &catalog).unwrap();
        let mut big = Bin::new(InstanceTypeId(0));
        big.add(VirtId(0), 2, 2048);
        let mut small = Bin::new(InstanceTypeId(1));
        small.add(VirtId(1), 1, 1024);
        let mut other = Bin::new(InstanceTypeId(1));
        other.add(VirtId(2), 1, 1024);
        let values = model.encode(&[big, small, other]);

        let s = make_ilp(MipOutcome {
            status: MipStatus::Solved,
            objective: Some(0.5),
            values,
        })
        .attempt(&v, &catalog)
        .unwrap();
        assert_eq!(s.cost(), 0.5);
        assert_eq!(s.vm_used()["small"], 2);
    }

    #[test]
    fn solver_statuses_map_to_placement_errors() {
        let v = make_request();
        let catalog = make_catalog();
        let infeasible = MipOutcome {
            status: MipStatus::Infeasible,
            objective: None,
            values: vec![],
        };
        assert_eq!(make_ilp(infeasible).attempt(&v, &catalog).unwrap_err(), PlacementError::Infeasible);

        let n = formulate(&v, &catalog).unwrap().problem().num_vars();
        let partial = MipOutcome {
            status: MipStatus::NotSolved,
            objective: None,
            values: vec![0.0; n],
        };
        assert_eq!(make_ilp(partial).attempt(&v, &catalog).unwrap_err(), PlacementError::TimeLimit);
    }

    #[test]
    fn node_without_a_type_is_infeasible() {
        let mut b = VirtualNetwork::builder();
        b.add_node("huge", 16, 1024).unwrap();
        let v = b.build().unwrap();
        assert_eq!(formulate(&v, &make_catalog()).unwrap_err(), PlacementError::Infeasible);
    }
}
