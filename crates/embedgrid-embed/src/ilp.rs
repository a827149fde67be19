//! Exact embedding delegated to a [`MipSolver`].
//!
//! [`formulate`] builds the model:
//!
//! - `node_mapping[u][p]`: virtual node `u` runs on compute node `p`
//! - `link_mapping[u][v][i][j][f]`: link `u-v` crosses interface `f` from
//!   `i` to `j` (binary, or continuous in `[0, 1]` on a grouped substrate)
//! - `usage[p]`: machine `p` hosts something (min-machines objective only)
//!
//! subject to single assignment, node cores and memory, flow conservation
//! at every physical node, interface capacity over both directions, at most
//! one interface out of and into each node per link, and one direction per
//! interface. Solver values are read back into a node map and ordered
//! routes, and the result is always verified.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use embedgrid_core::{IlpObjective, PlacementError, PlacementResult, Verification};
use embedgrid_mip::{
    LinearProblem, MipError, MipOutcome, MipSolver, MipStatus, ObjectiveSense, Sense, SolveOptions, Term, VarId,
    VarKind,
};
use embedgrid_topology::{Channel, InterfaceId, PhysId, PhysicalNetwork, RouteHop, VLinkId, VirtId, VirtualNetwork};

use crate::EmbedStrategy;
use crate::embedding::Embedding;
use crate::solution::Solution;

/// Arc variables below this value are treated as unused.
const EPSILON: f64 = 1e-6;

type ArcKey = (VLinkId, PhysId, PhysId, InterfaceId);

/// The embedding model and the variable ids needed to read a result back.
#[derive(Debug, Clone)]
pub struct EmbedFormulation {
    problem: LinearProblem,
    node_vars: BTreeMap<(VirtId, PhysId), VarId>,
    arc_vars: BTreeMap<ArcKey, VarId>,
    usage_vars: BTreeMap<PhysId, VarId>,
}

fn mip_error(err: MipError) -> PlacementError {
    PlacementError::Solver(err.to_string())
}

pub fn formulate(
    virtual_net: &VirtualNetwork,
    physical: &PhysicalNetwork,
    objective: IlpObjective,
) -> PlacementResult<EmbedFormulation> {
    let mut problem = LinearProblem::new("embedding", ObjectiveSense::Minimize);
    let compute = physical.compute_nodes();
    let arc_kind = if physical.grouped_interfaces() {
        VarKind::Continuous
    } else {
        VarKind::Binary
    };

    // ── Variables ──────────────────────────────────────────────────

    let mut arc_vars = BTreeMap::new();
    for (vl, vlink) in virtual_net.links() {
        let (u, v) = (virtual_net.name(vlink.ends[0]), virtual_net.name(vlink.ends[1]));
        for (link, plink) in physical.links() {
            let [a, b] = plink.ends;
            for iface in physical.interfaces(link) {
                for (i, j) in [(a, b), (b, a)] {
                    let name = format!(
                        "link_mapping[{u}][{v}][{}][{}][{}]",
                        physical.name(i),
                        physical.name(j),
                        iface.id
                    );
                    let var = problem
                        .add_var(name, arc_kind, 0.0, Some(1.0))
                        .map_err(mip_error)?;
                    arc_vars.insert((vl, i, j, iface.id), var);
                }
            }
        }
    }

    let mut node_vars = BTreeMap::new();
    for (u, vnode) in virtual_net.nodes() {
        for &p in compute {
            let name = format!("node_mapping[{}][{}]", vnode.name, physical.name(p));
            node_vars.insert((u, p), problem.add_binary(name).map_err(mip_error)?);
        }
    }

    // ── Node constraints ───────────────────────────────────────────

    for (u, vnode) in virtual_net.nodes() {
        let terms = compute.iter().map(|&p| (node_vars[&(u, p)], 1.0)).collect();
        problem.add_constraint(format!("assignment of {}", vnode.name), terms, Sense::Eq, 1.0);
    }
    for &p in compute {
        let cpu = virtual_net
            .nodes()
            .map(|(u, n)| (node_vars[&(u, p)], f64::from(n.req_cores)))
            .collect();
        problem.add_constraint(
            format!("cpu capacity of {}", physical.name(p)),
            cpu,
            Sense::Le,
            f64::from(physical.cores(p)),
        );
        let memory = virtual_net
            .nodes()
            .map(|(u, n)| (node_vars[&(u, p)], f64::from(n.req_memory)))
            .collect();
        problem.add_constraint(
            format!("memory capacity of {}", physical.name(p)),
            memory,
            Sense::Le,
            f64::from(physical.memory(p)),
        );
    }

    // ── Flow constraints ───────────────────────────────────────────

    for (vl, vlink) in virtual_net.links() {
        let label = virtual_net.describe_link(vl);
        let [u, v] = vlink.ends;
        for (i, _) in physical.nodes() {
            let mut out: Vec<Term> = Vec::new();
            let mut into: Vec<Term> = Vec::new();
            for &(j, link) in physical.neighbors(i) {
                for iface in physical.interfaces(link) {
                    out.push((arc_vars[&(vl, i, j, iface.id)], 1.0));
                    into.push((arc_vars[&(vl, j, i, iface.id)], 1.0));
                }
            }

            let mut flow: Vec<Term> = out.clone();
            flow.extend(into.iter().map(|&(var, _)| (var, -1.0)));
            if let Some(&x) = node_vars.get(&(u, i)) {
                flow.push((x, -1.0));
            }
            if let Some(&x) = node_vars.get(&(v, i)) {
                flow.push((x, 1.0));
            }
            let at = physical.name(i);
            problem.add_constraint(format!("flow conservation of {label} at {at}"), flow, Sense::Eq, 0.0);
            problem.add_constraint(format!("single interface out of {at} for {label}"), out, Sense::Le, 1.0);
            problem.add_constraint(format!("single interface into {at} for {label}"), into, Sense::Le, 1.0);
        }
    }

    for (link, plink) in physical.links() {
        let [a, b] = plink.ends;
        for iface in physical.interfaces(link) {
            let channel = physical.describe_channel(Channel::new(link, iface.id));
            let mut load = Vec::new();
            for (vl, vlink) in virtual_net.links() {
                let fwd = arc_vars[&(vl, a, b, iface.id)];
                let bwd = arc_vars[&(vl, b, a, iface.id)];
                let rate = f64::from(vlink.req_rate);
                load.extend([(fwd, rate), (bwd, rate)]);
                problem.add_constraint(
                    format!("single direction of {channel} for {}", virtual_net.describe_link(vl)),
                    vec![(fwd, 1.0), (bwd, 1.0)],
                    Sense::Le,
                    1.0,
                );
            }
            problem.add_constraint(format!("link capacity of {channel}"), load, Sense::Le, iface.rate as f64);
        }
    }

    // ── Objective ──────────────────────────────────────────────────

    let mut usage_vars = BTreeMap::new();
    match objective {
        IlpObjective::None => {}
        IlpObjective::MinMachines => {
            for &p in compute {
                let used = problem
                    .add_binary(format!("usage[{}]", physical.name(p)))
                    .map_err(mip_error)?;
                usage_vars.insert(p, used);
                for (u, vnode) in virtual_net.nodes() {
                    problem.add_constraint(
                        format!("usage of {} by {}", physical.name(p), vnode.name),
                        vec![(used, 1.0), (node_vars[&(u, p)], -1.0)],
                        Sense::Ge,
                        0.0,
                    );
                }
            }
            problem.set_objective(usage_vars.values().map(|&var| (var, 1.0)).collect());
        }
        IlpObjective::MinBandwidth => {
            let terms = arc_vars
                .iter()
                .map(|(&(vl, ..), &var)| (var, f64::from(virtual_net.req_rate(vl))))
                .collect();
            problem.set_objective(terms);
        }
    }

    debug!(
        variables = problem.num_vars(),
        constraints = problem.constraints().len(),
        objective = %objective,
        "embedding model built"
    );
    Ok(EmbedFormulation {
        problem,
        node_vars,
        arc_vars,
        usage_vars,
    })
}

impl EmbedFormulation {
    pub fn problem(&self) -> &LinearProblem {
        &self.problem
    }

    pub fn into_problem(self) -> LinearProblem {
        self.problem
    }

    /// Variable values describing a known embedding, e.g. to warm-start a
    /// solver or to check an embedding against the model.
    pub fn encode(&self, virtual_net: &VirtualNetwork, embedding: &Embedding) -> Vec<f64> {
        let mut values = vec![0.0; self.problem.num_vars()];
        for (v, p) in embedding.nodes() {
            if let Some(&var) = self.node_vars.get(&(v, p)) {
                values[var.0] = 1.0;
            }
            if let Some(&var) = self.usage_vars.get(&p) {
                values[var.0] = 1.0;
            }
        }
        for (link, _) in virtual_net.links() {
            for hop in embedding.route(link).unwrap_or_default() {
                if let Some(&var) = self.arc_vars.get(&(link, hop.from, hop.to, hop.channel.interface)) {
                    values[var.0] = 1.0;
                }
            }
        }
        values
    }

    /// Read a node map and ordered routes out of solver values.
    pub fn decode(
        &self,
        virtual_net: &VirtualNetwork,
        physical: &PhysicalNetwork,
        outcome: &MipOutcome,
    ) -> PlacementResult<Embedding> {
        let mut embedding = Embedding::new();
        for (u, vnode) in virtual_net.nodes() {
            let host = physical
                .compute_nodes()
                .iter()
                .copied()
                .find(|&p| outcome.value(self.node_vars[&(u, p)]) > 0.5);
            let Some(p) = host else {
                return Err(PlacementError::Assignment(format!(
                    "virtual node {} is not assigned to a physical node",
                    vnode.name
                )));
            };
            embedding.assign(u, p);
        }

        for (vl, vlink) in virtual_net.links() {
            let (Some(a), Some(b)) = (embedding.node(vlink.ends[0]), embedding.node(vlink.ends[1])) else {
                continue;
            };
            if a == b {
                continue;
            }
            let hops = self.walk(physical, outcome, vl, a, b).ok_or_else(|| {
                PlacementError::Assignment(format!(
                    "virtual link {} has no physical path",
                    virtual_net.describe_link(vl)
                ))
            })?;
            embedding.set_route(vl, hops);
        }
        Ok(embedding)
    }

    /// Follow the heaviest arc out of each node, never revisiting one.
    fn walk(
        &self,
        physical: &PhysicalNetwork,
        outcome: &MipOutcome,
        link: VLinkId,
        from: PhysId,
        to: PhysId,
    ) -> Option<Vec<RouteHop>> {
        let mut visited = BTreeSet::from([from]);
        let mut hops = Vec::new();
        let mut current = from;
        while current != to {
            let mut best: Option<(RouteHop, f64)> = None;
            for &(next, plink) in physical.neighbors(current) {
                if visited.contains(&next) {
                    continue;
                }
                for iface in physical.interfaces(plink) {
                    let value = outcome.value(self.arc_vars[&(link, current, next, iface.id)]);
                    if value > EPSILON && best.is_none_or(|(_, v)| value > v) {
                        let hop = RouteHop {
                            from: current,
                            to: next,
                            channel: Channel::new(plink, iface.id),
                        };
                        best = Some((hop, value));
                    }
                }
            }
            let (hop, _) = best?;
            visited.insert(hop.to);
            current = hop.to;
            hops.push(hop);
        }
        Some(hops)
    }
}

pub struct IlpEmbedding {
    solver: Box<dyn MipSolver>,
    options: SolveOptions,
    objective: IlpObjective,
}

impl IlpEmbedding {
    pub fn new(solver: Box<dyn MipSolver>, options: SolveOptions, objective: IlpObjective) -> Self {
        Self {
            solver,
            options,
            objective,
        }
    }
}

impl EmbedStrategy for IlpEmbedding {
    fn name(&self) -> &'static str {
        "ilp"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> PlacementResult<Solution> {
        let model = formulate(virtual_net, physical, self.objective)?;
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
        let embedding = match model.decode(virtual_net, physical, &outcome) {
            Ok(embedding) => embedding,
            // An incomplete incumbent is as good as none.
            Err(_) if outcome.status == MipStatus::NotSolved => return Err(PlacementError::TimeLimit),
            Err(err) => return Err(err),
        };
        Solution::build(virtual_net, physical, embedding, Verification::Check)
    }
}
