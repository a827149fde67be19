//! Two-phase placement with migration repair.
//!
//! Phase 1 places virtual nodes one by one on the first machine with room,
//! trying already selected machines first (most recently selected first).
//! Phase 2 routes every cross-machine link over the max-residual interface
//! of each hop, ignoring capacity, then repairs overruns: while some channel
//! is overrun, take the most overrun one and move one of the virtual nodes
//! whose links cross it, so that the total exceeded rate strictly drops.
//! Each accepted move lowers a non-negative integer, so the loop ends; it
//! may end in [`PlacementError::Infeasible`] when no single move helps.
//!
//! Endpoint ranking (most links on the overrun channel first) and machine
//! order (selected machines first) are heuristic tie-breaks, not optimal
//! choices.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info, warn};

use embedgrid_core::{InterfacePolicy, PlacementError, PlacementResult, Verification};
use embedgrid_topology::{
    Channel, PathFinder, PhysId, PhysicalNetwork, RateUsage, RouteCache, RouteHop, VLinkId, VirtId, VirtualNetwork,
};

use crate::EmbedStrategy;
use crate::embedding::Embedding;
use crate::solution::Solution;

#[derive(Debug, Default)]
pub struct TwoPhaseEmbedding;

impl TwoPhaseEmbedding {
    pub fn new() -> Self {
        Self
    }
}

impl EmbedStrategy for TwoPhaseEmbedding {
    fn name(&self) -> &'static str {
        "two_phase"
    }

    fn attempt(&mut self, virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> PlacementResult<Solution> {
        let mut repair = Repair::new(virtual_net, physical);
        repair.place_nodes()?;
        repair.route_links()?;
        repair.migrate()?;
        info!(
            strategy = self.name(),
            moves = repair.moves,
            used = repair.embedding.n_machines_used(),
            "placement found"
        );
        Solution::build(virtual_net, physical, repair.embedding, Verification::Check)
    }
}

/// A tentative move: the usage it would leave and the new route (or `None`
/// when the link becomes machine-local) of every link adjacent to the node.
struct Trial {
    usage: RateUsage,
    routes: Vec<(VLinkId, Option<Vec<RouteHop>>)>,
}

struct Repair<'a> {
    virtual_net: &'a VirtualNetwork,
    finder: PathFinder<'a>,
    cache: RouteCache,
    embedding: Embedding,
    cores: Vec<u64>,
    memory: Vec<u64>,
    selected: VecDeque<PhysId>,
    not_selected: Vec<PhysId>,
    usage: RateUsage,
    /// Virtual links routed over each channel.
    users: BTreeMap<Channel, BTreeSet<VLinkId>>,
    moves: usize,
}

impl<'a> Repair<'a> {
    fn new(virtual_net: &'a VirtualNetwork, physical: &'a PhysicalNetwork) -> Self {
        Self {
            virtual_net,
            finder: PathFinder::new(physical, InterfacePolicy::MaxResidual),
            cache: RouteCache::new(),
            embedding: Embedding::new(),
            cores: vec![0; physical.number_of_nodes()],
            memory: vec![0; physical.number_of_nodes()],
            selected: VecDeque::new(),
            not_selected: physical.compute_nodes().to_vec(),
            usage: RateUsage::new(),
            users: BTreeMap::new(),
            moves: 0,
        }
    }

    fn physical(&self) -> &'a PhysicalNetwork {
        self.finder.network()
    }

    fn fits(&self, machine: PhysId, v: VirtId) -> bool {
        let node = self.physical().node(machine);
        self.cores[machine.index()] + u64::from(self.virtual_net.req_cores(v)) <= u64::from(node.cores)
            && self.memory[machine.index()] + u64::from(self.virtual_net.req_memory(v)) <= u64::from(node.memory)
    }

    /// Selected machines first, then the rest in id order.
    fn candidates(&self) -> Vec<PhysId> {
        self.selected.iter().chain(&self.not_selected).copied().collect()
    }

    fn select(&mut self, machine: PhysId) {
        if let Some(pos) = self.not_selected.iter().position(|&p| p == machine) {
            self.not_selected.remove(pos);
            self.selected.push_front(machine);
        }
    }

    fn host(&mut self, v: VirtId, machine: PhysId) {
        self.cores[machine.index()] += u64::from(self.virtual_net.req_cores(v));
        self.memory[machine.index()] += u64::from(self.virtual_net.req_memory(v));
        self.embedding.assign(v, machine);
        self.select(machine);
    }

    fn unhost(&mut self, v: VirtId, machine: PhysId) {
        self.cores[machine.index()] -= u64::from(self.virtual_net.req_cores(v));
        self.memory[machine.index()] -= u64::from(self.virtual_net.req_memory(v));
    }

    fn place_nodes(&mut self) -> PlacementResult<()> {
        for v in self.virtual_net.node_ids() {
            let Some(machine) = self.candidates().into_iter().find(|&p| self.fits(p, v)) else {
                warn!(node = %self.virtual_net.name(v), "no machine has room left");
                return Err(PlacementError::Infeasible);
            };
            self.host(v, machine);
        }
        debug!(machines = self.selected.len(), "nodes placed");
        Ok(())
    }

    /// Route `from -> to` hop by hop over the max-residual interface under
    /// `usage`, charging `rate` as it goes.
    fn route(&mut self, from: PhysId, to: PhysId, rate: u64, usage: &mut RateUsage) -> PlacementResult<Vec<RouteHop>> {
        let steps = self.cache.route(&self.finder, from, to)?;
        let mut hops = Vec::with_capacity(steps.len());
        for step in steps {
            let Some(interface) = self.finder.max_residual_interface(step.link, usage) else {
                return Err(PlacementError::NoPathFound {
                    from: self.physical().name(from).to_string(),
                    to: self.physical().name(to).to_string(),
                });
            };
            let hop = step.with_interface(interface);
            usage.add(hop.channel, rate);
            hops.push(hop);
        }
        Ok(hops)
    }

    fn route_links(&mut self) -> PlacementResult<()> {
        let virtual_net = self.virtual_net;
        let mut usage = std::mem::take(&mut self.usage);
        for (link, vlink) in virtual_net.links() {
            let (Some(a), Some(b)) = (self.embedding.node(vlink.ends[0]), self.embedding.node(vlink.ends[1])) else {
                continue;
            };
            if a == b {
                continue;
            }
            let hops = self.route(a, b, u64::from(vlink.req_rate), &mut usage)?;
            for hop in &hops {
                self.users.entry(hop.channel).or_default().insert(link);
            }
            self.embedding.set_route(link, hops);
        }
        self.usage = usage;
        Ok(())
    }

    /// Virtual nodes with links on `channel`, most frequent first.
    fn ranked_endpoints(&self, channel: Channel) -> Vec<VirtId> {
        let mut counts: BTreeMap<VirtId, usize> = BTreeMap::new();
        for &link in self.users.get(&channel).into_iter().flatten() {
            for end in self.virtual_net.link(link).ends {
                *counts.entry(end).or_default() += 1;
            }
        }
        let mut ranked: Vec<(VirtId, usize)> = counts.into_iter().collect();
        ranked.sort_by_key(|&(_, count)| Reverse(count));
        ranked.into_iter().map(|(v, _)| v).collect()
    }

    fn simulate(&mut self, node: VirtId, target: PhysId) -> PlacementResult<Trial> {
        let virtual_net = self.virtual_net;
        let mut usage = self.usage.clone();
        for &(_, link) in virtual_net.neighbors(node) {
            let rate = u64::from(virtual_net.req_rate(link));
            for hop in self.embedding.route(link).unwrap_or_default() {
                usage.sub(hop.channel, rate);
            }
        }

        let mut routes = Vec::new();
        for &(neighbor, link) in virtual_net.neighbors(node) {
            let Some(other) = self.embedding.node(neighbor) else {
                continue;
            };
            if other == target {
                routes.push((link, None));
                continue;
            }
            let rate = u64::from(virtual_net.req_rate(link));
            let hops = if virtual_net.link(link).ends[0] == node {
                self.route(target, other, rate, &mut usage)?
            } else {
                self.route(other, target, rate, &mut usage)?
            };
            routes.push((link, Some(hops)));
        }
        Ok(Trial { usage, routes })
    }

    fn apply(&mut self, node: VirtId, target: PhysId, trial: Trial) {
        for (link, hops) in trial.routes {
            if let Some(old) = self.embedding.remove_route(link) {
                for hop in old {
                    if let Some(set) = self.users.get_mut(&hop.channel) {
                        set.remove(&link);
                    }
                }
            }
            if let Some(hops) = hops {
                for hop in &hops {
                    self.users.entry(hop.channel).or_default().insert(link);
                }
                self.embedding.set_route(link, hops);
            }
        }
        if let Some(previous) = self.embedding.node(node) {
            self.unhost(node, previous);
        }
        self.host(node, target);
        self.usage = trial.usage;
        self.moves += 1;
    }

    fn migrate(&mut self) -> PlacementResult<()> {
        let physical = self.physical();
        let mut exceeded = self.usage.exceeded_rate(physical);
        while exceeded > 0 {
            let Some((channel, excess)) = self.usage.most_violated(physical) else {
                break;
            };
            debug!(channel = %physical.describe_channel(channel), excess, exceeded, "repairing overrun");

            let mut accepted = None;
            'search: for node in self.ranked_endpoints(channel) {
                let current = self.embedding.node(node);
                for target in self.candidates() {
                    if Some(target) == current || !self.fits(target, node) {
                        continue;
                    }
                    let trial = self.simulate(node, target)?;
                    let after = trial.usage.exceeded_rate(physical);
                    if after < exceeded {
                        accepted = Some((node, target, trial, after));
                        break 'search;
                    }
                }
            }

            let Some((node, target, trial, after)) = accepted else {
                warn!(exceeded, "no single move lowers the exceeded rate");
                return Err(PlacementError::Infeasible);
            };
            debug!(
                node = %self.virtual_net.name(node),
                target = %physical.name(target),
                before = exceeded,
                after,
                "node migrated"
            );
            self.apply(node, target, trial);
            exceeded = after;
        }
        Ok(())
    }
}
