//! Pieces shared by the widening strategies: the machine-count lower bound,
//! machine ranking, and the widening loop itself.

use std::ops::RangeInclusive;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use embedgrid_core::{MachineSelection, PlacementError, PlacementResult};
use embedgrid_topology::{PhysId, PhysicalNetwork, VirtualNetwork};

use crate::solution::Solution;

/// Minimum number of machines able to hold the request:
/// `ceil(max(total_cores / max_cores, total_memory / max_memory))` over
/// compute nodes. Zero when the substrate has no compute node.
pub fn lower_bound(virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> usize {
    let compute = physical.compute_nodes();
    let max_cores = compute.iter().map(|&p| u64::from(physical.cores(p))).max().unwrap_or(0);
    let max_memory = compute.iter().map(|&p| u64::from(physical.memory(p))).max().unwrap_or(0);
    if max_cores == 0 || max_memory == 0 {
        return 0;
    }
    let by_cores = virtual_net.total_cores().div_ceil(max_cores);
    let by_memory = virtual_net.total_memory().div_ceil(max_memory);
    by_cores.max(by_memory).max(1) as usize
}

/// Machine counts a widening strategy tries: from the lower bound up to the
/// number of compute nodes, never more machines than virtual nodes. Empty
/// when the request cannot fit at all.
pub fn machine_range(virtual_net: &VirtualNetwork, physical: &PhysicalNetwork) -> RangeInclusive<usize> {
    let upper = physical.compute_nodes().len().min(virtual_net.number_of_nodes());
    match lower_bound(virtual_net, physical) {
        0 => 1..=0,
        lb => lb..=upper,
    }
}

/// Compute nodes by decreasing `cores * 1000 + memory`, plus the summed
/// interface rate when `with_rate_out` is set. Ties keep id order.
pub fn rank_machines(physical: &PhysicalNetwork, with_rate_out: bool) -> Vec<PhysId> {
    let mut ranked = physical.compute_nodes().to_vec();
    ranked.sort_by_key(|&p| {
        let mut key = u64::from(physical.cores(p)) * 1000 + u64::from(physical.memory(p));
        if with_rate_out {
            key += physical.rate_out(p);
        }
        std::cmp::Reverse(key)
    });
    ranked
}

/// The `n` target machines of one attempt.
pub fn select_machines<R: Rng>(
    ranked: &[PhysId],
    n: usize,
    selection: MachineSelection,
    rng: &mut R,
) -> Vec<PhysId> {
    match selection {
        MachineSelection::Largest => ranked.iter().take(n).copied().collect(),
        MachineSelection::Sampled => {
            let mut pool = ranked.to_vec();
            pool.shuffle(rng);
            pool.truncate(n);
            pool
        }
    }
}

/// Try every machine count of `range` in order until `attempt` yields a
/// solution.
///
/// `Ok(None)` and attempt-local errors (capacity overrun, unroutable link)
/// move on to the next count; any other error ends the search. Exhausting
/// the range is [`PlacementError::Infeasible`].
pub fn widen<F>(strategy: &str, range: RangeInclusive<usize>, mut attempt: F) -> PlacementResult<Solution>
where
    F: FnMut(usize) -> PlacementResult<Option<Solution>>,
{
    for n in range.clone() {
        match attempt(n) {
            Ok(Some(solution)) => {
                info!(
                    strategy,
                    n_machines = n,
                    used = solution.n_machines_used(),
                    "placement found"
                );
                return Ok(solution);
            }
            Ok(None) => debug!(strategy, n_machines = n, "incomplete placement, widening"),
            Err(err) if err.is_attempt_local() => {
                debug!(strategy, n_machines = n, error = %err, "attempt rejected, widening");
            }
            Err(err) => return Err(err),
        }
    }
    warn!(
        strategy,
        from = range.start(),
        to = range.end(),
        "no feasible placement in the machine range"
    );
    Err(PlacementError::Infeasible)
}
