//! Open instances and their running usage.

use embedgrid_topology::{CloudCatalog, InstanceType, InstanceTypeId, VirtId, VirtualNetwork};

/// One instance being filled: its type, the virtual nodes packed so far and
/// their summed demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub instance_type: InstanceTypeId,
    items: Vec<VirtId>,
    cores: u64,
    memory: u64,
}

impl Bin {
    pub fn new(instance_type: InstanceTypeId) -> Self {
        Self {
            instance_type,
            items: Vec::new(),
            cores: 0,
            memory: 0,
        }
    }

    pub fn add(&mut self, node: VirtId, cores: u64, memory: u64) {
        self.items.push(node);
        self.cores += cores;
        self.memory += memory;
    }

    pub fn items(&self) -> &[VirtId] {
        &self.items
    }

    pub fn cores(&self) -> u64 {
        self.cores
    }

    pub fn memory(&self) -> u64 {
        self.memory
    }

    pub fn kind<'c>(&self, catalog: &'c CloudCatalog) -> &'c InstanceType {
        catalog.get(self.instance_type)
    }

    /// Whether `cores` and `memory` more still fit the current type.
    pub fn has_room(&self, catalog: &CloudCatalog, cores: u64, memory: u64) -> bool {
        self.kind(catalog).fits(self.cores + cores, self.memory + memory)
    }
}

/// `(cores, memory)` of a virtual node, widened for summing.
pub fn demand(virtual_net: &VirtualNetwork, node: VirtId) -> (u64, u64) {
    (
        u64::from(virtual_net.req_cores(node)),
        u64::from(virtual_net.req_memory(node)),
    )
}

/// Virtual nodes by decreasing `1000 * cores + memory`, ties in id order.
pub fn by_decreasing_size(virtual_net: &VirtualNetwork) -> Vec<VirtId> {
    let mut items: Vec<VirtId> = virtual_net.node_ids().collect();
    items.sort_by_key(|&v| {
        let (cores, memory) = demand(virtual_net, v);
        std::cmp::Reverse(1000 * cores + memory)
    });
    items
}
