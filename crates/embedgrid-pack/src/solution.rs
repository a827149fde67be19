//! Packing solution — which instance every virtual node runs on, how many
//! instances of each type are rented, and what they cost per hour.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use embedgrid_core::{PlacementError, PlacementResult, Resource, Verification};
use embedgrid_topology::{CloudCatalog, VirtualNetwork};

use crate::bins::{Bin, demand};

/// An instance of a given type; `index` tells instances apart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Instance {
    pub instance_type: String,
    pub index: usize,
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.instance_type, self.index)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackingSolution {
    /// Virtual node name → instance.
    assignment: BTreeMap<String, Instance>,
    /// Instance type name → number of instances rented.
    vm_used: BTreeMap<String, usize>,
    /// Hourly cost, rounded to cents.
    cost: f64,
}

/// Check that `bins` hold every virtual node exactly once and that no
/// instance is filled beyond its type.
pub fn verify_packing(virtual_net: &VirtualNetwork, catalog: &CloudCatalog, bins: &[Bin]) -> PlacementResult<()> {
    if bins.is_empty() {
        return Err(PlacementError::EmptySolution);
    }

    let mut seen = vec![false; virtual_net.number_of_nodes()];
    for bin in bins {
        for &v in bin.items() {
            if std::mem::replace(&mut seen[v.index()], true) {
                return Err(PlacementError::Assignment(format!(
                    "virtual node {} is packed twice",
                    virtual_net.name(v)
                )));
            }
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(PlacementError::Assignment(format!(
            "virtual node {} is not packed on any instance",
            virtual_net.name(embedgrid_topology::VirtId(missing))
        )));
    }

    for (index, bin) in bins.iter().enumerate() {
        let kind = bin.kind(catalog);
        let (cores, memory) = bin
            .items()
            .iter()
            .map(|&v| demand(virtual_net, v))
            .fold((0, 0), |(c, m), (dc, dm)| (c + dc, m + dm));
        let instance = format!("{}#{index}", kind.name);
        if cores > u64::from(kind.cores) {
            return Err(PlacementError::NodeResource {
                node: instance,
                resource: Resource::Cores,
                used: cores,
                max: u64::from(kind.cores),
            });
        }
        if memory > u64::from(kind.memory) {
            return Err(PlacementError::NodeResource {
                node: instance,
                resource: Resource::Memory,
                used: memory,
                max: u64::from(kind.memory),
            });
        }
    }
    Ok(())
}

impl PackingSolution {
    /// Finalize `bins`; bin `i` becomes instance index `i` of its type.
    pub fn build(
        virtual_net: &VirtualNetwork,
        catalog: &CloudCatalog,
        bins: &[Bin],
        verification: Verification,
    ) -> PlacementResult<Self> {
        match verification {
            Verification::Check => verify_packing(virtual_net, catalog, bins)?,
            Verification::Trust => debug!("building packing without verification"),
        }

        let mut assignment = BTreeMap::new();
        let mut vm_used: BTreeMap<String, usize> = BTreeMap::new();
        let mut cost = 0.0;
        for (index, bin) in bins.iter().enumerate() {
            let kind = bin.kind(catalog);
            *vm_used.entry(kind.name.clone()).or_default() += 1;
            cost += kind.hourly_cost;
            for &v in bin.items() {
                let instance = Instance {
                    instance_type: kind.name.clone(),
                    index,
                };
                assignment.insert(virtual_net.name(v).to_string(), instance);
            }
        }

        Ok(Self {
            assignment,
            vm_used,
            cost: (cost * 100.0).round() / 100.0,
        })
    }

    /// Instance hosting the virtual node named `node`.
    pub fn node_info(&self, node: &str) -> Option<&Instance> {
        self.assignment.get(node)
    }

    pub fn assignment(&self) -> &BTreeMap<String, Instance> {
        &self.assignment
    }

    pub fn vm_used(&self) -> &BTreeMap<String, usize> {
        &self.vm_used
    }

    pub fn n_instances(&self) -> usize {
        self.vm_used.values().sum()
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }
}

impl fmt::Display for PackingSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hourly cost = {:.2}", self.cost)?;
        let used: Vec<String> = self.vm_used.iter().map(|(t, n)| format!("{t}: {n}")).collect();
        writeln!(f, "machines used = {}", used.join(", "))?;
        for (node, instance) in &self.assignment {
            writeln!(f, "{node} mapped on {} with id {}", instance.instance_type, instance.index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedgrid_topology::{InstanceType, InstanceTypeId, VirtId};

    fn make_catalog() -> CloudCatalog {
        CloudCatalog::new(vec![
            InstanceType {
                name: "large".into(),
                cores: 8,
                memory: 16_384,
                hourly_cost: 0.333,
            },
            InstanceType {
                name: "small".into(),
                cores: 2,
                memory: 4096,
                hourly_cost: 0.111,
            },
        ])
        .unwrap()
    }

    fn make_request() -> VirtualNetwork {
        let mut b = VirtualNetwork::builder();
        b.add_node("a", 2, 2048).unwrap();
        b.add_node("b", 2, 2048).unwrap();
        b.add_node("c", 1, 1024).unwrap();
        b.build().unwrap()
    }

    fn make_bin(kind: usize, items: &[(usize, u64, u64)]) -> Bin {
        let mut bin = Bin::new(InstanceTypeId(kind));
        for &(v, c, m) in items {
            bin.add(VirtId(v), c, m);
        }
        bin
    }

    #[test]
    fn cost_and_counts_follow_the_bins() {
        let v = make_request();
        let catalog = make_catalog();
        let bins = vec![
            make_bin(0, &[(0, 2, 2048), (1, 2, 2048)]),
            make_bin(1, &[(2, 1, 1024)]),
        ];
        let s = PackingSolution::build(&v, &catalog, &bins, Verification::Check).unwrap();
        assert_eq!(s.cost(), 0.44);
        assert_eq!(s.vm_used()["large"], 1);
        assert_eq!(s.n_instances(), 2);
        assert_eq!(s.node_info("c").unwrap().to_string(), "small#1");
        assert!(s.to_string().starts_with("hourly cost = 0.44\n"));
    }

    #[test]
    fn overfilled_instance_is_rejected() {
        let v = make_request();
        let catalog = make_catalog();
        let bins = vec![make_bin(1, &[(0, 2, 2048), (1, 2, 2048), (2, 1, 1024)])];
        assert_eq!(
            verify_packing(&v, &catalog, &bins),
            Err(PlacementError::NodeResource {
                node: "small#0".into(),
                resource: Resource::Cores,
                used: 5,
                max: 2,
            })
        );
    }

    #[test]
    fn unpacked_and_doubly_packed_nodes_are_rejected() {
        let v = make_request();
        let catalog = make_catalog();
        let missing = vec![make_bin(0, &[(0, 2, 2048), (1, 2, 2048)])];
        assert!(matches!(verify_packing(&v, &catalog, &missing), Err(PlacementError::Assignment(ref m)) if m.contains(" c ")));
        let twice = vec![make_bin(0, &[(0, 2, 2048), (1, 2, 2048), (2, 1, 1024), (0, 2, 2048)])];
        assert!(matches!(verify_packing(&v, &catalog, &twice), Err(PlacementError::Assignment(_))));
        assert_eq!(verify_packing(&v, &catalog, &[]), Err(PlacementError::EmptySolution));
    }
}
