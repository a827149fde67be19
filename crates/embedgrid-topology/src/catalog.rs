//! Cloud instance catalog for packing.
//!
//! The catalog file maps an instance type name to its vCPU count, memory in
//! GiB and hourly cost. Memory is converted to MiB on load so it compares
//! directly with virtual node demands.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::loader::read_json;

/// Index of an instance type in its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceTypeId(pub usize);

impl fmt::Display for InstanceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceType {
    pub name: String,
    pub cores: u32,
    /// Memory in MiB.
    pub memory: u32,
    pub hourly_cost: f64,
}

impl InstanceType {
    pub fn fits(&self, cores: u64, memory: u64) -> bool {
        cores <= u64::from(self.cores) && memory <= u64::from(self.memory)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "vCPU")]
    vcpu: u32,
    /// GiB.
    memory: f64,
    hourly_cost: f64,
}

/// A validated, non-empty list of instance types sorted by name.
#[derive(Debug, Clone)]
pub struct CloudCatalog {
    types: Vec<InstanceType>,
}

impl CloudCatalog {
    pub fn new(mut types: Vec<InstanceType>) -> TopologyResult<Self> {
        if types.is_empty() {
            return Err(TopologyError::EmptyCatalog);
        }
        for t in &types {
            let reason = if t.cores == 0 {
                Some("no vCPU")
            } else if t.memory == 0 {
                Some("no memory")
            } else if !(t.hourly_cost.is_finite() && t.hourly_cost > 0.0) {
                Some("hourly cost must be positive")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(TopologyError::InvalidInstance {
                    name: t.name.clone(),
                    reason: reason.to_string(),
                });
            }
        }
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { types })
    }

    pub fn from_file(path: &Path) -> TopologyResult<Self> {
        let entries: BTreeMap<String, CatalogEntry> = read_json(path)?;
        Self::from_entries(entries)
    }

    pub fn from_json_str(json: &str) -> TopologyResult<Self> {
        let entries: BTreeMap<String, CatalogEntry> =
            serde_json::from_str(json).map_err(|source| TopologyError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::from_entries(entries)
    }

    fn from_entries(entries: BTreeMap<String, CatalogEntry>) -> TopologyResult<Self> {
        let types = entries
            .into_iter()
            .map(|(name, e)| InstanceType {
                name,
                cores: e.vcpu,
                memory: (e.memory * 1024.0).round() as u32,
                hourly_cost: e.hourly_cost,
            })
            .collect();
        Self::new(types)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = InstanceTypeId> + '_ {
        (0..self.types.len()).map(InstanceTypeId)
    }

    pub fn types(&self) -> impl Iterator<Item = (InstanceTypeId, &InstanceType)> {
        self.types.iter().enumerate().map(|(i, t)| (InstanceTypeId(i), t))
    }

    pub fn get(&self, id: InstanceTypeId) -> &InstanceType {
        self.types
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown instance type {id}"))
    }

    pub fn lookup(&self, name: &str) -> Option<InstanceTypeId> {
        self.types.iter().position(|t| t.name == name).map(InstanceTypeId)
    }

    /// The cheapest type able to hold `cores` and `memory`, first by name on
    /// equal cost.
    pub fn cheapest_feasible(&self, cores: u64, memory: u64) -> Option<InstanceTypeId> {
        let mut best: Option<(InstanceTypeId, f64)> = None;
        for (id, t) in self.types() {
            if t.fits(cores, memory) && best.is_none_or(|(_, c)| t.hourly_cost < c) {
                best = Some((id, t.hourly_cost));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn max_cores(&self) -> u32 {
        self.types.iter().map(|t| t.cores).max().unwrap_or(0)
    }

    pub fn max_memory(&self) -> u32 {
        self.types.iter().map(|t| t.memory).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "t3.small": {"vCPU": 2, "memory": 2, "hourly_cost": 0.0208},
        "m5.large": {"vCPU": 2, "memory": 8, "hourly_cost": 0.096},
        "t3.nano": {"vCPU": 2, "memory": 0.5, "hourly_cost": 0.0052}
    }"#;

    #[test]
    fn converts_gib_to_mib_and_sorts_by_name() {
        let catalog = CloudCatalog::from_json_str(CATALOG).unwrap();
        let names: Vec<&str> = catalog.types().map(|(_, t)| t.name.as_str()).collect();
        assert_eq!(names, vec!["m5.large", "t3.nano", "t3.small"]);
        let nano = catalog.get(catalog.lookup("t3.nano").unwrap());
        assert_eq!(nano.memory, 512);
    }

    #[test]
    fn cheapest_feasible_respects_both_dimensions() {
        let catalog = CloudCatalog::from_json_str(CATALOG).unwrap();
        let id = catalog.cheapest_feasible(1, 1024).unwrap();
        assert_eq!(catalog.get(id).name, "t3.small");
        let id = catalog.cheapest_feasible(2, 4096).unwrap();
        assert_eq!(catalog.get(id).name, "m5.large");
        assert!(catalog.cheapest_feasible(3, 1).is_none());
    }

    #[test]
    fn rejects_empty_and_invalid_catalogs() {
        assert!(matches!(CloudCatalog::from_json_str("{}"), Err(TopologyError::EmptyCatalog)));
        let bad = r#"{"free": {"vCPU": 1, "memory": 1, "hourly_cost": 0}}"#;
        assert!(matches!(
            CloudCatalog::from_json_str(bad),
            Err(TopologyError::InvalidInstance { .. })
        ));
    }

    #[test]
    fn reads_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("general_purpose.json");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = CloudCatalog::from_file(&path).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.max_memory(), 8192);
    }
}
