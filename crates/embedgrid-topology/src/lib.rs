//! embedgrid-topology — the network data model.
//!
//! Topologies are frozen once built: every query here is read-only, and all
//! per-attempt mutable state (rate usage, route memo) lives in separate
//! structs owned by the caller.
//!
//! # Components
//!
//! - **`physical`** — substrate nodes, multi-interface links, grouped view
//! - **`virtual_network`** — requested nodes and links
//! - **`catalog`** — cloud instance types for packing
//! - **`usage`** — per-attempt interface rate counters
//! - **`path`** — capacity-aware path finder and route memo
//! - **`loader`** — JSON topology files
//! - **`generators`** — fat-tree, random and test topologies
//! - **`fingerprint`** — stable content hash of a topology

pub mod catalog;
pub mod error;
pub mod fingerprint;
pub mod generators;
pub mod ids;
pub mod loader;
pub mod path;
pub mod physical;
pub mod usage;
pub mod virtual_network;

pub use catalog::{CloudCatalog, InstanceType, InstanceTypeId};
pub use error::{TopologyError, TopologyResult};
pub use ids::{Channel, InterfaceId, LinkId, PhysId, VLinkId, VirtId};
pub use loader::LoadOptions;
pub use path::{PathFinder, RouteCache, RouteHop, Step};
pub use physical::{Interface, PhysicalLink, PhysicalNetwork, PhysicalNetworkBuilder, PhysicalNode};
pub use usage::{Overlay, RateUsage, UsageView};
pub use virtual_network::{VirtualLink, VirtualNetwork, VirtualNetworkBuilder, VirtualNode};
