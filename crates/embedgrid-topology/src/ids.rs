//! Typed indices into frozen topologies.
//!
//! Ids are only meaningful for the network that handed them out. Looking up
//! an id on another network is a programming error and panics.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! index_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

index_id!(
    /// A node of the physical substrate.
    PhysId,
    "p"
);
index_id!(
    /// A node of the virtual request.
    VirtId,
    "v"
);
index_id!(
    /// A physical link (all parallel devices between two nodes).
    LinkId,
    "l"
);
index_id!(
    /// A virtual link, endpoints in canonical order.
    VLinkId,
    "vl"
);

/// An interface of a physical link.
///
/// Real interfaces are numbered from zero within their link. The aggregate
/// pseudo-interface of a grouped link uses [`InterfaceId::GROUPED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterfaceId(pub u32);

impl InterfaceId {
    pub const GROUPED: InterfaceId = InterfaceId(u32::MAX);

    pub fn is_grouped(self) -> bool {
        self == Self::GROUPED
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_grouped() {
            f.write_str("grouped")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A capacity-carrying `(link, interface)` pair. Usage is undirected: both
/// directions of a channel share its rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub link: LinkId,
    pub interface: InterfaceId,
}

impl Channel {
    pub fn new(link: LinkId, interface: InterfaceId) -> Self {
        Self { link, interface }
    }
}
