//! Per-attempt rate counters.
//!
//! Usage is keyed by [`Channel`] and is undirected: traffic in either
//! direction of a `(link, interface)` pair consumes the same capacity.
//! Counters are owned by a single placement attempt and never shared.

use std::collections::BTreeMap;

use crate::ids::Channel;
use crate::physical::PhysicalNetwork;

/// Read access to the rate already consumed on each channel.
pub trait UsageView {
    fn used(&self, channel: Channel) -> u64;
}

/// Rate consumed per channel. Unlisted channels are unused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateUsage {
    used: BTreeMap<Channel, u64>,
}

impl RateUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Channel, rate: u64) {
        *self.used.entry(channel).or_insert(0) += rate;
    }

    /// Release `rate` on `channel`. Saturates at zero.
    pub fn sub(&mut self, channel: Channel, rate: u64) {
        if let Some(used) = self.used.get_mut(&channel) {
            *used = used.saturating_sub(rate);
            if *used == 0 {
                self.used.remove(&channel);
            }
        }
    }

    /// Fold every counter of `other` into `self`.
    pub fn merge(&mut self, other: &RateUsage) {
        for (&channel, &rate) in &other.used {
            self.add(channel, rate);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, u64)> + '_ {
        self.used.iter().map(|(&c, &r)| (c, r))
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Capacity left on `channel`; negative when the channel is overrun.
    pub fn residual(&self, network: &PhysicalNetwork, channel: Channel) -> i64 {
        network.rate(channel) as i64 - self.used(channel) as i64
    }

    /// Sum over channels of `max(0, used - rate)`.
    pub fn exceeded_rate(&self, network: &PhysicalNetwork) -> u64 {
        self.iter()
            .map(|(c, used)| used.saturating_sub(network.rate(c)))
            .sum()
    }

    /// The channel with the largest overrun, first in channel order on ties.
    pub fn most_violated(&self, network: &PhysicalNetwork) -> Option<(Channel, u64)> {
        let mut best: Option<(Channel, u64)> = None;
        for (c, used) in self.iter() {
            let excess = used.saturating_sub(network.rate(c));
            if excess > 0 && best.is_none_or(|(_, e)| excess > e) {
                best = Some((c, excess));
            }
        }
        best
    }
}

impl UsageView for RateUsage {
    fn used(&self, channel: Channel) -> u64 {
        self.used.get(&channel).copied().unwrap_or(0)
    }
}

/// Two usage tables read as their sum, e.g. committed usage plus the
/// tentative usage of the partition being placed.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    pub base: &'a RateUsage,
    pub extra: &'a RateUsage,
}

impl<'a> Overlay<'a> {
    pub fn new(base: &'a RateUsage, extra: &'a RateUsage) -> Self {
        Self { base, extra }
    }
}

impl UsageView for Overlay<'_> {
    fn used(&self, channel: Channel) -> u64 {
        self.base.used(channel) + self.extra.used(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{InterfaceId, LinkId};

    fn make_network() -> PhysicalNetwork {
        let mut b = PhysicalNetwork::builder();
        b.add_node("a", 1, 1).unwrap();
        b.add_node("b", 1, 1).unwrap();
        b.add_device("a", "b", "e0", "e0", 100).unwrap();
        b.add_device("a", "b", "e1", "e1", 50).unwrap();
        b.build(false).unwrap()
    }

    fn ch(i: u32) -> Channel {
        Channel::new(LinkId(0), InterfaceId(i))
    }

    #[test]
    fn add_and_sub_track_usage() {
        let mut usage = RateUsage::new();
        usage.add(ch(0), 30);
        usage.add(ch(0), 20);
        assert_eq!(usage.used(ch(0)), 50);
        usage.sub(ch(0), 50);
        assert_eq!(usage.used(ch(0)), 0);
        assert!(usage.is_empty());
    }

    #[test]
    fn exceeded_rate_sums_only_overruns() {
        let net = make_network();
        let mut usage = RateUsage::new();
        usage.add(ch(0), 120);
        usage.add(ch(1), 40);
        assert_eq!(usage.exceeded_rate(&net), 20);
        assert_eq!(usage.residual(&net, ch(1)), 10);
        assert_eq!(usage.residual(&net, ch(0)), -20);
    }

    #[test]
    fn most_violated_prefers_largest_overrun() {
        let net = make_network();
        let mut usage = RateUsage::new();
        usage.add(ch(0), 110);
        usage.add(ch(1), 80);
        assert_eq!(usage.most_violated(&net), Some((ch(1), 30)));
    }

    #[test]
    fn overlay_sums_both_tables() {
        let mut base = RateUsage::new();
        let mut extra = RateUsage::new();
        base.add(ch(0), 10);
        extra.add(ch(0), 5);
        extra.add(ch(1), 7);
        let view = Overlay::new(&base, &extra);
        assert_eq!(view.used(ch(0)), 15);
        assert_eq!(view.used(ch(1)), 7);
    }
}
