// src/acquisition/channel_gate.rs
//! Channel enable policy
//!
//! At most two of the four channels may be enabled. Channels are paired 0/1
//! and 2/3; any enable request evicts the lower member of a saturated pair,
//! and a request for a third channel when each pair holds one evicts the new
//! channel's own partner.

use crate::config::constants::signal::{CHANNEL_COUNT, MAX_ENABLED_CHANNELS};
use crate::error::{ScopeError, ScopeResult};
use tracing::debug;

/// Set of enabled channels, one bit per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const EMPTY: ChannelMask = ChannelMask(0);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, channel: u8) -> bool {
        (channel as usize) < CHANNEL_COUNT && self.0 & (1 << channel) != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Enabled channels in ascending order
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..CHANNEL_COUNT as u8).filter(move |&ch| self.contains(ch))
    }

    fn with(self, channel: u8) -> Self {
        ChannelMask(self.0 | (1 << channel))
    }

    fn without(self, channel: u8) -> Self {
        ChannelMask(self.0 & !(1 << channel))
    }
}

fn check_channel(channel: u8) -> ScopeResult<()> {
    if (channel as usize) < CHANNEL_COUNT {
        Ok(())
    } else {
        Err(ScopeError::InvalidChannel(channel))
    }
}

/// Owner of the channel mask
#[derive(Debug, Clone, Default)]
pub struct ChannelGate {
    mask: ChannelMask,
}

impl ChannelGate {
    /// All channels disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a list of channels, applied in order through [`enable`](Self::enable)
    pub fn with_channels(channels: &[u8]) -> ScopeResult<Self> {
        let mut gate = Self::new();
        for &channel in channels {
            gate.enable(channel)?;
        }
        Ok(gate)
    }

    pub fn mask(&self) -> ChannelMask {
        self.mask
    }

    pub fn is_enabled(&self, channel: u8) -> bool {
        self.mask.contains(channel)
    }

    /// Enable a channel, returning the channel evicted to make room
    pub fn enable(&mut self, channel: u8) -> ScopeResult<Option<u8>> {
        check_channel(channel)?;

        // a saturated pair gives up its lower member even when the request
        // names a channel that is already on
        let evicted = if self.mask.contains(0) && self.mask.contains(1) {
            Some(0)
        } else if self.mask.contains(2) && self.mask.contains(3) {
            Some(2)
        } else if self.mask.contains(channel) || self.mask.count() < MAX_ENABLED_CHANNELS {
            None
        } else {
            Some(channel ^ 1)
        };
        let evicted = evicted.filter(|&victim| victim != channel);

        if let Some(victim) = evicted {
            self.mask = self.mask.without(victim);
            debug!(channel, evicted = victim, "channel evicted to stay within limit");
        }
        self.mask = self.mask.with(channel);

        Ok(evicted)
    }

    pub fn disable(&mut self, channel: u8) -> ScopeResult<()> {
        check_channel(channel)?;
        self.mask = self.mask.without(channel);
        Ok(())
    }

    /// Apply a decoded gate command
    pub fn set(&mut self, channel: u8, enable: bool) -> ScopeResult<Option<u8>> {
        if enable {
            self.enable(channel)
        } else {
            self.disable(channel).map(|_| None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(channels: &[u8]) -> ChannelGate {
        ChannelGate::with_channels(channels).unwrap()
    }

    #[test]
    fn test_enable_up_to_two() {
        let mut g = ChannelGate::new();
        assert_eq!(g.enable(0).unwrap(), None);
        assert_eq!(g.enable(3).unwrap(), None);
        assert_eq!(g.mask().bits(), 0b1001);
    }

    #[test]
    fn test_saturated_low_pair_evicts_zero() {
        let mut g = gate(&[0, 1]);
        assert_eq!(g.enable(2).unwrap(), Some(0));
        assert_eq!(g.mask().iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_saturated_high_pair_evicts_two() {
        let mut g = gate(&[2, 3]);
        assert_eq!(g.enable(1).unwrap(), Some(2));
        assert_eq!(g.mask().iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_split_pairs_evict_partner() {
        let mut g = gate(&[0, 2]);
        assert_eq!(g.enable(1).unwrap(), Some(0));
        assert_eq!(g.mask().iter().collect::<Vec<_>>(), vec![1, 2]);

        let mut g = gate(&[1, 3]);
        assert_eq!(g.enable(2).unwrap(), Some(3));
        assert_eq!(g.mask().iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_reenable_in_saturated_pair_evicts_lower() {
        let mut g = gate(&[0, 1]);
        assert_eq!(g.enable(1).unwrap(), Some(0));
        assert_eq!(g.mask().bits(), 0b0010);

        let mut g = gate(&[2, 3]);
        assert_eq!(g.enable(3).unwrap(), Some(2));
        assert_eq!(g.mask().bits(), 0b1000);
    }

    #[test]
    fn test_reenable_lower_of_saturated_pair_keeps_both() {
        let mut g = gate(&[0, 1]);
        assert_eq!(g.enable(0).unwrap(), None);
        assert_eq!(g.mask().bits(), 0b0011);
    }

    #[test]
    fn test_reenable_without_saturated_pair_is_noop() {
        let mut g = gate(&[1, 2]);
        assert_eq!(g.enable(2).unwrap(), None);
        assert_eq!(g.mask().bits(), 0b0110);

        let mut g = gate(&[3]);
        assert_eq!(g.enable(3).unwrap(), None);
        assert_eq!(g.mask().bits(), 0b1000);
    }

    #[test]
    fn test_disable() {
        let mut g = gate(&[0, 1]);
        g.disable(0).unwrap();
        assert!(!g.is_enabled(0));
        assert!(g.is_enabled(1));
        g.disable(0).unwrap();
        assert_eq!(g.mask().count(), 1);
    }

    #[test]
    fn test_invalid_channel_rejected() {
        let mut g = ChannelGate::new();
        assert!(matches!(g.enable(4), Err(ScopeError::InvalidChannel(4))));
        assert!(g.disable(7).is_err());
        assert!(ChannelGate::with_channels(&[0, 9]).is_err());
        assert!(!g.mask().contains(200));
    }
}
