use std::collections::HashSet;

use crate::state::{Bid, SlotSnapshot};

/// Aggregates over the visible bids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub bid_count: usize,
    /// Distinct builder keys
    pub builder_count: usize,
    /// Highest visible value in ETH, 0 when nothing is visible
    pub max_value: f64,
}

/// Which bid the display should headline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Headline<'a> {
    /// The delivered (on-chain) bid has arrived
    Delivered(&'a Bid),
    /// Highest bid so far
    Leading(&'a Bid),
}

impl<'a> Headline<'a> {
    pub fn bid(&self) -> &'a Bid {
        match self {
            Headline::Delivered(bid) | Headline::Leading(bid) => bid,
        }
    }
}

/// Bids of one snapshot that have "arrived" by a given elapsed time.
///
/// Pure view: same snapshot and elapsed time always give the same window, and
/// a later elapsed time only ever adds bids.
#[derive(Debug, Clone, Default)]
pub struct VisibilityWindow<'a> {
    bids: Vec<&'a Bid>,
}

impl<'a> VisibilityWindow<'a> {
    /// Bids with `arrival_offset_secs <= elapsed_secs`, in arrival order.
    pub fn at(snapshot: &'a SlotSnapshot, elapsed_secs: f64) -> Self {
        let bids = snapshot
            .bids()
            .iter()
            .filter(|bid| bid.arrival_offset_secs <= elapsed_secs)
            .collect();
        Self { bids }
    }

    /// Nothing visible (e.g. while the slot is still loading).
    pub fn empty() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn bids(&self) -> &[&'a Bid] {
        &self.bids
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn stats(&self) -> WindowStats {
        let builders: HashSet<&str> = self.bids.iter().map(|b| b.builder_key.as_str()).collect();
        let max_value = self.bids.iter().map(|b| b.value).fold(0.0, f64::max);

        WindowStats {
            bid_count: self.bids.len(),
            builder_count: builders.len(),
            max_value,
        }
    }

    /// Highest value visible bid. Ties go to whichever arrived first.
    pub fn leading(&self) -> Option<&'a Bid> {
        let mut best: Option<&'a Bid> = None;
        for bid in self.bids.iter().copied() {
            match best {
                Some(current) if bid.value <= current.value => {}
                _ => best = Some(bid),
            }
        }
        best
    }

    /// The delivered bid, once it has arrived.
    pub fn delivered(&self) -> Option<&'a Bid> {
        self.bids.iter().copied().find(|b| b.is_winning)
    }

    /// Delivered takes precedence over leading whenever it is visible.
    pub fn headline(&self) -> Option<Headline<'a>> {
        if self.is_empty() {
            return None;
        }
        self.delivered()
            .map(Headline::Delivered)
            .or_else(|| self.leading().map(Headline::Leading))
    }
}
