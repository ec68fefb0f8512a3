//! Bounded multi-commodity storage attached to a station.

use serde::{Deserialize, Serialize};

use crate::{CommodityKind, CommodityMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservoir {
    /// 0 means no storage: every credit spills in full.
    pub capacity: u64,
    pub contents: CommodityMap,
}

impl Reservoir {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            contents: CommodityMap::new(),
        }
    }

    pub fn stored_total(&self) -> u64 {
        self.contents.values().sum()
    }

    pub fn stored(&self, kind: &CommodityKind) -> u64 {
        self.contents.get(kind).copied().unwrap_or(0)
    }

    /// Units that can still be credited before the reservoir is full.
    pub fn headroom(&self) -> u64 {
        self.capacity.saturating_sub(self.stored_total())
    }

    /// Store as much of `amount` as fits and return the unstored remainder.
    ///
    /// Negative amounts are rejected as a no-op (nothing stored, nothing owed).
    pub fn credit(&mut self, kind: &CommodityKind, amount: i64) -> u64 {
        let Ok(amount) = u64::try_from(amount) else {
            tracing::warn!(%kind, amount, "rejected negative reservoir credit");
            return 0;
        };
        self.credit_units(kind, amount)
    }

    /// Unsigned form of `credit`; the full range of `u64` is accounted for.
    pub fn credit_units(&mut self, kind: &CommodityKind, amount: u64) -> u64 {
        let stored = amount.min(self.headroom());
        if stored > 0 {
            *self.contents.entry(kind.clone()).or_insert(0) += stored;
        }
        amount - stored
    }

    /// Take the full contents, leaving the reservoir empty.
    pub fn drain_all(&mut self) -> CommodityMap {
        std::mem::take(&mut self.contents)
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.stored_total() >= self.capacity
    }

    /// Stored fraction of capacity in 0..=1; 0 when the reservoir has no capacity.
    #[allow(clippy::cast_possible_truncation)]
    pub fn fill_fraction(&self) -> f32 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.stored_total() as f64 / self.capacity as f64).min(1.0) as f32
    }
}
