//! Worker-claimable task that drains a station's reservoir.
//!
//! A task holds the station's emptying lock from `claim` until it finishes or
//! is abandoned. It has no identity of its own and is never persisted.

use crate::{CommodityMap, Environment, SiteConfig, Station, StationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyingTask {
    pub station_id: StationId,
    pub duration_ticks: u64,
    pub elapsed_ticks: u64,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyingStep {
    Working,
    Finished(CommodityMap),
}

impl EmptyingTask {
    /// Take the station's emptying lock. `None` if another task holds it.
    pub fn claim(station: &mut Station, duration_ticks: u64, forced: bool) -> Option<Self> {
        if !station.begin_emptying() {
            return None;
        }
        Some(Self {
            station_id: station.id.clone(),
            duration_ticks,
            elapsed_ticks: 0,
            forced,
        })
    }

    /// Fresh task for a station restored with its lock already held.
    pub(crate) fn rearm(station: &Station, duration_ticks: u64) -> Self {
        Self {
            station_id: station.id.clone(),
            duration_ticks,
            elapsed_ticks: 0,
            forced: false,
        }
    }

    pub fn remaining_ticks(&self) -> u64 {
        self.duration_ticks.saturating_sub(self.elapsed_ticks)
    }

    /// One tick of work. Drains the reservoir once the duration has elapsed.
    pub fn advance(
        &mut self,
        station: &mut Station,
        env: &mut impl Environment,
        config: &SiteConfig,
        tick: u64,
    ) -> EmptyingStep {
        self.elapsed_ticks = (self.elapsed_ticks + 1).min(self.duration_ticks);
        if self.elapsed_ticks < self.duration_ticks {
            return EmptyingStep::Working;
        }
        EmptyingStep::Finished(station.finish_emptying(env, config, tick))
    }

    /// Give up the task and release the lock; the reservoir is left as is.
    pub fn abandon(self, station: &mut Station) {
        station.cancel_emptying();
    }
}
