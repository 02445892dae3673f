//! Spot-price polling and daily cost accrual
//!
//! [`CostAccrual`] owns the poll gate, the last good [`PriceSample`] and the
//! [`CostLedger`]. The monitor asks [`CostAccrual::poll_due`] every cycle,
//! fetches when it says so, and hands the result to
//! [`CostAccrual::handle_fetch`]. Between those calls the machine is idle;
//! nothing here performs I/O.

mod gate;
mod ledger;

pub use gate::IntervalGate;
pub use ledger::{AccrualOutcome, CostLedger, LAST_HOUR_OF_DAY, ORE_TO_KRONA, SENTINEL_HOUR};

use std::time::{Duration, Instant};

use crate::spot_price::{FetchError, PriceSample};

/// Values to publish after an hour change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishSignal {
    pub day_cost: f64,
    pub spot_price: f64,
}

/// Accrual state owned by one monitor
#[derive(Debug, Clone, PartialEq)]
pub struct CostAccrual {
    gate: IntervalGate,
    ledger: CostLedger,
    last_price: Option<PriceSample>,
}

impl CostAccrual {
    /// Fresh state: sentinel ledger, no price yet. With `poll_on_startup` the
    /// first `poll_due` fires immediately, otherwise one interval after `now`.
    pub fn new(poll_interval: Duration, poll_on_startup: bool, now: Instant) -> Self {
        let gate = if poll_on_startup {
            IntervalGate::primed(poll_interval)
        } else {
            IntervalGate::new(poll_interval, now)
        };
        Self::from_parts(gate, CostLedger::new(), None)
    }

    /// Resume from explicit parts
    pub fn from_parts(
        gate: IntervalGate,
        ledger: CostLedger,
        last_price: Option<PriceSample>,
    ) -> Self {
        Self {
            gate,
            ledger,
            last_price,
        }
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    pub fn last_price(&self) -> Option<&PriceSample> {
        self.last_price.as_ref()
    }

    /// Whether a price poll is due; re-arms the gate when it is
    pub fn poll_due(&mut self, now: Instant) -> bool {
        self.gate.has_elapsed(now)
    }

    /// Feed the result of a price poll. Errors are passed back unchanged and
    /// leave the price and the ledger exactly as they were.
    pub fn handle_fetch<F>(
        &mut self,
        fetched: Result<PriceSample, FetchError>,
        energy_kwh: F,
    ) -> Result<AccrualOutcome, FetchError>
    where
        F: FnOnce() -> f64,
    {
        let sample = fetched?;
        self.last_price = Some(sample);
        Ok(self.ledger.record(&sample, energy_kwh))
    }

    /// Current day cost and spot price, once a price is known
    pub fn publish_signal(&self) -> Option<PublishSignal> {
        self.last_price.map(|p| PublishSignal {
            day_cost: self.ledger.day_cost,
            spot_price: p.price_ore_per_kwh,
        })
    }
}
