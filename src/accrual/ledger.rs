use crate::spot_price::PriceSample;

/// `previous_hour` before the first accrual; distinct from every real hour
pub const SENTINEL_HOUR: f64 = -1.0;

/// Last hour of the day; an hour change away from it is a day rollover
pub const LAST_HOUR_OF_DAY: f64 = 23.0;

/// Prices are quoted in öre; day cost is kept in kronor
pub const ORE_TO_KRONA: f64 = 0.01;

/// Running day cost, advanced once per observed hour change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostLedger {
    /// Hour of the last accrual, or [`SENTINEL_HOUR`]
    pub previous_hour: f64,
    /// Cost accrued since the last rollover
    pub day_cost: f64,
    /// kWh multiplier used by the last accrual
    pub energy_consumed_kwh: f64,
}

/// What an accepted price sample did to the ledger
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccrualOutcome {
    /// Same hour as last time; nothing changed
    HourUnchanged,
    /// Hour advanced within the day and `added` was charged
    Accrued { hour: f64, added: f64 },
    /// The previous hour was the last of the day; day cost reset to zero and
    /// the crossed hour was not billed
    DayRollover { hour: f64, discarded_day_cost: f64 },
}

impl AccrualOutcome {
    /// Whether day cost and spot price must be published now
    pub fn should_publish(&self) -> bool {
        !matches!(self, AccrualOutcome::HourUnchanged)
    }
}

impl Default for CostLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CostLedger {
    pub fn new() -> Self {
        Self::with_state(SENTINEL_HOUR, 0.0)
    }

    /// Ledger resumed at an arbitrary point
    pub fn with_state(previous_hour: f64, day_cost: f64) -> Self {
        Self {
            previous_hour,
            day_cost,
            energy_consumed_kwh: 0.0,
        }
    }

    #[allow(clippy::float_cmp)]
    pub fn hour_changed(&self, hour: f64) -> bool {
        hour != self.previous_hour
    }

    /// Apply a fetched sample. `energy_kwh` is consulted only on an hour
    /// change and yields the energy used during the hour being closed.
    pub fn record<F>(&mut self, sample: &PriceSample, energy_kwh: F) -> AccrualOutcome
    where
        F: FnOnce() -> f64,
    {
        if !self.hour_changed(sample.hour) {
            return AccrualOutcome::HourUnchanged;
        }

        self.energy_consumed_kwh = energy_kwh();

        // Rollover is keyed on the hour being left, so it fires once per day
        // however far the new hour jumped
        let outcome = if self.previous_hour < LAST_HOUR_OF_DAY {
            let added = ORE_TO_KRONA * sample.price_ore_per_kwh * self.energy_consumed_kwh;
            self.day_cost += added;
            AccrualOutcome::Accrued {
                hour: sample.hour,
                added,
            }
        } else {
            let discarded_day_cost = self.day_cost;
            self.day_cost = 0.0;
            AccrualOutcome::DayRollover {
                hour: sample.hour,
                discarded_day_cost,
            }
        };

        self.previous_hour = sample.hour;
        outcome
    }
}
