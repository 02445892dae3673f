//! Per-hour energy used as the accrual multiplier
//!
//! In meter mode the hour's energy is the rise of the meter's cumulative
//! counter since the last hour change. When no counter is available the
//! tracker falls back to integrating total real power over the sampled
//! cycles. Fixed mode returns a constant per accrual.

use std::time::{Duration, Instant};

use crate::config::{EnergyConfig, EnergyMode};

/// Longest gap between samples that is still integrated
pub const MAX_INTEGRATION_GAP: Duration = Duration::from_secs(300);

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone)]
pub struct EnergyTracker {
    mode: EnergyMode,
    fixed_kwh: f64,
    /// Counter value at the last hour change (or first sighting)
    counter_baseline: Option<f64>,
    /// Latest counter value
    counter_latest: Option<f64>,
    counter_reset: bool,
    /// Energy integrated from real power since the last hour change
    integrated_kwh: f64,
    /// Previous sample for trapezoidal integration
    last_sample: Option<(Instant, f64)>,
}

impl EnergyTracker {
    pub fn new(config: &EnergyConfig) -> Self {
        Self {
            mode: config.mode,
            fixed_kwh: config.fixed_kwh,
            counter_baseline: None,
            counter_latest: None,
            counter_reset: false,
            integrated_kwh: 0.0,
            last_sample: None,
        }
    }

    /// Record one cycle's total real power (W) and, when available, the
    /// meter's cumulative counter (kWh)
    pub fn record(&mut self, now: Instant, total_active_w: f64, counter_kwh: Option<f64>) {
        if total_active_w.is_finite() {
            if let Some((then, prev_w)) = self.last_sample {
                let dt = now.saturating_duration_since(then);
                if dt <= MAX_INTEGRATION_GAP {
                    let avg_w = (prev_w + total_active_w) / 2.0;
                    self.integrated_kwh += avg_w * dt.as_secs_f64() / SECONDS_PER_HOUR / 1000.0;
                }
            }
            self.last_sample = Some((now, total_active_w));
        }

        if let Some(counter) = counter_kwh.filter(|c| c.is_finite()) {
            // Counter went backwards: meter reset or replaced. Integration
            // covers the rest of this hour.
            if self.counter_latest.is_some_and(|latest| counter < latest) {
                self.counter_reset = true;
            }
            if self.counter_baseline.is_none() {
                self.counter_baseline = Some(counter);
            }
            self.counter_latest = Some(counter);
        }
    }

    fn counter_delta(&self) -> Option<f64> {
        if self.counter_reset {
            return None;
        }
        match (self.counter_baseline, self.counter_latest) {
            (Some(base), Some(latest)) if latest >= base => Some(latest - base),
            _ => None,
        }
    }

    /// Energy attributed to the hour in progress
    pub fn current_hour_kwh(&self) -> f64 {
        match self.mode {
            EnergyMode::Fixed => self.fixed_kwh,
            EnergyMode::Meter => self.counter_delta().unwrap_or(self.integrated_kwh),
        }
    }

    /// Close the current hour: return its energy and start a new one
    pub fn take_hour(&mut self) -> f64 {
        let kwh = self.current_hour_kwh();
        self.integrated_kwh = 0.0;
        self.counter_baseline = self.counter_latest;
        self.counter_reset = false;
        kwh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter_tracker() -> EnergyTracker {
        EnergyTracker::new(&EnergyConfig::default())
    }

    #[test]
    fn test_integrates_constant_power() {
        let mut t = meter_tracker();
        let start = Instant::now();
        // 3 kW for 60 s in 2 s steps = 0.05 kWh
        for i in 0..=30 {
            t.record(start + Duration::from_secs(i * 2), 3000.0, None);
        }
        assert!((t.current_hour_kwh() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_counter_preferred_over_integration() {
        let mut t = meter_tracker();
        let start = Instant::now();
        t.record(start, 1000.0, Some(100.0));
        t.record(start + Duration::from_secs(2), 1000.0, Some(100.4));
        assert!((t.current_hour_kwh() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_take_hour_rebases() {
        let mut t = meter_tracker();
        let start = Instant::now();
        t.record(start, 0.0, Some(10.0));
        t.record(start + Duration::from_secs(2), 0.0, Some(12.0));
        assert!((t.take_hour() - 2.0).abs() < 1e-9);
        assert_eq!(t.current_hour_kwh(), 0.0);
        t.record(start + Duration::from_secs(4), 0.0, Some(12.5));
        assert!((t.take_hour() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_counter_reset_falls_back_to_integration() {
        let mut t = meter_tracker();
        let start = Instant::now();
        t.record(start, 3600.0, Some(500.0));
        t.record(start + Duration::from_secs(1), 3600.0, Some(0.1));
        // 3.6 kW for 1 s = 0.001 kWh
        assert!((t.take_hour() - 0.001).abs() < 1e-9);
        t.record(start + Duration::from_secs(2), 0.0, Some(0.3));
        assert!((t.current_hour_kwh() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_gap_is_not_integrated() {
        let mut t = meter_tracker();
        let start = Instant::now();
        t.record(start, 2000.0, None);
        t.record(start + Duration::from_secs(3600), 2000.0, None);
        assert_eq!(t.current_hour_kwh(), 0.0);
    }

    #[test]
    fn test_fixed_mode() {
        let mut t = EnergyTracker::new(&EnergyConfig {
            mode: EnergyMode::Fixed,
            fixed_kwh: 2.0,
        });
        t.record(Instant::now(), 5000.0, Some(1.0));
        assert_eq!(t.take_hour(), 2.0);
        assert_eq!(t.take_hour(), 2.0);
    }
}
