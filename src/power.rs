//! Power aggregation across the three phases
//!
//! Pure computation, recomputed from scratch every cycle.

use crate::sensor::PhaseReading;

/// Totals and derived per-phase values for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregatePower {
    /// Sum of apparent power (VA)
    pub total_apparent: f64,
    /// Sum of real power (W)
    pub total_active: f64,
    /// Sum of per-phase reactive magnitudes (VAR)
    pub total_reactive: f64,
    /// Per-phase reactive magnitude (VAR)
    pub reactive: [f64; 3],
    /// Per-phase power factor scaled to percent
    pub power_factor_percent: [f64; 3],
}

/// Reactive magnitude `sqrt(S² − P²)`, clamped at zero so a noisy reading
/// with |P| > S yields 0 instead of NaN
pub fn reactive_power(apparent: f64, real: f64) -> f64 {
    (apparent * apparent - real * real).max(0.0).sqrt()
}

/// Aggregate three phase readings
pub fn aggregate(p1: &PhaseReading, p2: &PhaseReading, p3: &PhaseReading) -> AggregatePower {
    let phases = [p1, p2, p3];
    let reactive = phases.map(|p| reactive_power(p.apparent_power, p.real_power));

    AggregatePower {
        total_apparent: phases.iter().map(|p| p.apparent_power).sum(),
        total_active: phases.iter().map(|p| p.real_power).sum(),
        total_reactive: reactive.iter().sum(),
        reactive,
        power_factor_percent: phases.map(|p| p.power_factor * 100.0),
    }
}

/// Convenience wrapper for a phase array
pub fn aggregate_phases(phases: &[PhaseReading; 3]) -> AggregatePower {
    aggregate(&phases[0], &phases[1], &phases[2])
}
