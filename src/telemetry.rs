//! Telemetry topics and payload formatting
//!
//! Message lists are built by pure functions so the exact wire output can be
//! checked without a broker. [`TelemetryPublisher`] is the seam between the
//! monitor and the MQTT link.

use async_trait::async_trait;

use crate::accrual::PublishSignal;
use crate::error::Result;
use crate::power::AggregatePower;
use crate::sensor::PhaseReading;

const PHASE_NAMES: [&str; 3] = ["Phase1", "Phase2", "Phase3"];
const PF_SUFFIXES: [&str; 3] = ["R", "S", "T"];

/// Sink for retained telemetry messages
#[async_trait]
pub trait TelemetryPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()>;
}

/// Fully qualified topic names under one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub voltage: [String; 3],
    pub current: [String; 3],
    pub apparent_power: [String; 3],
    pub power_total: String,
    pub power_total_active: String,
    pub power_total_reactive: String,
    pub power_factor: [String; 3],
    pub spot_price: String,
    pub day_cost: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        let t = |suffix: &str| format!("{}/{}", prefix, suffix);
        Self {
            voltage: PHASE_NAMES.map(|p| t(&format!("volt/{}", p))),
            current: PHASE_NAMES.map(|p| t(&format!("current/{}", p))),
            apparent_power: PHASE_NAMES.map(|p| t(&format!("power/{}", p))),
            power_total: t("power/Total"),
            power_total_active: t("power/Total_active"),
            power_total_reactive: t("power/Total_reactive"),
            power_factor: PF_SUFFIXES.map(|s| t(&format!("power/Power_factor{}", s))),
            spot_price: t("energy/spot_price"),
            day_cost: t("energy/day_cost"),
        }
    }
}

/// Decimal text with two fractional digits
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

/// Per-cycle power messages in publish order
pub fn power_messages(
    topics: &Topics,
    phases: &[PhaseReading; 3],
    aggregate: &AggregatePower,
) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(15);
    for (topic, phase) in topics.voltage.iter().zip(phases) {
        out.push((topic.clone(), format_value(phase.voltage_rms)));
    }
    for (topic, phase) in topics.current.iter().zip(phases) {
        out.push((topic.clone(), format_value(phase.current_rms)));
    }
    for (topic, phase) in topics.apparent_power.iter().zip(phases) {
        out.push((topic.clone(), format_value(phase.apparent_power)));
    }
    out.push((
        topics.power_total.clone(),
        format_value(aggregate.total_apparent),
    ));
    out.push((
        topics.power_total_active.clone(),
        format_value(aggregate.total_active),
    ));
    out.push((
        topics.power_total_reactive.clone(),
        format_value(aggregate.total_reactive),
    ));
    for (topic, pf) in topics
        .power_factor
        .iter()
        .zip(aggregate.power_factor_percent)
    {
        out.push((topic.clone(), format_value(pf)));
    }
    out
}

/// Day cost and spot price, day cost first
pub fn cost_messages(topics: &Topics, signal: &PublishSignal) -> Vec<(String, String)> {
    vec![
        (topics.day_cost.clone(), format_value(signal.day_cost)),
        (topics.spot_price.clone(), format_value(signal.spot_price)),
    ]
}

/// Publish a batch in order. Every message is attempted; the first error is
/// returned after the batch.
pub async fn publish_all<P>(publisher: &P, messages: &[(String, String)]) -> Result<()>
where
    P: TelemetryPublisher + ?Sized,
{
    let mut first_err = None;
    for (topic, payload) in messages {
        if let Err(e) = publisher.publish(topic, payload).await
            && first_err.is_none()
        {
            first_err = Some(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
