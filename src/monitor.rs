//! One monitoring pipeline: sensor → aggregate → energy → publish, plus the
//! gated price poll that drives cost accrual.

use std::time::{Duration, Instant};

use crate::accrual::{AccrualOutcome, CostAccrual, PublishSignal};
use crate::config::Config;
use crate::energy::EnergyTracker;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::power::{AggregatePower, aggregate_phases};
use crate::sensor::PhaseSource;
use crate::spot_price::{FetchError, PriceSource};
use crate::telemetry::{TelemetryPublisher, Topics, cost_messages, power_messages, publish_all};

pub struct Monitor<S, P> {
    sensor: S,
    prices: P,
    area: String,
    accrual: CostAccrual,
    energy: EnergyTracker,
    topics: Topics,
    last_aggregate: Option<AggregatePower>,
    logger: StructuredLogger,
}

impl<S: PhaseSource, P: PriceSource> Monitor<S, P> {
    pub fn new(sensor: S, prices: P, config: &Config, now: Instant) -> Self {
        let poll_interval = Duration::from_secs(config.price.poll_interval_minutes * 60);
        Self::with_accrual(
            sensor,
            prices,
            config,
            CostAccrual::new(poll_interval, config.price.poll_on_startup, now),
        )
    }

    /// Build around an existing accrual state
    pub fn with_accrual(sensor: S, prices: P, config: &Config, accrual: CostAccrual) -> Self {
        let logger = get_logger_with_context(LogContext::new("monitor").with_area(&config.price.area));
        Self {
            sensor,
            prices,
            area: config.price.area.clone(),
            accrual,
            energy: EnergyTracker::new(&config.energy),
            topics: Topics::new(&config.mqtt.topic_prefix),
            last_aggregate: None,
            logger,
        }
    }

    pub fn accrual(&self) -> &CostAccrual {
        &self.accrual
    }

    pub fn last_aggregate(&self) -> Option<&AggregatePower> {
        self.last_aggregate.as_ref()
    }

    /// Read the sensor, aggregate, track energy and publish power telemetry.
    /// A failed read skips publishing for this cycle and is returned.
    pub async fn sample_cycle<T>(&mut self, publisher: &T, now: Instant) -> Result<AggregatePower>
    where
        T: TelemetryPublisher + ?Sized,
    {
        let reading = match self.sensor.read().await {
            Ok(r) => r,
            Err(e) => {
                self.logger.warn(&format!("Sensor read failed: {}", e));
                return Err(e);
            }
        };

        let aggregate = aggregate_phases(&reading.phases);
        self.energy
            .record(now, aggregate.total_active, reading.energy_kwh);
        self.last_aggregate = Some(aggregate);

        self.logger.trace(&format!(
            "Total {:.2} VA, active {:.2} W, reactive {:.2} VAR",
            aggregate.total_apparent, aggregate.total_active, aggregate.total_reactive
        ));

        let messages = power_messages(&self.topics, &reading.phases, &aggregate);
        if let Err(e) = publish_all(publisher, &messages).await {
            self.logger
                .warn(&format!("Publishing power telemetry failed: {}", e));
        }
        Ok(aggregate)
    }

    /// Poll the spot price when the gate says so and accrue the day cost.
    /// Returns `None` when no poll was due.
    pub async fn price_cycle<T>(
        &mut self,
        publisher: &T,
        now: Instant,
    ) -> Option<std::result::Result<AccrualOutcome, FetchError>>
    where
        T: TelemetryPublisher + ?Sized,
    {
        if !self.accrual.poll_due(now) {
            return None;
        }

        let fetched = self.prices.fetch(&self.area).await;
        let energy = &mut self.energy;
        let result = self.accrual.handle_fetch(fetched, || energy.take_hour());

        match &result {
            Ok(AccrualOutcome::HourUnchanged) => {
                self.logger.debug("Spot price polled, hour unchanged");
            }
            Ok(AccrualOutcome::Accrued { hour, added }) => {
                self.logger.info(&format!(
                    "Hour {} started, added {:.4} kr, day cost {:.2} kr",
                    hour,
                    added,
                    self.accrual.ledger().day_cost
                ));
            }
            Ok(AccrualOutcome::DayRollover {
                hour,
                discarded_day_cost,
            }) => {
                self.logger.info(&format!(
                    "New day at hour {}, day cost reset (was {:.2} kr)",
                    hour, discarded_day_cost
                ));
            }
            Err(e) => {
                self.logger.warn(&format!("Spot price fetch failed: {}", e));
            }
        }

        if let Ok(outcome) = &result
            && outcome.should_publish()
        {
            self.republish_cost(publisher).await;
        }
        Some(result)
    }

    /// Send the current day cost and spot price, if a price is known
    pub async fn republish_cost<T>(&self, publisher: &T) -> Option<PublishSignal>
    where
        T: TelemetryPublisher + ?Sized,
    {
        let signal = self.accrual.publish_signal()?;
        if let Err(e) = publish_all(publisher, &cost_messages(&self.topics, &signal)).await {
            self.logger
                .warn(&format!("Publishing cost telemetry failed: {}", e));
        }
        Some(signal)
    }
}
