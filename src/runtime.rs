//! Process main loop

use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};

use crate::config::Config;
use crate::error::Result;
use crate::logging::get_logger;
use crate::modbus::ModbusClient;
use crate::monitor::Monitor;
use crate::mqtt::{self, LinkEvent};
use crate::sensor::ModbusMeter;
use crate::spot_price::SpotPriceClient;

const EVENT_CAPACITY: usize = 16;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Build the meter, price client and MQTT link from `config` and run until
/// Ctrl-C or SIGTERM
pub async fn run(config: Config) -> Result<()> {
    let logger = get_logger("runtime");

    let meter = ModbusMeter::new(
        ModbusClient::new(&config.meter),
        config.registers.clone(),
        config.phase_calibrations(),
    );
    let prices = SpotPriceClient::new(&config.price)?;
    logger.info(&format!(
        "Meter {}:{} slave {}, prices from {} area {}",
        config.meter.ip,
        config.meter.port,
        config.meter.slave_id,
        prices.endpoint(),
        config.price.area
    ));

    let mut monitor = Monitor::new(meter, prices, &config, Instant::now());

    // The event loop gets its own task so a slow cycle never stalls the
    // connect handshake or keep-alives
    let (publisher, driver) = mqtt::connect(&config.mqtt);
    let (events_tx, mut events) = mpsc::channel(EVENT_CAPACITY);
    let mut mqtt_task = tokio::spawn(driver.run(events_tx));

    let mut ticker = interval(Duration::from_millis(config.sample_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                // Failures are logged inside; the next tick retries
                let _ = monitor.sample_cycle(&publisher, now).await;
                let _ = monitor.price_cycle(&publisher, now).await;
            }
            Some(event) = events.recv() => {
                if event == LinkEvent::Connected {
                    monitor.republish_cost(&publisher).await;
                }
            }
            res = &mut shutdown => {
                if let Err(e) = res {
                    logger.error(&format!("Signal handler failed: {}", e));
                }
                logger.info("Shutdown signal received");
                break;
            }
        }
    }

    publisher.disconnect();
    drop(events);
    if timeout(SHUTDOWN_GRACE, &mut mqtt_task).await.is_err() {
        mqtt_task.abort();
    }
    logger.info("Stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
