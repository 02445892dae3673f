//! MQTT link to the broker
//!
//! [`connect`] splits the link in two. [`MqttDriver`] owns the rumqttc event
//! loop and the connection state machine and runs in its own task, reporting
//! [`LinkEvent`]s over a channel. [`MqttPublisher`] is the cheap, cloneable
//! handle the monitor publishes through; it only looks at a shared connected
//! flag, so a slow monitoring cycle never stalls the connect handshake.

mod connection;

pub use connection::{ConnectionMachine, ConnectionState, FixedDelay, RetryPolicy};

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::MqttConfig;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::telemetry::TelemetryPublisher;

const REQUEST_CAPACITY: usize = 64;

/// Build client options from configuration
pub fn build_options(cfg: &MqttConfig) -> MqttOptions {
    let client_id = format!("{}-{}", cfg.client_id, Uuid::new_v4().simple());
    let mut opts = MqttOptions::new(client_id, cfg.host.clone(), cfg.port);
    opts.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs));
    if let (Some(u), Some(p)) = (&cfg.username, &cfg.password) {
        opts.set_credentials(u.clone(), p.clone());
    }
    if cfg.port == 8883 {
        opts.set_transport(Transport::tls_with_default_config());
    }
    opts
}

/// Create the publisher handle and its driver with a fixed retry delay from
/// configuration. No network activity happens until the driver is polled.
pub fn connect(cfg: &MqttConfig) -> (MqttPublisher, MqttDriver) {
    let policy = FixedDelay::new(Duration::from_secs(cfg.retry_delay_seconds));
    connect_with_policy(cfg, Box::new(policy))
}

pub fn connect_with_policy(
    cfg: &MqttConfig,
    policy: Box<dyn RetryPolicy>,
) -> (MqttPublisher, MqttDriver) {
    let (client, eventloop) = AsyncClient::new(build_options(cfg), REQUEST_CAPACITY);
    let connected = Arc::new(AtomicBool::new(false));
    let logger = get_logger_with_context(
        LogContext::new("mqtt").with_field("broker", format!("{}:{}", cfg.host, cfg.port)),
    );

    let publisher = MqttPublisher {
        client: client.clone(),
        connected: Arc::clone(&connected),
        logger: logger.clone(),
    };
    let driver = MqttDriver {
        client,
        eventloop,
        machine: ConnectionMachine::new(policy),
        connected,
        control_topic: cfg.control_topic.clone(),
        reconnect_at: None,
        gave_up: false,
        logger,
    };
    (publisher, driver)
}

/// What happened on the link since the last call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Broker acknowledged a (re)connect; control topic subscribed
    Connected,
    /// Message on the control topic
    Control { topic: String, payload: String },
    /// Connection lost or attempt failed; a retry is scheduled
    Disconnected,
    /// Anything else (pings, acks, outgoing traffic)
    Idle,
}

/// Publishing side of the link
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    logger: StructuredLogger,
}

impl MqttPublisher {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Ask the broker for a clean disconnect; best effort
    pub fn disconnect(&self) {
        if self.is_connected()
            && let Err(e) = self.client.try_disconnect()
        {
            self.logger.debug(&format!("Disconnect request failed: {}", e));
        }
    }
}

#[async_trait]
impl TelemetryPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        if !self.is_connected() {
            self.logger
                .debug(&format!("Not connected, skipping publish to {}", topic));
            return Ok(());
        }
        self.client
            .try_publish(topic, QoS::AtMostOnce, true, payload.as_bytes().to_vec())?;
        Ok(())
    }
}

/// Event-loop side of the link
pub struct MqttDriver {
    client: AsyncClient,
    eventloop: EventLoop,
    machine: ConnectionMachine,
    connected: Arc<AtomicBool>,
    control_topic: String,
    reconnect_at: Option<Instant>,
    gave_up: bool,
    logger: StructuredLogger,
}

impl MqttDriver {
    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Drive the link, forwarding everything but [`LinkEvent::Idle`] to
    /// `events`. Returns once the receiver is gone.
    pub async fn run(mut self, events: mpsc::Sender<LinkEvent>) {
        loop {
            let event = self.next_event().await;
            if event == LinkEvent::Idle {
                continue;
            }
            if events.send(event).await.is_err() {
                self.logger.debug("Event receiver closed, stopping MQTT driver");
                return;
            }
        }
    }

    /// Drive the connection until something happens. A pending reconnect
    /// deadline survives the future being dropped mid-wait.
    pub async fn next_event(&mut self) -> LinkEvent {
        if self.gave_up {
            return std::future::pending().await;
        }
        if let Some(at) = self.reconnect_at {
            tokio::time::sleep_until(at).await;
            self.reconnect_at = None;
        }
        if self.machine.state() == ConnectionState::Disconnected {
            self.logger.debug("Connecting to broker");
            self.machine.on_connecting();
        }

        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                self.machine.on_connected();
                self.connected.store(true, Ordering::Release);
                self.logger.info("Connected to broker");
                if let Err(e) = self
                    .client
                    .try_subscribe(self.control_topic.clone(), QoS::AtMostOnce)
                {
                    self.logger.error(&format!(
                        "Subscribe to {} failed: {}",
                        self.control_topic, e
                    ));
                }
                LinkEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(p))) if p.topic == self.control_topic => {
                let payload = String::from_utf8_lossy(&p.payload).into_owned();
                self.logger
                    .info(&format!("Message arrived [{}] {}", p.topic, payload));
                LinkEvent::Control {
                    topic: p.topic,
                    payload,
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                self.logger.warn("Broker sent disconnect");
                self.schedule_retry();
                LinkEvent::Disconnected
            }
            Ok(_) => LinkEvent::Idle,
            Err(e) => {
                self.logger.warn(&format!("MQTT connection error: {}", e));
                self.schedule_retry();
                LinkEvent::Disconnected
            }
        }
    }

    fn schedule_retry(&mut self) {
        self.connected.store(false, Ordering::Release);
        match self.machine.on_error() {
            Some(delay) => {
                self.logger.info(&format!(
                    "Retrying in {} s (attempt {})",
                    delay.as_secs_f64(),
                    self.machine.failed_attempts()
                ));
                self.reconnect_at = Some(Instant::now() + delay);
            }
            None => {
                self.logger.error("Retry policy gave up; MQTT link stays down");
                self.gave_up = true;
            }
        }
    }
}
