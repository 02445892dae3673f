use async_trait::async_trait;
use spotwatt::accrual::{AccrualOutcome, CostAccrual, CostLedger, IntervalGate};
use spotwatt::config::{Config, EnergyMode};
use spotwatt::error::{Result, SpotwattError};
use spotwatt::monitor::Monitor;
use spotwatt::sensor::{MeterReading, PhaseReading, PhaseSource};
use spotwatt::spot_price::{FetchError, PriceSample, PriceSource};
use spotwatt::telemetry::TelemetryPublisher;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct FakeMeter {
    readings: VecDeque<Result<MeterReading>>,
}

#[async_trait]
impl PhaseSource for FakeMeter {
    async fn read(&mut self) -> Result<MeterReading> {
        self.readings
            .pop_front()
            .unwrap_or_else(|| Err(SpotwattError::modbus("no more readings")))
    }
}

struct FakePrices {
    responses: Mutex<VecDeque<std::result::Result<PriceSample, FetchError>>>,
    areas: Arc<Mutex<Vec<String>>>,
}

impl FakePrices {
    fn new(responses: Vec<std::result::Result<PriceSample, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            areas: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn fetch(&self, area_key: &str) -> std::result::Result<PriceSample, FetchError> {
        self.areas.lock().unwrap().push(area_key.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::network("no more responses")))
    }
}

#[derive(Default)]
struct RecordingPublisher {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetryPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

fn reading(real_w: f64, energy_kwh: Option<f64>) -> MeterReading {
    let phase = PhaseReading {
        voltage_rms: 230.0,
        current_rms: real_w / 230.0,
        apparent_power: real_w,
        real_power: real_w,
        power_factor: 1.0,
    };
    MeterReading {
        phases: [phase, PhaseReading::default(), PhaseReading::default()],
        energy_kwh,
    }
}

fn sample(hour: f64, price: f64) -> PriceSample {
    PriceSample {
        hour,
        price_ore_per_kwh: price,
    }
}

#[tokio::test]
async fn sample_cycle_publishes_all_power_topics() {
    let meter = FakeMeter {
        readings: VecDeque::from([Ok(reading(1000.0, None))]),
    };
    let mut monitor = Monitor::new(
        meter,
        FakePrices::new(vec![]),
        &Config::default(),
        Instant::now(),
    );
    let publisher = RecordingPublisher::default();

    let agg = monitor
        .sample_cycle(&publisher, Instant::now())
        .await
        .unwrap();
    assert_eq!(agg.total_active, 1000.0);

    let sent = publisher.sent();
    assert_eq!(sent.len(), 15);
    assert!(sent.contains(&(
        "Home-Power/power/Total_active".to_string(),
        "1000.00".to_string()
    )));
    assert!(sent.iter().all(|(_, v)| v.contains('.')));
}

#[tokio::test]
async fn failed_read_skips_publishing() {
    let meter = FakeMeter {
        readings: VecDeque::from([Err(SpotwattError::timeout("Read operation timeout"))]),
    };
    let mut monitor = Monitor::new(
        meter,
        FakePrices::new(vec![]),
        &Config::default(),
        Instant::now(),
    );
    let publisher = RecordingPublisher::default();

    assert!(monitor.sample_cycle(&publisher, Instant::now()).await.is_err());
    assert!(publisher.sent().is_empty());
    assert!(monitor.last_aggregate().is_none());
}

#[tokio::test]
async fn first_price_poll_accrues_and_publishes_once() {
    let mut config = Config::default();
    config.price.area = "SE4".to_string();
    let start = Instant::now();
    let meter = FakeMeter {
        readings: VecDeque::from([
            Ok(reading(0.0, Some(100.0))),
            Ok(reading(0.0, Some(102.0))),
        ]),
    };
    let prices = FakePrices::new(vec![Ok(sample(9.0, 150.0)), Ok(sample(9.0, 150.0))]);
    let mut monitor = Monitor::new(meter, prices, &config, start);
    let publisher = RecordingPublisher::default();

    monitor.sample_cycle(&publisher, start).await.unwrap();
    monitor
        .sample_cycle(&publisher, start + Duration::from_secs(2))
        .await
        .unwrap();
    let before = publisher.sent().len();

    // Primed gate: the first poll happens right away
    let outcome = monitor
        .price_cycle(&publisher, start + Duration::from_secs(2))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, AccrualOutcome::Accrued { hour, .. } if hour == 9.0));
    // Counter rose 2 kWh at 150 öre/kWh
    assert!((monitor.accrual().ledger().day_cost - 3.0).abs() < 1e-9);

    let cost_msgs: Vec<_> = publisher.sent().split_off(before);
    assert_eq!(
        cost_msgs,
        vec![
            ("Home-Power/energy/day_cost".to_string(), "3.00".to_string()),
            (
                "Home-Power/energy/spot_price".to_string(),
                "150.00".to_string()
            ),
        ]
    );

    // Not due again until the interval passes
    assert!(
        monitor
            .price_cycle(&publisher, start + Duration::from_secs(60))
            .await
            .is_none()
    );

    // Same hour on the next poll: nothing published
    let count = publisher.sent().len();
    let outcome = monitor
        .price_cycle(&publisher, start + Duration::from_secs(15 * 60 + 2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, AccrualOutcome::HourUnchanged);
    assert_eq!(publisher.sent().len(), count);
}

#[tokio::test]
async fn price_failure_changes_nothing_and_publishes_nothing() {
    let start = Instant::now();
    let accrual = CostAccrual::from_parts(
        IntervalGate::primed(Duration::from_secs(900)),
        CostLedger::with_state(10.0, 5.5),
        Some(sample(10.0, 80.0)),
    );
    let meter = FakeMeter {
        readings: VecDeque::new(),
    };
    let prices = FakePrices::new(vec![Err(FetchError::decode("bad json"))]);
    let mut monitor = Monitor::with_accrual(meter, prices, &Config::default(), accrual);
    let publisher = RecordingPublisher::default();

    let ledger_before = *monitor.accrual().ledger();
    let res = monitor.price_cycle(&publisher, start).await.unwrap();
    assert!(matches!(res, Err(FetchError::Decode { .. })));
    assert_eq!(*monitor.accrual().ledger(), ledger_before);
    assert_eq!(monitor.accrual().last_price(), Some(&sample(10.0, 80.0)));
    assert!(publisher.sent().is_empty());
}

#[tokio::test]
async fn republish_sends_last_signal() {
    let publisher = RecordingPublisher::default();
    let mut config = Config::default();
    config.energy.mode = EnergyMode::Fixed;
    config.energy.fixed_kwh = 1.0;

    let empty = Monitor::new(
        FakeMeter {
            readings: VecDeque::new(),
        },
        FakePrices::new(vec![]),
        &config,
        Instant::now(),
    );
    assert!(empty.republish_cost(&publisher).await.is_none());
    assert!(publisher.sent().is_empty());

    let mut monitor = Monitor::new(
        FakeMeter {
            readings: VecDeque::new(),
        },
        FakePrices::new(vec![Ok(sample(3.0, 42.0))]),
        &config,
        Instant::now(),
    );
    monitor.price_cycle(&publisher, Instant::now()).await;
    let signal = monitor.republish_cost(&publisher).await.unwrap();
    assert!((signal.day_cost - 0.42).abs() < 1e-12);
    // Two from the accrual, two from the republish
    assert_eq!(publisher.sent().len(), 4);
    assert_eq!(publisher.sent()[2].0, "Home-Power/energy/day_cost");
}

#[tokio::test]
async fn polls_configured_area() {
    let mut config = Config::default();
    config.price.area = "NO2".to_string();
    let prices = FakePrices::new(vec![Ok(sample(1.0, 1.0))]);
    let areas = prices.areas.clone();
    let mut monitor = Monitor::new(
        FakeMeter {
            readings: VecDeque::new(),
        },
        prices,
        &config,
        Instant::now(),
    );
    monitor
        .price_cycle(&RecordingPublisher::default(), Instant::now())
        .await;
    assert_eq!(*areas.lock().unwrap(), vec!["NO2".to_string()]);
    assert_eq!(monitor.accrual().ledger().previous_hour, 1.0);
}
