use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;

use crate::config::PriceConfig;
use crate::error::Result;
use crate::logging::{LogContext, get_logger_with_context};

use super::types::{FetchError, PriceSample, parse_price_payload};

/// Anything that can produce the current spot price for an area
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, area_key: &str) -> std::result::Result<PriceSample, FetchError>;
}

/// HTTP client for the spot-price endpoint
pub struct SpotPriceClient {
    http: reqwest::Client,
    endpoint: String,
    hour_field: String,
    price_field: String,
    logger: crate::logging::StructuredLogger,
}

impl SpotPriceClient {
    /// Build a client with the configured endpoint, field names and timeout
    pub fn new(cfg: &PriceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;
        let logger = get_logger_with_context(
            LogContext::new("price").with_field("endpoint", cfg.endpoint.clone()),
        );
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            hour_field: cfg.hour_field.clone(),
            price_field: cfg.price_field.clone(),
            logger,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PriceSource for SpotPriceClient {
    async fn fetch(&self, area_key: &str) -> std::result::Result<PriceSample, FetchError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .header(ACCEPT, "application/json")
            .header(
                USER_AGENT,
                concat!("spotwatt/", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::network(format!(
                "price API returned HTTP {}",
                status
            )));
        }

        let body = resp.text().await?;
        self.logger
            .trace(&format!("Price payload ({} bytes): {}", body.len(), body));

        let sample = parse_price_payload(&body, area_key, &self.hour_field, &self.price_field)?;
        self.logger.debug(&format!(
            "Spot price for {} hour {}: {:.2} öre/kWh",
            area_key, sample.hour, sample.price_ore_per_kwh
        ));
        Ok(sample)
    }
}
