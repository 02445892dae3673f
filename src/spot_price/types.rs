use serde_json::Value;
use thiserror::Error;

/// Price for one hour of the day, as reported by the price API
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    /// Hour of day (0-23) the price applies to
    pub hour: f64,
    /// Spot price in öre per kWh; may be negative
    pub price_ore_per_kwh: f64,
}

/// Why a price poll produced no sample
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure, timeout, or non-success HTTP status
    #[error("Network error: {message}")]
    Network { message: String },

    /// The response has no entries for the requested area
    #[error("No data found for area {area}")]
    NoDataForArea { area: String },

    /// The response is not valid JSON or an entry lacks a numeric field
    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn network<S: Into<String>>(message: S) -> Self {
        FetchError::Network {
            message: message.into(),
        }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        FetchError::Decode {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::network(format!("request timed out: {}", err))
        } else {
            FetchError::network(err.to_string())
        }
    }
}

const MAX_HOUR: f64 = 23.0;

/// Numbers may arrive as JSON numbers or as numeric strings
fn numeric_field(entry: &Value, key: &str) -> Result<f64, FetchError> {
    let value = entry
        .get(key)
        .ok_or_else(|| FetchError::decode(format!("missing field '{}'", key)))?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|v| v.is_finite())
        .ok_or_else(|| FetchError::decode(format!("field '{}' is not a number: {}", key, value)))
}

/// Decode a price payload shaped `{ "<AREA>": [ { "<hour>": .., "<price>": .. }, .. ] }`.
/// Only the first entry of the area's array is read.
pub fn parse_price_payload(
    body: &str,
    area: &str,
    hour_field: &str,
    price_field: &str,
) -> Result<PriceSample, FetchError> {
    let doc: Value =
        serde_json::from_str(body).map_err(|e| FetchError::decode(e.to_string()))?;

    let first = doc
        .get(area)
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .ok_or_else(|| FetchError::NoDataForArea {
            area: area.to_string(),
        })?;

    let hour = numeric_field(first, hour_field)?;
    if !(0.0..=MAX_HOUR).contains(&hour) {
        return Err(FetchError::decode(format!(
            "field '{}' out of range 0-23: {}",
            hour_field, hour
        )));
    }

    Ok(PriceSample {
        hour,
        price_ore_per_kwh: numeric_field(first, price_field)?,
    })
}
