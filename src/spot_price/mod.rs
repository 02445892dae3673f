//! Spot-price retrieval for a configured grid area
//!
//! One HTTP GET per poll, JSON decoded into a [`PriceSample`]. Retry cadence
//! belongs to the caller; failures come back as a typed [`FetchError`].

pub mod client;
pub mod types;

pub use client::{PriceSource, SpotPriceClient};
pub use types::{FetchError, PriceSample, parse_price_payload};
