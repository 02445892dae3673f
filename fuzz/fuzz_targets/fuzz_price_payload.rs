#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data)
        && let Ok(sample) =
            spotwatt::spot_price::parse_price_payload(body, "SE3", "hour", "price_sek")
    {
        assert!((0.0..=23.0).contains(&sample.hour));
        assert!(sample.price_ore_per_kwh.is_finite());
    }
});
