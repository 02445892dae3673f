#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Interpret the input as u16 register stream in big-endian pairs
    let regs: Vec<u16> = data
        .chunks_exact(2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .collect();

    let _ = spotwatt::modbus::decode_32bit_float(&regs);
    let _ = spotwatt::modbus::decode_64bit_float(&regs);
    if let Ok(values) = spotwatt::modbus::decode_float_triplet(&regs) {
        assert!(values.iter().all(|v| v.is_finite()));
    }
});
