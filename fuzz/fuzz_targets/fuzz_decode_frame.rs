#![no_main]
use axpert_gateway::axpert::{codec, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw bytes as they would come off the device
    let _ = codec::decode_response(data);

    // Payload parsers see arbitrary ASCII once the frame checks out
    let payload = String::from_utf8_lossy(data);
    let _ = parse::parse_serial_number(&payload);
    let _ = parse::parse_general_status(&payload);
    let _ = parse::parse_parallel_info(&payload);
    let _ = parse::parse_rating_info(&payload);
    let _ = parse::parse_warnings(&payload);
    let _ = parse::parse_device_mode(&payload);
    let _ = parse::parse_output_mode(&payload);
});
