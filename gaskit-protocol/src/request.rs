//! Request payload builders
//!
//! Most requests carry no payload. Presets carry `nozzle;value;price`
//! with zero-padded fixed-width numbers.

use core::fmt::Write;

use heapless::String;

/// Payload buffer for preset requests
///
/// Sized for the widest possible formatting of its integer fields; the frame
/// encoder truncates to the wire limit.
pub type PresetPayload = String<32>;

/// Sub-argument of the totalizer request selecting all nozzles
pub const TOTALIZER_ALL_NOZZLES: &[u8] = b"0";

/// Build a `V`/`M` preset payload: `nozzle;value(6 digits);price(4 digits)`
pub fn preset_payload(nozzle: u8, value: u32, price: u32) -> PresetPayload {
    let mut payload = PresetPayload::new();
    // Cannot fail: three integers and two separators fit in 32 bytes
    let _ = write!(payload, "{};{:06};{:04}", nozzle, value, price);
    payload
}
