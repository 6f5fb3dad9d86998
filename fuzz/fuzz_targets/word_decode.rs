#![no_main]

use binchain_wire::{Endian, Signedness, Width, WordOp};
use libfuzzer_sys::fuzz_target;

// Fuzz target: WordOp::decode against the standard library conversions.
//
// Every operation decodes a prefix of the input. Widths up to 32 bits must
// match exactly. 64-bit words are summed in f64 before the sign is applied,
// so they are compared only when the unsigned encoding is below 2^53.
fuzz_target!(|data: &[u8]| {
    for op in WordOp::ALL {
        // truncated and empty slices must decode without panicking
        let value = op.decode(&data[..data.len().min(op.size())]);
        assert!(value.is_finite());

        if data.len() < op.size() {
            continue;
        }
        let bytes = &data[..op.size()];
        if op.width() == Width::W64 && !exact_in_f64(op, bytes) {
            continue;
        }
        assert_eq!(op.decode(bytes), reference(op, bytes), "{} of {bytes:02x?}", op.name());
    }
});

fn exact_in_f64(op: WordOp, bytes: &[u8]) -> bool {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    let unsigned = match op.endian() {
        Endian::Little => u64::from_le_bytes(raw),
        Endian::Big => u64::from_be_bytes(raw),
    };
    unsigned < 1 << 53
}

fn reference(op: WordOp, bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    let signed = op.signedness() == Signedness::Signed;
    let little = op.endian() == Endian::Little;

    match op.width() {
        Width::W8 if signed => f64::from(bytes[0] as i8),
        Width::W8 => f64::from(bytes[0]),
        Width::W16 => {
            let raw = [buf[0], buf[1]];
            match (little, signed) {
                (true, true) => f64::from(i16::from_le_bytes(raw)),
                (true, false) => f64::from(u16::from_le_bytes(raw)),
                (false, true) => f64::from(i16::from_be_bytes(raw)),
                (false, false) => f64::from(u16::from_be_bytes(raw)),
            }
        }
        Width::W32 => {
            let raw = [buf[0], buf[1], buf[2], buf[3]];
            match (little, signed) {
                (true, true) => f64::from(i32::from_le_bytes(raw)),
                (true, false) => f64::from(u32::from_le_bytes(raw)),
                (false, true) => f64::from(i32::from_be_bytes(raw)),
                (false, false) => f64::from(u32::from_be_bytes(raw)),
            }
        }
        Width::W64 => match (little, signed) {
            (true, true) => i64::from_le_bytes(buf) as f64,
            (true, false) => u64::from_le_bytes(buf) as f64,
            (false, true) => i64::from_be_bytes(buf) as f64,
            (false, false) => u64::from_be_bytes(buf) as f64,
        },
    }
}
