// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fixed-point numeric codec for 16-bit register words
//!
//! The controller stores every value as a raw 16-bit word. Signed values use
//! two's complement, 32-bit values span two consecutive words with the low
//! word first, and decimals are transported as integers scaled by a
//! per-field factor (×100 for centi-degrees, seconds for durations, ...).
//!
//! | Helper | Purpose |
//! |--------|---------|
//! | [`to_signed`] | interpret a word as `i16` |
//! | [`to_unsigned`] | encode an `i16` back into a word |
//! | [`compose_dint`] | rebuild a 32-bit signed value from two words |
//! | [`compose_udint`] | rebuild a 32-bit unsigned value from two words |
//! | [`scale`] | apply the fixed-point divisor |
//! | [`encode_centi`] | encode a decimal as a ×100 word for writing |
//!
//! No rounding happens here. Callers round when they report values.

/// Divisor for values transported in hundredths (°C × 100, h × 100).
pub const CENTI: f64 = 100.0;

/// Divisor converting a duration in seconds into hours.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Interpret a raw register word as a two's complement signed value.
///
/// Words `>= 32768` map to `word - 65536`.
pub fn to_signed(word: u16) -> i16 {
    word as i16
}

/// Encode a signed value into the raw register word written on the wire.
///
/// Negative values map to `value + 65536`. This is the exact inverse of
/// [`to_signed`] over the whole 16-bit domain.
pub fn to_unsigned(value: i16) -> u16 {
    value as u16
}

/// Compose a 32-bit signed integer from two words, low word first.
///
/// ```
/// use rust_heating_poller::registers::codec::compose_dint;
///
/// assert_eq!(compose_dint(0xFFFF, 0xFFFF), -1);
/// assert_eq!(compose_dint(1, 0), 1);
/// ```
pub fn compose_dint(low: u16, high: u16) -> i32 {
    compose_udint(low, high) as i32
}

/// Compose a 32-bit unsigned integer from two words, low word first.
pub fn compose_udint(low: u16, high: u16) -> u32 {
    ((high as u32) << 16) | low as u32
}

/// Split a 32-bit signed integer into `(low, high)` words.
pub fn split_dint(value: i32) -> (u16, u16) {
    let raw = value as u32;
    ((raw & 0xFFFF) as u16, (raw >> 16) as u16)
}

/// Apply a fixed-point divisor to a decoded integer.
pub fn scale(raw: i32, divisor: f64) -> f64 {
    raw as f64 / divisor
}

/// Decode a signed centi-unit word (°C × 100) into its decimal value.
pub fn centi(word: u16) -> f64 {
    scale(to_signed(word) as i32, CENTI)
}

/// Encode a decimal value as a signed centi-unit word.
///
/// `None` when the value is not finite or does not fit in an `i16` after
/// scaling.
pub fn encode_centi(value: f64) -> Option<u16> {
    let scaled = (value * CENTI).round();
    if !scaled.is_finite() || scaled < i16::MIN as f64 || scaled > i16::MAX as f64 {
        return None;
    }
    Some(to_unsigned(scaled as i16))
}

/// Round a value to two decimals for reporting and persistence.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
