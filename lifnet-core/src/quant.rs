//! Q0.7 fixed-point helpers (signed 8-bit, 7 fractional bits) for comparing
//! a float network with its microcontroller-style quantized counterpart.

pub type Q07 = i8;
pub const FRACTIONAL_BITS: u32 = 7;
pub const SCALE: f64 = (1u32 << FRACTIONAL_BITS) as f64;
pub const MAX_FLOAT: f64 = i8::MAX as f64 / SCALE;
pub const MIN_FLOAT: f64 = i8::MIN as f64 / SCALE;

/// Saturating, round-half-away-from-zero conversion. NaN maps to 0.
#[inline]
pub fn quantize_q07(x: f64) -> Q07 {
    if x.is_nan() {
        return 0;
    }
    let scaled = (x.clamp(MIN_FLOAT, MAX_FLOAT) * SCALE).round();
    scaled.clamp(i8::MIN as f64, i8::MAX as f64) as Q07
}

#[inline]
pub fn dequantize_q07(q: Q07) -> f64 {
    q as f64 / SCALE
}

/// Nearest representable Q0.7 value, back in float.
#[inline]
pub fn snap_q07(x: f64) -> f64 {
    dequantize_q07(quantize_q07(x))
}
