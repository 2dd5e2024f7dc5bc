//! Quality-factor quantization table scaling (spec.md §4.9, ITU-T T.81
//! Annex K.1/K.2 base tables plus the IJG quality scaling formula).

/// Derive a scaled, clamped quantization table (in zig-zag order, matching
/// `std_table`'s order) for the given quality factor `1..=100`.
///
/// `scale = 5000 / q` for `q < 50`, `200 - 2*q` for `q >= 50`; each entry is
/// `clamp((std * scale + 50) / 100, 1, 255)`.
pub fn scale_quant_table(std_table: &[u16; 64], quality: u8) -> [u16; 64] {
    let q = quality.clamp(1, 100) as i32;
    let scale = if q < 50 { 5000 / q } else { 200 - 2 * q };

    let mut out = [0u16; 64];
    for (o, &base) in out.iter_mut().zip(std_table.iter()) {
        let scaled = (i32::from(base) * scale + 50) / 100;
        *o = scaled.clamp(1, 255) as u16;
    }
    out
}
