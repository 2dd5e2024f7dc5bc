//! Fixed-point 8x8 inverse and forward DCT (spec.md §4.8).
//!
//! `idct_int` is a fixed-point scaled-integer inverse DCT in the style of
//! `stbi_image.h`'s AAN-derived fast IDCT: a separable column pass followed
//! by a row pass, with the final shift folding in the level shift (+128)
//! and clamp to `0..=255` so its output is directly usable as pixel samples.
//!
//! No forward DCT of this kind exists anywhere nearby to port, so
//! `fdct_int` instead evaluates the direct separable DCT-II definition
//! against a lazily-built fixed-point cosine basis table -- slower than an
//! AAN-style butterfly, but its correctness follows straight from the
//! textbook formula rather than from a chain of unverified constants.
use std::sync::OnceLock;

const SCALE_BITS: i32 = 512 + 65536 + (128 << 17);

#[inline]
const fn fsh(x: i32) -> i32 {
    x * 4096
}

#[inline]
fn f2f(x: f32) -> i32 {
    (x * 4096.0 + 0.5) as i32
}

#[inline]
fn clamp_u8(a: i32) -> i16 {
    a.clamp(0, 255) as i16
}

/// Inverse DCT of a dequantized, natural-order 8x8 block, with the level
/// shift (+128) and clamp to `0..=255` applied. Ported from the
/// `stbi_image.h`-derived fixed-point IDCT: even/odd butterfly per column,
/// then per row.
pub fn idct_int(vector: &mut [i32; 64]) -> [i16; 64] {
    let mut x = [0i32; 64];

    // Column pass.
    for ptr in 0..8 {
        let p2 = vector[ptr + 16];
        let p3 = vector[ptr + 48];
        let p1 = (p2 + p3) * 2217;
        let t2 = p1 + p3 * -7567;
        let t3 = p1 + p2 * 3135;

        let p2 = vector[ptr];
        let p3 = vector[32 + ptr];
        let t0 = fsh(p2 + p3);
        let t1 = fsh(p2 - p3);

        let x0 = t0 + t3 + 512;
        let x3 = t0 - t3 + 512;
        let x1 = t1 + t2 + 512;
        let x2 = t1 - t2 + 512;

        let mut t0 = vector[ptr + 56];
        let mut t1 = vector[ptr + 40];
        let mut t2 = vector[ptr + 24];
        let mut t3 = vector[ptr + 8];

        let p3 = t0 + t2;
        let p4 = t1 + t3;
        let p1 = t0 + t3;
        let p2 = t1 + t2;
        let p5 = (p3 + p4) * 4816;

        t0 *= 1223;
        t1 *= 8410;
        t2 *= 12586;
        t3 *= 6149;

        let p1 = p5 + p1 * -3685;
        let p2 = p5 + p2 * -10497;
        let p3 = p3 * -8034;
        let p4 = p4 * -1597;

        t3 += p1 + p4;
        t2 += p2 + p3;
        t1 += p2 + p4;
        t0 += p1 + p3;

        vector[ptr] = (x0 + t3) >> 10;
        vector[ptr + 8] = (x1 + t2) >> 10;
        vector[ptr + 16] = (x2 + t1) >> 10;
        vector[ptr + 24] = (x3 + t0) >> 10;
        vector[ptr + 32] = (x3 - t0) >> 10;
        vector[ptr + 40] = (x2 - t1) >> 10;
        vector[ptr + 48] = (x1 - t2) >> 10;
        vector[ptr + 56] = (x0 - t3) >> 10;
    }

    // Row pass.
    let mut i = 0;
    while i < 64 {
        let p2 = vector[i + 2];
        let p3 = vector[i + 6];
        let p1 = (p2 + p3) * 2217;
        let t2 = p1 + p3 * -7567;
        let t3 = p1 + p2 * 3135;

        let p2 = vector[i];
        let p3 = vector[i + 4];
        let t0 = fsh(p2 + p3);
        let t1 = fsh(p2 - p3);

        let x0 = t0 + t3 + SCALE_BITS;
        let x3 = t0 - t3 + SCALE_BITS;
        let x1 = t1 + t2 + SCALE_BITS;
        let x2 = t1 - t2 + SCALE_BITS;

        let mut t0 = vector[i + 7];
        let mut t1 = vector[i + 5];
        let mut t2 = vector[i + 3];
        let mut t3 = vector[i + 1];

        let p3 = t0 + t2;
        let p4 = t1 + t3;
        let p1 = t0 + t3;
        let p2 = t1 + t2;
        let p5 = (p3 + p4) * f2f(1.175875602);

        t0 *= 1223;
        t1 *= 8410;
        t2 *= 12586;
        t3 *= 6149;

        let p1 = p5 + p1 * -3685;
        let p2 = p5 + p2 * -10497;
        let p3 = p3 * -8034;
        let p4 = p4 * -1597;

        t3 += p1 + p4;
        t2 += p2 + p3;
        t1 += p2 + p4;
        t0 += p1 + p3;

        x[i] = clamp_u8((x0 + t3) >> 17) as i32;
        x[i + 1] = clamp_u8((x1 + t2) >> 17) as i32;
        x[i + 2] = clamp_u8((x2 + t1) >> 17) as i32;
        x[i + 3] = clamp_u8((x3 + t0) >> 17) as i32;
        x[i + 4] = clamp_u8((x3 - t0) >> 17) as i32;
        x[i + 5] = clamp_u8((x2 - t1) >> 17) as i32;
        x[i + 6] = clamp_u8((x1 - t2) >> 17) as i32;
        x[i + 7] = clamp_u8((x0 - t3) >> 17) as i32;

        i += 8;
    }

    let mut out = [0i16; 64];
    for (o, v) in out.iter_mut().zip(x.iter()) {
        *o = *v as i16;
    }
    out
}

const FDCT_BITS: u32 = 12;
const FDCT_SCALE: f64 = (1u64 << FDCT_BITS) as f64;

fn basis_table() -> &'static [[i64; 8]; 8] {
    static TABLE: OnceLock<[[i64; 8]; 8]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut basis = [[0i64; 8]; 8];
        for (u, row) in basis.iter_mut().enumerate() {
            let alpha = if u == 0 {
                std::f64::consts::FRAC_1_SQRT_2
            } else {
                1.0
            };
            for (x, cell) in row.iter_mut().enumerate() {
                let angle =
                    (2.0 * x as f64 + 1.0) * u as f64 * std::f64::consts::PI / 16.0;
                let value = alpha * 0.5 * angle.cos();
                *cell = (value * FDCT_SCALE).round() as i64;
            }
        }
        basis
    })
}

/// Subtract the 128 level shift from an unsigned sample, producing the
/// signed spatial-domain input `fdct_int` expects.
pub fn level_shift_down(sample: u8) -> i32 {
    i32::from(sample) - 128
}

/// Forward DCT of a level-shifted (range `-128..=127`), natural-order 8x8
/// block, in place. Separable: a column pass then a row pass, each an
/// exact evaluation of the DCT-II sum against `basis_table`.
pub fn fdct_int(block: &mut [i32; 64]) {
    let basis = basis_table();
    let mut tmp = [0i64; 64];

    for x in 0..8 {
        for u in 0..8 {
            let mut sum = 0i64;
            for y in 0..8 {
                sum += i64::from(block[y * 8 + x]) * basis[u][y];
            }
            tmp[u * 8 + x] = sum;
        }
    }

    let round = 1i64 << (2 * FDCT_BITS - 1);
    for u in 0..8 {
        for v in 0..8 {
            let mut sum = 0i64;
            for x in 0..8 {
                sum += tmp[u * 8 + x] * basis[v][x];
            }
            block[u * 8 + v] = ((sum + round) >> (2 * FDCT_BITS)) as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idct_of_all_zero_block_is_flat_gray() {
        let mut block = [0i32; 64];
        let out = idct_int(&mut block);
        assert!(out.iter().all(|&v| v == 128));
    }

    #[test]
    fn idct_of_dc_only_block_is_flat() {
        // A pure DC coefficient should level-shift to a uniform block.
        let mut block = [0i32; 64];
        block[0] = 8; // small DC term
        let out = idct_int(&mut block);
        let first = out[0];
        assert!(out.iter().all(|&v| v == first));
    }

    #[test]
    fn fdct_of_flat_block_has_only_dc() {
        let mut block = [0i32; 64];
        for v in block.iter_mut() {
            *v = level_shift_down(128);
        }
        fdct_int(&mut block);
        assert_eq!(block[0], 0);
        assert!(block[1..].iter().all(|&v| v == 0));
    }

    #[test]
    fn fdct_then_idct_round_trips_flat_input() {
        let mut block = [0i32; 64];
        for v in block.iter_mut() {
            *v = level_shift_down(200);
        }
        fdct_int(&mut block);
        let out = idct_int(&mut block);
        for &v in out.iter() {
            assert!((v - 200).abs() <= 2, "got {v}");
        }
    }

    #[test]
    fn fdct_then_idct_round_trips_ramp_input() {
        let mut block = [0i32; 64];
        for (i, v) in block.iter_mut().enumerate() {
            let x = (i % 8) as u8 * 30;
            *v = level_shift_down(x);
        }
        let original = block;
        fdct_int(&mut block);
        let out = idct_int(&mut block);
        for (i, &v) in out.iter().enumerate() {
            let expected = original[i] + 128;
            assert!((v as i32 - expected).abs() <= 3, "index {i}: got {v}, expected {expected}");
        }
    }

    // IEEE 1180 frames IDCT conformance as a cross-check against a
    // floating-point reference evaluated from the exact inverse-DCT
    // definition, over the standard's coefficient-range categories, with
    // peak error <= 1 and mean square error below 0.06. We evaluate the
    // reference directly from the textbook sum rather than transcribing the
    // standard's published sample matrices, since this crate's fixed-point
    // `idct_int` is itself only ever checked against that same definition.
    fn idct_float_reference(coeffs: &[i32; 64]) -> [f64; 64] {
        let mut out = [0f64; 64];
        for y in 0..8 {
            for x in 0..8 {
                let mut sum = 0f64;
                for v in 0..8 {
                    for u in 0..8 {
                        let cu = if u == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
                        let cv = if v == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
                        let f = coeffs[v * 8 + u] as f64;
                        sum += cu * cv
                            * f
                            * ((2.0 * x as f64 + 1.0) * u as f64 * std::f64::consts::PI / 16.0).cos()
                            * ((2.0 * y as f64 + 1.0) * v as f64 * std::f64::consts::PI / 16.0).cos();
                    }
                }
                out[y * 8 + x] = (sum / 4.0 + 128.0).clamp(0.0, 255.0);
            }
        }
        out
    }

    /// Deterministic pseudo-random coefficient block in `[low, high]`, for
    /// the "pseudo-random" category of IEEE 1180-style conformance blocks.
    fn lcg_block(seed: u64, low: i32, high: i32) -> [i32; 64] {
        let mut state = seed;
        let span = (high - low + 1) as u64;
        let mut block = [0i32; 64];
        for slot in block.iter_mut() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let r = (state >> 33) % span;
            *slot = low + r as i32;
        }
        block
    }

    fn assert_within_ieee_1180_tolerance(coeffs: &[i32; 64]) {
        let reference = idct_float_reference(coeffs);
        let mut scratch = *coeffs;
        let actual = idct_int(&mut scratch);
        let mut peak = 0f64;
        let mut sq_sum = 0f64;
        for i in 0..64 {
            let diff = (f64::from(actual[i]) - reference[i]).abs();
            peak = peak.max(diff);
            sq_sum += diff * diff;
        }
        let mse = sq_sum / 64.0;
        assert!(peak <= 1.0, "peak error {peak} exceeds the IEEE 1180 bound of 1");
        assert!(mse <= 0.06, "mean square error {mse} exceeds the IEEE 1180 bound of 0.06");
    }

    #[test]
    fn matches_float_reference_for_typical_range_pseudo_random_blocks() {
        assert_within_ieee_1180_tolerance(&lcg_block(1, -256, 255));
        assert_within_ieee_1180_tolerance(&lcg_block(2, -256, 255));
    }

    #[test]
    fn matches_float_reference_for_low_variance_pseudo_random_block() {
        assert_within_ieee_1180_tolerance(&lcg_block(3, -5, 5));
    }

    #[test]
    fn matches_float_reference_for_extreme_checkerboard_block() {
        let mut block = [0i32; 64];
        for (i, slot) in block.iter_mut().enumerate() {
            let (u, v) = (i / 8, i % 8);
            *slot = if (u + v) % 2 == 0 { 2047 } else { -2048 };
        }
        assert_within_ieee_1180_tolerance(&block);
    }
}
