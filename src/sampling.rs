//! Chroma resampling (spec.md §4.12). Decode uses nearest-neighbor
//! replication (the required method); encode uses box averaging, which
//! degrades to a plain horizontal average for 4:2:2 (`v_scale == 1`).

/// Replicate each sample of a `src_w x src_h` plane into an `h_scale x
/// v_scale` block, producing a full-resolution plane.
pub fn upsample_nearest(plane: &[u8], src_w: usize, src_h: usize, h_scale: usize, v_scale: usize) -> Vec<u8> {
    if h_scale == 1 && v_scale == 1 {
        return plane.to_vec();
    }
    let dst_w = src_w * h_scale;
    let dst_h = src_h * v_scale;
    let mut out = vec![0u8; dst_w * dst_h];
    for y in 0..dst_h {
        let sy = y / v_scale;
        let src_row = &plane[sy * src_w..sy * src_w + src_w];
        let dst_row = &mut out[y * dst_w..y * dst_w + dst_w];
        for x in 0..dst_w {
            dst_row[x] = src_row[x / h_scale];
        }
    }
    out
}

/// Average each `h_scale x v_scale` block of a `src_w x src_h` plane into
/// one sample, rounding to nearest. Blocks that run past the plane edge
/// (non-multiple-of-scale dimensions) average only the in-bounds samples.
pub fn downsample_box(
    plane: &[u8],
    src_w: usize,
    src_h: usize,
    h_scale: usize,
    v_scale: usize,
) -> (Vec<u8>, usize, usize) {
    if h_scale == 1 && v_scale == 1 {
        return (plane.to_vec(), src_w, src_h);
    }
    let dst_w = (src_w + h_scale - 1) / h_scale;
    let dst_h = (src_h + v_scale - 1) / v_scale;
    let mut out = vec![0u8; dst_w * dst_h];

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let mut sum = 0u32;
            let mut count = 0u32;
            for yy in 0..v_scale {
                let sy = dy * v_scale + yy;
                if sy >= src_h {
                    continue;
                }
                for xx in 0..h_scale {
                    let sx = dx * h_scale + xx;
                    if sx >= src_w {
                        continue;
                    }
                    sum += u32::from(plane[sy * src_w + sx]);
                    count += 1;
                }
            }
            out[dy * dst_w + dx] = ((sum + count / 2) / count) as u8;
        }
    }
    (out, dst_w, dst_h)
}
