//! Top-level encode orchestration, the mirror of `decoder.rs` (spec.md §2
//! encode pipeline, §4.8-§4.13, §6).
use crate::bitwriter::{amplitude_bits, category, BitWriter};
use crate::color::rgb_plane_to_ycbcr;
use crate::errors::EncodeError;
use crate::headers::{
    write_dht, write_dqt, write_dri, write_eoi, write_jfif, write_sof0, write_soi, write_sos,
};
use crate::huffman::HuffmanTable;
use crate::idct::{fdct_int, level_shift_down};
use crate::image::{ColorSpace, EncodeOptions, Image};
use crate::marker::Marker;
use crate::quantization::scale_quant_table;
use crate::sampling::downsample_box;
use crate::tables::{
    STD_AC_CHROMA, STD_AC_LUMA, STD_CHROMA_QUANT_ZIGZAG, STD_DC_CHROMA, STD_DC_LUMA,
    STD_LUMA_QUANT_ZIGZAG, UN_ZIGZAG, ZIGZAG,
};

/// Encode an RGBA image as a baseline JPEG byte stream.
pub fn encode(image: &Image, opts: EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let width = usize::from(image.width);
    let height = usize::from(image.height);
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidInput(
            "image width and height must be nonzero".to_string(),
        ));
    }
    if image.rgba.len() != width * height * 4 {
        return Err(EncodeError::InvalidInput(format!(
            "pixel buffer length {} does not match {width}x{height}x4",
            image.rgba.len()
        )));
    }
    if !(1..=100).contains(&opts.quality) {
        return Err(EncodeError::InvalidOptions(format!(
            "quality {} out of range 1..=100",
            opts.quality
        )));
    }

    let grayscale = opts.color_space == ColorSpace::Grayscale;
    let (max_h, max_v): (usize, usize) = if grayscale {
        (1, 1)
    } else {
        let (h, v) = opts.chroma_subsampling.luma_sampling_factors();
        (usize::from(h), usize::from(v))
    };

    let mcus_per_row = (width + 8 * max_h - 1) / (8 * max_h);
    let mcus_per_col = (height + 8 * max_v - 1) / (8 * max_v);
    let luma_padded_w = mcus_per_row * max_h * 8;
    let luma_padded_h = mcus_per_col * max_v * 8;
    let chroma_padded_w = mcus_per_row * 8;
    let chroma_padded_h = mcus_per_col * 8;

    let mut y_plane = vec![0u8; width * height];
    let mut cb_plane = vec![0u8; width * height];
    let mut cr_plane = vec![0u8; width * height];
    rgb_plane_to_ycbcr(&image.rgba, true, &mut y_plane, &mut cb_plane, &mut cr_plane);

    let y_padded = pad_edge_replicate(&y_plane, width, height, luma_padded_w, luma_padded_h);

    let luma_quant = natural_order(&scale_quant_table(&STD_LUMA_QUANT_ZIGZAG, opts.quality));
    let dc_luma = HuffmanTable::build(STD_DC_LUMA.0, STD_DC_LUMA.1.to_vec())
        .expect("standard Annex K table is well-formed");
    let ac_luma = HuffmanTable::build(STD_AC_LUMA.0, STD_AC_LUMA.1.to_vec())
        .expect("standard Annex K table is well-formed");

    let chroma_data = if grayscale {
        None
    } else {
        let (cb_ds, cb_w, cb_h) = downsample_box(&cb_plane, width, height, max_h, max_v);
        let (cr_ds, _, _) = downsample_box(&cr_plane, width, height, max_h, max_v);
        let cb_padded = pad_edge_replicate(&cb_ds, cb_w, cb_h, chroma_padded_w, chroma_padded_h);
        let cr_padded = pad_edge_replicate(&cr_ds, cb_w, cb_h, chroma_padded_w, chroma_padded_h);
        let chroma_quant = natural_order(&scale_quant_table(&STD_CHROMA_QUANT_ZIGZAG, opts.quality));
        let dc_chroma = HuffmanTable::build(STD_DC_CHROMA.0, STD_DC_CHROMA.1.to_vec())
            .expect("standard Annex K table is well-formed");
        let ac_chroma = HuffmanTable::build(STD_AC_CHROMA.0, STD_AC_CHROMA.1.to_vec())
            .expect("standard Annex K table is well-formed");
        Some(ChromaData {
            cb_padded,
            cr_padded,
            quant: chroma_quant,
            dc_table: dc_chroma,
            ac_table: ac_chroma,
        })
    };

    let mut out = Vec::new();
    write_soi(&mut out);
    write_jfif(&mut out);
    write_dqt(&mut out, 0, &luma_quant);
    if let Some(ref chroma) = chroma_data {
        write_dqt(&mut out, 1, &chroma.quant);
    }

    let components: Vec<(u8, u8, u8, u8)> = if grayscale {
        vec![(1, 1, 1, 0)]
    } else {
        vec![(1, max_h as u8, max_v as u8, 0), (2, 1, 1, 1), (3, 1, 1, 1)]
    };
    write_sof0(&mut out, image.width, image.height, &components);

    write_dht(&mut out, 0, 0, STD_DC_LUMA.0, STD_DC_LUMA.1);
    write_dht(&mut out, 1, 0, STD_AC_LUMA.0, STD_AC_LUMA.1);
    if chroma_data.is_some() {
        write_dht(&mut out, 0, 1, STD_DC_CHROMA.0, STD_DC_CHROMA.1);
        write_dht(&mut out, 1, 1, STD_AC_CHROMA.0, STD_AC_CHROMA.1);
    }
    if opts.restart_interval > 0 {
        write_dri(&mut out, opts.restart_interval);
    }

    let scan_components: Vec<(u8, u8, u8)> = if grayscale {
        vec![(1, 0, 0)]
    } else {
        vec![(1, 0, 0), (2, 1, 1), (3, 1, 1)]
    };
    write_sos(&mut out, &scan_components);

    encode_scan(
        &mut out,
        &y_padded,
        luma_padded_w,
        max_h,
        max_v,
        &dc_luma,
        &ac_luma,
        &luma_quant,
        chroma_data.as_ref(),
        mcus_per_row,
        mcus_per_col,
        opts.restart_interval,
    );

    write_eoi(&mut out);
    Ok(out)
}

struct ChromaData {
    cb_padded: Vec<u8>,
    cr_padded: Vec<u8>,
    quant: [u16; 64],
    dc_table: HuffmanTable,
    ac_table: HuffmanTable,
}

fn natural_order(zigzag_table: &[u16; 64]) -> [u16; 64] {
    let mut natural = [0u16; 64];
    for (zigzag_index, &value) in zigzag_table.iter().enumerate() {
        natural[UN_ZIGZAG[zigzag_index]] = value;
    }
    natural
}

/// Pad a `src_w x src_h` plane up to `dst_w x dst_h` by replicating the
/// last row/column (spec.md §4.13).
fn pad_edge_replicate(plane: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut out = vec![0u8; dst_w * dst_h];
    for y in 0..dst_h {
        let sy = y.min(src_h - 1);
        let src_row = &plane[sy * src_w..sy * src_w + src_w];
        let dst_row = &mut out[y * dst_w..y * dst_w + dst_w];
        for x in 0..dst_w {
            dst_row[x] = src_row[x.min(src_w - 1)];
        }
    }
    out
}

fn extract_block(plane: &[u8], plane_w: usize, x: usize, y: usize) -> [u8; 64] {
    let mut block = [0u8; 64];
    for row in 0..8 {
        let src = (y + row) * plane_w + x;
        block[row * 8..row * 8 + 8].copy_from_slice(&plane[src..src + 8]);
    }
    block
}

fn round_div(a: i32, b: i32) -> i32 {
    if a >= 0 {
        (a + b / 2) / b
    } else {
        -((-a + b / 2) / b)
    }
}

/// Forward-DCT, quantize and Huffman-encode one 8x8 block.
fn encode_block(
    bits: &mut BitWriter,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    quant_natural: &[u16; 64],
    pixels: &[u8; 64],
    dc_pred: &mut i32,
) {
    let mut spatial = [0i32; 64];
    for (s, &p) in spatial.iter_mut().zip(pixels.iter()) {
        *s = level_shift_down(p);
    }
    fdct_int(&mut spatial);

    let mut zigzag = [0i32; 64];
    for natural_index in 0..64 {
        let quantized = round_div(spatial[natural_index], i32::from(quant_natural[natural_index]));
        zigzag[ZIGZAG[natural_index]] = quantized;
    }

    let diff = zigzag[0] - *dc_pred;
    *dc_pred = zigzag[0];
    let size = category(diff);
    let (code, len) = dc_table
        .code_for(size)
        .expect("standard DC table covers all categories 0..=11");
    bits.put_bits(u32::from(code), len);
    bits.put_bits(amplitude_bits(diff, size), size);

    let mut run = 0u8;
    let mut k = 1usize;
    while k < 64 {
        if zigzag[k] == 0 {
            run += 1;
            k += 1;
            continue;
        }
        while run >= 16 {
            let (code, len) = ac_table.code_for(0xF0).expect("ZRL is in the standard AC table");
            bits.put_bits(u32::from(code), len);
            run -= 16;
        }
        let size = category(zigzag[k]);
        let (code, len) = ac_table
            .code_for((run << 4) | size)
            .expect("standard AC table covers all run/size combinations");
        bits.put_bits(u32::from(code), len);
        bits.put_bits(amplitude_bits(zigzag[k], size), size);
        run = 0;
        k += 1;
    }
    if run > 0 {
        let (code, len) = ac_table.code_for(0x00).expect("EOB is in the standard AC table");
        bits.put_bits(u32::from(code), len);
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_scan(
    out: &mut Vec<u8>,
    y_padded: &[u8],
    luma_w: usize,
    max_h: usize,
    max_v: usize,
    dc_luma: &HuffmanTable,
    ac_luma: &HuffmanTable,
    luma_quant: &[u16; 64],
    chroma: Option<&ChromaData>,
    mcus_per_row: usize,
    mcus_per_col: usize,
    restart_interval: u16,
) {
    let chroma_w = mcus_per_row * 8;
    let total_units = mcus_per_row * mcus_per_col;

    let mut bits = BitWriter::new();
    let mut dc_y = 0i32;
    let mut dc_cb = 0i32;
    let mut dc_cr = 0i32;
    let mut units_since_restart = 0usize;
    let mut rst_counter = 0u8;

    for my in 0..mcus_per_col {
        for mx in 0..mcus_per_row {
            for v in 0..max_v {
                for h in 0..max_h {
                    let bx = (mx * max_h + h) * 8;
                    let by = (my * max_v + v) * 8;
                    let block = extract_block(y_padded, luma_w, bx, by);
                    encode_block(&mut bits, dc_luma, ac_luma, luma_quant, &block, &mut dc_y);
                }
            }
            if let Some(chroma) = chroma {
                let bx = mx * 8;
                let by = my * 8;
                let cb_block = extract_block(&chroma.cb_padded, chroma_w, bx, by);
                encode_block(&mut bits, &chroma.dc_table, &chroma.ac_table, &chroma.quant, &cb_block, &mut dc_cb);
                let cr_block = extract_block(&chroma.cr_padded, chroma_w, bx, by);
                encode_block(&mut bits, &chroma.dc_table, &chroma.ac_table, &chroma.quant, &cr_block, &mut dc_cr);
            }

            units_since_restart += 1;
            let units_done = my * mcus_per_row + mx + 1;
            if restart_interval > 0
                && units_since_restart == restart_interval as usize
                && units_done < total_units
            {
                bits.pad_and_flush();
                out.extend_from_slice(&bits.out);
                bits.out.clear();
                out.extend_from_slice(&Marker::RST(rst_counter).to_bytes());
                rst_counter = (rst_counter + 1) % 8;
                dc_y = 0;
                dc_cb = 0;
                dc_cr = 0;
                units_since_restart = 0;
            }
        }
    }

    bits.pad_and_flush();
    out.extend_from_slice(&bits.out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    fn solid_image(width: u16, height: u16, rgb: (u8, u8, u8)) -> Image {
        let mut image = Image::new(width, height);
        for px in image.rgba.chunks_exact_mut(4) {
            px[0] = rgb.0;
            px[1] = rgb.1;
            px[2] = rgb.2;
            px[3] = 255;
        }
        image
    }

    #[test]
    fn rejects_zero_quality() {
        let image = solid_image(8, 8, (1, 2, 3));
        let opts = EncodeOptions::default().with_quality(0);
        assert!(matches!(encode(&image, opts), Err(EncodeError::InvalidOptions(_))));
    }

    #[test]
    fn rejects_mismatched_buffer_length() {
        let mut image = solid_image(8, 8, (1, 2, 3));
        image.rgba.pop();
        assert!(matches!(encode(&image, EncodeOptions::default()), Err(EncodeError::InvalidInput(_))));
    }

    #[test]
    fn output_starts_with_soi_and_ends_with_eoi() {
        let image = solid_image(8, 8, (128, 128, 128));
        let bytes = encode(&image, EncodeOptions::default()).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn gray_round_trip_stays_close_to_gray() {
        let image = solid_image(8, 8, (128, 128, 128));
        let opts = EncodeOptions::default().with_quality(75);
        let bytes = encode(&image, opts).unwrap();
        let decoded = decode(&bytes).unwrap();
        for px in decoded.rgba.chunks_exact(4) {
            assert!((i32::from(px[0]) - 128).abs() <= 4);
            assert!((i32::from(px[1]) - 128).abs() <= 4);
            assert!((i32::from(px[2]) - 128).abs() <= 4);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn non_multiple_of_8_dimensions_are_preserved() {
        let image = solid_image(7, 7, (255, 255, 255));
        let opts = EncodeOptions::default().with_quality(90);
        let bytes = encode(&image, opts).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (7, 7));
        for px in decoded.rgba.chunks_exact(4) {
            assert!(px[0] >= 250 && px[1] >= 250 && px[2] >= 250);
        }
    }

    #[test]
    fn grayscale_color_space_encodes_single_component() {
        let image = solid_image(8, 8, (90, 90, 90));
        let opts = EncodeOptions::default().with_color_space(ColorSpace::Grayscale);
        let bytes = encode(&image, opts).unwrap();
        let info = crate::decoder::read_headers(&bytes).unwrap();
        assert_eq!(info.num_components, 1);
    }

    #[test]
    fn restart_markers_round_trip() {
        let image = solid_image(16, 16, (200, 50, 10));
        let opts = EncodeOptions::default()
            .with_quality(50)
            .with_restart_interval(1);
        let bytes = encode(&image, opts).unwrap();
        assert!(bytes.windows(2).any(|w| w[0] == 0xFF && (0xD0..=0xD7).contains(&w[1])));
        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (16, 16));
    }
}
