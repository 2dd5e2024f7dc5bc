//! Top-level decode orchestration (spec.md §2 decode pipeline, §4.4, §4.13).
use log::{debug, warn};

use crate::bitreader::BitReader;
use crate::color::ycbcr_plane_to_rgb;
use crate::errors::DecodeError;
use crate::frame::{Component, FrameState};
use crate::headers::{decode_headers, read_frame_info, FrameInfo};
use crate::huffman::HuffmanTable;
use crate::idct::idct_int;
use crate::image::{DecoderOptions, Image};
use crate::marker::Marker;
use crate::sampling::upsample_nearest;
use crate::tables::UN_ZIGZAG;

/// Decode a baseline JPEG byte stream into an RGBA image.
pub fn decode(bytes: &[u8]) -> Result<Image, DecodeError> {
    decode_with_options(bytes, DecoderOptions::default())
}

/// Decode with explicit options (SPEC_FULL.md §10.3).
pub fn decode_with_options(bytes: &[u8], opts: DecoderOptions) -> Result<Image, DecodeError> {
    let parsed = decode_headers(bytes)?;
    let mut frame = parsed.frame;
    let num_components = frame.components.len();
    if num_components != 1 && num_components != 3 {
        return Err(DecodeError::Unsupported(format!(
            "{num_components} scan components; only grayscale (1) and YCbCr (3) are supported"
        )));
    }

    let mut planes: Vec<ComponentPlane> = frame
        .components
        .iter()
        .map(|c| ComponentPlane::new(&frame, c))
        .collect();

    let data = &bytes[parsed.scan_data_offset..];
    let truncated =
        decode_scan_interleaved(data, &mut frame, &parsed.scan_order, &mut planes, opts)?;

    if truncated && opts.strict_mode {
        return Err(DecodeError::Truncated(
            "scan data ended before all MCUs were decoded".to_string(),
        ));
    }

    let mut image = assemble_image(&frame, &planes);
    image.truncated = truncated;
    Ok(image)
}

/// Parse just the frame header, without decoding entropy data.
pub fn read_headers(bytes: &[u8]) -> Result<FrameInfo, DecodeError> {
    read_frame_info(bytes)
}

struct ComponentPlane {
    width: usize,
    height: usize,
    samples: Vec<u8>,
}

impl ComponentPlane {
    fn new(frame: &FrameState, comp: &Component) -> Self {
        let width = frame.padded_component_width(comp);
        let height = frame.padded_component_height(comp);
        ComponentPlane {
            width,
            height,
            samples: vec![0u8; width * height],
        }
    }

    fn place_block(&mut self, block_x: usize, block_y: usize, block: &[u8; 64]) {
        for row in 0..8 {
            let dst_y = block_y + row;
            if dst_y >= self.height {
                continue;
            }
            let dst_start = dst_y * self.width + block_x;
            let row_len = 8.min(self.width.saturating_sub(block_x));
            if row_len == 0 {
                continue;
            }
            self.samples[dst_start..dst_start + row_len]
                .copy_from_slice(&block[row * 8..row * 8 + row_len]);
        }
    }
}

/// Decode one 8x8 block: Huffman-decode DC/AC symbols, dequantize, inverse
/// DCT. Returns samples in `0..=255`.
fn decode_block(
    bits: &mut BitReader,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    quant_natural: &[u16; 64],
    dc_pred: &mut i32,
) -> Result<[u8; 64], DecodeError> {
    let mut coeffs_zigzag = [0i32; 64];

    let s = dc_table.decode_symbol(|| bits.next_bit())?;
    if s > 11 {
        return Err(DecodeError::CorruptEntropy(format!(
            "DC coefficient category {s} exceeds the 8-bit precision maximum of 11"
        )));
    }
    let diff = bits.receive_extend(s)?;
    *dc_pred += diff;
    coeffs_zigzag[0] = *dc_pred;

    let mut k = 1usize;
    while k < 64 {
        let rs = ac_table.decode_symbol(|| bits.next_bit())?;
        let run = rs >> 4;
        let size = rs & 0x0F;
        if size == 0 {
            if run == 15 {
                k += 16; // ZRL
                continue;
            }
            break; // EOB
        }
        k += run as usize;
        if k >= 64 {
            return Err(DecodeError::CorruptEntropy(
                "AC zero-run advanced past the end of the block".to_string(),
            ));
        }
        coeffs_zigzag[k] = bits.receive_extend(size)?;
        k += 1;
    }

    let mut natural = [0i32; 64];
    for (zigzag_index, &coef) in coeffs_zigzag.iter().enumerate() {
        let pos = UN_ZIGZAG[zigzag_index];
        natural[pos] = coef * i32::from(quant_natural[pos]);
    }

    let samples = idct_int(&mut natural);
    let mut out = [0u8; 64];
    for (o, &s) in out.iter_mut().zip(samples.iter()) {
        *o = s as u8;
    }
    Ok(out)
}

/// Run the entropy-coded scan. Handles both the interleaved (`Ns > 1`) and
/// single-component cases uniformly by treating the latter as one
/// component's own plane tiled with 1x1 "MCUs".
fn decode_scan_interleaved(
    data: &[u8],
    frame: &mut FrameState,
    scan_order: &[usize],
    planes: &mut [ComponentPlane],
    opts: DecoderOptions,
) -> Result<bool, DecodeError> {
    let mut bits = BitReader::new(data);
    let single_component = frame.components.len() == 1 && scan_order.len() == 1;

    let (mcus_per_row, mcus_per_col, mcu_w, mcu_h) = if single_component {
        let comp = &frame.components[0];
        let w = frame.padded_component_width(comp) / 8;
        let h = frame.padded_component_height(comp) / 8;
        (w, h, 8usize, 8usize)
    } else {
        (
            frame.mcus_per_row(),
            frame.mcus_per_col(),
            frame.mcu_width(),
            frame.mcu_height(),
        )
    };
    let _ = (mcu_w, mcu_h);

    let total_units = mcus_per_row * mcus_per_col;
    let restart_units = if frame.restart_interval > 0 {
        frame.restart_interval
    } else {
        total_units
    };

    let mut truncated = false;
    let mut expected_rst = 0u8;
    let mut units_since_restart = 0usize;
    let mut unit_index = 0usize;

    'units: while unit_index < total_units {
        let my = unit_index / mcus_per_row;
        let mx = unit_index % mcus_per_row;

        let mut corrupt = false;
        'mcu: for &comp_idx in scan_order {
            let (h_sampling, v_sampling, dc_id, ac_id, quant_id) = {
                let c = &frame.components[comp_idx];
                (c.h_sampling, c.v_sampling, c.dc_table_id, c.ac_table_id, c.quant_table_id)
            };
            let (h_blocks, v_blocks) = if single_component {
                (1u8, 1u8)
            } else {
                (h_sampling, v_sampling)
            };
            let dc_table = frame.dc_tables[dc_id as usize]
                .as_ref()
                .expect("validated present at SOS parse time");
            let ac_table = frame.ac_tables[ac_id as usize]
                .as_ref()
                .expect("validated present at SOS parse time");
            let quant = frame.quant_tables[quant_id as usize]
                .expect("validated present at SOS parse time");

            for v in 0..v_blocks {
                for h in 0..h_blocks {
                    let dc_pred = &mut frame.components[comp_idx].dc_pred;
                    let result = decode_block(&mut bits, dc_table, ac_table, &quant, dc_pred);
                    match result {
                        Ok(block) => {
                            let block_x = (mx * h_blocks as usize + h as usize) * 8;
                            let block_y = (my * v_blocks as usize + v as usize) * 8;
                            planes[comp_idx].place_block(block_x, block_y, &block);
                        }
                        Err(DecodeError::CorruptEntropy(msg)) => {
                            warn!("corrupt entropy data: {msg}");
                            corrupt = true;
                            break 'mcu;
                        }
                        Err(other) => return Err(other),
                    }
                    if bits.exhausted {
                        debug!("entering best-effort recovery: scan data exhausted before all MCUs were decoded");
                        truncated = true;
                        break 'units;
                    }
                }
            }
        }

        if corrupt {
            truncated = true;
            if frame.restart_interval == 0 {
                debug!("entering best-effort recovery: corrupt entropy data with no restart interval to resync at");
                break 'units;
            }
            debug!("entering best-effort recovery: resyncing at the next restart marker");
            match bits.align_to_marker() {
                Some(Marker::RST(n)) => {
                    if n != expected_rst {
                        warn!("restart marker out of sequence: expected RST{expected_rst}, found RST{n}");
                    }
                    frame.reset_dc_predictors();
                    bits.reset_after_restart();
                    expected_rst = (n + 1) % 8;
                    unit_index = (unit_index / restart_units + 1) * restart_units;
                    units_since_restart = 0;
                    continue 'units;
                }
                Some(other) => {
                    warn!("expected a restart marker while resyncing, found {other:?}; truncating scan");
                    break 'units;
                }
                None => break 'units,
            }
        }

        units_since_restart += 1;
        unit_index += 1;
        if frame.restart_interval > 0 && units_since_restart == restart_units && unit_index < total_units {
            match bits.align_to_marker() {
                Some(Marker::RST(n)) => {
                    if n != expected_rst {
                        warn!("restart marker out of sequence: expected RST{expected_rst}, found RST{n}");
                    }
                }
                Some(other) => {
                    warn!("expected a restart marker, found {other:?}; truncating scan");
                    truncated = true;
                    break 'units;
                }
                None => {
                    truncated = true;
                    break 'units;
                }
            }
            frame.reset_dc_predictors();
            bits.reset_after_restart();
            expected_rst = (expected_rst + 1) % 8;
            units_since_restart = 0;
        }
    }

    let _ = opts;
    Ok(truncated)
}

fn assemble_image(frame: &FrameState, planes: &[ComponentPlane]) -> Image {
    let mut image = Image::new(frame.width, frame.height);
    let full_w = frame.mcus_per_row() * frame.mcu_width();
    let full_h = frame.mcus_per_col() * frame.mcu_height();

    if planes.len() == 1 {
        let y_full = upsample_full(frame, &planes[0], &frame.components[0], full_w, full_h);
        write_gray_to_rgba(&y_full, full_w, &mut image);
        return image;
    }

    let y_full = upsample_full(frame, &planes[0], &frame.components[0], full_w, full_h);
    let cb_full = upsample_full(frame, &planes[1], &frame.components[1], full_w, full_h);
    let cr_full = upsample_full(frame, &planes[2], &frame.components[2], full_w, full_h);

    let width = usize::from(frame.width);
    let height = usize::from(frame.height);
    let mut cropped = vec![0u8; width * height];
    let mut cropped_cb = vec![0u8; width * height];
    let mut cropped_cr = vec![0u8; width * height];
    for row in 0..height {
        let src = row * full_w;
        cropped[row * width..row * width + width].copy_from_slice(&y_full[src..src + width]);
        cropped_cb[row * width..row * width + width].copy_from_slice(&cb_full[src..src + width]);
        cropped_cr[row * width..row * width + width].copy_from_slice(&cr_full[src..src + width]);
    }
    ycbcr_plane_to_rgb(&cropped, &cropped_cb, &cropped_cr, &mut image.rgba, true);
    image
}

fn upsample_full(frame: &FrameState, plane: &ComponentPlane, comp: &Component, full_w: usize, full_h: usize) -> Vec<u8> {
    let h_scale = (frame.max_h / comp.h_sampling) as usize;
    let v_scale = (frame.max_v / comp.v_sampling) as usize;
    let up = upsample_nearest(&plane.samples, plane.width, plane.height, h_scale, v_scale);
    debug_assert_eq!(up.len(), full_w * full_h);
    up
}

fn write_gray_to_rgba(y_full: &[u8], full_w: usize, image: &mut Image) {
    let width = usize::from(image.width);
    let height = usize::from(image.height);
    for row in 0..height {
        let src = row * full_w;
        for col in 0..width {
            let v = y_full[src + col];
            let pos = (row * width + col) * 4;
            image.rgba[pos] = v;
            image.rgba[pos + 1] = v;
            image.rgba[pos + 2] = v;
            image.rgba[pos + 3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_soi_eoi_stream() {
        let data = [0xFF, 0xD8, 0xFF, 0xD9];
        assert!(decode(&data).is_err());
    }
}
