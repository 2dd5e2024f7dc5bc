//! Quality monotonicity and marker well-formedness (spec.md §8, properties 3-4).
use jpeg_codec::{decode, encode, read_headers, EncodeOptions, Image};

fn checkerboard(width: u16, height: u16) -> Image {
    let w = usize::from(width);
    let h = usize::from(height);
    let mut rgba = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let v = if (x / 5 + y / 3) % 2 == 0 { 200u8 } else { 40u8 };
            let pos = (y * w + x) * 4;
            rgba[pos] = v;
            rgba[pos + 1] = v / 3;
            rgba[pos + 2] = 255 - v;
            rgba[pos + 3] = 255;
        }
    }
    Image { width, height, rgba, truncated: false }
}

fn mean_abs_error(a: &Image, b: &Image) -> f64 {
    let mut total: i64 = 0;
    let mut count: i64 = 0;
    for (pa, pb) in a.rgba.chunks_exact(4).zip(b.rgba.chunks_exact(4)) {
        for c in 0..3 {
            total += (i64::from(pa[c]) - i64::from(pb[c])).abs();
            count += 1;
        }
    }
    total as f64 / count as f64
}

#[test]
fn higher_quality_never_produces_a_larger_encoding() {
    let image = checkerboard(64, 64);
    let mut sizes = Vec::new();
    for q in [10u8, 25, 50, 75, 90, 100] {
        let bytes = encode(&image, EncodeOptions::default().with_quality(q)).unwrap();
        sizes.push((q, bytes.len()));
    }
    for w in sizes.windows(2) {
        let (q1, len1) = w[0];
        let (q2, len2) = w[1];
        assert!(len1 <= len2, "Q{q1} ({len1} bytes) should not be larger than Q{q2} ({len2} bytes)");
    }
}

#[test]
fn higher_quality_never_increases_mean_error() {
    let image = checkerboard(64, 64);
    let mut errors = Vec::new();
    for q in [10u8, 50, 90] {
        let bytes = encode(&image, EncodeOptions::default().with_quality(q)).unwrap();
        let decoded = decode(&bytes).unwrap();
        errors.push((q, mean_abs_error(&image, &decoded)));
    }
    for w in errors.windows(2) {
        let (q1, e1) = w[0];
        let (q2, e2) = w[1];
        assert!(e1 >= e2 - 1.0, "mean error should not increase going from Q{q1} ({e1}) to Q{q2} ({e2})");
    }
}

#[test]
fn output_begins_with_soi_and_ends_with_eoi() {
    let image = checkerboard(16, 16);
    let bytes = encode(&image, EncodeOptions::default()).unwrap();
    assert_eq!(&bytes[0..2], [0xFF, 0xD8]);
    assert_eq!(&bytes[bytes.len() - 2..], [0xFF, 0xD9]);
}

#[test]
fn output_decodes_cleanly_and_reports_correct_geometry() {
    let image = checkerboard(20, 12);
    let bytes = encode(&image, EncodeOptions::default()).unwrap();
    let info = read_headers(&bytes).unwrap();
    assert_eq!((info.width, info.height), (20, 12));
    assert_eq!(info.num_components, 3);
}

#[test]
fn every_ff_in_the_scan_is_stuffed_or_a_valid_marker() {
    let image = checkerboard(32, 32);
    let bytes = encode(&image, EncodeOptions::default().with_restart_interval(2)).unwrap();

    // Find SOS (FF DA) and then walk to the byte just after its header.
    let sos_marker_pos = bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xDA])
        .expect("encoder must emit SOS");
    let len = (usize::from(bytes[sos_marker_pos + 2]) << 8) | usize::from(bytes[sos_marker_pos + 3]);
    let scan_start = sos_marker_pos + 2 + len;

    let mut i = scan_start;
    while i < bytes.len() - 1 {
        if bytes[i] == 0xFF {
            let next = bytes[i + 1];
            let valid = next == 0x00 || (0xD0..=0xD7).contains(&next) || next == 0xD9;
            assert!(valid, "FF at {i} followed by invalid byte {next:#04x}");
            if next == 0xD9 {
                break;
            }
        }
        i += 1;
    }
}
