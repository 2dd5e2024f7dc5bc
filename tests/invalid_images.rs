//! Malformed-input rejection (spec.md §7, §8 scenario 1 and scenario 5).
use jpeg_codec::{decode, DecodeError};

#[test]
fn empty_soi_eoi_is_malformed() {
    let err = decode(&[0xFF, 0xD8, 0xFF, 0xD9]).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
}

#[test]
fn truncated_after_soi_is_malformed() {
    let err = decode(&[0xFF, 0xD8]).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
}

#[test]
fn missing_soi_is_malformed() {
    let err = decode(&[0x00, 0x01, 0x02, 0x03]).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
}

#[test]
fn sof0_with_zero_width_is_malformed() {
    // SOI, SOF0: length=11, precision=8, height=8, width=0, Nf=1, component (1,0x11,0).
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x08, 0x00, 0x00, 0x01];
    data.extend_from_slice(&[1, 0x11, 0]);
    let err = decode(&data).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
}

#[test]
fn progressive_sof2_is_unsupported() {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC2, 0x00, 0x0B, 0x08, 0x00, 0x08, 0x00, 0x08, 0x01];
    data.extend_from_slice(&[1, 0x11, 0]);
    let err = decode(&data).unwrap_err();
    assert!(matches!(err, DecodeError::Unsupported(_)));
}

#[test]
fn sos_referencing_undeclared_component_is_inconsistent() {
    // SOI, SOF0 (1 component id=1, 8x8), SOS naming component id=9.
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x08, 0x00, 0x08, 0x01];
    data.extend_from_slice(&[1, 0x11, 0]);
    data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 9, 0x00, 0x00, 0x3F, 0x00]);
    let err = decode(&data).unwrap_err();
    assert!(matches!(err, DecodeError::Inconsistent(_)));
}
