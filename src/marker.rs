//! JPEG marker identification.
//!
//! A marker is any `0xFF xx` byte pair found outside entropy-coded data
//! (see `bitreader.rs` for how stuffed/fill bytes inside scan data are
//! told apart from real markers).

/// A JPEG marker code, decoded from the byte following a `0xFF`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Marker {
    /// Start of image, `FF D8`.
    SOI,
    /// End of image, `FF D9`.
    EOI,
    /// Baseline sequential DCT frame header, `FF C0`.
    SOF0,
    /// Any other Start-Of-Frame marker (`FF C1`..=`FF CF`, excluding DHT
    /// and the two reserved codes). Carries the marker's low byte so
    /// callers can report which scheme was rejected.
    SOFn(u8),
    /// Huffman table definition, `FF C4`.
    DHT,
    /// Quantization table definition, `FF DB`.
    DQT,
    /// Start of scan, `FF DA`.
    SOS,
    /// Define restart interval, `FF DD`.
    DRI,
    /// Restart marker 0 through 7, `FF D0`..=`FF D7`.
    RST(u8),
    /// Application segment 0 through 15, `FF E0`..=`FF EF`.
    APPn(u8),
    /// Comment segment, `FF FE`.
    COM,
    /// Anything else; recorded but never interpreted.
    Unknown(u8),
}

impl Marker {
    /// Decode the byte following a `0xFF` into a marker.
    ///
    /// Returns `None` for `0x00` (a stuffed byte, not a marker) and
    /// `0xFF` (a fill byte; the caller should keep reading).
    pub fn from_u8(byte: u8) -> Option<Marker> {
        match byte {
            0x00 | 0xFF => None,
            0xD8 => Some(Marker::SOI),
            0xD9 => Some(Marker::EOI),
            0xC0 => Some(Marker::SOF0),
            0xC4 => Some(Marker::DHT),
            0xDB => Some(Marker::DQT),
            0xDA => Some(Marker::SOS),
            0xDD => Some(Marker::DRI),
            0xD0..=0xD7 => Some(Marker::RST(byte - 0xD0)),
            0xE0..=0xEF => Some(Marker::APPn(byte - 0xE0)),
            0xFE => Some(Marker::COM),
            0xC1..=0xCF => Some(Marker::SOFn(byte)),
            other => Some(Marker::Unknown(other)),
        }
    }

    /// The two raw bytes (`0xFF`, marker byte) this marker is written as.
    pub fn to_bytes(self) -> [u8; 2] {
        let low = match self {
            Marker::SOI => 0xD8,
            Marker::EOI => 0xD9,
            Marker::SOF0 => 0xC0,
            Marker::SOFn(b) => b,
            Marker::DHT => 0xC4,
            Marker::DQT => 0xDB,
            Marker::SOS => 0xDA,
            Marker::DRI => 0xDD,
            Marker::RST(n) => 0xD0 + n,
            Marker::APPn(n) => 0xE0 + n,
            Marker::COM => 0xFE,
            Marker::Unknown(b) => b,
        };
        [0xFF, low]
    }

    /// Whether this marker carries a big-endian length field (all markers
    /// except SOI, EOI and RSTn, per spec.md §4.1).
    pub fn has_length(self) -> bool {
        !matches!(self, Marker::SOI | Marker::EOI | Marker::RST(_))
    }
}
