//! Error types returned by the decoder and encoder.
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Errors that can occur while decoding a JPEG byte stream.
///
/// Every variant carries a human-readable reason; none of them panic on
/// untrusted input. Panics are reserved for internal invariant violations
/// (buffers sized wrong by code, not by data).
pub enum DecodeError {
    /// Structural violation of the bit stream: bad marker, bad segment
    /// length, missing SOI/EOI, a Huffman table that violates the Kraft
    /// inequality, a zero quantization value, and similar.
    Malformed(String),
    /// Valid JPEG but outside this decoder's scope (progressive,
    /// arithmetic coding, 12/16-bit precision, SOF1/2/3+...).
    Unsupported(String),
    /// A scan references a component, quantization table or Huffman
    /// table that was never declared in SOF/DQT/DHT.
    Inconsistent(String),
    /// The scan data ended before `width * height` samples were produced.
    /// Recovered automatically by `Decoder::decode`; callers only see this
    /// variant if they opt out of best-effort recovery.
    Truncated(String),
    /// An invalid Huffman code was encountered mid-scan with no restart
    /// interval to recover at.
    CorruptEntropy(String),
}

impl DecodeError {
    fn reason(&self) -> &str {
        match self {
            Self::Malformed(s)
            | Self::Unsupported(s)
            | Self::Inconsistent(s)
            | Self::Truncated(s)
            | Self::CorruptEntropy(s) => s,
        }
    }
}

impl Debug for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Malformed(_) => "Malformed",
            Self::Unsupported(_) => "Unsupported",
            Self::Inconsistent(_) => "Inconsistent",
            Self::Truncated(_) => "Truncated",
            Self::CorruptEntropy(_) => "CorruptEntropy",
        };
        write!(f, "{kind}: {}", self.reason())
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl Error for DecodeError {}

/// Errors that can occur while encoding raw pixels into a JPEG byte stream.
pub enum EncodeError {
    /// Zero width/height, or the pixel buffer length doesn't match
    /// `width * height * 4`.
    InvalidInput(String),
    /// `quality` outside `1..=100`, or an otherwise malformed `EncodeOptions`.
    InvalidOptions(String),
}

impl Debug for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(s) => write!(f, "InvalidInput: {s}"),
            Self::InvalidOptions(s) => write!(f, "InvalidOptions: {s}"),
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl Error for EncodeError {}
