//! A baseline (ITU-T T.81 / ISO 10918-1) JPEG decoder and encoder.
//!
//! The core is a pure, single-threaded pipeline with no I/O: `decode`
//! turns a JPEG byte slice into an RGBA [`Image`]; `encode` turns an
//! [`Image`] back into a JPEG byte stream. Only the baseline sequential
//! DCT mode (SOF0) is supported; progressive, hierarchical, arithmetic
//! and lossless JPEG are out of scope.
mod bitreader;
mod bitwriter;
mod color;
mod decoder;
mod encoder;
mod errors;
mod frame;
mod headers;
mod huffman;
mod idct;
mod image;
mod marker;
mod quantization;
mod sampling;
mod tables;

pub use crate::decoder::{decode, decode_with_options, read_headers};
pub use crate::encoder::encode;
pub use crate::errors::{DecodeError, EncodeError};
pub use crate::headers::FrameInfo;
pub use crate::image::{ChromaSubsampling, ColorSpace, DecoderOptions, EncodeOptions, Image};
