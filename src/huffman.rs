//! Canonical Huffman table construction (ITU-T T.81 Annex C) shared by the
//! decoder and encoder.
use crate::errors::DecodeError;

/// A canonical Huffman table built from a 16-entry code-length vector and a
/// symbol list, usable for both decoding (`decode_symbol`) and encoding
/// (`code_for`).
///
/// Per spec.md §3/§4.3: codes start at 0 for length 1 and increase by 1 at
/// each symbol, shifting left at each length boundary (Annex C). The
/// decoder side keeps a per-length `(min_code, max_code, val_ptr)` triple
/// plus the symbol array — a direct decode (bit-by-bit, O(code length),
/// worst case 16 iterations) rather than a prefix lookup table, since
/// spec.md §4.3 only recommends the latter as an acceleration.
#[derive(Clone)]
pub struct HuffmanTable {
    /// Smallest canonical code of each length, `1..=16`. `min_code[0]` is unused.
    min_code: [i32; 17],
    /// Largest canonical code of each length; `-1` if no code has that length.
    max_code: [i32; 17],
    /// Index into `values` of the first symbol with that code length.
    val_ptr: [i32; 17],
    /// Symbols in order of increasing code length (as read from DHT).
    values: Vec<u8>,
    /// `(code, length)` for every symbol that appears in this table, used
    /// by the encoder. `None` for symbols absent from the table.
    encode: [Option<(u16, u8)>; 256],
}

impl HuffmanTable {
    /// Build a canonical table from a DHT code-length vector (`bits[i]` =
    /// number of codes of length `i + 1`) and the symbols sorted by
    /// increasing code length.
    ///
    /// # Errors
    /// `DecodeError::Malformed` if the code-length vector describes more
    /// codes than the Kraft inequality allows for any length, or if the
    /// number of symbols doesn't match `sum(bits)`.
    pub fn build(bits: &[u8; 16], values: Vec<u8>) -> Result<HuffmanTable, DecodeError> {
        let total: usize = bits.iter().map(|&b| b as usize).sum();
        if total != values.len() {
            return Err(DecodeError::Malformed(format!(
                "Huffman table symbol count mismatch: code-length vector describes {total} \
                 codes but {} symbols were supplied",
                values.len()
            )));
        }
        if total > 256 {
            return Err(DecodeError::Malformed(format!(
                "Huffman table has {total} symbols, maximum is 256"
            )));
        }

        let mut min_code = [0i32; 17];
        let mut max_code = [-1i32; 17];
        let mut val_ptr = [0i32; 17];

        let mut code: i32 = 0;
        let mut k: i32 = 0;
        for l in 1..=16usize {
            let count = bits[l - 1] as i32;
            if count > 0 {
                // Kraft inequality: the running code must still fit in `l` bits.
                if code + count > (1 << l) {
                    return Err(DecodeError::Malformed(format!(
                        "Huffman code-length vector violates the Kraft inequality at length {l}"
                    )));
                }
                val_ptr[l] = k;
                min_code[l] = code;
                code += count;
                max_code[l] = code - 1;
                k += count;
            } else {
                max_code[l] = -1;
            }
            code <<= 1;
        }

        let mut encode: [Option<(u16, u8)>; 256] = [None; 256];
        let mut idx = 0usize;
        let mut code: i32 = 0;
        for l in 1..=16usize {
            let count = bits[l - 1] as i32;
            for _ in 0..count {
                let sym = values[idx];
                encode[sym as usize] = Some((code as u16, l as u8));
                code += 1;
                idx += 1;
            }
            code <<= 1;
        }

        Ok(HuffmanTable {
            min_code,
            max_code,
            val_ptr,
            values,
            encode,
        })
    }

    /// Decode one Huffman symbol from `next_bit`, a closure yielding one
    /// bit (MSB first) at a time from the entropy-coded bit stream.
    ///
    /// # Errors
    /// `DecodeError::CorruptEntropy` if no valid code of length `<= 16`
    /// matches the bits read.
    pub fn decode_symbol(
        &self,
        mut next_bit: impl FnMut() -> Result<i32, DecodeError>,
    ) -> Result<u8, DecodeError> {
        let mut code = next_bit()?;
        for l in 1..=16usize {
            if self.max_code[l] >= 0 && code <= self.max_code[l] {
                let index = (self.val_ptr[l] + (code - self.min_code[l])) as usize;
                return self.values.get(index).copied().ok_or_else(|| {
                    DecodeError::CorruptEntropy("Huffman symbol index out of range".to_string())
                });
            }
            if l < 16 {
                code = (code << 1) | next_bit()?;
            }
        }
        Err(DecodeError::CorruptEntropy(
            "No Huffman code of length <= 16 matched the bit stream".to_string(),
        ))
    }

    /// `(code, length)` to emit for `symbol`, for the encoder.
    pub fn code_for(&self, symbol: u8) -> Option<(u16, u8)> {
        self.encode[symbol as usize]
    }

    /// Rebuild the 16-entry code-length vector this table was constructed
    /// from (used to verify canonicity round-trips; spec.md Property 5).
    pub fn code_lengths(&self) -> [u8; 16] {
        let mut bits = [0u8; 16];
        for l in 1..=16usize {
            if self.max_code[l] >= 0 {
                bits[l - 1] = (self.max_code[l] - self.min_code[l] + 1) as u8;
            }
        }
        bits
    }

    /// The symbol list in increasing-code-length order, as read from DHT.
    pub fn values(&self) -> &[u8] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{STD_AC_LUMA, STD_DC_LUMA};

    fn decode_all(table: &HuffmanTable, bits: &[u8]) -> Vec<u8> {
        let mut pos = 0usize;
        let mut symbols = Vec::new();
        while pos < bits.len() {
            let start = pos;
            let sym = table
                .decode_symbol(|| {
                    let b = bits[pos] as i32;
                    pos += 1;
                    Ok(b)
                })
                .unwrap();
            symbols.push(sym);
            assert!(pos > start);
        }
        symbols
    }

    fn bits_for_symbol(table: &HuffmanTable, sym: u8) -> Vec<u8> {
        let (code, len) = table.code_for(sym).unwrap();
        (0..len).map(|i| ((code >> (len - 1 - i)) & 1) as u8).collect()
    }

    #[test]
    fn canonicity_round_trips() {
        let (bits, values) = STD_DC_LUMA;
        let table = HuffmanTable::build(bits, values.to_vec()).unwrap();
        assert_eq!(table.code_lengths(), *bits);
    }

    #[test]
    fn decode_matches_encode() {
        let (bits, values) = STD_AC_LUMA;
        let table = HuffmanTable::build(bits, values.to_vec()).unwrap();
        for &sym in values {
            let stream = bits_for_symbol(&table, sym);
            let decoded = decode_all(&table, &stream);
            assert_eq!(decoded, vec![sym]);
        }
    }

    #[test]
    fn rejects_kraft_violation() {
        // 2 codes of length 1 is impossible (max is 2^1 = 2, but both codes
        // of length 1 would need 3 distinct single-bit codes here).
        let mut bits = [0u8; 16];
        bits[0] = 3; // three length-1 codes: impossible
        let values = vec![0, 1, 2];
        assert!(HuffmanTable::build(&bits, values).is_err());
    }

    #[test]
    fn rejects_symbol_count_mismatch() {
        let mut bits = [0u8; 16];
        bits[0] = 2;
        let values = vec![0];
        assert!(HuffmanTable::build(&bits, values).is_err());
    }
}
