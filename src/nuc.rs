//! Nucleotide encoding and decoding tables for the Nib format
//!
//! Each supported symbol maps to a 4-bit code. Uppercase bases occupy codes
//! `0..=4` and their lowercase counterparts set the high bit of the nibble,
//! so soft-masking survives a round trip through the packed stream.
//!
//! The tables are computed at compile time and shared read-only by every
//! encoder and decoder in the process.

/// Marker for symbols (or codes) outside the supported alphabet
pub const INVALID: u8 = 0xFF;

/// Shift applied to the first base of a packed pair
pub const HIGH_NIBBLE_SHIFT: u32 = 4;

/// Mask selecting the low nibble of a packed byte
pub const LOW_NIBBLE_MASK: u8 = 0x0F;

/// Bit set on the code of a lowercase (soft-masked) base
pub const LOWERCASE_FLAG: u8 = 0b1000;

pub const CODE_T: u8 = 0;
pub const CODE_C: u8 = 1;
pub const CODE_A: u8 = 2;
pub const CODE_G: u8 = 3;
pub const CODE_N: u8 = 4;

const UPPERCASE: [(u8, u8); 5] = [
    (b'T', CODE_T),
    (b'C', CODE_C),
    (b'A', CODE_A),
    (b'G', CODE_G),
    (b'N', CODE_N),
];

static SYMBOL_TO_CODE: [u8; 256] = build_symbol_table();
static CODE_TO_SYMBOL: [u8; 16] = build_code_table();

const fn build_symbol_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < UPPERCASE.len() {
        let (symbol, code) = UPPERCASE[i];
        table[symbol as usize] = code;
        table[symbol.to_ascii_lowercase() as usize] = code | LOWERCASE_FLAG;
        i += 1;
    }
    table
}

const fn build_code_table() -> [u8; 16] {
    let mut table = [INVALID; 16];
    let mut i = 0;
    while i < UPPERCASE.len() {
        let (symbol, code) = UPPERCASE[i];
        table[code as usize] = symbol;
        table[(code | LOWERCASE_FLAG) as usize] = symbol.to_ascii_lowercase();
        i += 1;
    }
    table
}

/// Returns the 4-bit code for an ASCII nucleotide, or `None` if unsupported
#[inline]
#[must_use]
pub fn encode(symbol: u8) -> Option<u8> {
    match SYMBOL_TO_CODE[symbol as usize] {
        INVALID => None,
        code => Some(code),
    }
}

/// Returns the ASCII nucleotide for a 4-bit code, or `None` if the code is unassigned
#[inline]
#[must_use]
pub fn decode(code: u8) -> Option<u8> {
    match CODE_TO_SYMBOL[(code & LOW_NIBBLE_MASK) as usize] {
        INVALID => None,
        symbol => Some(symbol),
    }
}

/// Packs two codes into one byte, first base in the high nibble
#[inline]
#[must_use]
pub fn pack(first: u8, second: u8) -> u8 {
    (first << HIGH_NIBBLE_SHIFT) | (second & LOW_NIBBLE_MASK)
}

/// Selects the code at `index` from a packed buffer
///
/// Even indices read the high nibble and odd indices the low nibble.
#[inline]
#[must_use]
pub fn nibble_at(packed: &[u8], index: usize) -> u8 {
    let byte = packed[index >> 1];
    if index % 2 == 0 {
        byte >> HIGH_NIBBLE_SHIFT
    } else {
        byte & LOW_NIBBLE_MASK
    }
}

/// Whether a 4-bit code denotes guanine or cytosine (case-insensitive)
#[inline]
#[must_use]
pub fn is_gc_code(code: u8) -> bool {
    matches!(code & !LOWERCASE_FLAG, CODE_C | CODE_G)
}

/// Whether an ASCII symbol denotes guanine or cytosine (case-insensitive)
#[inline]
#[must_use]
pub fn is_gc_symbol(symbol: u8) -> bool {
    matches!(symbol, b'G' | b'g' | b'C' | b'c')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_alphabet() {
        for &symbol in b"ACGTNacgtn" {
            let code = encode(symbol).unwrap();
            assert!(code < 16);
            assert_eq!(decode(code), Some(symbol));
        }
    }

    #[test]
    fn test_lowercase_sets_flag() {
        assert_eq!(encode(b'g'), Some(CODE_G | LOWERCASE_FLAG));
        assert_eq!(encode(b'n'), Some(12));
    }

    #[test]
    fn test_encode_invalid() {
        for &symbol in b"-?XRY*\n " {
            assert_eq!(encode(symbol), None, "symbol {}", symbol as char);
        }
    }

    #[test]
    fn test_decode_unassigned() {
        for code in [5, 6, 7, 13, 14, 15] {
            assert_eq!(decode(code), None);
        }
    }

    #[test]
    fn test_pack_and_select() {
        let packed = [pack(CODE_A, CODE_C), pack(CODE_G, 0)];
        assert_eq!(nibble_at(&packed, 0), CODE_A);
        assert_eq!(nibble_at(&packed, 1), CODE_C);
        assert_eq!(nibble_at(&packed, 2), CODE_G);
    }

    #[test]
    fn test_gc_predicates_agree() {
        for &symbol in b"ACGTNacgtn" {
            let code = encode(symbol).unwrap();
            assert_eq!(is_gc_code(code), is_gc_symbol(symbol));
        }
    }
}
