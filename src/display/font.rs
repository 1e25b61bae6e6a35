//! Seven-segment glyphs.  Bit 0 = segment a … bit 6 = segment g,
//! bit 7 = decimal point.

/// Decimal point / seconds-indicator bit.
pub const DOT: u8 = 0x80;

/// `0-9`, then `A-Z`, then `a-z`.
pub const DIGITS_TABLE: [u8; 62] = [
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F, // 0-9
    0x77, 0x7C, 0x39, 0x5E, 0x79, 0x71, 0x3D, 0x76, 0x30, 0x1E, // A-J
    0x75, 0x38, 0x15, 0x37, 0x3F, 0x73, 0x6B, 0x33, 0x6D, 0x78, // K-T
    0x3E, 0x3E, 0x2A, 0x76, 0x6E, 0x5B, // U-Z
    0x5F, 0x7C, 0x58, 0x5E, 0x7B, 0x71, 0x6F, 0x74, 0x10, 0x0C, // a-j
    0x75, 0x30, 0x14, 0x54, 0x5C, 0x73, 0x67, 0x50, 0x6D, 0x78, // k-t
    0x1C, 0x1C, 0x14, 0x76, 0x6E, 0x5B, // u-z
];

/// Segment pattern for an ASCII character; unknown characters are blank.
pub fn glyph(c: char) -> u8 {
    let idx = match c {
        '0'..='9' => c as usize - '0' as usize,
        'A'..='Z' => c as usize - 'A' as usize + 10,
        'a'..='z' => c as usize - 'a' as usize + 36,
        _ => return 0,
    };
    DIGITS_TABLE[idx]
}

/// Segment pattern for a decimal digit (`d % 10`).
pub fn digit(d: u16) -> u8 {
    DIGITS_TABLE[usize::from(d % 10)]
}
