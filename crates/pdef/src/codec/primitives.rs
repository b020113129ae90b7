//! Fixed-width primitive reads and writes.
//!
//! Every function operates on a slice that is exactly the field's width;
//! callers slice the struct buffer using precomputed offsets, so none of
//! these can run past the end of their input.

// =============================================================================
// DECODING
// =============================================================================

#[inline]
fn le_bytes(b: &[u8]) -> [u8; 4] {
    [b[0], b[1], b[2], b[3]]
}

/// Reads a little-endian i32.
#[inline]
pub fn get_i32(b: &[u8]) -> i32 {
    i32::from_le_bytes(le_bytes(b))
}

/// Reads a little-endian f32 by bit reinterpretation (NaN payloads kept).
#[inline]
pub fn get_f32(b: &[u8]) -> f32 {
    f32::from_bits(u32::from_le_bytes(le_bytes(b)))
}

/// Any non-zero byte is true.
#[inline]
pub fn get_bool(b: &[u8]) -> bool {
    b[0] != 0
}

/// Reads a raw enum ordinal without range checking.
#[inline]
pub fn get_enum(b: &[u8]) -> u8 {
    b[0]
}

/// Reads a fixed-width string up to (not including) the first zero byte.
///
/// Bytes after the first zero are discarded.
#[inline]
pub fn get_fixed_string(b: &[u8]) -> Vec<u8> {
    let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
    b[..end].to_vec()
}

// =============================================================================
// ENCODING
// =============================================================================

#[inline]
pub fn put_i32(b: &mut [u8], value: i32) {
    b[..4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_f32(b: &mut [u8], value: f32) {
    b[..4].copy_from_slice(&value.to_bits().to_le_bytes());
}

#[inline]
pub fn put_bool(b: &mut [u8], value: bool) {
    b[0] = u8::from(value);
}

#[inline]
pub fn put_enum(b: &mut [u8], ordinal: u8) {
    b[0] = ordinal;
}

/// Writes `value` then zero-fills the rest of the field.
///
/// Returns the string length as the error when it does not fit.
#[inline]
pub fn put_fixed_string(b: &mut [u8], value: &[u8]) -> Result<(), usize> {
    if value.len() > b.len() {
        return Err(value.len());
    }
    let (content, padding) = b.split_at_mut(value.len());
    content.copy_from_slice(value);
    padding.fill(0);
    Ok(())
}
