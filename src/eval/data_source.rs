// DataSource trait: abstraction over binary data access

use crate::bitpos::BitPosition;
use crate::error::EvalError;

/// Trait for accessing binary data during evaluation
pub trait DataSource {
    /// Read bytes from the given offset
    fn read_bytes(&self, offset: u64, size: u64) -> Result<Vec<u8>, EvalError>;

    /// Get the total size of the data
    fn size(&self) -> u64;
}

/// Extract up to 128 bits starting at a bit-precise position.
///
/// Addressing is LSB-first: bit 0 of a byte is its least significant bit and
/// addresses grow with significance. Reads the minimal covering byte range,
/// then shifts and masks. A zero width reads nothing and yields 0.
pub fn read_bits(
    data: &dyn DataSource,
    at: BitPosition,
    width: u64,
) -> Result<u128, EvalError> {
    if width == 0 {
        return Ok(0);
    }
    debug_assert!(width <= 128);
    let needed_bytes = (at.bit as u64 + width).div_ceil(8);
    let bytes = data.read_bytes(at.byte, needed_bytes)?;
    let mut raw: u128 = 0;
    // Little-endian assembly of the covering bytes; the overflow byte of a
    // 128-bit field starting mid-byte is folded in after the shift.
    for (i, b) in bytes.iter().enumerate().take(16) {
        raw |= (*b as u128) << (i * 8);
    }
    let mut value = raw >> at.bit;
    if bytes.len() > 16 {
        let spill = bytes[16] as u128;
        value |= spill << (128 - at.bit as u32);
    }
    let mask = if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    Ok(value & mask)
}

/// DataSource backed by a byte slice (useful for testing)
pub struct SliceDataSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceDataSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> DataSource for SliceDataSource<'a> {
    fn read_bytes(&self, offset: u64, size: u64) -> Result<Vec<u8>, EvalError> {
        let start = offset as usize;
        let end = start.checked_add(size as usize).unwrap_or(usize::MAX);
        if end > self.data.len() {
            return Err(EvalError::read_oob(format!(
                "read out of bounds: offset={}, size={}, data_len={}",
                offset,
                size,
                self.data.len()
            )));
        }
        Ok(self.data[start..end].to_vec())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_data_source_read() {
        let data = vec![0x89, 0x50, 0x4E, 0x47];
        let ds = SliceDataSource::new(&data);
        assert_eq!(ds.read_bytes(0, 4).unwrap(), vec![0x89, 0x50, 0x4E, 0x47]);
        assert_eq!(ds.read_bytes(1, 2).unwrap(), vec![0x50, 0x4E]);
    }

    #[test]
    fn test_slice_data_source_out_of_bounds() {
        let data = vec![0x00, 0x01];
        let ds = SliceDataSource::new(&data);
        assert!(ds.read_bytes(0, 3).is_err());
    }

    #[test]
    fn test_read_bits_within_byte() {
        // 0b1011_0110
        let data = [0xB6u8];
        let ds = SliceDataSource::new(&data);
        assert_eq!(read_bits(&ds, BitPosition::new(0, 0), 4).unwrap(), 0x6);
        assert_eq!(read_bits(&ds, BitPosition::new(0, 4), 4).unwrap(), 0xB);
        assert_eq!(read_bits(&ds, BitPosition::new(0, 1), 3).unwrap(), 0b011);
    }

    #[test]
    fn test_read_bits_across_bytes() {
        // bits 4..12 straddle the byte boundary: low nibble of byte 1
        // concatenated above the high nibble of byte 0
        let data = [0xAB, 0xCD];
        let ds = SliceDataSource::new(&data);
        assert_eq!(read_bits(&ds, BitPosition::new(0, 4), 8).unwrap(), 0xDA);
        assert_eq!(read_bits(&ds, BitPosition::new(0, 0), 16).unwrap(), 0xCDAB);
    }

    #[test]
    fn test_read_bits_zero_width() {
        let ds = SliceDataSource::new(&[]);
        assert_eq!(read_bits(&ds, BitPosition::new(0, 0), 0).unwrap(), 0);
    }

    #[test]
    fn test_read_bits_oob() {
        let data = [0xFF];
        let ds = SliceDataSource::new(&data);
        assert!(read_bits(&ds, BitPosition::new(0, 4), 8).is_err());
    }

    #[test]
    fn test_read_bits_full_128_unaligned() {
        let data = [0xFFu8; 17];
        let ds = SliceDataSource::new(&data);
        assert_eq!(
            read_bits(&ds, BitPosition::new(0, 3), 128).unwrap(),
            u128::MAX
        );
    }
}
