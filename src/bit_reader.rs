/// MSB-first bit cursor used by the navigation packet decoders, whose fields do not fall on byte
/// boundaries.
///
/// Callers check the buffer length up front; the reader itself only guards the field width.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_position: usize,
    bit_position: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_position: 0,
            bit_position: 0,
        }
    }

    /// Consumes `n` bits (at most 32) and returns them right-aligned.
    pub fn take(&mut self, n: u32) -> u32 {
        assert!(n <= 32, "cannot take {} bits at once", n);
        let mut out: u32 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - self.bit_position as u32;
            let count = remaining.min(available);
            let shift = available - count;
            let mask = ((1_u32 << count) - 1) as u8;
            let bits = (self.data[self.byte_position] >> shift) & mask;
            // Shifting a u32 by 32 is an overflow, so widen first.
            out = ((out as u64) << count) as u32 | bits as u32;
            remaining -= count;
            self.bit_position += count as u8;
            if self.bit_position == 8 {
                self.bit_position = 0;
                self.byte_position += 1;
            }
        }
        out
    }

    pub fn take_bool(&mut self) -> bool {
        self.take(1) != 0
    }

    pub fn take_u8(&mut self) -> u8 {
        self.take(8) as u8
    }

    pub fn take_u16(&mut self) -> u16 {
        self.take(16) as u16
    }

    pub fn take_u32(&mut self) -> u32 {
        self.take(32)
    }

    pub fn take_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0_u8; N];
        for b in out.iter_mut() {
            *b = self.take_u8();
        }
        out
    }

    /// Total number of bits consumed so far.
    pub fn bits_consumed(&self) -> usize {
        self.byte_position * 8 + self.bit_position as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_fields_across_byte_boundaries() {
        let data = [0b1011_0011, 0b1100_0101, 0xff, 0x00];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.take(2), 0b10);
        assert_eq!(reader.take(3), 0b110);
        assert_eq!(reader.take(6), 0b011_110);
        assert_eq!(reader.take(5), 0b0_0101);
        assert_eq!(reader.bits_consumed(), 16);
        assert_eq!(reader.take(12), 0xff0);
        assert_eq!(reader.bits_consumed(), 28);
    }

    #[test]
    fn takes_full_words() {
        let data = [0xde, 0xad, 0xbe, 0xef, 0x80];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.take_u32(), 0xdeadbeef);
        assert!(reader.take_bool());
        assert_eq!(reader.take(0), 0);
        assert_eq!(reader.bits_consumed(), 33);
    }

    #[test]
    fn takes_unaligned_word() {
        let data = [0x0f, 0xff, 0xff, 0xff, 0xf0];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.take(4), 0);
        assert_eq!(reader.take(32), 0xffff_ffff);
        assert_eq!(reader.take(4), 0);
    }

    #[test]
    #[should_panic]
    fn rejects_oversized_fields() {
        let data = [0_u8; 8];
        BitReader::new(&data).take(33);
    }
}
