use super::{Error, ErrorDetails, Result};

/// Big-endian cursor over one table buffer.
///
/// `location` is the absolute byte offset of the cursor inside the file (or packet) the buffer
/// was read from, so errors and violations can point at the offending bytes.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    slice: &'a [u8],
    location: u64,
}

impl<'a> SliceReader<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self::at(slice, 0)
    }

    pub fn at(slice: &'a [u8], location: u64) -> Self {
        Self { slice, location }
    }

    pub fn make_error(&self, details: ErrorDetails) -> Error {
        Error::new(self.location, details)
    }

    pub fn location(&self) -> u64 {
        self.location
    }

    pub fn skip(&mut self, length: usize) -> Result<()> {
        self.read(length).map(|_| ())
    }

    pub fn read(&mut self, length: usize) -> Result<&'a [u8]> {
        if length > self.slice.len() {
            Err(self.make_error(ErrorDetails::TableOverrun(length - self.slice.len())))
        } else {
            self.location += length as u64;
            let (left, right) = self.slice.split_at(length);
            self.slice = right;
            Ok(left)
        }
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_be_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array::<2>()?))
    }

    pub fn read_be_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    pub fn read_be_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array::<8>()?))
    }
}

#[macro_export]
macro_rules! read_bitfield {
    ($reader:expr, $type:ty) => {
        <$type>::from_bytes($reader.read_array::<{ std::mem::size_of::<$type>() }>()?)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_fields() {
        let bytes = [
            0x12, 0x34, 0xde, 0xad, 0xbe, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
        ];
        let mut reader = SliceReader::new(&bytes);
        let a = reader.read_be_u16().unwrap();
        let b = reader.read_be_u32().unwrap();
        let c = reader.read_be_u64().unwrap();
        assert_eq!(a, 0x1234);
        assert_eq!(b, 0xdeadbeef);
        assert_eq!(c, 0x0123456789abcdef);
        assert_eq!(reader.location(), 14);
    }

    #[test]
    fn overrun_reports_absolute_location() {
        let bytes = [0_u8; 6];
        let mut reader = SliceReader::at(&bytes, 0x800);
        reader.skip(4).unwrap();
        let err = reader.read_be_u32().unwrap_err();
        assert_eq!(err.location(), 0x804);
        assert!(matches!(err.details(), ErrorDetails::TableOverrun(2)));
    }
}
