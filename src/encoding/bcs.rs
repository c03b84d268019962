//! Binary Canonical Serialization writer (Sui)

#[derive(Debug, Default, Clone)]
pub struct BcsWriter {
    buf: Vec<u8>,
}

impl BcsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// ULEB128 length or enum variant index
    pub fn uleb128(&mut self, mut value: u64) -> &mut Self {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
        self
    }

    pub fn variant(&mut self, index: u32) -> &mut Self {
        self.uleb128(index as u64)
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Fixed-size bytes, no length prefix
    pub fn fixed(&mut self, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(value);
        self
    }

    /// `vector<u8>`
    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.uleb128(value.len() as u64);
        self.fixed(value)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uleb128() {
        assert_eq!(BcsWriter::new().uleb128(0).finish(), vec![0x00]);
        assert_eq!(BcsWriter::new().uleb128(127).finish(), vec![0x7f]);
        assert_eq!(BcsWriter::new().uleb128(128).finish(), vec![0x80, 0x01]);
        assert_eq!(BcsWriter::new().uleb128(16_384).finish(), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn test_vector_and_u64() {
        let encoded = BcsWriter::new().bytes(&[0xaa, 0xbb]).u64(1).finish();
        assert_eq!(encoded, vec![0x02, 0xaa, 0xbb, 1, 0, 0, 0, 0, 0, 0, 0]);
    }
}
