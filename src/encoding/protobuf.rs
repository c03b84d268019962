//! Protocol buffers writer
//!
//! Only the encoding side is needed: messages are written field by field in
//! ascending tag order, proto3 default values are omitted.

const WIRE_VARINT: u8 = 0;
const WIRE_LEN: u8 = 2;

/// Encode varint (protobuf base 128 varint)
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        encode_varint(((field as u64) << 3) | wire_type as u64, &mut self.buf);
    }

    pub fn uint64(&mut self, field: u32, value: u64) -> &mut Self {
        if value != 0 {
            self.key(field, WIRE_VARINT);
            encode_varint(value, &mut self.buf);
        }
        self
    }

    pub fn int64(&mut self, field: u32, value: i64) -> &mut Self {
        self.uint64(field, value as u64)
    }

    pub fn bool(&mut self, field: u32, value: bool) -> &mut Self {
        self.uint64(field, value as u64)
    }

    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.message(field, value);
        }
        self
    }

    pub fn string(&mut self, field: u32, value: &str) -> &mut Self {
        self.bytes(field, value.as_bytes())
    }

    /// Embedded message; written even when empty so presence is kept
    pub fn message(&mut self, field: u32, encoded: &[u8]) -> &mut Self {
        self.key(field, WIRE_LEN);
        encode_varint(encoded.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(encoded);
        self
    }

    /// `google.protobuf.Any`
    pub fn any(&mut self, field: u32, type_url: &str, value: &[u8]) -> &mut Self {
        let any = encode_any(type_url, value);
        self.message(field, &any)
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

pub fn encode_any(type_url: &str, value: &[u8]) -> Vec<u8> {
    ProtoWriter::new().string(1, type_url).bytes(2, value).finish()
}
