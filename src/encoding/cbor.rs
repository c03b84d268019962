//! Minimal canonical CBOR encoder (RFC 8949) for Cardano transactions

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CborValue {
    Unsigned(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    /// Entries are written in the given order; callers pass ascending keys
    Map(Vec<(CborValue, CborValue)>),
    Bool(bool),
    Null,
}

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

impl CborValue {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            CborValue::Unsigned(v) => write_head(MAJOR_UNSIGNED, *v, out),
            CborValue::Bytes(b) => {
                write_head(MAJOR_BYTES, b.len() as u64, out);
                out.extend_from_slice(b);
            }
            CborValue::Text(s) => {
                write_head(MAJOR_TEXT, s.len() as u64, out);
                out.extend_from_slice(s.as_bytes());
            }
            CborValue::Array(items) => {
                write_head(MAJOR_ARRAY, items.len() as u64, out);
                for item in items {
                    item.write(out);
                }
            }
            CborValue::Map(entries) => {
                write_head(MAJOR_MAP, entries.len() as u64, out);
                for (k, v) in entries {
                    k.write(out);
                    v.write(out);
                }
            }
            CborValue::Bool(false) => out.push(0xf4),
            CborValue::Bool(true) => out.push(0xf5),
            CborValue::Null => out.push(0xf6),
        }
    }
}

/// Major type and argument in the shortest form
fn write_head(major: u8, value: u64, out: &mut Vec<u8>) {
    let m = major << 5;
    if value < 24 {
        out.push(m | value as u8);
    } else if value <= 0xff {
        out.push(m | 24);
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(m | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= 0xffff_ffff {
        out.push(m | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(m | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc8949_vectors() {
        assert_eq!(CborValue::Unsigned(23).encode(), vec![0x17]);
        assert_eq!(CborValue::Unsigned(24).encode(), vec![0x18, 0x18]);
        assert_eq!(CborValue::Unsigned(1_000).encode(), vec![0x19, 0x03, 0xe8]);
        assert_eq!(
            CborValue::Unsigned(1_000_000).encode(),
            vec![0x1a, 0x00, 0x0f, 0x42, 0x40]
        );
        assert_eq!(
            CborValue::Unsigned(1_000_000_000_000).encode(),
            hex::decode("1b000000e8d4a51000").unwrap()
        );
        assert_eq!(CborValue::Text("a".into()).encode(), vec![0x61, 0x61]);
        assert_eq!(CborValue::Bytes(vec![1, 2, 3, 4]).encode(), vec![0x44, 1, 2, 3, 4]);
    }

    #[test]
    fn test_nested() {
        let value = CborValue::Array(vec![
            CborValue::Map(vec![(CborValue::Unsigned(0), CborValue::Array(vec![]))]),
            CborValue::Bool(true),
            CborValue::Null,
        ]);
        assert_eq!(value.encode(), vec![0x83, 0xa1, 0x00, 0x80, 0xf5, 0xf6]);
    }
}
