//! Recursive Length Prefix encoding

/// Minimal big-endian bytes of an unsigned integer (empty for zero)
pub fn trim_be(bytes: &[u8]) -> &[u8] {
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    &bytes[leading_zeros..]
}

pub fn encode_u64(val: u64) -> Vec<u8> {
    encode_bytes(trim_be(&val.to_be_bytes()))
}

pub fn encode_u128(val: u128) -> Vec<u8> {
    encode_bytes(trim_be(&val.to_be_bytes()))
}

pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    let mut result = length_prefix(0x80, data.len());
    result.extend_from_slice(data);
    result
}

/// List of already-encoded items
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = items.iter().map(Vec::len).sum();
    let mut result = length_prefix(0xc0, payload_len);
    for item in items {
        result.extend_from_slice(item);
    }
    result
}

fn length_prefix(offset: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        vec![offset + len as u8]
    } else {
        let len_bytes = trim_be(&len.to_be_bytes()).to_vec();
        let mut result = vec![offset + 55 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode_u64(0), vec![0x80]);
        assert_eq!(encode_u64(127), vec![127]);
        assert_eq!(encode_u64(128), vec![0x81, 128]);
        assert_eq!(encode_u64(256), vec![0x82, 1, 0]);
        assert_eq!(encode_u128(1_000_000_000_000_000_000), hex::decode("880de0b6b3a7640000").unwrap());
    }

    #[test]
    fn test_encode_bytes() {
        assert_eq!(encode_bytes(&[]), vec![0x80]);
        assert_eq!(encode_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(encode_bytes(&[1, 2, 3]), vec![0x83, 1, 2, 3]);
    }

    #[test]
    fn test_long_string_and_list() {
        let data = vec![0xaa; 60];
        let encoded = encode_bytes(&data);
        assert_eq!(&encoded[..2], &[0xb8, 60]);

        let list = encode_list(&[encoded.clone()]);
        assert_eq!(&list[..2], &[0xf8, 62]);
        assert_eq!(encode_list(&[]), vec![0xc0]);
    }
}
