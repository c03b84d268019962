//! XRP Ledger binary format primitives

pub const TYPE_UINT16: u8 = 1;
pub const TYPE_UINT32: u8 = 2;
pub const TYPE_AMOUNT: u8 = 6;
pub const TYPE_BLOB: u8 = 7;
pub const TYPE_ACCOUNT_ID: u8 = 8;
pub const TYPE_OBJECT: u8 = 14;
pub const TYPE_ARRAY: u8 = 15;

/// Marks the end of an inner object
pub const OBJECT_END: u8 = 0xE1;
/// Marks the end of an array
pub const ARRAY_END: u8 = 0xF1;

/// Largest amount of drops an XRP amount can carry
pub const MAX_DROPS: u64 = 100_000_000_000_000_000;

/// Field header: type code and field code, each packed into a nibble when small
pub fn field_id(type_code: u8, field_code: u8) -> Vec<u8> {
    match (type_code < 16, field_code < 16) {
        (true, true) => vec![(type_code << 4) | field_code],
        (true, false) => vec![type_code << 4, field_code],
        (false, true) => vec![field_code, type_code],
        (false, false) => vec![0, type_code, field_code],
    }
}

/// Variable-length prefix
pub fn encode_vl(data: &[u8], out: &mut Vec<u8>) {
    let len = data.len();
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let l = len - 193;
        out.push(193 + (l >> 8) as u8);
        out.push((l & 0xff) as u8);
    } else {
        let l = len - 12_481;
        out.push(241 + (l >> 16) as u8);
        out.push(((l >> 8) & 0xff) as u8);
        out.push((l & 0xff) as u8);
    }
    out.extend_from_slice(data);
}

/// Native XRP amount: "not IOU" bit clear, positive bit set
pub fn encode_xrp_amount(drops: u64) -> [u8; 8] {
    (0x4000_0000_0000_0000 | drops).to_be_bytes()
}
