//! Unsigned LEB128 varints as used by multiformats and Filecoin.

use crate::error::{TypeError, TypeResult};

/// Append `value` to `buf` as an unsigned varint.
pub fn encode_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode an unsigned varint. Returns (value, bytes_consumed).
pub fn decode_uvarint(data: &[u8]) -> TypeResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        if shift == 63 && byte > 1 {
            return Err(TypeError::InvalidVarint("overflow"));
        }
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(TypeError::InvalidVarint("not minimally encoded"));
            }
            return Ok((value, i + 1));
        }
        shift += 7;
        if shift > 63 {
            return Err(TypeError::InvalidVarint("overflow"));
        }
    }
    Err(TypeError::InvalidVarint("truncated"))
}
