//! Unsigned big-endian integers of arbitrary length.
//!
//! Sharded structures store numeric keys and token amounts as raw
//! big-endian byte strings. Every byte string is read as an unsigned
//! integer of its own length; nothing is validated.

/// Render big-endian bytes as an unsigned decimal string.
///
/// An empty slice is zero.
pub fn decimal_from_be_bytes(bytes: &[u8]) -> String {
    const LIMB: u64 = 1_000_000_000;

    // Little-endian base-1e9 limbs.
    let mut limbs: Vec<u32> = Vec::new();
    for &byte in bytes {
        let mut carry = byte as u64;
        for limb in limbs.iter_mut() {
            let acc = ((*limb as u64) << 8) | carry;
            *limb = (acc % LIMB) as u32;
            carry = acc / LIMB;
        }
        if carry > 0 {
            limbs.push(carry as u32);
        }
    }

    let Some((last, rest)) = limbs.split_last() else {
        return "0".to_string();
    };
    let mut out = last.to_string();
    for limb in rest.iter().rev() {
        out.push_str(&format!("{limb:09}"));
    }
    out
}

/// Interpret big-endian bytes as a `u64`, ignoring leading zero bytes.
///
/// Returns `None` when the value does not fit.
pub fn u64_from_be_bytes(bytes: &[u8]) -> Option<u64> {
    let significant = &bytes[bytes.iter().take_while(|&&b| b == 0).count()..];
    if significant.len() > 8 {
        return None;
    }
    Some(significant.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}
