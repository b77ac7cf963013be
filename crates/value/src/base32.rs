//! Minimal unpadded base32 (RFC 4648 alphabet), used for [`crate::id::RecordId`]
//! text encoding. Grounded on the teacher's `value::base32` module, which
//! the same repo's document-id encoding (`id_v6.rs`) builds on; reimplemented
//! here directly over `u128` since we have no variable-length table-number
//! prefix to encode.

const ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buf: u32 = 0;
    let mut bits = 0u32;
    for &b in bytes {
        buf = (buf << 8) | b as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let idx = (buf >> bits) & 0x1f;
            out.push(ALPHABET[idx as usize] as char);
        }
    }
    if bits > 0 {
        let idx = (buf << (5 - bits)) & 0x1f;
        out.push(ALPHABET[idx as usize] as char);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid base32 character {0:?}")]
pub struct InvalidBase32Char(pub char);

pub fn decode(s: &str) -> Result<Vec<u8>, InvalidBase32Char> {
    let mut buf: u32 = 0;
    let mut bits = 0u32;
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    for c in s.chars() {
        let v = ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(InvalidBase32Char(c))? as u32;
        buf = (buf << 5) | v;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buf >> bits) & 0xff) as u8);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = encode(&bytes);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    proptest! {
        #[test]
        fn round_trips_any_byte_string(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let decoded = decode(&encode(&bytes)).unwrap();
            prop_assert_eq!(decoded, bytes);
        }
    }
}
