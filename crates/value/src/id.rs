//! Record identifiers: opaque 128-bit values chosen uniformly at random by
//! the store on creation (spec §3). Grounded on the teacher's
//! `value::id_v6` module, which gives each id a stable text encoding so ids
//! can travel through logs and client code; we drop its variable-length
//! table-number prefix and checksum footer since this core has no table
//! numbering scheme, keeping only the "fixed-width bytes, base32 text form"
//! shape.
use std::{fmt, str::FromStr};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::base32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(u128);

impl RecordId {
    /// Generate a fresh id, chosen uniformly at random.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        RecordId(rng.next_u64() as u128 | ((rng.next_u64() as u128) << 64))
    }

    pub fn from_u128(v: u128) -> Self {
        RecordId(v)
    }

    pub fn as_u128(self) -> u128 {
        self.0
    }

    pub fn encode(&self) -> String {
        base32::encode(&self.0.to_be_bytes())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdDecodeError {
    #[error("invalid record id encoding: {0}")]
    InvalidBase32(#[from] base32::InvalidBase32Char),
    #[error("invalid record id length {0}")]
    InvalidLength(usize),
}

impl FromStr for RecordId {
    type Err = IdDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = base32::decode(s)?;
        let bytes: [u8; 16] = bytes
            .get(..16)
            .and_then(|b| b.try_into().ok())
            .ok_or(IdDecodeError::InvalidLength(bytes.len()))?;
        Ok(RecordId(u128::from_be_bytes(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_round_trip_through_text() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);

        let text = a.encode();
        let parsed: RecordId = text.parse().unwrap();
        assert_eq!(a, parsed);
    }
}
