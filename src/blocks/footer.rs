//! File footer (block type 0). Unencrypted; payload is 0 or 2 bytes and its
//! meaning is role-specific.

use crate::Result;

pub const BLOCK_TYPE: u8 = 0;

/// Role-specific footer payload, decoded from its 0 or 2 trailing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    /// M-file: repeats the header's turn number.
    Turn(u16),
    /// XY-file: number of players in the universe.
    PlayerCount(u16),
    /// R-file: checksum over the player block and race names.
    RaceChecksum(u16),
    /// X-file, H-file: no footer payload.
    None,
}

impl Footer {
    pub fn decode(role: FooterRole, body: &[u8]) -> Self {
        let value = if body.len() >= 2 {
            Some(u16::from_le_bytes([body[0], body[1]]))
        } else {
            None
        };
        match (role, value) {
            (FooterRole::PlayerResult, Some(v)) => Footer::Turn(v),
            (FooterRole::Universe, Some(v)) => Footer::PlayerCount(v),
            (FooterRole::RaceBuilder, Some(v)) => Footer::RaceChecksum(v),
            _ => Footer::None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Footer::Turn(v) | Footer::PlayerCount(v) | Footer::RaceChecksum(v) => {
                v.to_le_bytes().to_vec()
            }
            Footer::None => Vec::new(),
        }
    }
}

/// File role, as implied by the extension (see [`crate::file::FileRole`]);
/// duplicated here in miniature so footer decoding does not depend on the
/// whole `file` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterRole {
    PlayerResult,
    PlayerOrders,
    PlayerHistory,
    Universe,
    RaceBuilder,
    HostMaster,
}

/// Compute the R-file footer checksum per the race-builder checksum rule:
/// pad each of the singular/plural race names to 15 ASCII bytes prefixed
/// with a zero byte (16 bytes total each), append interleaved 2-byte pairs
/// from singular and plural onto a copy of the player block body, then XOR
/// even-indexed bytes into `cs1` and odd-indexed bytes into `cs2`; the
/// footer is `(cs2 << 8) | cs1`.
pub fn race_checksum(player_block_body: &[u8], singular: &str, plural: &str) -> Result<u16> {
    let pad_name = |name: &str| -> [u8; 16] {
        let mut padded = [0u8; 16];
        let bytes = name.as_bytes();
        let n = bytes.len().min(15);
        padded[1..1 + n].copy_from_slice(&bytes[..n]);
        padded
    };
    let sing = pad_name(singular);
    let plur = pad_name(plural);

    let mut buffer = player_block_body.to_vec();
    for i in 0..8 {
        buffer.push(sing[2 * i]);
        buffer.push(sing[2 * i + 1]);
        buffer.push(plur[2 * i]);
        buffer.push(plur[2 * i + 1]);
    }

    let mut cs1: u8 = 0;
    let mut cs2: u8 = 0;
    for (i, &b) in buffer.iter().enumerate() {
        if i % 2 == 0 {
            cs1 ^= b;
        } else {
            cs2 ^= b;
        }
    }
    Ok(((cs2 as u16) << 8) | cs1 as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        let body = vec![1u8, 2, 3, 4, 5];
        let a = race_checksum(&body, "Humanoid", "Humanoids").unwrap();
        let b = race_checksum(&body, "Humanoid", "Humanoids").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn checksum_sensitive_to_names() {
        let body = vec![1u8, 2, 3, 4, 5];
        let a = race_checksum(&body, "Humanoid", "Humanoids").unwrap();
        let b = race_checksum(&body, "Insectoid", "Insectoids").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn footer_turn_roundtrip() {
        let f = Footer::Turn(42);
        let body = f.encode();
        assert_eq!(Footer::decode(FooterRole::PlayerResult, &body), f);
    }
}
