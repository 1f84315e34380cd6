//! Object records: minefields, packets, wormholes, and mystery traders,
//! distinguished by the top 3 bits of the 16-bit object id word.

use crate::{Error, Result};

/// This crate's own allocation for object records (minefield, packet,
/// salvage, wormhole, mystery trader), documented in `DESIGN.md`; spec
/// section 4.4.8 names the layout but assigns it no block-type number.
pub const BLOCK_TYPE: u8 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSubtype {
    Minefield,
    Packet,
    Salvage,
    Wormhole,
    MysteryTrader,
}

fn subtype_from_bits(bits: u8, salvage: bool) -> ObjectSubtype {
    match bits {
        0 => ObjectSubtype::Minefield,
        1 if salvage => ObjectSubtype::Salvage,
        1 => ObjectSubtype::Packet,
        2 => ObjectSubtype::Wormhole,
        _ => ObjectSubtype::MysteryTrader,
    }
}

fn subtype_bits(subtype: ObjectSubtype) -> u8 {
    match subtype {
        ObjectSubtype::Minefield => 0,
        ObjectSubtype::Packet | ObjectSubtype::Salvage => 1,
        ObjectSubtype::Wormhole => 2,
        ObjectSubtype::MysteryTrader => 3,
    }
}

#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub owner: u8,
    pub number: u16,
    pub subtype: ObjectSubtype,
    pub x: u16,
    pub y: u16,
    /// Remaining bytes, interpreted per subtype by higher-level tooling;
    /// this crate preserves them without further decoding.
    pub payload: Vec<u8>,
}

impl ObjectRecord {
    pub fn decode(owner: u8, body: &[u8]) -> Result<Self> {
        if body.len() < 8 {
            return Err(Error::ShortBlock);
        }
        let id_word = u16::from_le_bytes([body[0], body[1]]);
        let number = id_word & 0x1FFF;
        let subtype_raw = (id_word >> 13) as u8 & 0b111;
        let x = u16::from_le_bytes([body[2], body[3]]);
        let y = u16::from_le_bytes([body[4], body[5]]);
        let salvage = subtype_raw == 1 && body[6] == 0xFF;
        let subtype = subtype_from_bits(subtype_raw, salvage);
        Ok(ObjectRecord {
            owner,
            number,
            subtype,
            x,
            y,
            payload: body[6..].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let id_word = (self.number & 0x1FFF) | ((subtype_bits(self.subtype) as u16) << 13);
        let mut out = id_word.to_le_bytes().to_vec();
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode a full block body where the owner is carried as a leading
    /// byte ahead of the id word, as [`super::BLOCK_TYPE`] blocks store it.
    pub fn decode_block(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Err(Error::ShortBlock);
        }
        Self::decode(body[0], &body[1..])
    }

    /// Inverse of [`Self::decode_block`]: owner byte followed by [`Self::encode`].
    pub fn encode_block(&self) -> Vec<u8> {
        let mut out = vec![self.owner];
        out.extend_from_slice(&self.encode());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_salvage_distinguished_by_sentinel_byte() {
        let mut packet = ObjectRecord {
            owner: 1,
            number: 5,
            subtype: ObjectSubtype::Packet,
            x: 10,
            y: 20,
            payload: vec![0xFF, 1, 2],
        };
        let bytes = packet.encode();
        let decoded = ObjectRecord::decode(1, &bytes).unwrap();
        assert_eq!(decoded.subtype, ObjectSubtype::Salvage);

        packet.payload = vec![0x00, 1, 2];
        let bytes = packet.encode();
        let decoded = ObjectRecord::decode(1, &bytes).unwrap();
        assert_eq!(decoded.subtype, ObjectSubtype::Packet);
    }

    #[test]
    fn wormhole_roundtrips() {
        let wh = ObjectRecord {
            owner: 31,
            number: 7,
            subtype: ObjectSubtype::Wormhole,
            x: 1,
            y: 2,
            payload: vec![9, 9],
        };
        let bytes = wh.encode();
        let decoded = ObjectRecord::decode(31, &bytes).unwrap();
        assert_eq!(decoded.subtype, ObjectSubtype::Wormhole);
        assert_eq!(decoded.number, 7);
    }

    #[test]
    fn block_form_carries_owner_as_leading_byte() {
        let mf = ObjectRecord {
            owner: 4,
            number: 12,
            subtype: ObjectSubtype::Minefield,
            x: 100,
            y: 200,
            payload: vec![3, 3, 3],
        };
        let bytes = mf.encode_block();
        let decoded = ObjectRecord::decode_block(&bytes).unwrap();
        assert_eq!(decoded.owner, 4);
        assert_eq!(decoded.number, 12);
        assert_eq!(decoded.subtype, ObjectSubtype::Minefield);
    }
}
