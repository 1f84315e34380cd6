//! The remaining ~30 block types: production queues, battle plans,
//! messages, and other bookkeeping blocks whose layout is documented but
//! holds no further novel mechanics, plus the handful of block types with
//! no known layout at all.

use crate::{Error, Result};

/// Block types with no documented layout. Decoded and re-encoded as opaque
/// byte slices only; never interpreted.
pub const UNDOCUMENTED_TYPES: &[u8] = &[36, 38, 39];

/// Numeric codes for the "other ~30" bookkeeping block types that spec
/// section 4.4.8 describes by name but does not number explicitly. These
/// assignments are this crate's own allocation (documented in
/// `DESIGN.md`), not a reverse-engineered constant.
pub const BLOCK_TYPE_PRODUCTION_QUEUE: u8 = 20;
pub const BLOCK_TYPE_BATTLE_PLAN: u8 = 22;
pub const BLOCK_TYPE_MESSAGE: u8 = 24;

/// One production-queue item: a 4-byte packed record.
#[derive(Debug, Clone, Copy)]
pub struct ProductionQueueItem {
    pub item_id: u8,
    pub count: u16,
    pub percent_complete: u16,
    pub item_type: u8,
}

impl ProductionQueueItem {
    pub fn decode(bytes: [u8; 4]) -> Self {
        let word = u32::from_le_bytes(bytes);
        ProductionQueueItem {
            item_id: (word & 0x3F) as u8,
            count: ((word >> 6) & 0x3FF) as u16,
            percent_complete: ((word >> 16) & 0xFFF) as u16,
            item_type: ((word >> 28) & 0x0F) as u8,
        }
    }

    pub fn encode(&self) -> [u8; 4] {
        let word = (self.item_id as u32 & 0x3F)
            | ((self.count as u32 & 0x3FF) << 6)
            | ((self.percent_complete as u32 & 0xFFF) << 16)
            | ((self.item_type as u32 & 0x0F) << 28);
        word.to_le_bytes()
    }
}

/// Production queue block: keyed by planet number, no owner in the key.
#[derive(Debug, Clone)]
pub struct ProductionQueueBlock {
    pub planet_number: u16,
    pub items: Vec<ProductionQueueItem>,
}

impl ProductionQueueBlock {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 2 {
            return Err(Error::ShortBlock);
        }
        let planet_number = u16::from_le_bytes([body[0], body[1]]);
        let rest = &body[2..];
        if rest.len() % 4 != 0 {
            return Err(Error::Parse("production queue body not a multiple of 4"));
        }
        let items = rest
            .chunks_exact(4)
            .map(|c| ProductionQueueItem::decode([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(ProductionQueueBlock {
            planet_number,
            items,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.planet_number.to_le_bytes().to_vec();
        for item in &self.items {
            out.extend_from_slice(&item.encode());
        }
        out
    }
}

/// Battle plan block: bit-packed targeting/tactic selections plus a name.
#[derive(Debug, Clone)]
pub struct BattlePlan {
    pub owner: u8,
    pub plan_slot: u8,
    pub primary_target: u8,
    pub secondary_target: u8,
    pub tactic: u8,
    pub attack_who: u8,
    pub name: String,
}

impl BattlePlan {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 4 {
            return Err(Error::ShortBlock);
        }
        let owner = body[0];
        let plan_slot = body[1];
        let packed = body[2];
        let primary_target = packed & 0x0F;
        let secondary_target = (packed >> 4) & 0x0F;
        let packed2 = body[3];
        let tactic = packed2 & 0x0F;
        let attack_who = (packed2 >> 4) & 0x0F;
        let name_len = *body.get(4).unwrap_or(&0) as usize;
        let name = if name_len > 0 {
            crate::codec::decode_stars_string(body, 5, name_len)?
        } else {
            String::new()
        };
        Ok(BattlePlan {
            owner,
            plan_slot,
            primary_target,
            secondary_target,
            tactic,
            attack_who,
            name,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![
            self.owner,
            self.plan_slot,
            (self.primary_target & 0x0F) | ((self.secondary_target & 0x0F) << 4),
            (self.tactic & 0x0F) | ((self.attack_who & 0x0F) << 4),
        ];
        let packed_name = crate::codec::encode_stars_string(&self.name);
        out.push(packed_name.len() as u8);
        out.extend_from_slice(&packed_name);
        out
    }
}

/// Message block: sender, receiver (0 = broadcast), text body. `text` is
/// kept as raw bytes rather than a `String`: the body is not guaranteed to
/// be valid UTF-8 and a lossy conversion would corrupt the byte-for-byte
/// round-trip for any message containing a byte outside that encoding.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: u8,
    pub receiver: u8,
    pub text: Vec<u8>,
}

impl Message {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 2 {
            return Err(Error::ShortBlock);
        }
        let sender = body[0];
        let receiver = body[1];
        let text = body[2..].to_vec();
        Ok(Message {
            sender,
            receiver,
            text,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.sender, self.receiver];
        out.extend_from_slice(&self.text);
        out
    }
}

/// Packet warp is encoded compactly: `raw = (warp - 5) * 4 + 196`, with the
/// low 2 bits always zero.
pub fn encode_packet_warp(warp: u8) -> u8 {
    ((warp.wrapping_sub(5) as i16) * 4 + 196) as u8
}

pub fn decode_packet_warp(raw: u8) -> u8 {
    (((raw as i16 - 196) / 4) + 5) as u8
}

/// Any block type this crate has no dedicated decoder for (the ~30
/// "bookkeeping" types from `4.4.8`, plus [`UNDOCUMENTED_TYPES`]). Carries
/// the raw decrypted body untouched so the regenerator can re-emit it
/// verbatim without ever having interpreted it.
#[derive(Debug, Clone)]
pub struct Opaque {
    pub kind: u8,
    pub body: Vec<u8>,
}

impl Opaque {
    pub fn decode(kind: u8, body: &[u8]) -> Self {
        Opaque {
            kind,
            body: body.to_vec(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_queue_item_roundtrips() {
        let item = ProductionQueueItem {
            item_id: 12,
            count: 500,
            percent_complete: 1000,
            item_type: 3,
        };
        let bytes = item.encode();
        let decoded = ProductionQueueItem::decode(bytes);
        assert_eq!(decoded.item_id, 12);
        assert_eq!(decoded.count, 500);
        assert_eq!(decoded.percent_complete, 1000);
        assert_eq!(decoded.item_type, 3);
    }

    #[test]
    fn battle_plan_roundtrips() {
        let plan = BattlePlan {
            owner: 3,
            plan_slot: 1,
            primary_target: 2,
            secondary_target: 4,
            tactic: 1,
            attack_who: 7,
            name: "DEFEND".to_string(),
        };
        let bytes = plan.encode();
        let decoded = BattlePlan::decode(&bytes).unwrap();
        assert_eq!(decoded.owner, 3);
        assert_eq!(decoded.name, "DEFEND");
    }

    #[test]
    fn message_roundtrips() {
        let msg = Message {
            sender: 1,
            receiver: 0,
            text: b"hello".to_vec(),
        };
        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.text, b"hello");
        assert_eq!(decoded.receiver, 0);
    }

    #[test]
    fn message_with_non_utf8_byte_roundtrips_exactly() {
        let bytes = vec![1, 0, b'h', b'i', 0xFF, b'!'];
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn packet_warp_roundtrips() {
        for warp in 5u8..=10 {
            let raw = encode_packet_warp(warp);
            assert_eq!(raw & 0b11, 0);
            assert_eq!(decode_packet_warp(raw), warp);
        }
    }

    #[test]
    fn opaque_block_preserves_bytes() {
        let body = vec![1, 2, 3, 4, 5];
        let op = Opaque::decode(36, &body);
        assert_eq!(op.encode(), body);
    }
}
