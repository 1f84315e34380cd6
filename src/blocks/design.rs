//! Design records (block type 26) and design-change records (block type
//! 27), with the two known-bug detection heuristics recorded on decode.

use crate::{Error, Result};

pub const BLOCK_TYPE: u8 = 26;
pub const BLOCK_TYPE_CHANGE: u8 = 27;

#[derive(Debug, Clone, Copy)]
pub struct ComponentSlot {
    pub category: u16,
    pub item_id: u8,
    pub count: u8,
}

/// Set when a decoded design matches a known data-entry bug in the
/// original game. Recorded, never corrected - re-encoding must preserve
/// the bytes that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignBug {
    /// A slot with `(category=0x1000, item_id=0, count=0)`.
    ColonizerModule,
    /// A starbase on hull 33 with a slot `(category=8, item_id=11,
    /// count>=22)` and `armor>=49518`.
    SpaceDock,
}

#[derive(Debug, Clone)]
pub struct FullDesignBody {
    pub armor: u16,
    pub slot_count: u8,
    pub turn_designed: u16,
    pub total_built: u32,
    pub total_remaining: u32,
    pub slots: Vec<ComponentSlot>,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DesignRecord {
    pub full: bool,
    pub slot: u8,
    pub starbase: bool,
    pub transferred: bool,
    pub hull_id: u8,
    pub picture_id: u8,
    pub body: Option<FullDesignBody>,
    pub bugs: Vec<DesignBug>,
}

impl DesignRecord {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 4 {
            return Err(Error::ShortBlock);
        }
        let byte0 = body[0];
        if byte0 & 0b11 != 0b11 {
            return Err(Error::Parse("design record control bits must be 11"));
        }
        let full = byte0 & 0b100 != 0;
        let hull_id = body[1];
        let picture_id = body[2];
        let byte3 = body[3];
        if byte3 & 1 != 1 {
            return Err(Error::Parse("design record byte 1 low bit must be set"));
        }
        let slot = (byte3 >> 1) & 0x0F;
        let starbase = byte3 & 0x40 != 0;
        let transferred = byte3 & 0x80 != 0;

        let mut off = 4;
        let mut full_body = None;
        if full {
            let armor = u16::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
            ]);
            off += 2;
            let slot_count = *body.get(off).ok_or(Error::ShortBlock)?;
            off += 1;
            let turn_designed = u16::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
            ]);
            off += 2;
            let total_built = u32::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
                *body.get(off + 3).ok_or(Error::ShortBlock)?,
            ]);
            off += 4;
            let total_remaining = u32::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
                *body.get(off + 3).ok_or(Error::ShortBlock)?,
            ]);
            off += 4;
            let mut slots = Vec::with_capacity(slot_count as usize);
            for _ in 0..slot_count {
                let category = u16::from_le_bytes([
                    *body.get(off).ok_or(Error::ShortBlock)?,
                    *body.get(off + 1).ok_or(Error::ShortBlock)?,
                ]);
                let item_id = *body.get(off + 2).ok_or(Error::ShortBlock)?;
                let count = *body.get(off + 3).ok_or(Error::ShortBlock)?;
                off += 4;
                slots.push(ComponentSlot {
                    category,
                    item_id,
                    count,
                });
            }
            let name_len = *body.get(off).ok_or(Error::ShortBlock)? as usize;
            off += 1;
            let name = crate::codec::decode_stars_string(body, off, name_len)?;

            let mut bugs = Vec::new();
            if slots
                .iter()
                .any(|s| s.category == 0x1000 && s.item_id == 0 && s.count == 0)
            {
                bugs.push(DesignBug::ColonizerModule);
            }
            if hull_id == 33
                && starbase
                && armor >= 49518
                && slots
                    .iter()
                    .any(|s| s.category == 8 && s.item_id == 11 && s.count >= 22)
            {
                bugs.push(DesignBug::SpaceDock);
            }

            full_body = Some(FullDesignBody {
                armor,
                slot_count,
                turn_designed,
                total_built,
                total_remaining,
                slots,
                name,
            });
            return Ok(DesignRecord {
                full,
                slot,
                starbase,
                transferred,
                hull_id,
                picture_id,
                body: full_body,
                bugs,
            });
        }

        Ok(DesignRecord {
            full,
            slot,
            starbase,
            transferred,
            hull_id,
            picture_id,
            body: full_body,
            bugs: Vec::new(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let byte0 = 0b11 | if self.full { 0b100 } else { 0 };
        out.push(byte0);
        out.push(self.hull_id);
        out.push(self.picture_id);
        let byte3 = 1
            | ((self.slot & 0x0F) << 1)
            | if self.starbase { 0x40 } else { 0 }
            | if self.transferred { 0x80 } else { 0 };
        out.push(byte3);
        if let Some(b) = &self.body {
            out.extend_from_slice(&b.armor.to_le_bytes());
            out.push(b.slot_count);
            out.extend_from_slice(&b.turn_designed.to_le_bytes());
            out.extend_from_slice(&b.total_built.to_le_bytes());
            out.extend_from_slice(&b.total_remaining.to_le_bytes());
            for s in &b.slots {
                out.extend_from_slice(&s.category.to_le_bytes());
                out.push(s.item_id);
                out.push(s.count);
            }
            let packed_name = crate::codec::encode_stars_string(&b.name);
            out.push(packed_name.len() as u8);
            out.extend_from_slice(&packed_name);
        }
        out
    }
}

/// Design-change record (type 27): either a deletion (low nibble of the
/// first prefix byte is zero) carrying only the starbase flag and design
/// slot, or a wrapped design body.
#[derive(Debug, Clone)]
pub enum DesignChange {
    Delete { starbase: bool, slot: u8 },
    Replace(DesignRecord),
}

impl DesignChange {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 2 {
            return Err(Error::ShortBlock);
        }
        let prefix0 = body[0];
        if prefix0 & 0x0F == 0 {
            let starbase = body[1] & 0x40 != 0;
            let slot = (body[1] >> 1) & 0x0F;
            Ok(DesignChange::Delete { starbase, slot })
        } else {
            Ok(DesignChange::Replace(DesignRecord::decode(&body[2..])?))
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            DesignChange::Delete { starbase, slot } => {
                let mut out = vec![0u8];
                out.push(((slot & 0x0F) << 1) | if *starbase { 0x40 } else { 0 });
                out
            }
            DesignChange::Replace(design) => {
                let mut out = vec![0x01, 0x00];
                out.extend_from_slice(&design.encode());
                out
            }
        }
    }
}
