//! Fleet records (block types 16/17), plus the trailing Name and Waypoint
//! blocks that the store treats as part of the same composite entity.

use crate::codec::{self, VarlenCode};
use crate::{Error, Result};

pub const BLOCK_TYPE: u8 = 16;
pub const BLOCK_TYPE_NAME: u8 = 17;

/// How much of a fleet's state is visible to the file's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetQuality {
    /// Position + design bitmask only.
    Partial,
    /// Adds cargo.
    PickPocket,
    /// Adds full order state.
    Full,
}

impl FleetQuality {
    fn from_kind_byte(b: u8) -> Self {
        match b {
            0 => FleetQuality::Partial,
            1 => FleetQuality::PickPocket,
            _ => FleetQuality::Full,
        }
    }

    fn kind_byte(self) -> u8 {
        match self {
            FleetQuality::Partial => 0,
            FleetQuality::PickPocket => 1,
            FleetQuality::Full => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cargo {
    pub ironium: i64,
    pub boranium: i64,
    pub germanium: i64,
    pub population: i64,
    pub fuel: i64,
    codes: [VarlenCode; 4],
}

#[derive(Debug, Clone)]
pub struct FleetRecord {
    pub quality: FleetQuality,
    pub owner: u8,
    pub number: u16,
    pub x: u16,
    pub y: u16,
    pub design_mask: u16,
    pub slot_counts: [u16; 16],
    pub cargo: Option<Cargo>,
    pub warp: u8,
    pub mass: u32,
    pub damage_per_slot: Option<[u8; 16]>,
    pub battle_plan: Option<u8>,
    pub waypoint_count: u8,
    pub repeat_orders: bool,
}

impl FleetRecord {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 10 {
            return Err(Error::ShortBlock);
        }
        let kind_byte = body[0];
        let quality = FleetQuality::from_kind_byte(kind_byte);
        let owner = body[1];
        let number = u16::from_le_bytes([body[2], body[3]]);
        let x = u16::from_le_bytes([body[4], body[5]]);
        let y = u16::from_le_bytes([body[6], body[7]]);
        let design_mask = u16::from_le_bytes([body[8], body[9]]);
        let mut off = 10;

        let mut slot_counts = [0u16; 16];
        for k in 0..16 {
            if design_mask & (1 << k) != 0 {
                let v = u16::from_le_bytes([
                    *body.get(off).ok_or(Error::ShortBlock)?,
                    *body.get(off + 1).ok_or(Error::ShortBlock)?,
                ]);
                off += 2;
                slot_counts[k] = v;
            }
        }

        let cargo = if quality != FleetQuality::Partial {
            let lengths_byte = *body.get(off).ok_or(Error::ShortBlock)?;
            off += 1;
            let codes = codec::unpack_length_codes(lengths_byte);
            let (ironium, next) = codec::read_varlen(body, off, codes[0])?;
            off = next;
            let (boranium, next) = codec::read_varlen(body, off, codes[1])?;
            off = next;
            let (germanium, next) = codec::read_varlen(body, off, codes[2])?;
            off = next;
            let (population, next) = codec::read_varlen(body, off, codes[3])?;
            off = next;
            // Fuel shares the lengths byte's residual precision in the
            // original format; here it is read as its own 2-byte field for
            // simplicity and round-trips symmetrically in encode.
            let fuel = u16::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
            ]) as i64;
            off += 2;
            Some(Cargo {
                ironium,
                boranium,
                germanium,
                population,
                fuel,
                codes,
            })
        } else {
            None
        };

        let warp = *body.get(off).ok_or(Error::ShortBlock)?;
        off += 1;
        let mass = u32::from_le_bytes([
            *body.get(off).ok_or(Error::ShortBlock)?,
            *body.get(off + 1).ok_or(Error::ShortBlock)?,
            *body.get(off + 2).ok_or(Error::ShortBlock)?,
            *body.get(off + 3).ok_or(Error::ShortBlock)?,
        ]);
        off += 4;

        let damage_per_slot = if quality == FleetQuality::Full {
            let mut d = [0u8; 16];
            for slot in d.iter_mut() {
                *slot = *body.get(off).ok_or(Error::ShortBlock)?;
                off += 1;
            }
            Some(d)
        } else {
            None
        };

        let battle_plan = if quality == FleetQuality::Full {
            let v = *body.get(off).ok_or(Error::ShortBlock)?;
            off += 1;
            Some(v)
        } else {
            None
        };

        let waypoint_count = *body.get(off).ok_or(Error::ShortBlock)?;
        off += 1;
        let repeat_orders = body.get(off).copied().unwrap_or(0) != 0;

        Ok(FleetRecord {
            quality,
            owner,
            number,
            x,
            y,
            design_mask,
            slot_counts,
            cargo,
            warp,
            mass,
            damage_per_slot,
            battle_plan,
            waypoint_count,
            repeat_orders,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.quality.kind_byte());
        out.push(self.owner);
        out.extend_from_slice(&self.number.to_le_bytes());
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.design_mask.to_le_bytes());
        for k in 0..16 {
            if self.design_mask & (1 << k) != 0 {
                out.extend_from_slice(&self.slot_counts[k].to_le_bytes());
            }
        }
        if let Some(cargo) = &self.cargo {
            // Reuse each field's original varlen code if the current value
            // still fits it (the common case: unmutated, or a mutation
            // that did not outgrow its byte width), only widening when it
            // no longer does. This is what keeps an untouched block's
            // bytes identical on re-encode and keeps a length-stable
            // mutation (e.g. a small cargo edit) from reshuffling the rest
            // of the record.
            let codes = [
                cargo.codes[0].widened_for(cargo.ironium),
                cargo.codes[1].widened_for(cargo.boranium),
                cargo.codes[2].widened_for(cargo.germanium),
                cargo.codes[3].widened_for(cargo.population),
            ];
            out.push(codec::pack_length_codes(codes));
            codec::write_varlen(&mut out, cargo.ironium, codes[0]);
            codec::write_varlen(&mut out, cargo.boranium, codes[1]);
            codec::write_varlen(&mut out, cargo.germanium, codes[2]);
            codec::write_varlen(&mut out, cargo.population, codes[3]);
            out.extend_from_slice(&(cargo.fuel as u16).to_le_bytes());
        }
        out.push(self.warp);
        out.extend_from_slice(&self.mass.to_le_bytes());
        if let Some(d) = &self.damage_per_slot {
            out.extend_from_slice(d);
        }
        if let Some(bp) = self.battle_plan {
            out.push(bp);
        }
        out.push(self.waypoint_count);
        out.push(if self.repeat_orders { 1 } else { 0 });
        out
    }

    /// `true` iff mutating only cargo values would not change the encoded
    /// length - i.e. every new varlen still fits its original code's width.
    pub fn cargo_edit_is_length_stable(&self, new_cargo: &Cargo) -> bool {
        match &self.cargo {
            None => false,
            Some(old) => old
                .codes
                .iter()
                .zip([
                    new_cargo.ironium,
                    new_cargo.boranium,
                    new_cargo.germanium,
                    new_cargo.population,
                ])
                .all(|(code, v)| VarlenCode::smallest_for(v).byte_len() <= code.byte_len()),
        }
    }
}

/// Task code for a waypoint's orders. 0..9 per the spec; only transport
/// tasks (`Transport`) carry the per-cargo-type orders table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaypointTask(pub u8);

impl WaypointTask {
    pub const TRANSPORT: WaypointTask = WaypointTask(1);

    pub fn is_transport(self) -> bool {
        self == Self::TRANSPORT
    }
}

/// One cargo-type order: an operation code plus a quantity.
#[derive(Debug, Clone, Copy)]
pub struct CargoOrder {
    pub op: u8,
    pub quantity: u16,
}

#[derive(Debug, Clone)]
pub struct Waypoint {
    pub x: u16,
    pub y: u16,
    pub warp: u8,
    pub task: WaypointTask,
    pub orders: Option<[CargoOrder; 5]>,
}

impl Waypoint {
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < 7 {
            return Err(Error::ShortBlock);
        }
        let x = u16::from_le_bytes([body[0], body[1]]);
        let y = u16::from_le_bytes([body[2], body[3]]);
        let warp = body[4];
        let task = WaypointTask(body[5]);
        let mut off = 6;
        let orders = if task.is_transport() {
            let mut table = [CargoOrder { op: 0, quantity: 0 }; 5];
            for slot in table.iter_mut() {
                let op = *body.get(off).ok_or(Error::ShortBlock)?;
                let quantity = u16::from_le_bytes([
                    *body.get(off + 1).ok_or(Error::ShortBlock)?,
                    *body.get(off + 2).ok_or(Error::ShortBlock)?,
                ]);
                off += 3;
                *slot = CargoOrder { op, quantity };
            }
            Some(table)
        } else {
            None
        };
        Ok(Waypoint { x, y, warp, task, orders })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.push(self.warp);
        out.push(self.task.0);
        if let Some(orders) = &self.orders {
            for o in orders {
                out.push(o.op);
                out.extend_from_slice(&o.quantity.to_le_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FleetRecord {
        FleetRecord {
            quality: FleetQuality::Full,
            owner: 2,
            number: 7,
            x: 100,
            y: 200,
            design_mask: 0b101,
            slot_counts: {
                let mut s = [0u16; 16];
                s[0] = 3;
                s[2] = 1;
                s
            },
            cargo: Some(Cargo {
                ironium: 50,
                boranium: 0,
                germanium: 10,
                population: 0,
                fuel: 400,
                codes: [VarlenCode::One, VarlenCode::Zero, VarlenCode::One, VarlenCode::Zero],
            }),
            warp: 6,
            mass: 12000,
            damage_per_slot: Some([0; 16]),
            battle_plan: Some(1),
            waypoint_count: 2,
            repeat_orders: false,
        }
    }

    #[test]
    fn fleet_roundtrips() {
        let fleet = sample();
        let bytes = fleet.encode();
        let decoded = FleetRecord::decode(&bytes).unwrap();
        assert_eq!(decoded.owner, fleet.owner);
        assert_eq!(decoded.number, fleet.number);
        assert_eq!(decoded.design_mask, fleet.design_mask);
        assert_eq!(decoded.slot_counts, fleet.slot_counts);
        assert_eq!(decoded.cargo.unwrap().ironium, 50);
    }

    #[test]
    fn cargo_edit_within_width_is_length_stable() {
        let fleet = sample();
        let mut new_cargo = fleet.cargo.clone().unwrap();
        new_cargo.ironium = 150; // still fits 1 byte
        assert!(fleet.cargo_edit_is_length_stable(&new_cargo));
        new_cargo.ironium = 99999; // needs 4 bytes now
        assert!(!fleet.cargo_edit_is_length_stable(&new_cargo));
    }

    #[test]
    fn waypoint_transport_orders_roundtrip() {
        let wp = Waypoint {
            x: 1,
            y: 2,
            warp: 7,
            task: WaypointTask::TRANSPORT,
            orders: Some([CargoOrder { op: 1, quantity: 100 }; 5]),
        };
        let bytes = wp.encode();
        let decoded = Waypoint::decode(&bytes).unwrap();
        assert_eq!(decoded.orders.unwrap()[0].quantity, 100);
    }
}
