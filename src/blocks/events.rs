//! Events block (type 12): a concatenation of variable-length records,
//! each led by a 1-byte discriminator and a 1-byte scope flag.

use crate::{Error, Result};

pub const BLOCK_TYPE: u8 = 12;

/// Sentinel planet id for player-global events with no associated planet.
pub const NO_PLANET: u16 = 0xFFFE;
/// Sentinel location marker meaning "deep space".
pub const DEEP_SPACE: u16 = 0xFFFA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    PlanetLocal,
    PlayerGlobal,
}

#[derive(Debug, Clone)]
pub enum EventBody {
    PopulationChange { planet_id: u16, amount: i16 },
    DefensesBuilt { planet_id: u16 },
    FactoriesBuilt { planet_id: u16, count: u16 },
    MineralAlchemy { planet_id: u16 },
    MinesBuilt { planet_id: u16, count: u16 },
    QueueEmpty { planet_id: u16 },
    ResearchComplete { level: u8, field: u8, next_field: u8 },
    TerraformablePlanetFound { planet_ref: u16, growth_raw: u16 },
    TechBenefit { category: u8, item_id: u8, extra: u16 },
    PacketProduced { source: u16, destination: u16 },
    PacketCaptured { planet_id: u16, tonnage: u16 },
    PacketBombardment { planet_id: u16, tonnage: u16, colonists_killed: u32 },
    CometStrike { planet_id: u16 },
    StrangeArtifact { planet_id: u16, field: u8, boost: u16 },
    NewColony { planet_id: u16 },
    FleetScrapped { planet_id: u16, fleet_index: u16, tonnage_div7: u16 },
    FleetScrappedInSpace { object_ref: u16 },
    BattleOccurred { planet_id: u16, outcome: u8, forces: u16, losses: u16 },
    StarbaseBuilt { planet_id: u16, design_ref: u8 },
    /// A discriminator this decoder does not assign meaning to. The raw
    /// bytes are kept so the writer can emit them untouched.
    Unknown { discriminator: u8, raw: Vec<u8> },
}

impl EventBody {
    /// Terraformable planet growth is encoded as `value / 332 = percent`.
    pub fn terraformable_growth_percent(growth_raw: u16) -> f64 {
        growth_raw as f64 / 332.0
    }
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub discriminator: u8,
    pub scope: EventScope,
    pub body: EventBody,
}

fn u16le(body: &[u8], off: usize) -> Result<u16> {
    Ok(u16::from_le_bytes([
        *body.get(off).ok_or(Error::ShortBlock)?,
        *body.get(off + 1).ok_or(Error::ShortBlock)?,
    ]))
}

impl EventRecord {
    /// Decode one event record starting at `offset`; returns the record and
    /// the offset of the next one.
    pub fn decode_one(body: &[u8], offset: usize) -> Result<(Self, usize)> {
        let discriminator = *body.get(offset).ok_or(Error::ShortBlock)?;
        let flags = *body.get(offset + 1).ok_or(Error::ShortBlock)?;
        let scope = if flags == 0xFF {
            EventScope::PlayerGlobal
        } else {
            EventScope::PlanetLocal
        };
        let data_start = offset + 2;
        let (ev_body, len): (EventBody, usize) = match discriminator {
            0x26 => (
                EventBody::PopulationChange {
                    planet_id: u16le(body, data_start)?,
                    amount: u16le(body, data_start + 2)? as i16,
                },
                4,
            ),
            0x35 => (
                EventBody::DefensesBuilt {
                    planet_id: u16le(body, data_start)?,
                },
                2,
            ),
            0x36 => (
                EventBody::FactoriesBuilt {
                    planet_id: u16le(body, data_start)?,
                    count: u16le(body, data_start + 2)?,
                },
                4,
            ),
            0x37 => (
                EventBody::MineralAlchemy {
                    planet_id: u16le(body, data_start)?,
                },
                2,
            ),
            0x38 => (
                EventBody::MinesBuilt {
                    planet_id: u16le(body, data_start)?,
                    count: u16le(body, data_start + 2)?,
                },
                4,
            ),
            0x3E => (
                EventBody::QueueEmpty {
                    planet_id: u16le(body, data_start)?,
                },
                2,
            ),
            0x50 => {
                let _no_planet = u16le(body, data_start)?; // always NO_PLANET
                (
                    EventBody::ResearchComplete {
                        level: *body.get(data_start + 2).ok_or(Error::ShortBlock)?,
                        field: *body.get(data_start + 3).ok_or(Error::ShortBlock)?,
                        next_field: *body.get(data_start + 4).ok_or(Error::ShortBlock)?,
                    },
                    5,
                )
            }
            0x57 => (
                EventBody::TerraformablePlanetFound {
                    planet_ref: u16le(body, data_start)?,
                    growth_raw: u16le(body, data_start + 2)?,
                },
                4,
            ),
            0x5F => (
                EventBody::TechBenefit {
                    category: *body.get(data_start).ok_or(Error::ShortBlock)?,
                    item_id: *body.get(data_start + 1).ok_or(Error::ShortBlock)?,
                    extra: u16le(body, data_start + 2)?,
                },
                4,
            ),
            0xD3 => (
                EventBody::PacketProduced {
                    source: u16le(body, data_start)?,
                    destination: u16le(body, data_start + 2)?,
                },
                4,
            ),
            0xD5 => (
                EventBody::PacketCaptured {
                    planet_id: u16le(body, data_start)?,
                    tonnage: u16le(body, data_start + 2)?,
                },
                4,
            ),
            0xD8 => (
                EventBody::PacketBombardment {
                    planet_id: u16le(body, data_start)?,
                    tonnage: u16le(body, data_start + 2)?,
                    colonists_killed: u32::from_le_bytes([
                        *body.get(data_start + 4).ok_or(Error::ShortBlock)?,
                        *body.get(data_start + 5).ok_or(Error::ShortBlock)?,
                        *body.get(data_start + 6).ok_or(Error::ShortBlock)?,
                        *body.get(data_start + 7).ok_or(Error::ShortBlock)?,
                    ]),
                },
                8,
            ),
            0x86 => (
                EventBody::CometStrike {
                    planet_id: u16le(body, data_start)?,
                },
                2,
            ),
            0x5E => (
                EventBody::StrangeArtifact {
                    planet_id: u16le(body, data_start)?,
                    field: *body.get(data_start + 2).ok_or(Error::ShortBlock)?,
                    boost: u16le(body, data_start + 3)?,
                },
                5,
            ),
            0x1C => (
                EventBody::NewColony {
                    planet_id: u16le(body, data_start)?,
                },
                2,
            ),
            0x59 => (
                EventBody::FleetScrapped {
                    planet_id: u16le(body, data_start)?,
                    fleet_index: u16le(body, data_start + 2)?,
                    tonnage_div7: u16le(body, data_start + 4)?,
                },
                6,
            ),
            0x5B => {
                let _deep_space = u16le(body, data_start)?; // always DEEP_SPACE
                (
                    EventBody::FleetScrappedInSpace {
                        object_ref: u16le(body, data_start + 2)?,
                    },
                    4,
                )
            }
            0x4F => (
                EventBody::BattleOccurred {
                    planet_id: u16le(body, data_start)?,
                    outcome: *body.get(data_start + 2).ok_or(Error::ShortBlock)?,
                    forces: u16le(body, data_start + 3)?,
                    losses: u16le(body, data_start + 5)?,
                },
                7,
            ),
            0xCD => (
                EventBody::StarbaseBuilt {
                    planet_id: u16le(body, data_start)?,
                    design_ref: *body.get(data_start + 2).ok_or(Error::ShortBlock)?,
                },
                3,
            ),
            other => {
                // Unknown discriminators carry no declared length; this
                // decoder treats the remainder of the block as one opaque
                // record, matching the spec's "store as opaque slice" rule
                // for undocumented bytes.
                let raw = body[data_start..].to_vec();
                let consumed = raw.len();
                (
                    EventBody::Unknown {
                        discriminator: other,
                        raw,
                    },
                    consumed,
                )
            }
        };
        Ok((
            EventRecord {
                discriminator,
                scope,
                body: ev_body,
            },
            data_start + len,
        ))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![
            self.discriminator,
            match self.scope {
                EventScope::PlanetLocal => 0x00,
                EventScope::PlayerGlobal => 0xFF,
            },
        ];
        match &self.body {
            EventBody::PopulationChange { planet_id, amount } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.extend_from_slice(&(*amount as u16).to_le_bytes());
            }
            EventBody::DefensesBuilt { planet_id }
            | EventBody::MineralAlchemy { planet_id }
            | EventBody::QueueEmpty { planet_id }
            | EventBody::CometStrike { planet_id }
            | EventBody::NewColony { planet_id } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
            }
            EventBody::FactoriesBuilt { planet_id, count } | EventBody::MinesBuilt { planet_id, count } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.extend_from_slice(&count.to_le_bytes());
            }
            EventBody::ResearchComplete {
                level,
                field,
                next_field,
            } => {
                out.extend_from_slice(&NO_PLANET.to_le_bytes());
                out.push(*level);
                out.push(*field);
                out.push(*next_field);
            }
            EventBody::TerraformablePlanetFound {
                planet_ref,
                growth_raw,
            } => {
                out.extend_from_slice(&planet_ref.to_le_bytes());
                out.extend_from_slice(&growth_raw.to_le_bytes());
            }
            EventBody::TechBenefit {
                category,
                item_id,
                extra,
            } => {
                out.push(*category);
                out.push(*item_id);
                out.extend_from_slice(&extra.to_le_bytes());
            }
            EventBody::PacketProduced { source, destination } => {
                out.extend_from_slice(&source.to_le_bytes());
                out.extend_from_slice(&destination.to_le_bytes());
            }
            EventBody::PacketCaptured { planet_id, tonnage } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.extend_from_slice(&tonnage.to_le_bytes());
            }
            EventBody::PacketBombardment {
                planet_id,
                tonnage,
                colonists_killed,
            } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.extend_from_slice(&tonnage.to_le_bytes());
                out.extend_from_slice(&colonists_killed.to_le_bytes());
            }
            EventBody::StrangeArtifact {
                planet_id,
                field,
                boost,
            } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.push(*field);
                out.extend_from_slice(&boost.to_le_bytes());
            }
            EventBody::FleetScrapped {
                planet_id,
                fleet_index,
                tonnage_div7,
            } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.extend_from_slice(&fleet_index.to_le_bytes());
                out.extend_from_slice(&tonnage_div7.to_le_bytes());
            }
            EventBody::FleetScrappedInSpace { object_ref } => {
                out.extend_from_slice(&DEEP_SPACE.to_le_bytes());
                out.extend_from_slice(&object_ref.to_le_bytes());
            }
            EventBody::BattleOccurred {
                planet_id,
                outcome,
                forces,
                losses,
            } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.push(*outcome);
                out.extend_from_slice(&forces.to_le_bytes());
                out.extend_from_slice(&losses.to_le_bytes());
            }
            EventBody::StarbaseBuilt { planet_id, design_ref } => {
                out.extend_from_slice(&planet_id.to_le_bytes());
                out.push(*design_ref);
            }
            EventBody::Unknown { raw, .. } => {
                out.extend_from_slice(raw);
            }
        }
        out
    }
}

/// Decode every event record in a block body.
pub fn decode_all(body: &[u8]) -> Result<Vec<EventRecord>> {
    let mut out = Vec::new();
    let mut off = 0;
    while off < body.len() {
        let (rec, next) = EventRecord::decode_one(body, off)?;
        out.push(rec);
        off = next;
    }
    Ok(out)
}

pub fn encode_all(records: &[EventRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for r in records {
        out.extend_from_slice(&r.encode());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defenses_built_roundtrips() {
        let rec = EventRecord {
            discriminator: 0x35,
            scope: EventScope::PlanetLocal,
            body: EventBody::DefensesBuilt { planet_id: 318 },
        };
        let bytes = rec.encode();
        let (decoded, next) = EventRecord::decode_one(&bytes, 0).unwrap();
        assert_eq!(next, bytes.len());
        match decoded.body {
            EventBody::DefensesBuilt { planet_id } => assert_eq!(planet_id, 318),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn research_complete_uses_no_planet_sentinel() {
        let rec = EventRecord {
            discriminator: 0x50,
            scope: EventScope::PlayerGlobal,
            body: EventBody::ResearchComplete {
                level: 5,
                field: 2,
                next_field: 3,
            },
        };
        let bytes = rec.encode();
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), NO_PLANET);
    }

    #[test]
    fn multiple_events_concatenate() {
        let a = EventRecord {
            discriminator: 0x35,
            scope: EventScope::PlanetLocal,
            body: EventBody::DefensesBuilt { planet_id: 1 },
        };
        let b = EventRecord {
            discriminator: 0x1C,
            scope: EventScope::PlanetLocal,
            body: EventBody::NewColony { planet_id: 2 },
        };
        let blob = encode_all(&[a, b]);
        let decoded = decode_all(&blob).unwrap();
        assert_eq!(decoded.len(), 2);
    }
}
