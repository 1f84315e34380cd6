//! Per-block-type decoders and encoders.
//!
//! | Module | Block type(s) | Format |
//! |--------|---------------|--------|
//! | [`header`]  | 8      | File header |
//! | [`footer`]  | 0      | File footer |
//! | [`planet`]  | 13, 14 | Partial/full planet |
//! | [`fleet`]   | 16, 17 | Fleet + name |
//! | [`design`]  | 26, 27 | Design + design change |
//! | [`events`]  | 12     | Event multiplexer |
//! | [`battle`]  | 31     | Battle record |
//! | [`object`]  | 28     | Minefield/packet/wormhole/mystery trader |
//! | [`player`]  | -      | Player/race record |
//! | [`misc`]    | rest   | Production queue, battle plan, message, opaque |

pub mod battle;
pub mod design;
pub mod events;
pub mod fleet;
pub mod footer;
pub mod header;
pub mod misc;
pub mod object;
pub mod planet;
pub mod player;

/// A decoded block body, dispatched by block type. Block types this crate
/// has no dedicated decoder for fall through to [`misc::Opaque`].
#[derive(Debug, Clone)]
pub enum Decoded {
    Header(header::FileHeader),
    Footer(Vec<u8>),
    PartialPlanet(planet::PlanetRecord),
    FullPlanet(planet::PlanetRecord),
    Fleet(fleet::FleetRecord),
    FleetName(String),
    Waypoint(fleet::Waypoint),
    Design(design::DesignRecord),
    DesignChange(design::DesignChange),
    Events(Vec<events::EventRecord>),
    Battle(battle::BattleRecord),
    ProductionQueue(misc::ProductionQueueBlock),
    BattlePlan(misc::BattlePlan),
    Message(misc::Message),
    Object(object::ObjectRecord),
    Opaque(misc::Opaque),
}

/// Dispatch a block's decrypted body to its typed decoder by block type.
pub fn decode(kind: u8, body: &[u8]) -> crate::Result<Decoded> {
    Ok(match kind {
        header::BLOCK_TYPE => Decoded::Header(header::FileHeader::decode(body)?),
        footer::BLOCK_TYPE => Decoded::Footer(body.to_vec()),
        planet::BLOCK_TYPE_PARTIAL => Decoded::PartialPlanet(planet::PlanetRecord::decode(body, false)?),
        planet::BLOCK_TYPE_FULL => Decoded::FullPlanet(planet::PlanetRecord::decode(body, true)?),
        fleet::BLOCK_TYPE => Decoded::Fleet(fleet::FleetRecord::decode(body)?),
        fleet::BLOCK_TYPE_NAME => {
            Decoded::FleetName(crate::codec::decode_stars_string(body, 0, body.len())?)
        }
        design::BLOCK_TYPE => Decoded::Design(design::DesignRecord::decode(body)?),
        design::BLOCK_TYPE_CHANGE => Decoded::DesignChange(design::DesignChange::decode(body)?),
        events::BLOCK_TYPE => Decoded::Events(events::decode_all(body)?),
        battle::BLOCK_TYPE => Decoded::Battle(battle::BattleRecord::decode(body)?),
        misc::BLOCK_TYPE_PRODUCTION_QUEUE => {
            Decoded::ProductionQueue(misc::ProductionQueueBlock::decode(body)?)
        }
        misc::BLOCK_TYPE_BATTLE_PLAN => Decoded::BattlePlan(misc::BattlePlan::decode(body)?),
        misc::BLOCK_TYPE_MESSAGE => Decoded::Message(misc::Message::decode(body)?),
        object::BLOCK_TYPE => Decoded::Object(object::ObjectRecord::decode_block(body)?),
        _ => Decoded::Opaque(misc::Opaque::decode(kind, body)),
    })
}

/// Re-encode a previously decoded block body.
pub fn encode(decoded: &Decoded) -> Vec<u8> {
    match decoded {
        Decoded::Header(h) => h.encode(),
        Decoded::Footer(raw) => raw.clone(),
        Decoded::PartialPlanet(p) | Decoded::FullPlanet(p) => p.encode_rebuilt(),
        Decoded::Fleet(f) => f.encode(),
        Decoded::FleetName(name) => crate::codec::encode_stars_string(name),
        Decoded::Waypoint(w) => w.encode(),
        Decoded::Design(d) => d.encode(),
        Decoded::DesignChange(d) => d.encode(),
        Decoded::Events(events) => events::encode_all(events),
        Decoded::Battle(b) => b.encode(),
        Decoded::ProductionQueue(q) => q.encode(),
        Decoded::BattlePlan(p) => p.encode(),
        Decoded::Message(m) => m.encode(),
        Decoded::Object(o) => o.encode_block(),
        Decoded::Opaque(o) => o.encode(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undocumented_types_decode_as_opaque() {
        for &kind in misc::UNDOCUMENTED_TYPES {
            let body = vec![1, 2, 3];
            let decoded = decode(kind, &body).unwrap();
            assert!(matches!(decoded, Decoded::Opaque(_)));
            assert_eq!(encode(&decoded), body);
        }
    }

    #[test]
    fn unknown_type_falls_through_to_opaque() {
        let body = vec![9, 9, 9];
        let decoded = decode(200, &body).unwrap();
        assert!(matches!(decoded, Decoded::Opaque(_)));
    }
}
