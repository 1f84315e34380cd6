//! Entity merge store: typed collections keyed by `(kind, owner, number)`,
//! merged across files at different data qualities via a pluggable
//! resolver, with dirty tracking for selective re-encoding on emit.

pub mod resolver;

use std::collections::HashMap;

use crate::blocks::{design, events, fleet, header, misc, object, planet, player};
use crate::file::FileRole;
use resolver::{DefaultResolver, Resolver};

/// Completeness of an entity's data as seen by the file's owner. Ordered:
/// `Unknown < Minimal < Partial < PickPocket < Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    Unknown,
    Minimal,
    Partial,
    PickPocket,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Planet,
    Fleet,
    Design,
    Object,
    BattlePlan,
    ProductionQueue,
    Message,
    /// Keyed by `(source player, turn)`, not merged across sources: each
    /// source's event log for a turn stands on its own.
    Events,
}

/// `owner` uses -1 for unowned and 31 is never stored here (it is
/// normalised to -1 by the block decoders before reaching the store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub owner: i16,
    pub number: i32,
}

#[derive(Debug, Clone)]
pub struct EntityMeta {
    pub key: EntityKey,
    pub quality: Quality,
    pub best_source_player_index: i16,
    /// `source_id` of the file whose bytes `anchor_block` (on the owning
    /// [`StoredEntity`]) points into. Distinct from `sources`, which
    /// records every file that ever mentioned this entity.
    pub best_source_id: u32,
    pub sources: Vec<u32>,
    pub turn: u16,
    pub dirty: bool,
    /// Index of the anchor block in `best_source_id`'s block list, used by
    /// regeneration to locate where this entity's bytes live. `None` for
    /// entities constructed without a backing file (e.g. in unit tests).
    pub anchor_block: Option<usize>,
}

/// The decoded payload behind an entity, plus an index back into the
/// owning file's block list so the regenerator can find an anchor to
/// re-encode from.
#[derive(Debug, Clone)]
pub enum EntityData {
    Player(player::PlayerRecord),
    Planet(planet::PlanetRecord),
    Fleet {
        fleet: fleet::FleetRecord,
        name: Option<String>,
        waypoints: Vec<fleet::Waypoint>,
    },
    Design(design::DesignRecord),
    Object(object::ObjectRecord),
    BattlePlan(misc::BattlePlan),
    ProductionQueue(misc::ProductionQueueBlock),
    Message(misc::Message),
    Events(Vec<events::EventRecord>),
}

struct StoredEntity {
    meta: EntityMeta,
    data: EntityData,
}

/// A registered source file: the role it was added under, plus the parsed
/// file itself (kept for regeneration's block-walk).
struct SourceFile {
    role: FileRole,
    parsed: crate::file::ParsedFile,
}

/// The aggregate game-state store. One store accumulates entities across
/// however many files are added to it.
pub struct Store {
    game_id: Option<u32>,
    entities: Vec<StoredEntity>,
    index: HashMap<EntityKey, usize>,
    /// Every file registered via [`Store::add_file`], keyed by the
    /// caller-assigned `source_id`, retained so regeneration can walk the
    /// original block list back out.
    sources: HashMap<u32, SourceFile>,
    /// Per-enemy-owner set of design slots referenced by their fleets,
    /// accumulated during pass 2 and consumed by pass 3.
    enemy_design_slots: HashMap<i16, Vec<u8>>,
    resolver: Box<dyn Resolver>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store {
            game_id: None,
            entities: Vec::new(),
            index: HashMap::new(),
            sources: HashMap::new(),
            enemy_design_slots: HashMap::new(),
            resolver: Box::new(DefaultResolver),
        }
    }

    pub fn with_resolver(resolver: Box<dyn Resolver>) -> Self {
        Store {
            resolver,
            ..Self::new()
        }
    }

    pub fn entity(&self, key: EntityKey) -> Option<(&EntityMeta, &EntityData)> {
        self.index
            .get(&key)
            .map(|&i| (&self.entities[i].meta, &self.entities[i].data))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Mark an entity dirty (mutated since load) so regeneration re-encodes
    /// it instead of reusing preserved bytes.
    pub fn mark_dirty(&mut self, key: EntityKey) {
        if let Some(&i) = self.index.get(&key) {
            self.entities[i].meta.dirty = true;
        }
    }

    /// The parsed file registered under `source_id`, plus the role it was
    /// added under, if any.
    pub(crate) fn source_file(&self, source_id: u32) -> Option<(FileRole, &crate::file::ParsedFile)> {
        self.sources.get(&source_id).map(|s| (s.role, &s.parsed))
    }

    /// Every currently-stored entity whose `best_source_id` matches
    /// `source_id`, i.e. every entity regeneration of that file may need
    /// to re-encode.
    pub(crate) fn entities_anchored_to(
        &self,
        source_id: u32,
    ) -> impl Iterator<Item = (EntityKey, &EntityMeta, &EntityData)> {
        self.entities
            .iter()
            .filter(move |e| e.meta.best_source_id == source_id)
            .map(|e| (e.meta.key, &e.meta, &e.data))
    }

    /// Mutate a stored fleet's cargo in place and mark it dirty. A
    /// convenience for the common "edit cargo, regenerate" workflow;
    /// returns `Error::NoRawBlockData` if `key` is not a known fleet.
    pub fn mutate_fleet_cargo(
        &mut self,
        key: EntityKey,
        edit: impl FnOnce(&mut fleet::Cargo),
    ) -> crate::Result<()> {
        let i = *self.index.get(&key).ok_or(crate::Error::NoRawBlockData)?;
        match &mut self.entities[i].data {
            EntityData::Fleet { fleet, .. } => {
                let mut cargo = fleet.cargo.clone().unwrap_or_default();
                edit(&mut cargo);
                fleet.cargo = Some(cargo);
                self.entities[i].meta.dirty = true;
                Ok(())
            }
            _ => Err(crate::Error::NoRawBlockData),
        }
    }

    /// Validate a candidate file's game id against the store's, setting it
    /// on first use.
    pub fn check_game_id(&mut self, game_id: u32) -> crate::Result<()> {
        match self.game_id {
            None => {
                self.game_id = Some(game_id);
                Ok(())
            }
            Some(existing) if existing == game_id => Ok(()),
            Some(_) => Err(crate::Error::GameIdMismatch),
        }
    }

    fn upsert(
        &mut self,
        key: EntityKey,
        data: EntityData,
        quality: Quality,
        source_id: u32,
        source_player_index: i16,
        turn: u16,
        anchor_block: Option<usize>,
    ) {
        if let Some(&i) = self.index.get(&key) {
            let existing_meta = self.entities[i].meta.clone();
            let decision =
                self.resolver
                    .resolve(&existing_meta, quality, source_player_index, turn);
            self.entities[i].meta.sources.push(source_id);
            if decision == resolver::Decision::Replace {
                self.entities[i].meta.quality = quality;
                self.entities[i].meta.best_source_player_index = source_player_index;
                self.entities[i].meta.best_source_id = source_id;
                self.entities[i].meta.turn = turn;
                self.entities[i].meta.anchor_block = anchor_block;
                self.entities[i].meta.dirty = false;
                self.entities[i].data = data;
            }
        } else {
            let meta = EntityMeta {
                key,
                quality,
                best_source_player_index: source_player_index,
                best_source_id: source_id,
                sources: vec![source_id],
                turn,
                dirty: false,
                anchor_block,
            };
            self.index.insert(key, self.entities.len());
            self.entities.push(StoredEntity { meta, data });
        }
    }

    /// Ingest a parsed file in the three-pass order the spec requires so
    /// cross-references (brief design -> owning fleet) resolve correctly.
    pub fn add_file(
        &mut self,
        parsed: &crate::file::ParsedFile,
        role: FileRole,
        source_id: u32,
        source_player_index: i16,
    ) -> crate::Result<()> {
        self.check_game_id(parsed.header.game_id)?;
        let turn = parsed.header.turn;
        self.sources.insert(
            source_id,
            SourceFile {
                role,
                parsed: parsed.clone(),
            },
        );

        // Pass 1: designs, players, battle plans, messages. Brief
        // (non-full) designs have no owner yet; they are collected
        // separately and re-tagged in pass 3.
        let mut brief_designs: Vec<(usize, design::DesignRecord)> = Vec::new();
        for (i, block) in parsed.blocks.iter().enumerate() {
            match crate::blocks::decode(block.kind, &block.plain)? {
                crate::blocks::Decoded::Design(d) => {
                    if d.full {
                        let key = EntityKey {
                            kind: EntityKind::Design,
                            owner: source_player_index,
                            number: d.slot as i32,
                        };
                        self.upsert(
                            key,
                            EntityData::Design(d),
                            Quality::Full,
                            source_id,
                            source_player_index,
                            turn,
                            Some(i),
                        );
                    } else {
                        brief_designs.push((i, d));
                    }
                }
                crate::blocks::Decoded::BattlePlan(p) => {
                    let key = EntityKey {
                        kind: EntityKind::BattlePlan,
                        owner: p.owner as i16,
                        number: p.plan_slot as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::BattlePlan(p),
                        Quality::Full,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                }
                crate::blocks::Decoded::Message(m) => {
                    let key = EntityKey {
                        kind: EntityKind::Message,
                        owner: m.sender as i16,
                        number: i as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::Message(m),
                        Quality::Full,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                }
                _ => {}
            }
        }

        // Pass 2: fleets (+ trailing name/waypoints), planets, objects,
        // production queues. While scanning fleets, accumulate per-enemy
        // design-slot references for pass 3.
        let mut i = 0;
        while i < parsed.blocks.len() {
            let block = &parsed.blocks[i];
            match crate::blocks::decode(block.kind, &block.plain)? {
                crate::blocks::Decoded::Fleet(f) => {
                    let owner = f.owner as i16;
                    for slot in 0..16u8 {
                        if f.design_mask & (1 << slot) != 0 {
                            self.enemy_design_slots.entry(owner).or_default().push(slot);
                        }
                    }
                    let mut name = None;
                    let mut waypoints = Vec::new();
                    let mut j = i + 1;
                    if let Some(next) = parsed.blocks.get(j) {
                        if next.kind == fleet::BLOCK_TYPE_NAME {
                            name = Some(crate::codec::decode_stars_string(
                                &next.plain,
                                0,
                                next.plain.len(),
                            )?);
                            j += 1;
                        }
                    }
                    while let Some(next) = parsed.blocks.get(j) {
                        match fleet::Waypoint::decode(&next.plain) {
                            Ok(wp) => {
                                waypoints.push(wp);
                                j += 1;
                            }
                            Err(_) => break,
                        }
                    }
                    let quality = match f.quality {
                        fleet::FleetQuality::Partial => Quality::Partial,
                        fleet::FleetQuality::PickPocket => Quality::PickPocket,
                        fleet::FleetQuality::Full => Quality::Full,
                    };
                    let key = EntityKey {
                        kind: EntityKind::Fleet,
                        owner,
                        number: f.number as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::Fleet {
                            fleet: f,
                            name,
                            waypoints,
                        },
                        quality,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                    i = j;
                    continue;
                }
                crate::blocks::Decoded::PartialPlanet(p) => {
                    let owner = p.owner.map(|o| o as i16).unwrap_or(-1);
                    let key = EntityKey {
                        kind: EntityKind::Planet,
                        owner,
                        number: p.number as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::Planet(p),
                        Quality::Partial,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                }
                crate::blocks::Decoded::FullPlanet(p) => {
                    let owner = p.owner.map(|o| o as i16).unwrap_or(-1);
                    let key = EntityKey {
                        kind: EntityKind::Planet,
                        owner,
                        number: p.number as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::Planet(p),
                        Quality::Full,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                }
                crate::blocks::Decoded::Object(o) => {
                    let owner = if o.owner == header::PLAYER_SLOT_UNASSIGNED {
                        -1
                    } else {
                        o.owner as i16
                    };
                    let key = EntityKey {
                        kind: EntityKind::Object,
                        owner,
                        number: o.number as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::Object(o),
                        Quality::Full,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                }
                crate::blocks::Decoded::ProductionQueue(q) => {
                    let key = EntityKey {
                        kind: EntityKind::ProductionQueue,
                        owner: -1,
                        number: q.planet_number as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::ProductionQueue(q),
                        Quality::Full,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                }
                _ => {}
            }
            i += 1;
        }

        // Pass 3: re-tag brief enemy designs to every enemy owner whose
        // fleet bitmask referenced their slot, at Partial quality.
        for (i, design_record) in brief_designs {
            for (&owner, slots) in &self.enemy_design_slots {
                if slots.contains(&design_record.slot) {
                    let key = EntityKey {
                        kind: EntityKind::Design,
                        owner,
                        number: design_record.slot as i32,
                    };
                    self.upsert(
                        key,
                        EntityData::Design(design_record.clone()),
                        Quality::Partial,
                        source_id,
                        source_player_index,
                        turn,
                        Some(i),
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockHeader};
    use crate::blocks::{footer, header::FileHeader};
    use crate::cipher::Keystream;
    use crate::file::{self, FileRole};

    /// Build a minimal single-block file carrying one planet record,
    /// keyed by `game_id`/`turn` so several can be merged into one store.
    fn build_file_with_one_planet(
        game_id: u32,
        turn: u16,
        planet: &planet::PlanetRecord,
        footer_payload: footer::Footer,
    ) -> Vec<u8> {
        let header = FileHeader {
            game_id,
            generator: 0,
            turn,
            player_slot: 0,
            shareware: false,
            salt: 0x1234,
            game_type_flags: 0,
        };
        let header_body = header.encode();
        let mut out = BlockHeader {
            kind: crate::blocks::header::BLOCK_TYPE,
            size: header_body.len() as u16,
        }
        .write_bytes()
        .to_vec();
        out.extend_from_slice(&header_body);

        let mut ks = Keystream::new(header.seed_tuple());
        let kind = if planet.full {
            planet::BLOCK_TYPE_FULL
        } else {
            planet::BLOCK_TYPE_PARTIAL
        };
        let block = Block {
            kind,
            raw: Vec::new(),
            plain: planet.encode_rebuilt(),
            trailer: Vec::new(),
        };
        out.extend_from_slice(&block.encrypt_and_frame(&mut ks));

        let footer_body = footer_payload.encode();
        out.extend_from_slice(
            &BlockHeader {
                kind: footer::BLOCK_TYPE,
                size: footer_body.len() as u16,
            }
            .write_bytes(),
        );
        out.extend_from_slice(&footer_body);
        out
    }

    fn bare_planet(full: bool, number: u16, owner: Option<u8>) -> planet::PlanetRecord {
        planet::PlanetRecord {
            full,
            number,
            owner,
            flags: 0,
            environment: None,
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_stamp: None,
        }
    }

    /// Three scouting history files (different owners, turns, qualities)
    /// plus the planet's own current-turn result file all describe planet
    /// 42; merging them in submission order must converge on the most
    /// authoritative data regardless of arrival order.
    #[test]
    fn merging_three_history_files_and_one_result_file_converges_on_owner_full_data() {
        let mut store = Store::new();
        let key = EntityKey {
            kind: EntityKind::Planet,
            owner: 3,
            number: 42,
        };

        // Scouted partial sightings by two other players, at different
        // turns, neither of whom owns the planet.
        let scout_a = build_file_with_one_planet(
            77,
            5,
            &bare_planet(false, 42, Some(3)),
            footer::Footer::None,
        );
        let parsed_a = file::parse(&scout_a, FileRole::PlayerHistory { player: 0 }).unwrap();
        store
            .add_file(&parsed_a, FileRole::PlayerHistory { player: 0 }, 0, 0)
            .unwrap();
        assert_eq!(store.entity(key).unwrap().0.quality, Quality::Partial);

        let scout_b = build_file_with_one_planet(
            77,
            9,
            &bare_planet(false, 42, Some(3)),
            footer::Footer::None,
        );
        let parsed_b = file::parse(&scout_b, FileRole::PlayerHistory { player: 1 }).unwrap();
        store
            .add_file(&parsed_b, FileRole::PlayerHistory { player: 1 }, 1, 1)
            .unwrap();
        // Later turn at the same (Partial) quality and neither source
        // matching the owner: the later sighting wins.
        assert_eq!(store.entity(key).unwrap().0.quality, Quality::Partial);
        assert_eq!(store.entity(key).unwrap().0.turn, 9);

        // The owner's own current-turn result file reports Full quality
        // and must take over regardless of its turn relative to the scouts.
        let own_result = build_file_with_one_planet(
            77,
            7,
            &bare_planet(true, 42, Some(3)),
            footer::Footer::Turn(7),
        );
        let parsed_own = file::parse(&own_result, FileRole::PlayerResult { player: 3 }).unwrap();
        store
            .add_file(&parsed_own, FileRole::PlayerResult { player: 3 }, 2, 3)
            .unwrap();

        let (meta, data) = store.entity(key).unwrap();
        assert_eq!(meta.quality, Quality::Full);
        assert_eq!(meta.best_source_player_index, 3);
        assert_eq!(meta.sources, vec![0, 1, 2]);
        let EntityData::Planet(p) = data else {
            panic!("expected planet entity")
        };
        assert!(p.full);

        // A late, lower-quality scout arriving after the Full result must
        // not regress the merged entity, though it still contributes to
        // the source list.
        let late_scout = build_file_with_one_planet(
            77,
            20,
            &bare_planet(false, 42, Some(3)),
            footer::Footer::None,
        );
        let parsed_late = file::parse(&late_scout, FileRole::PlayerHistory { player: 0 }).unwrap();
        store
            .add_file(&parsed_late, FileRole::PlayerHistory { player: 0 }, 3, 0)
            .unwrap();
        let (meta, _) = store.entity(key).unwrap();
        assert_eq!(meta.quality, Quality::Full);
        assert_eq!(meta.sources, vec![0, 1, 2, 3]);
    }

    #[test]
    fn quality_ordering_matches_spec() {
        assert!(Quality::Unknown < Quality::Minimal);
        assert!(Quality::Minimal < Quality::Partial);
        assert!(Quality::Partial < Quality::PickPocket);
        assert!(Quality::PickPocket < Quality::Full);
    }

    #[test]
    fn game_id_mismatch_is_rejected() {
        let mut store = Store::new();
        store.check_game_id(1).unwrap();
        assert!(matches!(store.check_game_id(2), Err(crate::Error::GameIdMismatch)));
    }

    #[test]
    fn upsert_respects_quality_monotonicity() {
        let mut store = Store::new();
        let key = EntityKey {
            kind: EntityKind::Planet,
            owner: 3,
            number: 318,
        };
        let planet_low = planet::PlanetRecord {
            full: false,
            number: 318,
            owner: Some(3),
            flags: 0,
            environment: None,
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_stamp: None,
        };
        store.upsert(key, EntityData::Planet(planet_low.clone()), Quality::Minimal, 0, 3, 1, None);
        store.upsert(key, EntityData::Planet(planet_low.clone()), Quality::Partial, 1, 3, 2, None);
        assert_eq!(store.entity(key).unwrap().0.quality, Quality::Partial);

        // A later Minimal source must not regress a Partial entity.
        store.upsert(key, EntityData::Planet(planet_low), Quality::Minimal, 2, 3, 99, None);
        assert_eq!(store.entity(key).unwrap().0.quality, Quality::Partial);
    }
}
