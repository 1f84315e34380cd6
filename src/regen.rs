//! File regeneration: re-emit a player's file from the entity store,
//! substituting re-encoded bytes for dirty entities while reusing every
//! unmutated block's preserved ciphertext bit-exact.
//!
//! This is the inverse of [`crate::entity::Store::add_file`]: where
//! ingestion walks a parsed file into the store, regeneration walks the
//! store back out through one of the files it ingested, anchored by each
//! entity's `best_source_id` and `anchor_block` index.

use crate::blocks::{footer, misc};
use crate::entity::{EntityData, Store};
use crate::file::{self, FileRole, ParsedFile};
use crate::{Error, Result};

/// Block types carried over when converting an M-file to an X-file (order
/// submission). Everything else is dropped, per the command-block
/// allow-list in the external-interfaces section.
pub const X_FILE_ALLOWED_BLOCK_TYPES: &[u8] = &[
    misc::BLOCK_TYPE_PRODUCTION_QUEUE,
    misc::BLOCK_TYPE_BATTLE_PLAN,
    misc::BLOCK_TYPE_MESSAGE,
    crate::blocks::design::BLOCK_TYPE_CHANGE,
    crate::blocks::fleet::BLOCK_TYPE_NAME,
    // Waypoint, move-ships, fleet split/merge, research/planet change, and
    // password-change blocks are all represented as opaque command blocks
    // at this layer (they have no dedicated decoder) and pass the filter
    // by block-type number alone; real type numbers for those commands are
    // not assigned by `spec.md`, so only the types this crate does decode
    // appear here explicitly.
];

/// A terminator block appended after filtering an M-file down to its order
/// commands, marking the order submission complete. `spec.md` names this
/// block ("save-and-submit") but assigns it no type number; this crate
/// allocates 30, documented in `DESIGN.md` alongside this module's other
/// open-question resolutions.
pub const BLOCK_TYPE_SAVE_AND_SUBMIT: u8 = 30;

/// Re-encode a single entity's current data back into decrypted block
/// bytes, for writing into its anchor block's `plain` field. Composite
/// entities (fleet + trailing name/waypoints) only refresh the anchor
/// block itself; the common mutation (cargo edit) never touches the
/// trailing blocks' byte layout.
fn encode_entity(data: &EntityData) -> Vec<u8> {
    match data {
        EntityData::Player(p) => p.encode(),
        EntityData::Planet(p) => p.encode_rebuilt(),
        EntityData::Fleet { fleet, .. } => fleet.encode(),
        EntityData::Design(d) => d.encode(),
        EntityData::Object(o) => o.encode_block(),
        EntityData::BattlePlan(bp) => bp.encode(),
        EntityData::ProductionQueue(q) => q.encode(),
        EntityData::Message(m) => m.encode(),
        EntityData::Events(events) => crate::blocks::events::encode_all(events),
    }
}

/// Re-emit the file identified by `source_id` in the store, substituting
/// freshly encoded bytes for every dirty entity anchored to it and reusing
/// every other block's preserved ciphertext verbatim.
///
/// Implements `spec.md` section 4.7: locate the original source, emit its
/// header, re-initialise the keystream, walk the original block list
/// substituting dirty entities in place, then recompute the footer.
pub fn regenerate(store: &Store, source_id: u32) -> Result<Vec<u8>> {
    let (role, source) = store
        .source_file(source_id)
        .ok_or(Error::NoSourceForPlayer)?;
    let mut blocks = source.blocks.clone();

    for (key, meta, data) in store.entities_anchored_to(source_id) {
        if !meta.dirty {
            continue;
        }
        let index = meta
            .anchor_block
            .ok_or(Error::NoRawBlockData)?;
        let block = blocks
            .get_mut(index)
            .ok_or(Error::NoRawBlockData)?;
        let _ = key;
        block.plain = encode_entity(data);
    }

    let new_footer = recompute_footer(role, &source.footer, &blocks, store, source_id);

    let regenerated = ParsedFile {
        header: source.header.clone(),
        blocks,
        footer: new_footer,
    };
    Ok(file::write(&regenerated, role))
}

/// Recompute the footer payload for the regenerated file. Most roles carry
/// footer data independent of block contents (M-file turn, XY-file player
/// count) and are reused verbatim; the R-file checksum depends on the
/// player block's current bytes and is recomputed if the player entity for
/// this source is dirty.
fn recompute_footer(
    role: FileRole,
    original: &footer::Footer,
    blocks: &[crate::block::Block],
    store: &Store,
    source_id: u32,
) -> footer::Footer {
    if let FileRole::RaceBuilder { .. } = role {
        for (_, meta, data) in store.entities_anchored_to(source_id) {
            if let EntityData::Player(player) = data {
                if let Some(index) = meta.anchor_block {
                    if let Some(block) = blocks.get(index) {
                        // `race_checksum` wants the player body up to (not
                        // including) the packed name region; re-decoding
                        // the freshly encoded bytes is the cheapest way to
                        // recover that prefix without duplicating the
                        // player body's field layout here.
                        if let Ok((_, prefix_body)) =
                            crate::blocks::player::PlayerRecord::decode(&block.plain)
                        {
                            if let Ok(checksum) = footer::race_checksum(
                                &prefix_body,
                                &player.singular_name,
                                &player.plural_name,
                            ) {
                                return footer::Footer::RaceChecksum(checksum);
                            }
                        }
                    }
                }
            }
        }
    }
    *original
}

/// Convert a parsed M-file into an X-file (order submission): keep only
/// the command-block subset in [`X_FILE_ALLOWED_BLOCK_TYPES`] and append a
/// save-and-submit terminator block. If `source` is already an X-file,
/// callers should skip this step entirely and preserve every block
/// (`spec.md` section 4.7).
pub fn convert_to_orders(source: &ParsedFile) -> ParsedFile {
    let mut blocks: Vec<_> = source
        .blocks
        .iter()
        .filter(|b| X_FILE_ALLOWED_BLOCK_TYPES.contains(&b.kind))
        .cloned()
        .collect();
    blocks.push(crate::block::Block {
        kind: BLOCK_TYPE_SAVE_AND_SUBMIT,
        raw: Vec::new(),
        plain: Vec::new(),
        trailer: Vec::new(),
    });
    ParsedFile {
        header: source.header.clone(),
        blocks,
        footer: footer::Footer::None,
    }
}
