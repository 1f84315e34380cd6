//! Pluggable conflict resolution for the entity merge store.

use super::{EntityMeta, Quality};

/// Decision returned by a resolver when an incoming entity collides with
/// one already present in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Replace,
    KeepExisting,
}

/// A pluggable merge-conflict resolver. The store always adds the incoming
/// source to the entity's source set regardless of the decision.
pub trait Resolver {
    fn resolve(
        &self,
        existing: &EntityMeta,
        incoming_quality: Quality,
        incoming_source_player_index: i16,
        incoming_turn: u16,
    ) -> Decision;
}

/// The default resolver, implementing the 3-rule priority from the merge
/// specification:
/// 1. Incoming quality is strictly higher.
/// 2. Same quality, incoming source's player index equals the entity's
///    owner, and the existing source's does not.
/// 3. Same quality and ownership match, incoming turn is later.
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve(
        &self,
        existing: &EntityMeta,
        incoming_quality: Quality,
        incoming_source_player_index: i16,
        incoming_turn: u16,
    ) -> Decision {
        if incoming_quality > existing.quality {
            return Decision::Replace;
        }
        if incoming_quality < existing.quality {
            return Decision::KeepExisting;
        }

        let owner = existing.key.owner;
        let incoming_matches_owner = incoming_source_player_index == owner;
        let existing_matches_owner = existing.best_source_player_index == owner;
        if incoming_matches_owner && !existing_matches_owner {
            return Decision::Replace;
        }
        if !incoming_matches_owner && existing_matches_owner {
            return Decision::KeepExisting;
        }

        if incoming_turn > existing.turn {
            Decision::Replace
        } else {
            Decision::KeepExisting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKey, EntityKind};

    fn meta(owner: i16, quality: Quality, turn: u16, best_source_player_index: i16) -> EntityMeta {
        EntityMeta {
            key: EntityKey {
                kind: EntityKind::Planet,
                owner,
                number: 1,
            },
            quality,
            best_source_player_index,
            best_source_id: 0,
            sources: vec![0],
            turn,
            dirty: false,
            anchor_block: None,
        }
    }

    #[test]
    fn higher_quality_always_replaces() {
        let existing = meta(3, Quality::Partial, 5, 0);
        let decision = DefaultResolver.resolve(&existing, Quality::Full, 3, 1);
        assert_eq!(decision, Decision::Replace);
    }

    #[test]
    fn lower_quality_never_replaces() {
        let existing = meta(3, Quality::Full, 5, 3);
        let decision = DefaultResolver.resolve(&existing, Quality::Partial, 3, 99);
        assert_eq!(decision, Decision::KeepExisting);
    }

    #[test]
    fn same_quality_owner_match_wins_over_non_owner() {
        let existing = meta(3, Quality::Partial, 5, 9);
        let decision = DefaultResolver.resolve(&existing, Quality::Partial, 3, 1);
        assert_eq!(decision, Decision::Replace);
    }

    #[test]
    fn same_quality_and_ownership_later_turn_wins() {
        let existing = meta(3, Quality::Partial, 5, 3);
        let decision = DefaultResolver.resolve(&existing, Quality::Partial, 3, 10);
        assert_eq!(decision, Decision::Replace);

        let decision2 = DefaultResolver.resolve(&existing, Quality::Partial, 3, 2);
        assert_eq!(decision2, Decision::KeepExisting);
    }
}
