//! File-level orchestration: header parse, keystream init, block loop,
//! footer validation, and the inverse write path.

use crate::block::Block;
use crate::blocks::{footer, header};
use crate::cipher::Keystream;
use crate::{Error, Result};

/// File role, implied by the on-disk extension. Determines the footer
/// payload shape and, for race files, a fixed cipher seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    PlayerResult { player: u8 },
    PlayerOrders { player: u8 },
    PlayerHistory { player: u8 },
    Universe,
    RaceBuilder { slot: u8 },
    HostMaster,
}

impl FileRole {
    fn footer_role(self) -> footer::FooterRole {
        match self {
            FileRole::PlayerResult { .. } => footer::FooterRole::PlayerResult,
            FileRole::PlayerOrders { .. } => footer::FooterRole::PlayerOrders,
            FileRole::PlayerHistory { .. } => footer::FooterRole::PlayerHistory,
            FileRole::Universe => footer::FooterRole::Universe,
            FileRole::RaceBuilder { .. } => footer::FooterRole::RaceBuilder,
            FileRole::HostMaster => footer::FooterRole::HostMaster,
        }
    }
}

/// A fully parsed file: header, ordered block list (each already decrypted
/// and with its raw ciphertext preserved), and footer payload.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub header: header::FileHeader,
    pub blocks: Vec<Block>,
    pub footer: footer::Footer,
}

/// Parse a complete in-memory file: header block, zero or more encrypted
/// blocks, and a footer block.
pub fn parse(bytes: &[u8], role: FileRole) -> Result<ParsedFile> {
    let mut cursor = std::io::Cursor::new(bytes);
    let header_block = Block::read(&mut cursor).map_err(|_| Error::MissingHeader)?;
    if header_block.kind != header::BLOCK_TYPE {
        return Err(Error::MissingHeader);
    }
    let file_header = header::FileHeader::decode(&header_block.raw)?;

    let mut ks = Keystream::new(file_header.seed_tuple());
    let mut blocks = Vec::new();
    let mut footer_body: Option<Vec<u8>> = None;

    loop {
        let mut block = match Block::read(&mut cursor) {
            Ok(b) => b,
            Err(Error::ShortBlock) => break,
            Err(e) => return Err(e),
        };
        if block.kind == footer::BLOCK_TYPE {
            footer_body = Some(block.raw.clone());
            break;
        }
        block.decrypt(&mut ks);
        blocks.push(block);
    }

    let footer_body = footer_body.ok_or(Error::ShortBlock)?;
    let parsed_footer = footer::Footer::decode(role.footer_role(), &footer_body);
    validate_footer(role, &file_header, &parsed_footer, &blocks)?;

    Ok(ParsedFile {
        header: file_header,
        blocks,
        footer: parsed_footer,
    })
}

fn validate_footer(
    role: FileRole,
    header: &header::FileHeader,
    footer: &footer::Footer,
    _blocks: &[Block],
) -> Result<()> {
    match (role, footer) {
        (FileRole::PlayerResult { .. }, footer::Footer::Turn(t)) if *t == header.turn => Ok(()),
        (FileRole::PlayerResult { .. }, _) => Err(Error::InvalidFooter),
        // Universe/race-builder footer laws depend on decoded entity data
        // the caller (the entity store) has already cross-checked by the
        // time it asks for validation; a bare parse only checks shape.
        _ => Ok(()),
    }
}

/// Re-emit a parsed file, re-initialising the keystream identically and
/// walking the same block order. Unmutated blocks reuse their preserved
/// ciphertext; callers that mutate a block's `plain` before calling this
/// get a freshly re-encrypted body for that block only.
pub fn write(parsed: &ParsedFile, role: FileRole) -> Vec<u8> {
    let mut out = Vec::new();
    let header_body = parsed.header.encode();
    out.extend_from_slice(
        &crate::block::BlockHeader {
            kind: header::BLOCK_TYPE,
            size: header_body.len() as u16,
        }
        .write_bytes(),
    );
    out.extend_from_slice(&header_body);

    let mut ks = Keystream::new(parsed.header.seed_tuple());
    for block in &parsed.blocks {
        out.extend_from_slice(&block.encrypt_and_frame(&mut ks));
        out.extend_from_slice(&block.trailer);
    }

    let footer_body = parsed.footer.encode();
    let _ = role; // role only disambiguates how the footer was computed upstream
    out.extend_from_slice(
        &crate::block::BlockHeader {
            kind: footer::BLOCK_TYPE,
            size: footer_body.len() as u16,
        }
        .write_bytes(),
    );
    out.extend_from_slice(&footer_body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockHeader;

    fn build_minimal_file(turn: u16) -> Vec<u8> {
        let header = header::FileHeader {
            game_id: 1,
            generator: 0,
            turn,
            player_slot: 0,
            shareware: false,
            salt: 0x4242,
            game_type_flags: 0,
        };
        let header_body = header.encode();
        let mut out = BlockHeader {
            kind: header::BLOCK_TYPE,
            size: header_body.len() as u16,
        }
        .write_bytes()
        .to_vec();
        out.extend_from_slice(&header_body);

        let footer_body = footer::Footer::Turn(turn).encode();
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

    #[test]
    fn parse_minimal_file_round_trips() {
        let bytes = build_minimal_file(7);
        let parsed = parse(&bytes, FileRole::PlayerResult { player: 0 }).unwrap();
        assert_eq!(parsed.header.turn, 7);
        assert!(parsed.blocks.is_empty());
        let rewritten = write(&parsed, FileRole::PlayerResult { player: 0 });
        assert_eq!(rewritten, bytes);
    }

    #[test]
    fn mismatched_turn_footer_is_rejected() {
        let mut bytes = build_minimal_file(7);
        // Corrupt the footer payload (last 2 bytes) to disagree with the
        // header's turn field.
        let len = bytes.len();
        bytes[len - 2] = 0xFF;
        bytes[len - 1] = 0xFF;
        let result = parse(&bytes, FileRole::PlayerResult { player: 0 });
        assert!(matches!(result, Err(Error::InvalidFooter)));
    }
}
