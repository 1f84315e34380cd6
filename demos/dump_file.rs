//! Parses a save file named on the command line and prints its header
//! fields and block list. Mirrors the shape of a minimal client against
//! `starscodec::file`.

use std::env;
use std::fs;

use starscodec::file::{self, FileRole};
use starscodec::Result;

fn main() -> Result<()> {
    let path = env::args().nth(1).expect("usage: dump_file <path>");
    let bytes = fs::read(&path)?;
    let parsed = file::parse(&bytes, FileRole::PlayerResult { player: 0 })?;

    println!("game id:    {}", parsed.header.game_id);
    println!("turn:       {}", parsed.header.turn);
    println!("player:     {}", parsed.header.player_slot);
    println!("shareware:  {}", parsed.header.shareware);
    println!("blocks:     {}", parsed.blocks.len());
    for block in &parsed.blocks {
        println!("  type {:>2}  {} bytes", block.kind, block.plain.len());
    }
    Ok(())
}
