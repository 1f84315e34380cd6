//! **starscodec** - a byte-exact codec, entity merge store, and password
//! cracker for a 1990s turn-based strategy game's proprietary encrypted
//! save-game format.
//!
//! # Modules
//! | Module | Responsibility |
//! |--------|-----------------|
//! | [`codec`]    | Primitive integer/varlen/packed-text encoding |
//! | [`cipher`]   | File-scoped stream cipher keystream |
//! | [`block`]    | Block header framing (6-bit type, 10-bit size) |
//! | [`blocks`]   | Per-block-type decoders and encoders |
//! | [`file`]     | Header/footer parsing and file-level read/write loop |
//! | [`entity`]   | Entity keys, data quality, merge store and resolver |
//! | [`regen`]    | File regeneration: re-emit a player's file from the store |
//! | [`password`] | Name hash and parallel preimage search |
//!
//! Files are read into memory by the caller and passed in as byte buffers;
//! nothing in this crate owns a file handle or performs I/O of its own.

pub mod block;
pub mod blocks;
pub mod cipher;
pub mod codec;
pub mod entity;
pub mod error;
pub mod file;
pub mod password;
pub mod regen;
pub(crate) mod utils;

pub use error::{Error, Result};
