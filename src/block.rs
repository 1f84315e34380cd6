//! Block framing: the 2-byte `(type << 10) | size` header shared by every
//! block in the stream, and the [`Block`] container that carries a block
//! through decrypt/decode/re-encrypt.

use std::io::Read;

use crate::Result;
use crate::utils;

/// Maximum body length representable in the 10-bit size field.
pub const MAX_BODY_LEN: usize = 0x3FF;

/// A decoded block header: 6-bit type, 10-bit size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub kind: u8,
    pub size: u16,
}

impl BlockHeader {
    /// Pack into the 16-bit wire representation.
    pub fn to_u16(self) -> u16 {
        ((self.kind as u16) << 10) | (self.size & (MAX_BODY_LEN as u16))
    }

    /// Unpack from the 16-bit wire representation.
    pub fn from_u16(word: u16) -> Self {
        BlockHeader {
            kind: (word >> 10) as u8,
            size: word & (MAX_BODY_LEN as u16),
        }
    }

    /// Read a header from a little-endian 16-bit word.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self::from_u16(utils::le_u16(r)?))
    }

    /// Encode as the two wire bytes.
    pub fn write_bytes(self) -> [u8; 2] {
        self.to_u16().to_le_bytes()
    }
}

/// Header (type 8) and footer (type 0) blocks are transmitted in the clear;
/// every other type is run through the file's [`crate::cipher::Keystream`].
pub fn is_encrypted(kind: u8) -> bool {
    !matches!(kind, 0 | 8)
}

/// A single block as read from (or about to be written to) the stream.
///
/// `raw` preserves the exact ciphertext bytes as read, so an unmodified
/// block can be re-emitted bit-exact without re-running its encoder.
/// `plain` is the decrypted body used for decoding and for in-place
/// re-encoding.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: u8,
    pub raw: Vec<u8>,
    pub plain: Vec<u8>,
    /// Trailing unencrypted payload immediately following this block's
    /// body in the stream (only the planets-universe block uses this).
    pub trailer: Vec<u8>,
}

impl Block {
    /// Read one framed block: header, then `size` bytes of body. Does not
    /// decrypt; callers advance a [`crate::cipher::Keystream`] and call
    /// [`Block::decrypt`] themselves so the cumulative cipher state stays
    /// correct across the whole file.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let header = BlockHeader::read(r)?;
        let raw = utils::bytesv(r, header.size as usize)?;
        Ok(Block {
            kind: header.kind,
            plain: raw.clone(),
            raw,
            trailer: Vec::new(),
        })
    }

    /// Decrypt `raw` into `plain` in place using the given keystream.
    /// No-op for header/footer blocks.
    pub fn decrypt(&mut self, ks: &mut crate::cipher::Keystream) {
        if is_encrypted(self.kind) {
            self.plain = self.raw.clone();
            ks.apply(&mut self.plain);
        } else {
            self.plain = self.raw.clone();
        }
    }

    /// Encrypt `plain` into `raw` in place using the given keystream, and
    /// return the bytes to emit (header + ciphertext). No-op transform for
    /// header/footer blocks.
    pub fn encrypt_and_frame(&self, ks: &mut crate::cipher::Keystream) -> Vec<u8> {
        let mut body = self.plain.clone();
        if is_encrypted(self.kind) {
            ks.apply(&mut body);
        }
        if body.len() > MAX_BODY_LEN {
            // A mutation grew a block past the representable size; callers
            // are expected to have validated this earlier. Truncation here
            // would silently corrupt the file, so this is a contract
            // violation rather than a recoverable condition.
            panic!("block body exceeds 10-bit size field");
        }
        let header = BlockHeader {
            kind: self.kind,
            size: body.len() as u16,
        };
        let mut out = Vec::with_capacity(2 + body.len());
        out.extend_from_slice(&header.write_bytes());
        out.extend_from_slice(&body);
        out
    }
}
