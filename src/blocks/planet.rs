//! Partial/full planet records (block types 13 and 14).
//!
//! The hardest decoder in the crate: a variable-length record whose layout
//! is entirely driven by a 16-bit presence-flag word, walked in a fixed
//! section order. See module-level bit constants for the flag layout.

use crate::codec::{self, VarlenCode};
use crate::{Error, Result};

pub const BLOCK_TYPE_PARTIAL: u8 = 13;
pub const BLOCK_TYPE_FULL: u8 = 14;

pub const FLAG_ROBBER_BARON: u16 = 1 << 0;
pub const FLAG_HAS_ENVIRONMENT_INFO: u16 = 1 << 1;
pub const FLAG_REMOTE_MINING_INV: u16 = 1 << 2;
pub const FLAG_IS_HOMEWORLD: u16 = 1 << 3;
pub const FLAG_HAS_STARBASE: u16 = 1 << 4;
pub const FLAG_IS_TERRAFORMED: u16 = 1 << 5;
pub const FLAG_HAS_INSTALLATIONS: u16 = 1 << 6;
pub const FLAG_HAS_ARTIFACT: u16 = 1 << 7;
pub const FLAG_HAS_SURFACE_MINERALS: u16 = 1 << 8;
pub const FLAG_HAS_ROUTE: u16 = 1 << 9;
/// Historical bit with no documented meaning; preserved verbatim on
/// re-encode rather than interpreted. See open questions in `DESIGN.md`.
pub const FLAG_WEIRD: u16 = 1 << 10;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub concentrations: [u8; 3],
    pub current: [u8; 3],
    pub original: Option<[u8; 3]>,
    pub owner_view: Option<(u8, u8)>, // (defense %, population estimate)
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceMinerals {
    pub ironium: i64,
    pub boranium: i64,
    pub germanium: i64,
    pub population: i64,
    codes: [VarlenCode; 4],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Installations {
    pub delta_population: u32,
    pub mines: u16,
    pub factories: u16,
    pub defenses: u16,
    pub scanner_id: u8,
    pub flags: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Starbase {
    pub design_nibble: u8,
    /// Only present on the full variant.
    pub mass_driver_dest: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct PlanetRecord {
    pub full: bool,
    pub number: u16,
    pub owner: Option<u8>, // None == unowned (raw value 31)
    pub flags: u16,
    pub environment: Option<Environment>,
    pub surface_minerals: Option<SurfaceMinerals>,
    pub installations: Option<Installations>,
    pub starbase: Option<Starbase>,
    pub route_target: Option<u16>,
    pub turn_stamp: Option<u16>,
}

fn decode_owner(raw: u8) -> Option<u8> {
    if raw == 31 { None } else { Some(raw) }
}

fn encode_owner(owner: Option<u8>) -> u8 {
    owner.unwrap_or(31)
}

impl PlanetRecord {
    pub fn decode(body: &[u8], full: bool) -> Result<Self> {
        if body.len() < 4 {
            return Err(Error::ShortBlock);
        }
        let word0 = u16::from_le_bytes([body[0], body[1]]);
        let number = word0 & 0x07FF;
        let owner = decode_owner(((word0 >> 11) & 0x1F) as u8);
        let flags = u16::from_le_bytes([body[2], body[3]]);
        let mut off = 4;

        let environment = if flags & FLAG_HAS_ENVIRONMENT_INFO != 0 {
            let len_byte = *body.get(off).ok_or(Error::ShortBlock)?;
            off += 1;
            let ext0 = 1 + (len_byte & 0b11) as usize;
            let ext1 = (len_byte >> 2 & 0b11) as usize;
            let ext2 = (len_byte >> 4 & 0b11) as usize;
            // Extension bytes are reserved scratch space the original
            // format allots but this decoder does not further subdivide;
            // skip them to keep offsets aligned.
            off += ext0 + ext1 + ext2 - 1;
            let concentrations = [
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
            ];
            off += 3;
            let current = [
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
            ];
            off += 3;
            let original = if flags & FLAG_IS_TERRAFORMED != 0 {
                let o = [
                    *body.get(off).ok_or(Error::ShortBlock)?,
                    *body.get(off + 1).ok_or(Error::ShortBlock)?,
                    *body.get(off + 2).ok_or(Error::ShortBlock)?,
                ];
                off += 3;
                Some(o)
            } else {
                None
            };
            let owner_view = if owner.is_some() {
                let v = (
                    *body.get(off).ok_or(Error::ShortBlock)?,
                    *body.get(off + 1).ok_or(Error::ShortBlock)?,
                );
                off += 2;
                Some(v)
            } else {
                None
            };
            Some(Environment {
                concentrations,
                current,
                original,
                owner_view,
            })
        } else {
            None
        };

        let surface_minerals = if flags & FLAG_HAS_SURFACE_MINERALS != 0 {
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
            Some(SurfaceMinerals {
                ironium,
                boranium,
                germanium,
                population,
                codes,
            })
        } else {
            None
        };

        let installations = if flags & FLAG_HAS_INSTALLATIONS != 0 {
            let w0 = u32::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
                *body.get(off + 3).ok_or(Error::ShortBlock)?,
            ]);
            off += 4;
            let w1 = u32::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
                *body.get(off + 3).ok_or(Error::ShortBlock)?,
            ]);
            off += 4;
            Some(Installations {
                delta_population: w0 & 0xFF,
                mines: ((w0 >> 8) & 0xFFF) as u16,
                factories: ((w0 >> 20) & 0xFFF) as u16,
                defenses: (w1 & 0xFFF) as u16,
                scanner_id: ((w1 >> 12) & 0x1F) as u8,
                flags: ((w1 >> 17) & 0b11) as u8,
            })
        } else {
            None
        };

        let starbase = if flags & FLAG_HAS_STARBASE != 0 {
            if full {
                let design_nibble = *body.get(off).ok_or(Error::ShortBlock)? & 0x0F;
                let mass_driver_dest = *body.get(off + 1).ok_or(Error::ShortBlock)?;
                off += 4;
                Some(Starbase {
                    design_nibble,
                    mass_driver_dest: Some(mass_driver_dest),
                })
            } else {
                let design_nibble = *body.get(off).ok_or(Error::ShortBlock)? & 0x0F;
                off += 1;
                Some(Starbase {
                    design_nibble,
                    mass_driver_dest: None,
                })
            }
        } else {
            None
        };

        let route_target = if flags & FLAG_HAS_ROUTE != 0 && full {
            let v = u16::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
            ]);
            off += 2;
            Some(v)
        } else {
            None
        };

        let turn_stamp = if body.len() - off == 2 {
            Some(u16::from_le_bytes([body[off], body[off + 1]]))
        } else {
            None
        };

        Ok(PlanetRecord {
            full,
            number,
            owner,
            flags,
            environment,
            surface_minerals,
            installations,
            starbase,
            route_target,
            turn_stamp,
        })
    }

    /// Full rebuild: recompute every section length from current field
    /// values. Used when a mutation changed a varlen's byte width.
    pub fn encode_rebuilt(&self) -> Vec<u8> {
        let word0 = (self.number & 0x07FF) | ((encode_owner(self.owner) as u16) << 11);
        let mut out = Vec::new();
        out.extend_from_slice(&word0.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());

        if let Some(env) = &self.environment {
            out.push(0b0000_0000); // single extension byte each, minimal layout
            out.extend_from_slice(&env.concentrations);
            out.extend_from_slice(&env.current);
            if let Some(o) = env.original {
                out.extend_from_slice(&o);
            }
            if let Some((d, p)) = env.owner_view {
                out.push(d);
                out.push(p);
            }
        }
        if let Some(sm) = &self.surface_minerals {
            let codes = [
                VarlenCode::smallest_for(sm.ironium),
                VarlenCode::smallest_for(sm.boranium),
                VarlenCode::smallest_for(sm.germanium),
                VarlenCode::smallest_for(sm.population),
            ];
            out.push(codec::pack_length_codes(codes));
            codec::write_varlen(&mut out, sm.ironium, codes[0]);
            codec::write_varlen(&mut out, sm.boranium, codes[1]);
            codec::write_varlen(&mut out, sm.germanium, codes[2]);
            codec::write_varlen(&mut out, sm.population, codes[3]);
        }
        if let Some(inst) = &self.installations {
            let w0 = (inst.delta_population & 0xFF)
                | ((inst.mines as u32 & 0xFFF) << 8)
                | ((inst.factories as u32 & 0xFFF) << 20);
            let w1 = (inst.defenses as u32 & 0xFFF)
                | ((inst.scanner_id as u32 & 0x1F) << 12)
                | ((inst.flags as u32 & 0b11) << 17);
            out.extend_from_slice(&w0.to_le_bytes());
            out.extend_from_slice(&w1.to_le_bytes());
        }
        if let Some(sb) = &self.starbase {
            if self.full {
                out.push(sb.design_nibble & 0x0F);
                out.push(sb.mass_driver_dest.unwrap_or(0));
                out.push(0);
                out.push(0);
            } else {
                out.push(sb.design_nibble & 0x0F);
            }
        }
        if self.full {
            if let Some(route) = self.route_target {
                out.extend_from_slice(&route.to_le_bytes());
            }
        }
        if let Some(turn) = self.turn_stamp {
            out.extend_from_slice(&turn.to_le_bytes());
        }
        out
    }

    /// Byte offset of the surface-minerals section's lengths byte within a
    /// record, i.e. the offset just past the (fixed-layout) environment
    /// section. Mirrors the section walk in [`Self::decode`] without
    /// re-reading any values, since `encode_in_place` never touches
    /// anything ahead of the surface-minerals section.
    fn surface_minerals_offset(&self, body: &[u8]) -> Result<usize> {
        let mut off = 4;
        if self.flags & FLAG_HAS_ENVIRONMENT_INFO != 0 {
            let len_byte = *body.get(off).ok_or(Error::ShortBlock)?;
            off += 1;
            let ext0 = 1 + (len_byte & 0b11) as usize;
            let ext1 = (len_byte >> 2 & 0b11) as usize;
            let ext2 = (len_byte >> 4 & 0b11) as usize;
            off += ext0 + ext1 + ext2 - 1;
            off += 3 + 3; // concentrations, current
            if self.flags & FLAG_IS_TERRAFORMED != 0 {
                off += 3; // original
            }
            if self.owner.is_some() {
                off += 2; // owner_view
            }
        }
        Ok(off)
    }

    /// In-place overwrite: reuse the original bytes' varlen codes and
    /// section boundaries, only patching values that fit in their existing
    /// width. Falls back to [`Self::encode_rebuilt`] when a value no
    /// longer fits the original surface-mineral width.
    pub fn encode_in_place(&self, original: &[u8]) -> Result<Vec<u8>> {
        let mut out = original.to_vec();
        if let Some(sm) = &self.surface_minerals {
            for (code, value) in sm
                .codes
                .iter()
                .zip([sm.ironium, sm.boranium, sm.germanium, sm.population])
            {
                if VarlenCode::smallest_for(value).byte_len() > code.byte_len() {
                    return Ok(self.encode_rebuilt());
                }
            }
            let mut off = self.surface_minerals_offset(original)? + 1; // skip lengths byte
            for (code, value) in sm
                .codes
                .iter()
                .zip([sm.ironium, sm.boranium, sm.germanium, sm.population])
            {
                let n = code.byte_len();
                if n > 0 {
                    let bytes = (value as u64).to_le_bytes();
                    out.get_mut(off..off + n)
                        .ok_or(Error::ShortBlock)?
                        .copy_from_slice(&bytes[..n]);
                }
                off += n;
            }
        }
        out[0..2].copy_from_slice(
            &((self.number & 0x07FF) | ((encode_owner(self.owner) as u16) << 11)).to_le_bytes(),
        );
        out[2..4].copy_from_slice(&self.flags.to_le_bytes());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_record() -> PlanetRecord {
        PlanetRecord {
            full: true,
            number: 318,
            owner: Some(3),
            flags: 0,
            environment: None,
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_stamp: None,
        }
    }

    #[test]
    fn header_fields_roundtrip() {
        let rec = minimal_record();
        let bytes = rec.encode_rebuilt();
        let decoded = PlanetRecord::decode(&bytes, true).unwrap();
        assert_eq!(decoded.number, 318);
        assert_eq!(decoded.owner, Some(3));
    }

    #[test]
    fn unowned_planet_uses_sentinel() {
        let mut rec = minimal_record();
        rec.owner = None;
        let bytes = rec.encode_rebuilt();
        let decoded = PlanetRecord::decode(&bytes, true).unwrap();
        assert_eq!(decoded.owner, None);
    }

    #[test]
    fn surface_minerals_roundtrip() {
        let mut rec = minimal_record();
        rec.flags |= FLAG_HAS_SURFACE_MINERALS;
        rec.surface_minerals = Some(SurfaceMinerals {
            ironium: 1200,
            boranium: 40,
            germanium: 0,
            population: 70000,
            codes: [VarlenCode::Two, VarlenCode::One, VarlenCode::Zero, VarlenCode::Four],
        });
        let bytes = rec.encode_rebuilt();
        let decoded = PlanetRecord::decode(&bytes, true).unwrap();
        let sm = decoded.surface_minerals.unwrap();
        assert_eq!(sm.ironium, 1200);
        assert_eq!(sm.boranium, 40);
        assert_eq!(sm.germanium, 0);
        assert_eq!(sm.population, 70000);
    }

    #[test]
    fn in_place_overwrite_preserves_untouched_bytes() {
        let mut rec = minimal_record();
        rec.flags |= FLAG_HAS_SURFACE_MINERALS;
        rec.surface_minerals = Some(SurfaceMinerals {
            ironium: 100,
            boranium: 40,
            germanium: 0,
            population: 70000,
            codes: [VarlenCode::One, VarlenCode::One, VarlenCode::Zero, VarlenCode::Four],
        });
        let original = rec.encode_rebuilt();

        let mut mutated = rec.clone();
        mutated.surface_minerals.as_mut().unwrap().ironium = 200; // still fits 1 byte
        let patched = mutated.encode_in_place(&original).unwrap();

        assert_eq!(patched.len(), original.len());
        let decoded = PlanetRecord::decode(&patched, true).unwrap();
        let sm = decoded.surface_minerals.unwrap();
        assert_eq!(sm.ironium, 200);
        assert_eq!(sm.boranium, 40);
        assert_eq!(sm.population, 70000);
    }

    #[test]
    fn in_place_overwrite_falls_back_to_rebuild_when_width_grows() {
        let mut rec = minimal_record();
        rec.flags |= FLAG_HAS_SURFACE_MINERALS;
        rec.surface_minerals = Some(SurfaceMinerals {
            ironium: 100,
            boranium: 40,
            germanium: 0,
            population: 70000,
            codes: [VarlenCode::One, VarlenCode::One, VarlenCode::Zero, VarlenCode::Four],
        });
        let original = rec.encode_rebuilt();

        let mut mutated = rec.clone();
        mutated.surface_minerals.as_mut().unwrap().ironium = 90_000; // no longer fits 1 byte
        let patched = mutated.encode_in_place(&original).unwrap();

        let decoded = PlanetRecord::decode(&patched, true).unwrap();
        let sm = decoded.surface_minerals.unwrap();
        assert_eq!(sm.ironium, 90_000);
    }

    #[test]
    fn in_place_overwrite_with_environment_section_patches_correct_offset() {
        let mut rec = minimal_record();
        rec.flags |= FLAG_HAS_ENVIRONMENT_INFO | FLAG_HAS_SURFACE_MINERALS;
        rec.environment = Some(Environment {
            concentrations: [10, 20, 30],
            current: [11, 21, 31],
            original: None,
            owner_view: Some((50, 75)),
        });
        rec.surface_minerals = Some(SurfaceMinerals {
            ironium: 5,
            boranium: 6,
            germanium: 7,
            population: 8,
            codes: [VarlenCode::One, VarlenCode::One, VarlenCode::One, VarlenCode::One],
        });
        let original = rec.encode_rebuilt();

        let mut mutated = rec.clone();
        mutated.surface_minerals.as_mut().unwrap().germanium = 99;
        let patched = mutated.encode_in_place(&original).unwrap();

        let decoded = PlanetRecord::decode(&patched, true).unwrap();
        let env = decoded.environment.unwrap();
        assert_eq!(env.concentrations, [10, 20, 30]);
        assert_eq!(env.owner_view, Some((50, 75)));
        let sm = decoded.surface_minerals.unwrap();
        assert_eq!(sm.ironium, 5);
        assert_eq!(sm.germanium, 99);
    }
}
