//! Player block: race definition and per-game player state.

use crate::codec;
use crate::{Error, Result};

/// Primary Racial Trait: one of 10 enumerated values.
pub type Prt = u8;

/// Lesser Racial Traits: a 16-bit bitmask.
pub type LrtMask = u16;

const GRAVITY_IMMUNE_BIT: u8 = 1 << 0;
const TEMPERATURE_IMMUNE_BIT: u8 = 1 << 1;
const RADIATION_IMMUNE_BIT: u8 = 1 << 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct HabitabilityRange {
    pub low: i8,
    pub high: i8,
}

#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub number: u8,
    pub singular_name: String,
    pub plural_name: String,
    pub icon: u8,
    pub relations: Vec<u8>,
    pub gravity: HabitabilityRange,
    pub temperature: HabitabilityRange,
    pub radiation: HabitabilityRange,
    pub immunity_flags: u8,
    pub growth_rate: u8,
    pub tech_levels: [u8; 6],
    pub research_cost_tiers: [u8; 6],
    pub production_params: [u8; 4],
    pub prt: Prt,
    pub lrt: LrtMask,
    pub password_hash: Option<u32>,
    pub score_snapshot: Option<u32>,
}

impl PlayerRecord {
    pub fn gravity_immune(&self) -> bool {
        self.immunity_flags & GRAVITY_IMMUNE_BIT != 0
    }
    pub fn temperature_immune(&self) -> bool {
        self.immunity_flags & TEMPERATURE_IMMUNE_BIT != 0
    }
    pub fn radiation_immune(&self) -> bool {
        self.immunity_flags & RADIATION_IMMUNE_BIT != 0
    }

    /// Decode the fixed-layout prefix (everything up to, but not
    /// including, the packed name region) and the packed names
    /// themselves. The prefix bytes are what the R-file footer checksum
    /// is computed over; callers keep them (`prefix_body`) for that.
    pub fn decode(body: &[u8]) -> Result<(Self, Vec<u8>)> {
        if body.len() < 24 {
            return Err(Error::ShortBlock);
        }
        let number = body[0];
        let icon = body[1];
        let n_relations = body[2] as usize;
        let mut off = 3;
        let relations = body
            .get(off..off + n_relations)
            .ok_or(Error::ShortBlock)?
            .to_vec();
        off += n_relations;

        let gravity = HabitabilityRange {
            low: body[off] as i8,
            high: body[off + 1] as i8,
        };
        let temperature = HabitabilityRange {
            low: body[off + 2] as i8,
            high: body[off + 3] as i8,
        };
        let radiation = HabitabilityRange {
            low: body[off + 4] as i8,
            high: body[off + 5] as i8,
        };
        let immunity_flags = body[off + 6];
        let growth_rate = body[off + 7];
        off += 8;

        let mut tech_levels = [0u8; 6];
        tech_levels.copy_from_slice(body.get(off..off + 6).ok_or(Error::ShortBlock)?);
        off += 6;
        let mut research_cost_tiers = [0u8; 6];
        research_cost_tiers.copy_from_slice(body.get(off..off + 6).ok_or(Error::ShortBlock)?);
        off += 6;
        let mut production_params = [0u8; 4];
        production_params.copy_from_slice(body.get(off..off + 4).ok_or(Error::ShortBlock)?);
        off += 4;

        let prt = *body.get(off).ok_or(Error::ShortBlock)?;
        off += 1;
        let lrt = u16::from_le_bytes([
            *body.get(off).ok_or(Error::ShortBlock)?,
            *body.get(off + 1).ok_or(Error::ShortBlock)?,
        ]);
        off += 2;

        let flags_byte = *body.get(off).ok_or(Error::ShortBlock)?;
        off += 1;
        let has_password = flags_byte & 0b01 != 0;
        let has_score = flags_byte & 0b10 != 0;

        let password_hash = if has_password {
            let v = u32::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
                *body.get(off + 3).ok_or(Error::ShortBlock)?,
            ]);
            off += 4;
            Some(v)
        } else {
            None
        };
        let score_snapshot = if has_score {
            let v = u32::from_le_bytes([
                *body.get(off).ok_or(Error::ShortBlock)?,
                *body.get(off + 1).ok_or(Error::ShortBlock)?,
                *body.get(off + 2).ok_or(Error::ShortBlock)?,
                *body.get(off + 3).ok_or(Error::ShortBlock)?,
            ]);
            off += 4;
            Some(v)
        } else {
            None
        };

        let prefix_body = body[..off].to_vec();

        let sing_len = *body.get(off).ok_or(Error::ShortBlock)? as usize;
        off += 1;
        let singular_name = codec::decode_stars_string(body, off, sing_len)?;
        off += sing_len;
        let plur_len = *body.get(off).ok_or(Error::ShortBlock)? as usize;
        off += 1;
        let plural_name = codec::decode_stars_string(body, off, plur_len)?;

        Ok((
            PlayerRecord {
                number,
                singular_name,
                plural_name,
                icon,
                relations,
                gravity,
                temperature,
                radiation,
                immunity_flags,
                growth_rate,
                tech_levels,
                research_cost_tiers,
                production_params,
                prt,
                lrt,
                password_hash,
                score_snapshot,
            },
            prefix_body,
        ))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.number, self.icon, self.relations.len() as u8];
        out.extend_from_slice(&self.relations);
        out.push(self.gravity.low as u8);
        out.push(self.gravity.high as u8);
        out.push(self.temperature.low as u8);
        out.push(self.temperature.high as u8);
        out.push(self.radiation.low as u8);
        out.push(self.radiation.high as u8);
        out.push(self.immunity_flags);
        out.push(self.growth_rate);
        out.extend_from_slice(&self.tech_levels);
        out.extend_from_slice(&self.research_cost_tiers);
        out.extend_from_slice(&self.production_params);
        out.push(self.prt);
        out.extend_from_slice(&self.lrt.to_le_bytes());
        let flags_byte =
            if self.password_hash.is_some() { 0b01 } else { 0 } | if self.score_snapshot.is_some() { 0b10 } else { 0 };
        out.push(flags_byte);
        if let Some(h) = self.password_hash {
            out.extend_from_slice(&h.to_le_bytes());
        }
        if let Some(s) = self.score_snapshot {
            out.extend_from_slice(&s.to_le_bytes());
        }
        let sing_packed = codec::encode_stars_string(&self.singular_name);
        out.push(sing_packed.len() as u8);
        out.extend_from_slice(&sing_packed);
        let plur_packed = codec::encode_stars_string(&self.plural_name);
        out.push(plur_packed.len() as u8);
        out.extend_from_slice(&plur_packed);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn humanoid() -> PlayerRecord {
        PlayerRecord {
            number: 0,
            singular_name: "Humanoid".to_string(),
            plural_name: "Humanoids".to_string(),
            icon: 1,
            relations: vec![1, 1],
            gravity: HabitabilityRange { low: 15, high: 85 },
            temperature: HabitabilityRange { low: 15, high: 85 },
            radiation: HabitabilityRange { low: 15, high: 85 },
            immunity_flags: 0,
            growth_rate: 15,
            tech_levels: [3, 3, 3, 3, 3, 3],
            research_cost_tiers: [1, 1, 1, 1, 1, 1],
            production_params: [10, 10, 10, 10],
            prt: 9,
            lrt: 0,
            password_hash: None,
            score_snapshot: None,
        }
    }

    #[test]
    fn humanoid_roundtrips_with_expected_prt_and_lrt() {
        let player = humanoid();
        let bytes = player.encode();
        let (decoded, _prefix) = PlayerRecord::decode(&bytes).unwrap();
        assert_eq!(decoded.singular_name, "Humanoid");
        assert_eq!(decoded.plural_name, "Humanoids");
        assert_eq!(decoded.prt, 9);
        assert_eq!(decoded.lrt, 0);
    }

    #[test]
    fn insectoid_gravity_immunity_flag_roundtrips() {
        let mut player = humanoid();
        player.singular_name = "Insectoid".to_string();
        player.plural_name = "Insectoids".to_string();
        player.immunity_flags = GRAVITY_IMMUNE_BIT;
        let bytes = player.encode();
        let (decoded, _) = PlayerRecord::decode(&bytes).unwrap();
        assert!(decoded.gravity_immune());
        assert!(!decoded.temperature_immune());
    }

    #[test]
    fn prefix_body_excludes_packed_names() {
        let player = humanoid();
        let bytes = player.encode();
        let (_decoded, prefix) = PlayerRecord::decode(&bytes).unwrap();
        assert!(prefix.len() < bytes.len());
    }
}
