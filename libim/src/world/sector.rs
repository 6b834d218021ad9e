//! Sectors: the space-partitioning volumes the engine groups surfaces into.
//!
//! Ported from `original_source/src/libim/content/asset/world/sector.h`.

use std::io::{Read, Write};

use bitflags::bitflags;

use crate::error::StreamError;
use crate::math::{Box3, Vector2, Vector3, Vector4};
use crate::stream::{read_fixed_string, write_fixed_string, Decode, Encode};

const SECTOR_SOUND_NAME_LEN: usize = 64;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectorFlags: u32 {
        const NO_GRAVITY = 0x1;
        const UNDERWATER = 0x2;
        const COG_LINKED = 0x4;
        const HAS_THRUST = 0x8;
        const HIDE_ON_AUTOMAP = 0x10;
        const NO_ACTOR_ENTER = 0x20;
        const PIT = 0x40;
        const WATER = 0x100;
        const HAS_COLLIDE_BOX = 0x1000;
        const SEEN = 0x4000;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientSound {
    pub sound: String,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub id: u32,
    pub flags: SectorFlags,
    pub tint: Vector3,
    pub pvs_idx: u32,
    pub center: Vector3,
    pub radius: f32,
    pub thrust: Vector3,
    pub bound_box: Box3,
    pub collide_box: Box3,
    pub ambient_light: Vector4,
    pub extra_light: Vector4,
    pub avg_light_pos: Vector3,
    pub avg_light_int: Vector4,
    pub avg_light_falloff: Vector2,
    pub ambient_sound: Option<AmbientSound>,
    pub vert_idxs: Vec<u32>,
    pub surfaces_first_idx: u32,
    pub surfaces_count: u32,
}

impl Decode for Sector {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        let id = u32::decode(stream)?;
        let flags = SectorFlags::from_bits_truncate(u32::decode(stream)?);
        let tint = read_vec3(stream)?;
        let pvs_idx = u32::decode(stream)?;
        let center = read_vec3(stream)?;
        let radius = f32::decode(stream)?;
        let thrust = read_vec3(stream)?;
        let bound_box = read_box3(stream)?;
        let collide_box = read_box3(stream)?;
        let ambient_light = read_color4(stream)?;
        let extra_light = read_color4(stream)?;
        let avg_light_pos = read_vec3(stream)?;
        let avg_light_int = read_color4(stream)?;
        let avg_light_falloff = {
            let x = f32::decode(stream)?;
            let y = f32::decode(stream)?;
            Vector2::new(x, y)
        };

        let has_ambient_sound = u32::decode(stream)?;
        let ambient_sound = if has_ambient_sound != 0 {
            let sound = read_fixed_string(stream, SECTOR_SOUND_NAME_LEN)?;
            let volume = f32::decode(stream)?;
            Some(AmbientSound { sound, volume })
        } else {
            None
        };

        let num_vert_idxs = u32::decode(stream)?;
        let mut vert_idxs = Vec::with_capacity(num_vert_idxs as usize);
        for _ in 0..num_vert_idxs {
            vert_idxs.push(u32::decode(stream)?);
        }

        let surfaces_first_idx = u32::decode(stream)?;
        let surfaces_count = u32::decode(stream)?;

        Ok(Self {
            id,
            flags,
            tint,
            pvs_idx,
            center,
            radius,
            thrust,
            bound_box,
            collide_box,
            ambient_light,
            extra_light,
            avg_light_pos,
            avg_light_int,
            avg_light_falloff,
            ambient_sound,
            vert_idxs,
            surfaces_first_idx,
            surfaces_count,
        })
    }
}

impl Encode for Sector {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.id.encode(stream)?;
        self.flags.bits().encode(stream)?;
        write_vec3(stream, self.tint)?;
        self.pvs_idx.encode(stream)?;
        write_vec3(stream, self.center)?;
        self.radius.encode(stream)?;
        write_vec3(stream, self.thrust)?;
        write_box3(stream, self.bound_box)?;
        write_box3(stream, self.collide_box)?;
        write_color4(stream, self.ambient_light)?;
        write_color4(stream, self.extra_light)?;
        write_vec3(stream, self.avg_light_pos)?;
        write_color4(stream, self.avg_light_int)?;
        self.avg_light_falloff.x.encode(stream)?;
        self.avg_light_falloff.y.encode(stream)?;

        match &self.ambient_sound {
            Some(snd) => {
                1u32.encode(stream)?;
                write_fixed_string(stream, SECTOR_SOUND_NAME_LEN, &snd.sound)?;
                snd.volume.encode(stream)?;
            }
            None => {
                0u32.encode(stream)?;
            }
        }

        (self.vert_idxs.len() as u32).encode(stream)?;
        for v in &self.vert_idxs {
            v.encode(stream)?;
        }

        self.surfaces_first_idx.encode(stream)?;
        self.surfaces_count.encode(stream)?;
        Ok(())
    }
}

fn read_vec3<S: Read + ?Sized>(stream: &mut S) -> Result<Vector3, StreamError> {
    let x = f32::decode(stream)?;
    let y = f32::decode(stream)?;
    let z = f32::decode(stream)?;
    Ok(Vector3::new(x, y, z))
}

fn write_vec3<S: Write + ?Sized>(stream: &mut S, v: Vector3) -> Result<(), StreamError> {
    v.x.encode(stream)?;
    v.y.encode(stream)?;
    v.z.encode(stream)?;
    Ok(())
}

fn read_box3<S: Read + ?Sized>(stream: &mut S) -> Result<Box3, StreamError> {
    let min = read_vec3(stream)?;
    let max = read_vec3(stream)?;
    Ok(Box3::new(min, max))
}

fn write_box3<S: Write + ?Sized>(stream: &mut S, b: Box3) -> Result<(), StreamError> {
    write_vec3(stream, b.min)?;
    write_vec3(stream, b.max)?;
    Ok(())
}

fn read_color4<S: Read + ?Sized>(stream: &mut S) -> Result<Vector4, StreamError> {
    let r = f32::decode(stream)?;
    let g = f32::decode(stream)?;
    let b = f32::decode(stream)?;
    let a = f32::decode(stream)?;
    Ok(Vector4::new(r, g, b, a))
}

fn write_color4<S: Write + ?Sized>(stream: &mut S, c: Vector4) -> Result<(), StreamError> {
    c.x.encode(stream)?;
    c.y.encode(stream)?;
    c.z.encode(stream)?;
    c.w.encode(stream)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn sample() -> Sector {
        Sector {
            id: 0,
            flags: SectorFlags::UNDERWATER,
            tint: Vector3::ZERO,
            pvs_idx: 0,
            center: Vector3::ZERO,
            radius: 10.0,
            thrust: Vector3::ZERO,
            bound_box: Box3::default(),
            collide_box: Box3::default(),
            ambient_light: Vector4::ONE,
            extra_light: Vector4::ZERO,
            avg_light_pos: Vector3::ZERO,
            avg_light_int: Vector4::ONE,
            avg_light_falloff: Vector2::new(1.0, 2.0),
            ambient_sound: Some(AmbientSound {
                sound: "amb_cave.wav".to_owned(),
                volume: 0.5,
            }),
            vert_idxs: vec![0, 1, 2, 3],
            surfaces_first_idx: 0,
            surfaces_count: 6,
        }
    }

    #[test]
    fn sector_round_trip_with_ambient_sound() {
        let sector = sample();
        let mut s = MemoryStream::new();
        sector.encode(&mut s).unwrap();
        s.seek_to(0).unwrap();
        let back = Sector::decode(&mut s).unwrap();
        assert_eq!(back, sector);
    }

    #[test]
    fn sector_round_trip_without_ambient_sound() {
        let mut sector = sample();
        sector.ambient_sound = None;
        let mut s = MemoryStream::new();
        sector.encode(&mut s).unwrap();
        s.seek_to(0).unwrap();
        let back = Sector::decode(&mut s).unwrap();
        assert_eq!(back.ambient_sound, None);
    }
}
