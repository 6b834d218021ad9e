//! World geometry resources (component J).
//!
//! Ported from `original_source/src/libim/content/asset/world/georesource.h` and its
//! on-disk counterparts `cnd_surface.h`/`cnd_adjoin.h`: surfaces and adjoins use the
//! packed `Cnd*` shapes on disk (indices instead of pointers), widened to
//! `Option<usize>` in memory the same way the C++ uses `std::optional<std::size_t>`.

use std::io::{Read, Write};

use bitflags::bitflags;

use crate::error::StreamError;
use crate::math::{Vector2, Vector3, Vector4};
use crate::stream::Decode;
use crate::stream::Encode;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SurfaceFlags: u32 {
        const FLOOR = 0x1;
        const COG_LINKED = 0x2;
        const IMPASSABLE = 0x4;
        const AI_CANNOT_WALK_ON_FLOOR = 0x8;
        const DOUBLE_TEXTURE_SCALE = 0x10;
        const HALF_TEXTURE_SCALE = 0x20;
        const EIGHTH_TEXTURE_SCALE = 0x40;
        const NO_FALLING_DAMAGE = 0x80;
        const HORIZON_SKY = 0x200;
        const CEILING_SKY = 0x400;
        const SCROLLING = 0x800;
        const KILL_FLOOR = 0x1000;
        const CLIMBABLE = 0x2000;
        const MINE_CAR_TRACK = 0x4000;
        const METAL = 0x10000;
        const DEEP_WATER = 0x20000;
        const SHALLOW_WATER = 0x40000;
        const DIRT = 0x80000;
        const WEB = 0x100000;
        const LAVA = 0x200000;
        const HANGABLE = 0x1000000;
        const WATER_CLIMB_OUT_LEDGE = 0x2000000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AdjoinFlags: u32 {
        const VISIBLE = 0x1;
        const ALLOW_MOVEMENT = 0x2;
        const ALLOW_SOUND = 0x4;
        const ALLOW_PLAYER_ONLY = 0x8;
        const ALLOW_AI_ONLY = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceAdjoin {
    pub flags: AdjoinFlags,
    pub mirror_idx: Option<u32>,
    pub distance: f32,
}

impl Decode for SurfaceAdjoin {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        let flags = AdjoinFlags::from_bits_truncate(u32::decode(stream)?);
        let mirror = i32::decode(stream)?;
        let distance = f32::decode(stream)?;
        Ok(Self {
            flags,
            mirror_idx: (mirror >= 0).then_some(mirror as u32),
            distance,
        })
    }
}

impl Encode for SurfaceAdjoin {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.flags.bits().encode(stream)?;
        self.mirror_idx.map_or(-1i32, |i| i as i32).encode(stream)?;
        self.distance.encode(stream)?;
        Ok(())
    }
}

/// A single vertex reference belonging to a surface: position index, optional
/// texture-vertex index, and that vertex's ambient-light tint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceVertex {
    pub vert_idx: u32,
    pub tex_idx: Option<u32>,
    pub color: Vector4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub material_idx: Option<u32>,
    pub flags: SurfaceFlags,
    pub face_flags: u32,
    pub geo_mode: u32,
    pub light_mode: u32,
    pub adjoin_idx: Option<u32>,
    pub color: Vector4,
    pub normal: Vector3,
    pub verts: Vec<SurfaceVertex>,
}

impl Decode for Surface {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        let material_idx = i32::decode(stream)?;
        let flags = SurfaceFlags::from_bits_truncate(u32::decode(stream)?);
        let face_flags = u32::decode(stream)?;
        let geo_mode = u32::decode(stream)?;
        let light_mode = u32::decode(stream)?;
        let adjoin_idx = i32::decode(stream)?;
        let color = read_color4(stream)?;
        let normal = read_vec3(stream)?;
        let num_verts = u32::decode(stream)?;

        let mut verts = Vec::with_capacity(num_verts as usize);
        for _ in 0..num_verts {
            let vert_idx = i32::decode(stream)?;
            let tex_idx = i32::decode(stream)?;
            let color = read_color4(stream)?;
            verts.push(SurfaceVertex {
                vert_idx: vert_idx as u32,
                tex_idx: (tex_idx >= 0).then_some(tex_idx as u32),
                color,
            });
        }

        Ok(Self {
            material_idx: (material_idx >= 0).then_some(material_idx as u32),
            flags,
            face_flags,
            geo_mode,
            light_mode,
            adjoin_idx: (adjoin_idx >= 0).then_some(adjoin_idx as u32),
            color,
            normal,
            verts,
        })
    }
}

impl Encode for Surface {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.material_idx.map_or(-1i32, |i| i as i32).encode(stream)?;
        self.flags.bits().encode(stream)?;
        self.face_flags.encode(stream)?;
        self.geo_mode.encode(stream)?;
        self.light_mode.encode(stream)?;
        self.adjoin_idx.map_or(-1i32, |i| i as i32).encode(stream)?;
        write_color4(stream, self.color)?;
        write_vec3(stream, self.normal)?;
        (self.verts.len() as u32).encode(stream)?;
        for v in &self.verts {
            (v.vert_idx as i32).encode(stream)?;
            v.tex_idx.map_or(-1i32, |i| i as i32).encode(stream)?;
            write_color4(stream, v.color)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoResource {
    pub verts: Vec<Vector3>,
    pub tex_verts: Vec<Vector2>,
    pub adjoins: Vec<SurfaceAdjoin>,
    pub surfaces: Vec<Surface>,
}

impl GeoResource {
    /// Reads exactly `num_verts`/`num_tex_verts`/`num_adjoins`/`num_surfaces` entries,
    /// taken from the containing `CndHeader`'s `num_vertices`/`num_tex_vertices`/
    /// `num_adjoins`/`num_surfaces` fields rather than a length prefix embedded in
    /// this section: the header counts are authoritative, matching how
    /// `original_source/programs/cndtool/cnd.h`'s `parseSection_Georesource` is
    /// driven by the already-decoded header instead of re-reading its own counts.
    pub fn read<S: Read + ?Sized>(
        stream: &mut S,
        num_verts: u32,
        num_tex_verts: u32,
        num_adjoins: u32,
        num_surfaces: u32,
    ) -> Result<Self, StreamError> {
        let mut verts = Vec::with_capacity(num_verts as usize);
        for _ in 0..num_verts {
            verts.push(read_vec3(stream)?);
        }

        let mut tex_verts = Vec::with_capacity(num_tex_verts as usize);
        for _ in 0..num_tex_verts {
            let x = f32::decode(stream)?;
            let y = f32::decode(stream)?;
            tex_verts.push(Vector2::new(x, y));
        }

        let mut adjoins = Vec::with_capacity(num_adjoins as usize);
        for _ in 0..num_adjoins {
            adjoins.push(SurfaceAdjoin::decode(stream)?);
        }

        let mut surfaces = Vec::with_capacity(num_surfaces as usize);
        for _ in 0..num_surfaces {
            surfaces.push(Surface::decode(stream)?);
        }

        Ok(Self {
            verts,
            tex_verts,
            adjoins,
            surfaces,
        })
    }

    /// Writes the sections back to back with no length prefixes: the header's
    /// `num_vertices`/`num_tex_vertices`/`num_adjoins`/`num_surfaces` fields are what
    /// a reader consults to know how much to consume, kept in sync by
    /// `World::sync_header`.
    pub fn write<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        for v in &self.verts {
            write_vec3(stream, *v)?;
        }
        for v in &self.tex_verts {
            v.x.encode(stream)?;
            v.y.encode(stream)?;
        }
        for a in &self.adjoins {
            a.encode(stream)?;
        }
        for s in &self.surfaces {
            s.encode(stream)?;
        }
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

    #[test]
    fn georesource_round_trip() {
        let geo = GeoResource {
            verts: vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 3.0)],
            tex_verts: vec![Vector2::new(0.0, 0.0)],
            adjoins: vec![SurfaceAdjoin {
                flags: AdjoinFlags::VISIBLE,
                mirror_idx: None,
                distance: 1.5,
            }],
            surfaces: vec![Surface {
                material_idx: Some(0),
                flags: SurfaceFlags::FLOOR,
                face_flags: 0,
                geo_mode: 0,
                light_mode: 0,
                adjoin_idx: Some(0),
                color: Vector4::ONE,
                normal: Vector3::Z,
                verts: vec![SurfaceVertex {
                    vert_idx: 0,
                    tex_idx: Some(0),
                    color: Vector4::ONE,
                }],
            }],
        };

        let mut s = MemoryStream::new();
        geo.write(&mut s).unwrap();
        s.seek_to(0).unwrap();
        let back = GeoResource::read(
            &mut s,
            geo.verts.len() as u32,
            geo.tex_verts.len() as u32,
            geo.adjoins.len() as u32,
            geo.surfaces.len() as u32,
        )
        .unwrap();
        assert_eq!(back, geo);
    }

    #[test]
    fn negative_index_decodes_to_none() {
        let mut s = MemoryStream::new();
        SurfaceAdjoin {
            flags: AdjoinFlags::empty(),
            mirror_idx: None,
            distance: 0.0,
        }
        .encode(&mut s)
        .unwrap();
        s.seek_to(0).unwrap();
        let back = SurfaceAdjoin::decode(&mut s).unwrap();
        assert_eq!(back.mirror_idx, None);
    }
}
