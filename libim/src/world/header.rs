//! The CND header record (component J).
//!
//! Ported field-for-field from `original_source/src/libim/cnd.h`'s `CndHeader` for
//! the scalar/world-setting fields, then widened with the per-section `num*`/`size*`
//! pairs `original_source/programs/cndtool/cnd.h`'s `convertNdyToCnd` assigns
//! (`header.numVertices`, `header.numSectors`, `header.numAIClasses`, `header.numCogs`,
//! ... down to `header.sizePVS`), carved out of what were opaque `unknownN` padding
//! arrays in the older header struct. That newer header's own struct definition
//! (field order/byte offsets) is not present anywhere in the retrieved source, only
//! the field-assignment call sites above; the grouping and field order here is
//! inferred from that usage order, not verified against a recovered struct, and is
//! disclosed as such in `DESIGN.md`. A handful of words have no recoverable name at
//! all and stay as `unknownN` padding, preserved byte-exact on patch.

use std::io::{Read, Write};

use crate::error::StreamError;
use crate::stream::{read_fixed_string, write_fixed_string, Decode, Encode};

pub const CND_TYPE_WORLD: u32 = 0xC;
pub const CND_TYPE_STATIC: u32 = 0xD;

const COPYRIGHT_LEN: usize = 1216;
const FILE_PATH_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogInfo {
    pub enabled: i32,
    pub color: [f32; 4],
    pub start_depth: f32,
    pub end_depth: f32,
}

impl Decode for FogInfo {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        Ok(Self {
            enabled: i32::decode(stream)?,
            color: read_f32_array::<_, 4>(stream)?,
            start_depth: f32::decode(stream)?,
            end_depth: f32::decode(stream)?,
        })
    }
}

impl Encode for FogInfo {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.enabled.encode(stream)?;
        write_f32_array(stream, &self.color)?;
        self.start_depth.encode(stream)?;
        self.end_depth.encode(stream)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CndHeader {
    pub file_size: u32,
    pub copyright: String,
    pub file_path: String,
    pub ty: u32,
    pub version: u32,
    pub world_gravity: f32,
    pub ceiling_sky_z: f32,
    pub horizon_distance: f32,
    pub horizon_sky_offset: [f32; 2],
    pub ceiling_sky_offset: [f32; 2],
    pub lod_distances: [f32; 4],
    pub fog: FogInfo,
    pub num_sounds: u32,
    pub num_materials: u32,
    pub size_materials: u32,
    pub a_materials: u32,
    pub num_vertices: u32,
    pub num_tex_vertices: u32,
    pub num_adjoins: u32,
    pub num_surfaces: u32,
    pub num_sectors: u32,
    pub num_ai_classes: u32,
    pub size_ai_classes: u32,
    pub unknown4: [u32; 6],
    pub a_selectors: u32,
    pub unknown5: u32,
    pub a_ai_classes: u32,
    pub unknown6: [u32; 2],
    pub num_models: u32,
    pub size_models: u32,
    pub a_models: u32,
    pub num_sprites: u32,
    pub size_sprites: u32,
    pub a_sprites: u32,
    pub num_keyframes: u32,
    pub size_keyframes: u32,
    pub a_keyframes: u32,
    pub num_puppets: u32,
    pub size_puppets: u32,
    pub num_sound_classes: u32,
    pub size_sound_classes: u32,
    pub num_cog_scripts: u32,
    pub size_cog_scripts: u32,
    /// Takes the hit for a suspected engine quirk: `original_source/programs/
    /// cndtool/cnd.h` sets this to the byte size of the cogs blob rather than the
    /// actual cog count, with an inline comment calling it a hack the engine itself
    /// requires for memory allocation. This crate does not parse the `cogs` section
    /// (it has no recovered struct, see `World`), so it cannot recompute a "true" cog
    /// count to compare against; [`super::cnd::World::sync_header`] leaves this field
    /// untouched rather than asserting a value it cannot verify.
    pub num_cogs: u32,
    pub size_cogs: u32,
    pub num_thing_templates: u32,
    pub size_thing_templates: u32,
    pub num_things: u32,
    pub last_thing_idx: u32,
    pub size_pvs: u32,
    pub unknown9: [u32; 7],
    pub world_sounds: u32,
    pub world_sound_unknown: u32,
}

/// The `version` value this crate writes for newly-built worlds. Existing files keep
/// whatever version they were read with; nothing in this crate rejects a different
/// version on read.
pub const CND_WRITER_VERSION: u32 = 8;

impl CndHeader {
    pub fn is_static(&self) -> bool {
        self.ty == CND_TYPE_STATIC
    }

    /// A header with sensible defaults for a freshly authored world: zeroed unknown
    /// fields, no fog, no section counts. Callers building a [`super::cnd::World`]
    /// from scratch (e.g. compiling an NDY projection with no prior CND to merge
    /// into) start here rather than filling in every padding field by hand.
    pub fn new_world(file_path: impl Into<String>) -> Self {
        Self {
            file_size: 0,
            copyright: String::new(),
            file_path: file_path.into(),
            ty: CND_TYPE_WORLD,
            version: CND_WRITER_VERSION,
            world_gravity: -9.8,
            ceiling_sky_z: 0.0,
            horizon_distance: 0.0,
            horizon_sky_offset: [0.0; 2],
            ceiling_sky_offset: [0.0; 2],
            lod_distances: [0.0; 4],
            fog: FogInfo {
                enabled: 0,
                color: [0.0; 4],
                start_depth: 0.0,
                end_depth: 0.0,
            },
            num_sounds: 0,
            num_materials: 0,
            size_materials: 0,
            a_materials: 0,
            num_vertices: 0,
            num_tex_vertices: 0,
            num_adjoins: 0,
            num_surfaces: 0,
            num_sectors: 0,
            num_ai_classes: 0,
            size_ai_classes: 0,
            unknown4: [0; 6],
            a_selectors: 0,
            unknown5: 0,
            a_ai_classes: 0,
            unknown6: [0; 2],
            num_models: 0,
            size_models: 0,
            a_models: 0,
            num_sprites: 0,
            size_sprites: 0,
            a_sprites: 0,
            num_keyframes: 0,
            size_keyframes: 0,
            a_keyframes: 0,
            num_puppets: 0,
            size_puppets: 0,
            num_sound_classes: 0,
            size_sound_classes: 0,
            num_cog_scripts: 0,
            size_cog_scripts: 0,
            num_cogs: 0,
            size_cogs: 0,
            num_thing_templates: 0,
            size_thing_templates: 0,
            num_things: 0,
            last_thing_idx: 0,
            size_pvs: 0,
            unknown9: [0; 7],
            world_sounds: 0,
            world_sound_unknown: 0,
        }
    }
}

/// Byte offsets of the header fields `patch` rewrites in place. Computed by hand from
/// the field layout above (string fields are fixed-width, so the layout is stable)
/// rather than derived at runtime, since the patch algorithm must not decode the
/// header twice to find them. Unaffected by the `num*`/`size*` fields carved out of
/// `unknown4`/`unknown9` above: both arrays kept their original word count, just
/// subdivided, so every field at or after `num_materials` sits at the same offset it
/// always did.
pub const NUM_MATERIALS_OFFSET: u64 = 1368;
pub const SIZE_MATERIALS_OFFSET: u64 = 1372;
pub const NUM_KEYFRAMES_OFFSET: u64 = 1476;
pub const SIZE_KEYFRAMES_OFFSET: u64 = 1480;

impl Decode for CndHeader {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        Ok(Self {
            file_size: u32::decode(stream)?,
            copyright: read_fixed_string(stream, COPYRIGHT_LEN)?,
            file_path: read_fixed_string(stream, FILE_PATH_LEN)?,
            ty: u32::decode(stream)?,
            version: u32::decode(stream)?,
            world_gravity: f32::decode(stream)?,
            ceiling_sky_z: f32::decode(stream)?,
            horizon_distance: f32::decode(stream)?,
            horizon_sky_offset: read_f32_array::<_, 2>(stream)?,
            ceiling_sky_offset: read_f32_array::<_, 2>(stream)?,
            lod_distances: read_f32_array::<_, 4>(stream)?,
            fog: FogInfo::decode(stream)?,
            num_sounds: u32::decode(stream)?,
            num_materials: u32::decode(stream)?,
            size_materials: u32::decode(stream)?,
            a_materials: u32::decode(stream)?,
            num_vertices: u32::decode(stream)?,
            num_tex_vertices: u32::decode(stream)?,
            num_adjoins: u32::decode(stream)?,
            num_surfaces: u32::decode(stream)?,
            num_sectors: u32::decode(stream)?,
            num_ai_classes: u32::decode(stream)?,
            size_ai_classes: u32::decode(stream)?,
            unknown4: read_u32_array::<_, 6>(stream)?,
            a_selectors: u32::decode(stream)?,
            unknown5: u32::decode(stream)?,
            a_ai_classes: u32::decode(stream)?,
            unknown6: read_u32_array::<_, 2>(stream)?,
            num_models: u32::decode(stream)?,
            size_models: u32::decode(stream)?,
            a_models: u32::decode(stream)?,
            num_sprites: u32::decode(stream)?,
            size_sprites: u32::decode(stream)?,
            a_sprites: u32::decode(stream)?,
            num_keyframes: u32::decode(stream)?,
            size_keyframes: u32::decode(stream)?,
            a_keyframes: u32::decode(stream)?,
            num_puppets: u32::decode(stream)?,
            size_puppets: u32::decode(stream)?,
            num_sound_classes: u32::decode(stream)?,
            size_sound_classes: u32::decode(stream)?,
            num_cog_scripts: u32::decode(stream)?,
            size_cog_scripts: u32::decode(stream)?,
            num_cogs: u32::decode(stream)?,
            size_cogs: u32::decode(stream)?,
            num_thing_templates: u32::decode(stream)?,
            size_thing_templates: u32::decode(stream)?,
            num_things: u32::decode(stream)?,
            last_thing_idx: u32::decode(stream)?,
            size_pvs: u32::decode(stream)?,
            unknown9: read_u32_array::<_, 7>(stream)?,
            world_sounds: u32::decode(stream)?,
            world_sound_unknown: u32::decode(stream)?,
        })
    }
}

impl Encode for CndHeader {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.file_size.encode(stream)?;
        write_fixed_string(stream, COPYRIGHT_LEN, &self.copyright)?;
        write_fixed_string(stream, FILE_PATH_LEN, &self.file_path)?;
        self.ty.encode(stream)?;
        self.version.encode(stream)?;
        self.world_gravity.encode(stream)?;
        self.ceiling_sky_z.encode(stream)?;
        self.horizon_distance.encode(stream)?;
        write_f32_array(stream, &self.horizon_sky_offset)?;
        write_f32_array(stream, &self.ceiling_sky_offset)?;
        write_f32_array(stream, &self.lod_distances)?;
        self.fog.encode(stream)?;
        self.num_sounds.encode(stream)?;
        self.num_materials.encode(stream)?;
        self.size_materials.encode(stream)?;
        self.a_materials.encode(stream)?;
        self.num_vertices.encode(stream)?;
        self.num_tex_vertices.encode(stream)?;
        self.num_adjoins.encode(stream)?;
        self.num_surfaces.encode(stream)?;
        self.num_sectors.encode(stream)?;
        self.num_ai_classes.encode(stream)?;
        self.size_ai_classes.encode(stream)?;
        write_u32_array(stream, &self.unknown4)?;
        self.a_selectors.encode(stream)?;
        self.unknown5.encode(stream)?;
        self.a_ai_classes.encode(stream)?;
        write_u32_array(stream, &self.unknown6)?;
        self.num_models.encode(stream)?;
        self.size_models.encode(stream)?;
        self.a_models.encode(stream)?;
        self.num_sprites.encode(stream)?;
        self.size_sprites.encode(stream)?;
        self.a_sprites.encode(stream)?;
        self.num_keyframes.encode(stream)?;
        self.size_keyframes.encode(stream)?;
        self.a_keyframes.encode(stream)?;
        self.num_puppets.encode(stream)?;
        self.size_puppets.encode(stream)?;
        self.num_sound_classes.encode(stream)?;
        self.size_sound_classes.encode(stream)?;
        self.num_cog_scripts.encode(stream)?;
        self.size_cog_scripts.encode(stream)?;
        self.num_cogs.encode(stream)?;
        self.size_cogs.encode(stream)?;
        self.num_thing_templates.encode(stream)?;
        self.size_thing_templates.encode(stream)?;
        self.num_things.encode(stream)?;
        self.last_thing_idx.encode(stream)?;
        self.size_pvs.encode(stream)?;
        write_u32_array(stream, &self.unknown9)?;
        self.world_sounds.encode(stream)?;
        self.world_sound_unknown.encode(stream)?;
        Ok(())
    }
}

pub(super) fn read_f32_array<S: Read + ?Sized, const N: usize>(
    stream: &mut S,
) -> Result<[f32; N], StreamError> {
    let mut out = [0f32; N];
    for slot in &mut out {
        *slot = f32::decode(stream)?;
    }
    Ok(out)
}

pub(super) fn write_f32_array<S: Write + ?Sized>(
    stream: &mut S,
    values: &[f32],
) -> Result<(), StreamError> {
    for v in values {
        v.encode(stream)?;
    }
    Ok(())
}

pub(super) fn read_u32_array<S: Read + ?Sized, const N: usize>(
    stream: &mut S,
) -> Result<[u32; N], StreamError> {
    let mut out = [0u32; N];
    for slot in &mut out {
        *slot = u32::decode(stream)?;
    }
    Ok(out)
}

pub(super) fn write_u32_array<S: Write + ?Sized>(
    stream: &mut S,
    values: &[u32],
) -> Result<(), StreamError> {
    for v in values {
        v.encode(stream)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_for_tests() -> CndHeader {
    let mut h = CndHeader::new_world("c:\\jones3d\\test.cnd");
    h.copyright = "(c) LucasArts".to_owned();
    h.ceiling_sky_z = 100.0;
    h.horizon_distance = 1000.0;
    h.lod_distances = [10.0, 20.0, 30.0, 40.0];
    h.num_materials = 3;
    h.size_materials = 3;
    h.num_keyframes = 1;
    h.size_keyframes = 1;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn header_round_trip() {
        let header = sample_for_tests();
        let mut s = MemoryStream::new();
        header.encode(&mut s).unwrap();
        s.seek_to(0).unwrap();
        let back = CndHeader::decode(&mut s).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn is_static_checks_type_field() {
        let mut header = sample_for_tests();
        assert!(!header.is_static());
        header.ty = CND_TYPE_STATIC;
        assert!(header.is_static());
    }

    #[test]
    fn patch_offsets_land_on_the_right_fields() {
        let header = sample_for_tests();
        let mut s = MemoryStream::new();
        header.encode(&mut s).unwrap();

        s.seek_to(NUM_MATERIALS_OFFSET).unwrap();
        assert_eq!(u32::decode(&mut s).unwrap(), header.num_materials);

        s.seek_to(SIZE_MATERIALS_OFFSET).unwrap();
        assert_eq!(u32::decode(&mut s).unwrap(), header.size_materials);

        s.seek_to(NUM_KEYFRAMES_OFFSET).unwrap();
        assert_eq!(u32::decode(&mut s).unwrap(), header.num_keyframes);

        s.seek_to(SIZE_KEYFRAMES_OFFSET).unwrap();
        assert_eq!(u32::decode(&mut s).unwrap(), header.size_keyframes);
    }
}
