//! Patch-in-place: rewrite one section of a `.cnd` file without rebuilding the rest.
//!
//! Grounded directly on `patchCndMaterials`/`patchCndAnimations` in
//! `original_source/programs/cndtool/cnd.h`: stream-copy the untouched prefix and
//! suffix of the file around the target section, write the new section in between,
//! then seek back and rewrite `fileSize` and the section's `num*`/`size*` header
//! fields. The size field only grows (matching the original, which leaves it alone
//! when the new section is smaller than what's already allocated on disk).
//!
//! Every section after the header is now read by consulting the header's own counts
//! (see `super::cnd`/`super::geo`/`super::material`), so `skip_preceding` decodes and
//! hands back the header for `measure_target` to use instead of re-deriving counts.

use std::path::{Path, PathBuf};

use crate::animation::Animation;
use crate::error::{Error, StreamError};
use crate::stream::{copy_bytes, Decode, Encode, FileStream, Stream};

use super::cnd::{read_keyframes, read_sectors, write_keyframes, RawSection};
use super::geo::GeoResource;
use super::header::{self, CndHeader};
use super::material::{self, CndMaterial};

/// Replaces the materials section of `path` in place.
pub fn patch_materials(path: impl AsRef<Path>, materials: &[CndMaterial]) -> Result<(), Error> {
    patch_section(
        path.as_ref(),
        |input| {
            let header = CndHeader::decode(input)?;
            RawSection::decode(input)?; // sounds
            Ok(header)
        },
        |input, header| {
            let start = input.tell()?;
            material::read_materials(input, header.num_materials)?;
            Ok((start, input.tell()?))
        },
        |output| material::write_materials(output, materials),
        header::NUM_MATERIALS_OFFSET,
        header::SIZE_MATERIALS_OFFSET,
        materials.len() as u32,
    )
}

/// Replaces the keyframes section of `path` in place.
pub fn patch_animations(path: impl AsRef<Path>, keyframes: &[Animation]) -> Result<(), Error> {
    patch_section(
        path.as_ref(),
        |input| {
            let header = CndHeader::decode(input)?;
            RawSection::decode(input)?; // sounds
            material::read_materials(input, header.num_materials)?;
            GeoResource::read(
                input,
                header.num_vertices,
                header.num_tex_vertices,
                header.num_adjoins,
                header.num_surfaces,
            )?;
            read_sectors(input, header.num_sectors)?;
            RawSection::decode(input)?; // AI classes
            RawSection::decode(input)?; // models
            RawSection::decode(input)?; // sprites
            Ok(header)
        },
        |input, header| {
            let start = input.tell()?;
            read_keyframes(input, header.num_keyframes)?;
            Ok((start, input.tell()?))
        },
        |output| write_keyframes(output, keyframes),
        header::NUM_KEYFRAMES_OFFSET,
        header::SIZE_KEYFRAMES_OFFSET,
        keyframes.len() as u32,
    )
}

fn patch_section(
    path: &Path,
    skip_preceding: impl FnOnce(&mut FileStream) -> Result<CndHeader, Error>,
    measure_target: impl FnOnce(&mut FileStream, &CndHeader) -> Result<(u64, u64), Error>,
    write_new: impl FnOnce(&mut FileStream) -> Result<(), Error>,
    num_field_offset: u64,
    size_field_offset: u64,
    new_count: u32,
) -> Result<(), Error> {
    let mut patched_name = path.as_os_str().to_os_string();
    patched_name.push(".patched");
    let patched_path: PathBuf = patched_name.into();

    let result = patch_section_inner(
        path,
        &patched_path,
        skip_preceding,
        measure_target,
        write_new,
        num_field_offset,
        size_field_offset,
        new_count,
    );

    if result.is_err() {
        let _ = std::fs::remove_file(&patched_path);
        return result;
    }

    std::fs::rename(&patched_path, path).map_err(StreamError::from)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn patch_section_inner(
    path: &Path,
    patched_path: &Path,
    skip_preceding: impl FnOnce(&mut FileStream) -> Result<CndHeader, Error>,
    measure_target: impl FnOnce(&mut FileStream, &CndHeader) -> Result<(u64, u64), Error>,
    write_new: impl FnOnce(&mut FileStream) -> Result<(), Error>,
    num_field_offset: u64,
    size_field_offset: u64,
    new_count: u32,
) -> Result<(), Error> {
    let mut input = FileStream::open(path)?;
    let header = skip_preceding(&mut input)?;
    let (section_start, section_end) = measure_target(&mut input, &header)?;

    let mut output = FileStream::create(patched_path)?;
    input.seek_to(0)?;
    copy_bytes(&mut input, &mut output, section_start)?;
    tracing::debug!(bytes = section_start, "copied prefix preceding patched section");

    write_new(&mut output)?;
    let new_section_len = output.tell()? - section_start;

    input.seek_to(section_end)?;
    let tail_len = input.size()? - section_end;
    copy_bytes(&mut input, &mut output, tail_len)?;
    tracing::debug!(
        old_len = section_end - section_start,
        new_len = new_section_len,
        tail_bytes = tail_len,
        "patched section in place"
    );

    let total_len = output.tell()?;
    output.seek_to(0)?;
    (total_len as u32).encode(&mut output)?;

    output.seek_to(num_field_offset)?;
    new_count.encode(&mut output)?;

    let old_section_len = section_end - section_start;
    if new_section_len > old_section_len {
        output.seek_to(size_field_offset)?;
        (new_section_len as u32).encode(&mut output)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorFormat;
    use crate::texture::Texture;
    use crate::world::cnd::World;
    use crate::world::header::sample_for_tests;

    fn one_pixel_material() -> CndMaterial {
        CndMaterial {
            name: "test.mat".to_owned(),
            color_info: ColorFormat::RGBA32,
            mip_levels: 1,
            cels: vec![Texture::new_single_level(1, 1, ColorFormat::RGBA32, vec![9, 9, 9, 9])],
        }
    }

    fn write_world_to(path: &Path, world: &World) {
        let mut f = FileStream::create(path).unwrap();
        world.write(&mut f).unwrap();
    }

    fn read_world_from(path: &Path) -> World {
        let mut f = FileStream::open(path).unwrap();
        World::read(&mut f).unwrap()
    }

    #[test]
    fn patch_materials_replaces_section_and_updates_header() {
        let dir = std::env::temp_dir().join(format!("libim-patch-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("world.cnd");

        let mut world = World {
            header: sample_for_tests(),
            sounds: RawSection::default(),
            materials: vec![one_pixel_material()],
            geo: GeoResource::default(),
            sectors: vec![],
            ai_classes: RawSection::default(),
            models: RawSection::default(),
            sprites: RawSection::default(),
            keyframes: vec![],
            anim_classes: RawSection::default(),
            sound_classes: RawSection::default(),
            cog_scripts: vec![],
            cogs: RawSection::default(),
            templates: RawSection::default(),
            things: RawSection::default(),
            pvs: RawSection::default(),
        };
        world.sync_header();
        write_world_to(&path, &world);

        let new_materials = vec![one_pixel_material(), one_pixel_material()];
        patch_materials(&path, &new_materials).unwrap();

        let patched = read_world_from(&path);
        assert_eq!(patched.materials.len(), 2);
        assert_eq!(patched.header.num_materials, 2);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }
}
