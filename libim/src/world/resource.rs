//! Static resource filtering and surface-index remapping for NDY -> CND compilation
//! (component J).
//!
//! Grounded on the clean-up step of `convertNdyToCnd` in `original_source/programs/
//! cndtool/cnd.h`: before a compiled world's resource lists are written out,
//! well-known "static" resource names (shared engine-wide assets that don't need to
//! travel with every individual world) are filtered out of the world's name lists,
//! and every surface's material index is remapped to match the filtered list. A
//! material that is itself static keeps its surface reference intact by re-encoding
//! the index to point into the static resource table instead of being dropped
//! (`isStaticResource`/`makeStaticResourceIdx`/`fromOptionalIdx` in the same file).
//! The concrete bit layout of that encoding and the static name lists themselves are
//! not present anywhere in the retrieved source, only the shape of the operation;
//! both are disclosed as inferred in `DESIGN.md` rather than presented as recovered.
//!
//! This crate's `World` only carries real, named resource lists for materials and
//! cog scripts: sounds/models/sprites stay opaque `RawSection` blobs with no
//! recovered per-entry name grammar, so filtering/remapping is implemented for
//! materials and cog scripts only. VFS-backed existence verification and loading
//! the referenced MAT/KEY/COG files (the fuller form the original's clean-up step
//! sits alongside) is out of scope here; see `DESIGN.md`.

use crate::world::cnd::World;

/// Bit flagging a surface material index as referring to the engine-wide static
/// resource table instead of this world's own (post-filter) material list. Inferred
/// from `isStaticResource`/`makeStaticResourceIdx` usage, not a recovered constant.
const STATIC_RESOURCE_FLAG: u32 = 0x8000_0000;

fn is_static_resource_idx(idx: u32) -> bool {
    idx & STATIC_RESOURCE_FLAG != 0
}

fn make_static_resource_idx(pos: usize) -> u32 {
    STATIC_RESOURCE_FLAG | (pos as u32 & !STATIC_RESOURCE_FLAG)
}

/// Well-known resource names considered static. Starts empty; callers populate it
/// with whatever name lists their own static resource set uses, since the originals
/// are not present in the retrieved source. Ordered (not a set) so a name's position
/// can serve as its static resource table index, the way [`make_static_resource_idx`]
/// expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticResourceNames {
    pub sounds: Vec<String>,
    pub materials: Vec<String>,
    pub models: Vec<String>,
    pub sprites: Vec<String>,
    pub keyframes: Vec<String>,
    pub scripts: Vec<String>,
}

/// How many entries were filtered out of each resource list, for logging/reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub materials_removed: usize,
    pub scripts_removed: usize,
}

/// Removes static materials and cog scripts from `world` and remaps every surface's
/// material index to the filtered list, per `convertNdyToCnd`'s clean-up step.
/// Brings `header` back in sync via [`World::sync_header`] afterward.
pub fn filter_static_resources(world: &mut World, statics: &StaticResourceNames) -> FilterReport {
    let old_materials: Vec<String> = world.materials.iter().map(|m| m.name.clone()).collect();

    let mut new_materials = Vec::with_capacity(world.materials.len());
    let mut new_names = Vec::with_capacity(world.materials.len());
    for m in world.materials.drain(..) {
        if !statics.materials.contains(&m.name) {
            new_names.push(m.name.clone());
            new_materials.push(m);
        }
    }
    let materials_removed = old_materials.len() - new_materials.len();
    world.materials = new_materials;

    if materials_removed > 0 {
        tracing::debug!(removed = materials_removed, "removed static materials");
        tracing::debug!("fixing surface material indices after removing static materials");
        for surf in &mut world.geo.surfaces {
            let Some(idx) = surf.material_idx else { continue };
            if is_static_resource_idx(idx) {
                continue;
            }
            let Some(old_name) = old_materials.get(idx as usize) else {
                continue;
            };
            if let Some(pos) = statics.materials.iter().position(|s| s == old_name) {
                surf.material_idx = Some(make_static_resource_idx(pos));
            } else if let Some(pos) = new_names.iter().position(|n| n == old_name) {
                surf.material_idx = Some(pos as u32);
            }
        }
    }

    let old_scripts_len = world.cog_scripts.len();
    world.cog_scripts.retain(|s| !statics.scripts.contains(s));
    let scripts_removed = old_scripts_len - world.cog_scripts.len();
    if scripts_removed > 0 {
        tracing::debug!(removed = scripts_removed, "removed static cog scripts");
    }

    world.sync_header();
    FilterReport {
        materials_removed,
        scripts_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorFormat;
    use crate::texture::Texture;
    use crate::world::geo::{GeoResource, Surface, SurfaceFlags};
    use crate::world::header::CndHeader;
    use crate::world::material::CndMaterial;
    use crate::world::RawSection;
    use crate::math::{Vector3, Vector4};

    fn mat(name: &str) -> CndMaterial {
        CndMaterial {
            name: name.to_owned(),
            color_info: ColorFormat::RGBA32,
            mip_levels: 1,
            cels: vec![Texture::new_single_level(1, 1, ColorFormat::RGBA32, vec![0, 0, 0, 0])],
        }
    }

    fn surf_with_mat(idx: Option<u32>) -> Surface {
        Surface {
            material_idx: idx,
            flags: SurfaceFlags::empty(),
            face_flags: 0,
            geo_mode: 0,
            light_mode: 0,
            adjoin_idx: None,
            color: Vector4::ONE,
            normal: Vector3::Z,
            verts: vec![],
        }
    }

    fn base_world() -> World {
        let mut w = World {
            header: CndHeader::new_world("test.cnd"),
            sounds: RawSection::default(),
            materials: vec![mat("static_wall.mat"), mat("level_prop.mat"), mat("another_static.mat")],
            geo: GeoResource {
                surfaces: vec![surf_with_mat(Some(0)), surf_with_mat(Some(1)), surf_with_mat(Some(2))],
                ..Default::default()
            },
            sectors: vec![],
            ai_classes: RawSection::default(),
            models: RawSection::default(),
            sprites: RawSection::default(),
            keyframes: vec![],
            anim_classes: RawSection::default(),
            sound_classes: RawSection::default(),
            cog_scripts: vec!["level.cog".to_owned(), "shared_static.cog".to_owned()],
            cogs: RawSection::default(),
            templates: RawSection::default(),
            things: RawSection::default(),
            pvs: RawSection::default(),
        };
        w.sync_header();
        w
    }

    #[test]
    fn filters_static_materials_and_remaps_surfaces() {
        let mut world = base_world();
        let statics = StaticResourceNames {
            materials: vec!["static_wall.mat".to_owned(), "another_static.mat".to_owned()],
            scripts: vec!["shared_static.cog".to_owned()],
            ..Default::default()
        };

        let report = filter_static_resources(&mut world, &statics);
        assert_eq!(report.materials_removed, 2);
        assert_eq!(report.scripts_removed, 1);

        assert_eq!(world.materials.len(), 1);
        assert_eq!(world.materials[0].name, "level_prop.mat");
        assert_eq!(world.cog_scripts, vec!["level.cog".to_owned()]);

        // surface 0 referenced a static material -> re-encoded, still flagged static
        assert!(is_static_resource_idx(world.geo.surfaces[0].material_idx.unwrap()));
        // surface 1 referenced the surviving material -> remapped to its new index 0
        assert_eq!(world.geo.surfaces[1].material_idx, Some(0));
        // surface 2 also referenced a (different) static material
        assert!(is_static_resource_idx(world.geo.surfaces[2].material_idx.unwrap()));

        assert_eq!(world.header.num_materials, 1);
    }

    #[test]
    fn no_static_names_leaves_world_untouched() {
        let mut world = base_world();
        let report = filter_static_resources(&mut world, &StaticResourceNames::default());
        assert_eq!(report.materials_removed, 0);
        assert_eq!(report.scripts_removed, 0);
        assert_eq!(world.materials.len(), 3);
    }
}
