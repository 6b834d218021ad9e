//! Materials as embedded in a compiled world's materials section (component J).
//!
//! Distinct from the standalone `.mat` file format `crate::texture::Material`
//! implements: a CND stores one `CndMatHeader` per material (`original_source/src/
//! libim/cnd.h`: `name[64]`, `width`, `height`, `mipmapCount`, `texturesPerMipmap`,
//! `colorInfo`) followed by a single pixel-data blob holding every material's bytes
//! back to back, prefixed by that blob's total size. `patchCndMaterials` in
//! `original_source/programs/cndtool/cnd.h` confirms the section layout: `[u32
//! pixelDataSize][CndMatHeader x numMaterials][pixel bytes]`, with `numMaterials`
//! coming from the already-decoded `CndHeader`, not a count embedded here.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::color::ColorFormat;
use crate::error::{Error, FormatError, StreamError};
use crate::stream::{read_fixed_string, write_fixed_string, Decode, Encode};
use crate::texture::{calc_mipmap_size, Material, MatCelData, Texture};

const CND_MAT_NAME_LEN: usize = 64;

/// One material as stored inside a CND: a name (the materials section has no
/// separate name list; it is the `CndMatHeader`'s own `name` field) plus the same
/// cel stack a standalone `.mat` file's [`Material`] holds, minus the per-cel record
/// headers that format uses (a `CndMatHeader` has no room for them).
#[derive(Debug, Clone, PartialEq)]
pub struct CndMaterial {
    pub name: String,
    pub color_info: ColorFormat,
    pub mip_levels: u32,
    pub cels: Vec<Texture>,
}

impl CndMaterial {
    /// Builds a `CndMaterial` from a standalone `.mat` file's [`Material`], naming it
    /// `name` (a CND material's name comes from wherever it was loaded, e.g. a VFS
    /// path, not from the `.mat` file itself). Fails if any cel is a color record:
    /// `CndMatHeader` has no slot for that variant.
    pub fn from_material(name: impl Into<String>, mat: &Material) -> Result<Self, Error> {
        let mut cels = Vec::with_capacity(mat.cels.len());
        for cel in &mat.cels {
            match &cel.data {
                MatCelData::Texture(tex) => cels.push(tex.clone()),
                MatCelData::Color(_) => {
                    return Err(FormatError::Mismatch {
                        what: "CND material cel",
                        expected: "texture cel".into(),
                        got: "color cel (CndMatHeader cannot represent one)".into(),
                    }
                    .into());
                }
            }
        }
        let mip_levels = cels.first().map_or(1, |t| t.mip_levels);
        Ok(Self {
            name: name.into(),
            color_info: mat.color_info,
            mip_levels,
            cels,
        })
    }

    /// Widens back into a standalone `.mat`-shaped [`Material`] (texture cels only,
    /// synthesized record headers), for tools (`matool`) that only understand that
    /// format.
    pub fn to_material(&self) -> Material {
        let mut mat = Material::new(self.color_info);
        for tex in &self.cels {
            mat.add_cel(tex.clone())
                .expect("cels of one CndMaterial always share dimensions and format");
        }
        mat
    }

    fn width(&self) -> u32 {
        self.cels.first().map_or(0, |t| t.width)
    }

    fn height(&self) -> u32 {
        self.cels.first().map_or(0, |t| t.height)
    }
}

struct RawHeader {
    name: String,
    width: i32,
    height: i32,
    mipmap_count: i32,
    textures_per_mipmap: i32,
    color_info: ColorFormat,
}

impl Decode for RawHeader {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        Ok(Self {
            name: read_fixed_string(stream, CND_MAT_NAME_LEN)?,
            width: i32::decode(stream)?,
            height: i32::decode(stream)?,
            mipmap_count: i32::decode(stream)?,
            textures_per_mipmap: i32::decode(stream)?,
            color_info: ColorFormat::decode(stream)?,
        })
    }
}

impl Encode for RawHeader {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        write_fixed_string(stream, CND_MAT_NAME_LEN, &self.name)?;
        self.width.encode(stream)?;
        self.height.encode(stream)?;
        self.mipmap_count.encode(stream)?;
        self.textures_per_mipmap.encode(stream)?;
        self.color_info.encode(stream)?;
        Ok(())
    }
}

/// Reads exactly `count` materials, `count` coming from `CndHeader::num_materials`
/// rather than a length prefix embedded in this section.
pub(super) fn read_materials<S: Read + ?Sized>(stream: &mut S, count: u32) -> Result<Vec<CndMaterial>, Error> {
    let pixel_data_size = u32::decode(stream)?;
    let mut headers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        headers.push(RawHeader::decode(stream)?);
    }

    let mut pixel_data = vec![0u8; pixel_data_size as usize];
    stream.read_exact(&mut pixel_data).map_err(StreamError::from)?;

    let mut offset = 0usize;
    let mut materials = Vec::with_capacity(count as usize);
    for h in headers {
        let width = h.width.max(0) as u32;
        let height = h.height.max(0) as u32;
        let mip_levels = h.mipmap_count.max(1) as u32;
        let num_cels = h.textures_per_mipmap.max(1) as u32;
        let one_cel_size = calc_mipmap_size(width, height, mip_levels, &h.color_info);

        let mut cels = Vec::with_capacity(num_cels as usize);
        for _ in 0..num_cels {
            let end = offset + one_cel_size;
            let bytes = pixel_data.get(offset..end).ok_or_else(|| {
                StreamError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "CND materials section pixel data truncated",
                ))
            })?;
            cels.push(Texture {
                width,
                height,
                mip_levels,
                format: h.color_info,
                pixels: Arc::from(bytes.to_vec()),
            });
            offset = end;
        }

        materials.push(CndMaterial {
            name: h.name,
            color_info: h.color_info,
            mip_levels,
            cels,
        });
    }
    Ok(materials)
}

/// Writes the materials section in the real on-disk shape: pixel-data size, then
/// every `CndMatHeader`, then every material's pixel bytes concatenated. The number
/// of materials is not written here; the header's `num_materials` field is what a
/// reader consults, kept in sync by `World::sync_header`.
pub(super) fn write_materials<S: Write + ?Sized>(stream: &mut S, materials: &[CndMaterial]) -> Result<(), Error> {
    let mut pixel_data = Vec::new();
    for m in materials {
        for tex in &m.cels {
            let size = calc_mipmap_size(tex.width, tex.height, tex.mip_levels, &m.color_info);
            if tex.pixels.len() < size {
                return Err(FormatError::MipmapSizeMismatch {
                    expected: size,
                    got: tex.pixels.len(),
                }
                .into());
            }
            pixel_data.extend_from_slice(&tex.pixels[..size]);
        }
    }

    (pixel_data.len() as u32).encode(stream)?;
    for m in materials {
        RawHeader {
            name: m.name.clone(),
            width: m.width() as i32,
            height: m.height() as i32,
            mipmap_count: m.mip_levels as i32,
            textures_per_mipmap: m.cels.len().max(1) as i32,
            color_info: m.color_info,
        }
        .encode(stream)?;
    }
    stream.write_all(&pixel_data).map_err(StreamError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn sample() -> CndMaterial {
        CndMaterial {
            name: "stone01.mat".to_owned(),
            color_info: ColorFormat::RGBA32,
            mip_levels: 1,
            cels: vec![Texture::new_single_level(1, 1, ColorFormat::RGBA32, vec![1, 2, 3, 4])],
        }
    }

    #[test]
    fn materials_section_round_trip() {
        let materials = vec![sample(), sample()];
        let mut s = MemoryStream::new();
        write_materials(&mut s, &materials).unwrap();
        s.seek_to(0).unwrap();
        let back = read_materials(&mut s, materials.len() as u32).unwrap();
        assert_eq!(back, materials);
    }

    #[test]
    fn count_comes_from_caller_not_the_section() {
        let materials = vec![sample(), sample(), sample()];
        let mut s = MemoryStream::new();
        write_materials(&mut s, &materials).unwrap();
        s.seek_to(0).unwrap();
        // Asking for fewer than were written reads exactly that many, same as a
        // header declaring a smaller num_materials than the bytes could hold.
        let back = read_materials(&mut s, 1).unwrap();
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn material_to_from_standalone_mat_round_trips_cels() {
        let cnd_mat = sample();
        let mat = cnd_mat.to_material();
        let back = CndMaterial::from_material(cnd_mat.name.clone(), &mat).unwrap();
        assert_eq!(back, cnd_mat);
    }
}
