//! Texture and material (component F).
//!
//! Struct layout ported field-for-field from
//! `original_source/libraries/libim/content/asset/material/impl/serialization/mat_structs.h`.
//! The `Encode`/`Decode`-over-a-stream split follows `game_data/src/lib.rs` and
//! `game_data/src/record.rs`'s pattern of small typed header structs plus a
//! container that drives them in sequence.

use std::sync::Arc;

use crate::color::ColorFormat;
use crate::error::{Error, FormatError, StreamError, ValueError};
use crate::stream::{Decode, Encode};

const MAT_MAGIC: [u8; 4] = *b"MAT ";
const MAT_VERSION: u32 = 0x32;
const MAT_TEXTURE_TYPE: u32 = 2;
const MAT_RECORD_TEXTURE: i32 = 8;
const MAT_RECORD_COLOR: i32 = 0;

/// A single LOD level's worth of pixels, plus the shared image metadata for the
/// whole chain it belongs to (width/height here are level-0 dimensions).
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: ColorFormat,
    /// The full mipmap chain concatenated: LOD 0, LOD 1, ... A cheaply-clonable
    /// shared buffer, since both `Texture` and `Material` alias it without copying.
    pub pixels: Arc<[u8]>,
}

/// Computes the byte size of one LOD level.
pub fn mip_level_size(width: u32, height: u32, level: u32, cf: &ColorFormat) -> usize {
    let w = (width >> level).max(1) as usize;
    let h = (height >> level).max(1) as usize;
    w * h * cf.bytes_per_pixel()
}

/// Computes the total byte size of a chain of `levels` mipmaps starting at
/// `width x height`.
pub fn calc_mipmap_size(width: u32, height: u32, levels: u32, cf: &ColorFormat) -> usize {
    (0..levels).map(|l| mip_level_size(width, height, l, cf)).sum()
}

impl Texture {
    pub fn new_single_level(width: u32, height: u32, format: ColorFormat, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            mip_levels: 1,
            format,
            pixels: Arc::from(pixels),
        }
    }

    /// Returns a view over mip level `lod`'s pixel bytes.
    pub fn mip_level(&self, lod: u32) -> Option<&[u8]> {
        if lod >= self.mip_levels {
            return None;
        }
        let mut offset = 0usize;
        for l in 0..lod {
            offset += mip_level_size(self.width, self.height, l, &self.format);
        }
        let size = mip_level_size(self.width, self.height, lod, &self.format);
        self.pixels.get(offset..offset + size)
    }

    /// Converts level 0 to `to`, discarding any existing mipmap chain (mip_levels
    /// becomes 1). Use [`Texture::generate_mipmaps`] to rebuild a chain afterward.
    pub fn convert(&self, to: ColorFormat) -> Texture {
        let lod0 = self.mip_level(0).unwrap_or(&[]);
        let converted =
            crate::color::convert_pixdata(lod0, self.width as usize, self.height as usize, &self.format, &to);
        Texture {
            width: self.width,
            height: self.height,
            mip_levels: 1,
            format: to,
            pixels: Arc::from(converted),
        }
    }

    /// Rebuilds the mipmap chain from LOD 0 via repeated box filtering, optionally
    /// converting to `target_cf` first and capping the chain at `levels` (defaults to
    /// the full chain down to `1x1`).
    pub fn generate_mipmaps(&self, levels: Option<u32>, target_cf: Option<ColorFormat>, srgb: bool) -> Texture {
        let cf = target_cf.unwrap_or(self.format);
        let base = if cf == self.format {
            self.mip_level(0).unwrap_or(&[]).to_vec()
        } else {
            let lod0 = self.mip_level(0).unwrap_or(&[]);
            crate::color::convert_pixdata(lod0, self.width as usize, self.height as usize, &self.format, &cf)
        };

        let max_levels = 32 - self.width.max(self.height).max(1).leading_zeros();
        let target_levels = levels.unwrap_or(max_levels).max(1).min(max_levels.max(1));

        let mut chain = base;
        let mut w = self.width;
        let mut h = self.height;
        let mut cur = chain.clone();
        for _ in 1..target_levels {
            let nw = (w >> 1).max(1);
            let nh = (h >> 1).max(1);
            let next = crate::color::box_filter_scale(&cur, w as usize, h as usize, nw as usize, nh as usize, &cf, srgb);
            chain.extend_from_slice(&next);
            cur = next;
            w = nw;
            h = nh;
            if w == 1 && h == 1 {
                break;
            }
        }

        Texture {
            width: self.width,
            height: self.height,
            mip_levels: target_levels.min((chain.len() as u32).max(1)),
            format: cf,
            pixels: Arc::from(chain),
        }
    }
}

/// Per-cel record metadata. `unknown6`/`unknown7` are modeled as raw bytes, not
/// integers, because their meaning is not established (see `DESIGN.md`, Open
/// Question 2) and they must be preserved byte-exact across a patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatRecordHeader {
    pub record_type: i32,
    pub transparent_color: i32,
    pub unknown1: i32,
    pub unknown2: i32,
    pub unknown3: i32,
    /// `float(1.0) => 0x803F0000` in sample files; left un-interpreted here.
    pub unknown4: i32,
    pub unknown5: i32,
    pub unknown6: [u8; 4],
    pub unknown7: [u8; 4],
    pub tex_idx: i32,
}

impl MatRecordHeader {
    fn for_texture(tex_idx: i32) -> Self {
        Self {
            record_type: MAT_RECORD_TEXTURE,
            transparent_color: -1,
            unknown1: 0,
            unknown2: 0,
            unknown3: 0,
            unknown4: 0x803F0000u32 as i32,
            unknown5: 0,
            unknown6: [0; 4],
            unknown7: [0; 4],
            tex_idx,
        }
    }
}

impl Decode for MatRecordHeader {
    fn decode<S: std::io::Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        Ok(Self {
            record_type: i32::decode(stream)?,
            transparent_color: i32::decode(stream)?,
            unknown1: i32::decode(stream)?,
            unknown2: i32::decode(stream)?,
            unknown3: i32::decode(stream)?,
            unknown4: i32::decode(stream)?,
            unknown5: i32::decode(stream)?,
            unknown6: <[u8; 4]>::decode(stream)?,
            unknown7: <[u8; 4]>::decode(stream)?,
            tex_idx: i32::decode(stream)?,
        })
    }
}

impl Encode for MatRecordHeader {
    fn encode<S: std::io::Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.record_type.encode(stream)?;
        self.transparent_color.encode(stream)?;
        self.unknown1.encode(stream)?;
        self.unknown2.encode(stream)?;
        self.unknown3.encode(stream)?;
        self.unknown4.encode(stream)?;
        self.unknown5.encode(stream)?;
        self.unknown6.encode(stream)?;
        self.unknown7.encode(stream)?;
        self.tex_idx.encode(stream)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MatTextureHeader {
    width: i32,
    height: i32,
    transparent: i32,
    unknown1: i32,
    unknown2: i32,
    mip_levels: i32,
}

impl Decode for MatTextureHeader {
    fn decode<S: std::io::Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        Ok(Self {
            width: i32::decode(stream)?,
            height: i32::decode(stream)?,
            transparent: i32::decode(stream)?,
            unknown1: i32::decode(stream)?,
            unknown2: i32::decode(stream)?,
            mip_levels: i32::decode(stream)?,
        })
    }
}

impl Encode for MatTextureHeader {
    fn encode<S: std::io::Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.width.encode(stream)?;
        self.height.encode(stream)?;
        self.transparent.encode(stream)?;
        self.unknown1.encode(stream)?;
        self.unknown2.encode(stream)?;
        self.mip_levels.encode(stream)?;
        Ok(())
    }
}

/// A single cel (frame) of a material: either a texture, or an opaque 24-byte color
/// record whose interpretation is not needed by this crate (preserved verbatim).
#[derive(Debug, Clone, PartialEq)]
pub enum MatCelData {
    Texture(Texture),
    Color([u8; 24]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatCel {
    pub header: MatRecordHeader,
    pub data: MatCelData,
}

/// A material: an ordered sequence of cels sharing width, height, color format and
/// mipmap-level count.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color_info: ColorFormat,
    pub cels: Vec<MatCel>,
}

impl Material {
    pub fn new(color_info: ColorFormat) -> Self {
        Self {
            color_info,
            cels: Vec::new(),
        }
    }

    /// Appends a texture cel. Fails if it disagrees with existing cels on
    /// dimensions, format, or mip level count.
    pub fn add_cel(&mut self, tex: Texture) -> Result<(), ValueError> {
        if let Some(first) = self.cels.iter().find_map(|c| match &c.data {
            MatCelData::Texture(t) => Some(t),
            MatCelData::Color(_) => None,
        }) {
            if first.width != tex.width
                || first.height != tex.height
                || first.format != tex.format
                || first.mip_levels != tex.mip_levels
            {
                return Err(ValueError::CelMismatch {
                    existing: format!(
                        "{}x{} {:?} mips={}",
                        first.width, first.height, first.format, first.mip_levels
                    ),
                    new: format!(
                        "{}x{} {:?} mips={}",
                        tex.width, tex.height, tex.format, tex.mip_levels
                    ),
                });
            }
        }
        let idx = self.cels.len() as i32;
        self.cels.push(MatCel {
            header: MatRecordHeader::for_texture(idx),
            data: MatCelData::Texture(tex),
        });
        Ok(())
    }

    pub fn read<S: std::io::Read + ?Sized>(stream: &mut S) -> Result<Self, Error> {
        let magic = <[u8; 4]>::decode(stream)?;
        if magic != MAT_MAGIC {
            return Err(StreamError::BadMagic {
                format: "MAT",
                expected: MAT_MAGIC,
                got: magic,
            }
            .into());
        }
        let version = u32::decode(stream)?;
        if version != MAT_VERSION {
            return Err(StreamError::BadVersion {
                format: "MAT",
                version,
            }
            .into());
        }
        let _ty = u32::decode(stream)?;
        let record_count = i32::decode(stream)?;
        let cel_count = i32::decode(stream)?;
        if record_count != cel_count || cel_count <= 0 {
            return Err(FormatError::Mismatch {
                what: "MAT record_count/cel_count",
                expected: "record_count == cel_count > 0".into(),
                got: format!("record_count={record_count} cel_count={cel_count}"),
            }
            .into());
        }
        let color_info = ColorFormat::decode(stream)?;
        color_info.validate()?;

        let mut headers = Vec::with_capacity(cel_count as usize);
        for _ in 0..cel_count {
            headers.push(MatRecordHeader::decode(stream)?);
        }

        let mut cels = Vec::with_capacity(cel_count as usize);
        for header in headers {
            if header.record_type == MAT_RECORD_COLOR {
                let raw = <[u8; 24]>::decode(stream)?;
                cels.push(MatCel {
                    header,
                    data: MatCelData::Color(raw),
                });
                continue;
            }

            let th = MatTextureHeader::decode(stream)?;
            let width = th.width.max(0) as u32;
            let height = th.height.max(0) as u32;
            let mip_levels = th.mip_levels.max(1) as u32;
            let size = calc_mipmap_size(width, height, mip_levels, &color_info);
            let mut pixels = vec![0u8; size];
            stream.read_exact(&mut pixels)?;

            cels.push(MatCel {
                header,
                data: MatCelData::Texture(Texture {
                    width,
                    height,
                    mip_levels,
                    format: color_info,
                    pixels: Arc::from(pixels),
                }),
            });
        }

        Ok(Self { color_info, cels })
    }

    pub fn write<S: std::io::Write + ?Sized>(&self, stream: &mut S) -> Result<(), Error> {
        stream.write_all(&MAT_MAGIC)?;
        MAT_VERSION.encode(stream)?;
        MAT_TEXTURE_TYPE.encode(stream)?;
        (self.cels.len() as i32).encode(stream)?;
        (self.cels.len() as i32).encode(stream)?;
        self.color_info.encode(stream)?;

        for cel in &self.cels {
            cel.header.encode(stream)?;
        }
        for cel in &self.cels {
            match &cel.data {
                MatCelData::Color(raw) => {
                    raw.encode(stream)?;
                }
                MatCelData::Texture(tex) => {
                    let th = MatTextureHeader {
                        width: tex.width as i32,
                        height: tex.height as i32,
                        transparent: 0,
                        unknown1: 0,
                        unknown2: 0,
                        mip_levels: tex.mip_levels as i32,
                    };
                    th.encode(stream)?;
                    let size = calc_mipmap_size(tex.width, tex.height, tex.mip_levels, &self.color_info);
                    if tex.pixels.len() < size {
                        return Err(FormatError::MipmapSizeMismatch {
                            expected: size,
                            got: tex.pixels.len(),
                        }
                        .into());
                    }
                    stream.write_all(&tex.pixels[..size])?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn mat_single_cel_round_trip() {
        let mut mat = Material::new(ColorFormat::RGBA32);
        let tex = Texture::new_single_level(1, 1, ColorFormat::RGBA32, vec![0x44, 0x33, 0x22, 0x11]);
        mat.add_cel(tex).unwrap();

        let mut s = MemoryStream::new();
        mat.write(&mut s).unwrap();
        s.seek_to(0).unwrap();
        let back = Material::read(&mut s).unwrap();

        assert_eq!(back.cels.len(), 1);
        let MatCelData::Texture(t) = &back.cels[0].data else {
            panic!("expected texture cel");
        };
        assert_eq!(t.format, ColorFormat::RGBA32);
        assert_eq!(t.format.decode_pixel(u32::from_le_bytes(t.pixels[..4].try_into().unwrap())), [0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn add_cel_rejects_mismatched_dimensions() {
        let mut mat = Material::new(ColorFormat::RGBA32);
        mat.add_cel(Texture::new_single_level(2, 2, ColorFormat::RGBA32, vec![0; 16]))
            .unwrap();
        let err = mat.add_cel(Texture::new_single_level(4, 4, ColorFormat::RGBA32, vec![0; 64]));
        assert!(err.is_err());
    }

    #[test]
    fn mipmap_chain_size_matches_sum_of_levels() {
        let tex = Texture::new_single_level(4, 4, ColorFormat::RGBA32, vec![0xFF; 4 * 4 * 4]);
        let mm = tex.generate_mipmaps(None, None, true);
        let expected: usize = (0..mm.mip_levels)
            .map(|l| mip_level_size(mm.width, mm.height, l, &mm.format))
            .sum();
        assert_eq!(mm.pixels.len(), expected);
        assert_eq!(mm.mip_levels, 3); // 4x4 -> 2x2 -> 1x1
    }
}
