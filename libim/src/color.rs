//! Color format descriptors and pixel-level conversion (component E).
//!
//! `ColorMode`, `ColorFormat` and every named constant are ported field-for-field
//! from `original_source/libraries/libim/content/asset/material/colorformat.h`.

use crate::error::FormatError;
use crate::stream::{Decode, Encode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ColorMode {
    Indexed = 0,
    Rgb = 1,
    Rgba = 2,
}

impl ColorMode {
    fn from_u32(v: u32) -> Result<Self, FormatError> {
        match v {
            0 => Ok(Self::Indexed),
            1 => Ok(Self::Rgb),
            2 => Ok(Self::Rgba),
            other => Err(FormatError::InvalidColorFormat(format!(
                "unknown color mode {other}"
            ))),
        }
    }
}

/// A bit-packed pixel layout descriptor: per-channel bit count (`bpp`), left shift
/// into the packed word (`shl`), and right shift used to expand the extracted bits
/// back out to 8 bits (`shr`). Binary layout is 56 bytes, matching the original
/// `static_assert(sizeof(ColorFormat) == 56)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorFormat {
    pub mode: ColorMode,
    pub bpp: u32,
    pub red_bpp: u32,
    pub green_bpp: u32,
    pub blue_bpp: u32,
    pub red_shl: u32,
    pub green_shl: u32,
    pub blue_shl: u32,
    pub red_shr: u32,
    pub green_shr: u32,
    pub blue_shr: u32,
    pub alpha_bpp: u32,
    pub alpha_shl: u32,
    pub alpha_shr: u32,
}

macro_rules! color_format {
    ($mode:ident, $bpp:expr, $rb:expr,$gb:expr,$bb:expr, $rs:expr,$gs:expr,$bs:expr, $rr:expr,$gr:expr,$br:expr, $ab:expr,$as_:expr,$ar:expr) => {
        ColorFormat {
            mode: ColorMode::$mode,
            bpp: $bpp,
            red_bpp: $rb,
            green_bpp: $gb,
            blue_bpp: $bb,
            red_shl: $rs,
            green_shl: $gs,
            blue_shl: $bs,
            red_shr: $rr,
            green_shr: $gr,
            blue_shr: $br,
            alpha_bpp: $ab,
            alpha_shl: $as_,
            alpha_shr: $ar,
        }
    };
}

impl ColorFormat {
    pub const RGB555: Self = color_format!(Rgb, 16, 5, 5, 5, 10, 5, 0, 3, 3, 3, 0, 0, 0);
    pub const RGB555_BE: Self = color_format!(Rgb, 16, 5, 5, 5, 0, 5, 10, 3, 3, 3, 0, 0, 0);
    pub const RGB565: Self = color_format!(Rgb, 16, 5, 6, 5, 11, 5, 0, 3, 2, 3, 0, 0, 0);
    pub const RGB565_BE: Self = color_format!(Rgb, 16, 5, 6, 5, 0, 5, 11, 3, 2, 3, 0, 0, 0);
    pub const RGBA4444: Self = color_format!(Rgba, 16, 4, 4, 4, 12, 8, 4, 4, 4, 4, 4, 0, 4);
    pub const RGBA4444_BE: Self = color_format!(Rgba, 16, 4, 4, 4, 0, 4, 8, 4, 4, 4, 4, 12, 4);
    pub const ARGB4444: Self = color_format!(Rgba, 16, 4, 4, 4, 8, 4, 0, 4, 4, 4, 4, 12, 4);
    pub const ARGB4444_BE: Self = color_format!(Rgba, 16, 4, 4, 4, 4, 8, 12, 4, 4, 4, 4, 0, 4);
    pub const RGBA5551: Self = color_format!(Rgba, 16, 5, 5, 5, 11, 6, 1, 3, 3, 3, 1, 0, 7);
    pub const RGBA5551_BE: Self = color_format!(Rgba, 16, 5, 5, 5, 0, 5, 10, 3, 3, 3, 1, 15, 7);
    pub const ARGB1555: Self = color_format!(Rgba, 16, 5, 5, 5, 10, 5, 0, 3, 3, 3, 1, 15, 7);
    pub const ARGB1555_BE: Self = color_format!(Rgba, 16, 5, 5, 5, 1, 6, 11, 3, 3, 3, 1, 0, 7);
    pub const RGB24: Self = color_format!(Rgb, 24, 8, 8, 8, 16, 8, 0, 0, 0, 0, 0, 0, 0);
    pub const RGB24_BE: Self = color_format!(Rgb, 24, 8, 8, 8, 0, 8, 16, 0, 0, 0, 0, 0, 0);
    pub const RGBA32: Self = color_format!(Rgba, 32, 8, 8, 8, 24, 16, 8, 0, 0, 0, 8, 0, 0);
    pub const RGBA32_BE: Self = color_format!(Rgba, 32, 8, 8, 8, 0, 8, 16, 0, 0, 0, 8, 24, 0);
    pub const ARGB32: Self = color_format!(Rgba, 32, 8, 8, 8, 16, 8, 0, 0, 0, 0, 8, 24, 0);
    pub const ARGB32_BE: Self = color_format!(Rgba, 32, 8, 8, 8, 8, 16, 24, 0, 0, 0, 8, 0, 0);

    pub fn bytes_per_pixel(&self) -> usize {
        self.bpp as usize / 8
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if !matches!(self.bpp, 16 | 24 | 32) {
            return Err(FormatError::InvalidColorFormat(format!(
                "unsupported bpp {}",
                self.bpp
            )));
        }
        if self.bpp % 8 != 0 {
            return Err(FormatError::InvalidColorFormat(
                "bpp must be a multiple of 8".into(),
            ));
        }
        Ok(())
    }

    fn decode_channel(packed: u32, shl: u32, bpp: u32, shr: u32) -> u8 {
        if bpp == 0 {
            return 0;
        }
        let mask = (1u32 << bpp) - 1;
        let bits = (packed >> shl) & mask;
        (bits << shr) as u8
    }

    fn encode_channel(component: u8, shl: u32, bpp: u32, shr: u32) -> u32 {
        if bpp == 0 {
            return 0;
        }
        let bits = (component as u32) >> shr;
        let mask = (1u32 << bpp) - 1;
        (bits & mask) << shl
    }

    /// Decodes one packed pixel word into 8-bit RGBA components.
    pub fn decode_pixel(&self, packed: u32) -> [u8; 4] {
        let r = Self::decode_channel(packed, self.red_shl, self.red_bpp, self.red_shr);
        let g = Self::decode_channel(packed, self.green_shl, self.green_bpp, self.green_shr);
        let b = Self::decode_channel(packed, self.blue_shl, self.blue_bpp, self.blue_shr);
        let a = if self.alpha_bpp == 0 {
            255
        } else if self.alpha_bpp == 1 {
            let bit = (packed >> self.alpha_shl) & 1;
            if bit != 0 {
                255
            } else {
                0
            }
        } else {
            Self::decode_channel(packed, self.alpha_shl, self.alpha_bpp, self.alpha_shr)
        };
        [r, g, b, a]
    }

    /// Encodes 8-bit RGBA components into a packed pixel word.
    pub fn encode_pixel(&self, rgba: [u8; 4]) -> u32 {
        let [r, g, b, a] = rgba;
        let mut packed = 0u32;
        packed |= Self::encode_channel(r, self.red_shl, self.red_bpp, self.red_shr);
        packed |= Self::encode_channel(g, self.green_shl, self.green_bpp, self.green_shr);
        packed |= Self::encode_channel(b, self.blue_shl, self.blue_bpp, self.blue_shr);
        if self.alpha_bpp == 1 {
            if a >= 128 {
                packed |= 1 << self.alpha_shl;
            }
        } else if self.alpha_bpp > 0 {
            packed |= Self::encode_channel(a, self.alpha_shl, self.alpha_bpp, self.alpha_shr);
        }
        packed
    }

    pub fn read_pixel<S: std::io::Read + ?Sized>(
        &self,
        stream: &mut S,
    ) -> Result<[u8; 4], crate::error::StreamError> {
        let bpp = self.bytes_per_pixel();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf[..bpp])?;
        let packed = u32::from_le_bytes(buf);
        Ok(self.decode_pixel(packed))
    }

    pub fn write_pixel<S: std::io::Write + ?Sized>(
        &self,
        stream: &mut S,
        rgba: [u8; 4],
    ) -> Result<(), crate::error::StreamError> {
        let bpp = self.bytes_per_pixel();
        let packed = self.encode_pixel(rgba);
        stream.write_all(&packed.to_le_bytes()[..bpp])?;
        Ok(())
    }
}

impl Decode for ColorFormat {
    fn decode<S: std::io::Read + ?Sized>(
        stream: &mut S,
    ) -> Result<Self, crate::error::StreamError> {
        let mode = ColorMode::from_u32(u32::decode(stream)?)
            .map_err(|e| crate::error::StreamError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?;
        Ok(Self {
            mode,
            bpp: u32::decode(stream)?,
            red_bpp: u32::decode(stream)?,
            green_bpp: u32::decode(stream)?,
            blue_bpp: u32::decode(stream)?,
            red_shl: u32::decode(stream)?,
            green_shl: u32::decode(stream)?,
            blue_shl: u32::decode(stream)?,
            red_shr: u32::decode(stream)?,
            green_shr: u32::decode(stream)?,
            blue_shr: u32::decode(stream)?,
            alpha_bpp: u32::decode(stream)?,
            alpha_shl: u32::decode(stream)?,
            alpha_shr: u32::decode(stream)?,
        })
    }
}

impl Encode for ColorFormat {
    fn encode<S: std::io::Write + ?Sized>(
        &self,
        stream: &mut S,
    ) -> Result<(), crate::error::StreamError> {
        (self.mode as u32).encode(stream)?;
        self.bpp.encode(stream)?;
        self.red_bpp.encode(stream)?;
        self.green_bpp.encode(stream)?;
        self.blue_bpp.encode(stream)?;
        self.red_shl.encode(stream)?;
        self.green_shl.encode(stream)?;
        self.blue_shl.encode(stream)?;
        self.red_shr.encode(stream)?;
        self.green_shr.encode(stream)?;
        self.blue_shr.encode(stream)?;
        self.alpha_bpp.encode(stream)?;
        self.alpha_shl.encode(stream)?;
        self.alpha_shr.encode(stream)?;
        Ok(())
    }
}

/// Converts one row of `width` pixels from `src_cf` to `dst_cf`.
pub fn convert_row(src: &[u8], width: usize, src_cf: &ColorFormat, dst: &mut Vec<u8>, dst_cf: &ColorFormat) {
    let src_bpp = src_cf.bytes_per_pixel();
    for x in 0..width {
        let off = x * src_bpp;
        let mut buf = [0u8; 4];
        buf[..src_bpp].copy_from_slice(&src[off..off + src_bpp]);
        let packed = u32::from_le_bytes(buf);
        let rgba = src_cf.decode_pixel(packed);
        let out = dst_cf.encode_pixel(rgba);
        dst.extend_from_slice(&out.to_le_bytes()[..dst_cf.bytes_per_pixel()]);
    }
}

/// Converts an entire `width x height` pixel buffer between color formats. Returns
/// the input unchanged (cloned) if source and destination formats are identical.
pub fn convert_pixdata(
    src: &[u8],
    width: usize,
    height: usize,
    from: &ColorFormat,
    to: &ColorFormat,
) -> Vec<u8> {
    if from == to {
        return src.to_vec();
    }
    let src_stride = width * from.bytes_per_pixel();
    let mut out = Vec::with_capacity(width * height * to.bytes_per_pixel());
    for y in 0..height {
        let row = &src[y * src_stride..(y + 1) * src_stride];
        convert_row(row, width, from, &mut out, to);
    }
    out
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let out = if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (out * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Box-filters `src` (`sw x sh`, format `cf`) down to a `dw x dh` destination,
/// optionally averaging in linear light (`srgb`) rather than gamma space.
pub fn box_filter_scale(
    src: &[u8],
    sw: usize,
    sh: usize,
    dw: usize,
    dh: usize,
    cf: &ColorFormat,
    srgb: bool,
) -> Vec<u8> {
    let bpp = cf.bytes_per_pixel();
    let src_stride = sw * bpp;
    let mut out = vec![0u8; dw * dh * bpp];

    let sample = |x: usize, y: usize| -> [u8; 4] {
        let x = x.min(sw - 1);
        let y = y.min(sh - 1);
        let off = y * src_stride + x * bpp;
        let mut buf = [0u8; 4];
        buf[..bpp].copy_from_slice(&src[off..off + bpp]);
        cf.decode_pixel(u32::from_le_bytes(buf))
    };

    for dy in 0..dh {
        for dx in 0..dw {
            let gx = dx * sw / dw;
            let gy = dy * sh / dh;
            let corners = [
                sample(gx, gy),
                sample(gx + 1, gy),
                sample(gx, gy + 1),
                sample(gx + 1, gy + 1),
            ];

            let mut acc = [0f32; 4];
            for c in corners {
                for ch in 0..4 {
                    acc[ch] += if srgb && ch < 3 {
                        srgb_to_linear(c[ch])
                    } else {
                        c[ch] as f32 / 255.0
                    };
                }
            }
            for v in &mut acc {
                *v /= 4.0;
            }

            let mut rgba = [0u8; 4];
            for ch in 0..4 {
                rgba[ch] = if srgb && ch < 3 {
                    linear_to_srgb(acc[ch])
                } else {
                    (acc[ch] * 255.0).round().clamp(0.0, 255.0) as u8
                };
            }

            let packed = cf.encode_pixel(rgba);
            let off = dy * dw * bpp + dx * bpp;
            out[off..off + bpp].copy_from_slice(&packed.to_le_bytes()[..bpp]);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba32_round_trip() {
        let cf = ColorFormat::RGBA32;
        let rgba = [0x11, 0x22, 0x33, 0x44];
        let packed = cf.encode_pixel(rgba);
        assert_eq!(cf.decode_pixel(packed), rgba);
    }

    #[test]
    fn rgba32_byte_order() {
        let cf = ColorFormat::RGBA32;
        let mut buf = Vec::new();
        cf.write_pixel(&mut buf, [0x11, 0x22, 0x33, 0x44]).unwrap();
        assert_eq!(buf, vec![0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn conversion_idempotent_rgb24_rgba32() {
        let src_cf = ColorFormat::RGB24;
        let dst_cf = ColorFormat::RGBA32;
        let pixel = [10u8, 20, 30];
        let to = convert_pixdata(&pixel, 1, 1, &src_cf, &dst_cf);
        let back = convert_pixdata(&to, 1, 1, &dst_cf, &src_cf);
        assert_eq!(back, pixel);
    }

    #[test]
    fn box_filter_halves_dimensions() {
        let cf = ColorFormat::RGBA32;
        let mut px = Vec::new();
        for _ in 0..4 {
            px.extend_from_slice(&[255, 255, 255, 255]);
        }
        let out = box_filter_scale(&px, 2, 2, 1, 1, &cf, true);
        assert_eq!(out.len(), 4);
        assert_eq!(out, vec![255, 255, 255, 255]);
    }
}
