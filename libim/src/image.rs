//! Bitmap import/export adapters (component K).
//!
//! Two concrete codecs sit behind the [`ImageDecoder`]/[`ImageEncoder`] traits:
//! [`PngCodec`], a thin wrapper over the `image` crate (actual PNG bitstream
//! decoding is well outside what this crate hand-rolls), and [`BmpCodec`], written
//! by hand against [`ColorFormat`] directly so a texture's native 16bpp packed
//! layouts (RGB555, RGBA5551, ...) round-trip without first widening to 8-bit
//! components. `matool` uses both to pull cels out of a `Material` as ordinary
//! image files and to build one back up from a directory of them.

use std::io::{Read, Write};

use image::ImageFormat;

use crate::color::{ColorFormat, ColorMode};
use crate::error::{Error, FormatError, StreamError};
use crate::texture::Texture;

/// Decodes a bitmap stream into a single-level RGBA32 [`Texture`].
pub trait ImageDecoder {
    fn decode<R: Read>(&self, stream: &mut R) -> Result<Texture, Error>;
}

/// Encodes a texture's level-0 pixels as a bitmap stream. `format` is the color
/// format to convert to before encoding (the texture is converted first if it
/// isn't already stored that way).
pub trait ImageEncoder {
    fn encode<W: Write>(&self, stream: &mut W, texture: &Texture, format: ColorFormat) -> Result<(), Error>;
}

pub struct PngCodec;
pub struct BmpCodec;

fn image_to_error(e: image::ImageError) -> Error {
    FormatError::Mismatch {
        what: "bitmap image",
        expected: "valid PNG stream".into(),
        got: e.to_string(),
    }
    .into()
}

fn rgba_image_to_texture(img: image::RgbaImage) -> Texture {
    let (width, height) = img.dimensions();
    let cf = ColorFormat::RGBA32;
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for px in img.pixels() {
        pixels.extend_from_slice(&cf.encode_pixel(px.0).to_le_bytes());
    }
    Texture::new_single_level(width, height, cf, pixels)
}

fn texture_to_rgba_image(texture: &Texture, format: ColorFormat) -> Result<image::RgbaImage, Error> {
    let converted = if texture.format == format {
        texture.clone()
    } else {
        texture.convert(format)
    };
    let src = converted.mip_level(0).ok_or_else(|| {
        Error::from(FormatError::Mismatch {
            what: "texture mip level 0",
            expected: "present".into(),
            got: "missing".into(),
        })
    })?;
    let bpp = format.bytes_per_pixel();
    let mut img = image::RgbaImage::new(converted.width, converted.height);
    for (i, px) in img.pixels_mut().enumerate() {
        let off = i * bpp;
        let mut buf = [0u8; 4];
        buf[..bpp].copy_from_slice(&src[off..off + bpp]);
        px.0 = format.decode_pixel(u32::from_le_bytes(buf));
    }
    Ok(img)
}

impl ImageDecoder for PngCodec {
    fn decode<R: Read>(&self, stream: &mut R) -> Result<Texture, Error> {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).map_err(StreamError::from)?;
        let img = image::load_from_memory_with_format(&buf, ImageFormat::Png).map_err(image_to_error)?;
        Ok(rgba_image_to_texture(img.to_rgba8()))
    }
}

impl ImageEncoder for PngCodec {
    fn encode<W: Write>(&self, stream: &mut W, texture: &Texture, format: ColorFormat) -> Result<(), Error> {
        let img = texture_to_rgba_image(texture, format)?;
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(image_to_error)?;
        stream.write_all(&buf.into_inner()).map_err(StreamError::from)?;
        Ok(())
    }
}

fn channel_from_mask(mask: u32) -> (u32, u32, u32) {
    if mask == 0 {
        return (0, 0, 0);
    }
    let bpp = mask.count_ones();
    let shl = mask.trailing_zeros();
    (bpp, shl, 8u32.saturating_sub(bpp))
}

fn color_format_from_masks(bitcount: u16, r: u32, g: u32, b: u32, a: u32) -> ColorFormat {
    let (red_bpp, red_shl, red_shr) = channel_from_mask(r);
    let (green_bpp, green_shl, green_shr) = channel_from_mask(g);
    let (blue_bpp, blue_shl, blue_shr) = channel_from_mask(b);
    let (alpha_bpp, alpha_shl, alpha_shr) = channel_from_mask(a);
    ColorFormat {
        mode: if alpha_bpp > 0 { ColorMode::Rgba } else { ColorMode::Rgb },
        bpp: bitcount as u32,
        red_bpp,
        green_bpp,
        blue_bpp,
        red_shl,
        green_shl,
        blue_shl,
        red_shr,
        green_shr,
        blue_shr,
        alpha_bpp,
        alpha_shl,
        alpha_shr,
    }
}

fn default_masks(bitcount: u16) -> (u32, u32, u32, u32) {
    match bitcount {
        16 => (0x7C00, 0x03E0, 0x001F, 0),
        24 => (0xFF0000, 0x00FF00, 0x0000FF, 0),
        32 => (0x00FF0000, 0x0000FF00, 0x000000FF, 0xFF000000),
        _ => (0, 0, 0, 0),
    }
}

/// `V4`-or-newer BMP headers carry explicit channel masks, needed for anything
/// other than the two layouts a minimal `BITMAPINFOHEADER` can express implicitly.
fn bmp_uses_v4_header(format: &ColorFormat) -> bool {
    !(*format == ColorFormat::RGB555 || *format == ColorFormat::RGB24)
}

fn bmp_decode_inner(stream: &mut impl Read) -> Result<Texture, StreamError> {
    let mut file_header = [0u8; 14];
    stream.read_exact(&mut file_header)?;
    if &file_header[0..2] != b"BM" {
        return Err(StreamError::BadMagic {
            format: "BMP",
            expected: *b"BM\0\0",
            got: [file_header[0], file_header[1], 0, 0],
        });
    }
    let data_offset = u32::from_le_bytes(file_header[10..14].try_into().unwrap());

    let mut header_size_buf = [0u8; 4];
    stream.read_exact(&mut header_size_buf)?;
    let header_size = u32::from_le_bytes(header_size_buf);

    let mut rest = vec![0u8; header_size as usize - 4];
    stream.read_exact(&mut rest)?;
    let width = i32::from_le_bytes(rest[0..4].try_into().unwrap());
    let height_raw = i32::from_le_bytes(rest[4..8].try_into().unwrap());
    let bitcount = u16::from_le_bytes(rest[10..12].try_into().unwrap());
    let compression = u32::from_le_bytes(rest[12..16].try_into().unwrap());

    let mut consumed = 14 + header_size;
    let (r_mask, g_mask, b_mask, a_mask) = if header_size >= 108 {
        (
            u32::from_le_bytes(rest[36..40].try_into().unwrap()),
            u32::from_le_bytes(rest[40..44].try_into().unwrap()),
            u32::from_le_bytes(rest[44..48].try_into().unwrap()),
            u32::from_le_bytes(rest[48..52].try_into().unwrap()),
        )
    } else if compression == 3 {
        let mut masks = [0u8; 12];
        stream.read_exact(&mut masks)?;
        consumed += 12;
        (
            u32::from_le_bytes(masks[0..4].try_into().unwrap()),
            u32::from_le_bytes(masks[4..8].try_into().unwrap()),
            u32::from_le_bytes(masks[8..12].try_into().unwrap()),
            0,
        )
    } else {
        default_masks(bitcount)
    };

    let format = color_format_from_masks(bitcount, r_mask, g_mask, b_mask, a_mask);
    format
        .validate()
        .map_err(|e| StreamError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?;

    let width_u = width.unsigned_abs();
    let height_u = height_raw.unsigned_abs();
    let top_down = height_raw < 0;

    if data_offset > consumed {
        let mut skip = vec![0u8; (data_offset - consumed) as usize];
        stream.read_exact(&mut skip)?;
    }

    let bpp = format.bytes_per_pixel();
    let src_stride = width_u as usize * bpp;
    let row_stride = (src_stride + 3) & !3;
    let mut pixels = vec![0u8; src_stride * height_u as usize];
    let mut row_buf = vec![0u8; row_stride];
    for y in 0..height_u as usize {
        stream.read_exact(&mut row_buf)?;
        let dest_y = if top_down { y } else { height_u as usize - 1 - y };
        pixels[dest_y * src_stride..(dest_y + 1) * src_stride].copy_from_slice(&row_buf[..src_stride]);
    }

    Ok(Texture::new_single_level(width_u, height_u, format, pixels))
}

fn bmp_encode_inner(stream: &mut impl Write, texture: &Texture, format: ColorFormat) -> Result<(), StreamError> {
    format
        .validate()
        .map_err(|e| StreamError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?;
    let converted = if texture.format == format {
        texture.clone()
    } else {
        texture.convert(format)
    };
    let width = converted.width;
    let height = converted.height;
    let bpp = format.bytes_per_pixel();
    let src = converted
        .mip_level(0)
        .ok_or_else(|| StreamError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "texture has no mip level 0")))?;
    let src_stride = width as usize * bpp;
    let row_stride = (src_stride + 3) & !3;

    let v4 = bmp_uses_v4_header(&format);
    let header_size: u32 = if v4 { 108 } else { 40 };
    let data_offset = 14 + header_size;
    let pixel_data_size = row_stride as u32 * height;
    let file_size = data_offset + pixel_data_size;

    stream.write_all(b"BM")?;
    stream.write_all(&file_size.to_le_bytes())?;
    stream.write_all(&0u16.to_le_bytes())?;
    stream.write_all(&0u16.to_le_bytes())?;
    stream.write_all(&data_offset.to_le_bytes())?;

    stream.write_all(&header_size.to_le_bytes())?;
    stream.write_all(&(width as i32).to_le_bytes())?;
    stream.write_all(&(height as i32).to_le_bytes())?;
    stream.write_all(&1u16.to_le_bytes())?;
    stream.write_all(&(format.bpp as u16).to_le_bytes())?;
    stream.write_all(&(if v4 { 3u32 } else { 0u32 }).to_le_bytes())?;
    stream.write_all(&pixel_data_size.to_le_bytes())?;
    stream.write_all(&2835i32.to_le_bytes())?;
    stream.write_all(&2835i32.to_le_bytes())?;
    stream.write_all(&0u32.to_le_bytes())?;
    stream.write_all(&0u32.to_le_bytes())?;

    if v4 {
        let mask = |bpp: u32, shl: u32| -> u32 {
            if bpp == 0 {
                0
            } else {
                ((1u32 << bpp) - 1) << shl
            }
        };
        stream.write_all(&mask(format.red_bpp, format.red_shl).to_le_bytes())?;
        stream.write_all(&mask(format.green_bpp, format.green_shl).to_le_bytes())?;
        stream.write_all(&mask(format.blue_bpp, format.blue_shl).to_le_bytes())?;
        stream.write_all(&mask(format.alpha_bpp, format.alpha_shl).to_le_bytes())?;
        stream.write_all(&[0u8; 4 + 36 + 12])?;
    }

    for y in (0..height as usize).rev() {
        let row = &src[y * src_stride..(y + 1) * src_stride];
        stream.write_all(row)?;
        if row_stride > src_stride {
            stream.write_all(&vec![0u8; row_stride - src_stride])?;
        }
    }
    Ok(())
}

impl ImageDecoder for BmpCodec {
    fn decode<R: Read>(&self, stream: &mut R) -> Result<Texture, Error> {
        bmp_decode_inner(stream).map_err(Error::from)
    }
}

impl ImageEncoder for BmpCodec {
    fn encode<W: Write>(&self, stream: &mut W, texture: &Texture, format: ColorFormat) -> Result<(), Error> {
        bmp_encode_inner(stream, texture, format).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmp_round_trips_rgb24_with_minimal_header() {
        let tex = Texture::new_single_level(2, 1, ColorFormat::RGBA32, vec![
            0x10, 0x20, 0x30, 0xFF, 0x40, 0x50, 0x60, 0xFF,
        ]);
        let expected = tex.convert(ColorFormat::RGB24);
        let mut buf = Vec::new();
        BmpCodec.encode(&mut buf, &tex, ColorFormat::RGB24).unwrap();
        assert_eq!(buf[14..18].to_vec(), 40u32.to_le_bytes().to_vec());
        let back = BmpCodec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(back.width, 2);
        assert_eq!(back.height, 1);
        assert_eq!(back.format, ColorFormat::RGB24);
        assert_eq!(back.mip_level(0).unwrap(), expected.mip_level(0).unwrap());
    }

    #[test]
    fn bmp_round_trips_rgba32_with_v4_header() {
        let tex = Texture::new_single_level(1, 1, ColorFormat::RGBA32, vec![0x11, 0x22, 0x33, 0x80]);
        let mut buf = Vec::new();
        BmpCodec.encode(&mut buf, &tex, ColorFormat::RGBA32).unwrap();
        assert_eq!(u32::from_le_bytes(buf[14..18].try_into().unwrap()), 108);
        let back = BmpCodec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(back.format.decode_pixel(u32::from_le_bytes(back.mip_level(0).unwrap().try_into().unwrap())), [0x11, 0x22, 0x33, 0x80]);
    }

    #[test]
    fn bmp_row_padding_reaches_four_byte_boundary() {
        let tex = Texture::new_single_level(3, 1, ColorFormat::RGBA32, vec![0xFF; 3 * 4]);
        let mut buf = Vec::new();
        BmpCodec.encode(&mut buf, &tex, ColorFormat::RGB24).unwrap();
        // 3 px * 3 bytes = 9, padded to 12; file = 14 + 40 + 12
        assert_eq!(buf.len(), 14 + 40 + 12);
    }

    #[test]
    fn png_round_trips_through_image_crate() {
        let tex = Texture::new_single_level(1, 1, ColorFormat::RGBA32, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        let mut buf = Vec::new();
        PngCodec.encode(&mut buf, &tex, ColorFormat::RGBA32).unwrap();
        let back = PngCodec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(back.width, 1);
        assert_eq!(back.height, 1);
        assert_eq!(
            back.format.decode_pixel(u32::from_le_bytes(back.mip_level(0).unwrap().try_into().unwrap())),
            ColorFormat::RGBA32.decode_pixel(u32::from_le_bytes([0xAA, 0xBB, 0xCC, 0xDD]))
        );
    }
}
