//! Picks between the two codecs in `libim::image` by file extension.

use std::io::Cursor;
use std::path::Path;

use clap::ValueEnum;
use libim::color::ColorFormat;
use libim::error::{Error, FormatError};
use libim::image::{BmpCodec, ImageDecoder, ImageEncoder, PngCodec};
use libim::texture::Texture;

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Bmp,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => Ok(Self::Png),
            Some("bmp") => Ok(Self::Bmp),
            other => Err(FormatError::Mismatch {
                what: "image file extension",
                expected: "\"png\" or \"bmp\"".into(),
                got: format!("{other:?}"),
            }
            .into()),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<Texture, Error> {
        let mut cursor = Cursor::new(bytes);
        match self {
            Self::Png => PngCodec.decode(&mut cursor),
            Self::Bmp => BmpCodec.decode(&mut cursor),
        }
    }

    pub fn encode(self, texture: &Texture, format: ColorFormat) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        match self {
            Self::Png => PngCodec.encode(&mut buf, texture, format)?,
            Self::Bmp => BmpCodec.encode(&mut buf, texture, format)?,
        }
        Ok(buf)
    }
}
