//! Maps the color format names `matool` accepts on the command line to
//! [`ColorFormat`]'s named constants.

use clap::ValueEnum;
use libim::color::ColorFormat;

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ColorFormatArg {
    Rgb555,
    Rgb555Be,
    Rgb565,
    Rgb565Be,
    Rgba4444,
    Rgba4444Be,
    Argb4444,
    Argb4444Be,
    Rgba5551,
    Rgba5551Be,
    Argb1555,
    Argb1555Be,
    Rgb24,
    Rgb24Be,
    Rgba32,
    Rgba32Be,
    Argb32,
    Argb32Be,
}

impl ColorFormatArg {
    pub fn to_color_format(self) -> ColorFormat {
        match self {
            Self::Rgb555 => ColorFormat::RGB555,
            Self::Rgb555Be => ColorFormat::RGB555_BE,
            Self::Rgb565 => ColorFormat::RGB565,
            Self::Rgb565Be => ColorFormat::RGB565_BE,
            Self::Rgba4444 => ColorFormat::RGBA4444,
            Self::Rgba4444Be => ColorFormat::RGBA4444_BE,
            Self::Argb4444 => ColorFormat::ARGB4444,
            Self::Argb4444Be => ColorFormat::ARGB4444_BE,
            Self::Rgba5551 => ColorFormat::RGBA5551,
            Self::Rgba5551Be => ColorFormat::RGBA5551_BE,
            Self::Argb1555 => ColorFormat::ARGB1555,
            Self::Argb1555Be => ColorFormat::ARGB1555_BE,
            Self::Rgb24 => ColorFormat::RGB24,
            Self::Rgb24Be => ColorFormat::RGB24_BE,
            Self::Rgba32 => ColorFormat::RGBA32,
            Self::Rgba32Be => ColorFormat::RGBA32_BE,
            Self::Argb32 => ColorFormat::ARGB32,
            Self::Argb32Be => ColorFormat::ARGB32_BE,
        }
    }
}
