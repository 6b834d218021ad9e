//! `matool` — create, inspect and edit `.mat` material files.

mod color_arg;
mod image_io;
mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use color_arg::ColorFormatArg;
use image_io::ImageKind;
use libim::error::{Error, FormatError, StreamError};
use libim::stream::FileStream;
use libim::texture::{MatCel, Material, MatCelData};

#[derive(Debug, Parser)]
#[command(author, version, about = "Create, inspect and edit .mat material files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a MAT from one image, or from a directory of images (one cel per image).
    Create(CreateArgs),
    /// Extract each cel of a MAT to its own image file.
    Extract(ExtractArgs),
    /// Print a MAT's color format and per-cel layout.
    Info(InfoArgs),
    /// Replace one cel of a MAT in place.
    Modify(ModifyArgs),
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// An image file (single-cel material), or a directory of images, one cel per
    /// image in filename order (batch material).
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(short, long, value_enum, default_value = "rgba32")]
    format: ColorFormatArg,

    /// Number of mipmap levels to generate (defaults to the full chain down to 1x1).
    #[arg(long)]
    mipmaps: Option<u32>,

    /// Average mipmap levels in linear light rather than gamma space.
    #[arg(long)]
    srgb: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    mat: PathBuf,

    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "png")]
    image_format: ImageKind,
}

#[derive(Debug, Args)]
struct InfoArgs {
    mat: PathBuf,
}

#[derive(Debug, Args)]
struct ModifyArgs {
    mat: PathBuf,

    /// Index of the cel to replace.
    #[arg(long)]
    cel: usize,

    image: PathBuf,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Create(args) => create(args).map_err(|e| (e, Some(args.output.clone()))),
        Command::Extract(args) => extract(args).map_err(|e| (e, None)),
        Command::Info(args) => info_cmd(args).map_err(|e| (e, None)),
        Command::Modify(args) => modify(args).map_err(|e| (e, None)),
    };

    match result {
        Ok(()) => {
            println!("SUCCESS");
            ExitCode::SUCCESS
        }
        Err((err, partial_output)) => {
            if let Some(path) = partial_output {
                let _ = fs::remove_file(path);
            }
            println!("FAILED");
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::from(StreamError::from(e))
}

fn create(args: &CreateArgs) -> Result<(), Error> {
    let format = args.format.to_color_format();
    let sources = if args.input.is_dir() {
        let mut paths: Vec<PathBuf> = fs::read_dir(&args.input)
            .map_err(io_err)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| ImageKind::from_path(p).is_ok())
            .collect();
        paths.sort();
        paths
    } else {
        vec![args.input.clone()]
    };

    if sources.is_empty() {
        return Err(FormatError::Mismatch {
            what: "matool create input",
            expected: "at least one png/bmp image".into(),
            got: "none found".into(),
        }
        .into());
    }

    let mut material = Material::new(format);
    for path in &sources {
        let kind = ImageKind::from_path(path)?;
        let bytes = fs::read(path).map_err(io_err)?;
        let decoded = kind.decode(&bytes)?;
        let converted = decoded.convert(format);
        let tex = converted.generate_mipmaps(args.mipmaps, Some(format), args.srgb);
        info!(path = %path.display(), width = tex.width, height = tex.height, mip_levels = tex.mip_levels, "adding cel");
        material.add_cel(tex).map_err(Error::from)?;
    }

    let mut out = FileStream::create(&args.output)?;
    material.write(&mut out)?;
    Ok(())
}

fn extract(args: &ExtractArgs) -> Result<(), Error> {
    let mut f = FileStream::open(&args.mat)?;
    let material = Material::read(&mut f)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_extract_dir(&args.mat));
    fs::create_dir_all(&output_dir).map_err(io_err)?;

    for (i, cel) in material.cels.iter().enumerate() {
        let tex = match &cel.data {
            MatCelData::Texture(tex) => tex,
            MatCelData::Color(_) => {
                warn!(index = i, "skipping color-only cel, no image to extract");
                continue;
            }
        };
        let bytes = args.image_format.encode(tex, tex.format)?;
        let dest = output_dir.join(format!("cel{i:03}.{}", args.image_format.extension()));
        fs::write(&dest, &bytes).map_err(io_err)?;
        info!(index = i, dest = %dest.display(), "extracted cel");
    }
    Ok(())
}

fn info_cmd(args: &InfoArgs) -> Result<(), Error> {
    let mut f = FileStream::open(&args.mat)?;
    let material = Material::read(&mut f)?;

    println!("format: {:?} ({} bpp)", material.color_info.mode, material.color_info.bpp);
    println!("cels: {}", material.cels.len());
    for (i, cel) in material.cels.iter().enumerate() {
        match &cel.data {
            MatCelData::Texture(tex) => {
                println!("  [{i}] texture {}x{} mip_levels={}", tex.width, tex.height, tex.mip_levels);
            }
            MatCelData::Color(_) => println!("  [{i}] color"),
        }
    }
    Ok(())
}

fn modify(args: &ModifyArgs) -> Result<(), Error> {
    let mut f = FileStream::open(&args.mat)?;
    let mut material = Material::read(&mut f)?;

    let existing_mip_levels = match material.cels.get(args.cel).map(|c| &c.data) {
        Some(MatCelData::Texture(tex)) => tex.mip_levels,
        Some(MatCelData::Color(_)) => 1,
        None => {
            return Err(FormatError::Mismatch {
                what: "matool modify --cel",
                expected: format!("index < {}", material.cels.len()),
                got: args.cel.to_string(),
            }
            .into())
        }
    };

    let kind = ImageKind::from_path(&args.image)?;
    let bytes = fs::read(&args.image).map_err(io_err)?;
    let decoded = kind.decode(&bytes)?;
    let converted = decoded.convert(material.color_info);
    let tex = converted.generate_mipmaps(Some(existing_mip_levels), Some(material.color_info), false);

    let header = material.cels[args.cel].header;
    material.cels[args.cel] = MatCel {
        header,
        data: MatCelData::Texture(tex),
    };

    let mut out = FileStream::create(&args.mat)?;
    material.write(&mut out)?;
    Ok(())
}

fn default_extract_dir(mat: &Path) -> PathBuf {
    let stem = mat.file_stem().and_then(|s| s.to_str()).unwrap_or("material");
    PathBuf::from(format!("{stem}_cels"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use libim::color::ColorFormat;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("matool-test-{}-{name}", std::process::id()))
    }

    #[test]
    fn info_on_file_missing_magic_fails() {
        let path = temp_path("no-magic.mat");
        fs::write(&path, b"not a mat file").unwrap();

        let err = info_cmd(&InfoArgs { mat: path.clone() }).unwrap_err();
        assert!(err.to_string().contains("MAT"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn info_on_valid_mat_succeeds() {
        let path = temp_path("valid.mat");
        let mut material = Material::new(ColorFormat::RGBA32);
        material
            .add_cel(libim::texture::Texture::new_single_level(
                1,
                1,
                ColorFormat::RGBA32,
                vec![0x44, 0x33, 0x22, 0x11],
            ))
            .unwrap();
        let mut out = FileStream::create(&path).unwrap();
        material.write(&mut out).unwrap();
        drop(out);

        assert!(info_cmd(&InfoArgs { mat: path.clone() }).is_ok());

        fs::remove_file(&path).ok();
    }
}
