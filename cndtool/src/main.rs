//! `cndtool` — convert between compiled world files (CND) and their text
//! projection (NDY), inspect a CND's layout, and patch a subset of its sections
//! in place.

mod logging;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use libim::animation::Animation;
use libim::error::{Error, StreamError};
use libim::stream::{Decode, FileStream};
use libim::texture::Material;
use libim::world::cnd::World;
use libim::world::header::CndHeader;
use libim::world::material::CndMaterial;
use libim::world::ndy::Ndy;
use libim::world::patch;
use libim::world::resource::{filter_static_resources, StaticResourceNames};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert, inspect and patch compiled world files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a compiled world (CND) to its text projection (NDY).
    ToNdy(ToNdyArgs),
    /// Convert a text projection (NDY) back to a compiled world (CND).
    ToCnd(ToCndArgs),
    /// Print a CND's header fields and section counts.
    Info(InfoArgs),
    /// Replace the materials section of a CND in place.
    PatchMaterials(PatchMaterialsArgs),
    /// Replace the keyframes section of a CND in place.
    PatchAnimations(PatchAnimationsArgs),
}

#[derive(Debug, Args)]
struct ToNdyArgs {
    cnd: PathBuf,

    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct ToCndArgs {
    ndy: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    /// Directory to search (in order) for a prior CND of the same name, whose header
    /// fields this projection does not model (type, version, copyright, padding)
    /// are merged in. Repeatable.
    #[arg(short = 'p', long = "vfs-path")]
    vfs_path: Vec<PathBuf>,

    /// Name of a material considered static (shared engine-wide, not bundled into
    /// this world): removed from the compiled materials list and its surface
    /// references re-encoded to point at the static resource table instead.
    /// Repeatable. Matches the clean-up pass `convertNdyToCnd` runs before
    /// compiling a world.
    #[arg(long = "static-material")]
    static_materials: Vec<String>,

    /// Name of a cog script considered static, removed from the compiled cog
    /// scripts list the same way `--static-material` removes a material.
    /// Repeatable.
    #[arg(long = "static-script")]
    static_scripts: Vec<String>,
}

#[derive(Debug, Args)]
struct InfoArgs {
    cnd: PathBuf,
}

#[derive(Debug, Args)]
struct PatchMaterialsArgs {
    cnd: PathBuf,

    /// MAT files to install as the new materials section, in order.
    #[arg(short = 'm', long = "mat")]
    materials: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct PatchAnimationsArgs {
    cnd: PathBuf,

    /// KEY files to install as the new keyframes section, in order.
    #[arg(short = 'k', long = "key")]
    keyframes: Vec<PathBuf>,
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::ToNdy(args) => to_ndy(args).map_err(|e| (e, Some(args.output.clone()))),
        Command::ToCnd(args) => to_cnd(args).map_err(|e| (e, Some(args.output.clone()))),
        Command::Info(args) => info_cmd(args).map_err(|e| (e, None)),
        Command::PatchMaterials(args) => patch_materials(args).map_err(|e| (e, None)),
        Command::PatchAnimations(args) => patch_animations(args).map_err(|e| (e, None)),
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

fn to_ndy(args: &ToNdyArgs) -> Result<(), Error> {
    let mut f = FileStream::open(&args.cnd)?;
    let world = World::read(&mut f)?;
    info!(cogs = world.cog_scripts.len(), materials = world.materials.len(), "projecting world to text");
    let ndy = Ndy::from_world(&world)?;
    fs::write(&args.output, ndy.write()).map_err(io_err)?;
    Ok(())
}

fn to_cnd(args: &ToCndArgs) -> Result<(), Error> {
    let text = fs::read_to_string(&args.ndy).map_err(io_err)?;
    let ndy = Ndy::read(&text, Some(args.ndy.display().to_string()))?;

    let base = find_base_header(&args.ndy, &args.vfs_path, &args.output)?;
    let mut world = ndy.to_world(base)?;
    info!(cogs = world.cog_scripts.len(), materials = world.materials.len(), "compiling world to binary");

    if !args.static_materials.is_empty() || !args.static_scripts.is_empty() {
        let statics = StaticResourceNames {
            materials: args.static_materials.clone(),
            scripts: args.static_scripts.clone(),
            ..Default::default()
        };
        let report = filter_static_resources(&mut world, &statics);
        info!(
            materials_removed = report.materials_removed,
            scripts_removed = report.scripts_removed,
            "filtered static resources"
        );
    }

    let mut out = FileStream::create(&args.output)?;
    world.write(&mut out)?;
    Ok(())
}

/// Looks for a CND of the same name as `ndy` (but for its extension) in each of
/// `vfs_path`, in order, and merges its header fields in. Falls back to a fresh
/// header carrying `output`'s own name if none is found.
fn find_base_header(ndy: &std::path::Path, vfs_path: &[PathBuf], output: &std::path::Path) -> Result<CndHeader, Error> {
    let stem = ndy.file_stem().and_then(|s| s.to_str()).unwrap_or("world");
    for dir in vfs_path {
        let candidate = dir.join(format!("{stem}.cnd"));
        if candidate.is_file() {
            info!(candidate = %candidate.display(), "merging header from prior cnd");
            let mut f = FileStream::open(&candidate)?;
            return Ok(CndHeader::decode(&mut f)?);
        }
    }
    Ok(CndHeader::new_world(output.display().to_string()))
}

fn info_cmd(args: &InfoArgs) -> Result<(), Error> {
    let mut f = FileStream::open(&args.cnd)?;
    let world = World::read(&mut f)?;

    println!("type: {:#x}", world.header.ty);
    println!("version: {}", world.header.version);
    println!("static: {}", world.header.is_static());
    println!("materials: {}", world.materials.len());
    println!("sectors: {}", world.sectors.len());
    println!("keyframes: {}", world.keyframes.len());
    println!("cog scripts: {}", world.cog_scripts.len());
    Ok(())
}

fn patch_materials(args: &PatchMaterialsArgs) -> Result<(), Error> {
    let mut materials = Vec::with_capacity(args.materials.len());
    for path in &args.materials {
        let mut f = FileStream::open(path)?;
        let mat = Material::read(&mut f)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("material")
            .to_owned();
        materials.push(CndMaterial::from_material(name, &mat)?);
    }
    info!(count = materials.len(), cnd = %args.cnd.display(), "patching materials section");
    patch::patch_materials(&args.cnd, &materials)
}

fn patch_animations(args: &PatchAnimationsArgs) -> Result<(), Error> {
    let mut keyframes = Vec::with_capacity(args.keyframes.len());
    for path in &args.keyframes {
        let text = fs::read_to_string(path).map_err(io_err)?;
        keyframes.push(Animation::read(&text, Some(path.display().to_string()))?);
    }
    info!(count = keyframes.len(), cnd = %args.cnd.display(), "patching keyframes section");
    patch::patch_animations(&args.cnd, &keyframes)
}
