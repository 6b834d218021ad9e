//! `gobext` — extract a GOB archive's entries to a directory.

mod logging;

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use libim::error::{Error, StreamError};
use libim::gob::VfContainer;
use libim::stream::FileStream;

#[derive(Debug, Parser)]
#[command(author, version, about = "Extract a GOB archive to a directory", long_about = None)]
struct Args {
    /// Path to the .gob file to extract.
    gob: PathBuf,

    /// Directory to extract into. Defaults to `<gob stem>_GOB`.
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// List each entry as it is extracted.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => {
            println!("SUCCESS");
            ExitCode::SUCCESS
        }
        Err((err, partial_dir)) => {
            if let Some(dir) = partial_dir {
                let _ = fs::remove_dir_all(dir);
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

fn run(args: &Args) -> Result<(), (Error, Option<PathBuf>)> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.gob));

    let stream = FileStream::open(&args.gob).map_err(|e| (Error::from(e), None))?;
    let container = VfContainer::load(stream).map_err(|e| (e, None))?;

    fs::create_dir_all(&output_dir).map_err(|e| (io_err(e), None))?;

    let paths: Vec<String> = container.paths().map(str::to_owned).collect();
    let total = paths.len();
    for (i, path) in paths.iter().enumerate() {
        print!("\rextracting {}/{total}", i + 1);
        std::io::stdout().flush().ok();
        if args.verbose {
            info!(path, "extracting entry");
        }

        let vf = container
            .get(path)
            .expect("path came from container.paths()");
        let bytes = vf
            .read_all()
            .map_err(|e| (Error::from(e), Some(output_dir.clone())))?;

        let dest = output_dir.join(relative_path(path));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| (io_err(e), Some(output_dir.clone())))?;
        }
        fs::write(&dest, &bytes).map_err(|e| (io_err(e), Some(output_dir.clone())))?;
    }
    if total > 0 {
        println!();
    }
    Ok(())
}

/// GOB paths use `\` as the original engine's separator; translate to the host's
/// own component separator rather than writing every file flat.
fn relative_path(path: &str) -> PathBuf {
    path.replace('\\', "/").split('/').collect()
}

fn default_output_dir(gob: &Path) -> PathBuf {
    let stem = gob.file_stem().and_then(|s| s.to_str()).unwrap_or("archive");
    PathBuf::from(format!("{stem}_GOB"))
}
