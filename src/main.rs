#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use clap::Parser;
use clap::error::ErrorKind;
use dynpatch::error::DynpatchError;
use dynpatch::image::ExeImage;
use dynpatch::patches;
use dynpatch::report;
use dynpatch::telemetry::init_telemetry;

#[derive(Parser, Debug)]
#[command(name = "dynpatch", version)]
struct Cli {
    input: PathBuf,

    output: PathBuf,

    #[arg(long = "json")]
    json: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), DynpatchError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            let status = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(status);
        }
    };

    init_telemetry()?;
    run_with_paths(cli.input.as_path(), cli.output.as_path(), cli.json)
}

fn run_with_paths(input: &Path, output: &Path, json: bool) -> Result<(), DynpatchError> {
    println!("patching {} -> {}", input.display(), output.display());

    let mut image = ExeImage::load(input)?;
    println!("loaded {} bytes", image.len());

    let set = patches::dynamic_loop_patch_set();
    println!("applying patch set: {}", set.name);
    for patch in &set.patches {
        let applied = image.apply_patch(
            patch.virtual_addr,
            patch.bytes.as_slice(),
            patch.description.as_str(),
        )?;
        report::print_applied(&applied);
    }

    image.save(output)?;
    println!("saved {} bytes to {}", image.len(), output.display());

    report::print_summary(image.applied());
    println!("changes: {}", set.summary);
    if json {
        println!("{}", report::summary_json(image.applied())?);
    }
    println!("patching completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use dynpatch::image;

    fn unique_temp_dir(label: &str) -> Result<PathBuf, DynpatchError> {
        let base = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = base.join(format!("dynpatch-{label}-{}-{nanos}", std::process::id()));
        fs::create_dir_all(dir.as_path()).map_err(DynpatchError::IoError)?;
        Ok(dir)
    }

    #[test]
    fn patches_known_input_end_to_end() -> Result<(), DynpatchError> {
        let dir = unique_temp_dir("e2e")?;
        let input = dir.join("game.exe");
        let output = dir.join("game_patched.exe");

        let original: Vec<u8> = (0..0x14_0000).map(|i| (i % 251) as u8).collect();
        fs::write(input.as_path(), original.as_slice()).map_err(DynpatchError::IoError)?;

        run_with_paths(input.as_path(), output.as_path(), true)?;

        let patched = fs::read(output.as_path()).map_err(DynpatchError::IoError)?;
        assert_eq!(patched.len(), original.len());

        let start = image::file_offset_for(patches::LOOP_PATCH_VA)?;
        let end = image::file_offset_for(patches::REGION_END_VA)?;
        assert_eq!(&patched[start..end], patches::patched_region_bytes().as_slice());
        assert_eq!(&patched[..start], &original[..start]);
        assert_eq!(&patched[end..], &original[end..]);
        Ok(())
    }

    #[test]
    fn short_input_fails_and_writes_nothing() -> Result<(), DynpatchError> {
        let dir = unique_temp_dir("short")?;
        let input = dir.join("small.bin");
        let output = dir.join("small_patched.bin");

        fs::write(input.as_path(), vec![0u8; 4096]).map_err(DynpatchError::IoError)?;

        let err = run_with_paths(input.as_path(), output.as_path(), false).unwrap_err();
        assert!(matches!(err, DynpatchError::PatchOutOfBounds { .. }));
        assert!(!output.exists());
        Ok(())
    }
}
