#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use clap::Parser;
use dynpatch::error::DynpatchError;
use dynpatch::image::{self, ExeImage};
use dynpatch::patches;
use dynpatch::pe;
use dynpatch::report::hex_prefix;

const REGION_DUMP_LEN: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "dynpatch-verify", version)]
struct Cli {
    input: PathBuf,

    #[arg(long = "dump")]
    dump: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), DynpatchError> {
    let cli = Cli::parse();
    verify(cli.input.as_path(), cli.dump)
}

fn verify(input: &Path, dump: bool) -> Result<(), DynpatchError> {
    let image = ExeImage::load(input)?;
    println!("loaded {} bytes from {}", image.len(), input.display());

    match pe::parse_pe_fingerprint(image.as_bytes()) {
        Ok(fp) => {
            println!(
                "pe: image_base=0x{:08x} size_of_image=0x{:x} time_date_stamp=0x{:08x} sections={:?}",
                fp.image_base,
                fp.size_of_image,
                fp.time_date_stamp,
                fp.section_names_lossy()
            );
            if fp.image_base != image::IMAGE_BASE {
                println!(
                    "WARN: image base 0x{:08x} differs from expected 0x{:08x}, offset mapping will not hold",
                    fp.image_base,
                    image::IMAGE_BASE
                );
            }
        }
        Err(err) => println!("WARN: {err}"),
    }

    let start = image::file_offset_for(patches::LOOP_PATCH_VA)?;
    let end = image::file_offset_for(patches::REGION_END_VA)?;
    let Some(region) = image.as_bytes().get(start..end) else {
        return Err(DynpatchError::FormatError {
            message: format!(
                "文件长度 {} 未覆盖补丁区域 0x{start:x}..0x{end:x}",
                image.len()
            ),
        });
    };

    let expected = patches::patched_region_bytes();
    let differing = region
        .iter()
        .zip(expected.iter())
        .filter(|(actual, wanted)| actual != wanted)
        .count();
    if differing == 0 {
        println!("patch region: patched ({} bytes match)", region.len());
    } else {
        println!(
            "patch region: not patched ({differing} of {} bytes differ)",
            region.len()
        );
    }

    if dump {
        println!("region head: {}", hex_prefix(region, REGION_DUMP_LEN));
    }
    Ok(())
}
