//! kukic - compile one Kukicha source file and report diagnostics.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};

use kuki_drv::compile_file;

fn main() -> ExitCode {
    match run() {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            eprintln!("kukic: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let mut args = std::env::args_os().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        bail!("usage: kukic FILE.kuki");
    };
    let path = PathBuf::from(path);

    let compilation = compile_file(&path)?;
    let rendered = compilation.render_diagnostics();
    if !rendered.is_empty() {
        eprintln!("{rendered}");
    }
    Ok(!compilation.has_errors())
}
