//! Write man pages for worktime and each of its commands
//!
//! Usage: generate-man [OUT_DIR]   (default: ./man)

use anyhow::{Context, Result};
use clap::CommandFactory;
use std::fs;
use std::path::PathBuf;
use worktime::cli::Cli;

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let cmd = Cli::command();
    let name = cmd.get_name().to_string();
    write_page(&out_dir.join(format!("{}.1", name)), cmd.clone())?;

    for sub in cmd.get_subcommands() {
        let file = out_dir.join(format!("{}-{}.1", name, sub.get_name()));
        write_page(&file, sub.clone())?;
    }
    Ok(())
}

fn write_page(path: &PathBuf, cmd: clap::Command) -> Result<()> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    fs::write(path, buffer).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}
