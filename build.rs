//! Build script rendering the `bearerbox` man page from the CLI definition.

use std::{fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-changed=build.rs");

    let man_dir = PathBuf::from("target/generated-man");
    fs::create_dir_all(&man_dir)?;

    let command = cli::Cli::command();
    let page = man_dir.join(format!("{}.1", command.get_name()));
    let mut rendered = Vec::new();
    Man::new(command).render(&mut rendered)?;
    fs::write(page, rendered)?;

    Ok(())
}
