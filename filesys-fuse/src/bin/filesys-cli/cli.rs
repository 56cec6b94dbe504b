use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use filesys::NUM_SECTORS;

#[derive(Parser)]
pub struct Cli {
    #[command(flatten)]
    pub disk: Disk,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct Disk {
    /// Disk image on the host
    #[arg(long, short, default_value = "DISK")]
    pub image: PathBuf,

    /// Number of sectors in the image
    #[arg(long, short, default_value_t = NUM_SECTORS)]
    pub sectors: usize,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty file system, wiping the image
    Format,
    /// Copy a host file into the file system
    Cp { source: PathBuf, name: String },
    /// Print a file's contents
    Cat { name: String },
    /// List the directory
    Ls,
    /// Remove a file
    Rm { name: String },
    /// Print the bitmap, the directory and every file header
    Dump,
}
