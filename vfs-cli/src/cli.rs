use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Inspect and extract from a VFS root-path set")]
pub struct Cli {
    /// TOML config file (roots + archive extension). See `VfsConfig`.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Additional root directory, may be repeated; searched after any
    /// roots loaded from `--config`.
    #[arg(short, long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print type, size and archived-ness for one logical path.
    Info(PathArg),
    /// List the children of a directory or archive.
    Ls(LsArgs),
    /// Print whether a logical path resolves.
    Exists(PathArg),
    /// Write a file's decoded contents to stdout.
    Cat(PathArg),
}

#[derive(Debug, Args)]
pub struct PathArg {
    pub path: String,
}

#[derive(Debug, Args)]
pub struct LsArgs {
    pub path: String,

    #[arg(short, long)]
    pub recursive: bool,
}
