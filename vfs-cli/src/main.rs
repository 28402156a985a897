mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vfs_core::{Error, NullPass, OpenMode, Result, Vfs, VfsConfig};

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn build_vfs(cli: &Cli) -> Result<Vfs> {
    let mut vfs = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            VfsConfig::from_toml_str(&text)?.build()?
        }
        None => Vfs::new(),
    };
    vfs.register_filter(Box::new(NullPass))?;
    for root in &cli.roots {
        vfs.add_root(&root.to_string_lossy())?;
    }
    Ok(vfs)
}

fn run(cli: Cli) -> Result<()> {
    let mut vfs = build_vfs(&cli)?;
    match &cli.command {
        Command::Info(arg) => {
            let info = vfs.locate(&arg.path)?;
            println!("{}\t{}\t{}\t{}", info.kind, info.size, info.archived, info.full_path);
        }
        Command::Ls(args) => {
            vfs.iterate(&args.path, args.recursive, |info| {
                println!("{}\t{}", info.kind, info.full_path);
                true
            })?;
        }
        Command::Exists(arg) => {
            println!("{}", vfs.exists(&arg.path));
        }
        Command::Cat(arg) => {
            let handle = vfs.open(&arg.path, OpenMode::Read)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let mut buf = [0u8; 8192];
            loop {
                let n = vfs.read(handle, &mut buf)?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n]).map_err(Error::from)?;
            }
            vfs.close(handle)?;
        }
    }
    Ok(())
}
