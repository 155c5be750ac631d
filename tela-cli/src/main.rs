use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tela_cli::{build_cmd, check_cmd, parse_lib_spec, watch_cmd};

#[derive(Parser)]
#[command(name = "tela", version, about = "Tela page compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every page under a site root into persisted artifacts.
    Build {
        /// Site root containing .tela pages
        site: PathBuf,
        /// Output directory for artifacts, generated sources and manifest
        #[arg(long, default_value = "target/tela-out")]
        out: PathBuf,
        /// Module reference as name=path (repeatable)
        #[arg(long = "lib")]
        libs: Vec<String>,
    },
    /// Watch a site root and hot-swap pages as sources change.
    Watch {
        site: PathBuf,
        #[arg(long, default_value = "target/tela-out")]
        out: PathBuf,
        #[arg(long = "lib")]
        libs: Vec<String>,
    },
    /// Parse and analyze one page, reporting diagnostics.
    Check {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Build { site, out, libs } => {
            let refs = libs
                .iter()
                .map(|s| parse_lib_spec(s))
                .collect::<Result<Vec<_>>>()?;
            let summary = build_cmd(&site, &out, &refs)?;
            println!(
                "{} compiled, {} failed; manifest at {}",
                summary.succeeded,
                summary.failed,
                summary.manifest_path.display()
            );
        }
        Commands::Watch { site, out, libs } => {
            let refs = libs
                .iter()
                .map(|s| parse_lib_spec(s))
                .collect::<Result<Vec<_>>>()?;
            watch_cmd(&site, &out, &refs)?;
        }
        Commands::Check { file } => {
            let diagnostics = check_cmd(&file)?;
            if diagnostics.is_empty() {
                println!("ok: {}", file.display());
            }
        }
    }
    Ok(())
}
