//! cusp command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cusp::cli::{compile_file, eval_file, wrap_info_for_file};
use cusp::{ArtifactWriter, BuildConfig, Tag};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cusp")]
#[command(author, version, about = "Compile scalar functions into Python, C++ and CUDA variants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a function file and write its variants
    Compile {
        /// Input file with one or more `defn` forms
        file: PathBuf,

        /// Execution system to compile for (cpp, omp, tbb, cuda)
        #[arg(short, long, default_value = "cpp")]
        tag: Tag,

        /// Build configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Preferred variant when several are available
        #[arg(long)]
        variant: Option<String>,

        /// Write into the current directory instead of next to the input
        #[arg(long)]
        here: bool,
    },

    /// Print the calling-convention descriptor as JSON
    WrapInfo {
        file: PathBuf,

        #[arg(short, long, default_value = "cpp")]
        tag: Tag,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Evaluate a function on numeric arguments
    Eval {
        file: PathBuf,

        /// Definition to evaluate when the file holds several
        #[arg(short, long)]
        function: Option<String>,

        #[arg(allow_negative_numbers = true)]
        args: Vec<f64>,
    },
}

fn load_config(path: Option<&Path>) -> Result<BuildConfig> {
    match path {
        Some(path) => BuildConfig::load(path).context("Failed to load build configuration"),
        None => Ok(BuildConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cusp=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            tag,
            config,
            variant,
            here,
        } => {
            let config = load_config(config.as_deref())?;
            let writer = match variant {
                Some(variant) => ArtifactWriter::new().prefer(variant),
                None => ArtifactWriter::new(),
            };
            let names = compile_file(&file, tag, &config, &writer, here)?;
            println!("Compiled {} from '{}'", names.join(", "), file.display());
        }
        Commands::WrapInfo { file, tag, config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", wrap_info_for_file(&file, tag, &config)?);
        }
        Commands::Eval { file, function, args } => {
            println!("{}", eval_file(&file, function.as_deref(), &args)?);
        }
    }

    Ok(())
}
