use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use rflpack::types::{BrowseFormat, LineInterpolation};

#[derive(Parser)]
#[command(name = "rflpack", version, about = "L2A reflectance product assembly and cataloging")]
pub struct CliArgs {
    /// Enable debug logging (otherwise RUST_LOG applies, default info)
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the correction engine and package its outputs
    Run(RunArgs),
    /// Generate runconfig.json from an inputs document
    Runconfig(RunconfigArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Run configuration JSON
    pub runconfig: PathBuf,

    /// Scratch directory for staged inputs and engine outputs
    #[arg(long, default_value = "work")]
    pub work_dir: PathBuf,

    /// Directory the catalog is written into
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Browse image format (png or jpeg)
    #[arg(long, value_enum, default_value_t = BrowseFormat::Png)]
    pub browse_format: BrowseFormat,

    /// Interpreter used to launch the engine
    #[arg(long)]
    pub interpreter: Option<PathBuf>,

    /// Engine entry point script
    #[arg(long)]
    pub engine_script: Option<PathBuf>,

    /// Radiative transfer emulator
    #[arg(long)]
    pub emulator_base: Option<PathBuf>,

    /// Surface model (.mat)
    #[arg(long)]
    pub surface_path: Option<PathBuf>,

    /// Radiative transfer data directory passed to the engine as SIXS_DIR
    #[arg(long)]
    pub sixs_dir: Option<PathBuf>,

    /// Line interpolation mode (empirical or analytical)
    #[arg(long, value_enum)]
    pub line_interpolation: Option<LineInterpolation>,

    /// Override the core count from the run configuration
    #[arg(long)]
    pub n_cores: Option<usize>,
}

#[derive(Args)]
pub struct RunconfigArgs {
    /// Inputs JSON document
    pub inputs: PathBuf,

    /// Directory holding the input datasets
    #[arg(long, default_value = "input")]
    pub input_dir: PathBuf,

    /// Output path
    #[arg(short, long, default_value = "runconfig.json")]
    pub output: PathBuf,
}
