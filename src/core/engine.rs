//! Invocation of the external atmospheric-correction engine.
//!
//! The engine is a black box: we build its argument vector, run it to
//! completion, and report a non-zero exit as a hard failure. No retries.
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{info, warn};

use crate::core::params::EngineSettings;
use crate::core::workspace::StagedPaths;
use crate::error::{Error, Result};
use crate::types::{LineInterpolation, SensorTag};

/// Per-run values the engine receives alongside the static settings
#[derive(Debug, Clone)]
pub struct EngineJob {
    /// Working directory the engine writes `output/` and `config/` into
    pub workdir: PathBuf,
    pub wavelength_path: PathBuf,
    pub log_path: PathBuf,
    pub n_cores: usize,
    pub segmentation_size: usize,
}

/// A fully resolved engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables set on the child process only
    pub env: Vec<(String, PathBuf)>,
    pub log_path: PathBuf,
}

fn path_arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn flag(name: &str, value: impl std::fmt::Display) -> String {
    format!("--{}={}", name, value)
}

pub fn build_command(
    staged: &StagedPaths,
    sensor: &SensorTag,
    job: &EngineJob,
    settings: &EngineSettings,
) -> EngineCommand {
    let mut args = vec![
        path_arg(&settings.script),
        path_arg(&staged.radiance.binary),
        path_arg(&staged.location.binary),
        path_arg(&staged.observation.binary),
        path_arg(&job.workdir),
        sensor.to_string(),
        flag("presolve", settings.presolve as u8),
    ];

    let (analytical, empirical) = match settings.line_interpolation {
        LineInterpolation::Empirical => (0, 1),
        LineInterpolation::Analytical => (1, 0),
    };
    args.push(flag("analytical_line", analytical));
    args.push(flag("empirical_line", empirical));

    if sensor.uses_emulator() {
        args.push(flag("emulator_base", settings.emulator_base.display()));
    }

    let surface = match (sensor, &settings.emit_surface_path) {
        (SensorTag::Emit, Some(p)) => p,
        _ => &settings.surface_path,
    };
    args.push(flag("n_cores", job.n_cores));
    args.push(flag("wavelength_path", job.wavelength_path.display()));
    args.push(flag("surface_path", surface.display()));
    args.push(flag("segmentation_size", job.segmentation_size));
    args.push(flag("log_file", job.log_path.display()));

    if sensor.uses_channelized_uncertainty() {
        args.push(flag(
            "channelized_uncertainty_path",
            settings.channelized_uncertainty_path.display(),
        ));
    }

    let env = settings
        .sixs_dir
        .iter()
        .map(|dir| ("SIXS_DIR".to_string(), dir.clone()))
        .collect();

    EngineCommand {
        program: settings.interpreter.clone(),
        args,
        env,
        log_path: job.log_path.clone(),
    }
}

impl EngineCommand {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Run the engine and block until it exits. Non-zero exit is an error.
pub fn invoke(command: &EngineCommand) -> Result<ExitStatus> {
    info!("Running correction engine: {}", command.display());
    let status = command
        .to_command()
        .status()
        .map_err(|source| Error::EngineSpawn {
            program: command.program.clone(),
            source,
        })?;
    if !status.success() {
        warn!("Correction engine exited with {}", status);
        return Err(Error::EngineFailed {
            status: status.to_string(),
            log: command.log_path.clone(),
        });
    }
    info!("Correction engine finished ({})", status);
    Ok(status)
}

/// Seam between the pipeline and the engine process
pub trait EngineRunner {
    fn run(&self, command: &EngineCommand) -> Result<()>;
}

/// Runs the engine as a blocking child process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl EngineRunner for ProcessRunner {
    fn run(&self, command: &EngineCommand) -> Result<()> {
        invoke(command).map(|_| ())
    }
}
