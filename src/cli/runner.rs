use tracing::info;
use tracing_subscriber::EnvFilter;

use rflpack::api::{PipelineOptions, generate_runconfig, run_pipeline};
use rflpack::core::engine::ProcessRunner;
use rflpack::core::params::RunConfig;

use super::args::{CliArgs, Command, RunArgs, RunconfigArgs};
use super::errors::AppError;

fn init_logging(debug: bool) -> Result<(), AppError> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

/// Load the run configuration and fold CLI overrides into its engine settings
fn load_config(args: &RunArgs) -> Result<RunConfig, AppError> {
    if !args.runconfig.is_file() {
        return Err(AppError::MissingRunconfig {
            path: args.runconfig.clone(),
        });
    }
    let mut config = RunConfig::from_path(&args.runconfig)?;

    let engine = &mut config.engine;
    if let Some(p) = &args.interpreter {
        engine.interpreter = p.clone();
    }
    if let Some(p) = &args.engine_script {
        engine.script = p.clone();
    }
    if let Some(p) = &args.emulator_base {
        engine.emulator_base = p.clone();
    }
    if let Some(p) = &args.surface_path {
        engine.surface_path = p.clone();
    }
    if let Some(p) = &args.sixs_dir {
        engine.sixs_dir = Some(p.clone());
    }
    if let Some(mode) = args.line_interpolation {
        engine.line_interpolation = mode;
    }
    if let Some(n) = args.n_cores {
        if n == 0 {
            return Err(AppError::ZeroCores { n_cores: n });
        }
        config.inputs.n_cores = n;
    }
    Ok(config)
}

fn run_command(args: RunArgs) -> Result<(), AppError> {
    let config = load_config(&args)?;
    let options = PipelineOptions {
        work_dir: args.work_dir,
        output_dir: args.output_dir,
        browse_format: args.browse_format,
    };
    info!("Work directory: {:?}", options.work_dir);
    info!("Output directory: {:?}", options.output_dir);

    let report = run_pipeline(&config, &args.runconfig, &options, &ProcessRunner)?;
    info!(
        "Successfully packaged {} ({} items) -> {:?}",
        report.basename,
        report.item_ids.len(),
        report.catalog_path
    );
    Ok(())
}

fn runconfig_command(args: RunconfigArgs) -> Result<(), AppError> {
    let path = generate_runconfig(&args.inputs, &args.input_dir, &args.output)?;
    info!("Run configuration written to {:?}", path);
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log)?;

    match args.command {
        Command::Run(run_args) => run_command(run_args)?,
        Command::Runconfig(rc_args) => runconfig_command(rc_args)?,
    }
    Ok(())
}
