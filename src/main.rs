//! devicegate binary
//!
//! Loads the run configuration and suite manifest, filters the device list,
//! runs the selection pass and prints the resulting run plan.

use clap::Parser;
use devicegate::{
    cli::{Cli, Command, OutputFormat, generate_config_template},
    config::Config,
    error::AppError,
    metrics::Metrics,
    plan::RunPlanner,
    selection::SuiteManifest,
    telemetry,
};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (format, print_metrics) = match &cli.command {
        Some(Command::Config { output }) => {
            let template = generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(path, template)?;
                    eprintln!("Wrote configuration template to {}", path);
                }
                None => print!("{}", template),
            }
            return Ok(());
        }
        Some(Command::Plan { format, metrics }) => (*format, *metrics),
        None => (OutputFormat::Text, false),
    };

    // Load configuration, then apply command-line overrides
    let mut config = Config::from_file(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    // Initialize telemetry
    telemetry::init(&config.observability.log_level);

    // --suite is taken as given; a configured manifest sits next to its config
    let manifest_path = match &cli.suite {
        Some(path) => PathBuf::from(path),
        None => config.manifest_path(&cli.config),
    };
    let manifest = SuiteManifest::from_file(&manifest_path)?;
    let registry = manifest.to_registry();
    let devices = config.device_filter.filter().apply(&config.devices);
    let criteria = config.selection.criteria();

    tracing::info!(
        config = %cli.config,
        manifest = %manifest_path.display(),
        classes = manifest.class_count(),
        tests = registry.len(),
        devices = devices.len(),
        criteria = %criteria,
        "Planning test run"
    );

    let metrics = Arc::new(Metrics::new().map_err(AppError::from)?);
    let planner = RunPlanner::new(criteria, devices, config.capabilities.clone())
        .with_metrics(Arc::clone(&metrics));
    let plan = planner.plan(&registry);

    match format {
        OutputFormat::Text => print!("{}", plan.render_text()),
        OutputFormat::Json => println!("{}", plan.to_json()?),
    }

    if print_metrics {
        print!("{}", metrics.gather().map_err(AppError::from)?);
    }

    Ok(())
}
