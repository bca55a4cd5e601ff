use std::env;

use anyhow::{Context, Result};

use qti_cli::config::{ConfigOverrides, ExportConfig};
use qti_cli::pipeline::{ExportRequest, inspect, load_all};
use qti_output::RunContext;

use crate::cli::{ExportArgs, InspectArgs};
use crate::summary::{print_export_summary, print_inspection};

pub fn run_export(args: &ExportArgs) -> Result<()> {
    let working_dir = env::current_dir().context("resolve working directory")?;
    let config = ExportConfig::discover(args.config.as_deref(), &working_dir)?.with_overrides(
        ConfigOverrides {
            site_url: args.site_url.clone(),
            language: args.language.clone(),
            archive_name: args.archive_name.clone(),
        },
    );
    let run = qti_cli::pipeline::run_export(&ExportRequest {
        inputs: &args.inputs,
        assets: &args.assets,
        output_dir: &args.output,
        config: &config,
    })?;
    print_export_summary(&run);
    Ok(())
}

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let questions = load_all(&args.inputs)?;
    let context = RunContext::new("inspect");
    let inspected = inspect(&questions, &context)?;
    print_inspection(&inspected);
    Ok(())
}
