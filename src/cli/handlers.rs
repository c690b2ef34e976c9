use super::commands::{BuildArgs, RenderArgs};
use super::output::OutputFormatter;
use crate::config::DEFAULT_ENGINE;
use crate::engine::{ContainerEngine, SystemRunner};
use crate::pipeline::{PipelineOrchestrator, PipelineSummary};
use crate::template::DescriptorTemplate;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, error, info};

pub async fn handle_build(args: &BuildArgs) -> i32 {
    let summary = match run_build(args).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 1;
        }
    };

    match OutputFormatter::new(args.format.into()).format_summary(&summary) {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}

async fn run_build(args: &BuildArgs) -> Result<PipelineSummary> {
    let mut config = args.resolver().resolve()?;
    config.check_package_dir()?;

    info!(
        package = %config.package,
        version = %config.version,
        revision = %config.revision,
        platforms = ?config.platforms,
        "Resolved build configuration"
    );
    debug!("Configuration: {:?}", config);

    let template = DescriptorTemplate::load(&config.template_path)?;

    let package = config.package.clone();
    let runner = SystemRunner::new().with_timeout(config.timeout);
    let orchestrator = PipelineOrchestrator::new(runner, ContainerEngine::new(&config.engine_path));
    let summary = orchestrator
        .execute(&mut config, &template)
        .await
        .with_context(|| format!("Build of {} aborted", package))?;

    Ok(summary)
}

pub async fn handle_render(args: &RenderArgs) -> i32 {
    match run_render(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_render(args: &RenderArgs) -> Result<()> {
    let mut resolver = args.package.resolver();
    // Rendering never runs the engine, so skip the $PATH lookup.
    resolver.engine = Some(PathBuf::from(DEFAULT_ENGINE));

    let mut config = resolver.resolve()?;
    config.current_platform = args.platform.clone();

    let template = DescriptorTemplate::load(&config.template_path)?;
    let descriptor = template.render(&config)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &descriptor)
                .await
                .with_context(|| format!("Failed to write descriptor to {}", path.display()))?;
            info!(path = %path.display(), platform = %config.current_platform, "Descriptor written");
        }
        None => print!("{}", descriptor),
    }
    Ok(())
}
