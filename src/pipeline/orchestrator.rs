use super::error::PipelineError;
use super::step::{instance_name, Step};
use crate::artifact::{locate, ArtifactLocation};
use crate::config::BuildConfig;
use crate::engine::{CommandRunner, ContainerEngine, Invocation};
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::template::DescriptorTemplate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Outcome of one platform iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformBuild {
    pub platform: String,
    pub image: String,
    pub instance: String,
    pub descriptor: PathBuf,
    pub artifact: ArtifactLocation,
}

/// Outcome of a full run, platforms in build order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub package: String,
    pub builds: Vec<PlatformBuild>,
    pub total_time_ms: u64,
}

/// Drives render, persist, build, launch, extract and teardown for each platform in turn
pub struct PipelineOrchestrator<R> {
    runner: R,
    engine: ContainerEngine,
    progress_handler: Arc<dyn ProgressHandler>,
}

impl<R: CommandRunner> PipelineOrchestrator<R> {
    pub fn new(runner: R, engine: ContainerEngine) -> Self {
        Self {
            runner,
            engine,
            progress_handler: Arc::new(LoggingHandler),
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = handler;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Builds every configured platform, stopping at the first failure.
    ///
    /// `config.current_platform` is rebound before each render and left at the
    /// last platform attempted.
    pub async fn execute(
        &self,
        config: &mut BuildConfig,
        template: &DescriptorTemplate,
    ) -> Result<PipelineSummary, PipelineError> {
        let start = Instant::now();
        let platforms = config.platforms.clone();
        let total = platforms.len();

        if platforms.is_empty() {
            warn!(package = %config.package, "No build platforms configured; nothing to do");
        }

        self.emit(ProgressEvent::Started {
            package: config.package.clone(),
            platforms: total,
        });

        let mut builds = Vec::with_capacity(total);
        for (index, platform) in platforms.into_iter().enumerate() {
            self.emit(ProgressEvent::PlatformStarted {
                platform: platform.clone(),
                index,
                total,
            });

            let platform_start = Instant::now();
            config.current_platform = platform.clone();

            match self.build_platform(config, template).await {
                Ok(build) => {
                    self.emit(ProgressEvent::PlatformComplete {
                        platform,
                        index,
                        total,
                        duration: platform_start.elapsed(),
                    });
                    builds.push(build);
                }
                Err(e) => {
                    self.emit(ProgressEvent::Failed {
                        platform,
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        let total_time = start.elapsed();
        self.emit(ProgressEvent::Completed {
            platforms: builds.len(),
            total_time,
        });

        Ok(PipelineSummary {
            package: config.package.clone(),
            builds,
            total_time_ms: total_time.as_millis() as u64,
        })
    }

    async fn build_platform(
        &self,
        config: &BuildConfig,
        template: &DescriptorTemplate,
    ) -> Result<PlatformBuild, PipelineError> {
        let platform = config.current_platform.as_str();

        let started = self.begin(platform, Step::Render);
        let descriptor = template.render(config)?;
        self.finish(platform, Step::Render, started);

        let started = self.begin(platform, Step::Persist);
        let descriptor_path = config.descriptor_path();
        write_descriptor(&descriptor_path, &descriptor).await?;
        self.finish(platform, Step::Persist, started);

        let image = ContainerEngine::image_tag(&config.package, platform);
        let started = self.begin(platform, Step::Build);
        let build = self
            .engine
            .build(&image, &config.package_dir(), config.disable_cache);
        self.run_step(platform, Step::Build, &build).await?;
        self.finish(platform, Step::Build, started);

        let instance = instance_name(&config.package);
        debug!(platform, instance = %instance, "Assigned instance name");

        let artifact = match self.launch_and_extract(config, &image, &instance).await {
            Ok(artifact) => artifact,
            Err(e) => {
                if e.step().has_instance() {
                    self.teardown_after_failure(config, &instance).await;
                }
                return Err(e);
            }
        };

        let started = self.begin(platform, Step::Teardown);
        self.run_step(platform, Step::Teardown, &self.engine.stop(&instance))
            .await?;
        if config.remove_instances {
            self.run_step(platform, Step::Teardown, &self.engine.remove(&instance))
                .await?;
        }
        self.finish(platform, Step::Teardown, started);

        Ok(PlatformBuild {
            platform: platform.to_string(),
            image,
            instance,
            descriptor: descriptor_path,
            artifact,
        })
    }

    async fn launch_and_extract(
        &self,
        config: &BuildConfig,
        image: &str,
        instance: &str,
    ) -> Result<ArtifactLocation, PipelineError> {
        let platform = config.current_platform.as_str();

        let started = self.begin(platform, Step::Launch);
        self.run_step(platform, Step::Launch, &self.engine.run(instance, image))
            .await?;
        self.finish(platform, Step::Launch, started);

        let started = self.begin(platform, Step::Extract);
        let artifact = locate(
            &config.package,
            &config.version,
            &config.revision,
            platform,
            instance,
            &config.base_dir,
        );
        let destination = artifact.destination_dir().to_path_buf();
        if let Err(source) = tokio::fs::create_dir_all(&destination).await {
            return Err(PipelineError::CreateDir {
                path: destination,
                source,
            });
        }
        let copy = self.engine.copy(&artifact.source, &artifact.destination);
        self.run_step(platform, Step::Extract, &copy).await?;
        self.finish(platform, Step::Extract, started);

        info!(
            platform,
            artifact = %artifact.source,
            destination = %artifact.destination,
            "Artifact extracted"
        );
        Ok(artifact)
    }

    /// Stops (and optionally removes) an instance left behind by a failed step.
    /// Failures here are only reported as progress events.
    async fn teardown_after_failure(&self, config: &BuildConfig, instance: &str) {
        let platform = config.current_platform.as_str();
        warn!(platform, instance, "Tearing down instance after failure");

        let mut cleanup = vec![self.engine.stop(instance)];
        if config.remove_instances {
            cleanup.push(self.engine.remove(instance));
        }

        for invocation in cleanup {
            if let Err(e) = self.runner.run(&invocation).await {
                self.emit(ProgressEvent::TeardownFailed {
                    platform: platform.to_string(),
                    instance: instance.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    async fn run_step(
        &self,
        platform: &str,
        step: Step,
        invocation: &Invocation,
    ) -> Result<(), PipelineError> {
        self.runner
            .run(invocation)
            .await
            .map_err(|source| PipelineError::Step {
                platform: platform.to_string(),
                step,
                source,
            })
    }

    fn begin(&self, platform: &str, step: Step) -> Instant {
        self.emit(ProgressEvent::StepStarted {
            platform: platform.to_string(),
            step,
        });
        Instant::now()
    }

    fn finish(&self, platform: &str, step: Step, started: Instant) {
        self.emit(ProgressEvent::StepComplete {
            platform: platform.to_string(),
            step,
            duration: started.elapsed(),
        });
    }

    fn emit(&self, event: ProgressEvent) {
        self.progress_handler.on_progress(&event);
    }
}

/// Writes the rendered descriptor, replacing the previous platform's.
async fn write_descriptor(path: &Path, contents: &str) -> Result<(), PipelineError> {
    let persist_error = |source: std::io::Error| PipelineError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o640);

    let mut file = options.open(path).await.map_err(persist_error)?;
    file.write_all(contents.as_bytes())
        .await
        .map_err(persist_error)?;
    file.flush().await.map_err(persist_error)?;
    debug!(path = %path.display(), bytes = contents.len(), "Descriptor written");
    Ok(())
}
