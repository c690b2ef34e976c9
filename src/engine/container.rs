//! Argument construction for the container engine CLI

use super::runner::Invocation;
use std::path::{Path, PathBuf};

/// Builds `build`, `run`, `cp`, `stop` and `rm` invocations for one engine binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEngine {
    binary: PathBuf,
}

impl ContainerEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// `<package>:build_<platform>`
    pub fn image_tag(package: &str, platform: &str) -> String {
        format!("{}:build_{}", package, platform)
    }

    /// `build -t <tag> [--no-cache=true] .`, run from `context_dir`
    pub fn build(&self, tag: &str, context_dir: &Path, no_cache: bool) -> Invocation {
        let mut args = vec!["build", "-t", tag];
        if no_cache {
            args.push("--no-cache=true");
        }
        args.push(".");
        Invocation::new(&self.binary, args).in_dir(context_dir)
    }

    /// `run --name <instance> <tag>`
    pub fn run(&self, instance: &str, tag: &str) -> Invocation {
        Invocation::new(&self.binary, ["run", "--name", instance, tag])
    }

    /// `cp <source> <destination>`
    pub fn copy(&self, source: &str, destination: &str) -> Invocation {
        Invocation::new(&self.binary, ["cp", source, destination])
    }

    /// `stop <instance>`
    pub fn stop(&self, instance: &str) -> Invocation {
        Invocation::new(&self.binary, ["stop", instance])
    }

    /// `rm <instance>`
    pub fn remove(&self, instance: &str) -> Invocation {
        Invocation::new(&self.binary, ["rm", instance])
    }
}
