//! Build configuration for rpmbox
//!
//! A [`BuildConfig`] is resolved once per process from command-line options and
//! environment variables, then handed to the pipeline. The only field that changes
//! afterwards is `current_platform`, which the orchestrator rebinds before each
//! render.
//!
//! # Defaults
//!
//! - `template`: `<base_dir>/<package>/Dockerfile.in`
//! - `revision`: `"0"`
//! - `engine`: `docker` looked up on `$PATH`
//! - `platforms`: `el5`, `el6`, `el7`
//! - `base_dir`: the directory holding the running executable
//!
//! # Example
//!
//! ```
//! use rpmbox::config::BuildConfig;
//!
//! let config = BuildConfig::builder("demo", "1.0")
//!     .revision("1")
//!     .platforms(["el7"])
//!     .engine_path("/usr/bin/docker")
//!     .base_dir("/srv/rpmbox")
//!     .build();
//!
//! assert_eq!(config.template_path.to_str(), Some("/srv/rpmbox/demo/Dockerfile.in"));
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Engine binary searched on `$PATH` when none is given
pub const DEFAULT_ENGINE: &str = "docker";

/// Revision used when none is given
pub const DEFAULT_REVISION: &str = "0";

/// Platforms built when none are given
pub const DEFAULT_PLATFORMS: [&str; 3] = ["el5", "el6", "el7"];

/// Template file name inside the package directory
pub const TEMPLATE_FILE: &str = "Dockerfile.in";

/// Rendered descriptor file name inside the package directory
pub const DESCRIPTOR_FILE: &str = "Dockerfile";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No package specified. Use -p/--package or set PACKAGE")]
    MissingPackage,

    #[error("Please specify a version to build. Use -v/--pkg-version or set VERSION")]
    MissingVersion,

    #[error(
        "Couldn't find {binary} in $PATH; use -d/--engine-bin to specify the path to the engine binary"
    )]
    EngineNotFound {
        binary: String,
        #[source]
        source: which::Error,
    },

    #[error("Unable to determine the directory of the running executable")]
    BaseDirUnavailable(#[source] std::io::Error),

    #[error("Package directory {} does not exist", .0.display())]
    PackageDirMissing(PathBuf),
}

/// Resolved configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Package subdirectory and artifact name prefix
    pub package: String,

    /// Template source path
    pub template_path: PathBuf,

    /// Artifact version component, used verbatim
    pub version: String,

    /// Artifact revision component, used verbatim
    pub revision: String,

    /// Container engine executable
    pub engine_path: PathBuf,

    /// Build order; duplicates are rebuilt
    pub platforms: Vec<String>,

    /// Pass `--no-cache=true` to image builds
    pub disable_cache: bool,

    /// Platform bound into the template for the iteration in progress
    pub current_platform: String,

    /// Root for the package directory and the `pkg/` output tree
    pub base_dir: PathBuf,

    /// Upper bound on each engine invocation; `None` waits forever
    pub timeout: Option<Duration>,

    /// Remove instances after stopping them
    pub remove_instances: bool,
}

impl BuildConfig {
    /// Starts a configuration for `package` at `version` with every other field defaulted.
    ///
    /// The base directory defaults to the current directory here; command-line
    /// resolution goes through [`ConfigResolver`] instead.
    pub fn builder(package: impl Into<String>, version: impl Into<String>) -> BuildConfigBuilder {
        BuildConfigBuilder {
            package: package.into(),
            version: version.into(),
            revision: None,
            template_path: None,
            engine_path: None,
            platforms: None,
            disable_cache: false,
            base_dir: None,
            timeout: None,
            remove_instances: false,
        }
    }

    /// `<base_dir>/<package>`, where the descriptor is written and built from
    pub fn package_dir(&self) -> PathBuf {
        self.base_dir.join(&self.package)
    }

    /// `<base_dir>/<package>/Dockerfile`
    pub fn descriptor_path(&self) -> PathBuf {
        self.package_dir().join(DESCRIPTOR_FILE)
    }

    /// Fails unless the package directory exists, since the descriptor is written there.
    pub fn check_package_dir(&self) -> Result<(), ConfigError> {
        let dir = self.package_dir();
        if dir.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::PackageDirMissing(dir))
        }
    }
}

/// Builder returned by [`BuildConfig::builder`]
#[derive(Debug, Clone)]
pub struct BuildConfigBuilder {
    package: String,
    version: String,
    revision: Option<String>,
    template_path: Option<PathBuf>,
    engine_path: Option<PathBuf>,
    platforms: Option<Vec<String>>,
    disable_cache: bool,
    base_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    remove_instances: bool,
}

impl BuildConfigBuilder {
    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_path = Some(path.into());
        self
    }

    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = Some(platforms.into_iter().map(Into::into).collect());
        self
    }

    pub fn disable_cache(mut self, disable_cache: bool) -> Self {
        self.disable_cache = disable_cache;
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn remove_instances(mut self, remove: bool) -> Self {
        self.remove_instances = remove;
        self
    }

    pub fn build(self) -> BuildConfig {
        let base_dir = self.base_dir.unwrap_or_else(|| PathBuf::from("."));
        let template_path = self
            .template_path
            .unwrap_or_else(|| default_template_path(&base_dir, &self.package));

        BuildConfig {
            template_path,
            engine_path: self
                .engine_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE)),
            revision: self
                .revision
                .unwrap_or_else(|| DEFAULT_REVISION.to_string()),
            platforms: self
                .platforms
                .unwrap_or_else(|| DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect()),
            package: self.package,
            version: self.version,
            disable_cache: self.disable_cache,
            current_platform: String::new(),
            base_dir,
            timeout: self.timeout,
            remove_instances: self.remove_instances,
        }
    }
}

/// `<base_dir>/<package>/Dockerfile.in`
pub fn default_template_path(base_dir: &Path, package: &str) -> PathBuf {
    base_dir.join(package).join(TEMPLATE_FILE)
}

/// Raw, possibly incomplete option values as they arrive from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    pub package: Option<String>,
    pub template: Option<PathBuf>,
    pub version: Option<String>,
    pub revision: Option<String>,
    pub engine: Option<PathBuf>,
    /// `None` selects the default platforms; blank entries are dropped
    pub platforms: Option<Vec<String>>,
    pub disable_cache: bool,
    pub base_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub remove_instances: bool,
}

impl ConfigResolver {
    /// Fills in defaults and validates required values.
    pub fn resolve(self) -> Result<BuildConfig, ConfigError> {
        let package = non_empty(self.package).ok_or(ConfigError::MissingPackage)?;
        let version = non_empty(self.version).ok_or(ConfigError::MissingVersion)?;

        let base_dir = match self.base_dir {
            Some(dir) => dir,
            None => binary_dir()?,
        };

        let engine_path = match self.engine {
            Some(path) => path,
            None => find_engine(DEFAULT_ENGINE)?,
        };

        let mut builder = BuildConfig::builder(package, version)
            .engine_path(engine_path)
            .disable_cache(self.disable_cache)
            .base_dir(base_dir)
            .timeout(self.timeout)
            .remove_instances(self.remove_instances);

        if let Some(revision) = non_empty(self.revision) {
            builder = builder.revision(revision);
        }
        if let Some(template) = self.template {
            builder = builder.template_path(template);
        }
        if let Some(platforms) = self.platforms {
            builder = builder.platforms(
                platforms
                    .into_iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty()),
            );
        }

        Ok(builder.build())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Absolute directory the program was invoked from, as named by `argv[0]`
///
/// Symlinks are not followed, so a linked install finds its packages next to the
/// link. A bare program name is looked up on `$PATH`; when `argv[0]` is missing
/// or unusable the resolved executable path is used instead.
pub fn binary_dir() -> Result<PathBuf, ConfigError> {
    let invoked = env::args_os()
        .next()
        .filter(|argv0| !argv0.is_empty())
        .and_then(|argv0| invoked_path(Path::new(&argv0)));
    let exe = match invoked {
        Some(path) => path,
        None => env::current_exe().map_err(ConfigError::BaseDirUnavailable)?,
    };
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        ConfigError::BaseDirUnavailable(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} has no parent directory", exe.display()),
        ))
    })
}

fn invoked_path(argv0: &Path) -> Option<PathBuf> {
    let located = if argv0.components().count() > 1 {
        argv0.to_path_buf()
    } else {
        which::which(argv0).ok()?
    };
    std::path::absolute(located).ok()
}

/// Looks `binary` up on `$PATH` and returns its absolute path.
pub fn find_engine(binary: &str) -> Result<PathBuf, ConfigError> {
    let found = which::which(binary).map_err(|source| ConfigError::EngineNotFound {
        binary: binary.to_string(),
        source,
    })?;
    Ok(std::path::absolute(&found).unwrap_or(found))
}
