use crate::config::ConfigResolver;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Templated multi-platform RPM builds driven through a container engine
#[derive(Parser, Debug)]
#[command(
    name = "rpmbox",
    about = "Templated multi-platform RPM builds driven through a container engine",
    version,
    author,
    long_about = "rpmbox renders <package>/Dockerfile.in once per build platform, builds \
                  the image with the container engine, runs it, and copies the resulting \
                  RPM into pkg/<package>/<platform>/. Platforms are built one after another \
                  and the first failure stops the run."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build RPMs for every configured platform",
        long_about = "Renders the descriptor, builds the image, runs an instance and copies \
                      the RPM out, for each platform in turn.\n\n\
                      Examples:\n  \
                      rpmbox build -p collectd -v 5.4.1\n  \
                      rpmbox build -p collectd -v 5.4.1 -r 2 -b el6 -b el7\n  \
                      BUILDOS=el6,el7 rpmbox build -p collectd -v 5.4.1 --disable-cache"
    )]
    Build(BuildArgs),

    #[command(
        about = "Render the descriptor for one platform without building",
        long_about = "Renders the package template for a single platform and prints it, \
                      or writes it to a file. The container engine is not invoked.\n\n\
                      Examples:\n  \
                      rpmbox render -p collectd -v 5.4.1 --platform el7\n  \
                      rpmbox render -p collectd -v 5.4.1 --platform el6 -o /tmp/Dockerfile"
    )]
    Render(RenderArgs),
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct PackageArgs {
    #[arg(
        short = 'p',
        long,
        env = "PACKAGE",
        help = "Package to build, relative to the base directory"
    )]
    pub package: Option<String>,

    #[arg(
        short = 't',
        long,
        env = "TEMPLATE",
        value_name = "FILE",
        help = "Template to render (default: <base-dir>/<package>/Dockerfile.in)"
    )]
    pub template: Option<PathBuf>,

    #[arg(
        short = 'v',
        long = "pkg-version",
        env = "VERSION",
        value_name = "VERSION",
        help = "Package version"
    )]
    pub pkg_version: Option<String>,

    #[arg(short = 'r', long, env = "REV", help = "Package revision [default: 0]")]
    pub rev: Option<String>,

    #[arg(
        long,
        env = "RPMBOX_BASE_DIR",
        value_name = "DIR",
        help = "Directory holding package directories and pkg/ (default: directory of the invoked binary; symlinks are not followed)"
    )]
    pub base_dir: Option<PathBuf>,
}

impl PackageArgs {
    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver {
            package: self.package.clone(),
            template: self.template.clone(),
            version: self.pkg_version.clone(),
            revision: self.rev.clone(),
            base_dir: self.base_dir.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub package: PackageArgs,

    #[arg(
        short = 'd',
        long,
        env = "DOCKER_BIN",
        value_name = "PATH",
        help = "Path to the container engine binary (default: docker on $PATH)"
    )]
    pub engine_bin: Option<PathBuf>,

    #[arg(
        short = 'b',
        long,
        env = "BUILDOS",
        value_delimiter = ',',
        value_name = "PLATFORM",
        help = "Platform to build; repeat or comma-separate for several [default: el5,el6,el7]"
    )]
    pub build_platforms: Vec<String>,

    #[arg(
        short = 'c',
        long,
        env = "DISABLE_CACHE",
        value_parser = clap::builder::BoolishValueParser::new(),
        help = "Disable layer caching for image builds (DISABLE_CACHE accepts 1/0, t/f, true/false, yes/no)"
    )]
    pub disable_cache: bool,

    #[arg(
        long,
        env = "RPMBOX_TIMEOUT",
        value_name = "SECONDS",
        help = "Abort any single engine command running longer than this"
    )]
    pub timeout: Option<u64>,

    #[arg(long, help = "Remove each instance after stopping it")]
    pub remove_instances: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Summary output format"
    )]
    pub format: OutputFormatArg,
}

impl BuildArgs {
    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver {
            engine: self.engine_bin.clone(),
            platforms: if self.build_platforms.is_empty() {
                None
            } else {
                Some(self.build_platforms.clone())
            },
            disable_cache: self.disable_cache,
            timeout: self.timeout.map(Duration::from_secs),
            remove_instances: self.remove_instances,
            ..self.package.resolver()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub package: PackageArgs,

    #[arg(long, value_name = "PLATFORM", help = "Platform to render for")]
    pub platform: String,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the descriptor to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
