pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{BuildArgs, CliArgs, Commands, OutputFormatArg, PackageArgs, RenderArgs};
pub use output::{OutputFormat, OutputFormatter};
