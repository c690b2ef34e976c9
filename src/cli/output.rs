//! Build summary formatting
//!
//! The summary goes to stdout once every platform has been built. Engine output and
//! logs go elsewhere (inherited streams and stderr), so stdout stays parseable when
//! JSON is requested.

use anyhow::{Context, Result};
use std::fmt::Write;

use crate::pipeline::PipelineSummary;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// Human-readable formatted text
    Human,
}

/// Output formatter for build summaries
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_summary(&self, summary: &PipelineSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(summary)
                .context("Failed to serialize build summary to JSON"),
            OutputFormat::Human => Ok(self.format_human(summary)),
        }
    }

    fn format_human(&self, summary: &PipelineSummary) -> String {
        let mut out = String::new();

        if summary.builds.is_empty() {
            let _ = writeln!(out, "No platforms built for {}", summary.package);
            return out;
        }

        let _ = writeln!(
            out,
            "Built {} for {} platform(s) in {:.1}s",
            summary.package,
            summary.builds.len(),
            summary.total_time_ms as f64 / 1000.0
        );
        for build in &summary.builds {
            let _ = writeln!(
                out,
                "  {:<8} {} -> {}",
                build.platform,
                build.image,
                build.artifact.destination
            );
        }
        out
    }
}
