//! Final run report and the console rendering of it.

use chrono::{DateTime, Local};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

use crate::config::{Config, ReportFormat};
use crate::driver::Counts;
use crate::error::LoadError;

const RULE_WIDTH: usize = 50;

/// Why the measurement window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Termination {
    /// The configured duration elapsed
    Elapsed,
    /// A stop signal arrived first
    Interrupted,
    /// Every worker spent its attempt budget first
    Exhausted,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: String,
    pub workers: usize,
    pub duration_secs: u64,
    pub started_at: DateTime<Local>,
    /// Window RPS is computed over
    pub window_ms: u64,
    #[serde(flatten)]
    pub counts: Counts,
    pub requests_per_second: f64,
    pub termination: Termination,
    /// Workers aborted after missing the grace period
    pub stragglers: usize,
}

/// Successes per second over `window`. Zero for an empty window.
pub fn requests_per_second(success_count: u64, window: Duration) -> f64 {
    let secs = window.as_secs_f64();
    if secs > 0.0 {
        success_count as f64 / secs
    } else {
        0.0
    }
}

impl RunReport {
    pub fn new(
        config: &Config,
        started_at: DateTime<Local>,
        window: Duration,
        counts: Counts,
        termination: Termination,
        stragglers: usize,
    ) -> Self {
        Self {
            target: config.target.url.clone(),
            workers: config.load.workers,
            duration_secs: config.load.duration_secs,
            started_at,
            window_ms: window.as_millis() as u64,
            counts,
            requests_per_second: requests_per_second(counts.success_count, window),
            termination,
            stragglers,
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, LoadError> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    pub fn render_text(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        let _ = writeln!(out, "\n{rule}");
        let _ = writeln!(out, "📊 RESULTS");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "✅ Successful requests : {}",
            self.counts.success_count.to_formatted_string(&Locale::en)
        );
        let _ = writeln!(out, "❌ Failed requests     : {}", self.counts.fail_count);
        let _ = writeln!(
            out,
            "⚡ RPS (requests/sec)  : {}",
            format_rate(self.requests_per_second)
        );
        if self.counts.transport_faults > 0 {
            let _ = writeln!(
                out,
                "🔌 Transport faults    : {} ({} reconnects)",
                self.counts.transport_faults, self.counts.reconnects
            );
        }
        if self.termination != Termination::Elapsed {
            let _ = writeln!(
                out,
                "⏹️  Stopped early       : {} after {:.2}s",
                self.termination,
                self.window_ms as f64 / 1000.0
            );
        }
        if self.stragglers > 0 {
            let _ = writeln!(out, "⚠️  Aborted workers     : {}", self.stragglers);
        }
        let _ = write!(out, "{rule}");
        out
    }
}

/// Start-of-run banner.
pub fn banner(config: &Config) -> String {
    format!(
        "\n🚀 STRESS TEST STARTING: {}\n🧵 Workers  : {}\n⏱️  Duration : {} seconds\n{}\nRunning... please wait...",
        config.target.url,
        config.load.workers,
        config.load.duration_secs,
        "-".repeat(RULE_WIDTH)
    )
}

/// Two decimals, integer part grouped as in `1,234.50`
fn format_rate(rate: f64) -> String {
    let cents = (rate * 100.0).round() as u64;
    format!(
        "{}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}
