#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]

// Core modules
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

// Re-export commonly used types
pub use data::{FetchClient, FetchError, SeriesData};
pub use domain::{Candle, MarketHistory, ProjectionPoint, TimeWindow, Timeframe};
pub use engine::{ChartEngine, SeriesId, ViewRequest};

use std::str::FromStr;

use anyhow::{Context, bail};
// CLI argument parsing
use clap::Parser;
use itertools::Itertools;
use strum::IntoEnumIterator;

use crate::utils::time_utils::date_string_to_epoch_ms;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Primary market ticker to chart
    #[arg(long, default_value = "KXSENATE-26-R")]
    pub ticker: String,

    /// Explicit provider series key (derived from the ticker when omitted)
    #[arg(long)]
    pub series_key: Option<String>,

    /// Event ticker; enables the weighted seat projection overlay
    #[arg(long)]
    pub event: Option<String>,

    /// Timeframe: 1d, 7d, 30d, all, or custom (with --from/--to)
    #[arg(long, default_value = "7d")]
    pub timeframe: String,

    /// Custom range start, YYYY-MM-DD (requires --to and --timeframe custom)
    #[arg(long)]
    pub from: Option<String>,

    /// Custom range end, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<String>,

    /// Macro series id; enables the macro overlay (e.g. DGS10)
    #[arg(long)]
    pub macro_series: Option<String>,

    /// Enable the approval-poll overlay
    #[arg(long, default_value_t = false)]
    pub approval: bool,

    /// Enable the headline ticker
    #[arg(long, default_value_t = false)]
    pub headlines: bool,
}

impl Cli {
    /// Turn the parsed arguments into the engine's initial view.
    pub fn view_request(&self) -> anyhow::Result<ViewRequest> {
        let timeframe = Timeframe::from_str(&self.timeframe).with_context(|| {
            format!(
                "unknown timeframe '{}' (expected one of: {})",
                self.timeframe,
                Timeframe::iter().map(|tf| tf.to_string()).join(", ")
            )
        })?;

        let custom_range = match (&self.from, &self.to) {
            (Some(from), Some(to)) => {
                let start_ms = date_string_to_epoch_ms(from)
                    .with_context(|| format!("cannot parse --from date '{}'", from))?;
                let end_ms = date_string_to_epoch_ms(to)
                    .with_context(|| format!("cannot parse --to date '{}'", to))?;
                if end_ms < start_ms {
                    bail!("--to must not be before --from");
                }
                Some(TimeWindow { start_ms, end_ms })
            }
            (None, None) => None,
            _ => bail!("--from and --to must be given together"),
        };
        if timeframe == Timeframe::Custom && custom_range.is_none() {
            bail!("--timeframe custom requires --from and --to");
        }

        Ok(ViewRequest {
            market_ticker: self.ticker.trim().to_ascii_uppercase(),
            series_key: self.series_key.clone(),
            event_ticker: self.event.clone(),
            macro_series_id: self.macro_series.clone().unwrap_or_default(),
            timeframe,
            custom_range,
            seat_projection_enabled: self.event.is_some(),
            approval_enabled: self.approval,
            macro_enabled: self.macro_series.is_some(),
            headlines_enabled: self.headlines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_timeframe_requires_both_bounds() {
        let cli = Cli::parse_from(["race-scope", "--timeframe", "custom"]);
        assert!(cli.view_request().is_err());

        let cli = Cli::parse_from([
            "race-scope",
            "--timeframe",
            "custom",
            "--from",
            "2024-06-01",
            "--to",
            "2024-11-05",
        ]);
        let view = cli.view_request().unwrap();
        assert_eq!(view.timeframe, Timeframe::Custom);
        assert!(view.custom_range.is_some());
    }

    #[test]
    fn event_flag_enables_the_projection() {
        let cli = Cli::parse_from(["race-scope", "--event", "KXSEATS-26"]);
        let view = cli.view_request().unwrap();
        assert!(view.seat_projection_enabled);
        assert_eq!(view.event_ticker.as_deref(), Some("KXSEATS-26"));
    }

    #[test]
    fn reversed_custom_range_is_rejected() {
        let cli = Cli::parse_from([
            "race-scope",
            "--timeframe",
            "custom",
            "--from",
            "2024-11-05",
            "--to",
            "2024-06-01",
        ]);
        assert!(cli.view_request().is_err());
    }
}
