//! Fetch one full chart snapshot and write it to disk as pretty JSON, for
//! inspecting exactly what the presentation layer would be handed.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::runtime::Runtime;

use race_scope::engine::{ChartEngine, SeriesId};
use race_scope::{Cli, SeriesData};

const OUTPUT_PATH: &str = "chart_snapshot.json";
const DRIVE_DEADLINE: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct SeriesDump {
    is_fetching: bool,
    error: Option<String>,
    data: Option<SeriesData>,
}

#[derive(Serialize)]
struct ChartSnapshot {
    market_ticker: String,
    timeframe: String,
    price: SeriesDump,
    seat_projection: Option<SeriesDump>,
    approval: Option<SeriesDump>,
    macro_series: Option<SeriesDump>,
    headlines: Option<SeriesDump>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Cli::parse();
    let view = args.view_request()?;

    let rt = Runtime::new().expect("Failed to create Tokio runtime");
    let mut engine = ChartEngine::new(rt.handle().clone(), view);
    engine.refresh_all();

    let started = Instant::now();
    while engine.update() {
        if started.elapsed() > DRIVE_DEADLINE {
            log::warn!(
                "Dumping with {} fetch(es) still unresolved",
                engine.active_fetch_count()
            );
            break;
        }
        std::thread::sleep(Duration::from_millis(25));
    }

    let snapshot = build_snapshot(&engine);
    let output_path = PathBuf::from(OUTPUT_PATH);
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(&output_path, json)
        .with_context(|| format!("Failed to write snapshot to {:?}", output_path))?;

    println!(
        "✅ Chart snapshot written to {:?} ({} candles in the primary series).",
        output_path,
        snapshot
            .price
            .data
            .as_ref()
            .map(|d| d.len())
            .unwrap_or(0)
    );
    Ok(())
}

fn dump_series(engine: &ChartEngine, id: &SeriesId) -> SeriesDump {
    let (is_fetching, error) = engine.get_series_status(id);
    SeriesDump {
        is_fetching,
        error,
        data: engine.get_series(id).map(|arc| arc.as_ref().clone()),
    }
}

fn build_snapshot(engine: &ChartEngine) -> ChartSnapshot {
    let view = engine.view();
    ChartSnapshot {
        market_ticker: view.market_ticker.clone(),
        timeframe: view.timeframe.to_string(),
        price: dump_series(engine, &SeriesId::Price),
        seat_projection: view
            .seat_projection_enabled
            .then(|| dump_series(engine, &SeriesId::SeatProjection)),
        approval: view
            .approval_enabled
            .then(|| dump_series(engine, &SeriesId::Approval)),
        macro_series: view
            .macro_enabled
            .then(|| dump_series(engine, &SeriesId::Macro)),
        headlines: view
            .headlines_enabled
            .then(|| dump_series(engine, &SeriesId::Headlines)),
    }
}
