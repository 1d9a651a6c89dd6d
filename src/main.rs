use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tokio::runtime::Runtime;

use race_scope::engine::{ChartEngine, SeriesId};
use race_scope::utils::time_utils::epoch_ms_to_date_string;
use race_scope::{Cli, SeriesData};

/// Give every in-flight fetch (with its one retry) time to resolve before
/// we stop waiting on a wedged transport.
const DRIVE_DEADLINE: Duration = Duration::from_secs(60);

fn main() -> Result<()> {
    // A. Init Logging
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {:?}", panic_info);
    }));
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // B. Parse Args
    let args = Cli::parse();
    let view = args.view_request()?;
    log::info!(
        "Charting {} over {} (event: {:?})",
        view.market_ticker,
        view.timeframe,
        view.event_ticker
    );

    // C. Run the engine until every series settles
    let rt = Runtime::new().expect("Failed to create Tokio runtime");
    let mut engine = ChartEngine::new(rt.handle().clone(), view);
    engine.refresh_all();
    drive_to_idle(&mut engine);

    // D. Present the snapshot (text stand-in for the chart adapter)
    render_snapshot(&engine);
    Ok(())
}

/// Pump the engine's update loop until no fetch is in flight.
fn drive_to_idle(engine: &mut ChartEngine) {
    let started = Instant::now();
    loop {
        let busy = engine.update();
        if !busy {
            return;
        }
        if started.elapsed() > DRIVE_DEADLINE {
            log::warn!(
                "Giving up on {} fetch(es) still in flight",
                engine.active_fetch_count()
            );
            return;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

fn render_snapshot(engine: &ChartEngine) {
    let view = engine.view();
    println!("=== {} [{}] ===", view.market_ticker, view.timeframe);

    render_series(engine, &SeriesId::Price, "price");
    if view.seat_projection_enabled {
        render_series(engine, &SeriesId::SeatProjection, "seat projection");
    }
    if view.approval_enabled {
        render_series(engine, &SeriesId::Approval, "approval");
    }
    if view.macro_enabled {
        render_series(engine, &SeriesId::Macro, &view.macro_series_id);
    }

    if let Some(bounds) = engine.primary_bounds() {
        println!(
            "visible range: {} .. {}",
            epoch_ms_to_date_string(bounds.start_ms),
            epoch_ms_to_date_string(bounds.end_ms)
        );
    }

    if view.headlines_enabled {
        if let Some(data) = engine.get_series(&SeriesId::Headlines) {
            if let SeriesData::Headlines(headlines) = data.as_ref() {
                for headline in headlines.iter().take(5) {
                    println!("* {}", headline.title);
                }
            }
        }
    }
}

fn render_series(engine: &ChartEngine, id: &SeriesId, label: &str) {
    let (is_fetching, last_error) = engine.get_series_status(id);
    if is_fetching {
        println!("{:>16}: still loading", label);
        return;
    }
    if let Some(error) = last_error {
        println!("{:>16}: error - {}", label, error);
        return;
    }
    match engine.get_series(id) {
        None => println!("{:>16}: not fetched", label),
        Some(data) if data.is_empty() => {
            println!("{:>16}: no data in this range", label)
        }
        Some(data) => match data.as_ref() {
            SeriesData::Candles(history) => {
                let last = history.last_close().unwrap_or_default();
                println!(
                    "{:>16}: {} candles, last close {:.2}",
                    label,
                    history.candles.len(),
                    last
                );
            }
            SeriesData::Points(points) => {
                let last = points.last().map(|p| p.value).unwrap_or_default();
                println!("{:>16}: {} points, latest {:.2}", label, points.len(), last);
            }
            SeriesData::Headlines(headlines) => {
                println!("{:>16}: {} headlines", label, headlines.len())
            }
        },
    }
}
