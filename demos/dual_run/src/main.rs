//! dual_run: adaptive vs fixed-cycle signal control on the in-process engine.
//!
//! ```text
//! dual_run [SCENARIO.json] [--grid ROWSxCOLS] [--out DIR]
//! ```
//!
//! Without a scenario file the defaults are used (5400 ticks, 1000
//! vehicles, seed 42).  `RUST_LOG=info` shows injections and progress.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::info;

use tsc_control::OccupancyModel;
use tsc_orchestrator::{OrchestratorHandle, RunOutcome, ScenarioConfig};
use tsc_output::{CsvWriter, RunOutputObserver, write_comparison_json};
use tsc_session::MemoryNetwork;

// ── Constants ─────────────────────────────────────────────────────────────────

const DEFAULT_OUT: &str = "output";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ── Arguments ─────────────────────────────────────────────────────────────────

struct Args {
    scenario: Option<PathBuf>,
    grid:     Option<(usize, usize)>,
    out:      PathBuf,
}

fn parse_grid(text: &str) -> Result<(usize, usize)> {
    let (r, c) = text.split_once('x').with_context(|| format!("grid `{text}` is not ROWSxCOLS"))?;
    let dims = (r.parse()?, c.parse()?);
    if dims.0 == 0 || dims.1 == 0 {
        bail!("grid dimensions must be positive");
    }
    Ok(dims)
}

fn parse_args() -> Result<Args> {
    let mut args = Args { scenario: None, grid: None, out: PathBuf::from(DEFAULT_OUT) };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--grid" => args.grid = Some(parse_grid(&it.next().context("--grid needs a value")?)?),
            "--out" => args.out = PathBuf::from(it.next().context("--out needs a value")?),
            _ if args.scenario.is_none() => args.scenario = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument `{arg}`"),
        }
    }
    Ok(args)
}

fn load_scenario(path: Option<&PathBuf>) -> Result<ScenarioConfig> {
    let Some(path) = path else {
        return Ok(ScenarioConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let scenario = load_scenario(args.scenario.as_ref())?;
    let network = match args.grid {
        Some((rows, cols)) => MemoryNetwork::grid(rows, cols),
        None => MemoryNetwork::four_way(),
    };

    println!("=== dual_run: {} ===", scenario.scenario);
    println!(
        "Ticks: {}  |  Vehicles: {}  |  Seed: {}  |  Intersections: {}",
        scenario.run.max_steps,
        scenario.run.vehicle_count,
        scenario.run.seed,
        network.intersection_ids().count()
    );
    println!();

    let writer = CsvWriter::new(&args.out)?;
    let observer = RunOutputObserver::new(writer).with_report(args.out.join("report.json"));

    let mut handle = OrchestratorHandle::new(network, Arc::new(OccupancyModel::default()));
    handle.initialize(scenario)?;
    handle.start_with(observer)?;

    // Live view: drain snapshots while the worker runs.
    while handle.is_running() {
        thread::sleep(POLL_INTERVAL);
        if let Some(last) = handle.drain_snapshots().pop() {
            let status = handle.status();
            info!(
                "live {}/{}: adaptive queue {} | fixed queue {}",
                status.current_step,
                status.max_steps,
                last.adaptive.as_ref().map_or(0, |m| m.queue_length),
                last.fixed.as_ref().map_or(0, |m| m.queue_length),
            );
        }
    }

    // Write errors surface in the log when the run ends.
    let report = handle.wait()?.cloned().context("run produced no report")?;
    println!("Outcome: {:?} after {} ticks ({} ms)", report.outcome, report.ticks, report.elapsed_ms);
    println!("Emergency injections at: {:?}", report.injected.iter().map(|t| t.0).collect::<Vec<_>>());

    for (label, result) in [("adaptive", &report.results.adaptive), ("fixed", &report.results.fixed)] {
        if let Some(r) = result {
            println!(
                "  {label:<9} mean wait {:>9.1}  peak wait {:>9.1}  mean queue {:>6.2}  peak queue {:>4}  throughput {:>6}",
                r.mean_waiting_time, r.peak_waiting_time, r.mean_queue_length, r.peak_queue_length, r.total_throughput
            );
        }
    }

    if let Some(comparison) = report.comparison() {
        let i = comparison.improvement;
        println!();
        println!("Waiting time reduction: {:>7.2} %", i.waiting_time_reduction);
        println!("Queue length reduction: {:>7.2} %", i.queue_length_reduction);
        println!("Throughput increase:    {:>7.2} %", i.throughput_increase);
        write_comparison_json(&args.out.join("comparison.json"), &comparison)?;
    }
    println!();
    println!("Output written to {}", args.out.display());

    if let RunOutcome::Failed(reason) = report.outcome {
        bail!("run failed: {reason}");
    }
    Ok(())
}
