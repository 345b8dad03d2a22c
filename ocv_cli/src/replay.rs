//! `ocv replay`: feed a recorded trace through the estimator, one row per tick.

use std::path::Path;

use eyre::WrapErr;

use crate::report::{Tally, estimate_line, summary};
use crate::session;
use crate::trace::load_trace_csv;

pub struct ReplayArgs<'a> {
    pub trace: &'a Path,
    pub model: Option<&'a str>,
    pub store: Option<&'a Path>,
    pub every: usize,
    pub json: bool,
}

pub fn run_replay(cfg: &ocv_config::Config, args: &ReplayArgs<'_>) -> eyre::Result<()> {
    let rows = load_trace_csv(args.trace, &cfg.sensors.voltage, &cfg.sensors.throttle)?;
    if rows.is_empty() {
        eyre::bail!("trace {:?} has no rows", args.trace);
    }
    tracing::info!(rows = rows.len(), trace = %args.trace.display(), "replay start");

    let store = session::open_store(cfg, args.store);
    let mut est = session::build(cfg, store, session::model_name(cfg, args.model))
        .wrap_err("build estimator")?;

    let mut tally = Tally::default();
    for row in rows {
        let status = est.tick(row.into());
        tally.record(row.time_ms, &status);
        if let Some(e) = status.estimate()
            && tally.due(args.every)
        {
            println!("{}", estimate_line(row.time_ms, e, est.phase_kind(), args.json));
        }
    }

    tracing::info!(
        ticks = tally.ticks,
        estimated = tally.estimated,
        skipped = tally.skipped,
        "replay complete"
    );
    println!("{}", summary(&est, &tally, args.json));
    Ok(())
}
