//! `ocv simulate`: a synthetic pack flown through the estimator.
//!
//! Offline runs advance a manual clock and finish instantly; `--realtime`
//! paces each tick against the monotonic clock and stops on Ctrl-C.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use ocv_config::VoltageUnit;
use ocv_host::{PackModel, SimulatedPack, ThrottleProfile};
use ocv_traits::clock::test_clock::ManualClock;
use ocv_traits::{Clock, MonotonicClock, Telemetry};

use crate::report::{Tally, estimate_line, summary};
use crate::session::{self, HostEstimator};

const DEFAULT_MODEL: &str = "Sim_Pack";

pub struct SimulateArgs<'a> {
    pub seconds: u64,
    pub realtime: bool,
    pub profile: Option<&'a str>,
    pub period_ms: u64,
    pub model: Option<&'a str>,
    pub store: Option<&'a Path>,
    pub every: usize,
    pub json: bool,
}

fn unit_scale(unit: VoltageUnit) -> f32 {
    match unit {
        VoltageUnit::Volts => 1.0,
        VoltageUnit::Centivolts => 100.0,
        VoltageUnit::Millivolts => 1_000.0,
    }
}

pub fn run_simulate(
    cfg: &ocv_config::Config,
    args: &SimulateArgs<'_>,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<()> {
    if args.period_ms == 0 {
        eyre::bail!("--period-ms must be >= 1");
    }
    let profile = match args.profile {
        Some(p) => p
            .parse::<ThrottleProfile>()
            .wrap_err("parse --profile")?,
        None => ThrottleProfile::default_flight(),
    };
    let model = PackModel {
        cells: cfg.pack.cells,
        unit_scale: unit_scale(cfg.pack.voltage_unit),
        ..PackModel::default()
    };
    let name = session::model_name(cfg, args.model).unwrap_or(DEFAULT_MODEL);
    let mut pack = SimulatedPack::new(model, profile).with_name(name);

    let store = session::open_store(cfg, args.store);
    let mut est = session::build(cfg, store, pack.model_name().as_deref())
        .wrap_err("build estimator")?;

    tracing::info!(
        seconds = args.seconds,
        period_ms = args.period_ms,
        realtime = args.realtime,
        "simulation start"
    );
    let tally = if args.realtime {
        drive(&MonotonicClock::new(), &mut pack, &mut est, args, shutdown)
    } else {
        drive(&ManualClock::new(), &mut pack, &mut est, args, shutdown)
    };

    if shutdown.load(Ordering::Relaxed) {
        tracing::info!(t_ms = tally.last_t_ms, "simulation interrupted");
    }
    tracing::info!(
        ticks = tally.ticks,
        soc = pack.soc(),
        rest_cell_v = pack.rest_cell_v(),
        "simulation complete"
    );
    println!("{}", summary(&est, &tally, args.json));
    Ok(())
}

fn drive<C: Clock>(
    clock: &C,
    pack: &mut SimulatedPack,
    est: &mut HostEstimator,
    args: &SimulateArgs<'_>,
    shutdown: &AtomicBool,
) -> Tally {
    let end_ms = args.seconds.saturating_mul(1_000);
    let mut tally = Tally::default();
    let mut last_ms = clock.now_ms();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let now = clock.now_ms();
        if now >= end_ms {
            break;
        }
        pack.step(now.saturating_sub(last_ms));
        last_ms = now;

        let status = est.poll(pack, now);
        tally.record(now, &status);
        if let Some(e) = status.estimate()
            && tally.due(args.every)
        {
            println!("{}", estimate_line(now, e, est.phase_kind(), args.json));
        }

        let next = now.saturating_add(args.period_ms);
        clock.sleep(Duration::from_millis(next.saturating_sub(clock.now_ms())));
    }
    tally
}
