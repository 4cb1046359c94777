use std::io::Write;
use camino::{Utf8Path, Utf8PathBuf};
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use rayon::prelude::*;

use crate::{
    error::{OutbreakError, OutbreakResult},
    misc::*
};
use super::{
    opts::*,
    simulation::log_summary,
    trajectory::{Sample, Trajectory, TRAJECTORY_HEADER}
};

const SCAN_HEADER: [&str; 7] = [
    "value",
    "humans",
    "zombies",
    "deceased",
    "peak_zombies",
    "peak_day",
    "diverged"
];

/// Runs one scenario and writes `{stem}.dat`, plus the plot if requested.
/// A diverged run still writes the samples it reached before failing
pub fn exec_scenario(opts: &ScenarioOpts, plot: bool) -> OutbreakResult<Utf8PathBuf>
{
    let sim = opts.simulation()?;
    info!("running '{}'", opts.title);
    let (trajectory, failure) = match sim.run(){
        Ok(t) => (t, None),
        Err(OutbreakError::NumericalInstability{time, reason, partial}) => {
            let t = (*partial).clone();
            (t, Some(OutbreakError::NumericalInstability{time, reason, partial}))
        },
        Err(e) => return Err(e)
    };

    let stem = opts.out_stem();
    let dat = with_suffix(&stem, "dat");
    let mut buf = create_data_buf(&dat, opts, TRAJECTORY_HEADER)?;
    trajectory.write_columns(&mut buf)?;
    buf.flush()?;
    drop(buf);
    info!("wrote {} samples to {dat}", trajectory.len());

    if let Some(e) = failure{
        return Err(e);
    }
    log_summary(&opts.title, &trajectory);

    if plot && opts.plot {
        plot_trajectory(&opts.title, &stem, &dat)?;
    }
    Ok(dat)
}

fn plot_trajectory(title: &str, stem: &Utf8Path, dat: &Utf8Path) -> OutbreakResult<()>
{
    let curves = [
        Curve{using: "1:2", title: "Humans"},
        Curve{using: "1:3", title: "Zombies"},
        Curve{using: "1:4", title: "Deceased"}
    ];
    let plot = GnuplotLines{
        title,
        xlabel: "Days from outbreak",
        ylabel: "Population",
        data: dat,
        curves: &curves
    };
    if let Some(png) = plot.render(stem)? {
        info!("plotted {png}");
    }
    Ok(())
}

/// Runs the built-in scenarios, writing into `out_dir` if given
pub fn exec_demo(plot: bool, out_dir: Option<&Utf8Path>) -> OutbreakResult<Vec<Utf8PathBuf>>
{
    let mut scenarios = builtin_scenarios();
    if let Some(dir) = out_dir {
        for scenario in scenarios.iter_mut(){
            scenario.out = Some(dir.join(scenario.out_stem()));
        }
    }
    exec_scenarios(&scenarios, plot)
}

/// A failing scenario does not stop the others
fn exec_scenarios(scenarios: &[ScenarioOpts], plot: bool) -> OutbreakResult<Vec<Utf8PathBuf>>
{
    let mut written = Vec::with_capacity(scenarios.len());
    let mut first = None;
    let mut failed = 0;
    for scenario in scenarios{
        match exec_scenario(scenario, plot){
            Ok(dat) => written.push(dat),
            Err(e) => {
                warn!("scenario '{}' failed: {e}", scenario.title);
                failed += 1;
                first.get_or_insert(e);
            }
        }
    }
    match first{
        None => Ok(written),
        Some(first) => Err(OutbreakError::ScenariosFailed{failed, first: Box::new(first)})
    }
}

struct ScanRow{
    value: f64,
    last: Sample,
    peak: Sample,
    diverged: bool
}

fn scan_row(value: f64, trajectory: &Trajectory, diverged: bool) -> Option<ScanRow>
{
    Some(ScanRow{
        value,
        last: *trajectory.last()?,
        peak: *trajectory.zombie_peak()?,
        diverged
    })
}

/// Sweeps one parameter. Every run is independent, so they are spread over
/// the rayon pool
pub fn exec_scan(opts: &ScanOpts, plot: bool) -> OutbreakResult<Utf8PathBuf>
{
    let simulations = opts.simulations()?;
    info!(
        "scanning {} over {} values",
        opts.parameter.name(),
        simulations.len()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.threads.map_or(0, |t| t.get()))
        .build()?;

    let bar = indication_bar(simulations.len() as u64);
    bar.set_message(opts.parameter.name());

    let rows: Vec<Option<ScanRow>> = pool.install(
        ||
        {
            simulations
                .par_iter()
                .progress_with(bar.clone())
                .map(
                    |(value, sim)|
                    {
                        match sim.run(){
                            Ok(t) => scan_row(*value, &t, false),
                            Err(OutbreakError::NumericalInstability{partial, ..}) => {
                                scan_row(*value, &partial, true)
                            },
                            Err(e) => {
                                warn!("{} = {value}: {e}", opts.parameter.name());
                                None
                            }
                        }
                    }
                ).collect()
        }
    );
    bar.finish_and_clear();

    let stem = opts.out_stem();
    let dat = with_suffix(&stem, "dat");
    let mut buf = create_data_buf(&dat, opts, SCAN_HEADER)?;
    let mut diverged = 0_usize;
    for row in rows.iter().flatten(){
        let p = &row.last.populations;
        diverged += usize::from(row.diverged);
        writeln!(
            buf,
            "{} {} {} {} {} {} {}",
            row.value,
            p.humans,
            p.zombies,
            p.deceased,
            row.peak.populations.zombies,
            row.peak.time,
            u8::from(row.diverged)
        )?;
    }
    buf.flush()?;
    drop(buf);
    if diverged > 0 {
        warn!("{diverged} run(s) diverged, their rows hold the last valid sample");
    }
    info!("wrote {dat}");

    if plot && opts.plot {
        let curves = [
            Curve{using: "1:2", title: "Humans"},
            Curve{using: "1:3", title: "Zombies"},
            Curve{using: "1:4", title: "Deceased"},
            Curve{using: "1:5", title: "Zombie peak"}
        ];
        let title = format!("{} - final populations", opts.scenario.title);
        let plot = GnuplotLines{
            title: &title,
            xlabel: opts.parameter.name(),
            ylabel: "Population",
            data: &dat,
            curves: &curves
        };
        if let Some(png) = plot.render(&stem)? {
            info!("plotted {png}");
        }
    }
    Ok(dat)
}
