use std::{fmt, io::stdout, num::NonZeroUsize};
use derivative::Derivative;
use serde::{Serialize, Deserialize};

use crate::{
    error::{OutbreakError, OutbreakResult},
    misc::{PrintAlternatives, print_spaces}
};

/// Right hand side of dy/dt = f(t, y)
pub trait OdeSystem<const N: usize>{
    fn derivative(&self, t: f64, y: &[f64; N]) -> [f64; N];
}

#[derive(Debug, Clone, Copy, Derivative, Serialize, Deserialize, PartialEq)]
#[derivative(Default)]
pub struct AdaptiveOpts{
    #[derivative(Default(value="1e-8"))]
    pub rel_tol: f64,
    #[derivative(Default(value="1e-10"))]
    pub abs_tol: f64,
    /// a step below this counts as divergence
    #[derivative(Default(value="1e-12"))]
    pub min_step: f64,
    #[derivative(Default(value="10_000_000"))]
    pub max_steps: usize
}

impl AdaptiveOpts{
    pub fn validate(&self) -> OutbreakResult<()>
    {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.rel_tol) || !positive(self.abs_tol) {
            return Err(OutbreakError::invalid(format!(
                "tolerances have to be positive, got rel {} abs {}", self.rel_tol, self.abs_tol
            )));
        }
        if !positive(self.min_step){
            return Err(OutbreakError::invalid(format!("min_step has to be positive, got {}", self.min_step)));
        }
        if self.max_steps == 0 {
            return Err(OutbreakError::invalid("max_steps has to be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum Method{
    Euler,
    #[default]
    RungeKutta4,
    /// Adaptive Dormand–Prince 5(4)
    DormandPrince(AdaptiveOpts)
}

impl Method{
    pub fn get_name(&self) -> &'static str
    {
        match self{
            Self::Euler => "Euler",
            Self::RungeKutta4 => "RK4",
            Self::DormandPrince(_) => "DP45"
        }
    }
}

impl PrintAlternatives for Method{
    fn print_alternatives(layer: u8) -> OutbreakResult<()> {
        let alternatives = [
            Method::Euler,
            Method::RungeKutta4,
            Method::DormandPrince(AdaptiveOpts::default())
        ];
        for (method, letter) in alternatives.iter().zip('a'..){
            print_spaces(layer);
            println!("{letter})");
            serde_json::to_writer_pretty(stdout(), method)?;
            println!();
        }
        Ok(())
    }
}

/// Values of the integrated system at the requested output times
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<const N: usize>{
    pub times: Vec<f64>,
    pub values: Vec<[f64; N]>,
    /// internal steps taken, including rejected adaptive steps
    pub steps: usize
}

impl<const N: usize> Solution<N>{
    fn with_capacity(cap: usize) -> Self
    {
        Self{
            times: Vec::with_capacity(cap),
            values: Vec::with_capacity(cap),
            steps: 0
        }
    }

    fn push(&mut self, t: f64, y: [f64; N])
    {
        self.times.push(t);
        self.values.push(y);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceReason{
    NonFinite,
    StepSizeUnderflow,
    StepLimit
}

impl fmt::Display for DivergenceReason{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self{
            Self::NonFinite => "state became non-finite",
            Self::StepSizeUnderflow => "step size fell below the minimum",
            Self::StepLimit => "step limit exceeded"
        };
        f.write_str(msg)
    }
}

/// Integration stopped at `time`. `partial` holds every output sample
/// reached before that, so its last entry is the last valid one
#[derive(Debug, Clone)]
pub struct Divergence<const N: usize>{
    pub time: f64,
    pub reason: DivergenceReason,
    pub partial: Solution<N>
}

fn is_finite<const N: usize>(y: &[f64; N]) -> bool
{
    y.iter().all(|v| v.is_finite())
}

/// y + h * sum(c_i * k_i)
#[inline]
fn combine<const N: usize>(y: &[f64; N], h: f64, terms: &[(f64, &[f64; N])]) -> [f64; N]
{
    std::array::from_fn(
        |i|
        {
            let slope: f64 = terms.iter()
                .map(|(c, k)| c * k[i])
                .sum();
            y[i] + h * slope
        }
    )
}

fn euler_step<S, const N: usize>(system: &S, t: f64, y: &[f64; N], h: f64) -> [f64; N]
where S: OdeSystem<N>
{
    let k1 = system.derivative(t, y);
    combine(y, h, &[(1.0, &k1)])
}

fn rk4_step<S, const N: usize>(system: &S, t: f64, y: &[f64; N], h: f64) -> [f64; N]
where S: OdeSystem<N>
{
    let half = 0.5 * h;
    let k1 = system.derivative(t, y);
    let k2 = system.derivative(t + half, &combine(y, half, &[(1.0, &k1)]));
    let k3 = system.derivative(t + half, &combine(y, half, &[(1.0, &k2)]));
    let k4 = system.derivative(t + h, &combine(y, h, &[(1.0, &k3)]));
    combine(
        y,
        h / 6.0,
        &[(1.0, &k1), (2.0, &k2), (2.0, &k3), (1.0, &k4)]
    )
}

/// Integrates `system` from `y0` at `times[0]` and records the state at every
/// entry of `times`, which has to be strictly increasing.
/// Fixed step methods take `substeps` equal steps between two output times.
pub fn integrate<S, const N: usize>(
    system: &S,
    y0: [f64; N],
    times: &[f64],
    method: Method,
    substeps: NonZeroUsize
) -> Result<Solution<N>, Divergence<N>>
where S: OdeSystem<N>
{
    debug_assert!(times.windows(2).all(|w| w[0] < w[1]));
    let mut solution = Solution::with_capacity(times.len());
    let Some(&t0) = times.first() else {
        return Ok(solution);
    };
    if !is_finite(&y0){
        return Err(Divergence{time: t0, reason: DivergenceReason::NonFinite, partial: solution});
    }
    solution.push(t0, y0);

    match method{
        Method::Euler => fixed_step(system, y0, times, substeps, solution, euler_step::<S, N>),
        Method::RungeKutta4 => fixed_step(system, y0, times, substeps, solution, rk4_step::<S, N>),
        Method::DormandPrince(opts) => dormand_prince(system, y0, times, &opts, solution)
    }
}

fn fixed_step<S, F, const N: usize>(
    system: &S,
    mut y: [f64; N],
    times: &[f64],
    substeps: NonZeroUsize,
    mut solution: Solution<N>,
    step: F
) -> Result<Solution<N>, Divergence<N>>
where S: OdeSystem<N>,
    F: Fn(&S, f64, &[f64; N], f64) -> [f64; N]
{
    let n = substeps.get();
    for w in times.windows(2){
        let (start, end) = (w[0], w[1]);
        let h = (end - start) / n as f64;
        for i in 0..n {
            let t = start + h * i as f64;
            y = step(system, t, &y, h);
            solution.steps += 1;
            if !is_finite(&y){
                return Err(Divergence{time: t + h, reason: DivergenceReason::NonFinite, partial: solution});
            }
        }
        solution.push(end, y);
    }
    Ok(solution)
}

// Dormand–Prince 5(4) tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// difference between 5th and embedded 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

struct DpStep<const N: usize>{
    y: [f64; N],
    /// scaled rms error, accept for <= 1
    err: f64
}

fn dp_step<S, const N: usize>(
    system: &S,
    t: f64,
    y: &[f64; N],
    h: f64,
    opts: &AdaptiveOpts
) -> DpStep<N>
where S: OdeSystem<N>
{
    let k1 = system.derivative(t, y);
    let k2 = system.derivative(t + C2 * h, &combine(y, h, &[(A21, &k1)]));
    let k3 = system.derivative(t + C3 * h, &combine(y, h, &[(A31, &k1), (A32, &k2)]));
    let k4 = system.derivative(
        t + C4 * h,
        &combine(y, h, &[(A41, &k1), (A42, &k2), (A43, &k3)])
    );
    let k5 = system.derivative(
        t + C5 * h,
        &combine(y, h, &[(A51, &k1), (A52, &k2), (A53, &k3), (A54, &k4)])
    );
    let k6 = system.derivative(
        t + h,
        &combine(y, h, &[(A61, &k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)])
    );
    let y_new = combine(y, h, &[(B1, &k1), (B3, &k3), (B4, &k4), (B5, &k5), (B6, &k6)]);
    let k7 = system.derivative(t + h, &y_new);

    let zero = [0.0; N];
    let err_vec = combine(
        &zero,
        h,
        &[(E1, &k1), (E3, &k3), (E4, &k4), (E5, &k5), (E6, &k6), (E7, &k7)]
    );
    let sum_sq: f64 = err_vec.iter()
        .zip(y.iter().zip(y_new.iter()))
        .map(
            |(e, (old, new))|
            {
                let scale = opts.abs_tol + opts.rel_tol * old.abs().max(new.abs());
                let r = e / scale;
                r * r
            }
        ).sum();
    let err = if N == 0 {
        0.0
    } else {
        (sum_sq / N as f64).sqrt()
    };
    DpStep{y: y_new, err}
}

fn dormand_prince<S, const N: usize>(
    system: &S,
    mut y: [f64; N],
    times: &[f64],
    opts: &AdaptiveOpts,
    mut solution: Solution<N>
) -> Result<Solution<N>, Divergence<N>>
where S: OdeSystem<N>
{
    let mut t = times[0];
    // initial guess, the controller adapts from there
    let mut h = times.windows(2)
        .map(|w| w[1] - w[0])
        .next()
        .map_or(0.0, |interval| (interval * 0.1).max(opts.min_step));
    // whether the latest rejection came from a non-finite trial state
    let mut non_finite = false;

    for &target in &times[1..]{
        while t < target {
            if solution.steps >= opts.max_steps {
                return Err(Divergence{time: t, reason: DivergenceReason::StepLimit, partial: solution});
            }
            if h < opts.min_step {
                let reason = if non_finite {
                    DivergenceReason::NonFinite
                } else {
                    DivergenceReason::StepSizeUnderflow
                };
                return Err(Divergence{time: t, reason, partial: solution});
            }
            let remaining = target - t;
            let hits_target = h >= remaining;
            let h_try = if hits_target { remaining } else { h };

            let step = dp_step(system, t, &y, h_try, opts);
            solution.steps += 1;

            if !step.err.is_finite() || !is_finite(&step.y){
                // retry smaller, once h drops below min_step this is reported as NonFinite
                non_finite = true;
                h = h_try * MIN_FACTOR;
                continue;
            }
            non_finite = false;

            let factor = if step.err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * step.err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if step.err <= 1.0 {
                y = step.y;
                t = if hits_target { target } else { t + h_try };
                // a shortened final step says nothing about the step size the controller wants
                if !hits_target {
                    h = h_try * factor;
                }
            } else {
                h = h_try * factor;
            }
        }
        solution.push(target, y);
    }
    Ok(solution)
}
