use std::{num::NonZeroUsize, time::Instant};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    error::{OutbreakError, OutbreakResult},
    misc::SampleRangeF64
};
use super::{
    model::{Parameters, Populations, ZombieModel},
    numeric_integration::{integrate, Method},
    trajectory::Trajectory
};

/// Everything needed for one deterministic run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simulation{
    pub initial: Populations,
    pub params: Parameters,
    /// output times in days
    pub timeline: SampleRangeF64,
    pub substeps: NonZeroUsize,
    pub method: Method
}

impl Simulation{
    pub fn validate(&self) -> OutbreakResult<()>
    {
        self.initial.validate_initial()?;
        self.params.validate()?;
        self.timeline.validate()?;
        if let Method::DormandPrince(opts) = &self.method {
            opts.validate()?;
        }
        Ok(())
    }

    /// Validates, then integrates. On divergence the error carries
    /// every sample up to the last finite one
    pub fn run(&self) -> OutbreakResult<Trajectory>
    {
        self.validate()?;
        let times = self.timeline.get_iter().collect_vec();
        let model = ZombieModel{params: self.params};
        let start = Instant::now();

        match integrate(&model, self.initial.into(), &times, self.method, self.substeps){
            Ok(solution) => {
                debug!(
                    "{} took {} steps for {} samples in {}",
                    self.method.get_name(),
                    solution.steps,
                    solution.times.len(),
                    humantime::format_duration(start.elapsed())
                );
                Ok(solution.into())
            },
            Err(div) => {
                let partial = Trajectory::from(div.partial);
                debug_assert!(!partial.is_empty());
                debug_assert!(partial.samples().iter().all(|s| s.populations.is_finite()));
                let last = partial.last()
                    .map_or(f64::NAN, |s| s.time);
                warn!(
                    "integration diverged at t = {} ({}), last valid sample at t = {last}",
                    div.time,
                    div.reason
                );
                Err(OutbreakError::NumericalInstability{
                    time: div.time,
                    reason: div.reason.to_string(),
                    partial: Box::new(partial)
                })
            }
        }
    }
}

/// Logs the end state of a finished run
pub fn log_summary(title: &str, trajectory: &Trajectory)
{
    if let (Some(last), Some(peak)) = (trajectory.last(), trajectory.zombie_peak()){
        let p = &last.populations;
        info!(
            "{title}: day {} humans {:.2} zombies {:.2} deceased {:.2} (total {:.2}), zombie peak {:.2} at day {:.3}",
            last.time,
            p.humans,
            p.zombies,
            p.deceased,
            p.total(),
            peak.populations.zombies,
            peak.time
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::zombie_model::numeric_integration::{AdaptiveOpts, OdeSystem};

    fn outbreak(initial: Populations, params: Parameters) -> Simulation
    {
        Simulation{
            initial,
            params,
            timeline: SampleRangeF64{start: 0.0, end: 10.0, samples: 1000},
            substeps: NonZeroUsize::new(10).unwrap(),
            method: Method::RungeKutta4
        }
    }

    fn small_outbreak_params() -> Parameters
    {
        Parameters{
            birth_rate: 0.0,
            death: 0.0001,
            infection: 0.0095,
            resurrection: 0.0001,
            kill: 0.0001
        }
    }

    #[test]
    fn no_zombies_without_contact_or_resurrection()
    {
        let params = Parameters{resurrection: 0.0, birth_rate: 5.0, ..Default::default()};
        let sim = outbreak(Populations::new(1000.0, 0.0, 50.0), params);
        let trajectory = sim.run().unwrap();
        assert!(trajectory.samples().iter().all(|s| s.populations.zombies == 0.0));
    }

    #[test]
    fn no_dynamics_without_rates()
    {
        let params = Parameters{birth_rate: 0.0, death: 0.0, infection: 0.0, resurrection: 0.0, kill: 0.0};
        let initial = Populations::new(500.0, 20.0, 7.0);
        for method in [Method::Euler, Method::RungeKutta4, Method::DormandPrince(AdaptiveOpts::default())]{
            let sim = Simulation{method, ..outbreak(initial, params)};
            let trajectory = sim.run().unwrap();
            assert!(trajectory.samples().iter().all(|s| s.populations == initial));
        }
    }

    #[test]
    fn zombies_never_decrease_in_small_outbreak()
    {
        let sim = outbreak(Populations::new(500.0, 1.0, 0.0), small_outbreak_params());
        let trajectory = sim.run().unwrap();
        let zombies = trajectory.samples()
            .iter()
            .map(|s| s.populations.zombies)
            .collect_vec();
        assert!(zombies.iter().tuple_windows().all(|(a, b)| b >= a));
        // the infection actually took off
        assert!(*zombies.last().unwrap() > 400.0);
    }

    #[test]
    fn fixed_step_agrees_with_adaptive_reference()
    {
        let sim = outbreak(Populations::new(500.0, 1.0, 0.0), small_outbreak_params());
        let reference = Simulation{
            method: Method::DormandPrince(AdaptiveOpts{rel_tol: 1e-11, abs_tol: 1e-12, ..Default::default()}),
            ..sim
        };
        let approx = sim.run().unwrap();
        let reference = reference.run().unwrap();
        let model = ZombieModel{params: sim.params};
        for (a, r) in approx.samples().iter().zip(reference.samples()){
            assert_eq!(a.time, r.time);
            let (a, r) = (a.populations, r.populations);
            assert_relative_eq!(a.humans, r.humans, epsilon = 1e-6, max_relative = 1e-4);
            assert_relative_eq!(a.zombies, r.zombies, epsilon = 1e-6, max_relative = 1e-4);
            assert_relative_eq!(a.deceased, r.deceased, epsilon = 1e-6, max_relative = 1e-4);

            // dZ/dt along the solution matches the closed form
            let y: [f64; 3] = a.into();
            let [_, dz, _] = model.derivative(0.0, &y);
            let closed = (sim.params.infection - sim.params.kill) * a.humans * a.zombies
                + sim.params.resurrection * a.deceased;
            assert_relative_eq!(dz, closed, epsilon = 1e-9, max_relative = 1e-12);
        }
    }

    #[test]
    fn samples_span_the_requested_timeline()
    {
        let mut sim = outbreak(Populations::new(1000.0, 1.0, 0.0), Parameters::default());
        sim.timeline = SampleRangeF64{start: 2.5, end: 12.5, samples: 137};
        for method in [Method::Euler, Method::RungeKutta4, Method::DormandPrince(AdaptiveOpts::default())]{
            let trajectory = Simulation{method, ..sim}.run().unwrap();
            assert_eq!(trajectory.len(), 137);
            let times = trajectory.samples().iter().map(|s| s.time).collect_vec();
            assert_eq!(times[0], 2.5);
            assert_eq!(*times.last().unwrap(), 12.5);
            assert!(times.iter().tuple_windows().all(|(a, b)| a < b));
        }
    }

    #[test]
    fn invalid_input_is_rejected_before_integration()
    {
        let sim = outbreak(Populations::new(-1.0, 1.0, 0.0), Parameters::default());
        assert!(matches!(sim.run(), Err(OutbreakError::InvalidInput(_))));

        let params = Parameters{infection: 1.01, ..Default::default()};
        let sim = outbreak(Populations::new(100.0, 1.0, 0.0), params);
        assert!(matches!(sim.run(), Err(OutbreakError::InvalidInput(_))));

        let mut sim = outbreak(Populations::new(100.0, 1.0, 0.0), Parameters::default());
        sim.timeline.samples = 1;
        assert!(matches!(sim.run(), Err(OutbreakError::InvalidInput(_))));
    }

    #[test]
    fn runs_are_deterministic()
    {
        let params = Parameters{birth_rate: 30.0, ..Default::default()};
        let sim = outbreak(Populations::new(1000.0, 0.0, 20.0), params);
        assert_eq!(sim.run().unwrap(), sim.run().unwrap());
    }

    #[test]
    fn zero_populations_are_a_valid_flat_run()
    {
        let sim = outbreak(Populations::default(), Parameters::default());
        let trajectory = sim.run().unwrap();
        assert!(trajectory.samples().iter().all(|s| s.populations == Populations::default()));
    }

    #[test]
    fn divergence_surfaces_partial_trajectory()
    {
        let params = Parameters{birth_rate: f64::MAX, ..Default::default()};
        let sim = outbreak(Populations::new(1000.0, 1.0, 0.0), params);
        match sim.run(){
            Err(OutbreakError::NumericalInstability{time, partial, ..}) => {
                assert!(!partial.is_empty());
                assert!(partial.samples().iter().all(|s| s.populations.is_finite()));
                assert!(partial.last().unwrap().time < time);
                assert!(time < 10.0);
            },
            other => panic!("expected instability, got {other:?}")
        }
    }
}
