use std::num::NonZeroUsize;
use camino::Utf8PathBuf;
use derivative::Derivative;
use serde::{Serialize, Deserialize};

use crate::{
    error::{OutbreakError, OutbreakResult},
    misc::{file_stem_from_title, SampleRangeF64, VERSION}
};
use super::{
    model::{Parameters, Populations},
    numeric_integration::Method,
    simulation::Simulation
};

#[derive(Debug, Clone, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct ScenarioOpts{
    #[derivative(Default(value="\"Zombie Apocalypse\".to_owned()"))]
    pub title: String,

    /// S0, initial number of humans
    #[derivative(Default(value="1000.0"))]
    pub humans: f64,
    /// Z0 = zombie_fraction * S0
    pub zombie_fraction: Option<f64>,
    /// R0 = deceased_fraction * S0
    pub deceased_fraction: Option<f64>,

    /// new humans per day, none means no births
    pub birth_rate: Option<f64>,
    #[derivative(Default(value="0.0077"))]
    pub death: f64,
    #[derivative(Default(value="0.0095"))]
    pub infection: f64,
    #[derivative(Default(value="0.0005"))]
    pub resurrection: f64,
    #[derivative(Default(value="0.005"))]
    pub kill: f64,

    #[derivative(Default(value="10.0"))]
    pub days: f64,
    #[derivative(Default(value="1000"))]
    pub samples: usize,
    #[derivative(Default(value="NonZeroUsize::new(10).unwrap()"))]
    pub substeps: NonZeroUsize,
    pub method: Method,

    #[derivative(Default(value="true"))]
    pub plot: bool,
    /// stem of the output files, derived from the parameters if missing
    pub out: Option<Utf8PathBuf>
}

impl ScenarioOpts{
    pub fn parameters(&self) -> Parameters
    {
        Parameters{
            birth_rate: self.birth_rate.unwrap_or(0.0),
            death: self.death,
            infection: self.infection,
            resurrection: self.resurrection,
            kill: self.kill
        }
    }

    pub fn initial_populations(&self) -> OutbreakResult<Populations>
    {
        let fraction_of_humans = |name: &str, fraction: Option<f64>| {
            match fraction{
                None => Ok(0.0),
                Some(f) if f.is_finite() && f >= 0.0 => Ok(f * self.humans),
                Some(f) => Err(OutbreakError::invalid(format!(
                    "{name} fraction has to be finite and non-negative, got {f}"
                )))
            }
        };
        Ok(Populations{
            humans: self.humans,
            zombies: fraction_of_humans("zombie", self.zombie_fraction)?,
            deceased: fraction_of_humans("deceased", self.deceased_fraction)?
        })
    }

    pub fn simulation(&self) -> OutbreakResult<Simulation>
    {
        let sim = Simulation{
            initial: self.initial_populations()?,
            params: self.parameters(),
            timeline: SampleRangeF64{start: 0.0, end: self.days, samples: self.samples},
            substeps: self.substeps,
            method: self.method
        };
        sim.validate()?;
        Ok(sim)
    }

    pub fn get_name(&self) -> String
    {
        let zc = self.zombie_fraction.unwrap_or(0.0);
        let rc = self.deceased_fraction.unwrap_or(0.0);
        format!(
            "v{VERSION}_S{}_Zc{zc}_Rc{rc}_{}_days{}_{}",
            self.humans,
            self.parameters().get_name(),
            self.days,
            self.method.get_name()
        )
    }

    pub fn out_stem(&self) -> Utf8PathBuf
    {
        self.out
            .clone()
            .unwrap_or_else(|| self.get_name().into())
    }
}

/// The three scenarios of the classic zombie apocalypse write up
pub fn builtin_scenarios() -> Vec<ScenarioOpts>
{
    let base = ScenarioOpts::default();

    let no_births = ScenarioOpts{
        title: "Zombie Apocalypse - No initial population deceased - no new births".to_owned(),
        ..base.clone()
    };

    let rc = 0.015;
    let deceased = ScenarioOpts{
        title: format!(
            "Zombie Apocalypse - {}% of initial population deceased - no new births",
            rc * 100.0
        ),
        deceased_fraction: Some(rc),
        ..base.clone()
    };

    let rc = 0.02;
    let births = 30.0;
    let deceased_and_births = ScenarioOpts{
        title: format!(
            "Zombie Apocalypse - {}% of initial population deceased - {births} new daily births",
            rc * 100.0
        ),
        deceased_fraction: Some(rc),
        birth_rate: Some(births),
        ..base
    };

    [no_births, deceased, deceased_and_births]
        .into_iter()
        .map(
            |mut scenario|
            {
                scenario.out = Some(file_stem_from_title(&scenario.title).into());
                scenario
            }
        ).collect()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScanParameter{
    BirthRate,
    Death,
    #[default]
    Infection,
    Resurrection,
    Kill
}

impl ScanParameter{
    pub fn name(&self) -> &'static str
    {
        match self{
            Self::BirthRate => "birth_rate",
            Self::Death => "death",
            Self::Infection => "infection",
            Self::Resurrection => "resurrection",
            Self::Kill => "kill"
        }
    }

    pub fn set(&self, params: &mut Parameters, value: f64)
    {
        let field = match self{
            Self::BirthRate => &mut params.birth_rate,
            Self::Death => &mut params.death,
            Self::Infection => &mut params.infection,
            Self::Resurrection => &mut params.resurrection,
            Self::Kill => &mut params.kill
        };
        *field = value;
    }
}

#[derive(Debug, Clone, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct ScanOpts{
    pub scenario: ScenarioOpts,
    pub parameter: ScanParameter,
    #[derivative(Default(value="SampleRangeF64{start: 0.0, end: 0.02, samples: 41}"))]
    pub values: SampleRangeF64,
    pub threads: Option<NonZeroUsize>,
    #[derivative(Default(value="true"))]
    pub plot: bool,
    pub out: Option<Utf8PathBuf>
}

impl ScanOpts{
    /// One simulation per scanned value, all validated up front
    pub fn simulations(&self) -> OutbreakResult<Vec<(f64, Simulation)>>
    {
        self.values.validate()?;
        let base = self.scenario.simulation()?;
        self.values
            .get_iter()
            .map(
                |value|
                {
                    let mut sim = base;
                    self.parameter.set(&mut sim.params, value);
                    sim.validate()?;
                    Ok((value, sim))
                }
            ).collect()
    }

    pub fn get_name(&self) -> String
    {
        format!(
            "v{VERSION}_scan_{}_{}-{}_n{}_{}",
            self.parameter.name(),
            self.values.start,
            self.values.end,
            self.values.samples,
            self.scenario.parameters().get_name()
        )
    }

    pub fn out_stem(&self) -> Utf8PathBuf
    {
        self.out
            .clone()
            .unwrap_or_else(|| self.get_name().into())
    }
}
