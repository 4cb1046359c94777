use serde::{Serialize, Deserialize};
use derivative::Derivative;

use crate::error::{OutbreakError, OutbreakResult};
use super::numeric_integration::OdeSystem;

/// Rates of the outbreak, see Munz et al. 2009. Time unit is days
#[derive(Debug, Clone, Copy, Derivative, Serialize, Deserialize, PartialEq)]
#[derivative(Default)]
pub struct Parameters{
    /// P, new humans per day
    #[derivative(Default(value="0.0"))]
    pub birth_rate: f64,
    /// d, natural death of humans
    #[derivative(Default(value="0.0077"))]
    pub death: f64,
    /// B, human becomes a zombie on contact
    #[derivative(Default(value="0.0095"))]
    pub infection: f64,
    /// G, deceased rises as a zombie
    #[derivative(Default(value="0.0005"))]
    pub resurrection: f64,
    /// A, human kills the zombie on contact
    #[derivative(Default(value="0.005"))]
    pub kill: f64
}

impl Parameters{
    pub fn validate(&self) -> OutbreakResult<()>
    {
        if !self.birth_rate.is_finite() || self.birth_rate < 0.0 {
            return Err(OutbreakError::invalid(format!(
                "birth rate has to be finite and non-negative, got {}", self.birth_rate
            )));
        }
        let probabilities = [
            ("death", self.death),
            ("infection", self.infection),
            ("resurrection", self.resurrection),
            ("kill", self.kill)
        ];
        for (name, p) in probabilities {
            // NaN fails the range check as well
            if !(0.0..=1.0).contains(&p) {
                return Err(OutbreakError::invalid(format!(
                    "{name} probability has to be in [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }

    /// (dS/dt, dZ/dt, dR/dt) at `state`
    #[inline]
    pub fn rates(&self, state: &Populations) -> Populations
    {
        let Populations{humans: s, zombies: z, deceased: r} = *state;
        let contact = s * z;
        Populations{
            humans: self.birth_rate - self.infection * contact - self.death * s,
            zombies: self.infection * contact + self.resurrection * r - self.kill * contact,
            deceased: self.death * s + self.kill * contact - self.resurrection * r
        }
    }

    pub fn get_name(&self) -> String
    {
        format!(
            "P{}_d{}_B{}_G{}_A{}",
            self.birth_rate,
            self.death,
            self.infection,
            self.resurrection,
            self.kill
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Populations{
    pub humans: f64,
    pub zombies: f64,
    pub deceased: f64
}

impl Populations{
    pub fn new(humans: f64, zombies: f64, deceased: f64) -> Self
    {
        Self { humans, zombies, deceased }
    }

    pub fn total(&self) -> f64
    {
        self.humans + self.zombies + self.deceased
    }

    pub fn is_finite(&self) -> bool
    {
        self.humans.is_finite() && self.zombies.is_finite() && self.deceased.is_finite()
    }

    /// Initial populations have to be finite counts
    pub fn validate_initial(&self) -> OutbreakResult<()>
    {
        let counts = [
            ("humans", self.humans),
            ("zombies", self.zombies),
            ("deceased", self.deceased)
        ];
        for (name, count) in counts {
            if !count.is_finite() || count < 0.0 {
                return Err(OutbreakError::invalid(format!(
                    "initial number of {name} has to be finite and non-negative, got {count}"
                )));
            }
        }
        Ok(())
    }
}

impl From<Populations> for [f64; 3]{
    fn from(p: Populations) -> Self {
        [p.humans, p.zombies, p.deceased]
    }
}

impl From<[f64; 3]> for Populations{
    fn from([humans, zombies, deceased]: [f64; 3]) -> Self {
        Self::new(humans, zombies, deceased)
    }
}

/// The outbreak as autonomous ODE system in (S, Z, R)
#[derive(Debug, Clone, Copy)]
pub struct ZombieModel{
    pub params: Parameters
}

impl OdeSystem<3> for ZombieModel{
    #[inline]
    fn derivative(&self, _t: f64, y: &[f64; 3]) -> [f64; 3] {
        self.params.rates(&Populations::from(*y)).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rates_follow_the_equations()
    {
        let params = Parameters{birth_rate: 3.0, death: 0.01, infection: 0.02, resurrection: 0.03, kill: 0.04};
        let (s, z, r) = (100.0, 5.0, 7.0);
        let rates = params.rates(&Populations::new(s, z, r));
        assert_relative_eq!(rates.humans, 3.0 - 0.02 * s * z - 0.01 * s);
        assert_relative_eq!(rates.zombies, 0.02 * s * z + 0.03 * r - 0.04 * s * z);
        assert_relative_eq!(rates.deceased, 0.01 * s + 0.04 * s * z - 0.03 * r);
    }

    #[test]
    fn without_births_rates_cancel()
    {
        let params = Parameters::default();
        let rates = params.rates(&Populations::new(700.0, 20.0, 33.0));
        assert_relative_eq!(rates.total(), 0.0, epsilon = 1e-12);

        // births are a source term, the total is not conserved
        let params = Parameters{birth_rate: 30.0, ..Default::default()};
        let rates = params.rates(&Populations::new(700.0, 20.0, 33.0));
        assert_relative_eq!(rates.total(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn derivative_ignores_time()
    {
        let model = ZombieModel{params: Parameters::default()};
        let y = [500.0, 3.0, 1.0];
        assert_eq!(model.derivative(0.0, &y), model.derivative(123.0, &y));
    }

    #[test]
    fn probabilities_have_to_be_in_unit_interval()
    {
        assert!(Parameters::default().validate().is_ok());
        let zero = Parameters{birth_rate: 0.0, death: 0.0, infection: 0.0, resurrection: 0.0, kill: 0.0};
        assert!(zero.validate().is_ok());
        for bad in [
            Parameters{infection: 1.5, ..Default::default()},
            Parameters{kill: -0.1, ..Default::default()},
            Parameters{death: f64::NAN, ..Default::default()},
            Parameters{birth_rate: -1.0, ..Default::default()},
            Parameters{birth_rate: f64::INFINITY, ..Default::default()},
        ]{
            assert!(matches!(bad.validate(), Err(OutbreakError::InvalidInput(_))), "{bad:?}");
        }
    }

    #[test]
    fn negative_initial_population_is_invalid()
    {
        assert!(Populations::new(0.0, 0.0, 0.0).validate_initial().is_ok());
        assert!(Populations::new(-1.0, 0.0, 0.0).validate_initial().is_err());
        assert!(Populations::new(1.0, f64::INFINITY, 0.0).validate_initial().is_err());
    }
}
