use serde_derive::{Deserialize, Serialize};

use crate::alleles::Alleles;
use crate::error::ConfigError;
use crate::strategy::{BreederVote, Mating, OffspringVote, Placement};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Parameters {
    /// number of patches
    pub patches: usize,
    /// initially occupied patches, in percent
    pub initial_occupancy: f64,
    /// initial number of male floaters
    pub initial_male_floaters: usize,

    /// baseline fecundity F0, also the number of fecundity trials per breeder
    pub fecundity: usize,
    /// scramble competition φ in F(n,R)
    pub phi: f64,
    /// contest competition δ in F(n,R)
    pub delta: f64,
    /// helping k in F(n,R)
    pub k: f64,

    pub alleles: Alleles,
    pub mask: Alleles,

    pub survival_breeder: f64,
    pub survival_male: f64,
    pub survival_female_floater: f64,
    pub survival_male_floater: f64,
    /// maximum survival (longevity)
    pub survival_max: f64,
    /// shape σ of the survival baseline θ
    pub sigma: f64,
    /// group size dependence γ of survival
    pub gamma: f64,

    /// patch search efficiency ε
    pub search_efficiency: f64,
    /// baseline takeover probability t0
    pub takeover: f64,
    /// benefit τ of communal territory defense
    pub defense: f64,

    pub mutation_probability: f64,
    /// scale of the Cauchy mutation distribution
    pub mutation_scale: f64,

    pub ticks: usize,
    pub mating: Mating,
    pub placement: Placement,
    pub offspring_vote: OffspringVote,
    pub breeder_vote: BreederVote,

    pub seed: Option<u64>,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            patches: 1000,
            initial_occupancy: 90.,
            initial_male_floaters: 0,

            fecundity: 1,
            phi: 0.1,
            delta: 0.0,
            k: 10.0,

            alleles: Alleles::from([5., 0., 0., 5., 0., 0.]),
            mask: Alleles::from(1.),

            survival_breeder: 0.8,
            survival_male: 0.8,
            survival_female_floater: 0.6,
            survival_male_floater: 0.8,
            survival_max: 0.95,
            sigma: 1.0,
            gamma: 0.01,

            search_efficiency: 0.005,
            takeover: 0.05,
            defense: 1.0,

            mutation_probability: 0.1,
            mutation_scale: 1.0,

            ticks: 1000,
            mating: Mating::Random,
            placement: Placement::Sort,
            offspring_vote: OffspringVote::Account,
            breeder_vote: BreederVote::Despotic,

            seed: None,
        }
    }
}

fn check(
    parameter: &'static str,
    value: f64,
    range: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            parameter,
            value,
            range,
        })
    }
}

fn probability(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    check(parameter, value, "0 to 1", |v| (0. ..=1.).contains(&v))
}

impl Parameters {
    /// Survival baseline for breeders, θ_B
    pub fn theta_breeder(&self) -> f64 {
        theta(self.survival_breeder, self.survival_max, self.sigma)
    }

    /// Survival baseline for resident males, θ_M
    pub fn theta_male(&self) -> f64 {
        theta(self.survival_male, self.survival_max, self.sigma)
    }

    /// Number of patches that start with a founder.
    pub fn initially_occupied(&self) -> usize {
        let occupied = (self.initial_occupancy * self.patches as f64 / 100.0).ceil() as usize;
        occupied.min(self.patches)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.patches == 0 {
            return Err(ConfigError::OutOfRange {
                parameter: "m",
                value: 0.,
                range: "at least 1",
            });
        }
        check("m0", self.initial_occupancy, "0 to 100", |v| {
            (0. ..=100.).contains(&v)
        })?;
        check("phi", self.phi, "finite", |_| true)?;
        check("delta", self.delta, "finite", |_| true)?;
        check("k", self.k, "finite", |_| true)?;
        for v in self.alleles.entries.iter().chain(self.mask.entries.iter()) {
            check("Alleles/Mask", *v, "finite", |_| true)?;
        }
        probability("Sb", self.survival_breeder)?;
        probability("Sm", self.survival_male)?;
        probability("Sff", self.survival_female_floater)?;
        probability("Smf", self.survival_male_floater)?;
        probability("Smax", self.survival_max)?;
        check("sigma", self.sigma, "finite", |_| true)?;
        check("gamma", self.gamma, "finite", |_| true)?;
        check("eps", self.search_efficiency, "0 or more", |v| v >= 0.)?;
        probability("t0", self.takeover)?;
        check("tau", self.defense, "finite", |_| true)?;
        probability("mu", self.mutation_probability)?;
        check("mutation-scale", self.mutation_scale, "0 or more", |v| {
            v >= 0.
        })?;
        Ok(())
    }
}

/// θ is chosen such that a solitary group survives with the baseline
/// probability when σ = γ = 1.
fn theta(baseline: f64, maximum: f64, sigma: f64) -> f64 {
    let e = (-sigma).exp();
    (baseline - maximum * (1.0 - e)) / e
}
