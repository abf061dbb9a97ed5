use std::ops::{AddAssign, Div, Sub};

use rand::prelude::*;
use rand_distr::Poisson;
use serde_derive::Serialize;
use tracing::{debug, trace};

use crate::individual::Individual;
use crate::parameters::Parameters;
use crate::patch::{chance, Patch};
use crate::strategy::Mating;
use crate::SimRng;

/// Counters of one or more colonization passes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TakeoverStats {
    pub attempts: usize,
    /// every colonization, walk-ins included
    pub takeovers: usize,
    pub walk_ins: usize,
}

impl AddAssign for TakeoverStats {
    fn add_assign(&mut self, other: Self) {
        self.attempts += other.attempts;
        self.takeovers += other.takeovers;
        self.walk_ins += other.walk_ins;
    }
}

impl Sub for TakeoverStats {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        TakeoverStats {
            attempts: self.attempts - other.attempts,
            takeovers: self.takeovers - other.takeovers,
            walk_ins: self.walk_ins - other.walk_ins,
        }
    }
}

/// Per-field floor division, for rates over an interval of ticks.
impl Div<usize> for TakeoverStats {
    type Output = Self;

    fn div(self, k: usize) -> Self {
        TakeoverStats {
            attempts: self.attempts / k,
            takeovers: self.takeovers / k,
            walk_ins: self.walk_ins / k,
        }
    }
}

/**
The population is a fixed collection of patches together with the two pools
of floaters, female and male, that currently hold no place anywhere.
*/
#[derive(Clone)]
pub struct Population {
    pub(crate) patches: Vec<Patch>,
    pub(crate) female_floaters: Vec<Individual>,
    pub(crate) male_floaters: Vec<Individual>,
}

impl Population {
    pub fn new(p: &Parameters) -> Population {
        let founder = Individual::founder(p.alleles, p.mask);
        let occupied = p.initially_occupied();
        let mut patches = Vec::with_capacity(p.patches);
        for _ in 0..occupied {
            let male = match p.mating {
                Mating::Residency => Some(founder.clone()),
                Mating::Random => None,
            };
            patches.push(Patch::with_group(vec![founder.clone()], male));
        }
        patches.resize_with(p.patches, Patch::default);
        debug!(
            patches = p.patches,
            occupied,
            male_floaters = p.initial_male_floaters,
            "population initialized"
        );
        Population {
            patches,
            female_floaters: vec![],
            male_floaters: vec![founder; p.initial_male_floaters],
        }
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn female_floaters(&self) -> &[Individual] {
        &self.female_floaters
    }

    pub fn male_floaters(&self) -> &[Individual] {
        &self.male_floaters
    }

    pub fn shuffle_floaters(&mut self, rng: &mut SimRng) {
        self.female_floaters.shuffle(rng);
        self.male_floaters.shuffle(rng);
    }

    pub fn floater_survival(&mut self, p: &Parameters, rng: &mut SimRng) {
        self.female_floaters
            .retain(|_| chance(rng, p.survival_female_floater));
        self.male_floaters
            .retain(|_| chance(rng, p.survival_male_floater));
    }

    /**
    Female floaters search for patches. The number of visits every patch
    receives is Poisson distributed, with a mean proportional to the number of
    female floaters at the start of the pass. A visited empty patch is simply
    occupied, an occupied one is taken over with a probability that shrinks
    with the size of the defending group. Each patch changes hands at most
    once, and the pass ends as soon as no female floater is left.
    */
    pub fn colonize_females(&mut self, p: &Parameters, rng: &mut SimRng) -> TakeoverStats {
        let mut stats = TakeoverStats::default();
        let lambda = p.search_efficiency * self.female_floaters.len() as f64;
        // Poisson needs a positive mean
        let visits = match Poisson::new(lambda) {
            Ok(visits) => visits,
            Err(_) => return stats,
        };
        for patch in self.patches.iter_mut() {
            if self.female_floaters.is_empty() {
                break;
            }
            let k = visits.sample(rng) as usize;
            stats.attempts += k;
            if k == 0 {
                continue;
            }
            let colonized = if patch.is_empty() {
                stats.walk_ins += 1;
                true
            } else {
                let defenders = (patch.size() - 1) as f64;
                chance(rng, k as f64 * p.takeover * (-p.defense * defenders).exp())
            };
            if colonized {
                if let Some(floater) = self.female_floaters.pop() {
                    patch.colonize(floater);
                    stats.takeovers += 1;
                }
            }
        }
        trace!(
            attempts = stats.attempts,
            takeovers = stats.takeovers,
            walk_ins = stats.walk_ins,
            "colonization"
        );
        stats
    }

    /// The female pass, then every patch without a resident male gets one
    /// from the male floaters, while they last.
    pub fn colonize_with_males(&mut self, p: &Parameters, rng: &mut SimRng) -> TakeoverStats {
        let stats = self.colonize_females(p, rng);
        for patch in self.patches.iter_mut() {
            if patch.male().is_some() {
                continue;
            }
            match self.male_floaters.pop() {
                Some(male) => patch.set_male(male),
                None => break,
            }
        }
        stats
    }

    pub fn age(&mut self) {
        for ind in self.individuals_mut() {
            ind.age += 1;
        }
    }

    fn individuals_mut(&mut self) -> impl Iterator<Item = &mut Individual> {
        self.patches
            .iter_mut()
            .flat_map(|patch| patch.residents_mut())
            .chain(self.female_floaters.iter_mut())
            .chain(self.male_floaters.iter_mut())
    }

    /// Everybody: breeders, resident males, and both floater pools.
    pub fn individuals(&self) -> impl Iterator<Item = &Individual> {
        self.patches
            .iter()
            .flat_map(|patch| patch.breeders().iter().chain(patch.male()))
            .chain(self.female_floaters.iter())
            .chain(self.male_floaters.iter())
    }

    pub fn breeders(&self) -> impl Iterator<Item = &Individual> {
        self.patches.iter().flat_map(|patch| patch.breeders().iter())
    }

    pub fn occupied_patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter().filter(|patch| !patch.is_empty())
    }
}
