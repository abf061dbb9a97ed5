use tracing::info;

use crate::error::{ConfigError, ObservationError};
use crate::individual::{Individual, Inheritance};
use crate::observation::{Observer, Snapshot};
use crate::parameters::Parameters;
use crate::patch::{votes, Patch, Vote};
use crate::population::{Population, TakeoverStats};
use crate::strategy::{BreederVote, Mating, OffspringVote, Placement};
use crate::SimRng;

type Reproduction = fn(&mut Patch, &Parameters, &Inheritance, &[Individual], &mut SimRng);
type Dispersal = fn(
    &mut Patch,
    Vote,
    Vote,
    &mut Vec<Individual>,
    &mut Vec<Individual>,
    &mut SimRng,
);
type Colonization = fn(&mut Population, &Parameters, &mut SimRng) -> TakeoverStats;

/**
The strategy selectors, resolved once into the functions the tick loop calls.
*/
#[derive(Clone, Copy)]
pub struct Schedule {
    pub reproduction: Reproduction,
    pub dispersal: Dispersal,
    pub colonization: Colonization,
    pub offspring_vote: Vote,
    pub breeder_vote: Vote,
}

impl Schedule {
    pub fn new(p: &Parameters) -> Schedule {
        Schedule {
            reproduction: match p.mating {
                Mating::Random => Patch::reproduce_random,
                Mating::Residency => Patch::reproduce_residency,
            },
            colonization: match p.mating {
                Mating::Random => Population::colonize_females,
                Mating::Residency => Population::colonize_with_males,
            },
            dispersal: match p.placement {
                Placement::Back => Patch::disperse_back,
                Placement::Sort => Patch::disperse_sorted,
            },
            offspring_vote: match p.offspring_vote {
                OffspringVote::Ignore => votes::offspring_ignore,
                OffspringVote::Account => votes::offspring_account,
            },
            breeder_vote: match p.breeder_vote {
                BreederVote::Ignore => votes::breeder_ignore,
                BreederVote::Kin => votes::breeder_kin,
                BreederVote::Despotic => votes::breeder_despotic,
                BreederVote::Egalitarian => votes::breeder_egalitarian,
                BreederVote::Hierarchical => votes::breeder_hierarchical,
            },
        }
    }
}

/**
One run of the model. The simulation owns its population and its random
stream, so independent runs can go on side by side.
*/
pub struct Simulation {
    p: Parameters,
    schedule: Schedule,
    inheritance: Inheritance,
    population: Population,
    rng: SimRng,
    tick: usize,
    takeovers: TakeoverStats,
}

impl Simulation {
    /// Nothing is built unless the parameters are valid.
    pub fn new(p: Parameters, rng: SimRng) -> Result<Simulation, ConfigError> {
        p.validate()?;
        let schedule = Schedule::new(&p);
        let inheritance = Inheritance::new(&p)?;
        let population = Population::new(&p);
        Ok(Simulation {
            p,
            schedule,
            inheritance,
            population,
            rng,
            tick: 0,
            takeovers: TakeoverStats::default(),
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.p
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Number of ticks done so far.
    pub fn tick(&self) -> usize {
        self.tick
    }

    /// Cumulative takeover statistics.
    pub fn takeovers(&self) -> TakeoverStats {
        self.takeovers
    }

    /**
    One tick: every patch in turn reproduces, disperses its offspring and
    suffers mortality. Then the floaters are shuffled and thinned out, the
    population-wide colonization pass runs, and everybody gets older.
    */
    pub fn step(&mut self) -> TakeoverStats {
        let s = self.schedule;
        let pop = &mut self.population;
        for patch in pop.patches.iter_mut() {
            (s.reproduction)(
                patch,
                &self.p,
                &self.inheritance,
                &pop.male_floaters,
                &mut self.rng,
            );
            (s.dispersal)(
                patch,
                s.offspring_vote,
                s.breeder_vote,
                &mut pop.female_floaters,
                &mut pop.male_floaters,
                &mut self.rng,
            );
            patch.survive(&self.p, &mut self.rng);
        }
        pop.shuffle_floaters(&mut self.rng);
        pop.floater_survival(&self.p, &mut self.rng);
        let stats = (s.colonization)(pop, &self.p, &mut self.rng);
        pop.age();
        self.takeovers += stats;
        self.tick += 1;
        stats
    }

    /// The state after the last tick, which has index `tick() - 1`.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tick: self.tick.saturating_sub(1),
            last: self.tick == self.p.ticks,
            population: &self.population,
            takeovers: self.takeovers,
        }
    }

    /// Run all remaining ticks, offering every tick to the observer.
    pub fn run<O: Observer>(&mut self, observer: &mut O) -> Result<(), ObservationError> {
        info!(ticks = self.p.ticks, patches = self.p.patches, "run started");
        while self.tick < self.p.ticks {
            self.step();
            observer.observe(&self.snapshot())?;
        }
        info!(
            breeders = self.population.breeders().count(),
            female_floaters = self.population.female_floaters().len(),
            male_floaters = self.population.male_floaters().len(),
            "run finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn invalid_parameters_build_nothing() {
        let p = Parameters {
            takeover: 2.,
            ..Parameters::default()
        };
        assert!(Simulation::new(p, SimRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn schedule_follows_selectors() {
        let p = Parameters {
            breeder_vote: BreederVote::Ignore,
            offspring_vote: OffspringVote::Ignore,
            ..Parameters::default()
        };
        let s = Schedule::new(&p);
        let poll = crate::patch::Poll {
            stay: vec![0.25],
            accept: vec![0.5],
            mother_rank: vec![1],
        };
        assert_eq!((s.offspring_vote)(&poll, 0), 1.);
        assert_eq!((s.breeder_vote)(&poll, 0), 1.);
        let p = Parameters {
            breeder_vote: BreederVote::Kin,
            ..p
        };
        assert_eq!((Schedule::new(&p).breeder_vote)(&poll, 0), 0.5);
    }

    #[test]
    fn ticks_and_takeovers_accumulate() {
        let p = Parameters {
            patches: 50,
            ticks: 5,
            ..Parameters::default()
        };
        let mut sim = Simulation::new(p, SimRng::seed_from_u64(9)).unwrap();
        let mut total = TakeoverStats::default();
        for _ in 0..5 {
            total += sim.step();
        }
        assert_eq!(sim.tick(), 5);
        assert_eq!(sim.takeovers(), total);
        assert!(sim.snapshot().last);
        assert_eq!(sim.snapshot().tick, 4);
    }
}
