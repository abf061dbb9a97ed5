use itertools::Itertools;
use rand::prelude::*;

use crate::alleles::Locus;
use crate::individual::{Individual, Inheritance};
use crate::parameters::Parameters;
use crate::SimRng;

/// The record of one female offspring's poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// offspring vote
    pub x: f64,
    /// breeder vote
    pub y: f64,
    /// group size before dispersal
    pub n: usize,
    /// rank of the mother
    pub rank: usize,
}

/**
The inputs of this tick's poll: for every female offspring her own stay
probability x(n,R) and her mother's rank, and for every breeder rank the
acceptance probability y(n,R).
*/
#[derive(Debug, Default, Clone)]
pub struct Poll {
    pub stay: Vec<f64>,
    pub accept: Vec<f64>,
    pub mother_rank: Vec<usize>,
}

/// Weighs the vote of offspring `i` of the poll.
pub type Vote = fn(&Poll, usize) -> f64;

/**
A patch, or home range, is a rank-ordered group of female breeders (the first
one is dominant) and at most one resident male.
*/
#[derive(Default, Clone)]
pub struct Patch {
    breeders: Vec<Individual>,
    male: Option<Individual>,
    female_offspring: Vec<Individual>,
    male_offspring: Vec<Individual>,
    poll: Poll,
    verdicts: Vec<Verdict>,
}

/// F(n,R), per fecundity trial of a breeder of rank R in a group of n.
pub fn fecundity(p: &Parameters, n: f64, rank: f64) -> f64 {
    p.fecundity as f64 * (1.0 - p.phi * n) * (1.0 - (-p.k * n).exp()) * rank.powf(-p.delta)
}

/// x(n,R), the probability for an offspring to stay on its natal patch.
pub fn stay_probability(offspring: &Individual, n: f64, rank: f64) -> f64 {
    let b = &offspring.phenotype;
    1.0 / (1.0 + (b[Locus::B0] + n * b[Locus::B1] + rank * b[Locus::B2]).exp())
}

/// y(n,R), the probability for a breeder to accept an offspring.
pub fn accept_probability(breeder: &Individual, n: f64, rank: f64) -> f64 {
    let a = &breeder.phenotype;
    1.0 / (1.0 + (a[Locus::A0] + n * a[Locus::A1] + rank * a[Locus::A2]).exp())
}

/// Survival of a resident in a group of n, given its baseline θ.
pub fn survival(p: &Parameters, theta: f64, n: f64) -> f64 {
    theta + (p.survival_max - theta) * (1.0 - (-p.gamma * n).exp())
}

/// `true` with probability `p`; anything above 1 is certain, anything below 0
/// impossible.
pub(crate) fn chance(rng: &mut SimRng, p: f64) -> bool {
    rng.gen::<f64>() < p
}

fn mortality(group: &mut Vec<Individual>, survival: f64, rng: &mut SimRng) {
    group.retain(|ind| ind.age == 0 || chance(rng, survival));
}

impl Patch {
    /// A patch with the given breeders, dominant first, and maybe a male.
    pub fn with_group(breeders: Vec<Individual>, male: Option<Individual>) -> Patch {
        Patch {
            breeders,
            male,
            ..Patch::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.breeders.is_empty()
    }

    pub fn size(&self) -> usize {
        self.breeders.len()
    }

    pub fn breeders(&self) -> &[Individual] {
        &self.breeders
    }

    pub fn male(&self) -> Option<&Individual> {
        self.male.as_ref()
    }

    pub fn set_male(&mut self, male: Individual) {
        self.male = Some(male);
    }

    /// The outcome of the last poll, one entry per female offspring.
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub(crate) fn residents_mut(&mut self) -> impl Iterator<Item = &mut Individual> {
        self.breeders.iter_mut().chain(self.male.iter_mut())
    }

    fn prepare_reproduction(&mut self) {
        self.female_offspring.clear();
        self.male_offspring.clear();
        self.poll.stay.clear();
        self.poll.accept.clear();
        self.poll.mother_rank.clear();
        self.verdicts.clear();
    }

    /// Random mating: a single male floater, drawn at random, sires all
    /// offspring of this patch.
    pub fn reproduce_random(
        &mut self,
        p: &Parameters,
        inheritance: &Inheritance,
        male_floaters: &[Individual],
        rng: &mut SimRng,
    ) {
        self.prepare_reproduction();
        if self.is_empty() {
            return;
        }
        if let Some(sire) = male_floaters.choose(rng) {
            self.create_offspring(p, inheritance, sire, rng);
        }
    }

    /// Residency mating: only the resident male sires.
    pub fn reproduce_residency(
        &mut self,
        p: &Parameters,
        inheritance: &Inheritance,
        _male_floaters: &[Individual],
        rng: &mut SimRng,
    ) {
        self.prepare_reproduction();
        if self.is_empty() {
            return;
        }
        if let Some(sire) = self.male.take() {
            self.create_offspring(p, inheritance, &sire, rng);
            self.male = Some(sire);
        }
    }

    fn create_offspring(
        &mut self,
        p: &Parameters,
        inheritance: &Inheritance,
        sire: &Individual,
        rng: &mut SimRng,
    ) {
        let n = self.breeders.len() as f64;
        for (i, mother) in self.breeders.iter().enumerate() {
            let rank = (i + 1) as f64;
            self.poll.accept.push(accept_probability(mother, n, rank));
            let f = fecundity(p, n, rank);
            for _ in 0..p.fecundity {
                if !chance(rng, f) {
                    continue;
                }
                let child = Individual::offspring(inheritance, mother, sire, (i + 1) as u32, rng);
                if rng.gen::<bool>() {
                    self.poll.stay.push(stay_probability(&child, n, rank));
                    self.poll.mother_rank.push(i + 1);
                    self.female_offspring.push(child);
                } else {
                    self.male_offspring.push(child);
                }
            }
        }
    }

    /**
    Sons leave for the male floater pool. On a patch without breeders the
    resident male leaves, too. Otherwise every daughter is polled. Returns the
    daughters that won their poll, tagged with their mother's rank, in the
    order they were born; the others have joined the female floater pool.
    */
    fn disperse_and_poll(
        &mut self,
        offspring_vote: Vote,
        breeder_vote: Vote,
        female_floaters: &mut Vec<Individual>,
        male_floaters: &mut Vec<Individual>,
        rng: &mut SimRng,
    ) -> Vec<(usize, Individual)> {
        male_floaters.append(&mut self.male_offspring);
        if self.is_empty() {
            male_floaters.extend(self.male.take());
            female_floaters.append(&mut self.female_offspring);
            return vec![];
        }

        let n = self.breeders.len();
        let mut staged = Vec::new();
        for (i, daughter) in self.female_offspring.drain(..).enumerate() {
            let verdict = Verdict {
                x: offspring_vote(&self.poll, i),
                y: breeder_vote(&self.poll, i),
                n,
                rank: self.poll.mother_rank[i],
            };
            self.verdicts.push(verdict);
            if chance(rng, verdict.x * verdict.y) {
                staged.push((verdict.rank, daughter));
            } else {
                female_floaters.push(daughter);
            }
        }
        staged
    }

    /// Retained daughters queue up behind all breeders, in random order
    /// among themselves.
    pub fn disperse_back(
        &mut self,
        offspring_vote: Vote,
        breeder_vote: Vote,
        female_floaters: &mut Vec<Individual>,
        male_floaters: &mut Vec<Individual>,
        rng: &mut SimRng,
    ) {
        let staged = self.disperse_and_poll(
            offspring_vote,
            breeder_vote,
            female_floaters,
            male_floaters,
            rng,
        );
        let old_n = self.breeders.len();
        self.breeders.extend(staged.into_iter().map(|(_, d)| d));
        self.breeders[old_n..].shuffle(rng);
    }

    /// Retained daughters rank directly below their mother and their
    /// elder retained sisters.
    pub fn disperse_sorted(
        &mut self,
        offspring_vote: Vote,
        breeder_vote: Vote,
        female_floaters: &mut Vec<Individual>,
        male_floaters: &mut Vec<Individual>,
        rng: &mut SimRng,
    ) {
        let staged = self.disperse_and_poll(
            offspring_vote,
            breeder_vote,
            female_floaters,
            male_floaters,
            rng,
        );
        if staged.is_empty() {
            return;
        }
        let mut staged = staged.into_iter().peekable();
        let old = std::mem::take(&mut self.breeders);
        self.breeders.reserve(old.len() + staged.len());
        for (i, breeder) in old.into_iter().enumerate() {
            self.breeders.push(breeder);
            self.breeders.extend(
                staged
                    .peeking_take_while(|(rank, _)| *rank == i + 1)
                    .map(|(_, d)| d),
            );
        }
    }

    pub fn survive(&mut self, p: &Parameters, rng: &mut SimRng) {
        let n = self.breeders.len() as f64;
        mortality(&mut self.breeders, survival(p, p.theta_breeder(), n), rng);
        let male_survival = survival(p, p.theta_male(), n);
        let dies = matches!(&self.male, Some(m) if m.age > 0) && !chance(rng, male_survival);
        if dies {
            self.male = None;
        }
    }

    /// A floater takes over the patch. Former breeders and the former male
    /// are gone.
    pub fn colonize(&mut self, floater: Individual) {
        self.breeders.clear();
        self.breeders.push(floater);
        self.male = None;
    }
}

pub mod votes {
    //! Offspring and breeder vote strategies.
    use super::Poll;

    pub fn offspring_ignore(_: &Poll, _: usize) -> f64 {
        1.0
    }

    pub fn offspring_account(poll: &Poll, i: usize) -> f64 {
        poll.stay[i]
    }

    pub fn breeder_ignore(_: &Poll, _: usize) -> f64 {
        1.0
    }

    /// The mother decides.
    pub fn breeder_kin(poll: &Poll, i: usize) -> f64 {
        poll.accept[poll.mother_rank[i] - 1]
    }

    /// The dominant breeder decides.
    pub fn breeder_despotic(poll: &Poll, _: usize) -> f64 {
        poll.accept[0]
    }

    pub fn breeder_egalitarian(poll: &Poll, _: usize) -> f64 {
        mean(&poll.accept)
    }

    /// Everybody ranking at least as high as the mother has a say.
    pub fn breeder_hierarchical(poll: &Poll, i: usize) -> f64 {
        mean(&poll.accept[..poll.mother_rank[i]])
    }

    fn mean(v: &[f64]) -> f64 {
        v.iter().sum::<f64>() / v.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::votes::*;
    use super::*;
    use crate::alleles::Alleles;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn breeder(tag: f64) -> Individual {
        let mut b = Individual::founder(Alleles::from([5., 0., 0., 5., 0., 0.]), Alleles::from(1.));
        b.mother_rank = tag as u32;
        b.age = 1;
        b
    }

    fn group(size: usize) -> Patch {
        Patch::with_group((1..=size).map(|r| breeder(r as f64)).collect(), None)
    }

    fn no_mutation() -> (Parameters, Inheritance) {
        let p = Parameters {
            mutation_probability: 0.,
            ..Parameters::default()
        };
        let inheritance = Inheritance::new(&p).unwrap();
        (p, inheritance)
    }

    #[test]
    fn fecundity_formula() {
        let p = Parameters {
            fecundity: 2,
            phi: 0.1,
            k: 1.0,
            delta: 1.0,
            ..Parameters::default()
        };
        let expected = 2. * 0.8 * (1. - (-2f64).exp()) / 3.;
        assert_relative_eq!(fecundity(&p, 2., 3.), expected, epsilon = 1e-12);
    }

    #[test]
    fn probabilities_are_sigmoids() {
        let b = Individual::founder(Alleles::from([0., 0., 0., 0., 0., 0.]), Alleles::from(1.));
        assert_relative_eq!(stay_probability(&b, 3., 2.), 0.5);
        assert_relative_eq!(accept_probability(&b, 3., 2.), 0.5);
        let b = Individual::founder(Alleles::from([1., -1., 0.5, 0., 0., 0.]), Alleles::from(1.));
        let expected = 1. / (1. + (1. - 2. + 1.5f64).exp());
        assert_relative_eq!(accept_probability(&b, 2., 3.), expected);
        assert_relative_eq!(stay_probability(&b, 2., 3.), 0.5);
    }

    #[test]
    fn breeder_votes() {
        let poll = Poll {
            stay: vec![0.9, 0.8, 0.7],
            accept: vec![0.1, 0.2, 0.6],
            mother_rank: vec![1, 2, 3],
        };
        assert_eq!(offspring_ignore(&poll, 1), 1.0);
        assert_eq!(offspring_account(&poll, 1), 0.8);
        assert_eq!(breeder_ignore(&poll, 2), 1.0);
        assert_eq!(breeder_kin(&poll, 1), 0.2);
        assert_eq!(breeder_despotic(&poll, 2), 0.1);
        assert_relative_eq!(breeder_egalitarian(&poll, 0), 0.3);
        assert_relative_eq!(breeder_hierarchical(&poll, 0), 0.1);
        assert_relative_eq!(breeder_hierarchical(&poll, 1), 0.15);
        assert_relative_eq!(breeder_hierarchical(&poll, 2), 0.3);
    }

    #[test]
    fn lone_male_returns_to_floaters() {
        let mut patch = Patch::default();
        patch.set_male(breeder(1.));
        let (p, inheritance) = no_mutation();
        let mut rng = SimRng::seed_from_u64(1);
        let (mut ff, mut mf) = (vec![], vec![]);
        patch.reproduce_residency(&p, &inheritance, &[], &mut rng);
        patch.disperse_sorted(offspring_account, breeder_despotic, &mut ff, &mut mf, &mut rng);
        assert!(patch.male().is_none());
        assert_eq!(mf.len(), 1);
        assert!(ff.is_empty());
    }

    #[test]
    fn residency_without_male_has_no_offspring() {
        let mut patch = group(3);
        let (p, inheritance) = no_mutation();
        let mut rng = SimRng::seed_from_u64(2);
        let males = vec![breeder(1.)];
        patch.reproduce_residency(&p, &inheritance, &males, &mut rng);
        assert!(patch.female_offspring.is_empty());
        assert!(patch.male_offspring.is_empty());
        assert!(patch.poll.accept.is_empty());
    }

    #[test]
    fn random_mating_records_one_acceptance_per_rank() {
        let mut patch = group(4);
        let (p, inheritance) = no_mutation();
        let mut rng = SimRng::seed_from_u64(3);
        let males = vec![breeder(1.)];
        patch.reproduce_random(&p, &inheritance, &males, &mut rng);
        assert_eq!(patch.poll.accept.len(), 4);
        assert_eq!(patch.poll.stay.len(), patch.female_offspring.len());
        assert_eq!(patch.poll.mother_rank.len(), patch.female_offspring.len());
        assert!(patch.poll.mother_rank.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn sorted_placement_follows_mothers() {
        let mut patch = group(3);
        for rank in [1usize, 1, 3, 2] {
            let mut d = breeder(0.);
            d.age = 0;
            d.mother_rank = rank as u32;
            patch.female_offspring.push(d);
        }
        // ranks must be in birth order
        patch.female_offspring.sort_by_key(|d| d.mother_rank);
        patch.poll = Poll {
            stay: vec![1.; 4],
            accept: vec![1.; 3],
            mother_rank: patch.female_offspring.iter().map(|d| d.mother_rank as usize).collect(),
        };
        let mut rng = SimRng::seed_from_u64(4);
        let (mut ff, mut mf) = (vec![], vec![]);
        patch.disperse_sorted(offspring_account, breeder_kin, &mut ff, &mut mf, &mut rng);
        assert!(ff.is_empty());
        let order: Vec<(u32, u32)> = patch.breeders.iter().map(|b| (b.age, b.mother_rank)).collect();
        assert_eq!(
            order,
            vec![(1, 1), (0, 1), (0, 1), (1, 2), (0, 2), (1, 3), (0, 3)]
        );
        assert_eq!(patch.verdicts().len(), 4);
        assert!(patch.verdicts().iter().all(|v| v.n == 3));
    }

    #[test]
    fn back_placement_keeps_old_breeders_in_front() {
        let mut patch = group(3);
        for rank in [1usize, 2, 2, 3, 3] {
            let mut d = breeder(0.);
            d.age = 0;
            d.mother_rank = rank as u32;
            patch.female_offspring.push(d);
        }
        patch.poll = Poll {
            stay: vec![1.; 5],
            accept: vec![1.; 3],
            mother_rank: vec![1, 2, 2, 3, 3],
        };
        let mut rng = SimRng::seed_from_u64(5);
        let (mut ff, mut mf) = (vec![], vec![]);
        patch.disperse_back(offspring_ignore, breeder_egalitarian, &mut ff, &mut mf, &mut rng);
        assert_eq!(patch.size(), 8);
        assert!(patch.breeders[..3].iter().all(|b| b.age == 1));
        assert!(patch.breeders[3..].iter().all(|b| b.age == 0));
        assert_eq!(
            patch.breeders[..3].iter().map(|b| b.mother_rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn rejected_daughters_become_floaters() {
        let mut patch = group(2);
        for _ in 0..3 {
            let mut d = breeder(0.);
            d.age = 0;
            patch.female_offspring.push(d);
        }
        patch.male_offspring.push(breeder(0.));
        patch.poll = Poll {
            stay: vec![1.; 3],
            accept: vec![0.; 2],
            mother_rank: vec![1, 1, 2],
        };
        let mut rng = SimRng::seed_from_u64(6);
        let (mut ff, mut mf) = (vec![], vec![]);
        patch.disperse_sorted(offspring_account, breeder_kin, &mut ff, &mut mf, &mut rng);
        assert_eq!(patch.size(), 2);
        assert_eq!(ff.len(), 3);
        assert_eq!(mf.len(), 1);
        assert!(patch.verdicts().iter().all(|v| v.y == 0.));
    }

    #[test]
    fn newborns_survive_their_first_tick() {
        let p = Parameters {
            survival_breeder: 0.,
            survival_male: 0.,
            survival_max: 0.,
            ..Parameters::default()
        };
        let mut patch = group(3);
        let mut newborn = breeder(0.);
        newborn.age = 0;
        patch.breeders.push(newborn.clone());
        patch.set_male(newborn);
        let mut rng = SimRng::seed_from_u64(7);
        patch.survive(&p, &mut rng);
        assert_eq!(patch.size(), 1);
        assert_eq!(patch.breeders[0].age, 0);
        assert!(patch.male().is_some());
    }

    #[test]
    fn breeders_and_males_have_their_own_baseline() {
        let mut rng = SimRng::seed_from_u64(11);
        let p = Parameters {
            survival_breeder: 1.,
            survival_male: 0.,
            survival_max: 1.,
            ..Parameters::default()
        };
        for _ in 0..100 {
            let mut patch = group(3);
            patch.set_male(breeder(1.));
            patch.survive(&p, &mut rng);
            assert_eq!(patch.size(), 3);
            assert!(patch.male().is_none());
        }

        let p = Parameters {
            survival_breeder: 0.,
            survival_male: 1.,
            ..p
        };
        for _ in 0..100 {
            let mut patch = group(3);
            patch.set_male(breeder(1.));
            patch.survive(&p, &mut rng);
            assert!(patch.is_empty());
            assert!(patch.male().is_some());
        }
    }

    #[test]
    fn male_survival_counts_the_breeders_before_mortality() {
        // above a longevity of 1 the group size alone decides
        let p = Parameters {
            survival_breeder: -20.,
            survival_male: 0.9,
            survival_max: 2.,
            sigma: 1.,
            gamma: 1.,
            ..Parameters::default()
        };
        assert!(survival(&p, p.theta_breeder(), 3.) <= 0.);
        assert!(survival(&p, p.theta_male(), 3.) >= 1.);
        assert!(survival(&p, p.theta_male(), 0.) <= 0.);

        let mut rng = SimRng::seed_from_u64(12);
        let mut patch = group(3);
        patch.set_male(breeder(1.));
        patch.survive(&p, &mut rng);
        assert!(patch.is_empty());
        assert!(patch.male().is_some());

        // alone, the same male dies
        patch.survive(&p, &mut rng);
        assert!(patch.male().is_none());
    }

    #[test]
    fn colonization_replaces_everyone() {
        let mut patch = group(4);
        patch.set_male(breeder(1.));
        let mut floater = breeder(0.);
        floater.mother_rank = 9;
        patch.colonize(floater);
        assert_eq!(patch.size(), 1);
        assert_eq!(patch.breeders()[0].mother_rank, 9);
        assert!(patch.male().is_none());
    }

    #[test]
    fn expected_offspring_grows_with_fecundity() {
        let (base, inheritance) = no_mutation();
        let males = vec![breeder(1.)];
        let mut means = vec![];
        for f0 in 1..=3 {
            let p = Parameters {
                fecundity: f0,
                phi: 0.3,
                ..base.clone()
            };
            let mut rng = SimRng::seed_from_u64(8);
            let mut total = 0;
            for _ in 0..2000 {
                let mut patch = group(2);
                patch.reproduce_random(&p, &inheritance, &males, &mut rng);
                total += patch.female_offspring.len() + patch.male_offspring.len();
            }
            means.push(total as f64 / 2000.);
        }
        assert!(means[0] < means[1]);
        assert!(means[1] < means[2]);
    }
}
