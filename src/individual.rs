use rand::prelude::*;
use rand_distr::{Bernoulli, Cauchy};

use crate::alleles::{Alleles, LOCI};
use crate::error::ConfigError;
use crate::parameters::Parameters;
use crate::SimRng;

/**
An individual is not much more than a bag of its alleles. The phenotype is
what behaviour is computed from, the two inherited copies (maternal,
paternal) are only passed on.
*/
#[derive(Clone, PartialEq)]
pub struct Individual {
    pub phenotype: Alleles,
    pub inherited: [Alleles; 2],
    pub age: u32,
    /// Rank of the mother at birth, 0 for founders.
    pub mother_rank: u32,
}

impl Individual {
    /// A founder carries the masked initial configuration on both copies.
    pub fn founder(alleles: Alleles, mask: Alleles) -> Individual {
        let a = alleles * mask;
        Individual {
            phenotype: a,
            inherited: [a, a],
            age: 0,
            mother_rank: 0,
        }
    }

    /**
    Recombination and mutation. For every locus a single fair coin decides
    which inherited copy is taken from both the mother and the father. Each of
    the two drawn values then mutates independently.
    */
    pub fn offspring(
        inheritance: &Inheritance,
        female: &Individual,
        male: &Individual,
        mother_rank: u32,
        rng: &mut SimRng,
    ) -> Individual {
        let mut inherited = [Alleles::default(); 2];
        let mut phenotype = Alleles::default();
        for i in 0..LOCI {
            let copy = usize::from(rng.gen::<bool>());
            let x = inheritance.mutate(female.inherited[copy][i], rng) * inheritance.mask[i];
            let y = inheritance.mutate(male.inherited[copy][i], rng) * inheritance.mask[i];
            inherited[0][i] = x;
            inherited[1][i] = y;
            phenotype[i] = 0.5 * (x + y);
        }
        Individual {
            phenotype,
            inherited,
            age: 0,
            mother_rank,
        }
    }
}

/**
Everything needed to pass alleles on: the locus mask and the mutation
process. Mutation happens with a fixed probability per transmitted allele
and adds heavy-tailed (Cauchy) noise.
*/
#[derive(Debug, Clone)]
pub struct Inheritance {
    pub mask: Alleles,
    mutation: Bernoulli,
    effect: Option<Cauchy<f64>>,
}

impl Inheritance {
    pub fn new(p: &Parameters) -> Result<Inheritance, ConfigError> {
        let mutation = Bernoulli::new(p.mutation_probability)
            .map_err(|_| ConfigError::Distribution("mutation probability"))?;
        let effect = if p.mutation_probability > 0. && p.mutation_scale > 0. {
            Some(
                Cauchy::new(0.0, p.mutation_scale)
                    .map_err(|_| ConfigError::Distribution("mutation effect"))?,
            )
        } else {
            None
        };
        Ok(Inheritance {
            mask: p.mask,
            mutation,
            effect,
        })
    }

    fn mutate(&self, allele: f64, rng: &mut SimRng) -> f64 {
        match &self.effect {
            Some(effect) if self.mutation.sample(rng) => allele + effect.sample(rng),
            _ => allele,
        }
    }
}
