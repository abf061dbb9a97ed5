/*!
Model Description
=================

This model description follows the ODD (Overview, Design concept, Details)
protocol (Grimm et al., 2006; Grimm et al., 2010). The modules of this crate
are arranged along the sections of the protocol, so reading this file top to
bottom gives the model description, and following the module links gives the
code that implements each part.

# 1. Purpose

The natal philopatry model (npm) simulates the evolution of natal dispersal.
Daughters either stay on the patch where they were born and join the group of
breeders there, or they leave and try their luck as floaters. Whether they
stay depends on their own genetically determined tendency to stay, and on the
tendency of the resident breeders to accept them. Both tendencies may depend on
group size and on dominance rank. The model generates time series of allele
frequencies and demographic statistics for offline analysis.

*/

/**
Every stochastic draw of one simulation comes from one stream of this type,
owned by that simulation. Independent repetitions own independent streams.
*/
pub type SimRng = rand_chacha::ChaCha8Rng;

pub mod error;

/**
# 2. Entities, state variables, and scales

The model consists of individuals living on a fixed set of habitat patches in
discrete time. Space has no further structure: every patch can be reached from
every other patch equally well.

## 2.1 Individuals

Every individual carries six real-valued loci, in two copies inherited from its
mother and its father, and the phenotype expressed from them. The first three
loci (A0, A1, A2) describe how readily a breeder accepts offspring into her
group, the other three (B0, B1, B2) how readily an offspring stays.
*/
pub mod alleles;
pub mod individual;

/**
## 2.2 Patches

A patch holds a group of female breeders, ordered by dominance rank, and at
most one resident male. A patch without breeders is empty, whether or not a
male is still around.
*/
pub mod patch;

/**
## 2.3 Population

The population owns all patches, the number of which never changes, and two
pools of floaters: individuals that hold no place on any patch.
*/
pub mod population;

/**
# 3. Process overview and scheduling

Time advances in ticks. Within a tick, every patch in turn

 1. reproduces,
 2. disperses its offspring, polling every daughter whether she may stay, and
 3. suffers mortality among its residents.

After all patches are done, both floater pools are shuffled and thinned out by
mortality, female floaters (and, with resident males, male floaters) colonize
patches, and finally every individual ages by one tick.

The way the first two steps and the colonization work is chosen by four
strategy selectors before the run and stays fixed for the whole run.
*/
pub mod simulation;
pub mod strategy;

/**
# 4. Design concepts

## 4.1 Basic principles

Natal philopatry is a conflict of interests. A daughter staying at home gains
the relative safety of an established group, but competes with her mother and
sisters for reproduction. The breeders gain helpers, but share the fecundity of
the patch. The model lets both parties have a say, with different rules for
how the breeders' opinions are combined into one verdict.

## 4.2 Emergence

Group sizes, the distribution of mothers' ranks among breeders, and the
frequency of takeovers emerge from the evolved dispersal and acceptance
behaviour.

## 4.3 Adaptation

There is no adaptation within the life of an individual. Behaviour changes only
by selection on the alleles.

## 4.4 Sensing

Offspring and breeders know the current size of their group and their own rank
in it.

## 4.5 Stochasticity

Fecundity, sex, inheritance, mutation, the dispersal decision, mortality, the
number of visits a patch receives from floaters, and the success of a takeover
are all random. The order of floaters is shuffled every tick.

## 4.6 Observation

The simulation offers a read-only snapshot of the population after every tick.
Observers write the result file and report progress on the console. They never
touch the random stream, so running with or without observers gives the same
trajectory.
*/
pub mod observation;

/**
# 5. Initialization

A fraction of the patches, rounded up, starts with a single founder breeder,
and with residency mating also with a founder male. All founders carry the
masked initial allele configuration on both copies. The male floater pool
starts with a configurable number of founders, the female floater pool is
empty.

# 6. Input data

The model uses no input data. The parameters come from the command line,
optionally on top of a JSON parameter file.
*/
pub mod cli;
pub mod parameters;

/**
# 7. Submodels

The submodels live with the entities they act on: fecundity, the dispersal
votes, survival and colonization of a patch in [`patch`], the population-wide
colonization pass in [`population`], and inheritance in [`individual`].
*/
mod debug;

pub use error::{ConfigError, ObservationError};
pub use parameters::Parameters;
pub use population::TakeoverStats;
pub use simulation::Simulation;
