impl std::fmt::Debug for crate::individual::Individual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Individual")
            .field("phenotype", &format_args!("{}", &self.phenotype))
            .field("inherited", &self.inherited)
            .field("age", &self.age)
            .field("mother_rank", &self.mother_rank)
            .finish()
    }
}

impl std::fmt::Debug for crate::patch::Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patch")
            .field("breeders", &self.size())
            .field("male", &self.male().is_some())
            .field("verdicts", &self.verdicts().len())
            .finish()
    }
}

impl std::fmt::Debug for crate::population::Population {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Population")
            .field("patches", &self.patches().len())
            .field("occupied", &self.occupied_patches().count())
            .field("female_floaters", &self.female_floaters().len())
            .field("male_floaters", &self.male_floaters().len())
            .finish()
    }
}

impl std::fmt::Debug for crate::simulation::Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick())
            .field("takeovers", &self.takeovers())
            .field("population", self.population())
            .finish()
    }
}
