/*!
Observation of a running simulation.

After every tick the simulation offers a read-only [`Snapshot`] to an
[`Observer`]. Observers decide for themselves whether a tick is worth looking
at, and whatever they compute never feeds back into the model.
*/
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use itertools::Itertools;
use tracing::info;

use crate::alleles::{Alleles, LOCI};
use crate::error::ObservationError;
use crate::parameters::Parameters;
use crate::patch::Verdict;
use crate::population::{Population, TakeoverStats};

/// The state of the population after one tick.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    /// index of the tick just completed, starting at 0
    pub tick: usize,
    /// whether this is the final tick of the run
    pub last: bool,
    pub population: &'a Population,
    /// cumulative takeover statistics
    pub takeovers: TakeoverStats,
}

impl<'a> Snapshot<'a> {
    /// Mean phenotype over every individual alive, floaters included.
    pub fn mean_phenotype(&self) -> Alleles {
        let (sum, count) = self
            .population
            .individuals()
            .fold((Alleles::default(), 0usize), |(sum, count), ind| {
                (sum + ind.phenotype, count + 1)
            });
        if count == 0 {
            sum
        } else {
            sum / count as f64
        }
    }

    pub fn group_sizes(&self) -> impl Iterator<Item = usize> + 'a {
        self.population.patches().iter().map(|patch| patch.size())
    }

    pub fn resident_males(&self) -> impl Iterator<Item = bool> + 'a {
        self.population
            .patches()
            .iter()
            .map(|patch| patch.male().is_some())
    }

    /// The verdicts on all daughters born this tick on patches that are still
    /// occupied.
    pub fn verdicts(&self) -> impl Iterator<Item = &'a Verdict> + 'a {
        self.population
            .occupied_patches()
            .flat_map(|patch| patch.verdicts().iter())
    }

    pub fn mother_ranks(&self) -> impl Iterator<Item = u32> + 'a {
        self.population.breeders().map(|b| b.mother_rank)
    }

    /// The maternal (0) or paternal (1) copy of every breeder.
    pub fn breeder_alleles(&self, copy: usize) -> impl Iterator<Item = &'a Alleles> + 'a {
        self.population.breeders().map(move |b| &b.inherited[copy])
    }

    /// Mean (x, y) of the first daughter polled on each occupied patch.
    pub fn mean_first_verdict(&self) -> (f64, f64) {
        let firsts = self
            .population
            .occupied_patches()
            .filter_map(|patch| patch.verdicts().first())
            .collect::<Vec<_>>();
        if firsts.is_empty() {
            return (0., 0.);
        }
        let c = firsts.len() as f64;
        (
            firsts.iter().map(|v| v.x).sum::<f64>() / c,
            firsts.iter().map(|v| v.y).sum::<f64>() / c,
        )
    }

    pub fn female_floaters(&self) -> usize {
        self.population.female_floaters().len()
    }

    pub fn male_floaters(&self) -> usize {
        self.population.male_floaters().len()
    }

    pub fn mean_group_size(&self) -> f64 {
        let patches = self.population.patches();
        self.group_sizes().sum::<usize>() as f64 / patches.len().max(1) as f64
    }

    pub fn mean_males(&self) -> f64 {
        let patches = self.population.patches();
        self.resident_males().filter(|m| *m).count() as f64 / patches.len().max(1) as f64
    }
}

pub trait Observer {
    fn observe(&mut self, snapshot: &Snapshot) -> Result<(), ObservationError>;
}

impl Observer for () {
    fn observe(&mut self, _: &Snapshot) -> Result<(), ObservationError> {
        Ok(())
    }
}

impl<A: Observer, B: Observer> Observer for (A, B) {
    fn observe(&mut self, snapshot: &Snapshot) -> Result<(), ObservationError> {
        self.0.observe(snapshot)?;
        self.1.observe(snapshot)
    }
}

/// Whether the tick is due for a report every `interval` ticks.
fn due(snapshot: &Snapshot, interval: usize) -> bool {
    (interval > 0 && snapshot.tick % interval == 0) || snapshot.last
}

/// Mean takeover statistics per tick since an earlier observation.
fn rate(now: &Snapshot, before: TakeoverStats, since: Option<usize>) -> TakeoverStats {
    let ticks = match since {
        Some(t) => now.tick - t,
        None => now.tick + 1,
    };
    (now.takeovers - before) / ticks.max(1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    /// report interval in ticks; 0 reports the last tick only
    pub log: usize,
    /// digits after the decimal point for alleles and votes
    pub precision: usize,
    /// whether alleles, votes and mother ranks are only written for the last tick
    pub alleles_last_only: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            log: 0,
            precision: 3,
            alleles_last_only: false,
        }
    }
}

/**
The result file is a script in the R language that builds up one list entry
per reported tick, so it can be sourced directly for analysis.
*/
pub struct RReport<W: Write> {
    out: W,
    settings: ReportSettings,
    takeovers: TakeoverStats,
    reported: Option<usize>,
}

impl<W: Write> RReport<W> {
    pub fn new(out: W, settings: ReportSettings) -> Self {
        RReport {
            out,
            settings,
            takeovers: TakeoverStats::default(),
            reported: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self, p: &Parameters, file: &Path, rep: usize) -> Result<(), ObservationError> {
        let o = &mut self.out;
        let c = |a: &Alleles| a.entries.iter().join(", ");
        writeln!(o, "# Natal philopatry model result file")?;
        writeln!(o, "# Version {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(
            o,
            "path <- '{}'",
            file.parent().map(|d| d.display().to_string()).unwrap_or_default()
        )?;
        writeln!(
            o,
            "file <- '{}'",
            file.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default()
        )?;
        writeln!(o, "rep <- {}\n", rep)?;
        writeln!(o, "# Parameter set")?;
        writeln!(o, "m <- {}", p.patches)?;
        writeln!(o, "m0 <- {}", p.initial_occupancy)?;
        writeln!(o, "nmf <- {}", p.initial_male_floaters)?;
        writeln!(o, "F0 <- {}", p.fecundity)?;
        writeln!(o, "phi <- {}", p.phi)?;
        writeln!(o, "delta <- {}", p.delta)?;
        writeln!(o, "k <- {}", p.k)?;
        writeln!(o, "Alleles <- c({})", c(&p.alleles))?;
        writeln!(o, "Mask <- c({})", c(&p.mask))?;
        writeln!(o, "Sb <- {}", p.survival_breeder)?;
        writeln!(o, "Sm <- {}", p.survival_male)?;
        writeln!(o, "Sff <- {}", p.survival_female_floater)?;
        writeln!(o, "Smf <- {}", p.survival_male_floater)?;
        writeln!(o, "Smax <- {}", p.survival_max)?;
        writeln!(o, "sigma <- {}", p.sigma)?;
        writeln!(o, "gamma <- {}", p.gamma)?;
        writeln!(o, "thetaB <- {}", p.theta_breeder())?;
        writeln!(o, "thetaM <- {}", p.theta_male())?;
        writeln!(o, "eps <- {}", p.search_efficiency)?;
        writeln!(o, "t0 <- {}", p.takeover)?;
        writeln!(o, "tau <- {}", p.defense)?;
        writeln!(o, "mu <- {}", p.mutation_probability)?;
        writeln!(o, "mudist <- 'cauchy'")?;
        writeln!(o, "mscale <- {}", p.mutation_scale)?;
        writeln!(o, "mode <- '{}'", p.mating)?;
        writeln!(o, "ovote <- '{}'", p.offspring_vote)?;
        writeln!(o, "bvote <- '{}'", p.breeder_vote)?;
        writeln!(o, "oplacement <- '{}'", p.placement)?;
        writeln!(o, "ticks <- {}", p.ticks)?;
        writeln!(o, "log <- {}", self.settings.log)?;
        writeln!(o, "aloglast <- {}\n", u8::from(self.settings.alleles_last_only))?;
        writeln!(o, "T <- list()        # Vector of log-times\n")?;
        writeln!(o, "# inherited alleles and response of the breeders per log")?;
        writeln!(o, "# Each element in the following lists is a matrix(..., nrow = number alleles)")?;
        writeln!(o, "allele0 <- list()  # maternal alleles A0, A1, A2, B0, B1, B2 per breeder")?;
        writeln!(o, "allele1 <- list()  # paternal alleles A0, A1, A2, B0, B1, B2 per breeder")?;
        writeln!(o, "xynR <- list()     # x(n,R), y(n,R), n and R per polled daughter\n")?;
        writeln!(o, "mrank <- list()    # rank of the breeders mother at birth")?;
        writeln!(o, "gs <- list()       # group sizes")?;
        writeln!(o, "males <- list()    # resident males")?;
        writeln!(o, "takeover <- list() # {{attempted, successful, walk-in}}")?;
        writeln!(o, "fFloater <- list() # number of female floater")?;
        writeln!(o, "mFloater <- list() # number of male floater")?;
        writeln!(o)?;
        Ok(())
    }

    fn write_block(&mut self, s: &Snapshot) -> Result<(), ObservationError> {
        let precision = self.settings.precision;
        let fixed = |v: &f64| format!("{:.*}", precision, v);
        let o = &mut self.out;
        writeln!(o, "T <- cbind(T, {})", s.tick)?;
        if !self.settings.alleles_last_only || s.last {
            for copy in 0..2 {
                writeln!(
                    o,
                    "allele{}[[length(allele{})+1]] = matrix(c({}), nrow={})",
                    copy,
                    copy,
                    s.breeder_alleles(copy)
                        .flat_map(|a| a.entries.iter())
                        .map(fixed)
                        .join(","),
                    LOCI
                )?;
            }
            writeln!(
                o,
                "xynR[[length(xynR)+1]] = matrix(c({}), nrow=4)",
                s.verdicts()
                    .map(|v| format!("{},{},{},{}", fixed(&v.x), fixed(&v.y), v.n, v.rank))
                    .join(",")
            )?;
            writeln!(
                o,
                "mrank[[length(mrank)+1]] = c({})",
                s.mother_ranks().join(",")
            )?;
        }
        writeln!(o, "gs[[length(gs)+1]] = c({})", s.group_sizes().join(","))?;
        writeln!(
            o,
            "males[[length(males)+1]] = c({})",
            s.resident_males().map(u8::from).join(",")
        )?;
        let t = rate(s, self.takeovers, self.reported);
        writeln!(
            o,
            "takeover[[length(takeover)+1]] = c({},{},{})",
            t.attempts, t.takeovers, t.walk_ins
        )?;
        writeln!(o, "fFloater <- cbind(fFloater, {})", s.female_floaters())?;
        writeln!(o, "mFloater <- cbind(mFloater, {})", s.male_floaters())?;
        writeln!(o)?;
        self.takeovers = s.takeovers;
        self.reported = Some(s.tick);
        Ok(())
    }
}

impl<W: Write> Observer for RReport<W> {
    fn observe(&mut self, snapshot: &Snapshot) -> Result<(), ObservationError> {
        if due(snapshot, self.settings.log) {
            self.write_block(snapshot)?;
            if snapshot.last {
                self.out.flush()?;
            }
        }
        Ok(())
    }
}

/// Which columns the console progress shows.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Columns {
    pub time: bool,
    pub group_size: bool,
    pub males: bool,
    pub female_floaters: bool,
    pub male_floaters: bool,
    pub alleles: bool,
    pub xy: bool,
    pub takeovers: bool,
    /// wall time spent since the previous line
    pub profile: bool,
}

impl Columns {
    pub fn all() -> Columns {
        Columns {
            time: true,
            group_size: true,
            males: true,
            female_floaters: true,
            male_floaters: true,
            alleles: true,
            xy: true,
            takeovers: true,
            profile: true,
        }
    }

    pub fn any(&self) -> bool {
        *self != Columns::default()
    }
}

/// Progress on the console, through `tracing`.
pub struct ConsoleLog {
    interval: usize,
    columns: Columns,
    takeovers: TakeoverStats,
    logged: Option<usize>,
    since: Instant,
}

impl ConsoleLog {
    pub fn new(interval: usize, columns: Columns) -> ConsoleLog {
        ConsoleLog {
            interval,
            columns,
            takeovers: TakeoverStats::default(),
            logged: None,
            since: Instant::now(),
        }
    }

    /// The progress line for a snapshot, in the selected columns.
    pub fn line(&self, s: &Snapshot) -> String {
        let c = &self.columns;
        let mut fields = vec![];
        if c.time {
            fields.push(s.tick.to_string());
        }
        if c.group_size {
            fields.push(format!("{:.4}", s.mean_group_size()));
        }
        if c.males {
            fields.push(format!("{:.4}", s.mean_males()));
        }
        if c.female_floaters {
            fields.push(s.female_floaters().to_string());
        }
        if c.male_floaters {
            fields.push(s.male_floaters().to_string());
        }
        if c.alleles {
            fields.push(
                s.mean_phenotype()
                    .entries
                    .iter()
                    .map(|v| format!("{:.4}", v))
                    .join(" "),
            );
        }
        if c.xy {
            let (x, y) = s.mean_first_verdict();
            fields.push(format!("{:.4} {:.4}", x, y));
        }
        if c.takeovers {
            let t = rate(s, self.takeovers, self.logged);
            fields.push(format!("{} {} {}", t.attempts, t.takeovers, t.walk_ins));
        }
        if c.profile {
            fields.push(format!("{:.3}s", self.since.elapsed().as_secs_f64()));
        }
        fields.join("  ")
    }
}

impl Observer for ConsoleLog {
    fn observe(&mut self, snapshot: &Snapshot) -> Result<(), ObservationError> {
        if !self.columns.any() || !due(snapshot, self.interval) {
            return Ok(());
        }
        info!(tick = snapshot.tick, "{}", self.line(snapshot));
        self.takeovers = snapshot.takeovers;
        self.logged = Some(snapshot.tick);
        self.since = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulation;
    use crate::SimRng;
    use rand::SeedableRng;

    fn small() -> Parameters {
        Parameters {
            patches: 4,
            initial_occupancy: 50.,
            ticks: 3,
            ..Parameters::default()
        }
    }

    #[test]
    fn statistics_of_the_initial_population() {
        let p = small();
        let population = Population::new(&p);
        let s = Snapshot {
            tick: 0,
            last: false,
            population: &population,
            takeovers: TakeoverStats::default(),
        };
        assert_eq!(s.mean_phenotype(), p.alleles);
        assert_eq!(s.group_sizes().collect::<Vec<_>>(), vec![1, 1, 0, 0]);
        assert_eq!(s.mean_group_size(), 0.5);
        assert_eq!(s.mean_males(), 0.);
        assert_eq!(s.mother_ranks().collect::<Vec<_>>(), vec![0, 0]);
        assert_eq!(s.verdicts().count(), 0);
        assert_eq!(s.mean_first_verdict(), (0., 0.));
    }

    #[test]
    fn report_blocks_follow_the_interval() {
        let p = Parameters {
            ticks: 5,
            survival_breeder: 1.,
            survival_max: 1.,
            ..small()
        };
        let settings = ReportSettings {
            log: 2,
            precision: 2,
            alleles_last_only: true,
        };
        let mut report = RReport::new(vec![], settings);
        report.header(&p, Path::new("out/result.R"), 0).unwrap();
        let mut sim = Simulation::new(p, SimRng::seed_from_u64(5)).unwrap();
        sim.run(&mut report).unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.starts_with("# Natal philopatry model result file\n"));
        assert!(text.contains("path <- 'out'\nfile <- 'result.R'\n"));
        assert!(text.contains("bvote <- 'despotic'\n"));
        // ticks 0, 2 and the last one, 4
        assert_eq!(text.matches("T <- cbind(T, ").count(), 3);
        assert!(text.contains("T <- cbind(T, 4)\n"));
        // alleles only once
        assert_eq!(text.matches("allele0[[").count(), 1);
        assert_eq!(text.matches("gs[[length(gs)+1]] = c(").count(), 3);
        assert!(text.contains("allele0[[length(allele0)+1]] = matrix(c(5.00,"));
    }

    #[test]
    fn console_columns() {
        let p = small();
        let population = Population::new(&p);
        let s = Snapshot {
            tick: 9,
            last: false,
            population: &population,
            takeovers: TakeoverStats {
                attempts: 20,
                takeovers: 10,
                walk_ins: 5,
            },
        };
        let log = ConsoleLog::new(
            10,
            Columns {
                time: true,
                group_size: true,
                takeovers: true,
                ..Columns::default()
            },
        );
        assert_eq!(log.line(&s), "9  0.5000  2 1 0");

        let log = ConsoleLog::new(
            10,
            Columns {
                profile: true,
                ..Columns::default()
            },
        );
        let line = log.line(&s);
        let seconds = line.strip_suffix('s').unwrap();
        assert!(seconds.parse::<f64>().unwrap() >= 0.);
        assert!(!Columns::default().any());
        assert!(Columns::all().any());
    }
}
