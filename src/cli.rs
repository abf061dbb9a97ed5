use crate::observation::{Columns, ReportSettings};
use crate::parameters::Parameters;
use argparse::action::Action::Single;
use argparse::action::ParseResult;
use argparse::action::ParseResult::{Error, Parsed};
use argparse::action::TypedAction;
use argparse::action::{Action, IArgAction};
use std::cell::RefCell;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

/// Store a count given as a possibly scientific number, such as `1e6`.
pub struct StoreScientificAction<'a> {
    pub cell: Rc<RefCell<&'a mut usize>>,
}

pub fn scientific_count(arg: &str) -> Option<usize> {
    match f64::from_str(arg) {
        Ok(x) if x.is_finite() && x >= 0. && x.fract() == 0. && x <= usize::MAX as f64 => {
            Some(x as usize)
        }
        _ => None,
    }
}

impl<'a> IArgAction for StoreScientificAction<'a> {
    fn parse_arg(&self, arg: &str) -> ParseResult {
        match scientific_count(arg) {
            Some(x) => {
                **self.cell.borrow_mut() = x;
                Parsed
            }
            None => Error(format!("Bad value {}", arg)),
        }
    }
}

pub struct StoreScientific;

impl TypedAction<usize> for StoreScientific {
    fn bind<'x>(&self, cell: Rc<RefCell<&'x mut usize>>) -> Action<'x> {
        Single(Box::new(StoreScientificAction { cell }))
    }
}

/// Like `argparse::Store`, but the parse error tells what went wrong.
pub struct StoreParsedAction<'a, T> {
    pub cell: Rc<RefCell<&'a mut T>>,
}

impl<'a, T: FromStr> IArgAction for StoreParsedAction<'a, T>
where
    T::Err: Display,
{
    fn parse_arg(&self, arg: &str) -> ParseResult {
        match T::from_str(arg) {
            Ok(x) => {
                **self.cell.borrow_mut() = x;
                Parsed
            }
            Err(e) => Error(e.to_string()),
        }
    }
}

pub struct StoreParsed;

impl<T: 'static + FromStr> TypedAction<T> for StoreParsed
where
    T::Err: Display,
{
    fn bind<'x>(&self, cell: Rc<RefCell<&'x mut T>>) -> Action<'x> {
        Single(Box::new(StoreParsedAction { cell }))
    }
}

/// Everything the command line controls besides the model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub config: String,
    pub file: String,
    pub report: ReportSettings,
    pub clog: usize,
    pub columns: Columns,
    pub verbose: bool,
    pub rep: usize,
    pub rep_offset: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            config: String::new(),
            file: String::new(),
            report: ReportSettings::default(),
            clog: 1000,
            columns: Columns::default(),
            verbose: false,
            rep: 1,
            rep_offset: 0,
        }
    }
}

impl Options {
    /// The console columns, all of them when verbose.
    pub fn columns(&self) -> Columns {
        if self.verbose {
            Columns::all()
        } else {
            self.columns
        }
    }

    /// The repetitions to run, numbered from the offset.
    pub fn repetitions(&self) -> std::ops::Range<usize> {
        self.rep_offset..self.rep_offset + self.rep
    }

    /// Result file of repetition `r`. With several repetitions, the
    /// repetition number (counting from 1) is appended to the file stem.
    pub fn result_file(&self, r: usize) -> PathBuf {
        repetition_file(Path::new(&self.file), r, self.rep + self.rep_offset)
    }
}

pub fn repetition_file(file: &Path, r: usize, repetitions: usize) -> PathBuf {
    if repetitions <= 1 {
        return file.to_path_buf();
    }
    let mut name = file.file_stem().unwrap_or_default().to_os_string();
    name.push(format!("_{}", r + 1));
    if let Some(ext) = file.extension() {
        name.push(".");
        name.push(ext);
    }
    file.with_file_name(name)
}

/// The parameter file named on the command line, if any. It has to be read
/// before the other options are parsed, so they can override it.
pub fn config_file<S: AsRef<str>>(args: &[S]) -> Option<String> {
    let mut args = args.iter().map(|a| a.as_ref());
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(str::to_string);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

pub fn parse_args<'a>(p: &'a mut Parameters, o: &'a mut Options) -> argparse::ArgumentParser<'a> {
    let mut parser = argparse::ArgumentParser::new();
    parser.set_description("Run the natal philopatry model");
    parser.refer(&mut o.config).add_option(
        &["--config"],
        argparse::Store,
        "JSON parameter file; other options override its values",
    );
    parser
        .refer(&mut o.file)
        .add_option(&["--file"], argparse::Store, "result file")
        .required();
    parser.refer(&mut p.mating).add_option(
        &["--mode"],
        StoreParsed,
        "mating mode: random or residency",
    );
    parser.refer(&mut p.placement).add_option(
        &["--oplacement"],
        StoreParsed,
        "placement of retained offspring: back or sort",
    );
    parser.refer(&mut p.offspring_vote).add_option(
        &["--ovote"],
        StoreParsed,
        "offspring vote: ignore or account",
    );
    parser.refer(&mut p.breeder_vote).add_option(
        &["--bvote"],
        StoreParsed,
        "breeder vote: ignore, kin, despotic, egalitarian or hierarchical",
    );
    parser
        .refer(&mut p.patches)
        .add_option(&["--m"], argparse::Store, "number of patches");
    parser.refer(&mut p.initial_occupancy).add_option(
        &["--m0"],
        argparse::Store,
        "initially occupied patches, in percent",
    );
    parser.refer(&mut p.initial_male_floaters).add_option(
        &["--nmf"],
        argparse::Store,
        "initial number of male floaters",
    );
    parser
        .refer(&mut p.fecundity)
        .add_option(&["--F0"], argparse::Store, "baseline fecundity");
    parser
        .refer(&mut p.phi)
        .add_option(&["--phi"], argparse::Store, "scramble competition in F(n,R)");
    parser
        .refer(&mut p.delta)
        .add_option(&["--delta"], argparse::Store, "contest competition in F(n,R)");
    parser
        .refer(&mut p.k)
        .add_option(&["--k"], argparse::Store, "helping in F(n,R)");
    parser.refer(&mut p.alleles).add_option(
        &["--alleles"],
        StoreParsed,
        "initial alleles A0 A1 A2 B0 B1 B2",
    );
    parser
        .refer(&mut p.mask)
        .add_option(&["--mask"], StoreParsed, "masking factor per locus");
    parser.refer(&mut p.survival_breeder).add_option(
        &["--Sb"],
        argparse::Store,
        "baseline survival probability of breeders",
    );
    parser.refer(&mut p.survival_male).add_option(
        &["--Sm"],
        argparse::Store,
        "baseline survival probability of resident males",
    );
    parser.refer(&mut p.survival_female_floater).add_option(
        &["--Sff"],
        argparse::Store,
        "survival probability of female floaters",
    );
    parser.refer(&mut p.survival_male_floater).add_option(
        &["--Smf"],
        argparse::Store,
        "survival probability of male floaters",
    );
    parser.refer(&mut p.survival_max).add_option(
        &["--Smax"],
        argparse::Store,
        "maximum survival (longevity)",
    );
    parser
        .refer(&mut p.sigma)
        .add_option(&["--sigma"], argparse::Store, "shape of the survival baseline");
    parser.refer(&mut p.gamma).add_option(
        &["--gamma"],
        argparse::Store,
        "group size dependence of survival",
    );
    parser
        .refer(&mut p.search_efficiency)
        .add_option(&["--eps"], argparse::Store, "patch search efficiency");
    parser
        .refer(&mut p.takeover)
        .add_option(&["--t0"], argparse::Store, "baseline takeover probability");
    parser.refer(&mut p.defense).add_option(
        &["--tau"],
        argparse::Store,
        "benefit of communal territory defense",
    );
    parser
        .refer(&mut p.mutation_probability)
        .add_option(&["--mu"], argparse::Store, "mutation probability");
    parser.refer(&mut p.mutation_scale).add_option(
        &["--mutation-scale"],
        argparse::Store,
        "scale of the Cauchy mutation distribution",
    );
    parser.refer(&mut p.ticks).add_option(
        &["--ticks"],
        StoreScientific,
        "number of ticks to simulate, e.g. 1e6",
    );
    parser.refer(&mut p.seed).add_option(
        &["--seed"],
        argparse::StoreOption,
        "random seed; repetition r uses seed + r",
    );
    parser.refer(&mut o.report.log).add_option(
        &["--log"],
        argparse::Store,
        "report interval in ticks, 0 for the last tick only",
    );
    parser.refer(&mut o.report.precision).add_option(
        &["--precision"],
        argparse::Store,
        "decimal places of alleles in the result file",
    );
    parser.refer(&mut o.report.alleles_last_only).add_option(
        &["--alleles-last-only"],
        argparse::StoreTrue,
        "report alleles for the last tick only",
    );
    parser
        .refer(&mut o.clog)
        .add_option(&["--clog"], argparse::Store, "console log interval in ticks");
    parser
        .refer(&mut o.verbose)
        .add_option(&["-v", "--verbose"], argparse::StoreTrue, "show all console columns");
    parser
        .refer(&mut o.columns.time)
        .add_option(&["--ot"], argparse::StoreTrue, "show the tick");
    parser
        .refer(&mut o.columns.group_size)
        .add_option(&["--og"], argparse::StoreTrue, "show the mean group size");
    parser
        .refer(&mut o.columns.males)
        .add_option(&["--om"], argparse::StoreTrue, "show the mean number of males");
    parser.refer(&mut o.columns.female_floaters).add_option(
        &["--off"],
        argparse::StoreTrue,
        "show the number of female floaters",
    );
    parser.refer(&mut o.columns.male_floaters).add_option(
        &["--omf"],
        argparse::StoreTrue,
        "show the number of male floaters",
    );
    parser
        .refer(&mut o.columns.alleles)
        .add_option(&["--oa"], argparse::StoreTrue, "show the mean phenotype");
    parser.refer(&mut o.columns.xy).add_option(
        &["--oxy"],
        argparse::StoreTrue,
        "show the mean x and y of first daughters",
    );
    parser
        .refer(&mut o.columns.takeovers)
        .add_option(&["--oto"], argparse::StoreTrue, "show takeover rates");
    parser.refer(&mut o.columns.profile).add_option(
        &["--oprof"],
        argparse::StoreTrue,
        "show the wall time per console interval",
    );
    parser
        .refer(&mut o.rep)
        .add_option(&["--rep"], argparse::Store, "number of repetitions");
    parser.refer(&mut o.rep_offset).add_option(
        &["--rep-offset"],
        argparse::Store,
        "number of the first repetition",
    );
    parser
}
