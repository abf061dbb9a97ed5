use std::fs::{self, File};
use std::io::BufWriter;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

use model::cli::{config_file, parse_args, Options};
use model::observation::{ConsoleLog, RReport};
use model::parameters::Parameters;
use model::simulation::Simulation;
use model::SimRng;

fn load_parameters(path: &str) -> Result<Parameters> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Could not read parameter file {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Malformed parameter file {}", path))
}

/// One repetition, with its own random stream and its own result file.
fn repetition(p: &Parameters, o: &Options, r: usize) -> Result<()> {
    let _span = info_span!("repetition", r = r + 1).entered();
    let rng = match p.seed {
        Some(seed) => SimRng::seed_from_u64(seed.wrapping_add(r as u64)),
        None => SimRng::from_entropy(),
    };
    let mut sim = Simulation::new(p.clone(), rng)?;

    let file = o.result_file(r);
    if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Could not create directory {}", dir.display()))?;
    }
    let out = File::create(&file)
        .with_context(|| format!("Could not create result file {}", file.display()))?;
    let absolute = fs::canonicalize(&file).unwrap_or_else(|_| file.clone());

    let mut report = RReport::new(BufWriter::new(out), o.report.clone());
    report.header(p, &absolute, r)?;
    let mut observers = (report, ConsoleLog::new(o.clog, o.columns()));
    sim.run(&mut observers)
        .with_context(|| format!("Could not write result file {}", file.display()))?;
    info!(file = %file.display(), "repetition done");
    Ok(())
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut p = match config_file(&args) {
        Some(path) => load_parameters(&path)?,
        None => Parameters::default(),
    };
    let mut o = Options::default();
    {
        let parser = parse_args(&mut p, &mut o);
        parser.parse_args_or_exit();
    }
    p.validate()?;

    o.repetitions()
        .into_par_iter()
        .try_for_each(|r| repetition(&p, &o, r))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::observation::Columns;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn console_lines_name_their_repetition() {
        let p = Parameters {
            patches: 5,
            ticks: 3,
            seed: Some(1),
            ..Parameters::default()
        };
        let file = std::env::temp_dir().join("npm-console-test").join("run.R");
        let o = Options {
            file: file.to_string_lossy().into_owned(),
            clog: 1,
            rep: 2,
            columns: Columns {
                time: true,
                ..Columns::default()
            },
            ..Options::default()
        };
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || repetition(&p, &o, 1)).unwrap();

        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines = text.lines().filter(|l| l.contains("observation")).collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.contains("repetition{r=2}")));
        assert!(o.result_file(1).exists());
    }
}
