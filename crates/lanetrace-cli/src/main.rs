use chrono::NaiveDate;
use lanetrace::{
    ColumnMap, Diagnostics, Engine, Individual, Ingested, PipelineConfig, PipelineError, Summary,
    read_csv, read_json,
};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Lanetrace(lanetrace::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Lanetrace(err) => write!(f, "{err}"),
            CliError::Pipeline(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<lanetrace::Error> for CliError {
    fn from(value: lanetrace::Error) -> Self {
        Self::Lanetrace(value)
    }
}

impl From<PipelineError> for CliError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Classify,
    Layout,
    Flow,
    Paths,
    Diagnostics,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    now: Option<NaiveDate>,
    width: Option<f64>,
    height: Option<f64>,
    json_input: bool,
    pretty: bool,
}

#[derive(Serialize)]
struct ClassifyOut<'a> {
    individuals: &'a [Individual],
    summary: &'a Summary,
    diagnostics: &'a Diagnostics,
}

fn usage() -> &'static str {
    "lanetrace-cli\n\
\n\
USAGE:\n\
  lanetrace-cli classify [--config <path>] [--now YYYY-MM-DD] [--json] [--pretty] [<path>|-]\n\
  lanetrace-cli layout [--config <path>] [--now YYYY-MM-DD] [--width <w>] [--height <h>] [--json] [--pretty] [<path>|-]\n\
  lanetrace-cli flow [--config <path>] [--now YYYY-MM-DD] [--json] [--pretty] [<path>|-]\n\
  lanetrace-cli paths [--config <path>] [--now YYYY-MM-DD] [--width <w>] [--height <h>] [--json] [<path>|-]\n\
  lanetrace-cli diagnostics [--config <path>] [--now YYYY-MM-DD] [--json] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input is CSV unless --json is given or the path ends in .json.\n\
  - --config accepts JSON or YAML (.yaml/.yml).\n\
  - paths prints one `<id>\\t<svg path data>` line per individual.\n\
  - diagnostics prints one line per diagnostic.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_dimension(raw: &str) -> Result<f64, CliError> {
    let v = raw.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
    if !(v.is_finite() && v > 0.0) {
        return Err(CliError::Usage(usage()));
    }
    Ok(v)
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "classify" => args.command = Command::Classify,
            "layout" => args.command = Command::Layout,
            "flow" => args.command = Command::Flow,
            "paths" => args.command = Command::Paths,
            "diagnostics" => args.command = Command::Diagnostics,
            "--pretty" => args.pretty = true,
            "--json" => args.json_input = true,
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--now" => {
                let raw = next_value(&mut it)?;
                args.now = Some(
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--width" => args.width = Some(parse_dimension(next_value(&mut it)?)?),
            "--height" => args.height = Some(parse_dimension(next_value(&mut it)?)?),
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn ingest(args: &Args, columns: &ColumnMap) -> Result<Ingested, CliError> {
    let text = read_input(args.input.as_deref())?;
    let is_json = args.json_input
        || args
            .input
            .as_deref()
            .is_some_and(|p| p.to_ascii_lowercase().ends_with(".json"));
    let ingested = if is_json {
        read_json(&text)?
    } else {
        read_csv(&text, columns)?
    };
    Ok(ingested)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    use std::io::Write as _;
    writeln!(out)?;
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match args.config.as_deref() {
        Some(path) => PipelineConfig::load(Path::new(path))?,
        None => PipelineConfig::default(),
    };
    let columns = config.columns.clone();
    let mut engine = Engine::new(config);
    if args.now.is_some() {
        engine = engine.with_fixed_now(args.now);
    }
    if args.width.is_some() || args.height.is_some() {
        let vp = &engine.config().viewport;
        let (w, h) = (args.width.unwrap_or(vp.width), args.height.unwrap_or(vp.height));
        engine.set_viewport(w, h);
    }

    let ingested = ingest(&args, &columns)?;
    match args.command {
        Command::Classify => {
            engine.config().classify.validate()?;
            let mut diagnostics = ingested.diagnostics;
            let individuals = engine.classify(&ingested.records, &mut diagnostics);
            let summary = Summary::from_individuals(&individuals, engine.registry());
            write_json(
                &ClassifyOut {
                    individuals: &individuals,
                    summary: &summary,
                    diagnostics: &diagnostics,
                },
                args.pretty,
            )
        }
        Command::Layout => {
            let out = engine.run_ingested(ingested)?;
            write_json(&out, args.pretty)
        }
        Command::Flow => {
            let out = engine.run_ingested(ingested)?;
            write_json(&out.flow, args.pretty)
        }
        Command::Paths => {
            let out = engine.run_ingested(ingested)?;
            for ind in &out.individuals {
                println!("{}\t{}", ind.id, ind.path_data);
            }
            Ok(())
        }
        Command::Diagnostics => {
            let out = engine.run_ingested(ingested)?;
            for d in out.diagnostics.iter() {
                println!("{d}");
            }
            Ok(())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
