// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! `nvctl`: configuration, compilation and fitting of NV experiments from
//! the command line.
//!
//! ```bash
//! nvctl config defaults --out config.json
//! nvctl config set config.json x180_len_NV 48
//! nvctl compile time-rabi --config config.json --start 16 --stop 100 --step 4
//! nvctl run pulsed-odmr --out p_odmr.expt
//! nvctl fit p_odmr.expt lorentzian 1 80 0.5 --lower 0
//! ```
//!
//! `run` executes against the in-process dry-run runtime and mock signal
//! generators. Set `RUST_LOG` to override the log levels.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use nv_analysis::{Bounds, DataFitter, Model};
use nv_experiment::presets::{
    DEFAULT_CW_WAIT_NS, default_odmr_frequencies, default_rabi_amplitudes, default_rabi_durations,
};
use nv_experiment::runtime::dry_run::DryRunConnector;
use nv_experiment::{
    ConfigNv, ConnectOptions, ExecuteOptions, Experiment, LogPlotter, NvParameters, SequenceError,
};
use nv_units::{MHZ, NS, arange};

#[derive(Parser)]
#[command(name = "nvctl")]
#[command(about = "NV-centre magnetic resonance experiments", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v debug with diagnostics, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, edit and inspect configuration files
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Print the real-time program of a preset sequence
    Compile(SequenceArgs),

    /// Execute a preset on the dry-run runtime and save the experiment
    Run {
        #[command(flatten)]
        sequence: SequenceArgs,

        /// Experiment file to write
        #[arg(long)]
        out: PathBuf,
    },

    /// Fit the contrast of a saved experiment
    Fit {
        /// Experiment file written by `run` or a saved experiment
        experiment: PathBuf,

        /// gaussian, lorentzian or exp_damped_cosine
        model: Model,

        /// Initial parameters; all ones when omitted
        #[arg(allow_negative_numbers = true)]
        initial: Vec<f64>,

        /// Lower bound applied to every parameter
        #[arg(long, default_value_t = f64::NEG_INFINITY, allow_negative_numbers = true)]
        lower: f64,

        /// Upper bound applied to every parameter
        #[arg(long, default_value_t = f64::INFINITY, allow_negative_numbers = true)]
        upper: f64,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the default constants, or write them to a file
    Defaults {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Change one constant of a configuration file in place
    Set {
        file: PathBuf,
        name: String,
        /// JSON value; anything that does not parse is taken as a string
        value: String,
    },

    /// Print a configuration file
    Show {
        file: PathBuf,

        /// Print the derived hardware document instead of the constants
        #[arg(long)]
        hardware: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    CwOdmr,
    TimeRabi,
    PowerRabi,
    PulsedOdmr,
}

impl Preset {
    /// Unit of `--start`, `--stop` and `--step`: MHz for frequency sweeps,
    /// ns for durations, a plain factor for amplitudes.
    fn unit(self) -> f64 {
        match self {
            Preset::CwOdmr | Preset::PulsedOdmr => MHZ,
            Preset::TimeRabi => NS,
            Preset::PowerRabi => 1.0,
        }
    }

    fn default_sweep(self) -> Vec<f64> {
        match self {
            Preset::CwOdmr | Preset::PulsedOdmr => default_odmr_frequencies(),
            Preset::TimeRabi => default_rabi_durations(),
            Preset::PowerRabi => default_rabi_amplitudes(),
        }
    }

    fn apply(self, expt: &mut Experiment, sweep: &[f64]) -> Result<(), SequenceError> {
        match self {
            Preset::CwOdmr => expt.setup_cw_odmr(sweep, None, DEFAULT_CW_WAIT_NS, 1.0),
            Preset::TimeRabi => expt.setup_time_rabi(sweep),
            Preset::PowerRabi => expt.setup_power_rabi(sweep),
            Preset::PulsedOdmr => expt.setup_pulsed_odmr(sweep, 1.0),
        }
    }
}

#[derive(Args, Debug)]
struct SequenceArgs {
    preset: Preset,

    /// Configuration file; the built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, requires_all = ["stop", "step"], allow_negative_numbers = true)]
    start: Option<f64>,

    #[arg(long, requires_all = ["start", "step"], allow_negative_numbers = true)]
    stop: Option<f64>,

    #[arg(long, requires_all = ["start", "stop"])]
    step: Option<f64>,

    /// Number of averages
    #[arg(long, default_value_t = 100_000)]
    n_avg: u32,

    /// Measure both spin states instead of the contrast against a reference
    #[arg(long)]
    dual: bool,
}

impl SequenceArgs {
    fn sweep(&self) -> Vec<f64> {
        match (self.start, self.stop, self.step) {
            (Some(start), Some(stop), Some(step)) => {
                let unit = self.preset.unit();
                arange(start * unit, stop * unit, step * unit)
            }
            _ => self.preset.default_sweep(),
        }
    }

    fn load_config(&self) -> Result<ConfigNv> {
        match &self.config {
            Some(path) => ConfigNv::from_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display())),
            None => Ok(ConfigNv::from_parameters(NvParameters::default())),
        }
    }

    fn experiment(&self, config: ConfigNv) -> Result<Experiment> {
        let mut expt = Experiment::new(config);
        self.preset
            .apply(&mut expt, &self.sweep())
            .with_context(|| format!("Invalid {:?} sequence", self.preset))?;
        Ok(expt)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("nv.rust", level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
    nv_log::init_logging(verbose > 0);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Config(command) => run_config(command),
        Commands::Compile(sequence) => {
            print!("{}", compile(&sequence)?);
            Ok(())
        }
        Commands::Run { sequence, out } => {
            dry_run(&sequence, &out)?;
            println!("Saved {}", out.display());
            Ok(())
        }
        Commands::Fit {
            experiment,
            model,
            initial,
            lower,
            upper,
        } => fit(&experiment, model, &initial, &Bounds::uniform(lower, upper)),
    }
}

fn run_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Defaults { out: Some(out) } => {
            let mut config = ConfigNv::from_parameters(NvParameters::default());
            config.try_save(Some(&out))?;
            println!("Saved {}", out.display());
        }
        ConfigCommands::Defaults { out: None } => {
            let config = ConfigNv::from_parameters(NvParameters::default());
            println!("{}", serde_json::to_string_pretty(&config.to_json()?)?);
        }
        ConfigCommands::Set { file, name, value } => {
            let value = set_config_value(&file, &name, &value)?;
            println!("{name} = {value}");
        }
        ConfigCommands::Show { file, hardware } => {
            let config = ConfigNv::from_file(&file)
                .with_context(|| format!("Failed to load configuration {}", file.display()))?;
            if hardware {
                println!("{}", serde_json::to_string_pretty(config.hardware())?);
            } else {
                println!("{config}");
            }
        }
    }
    Ok(())
}

/// Sets `name` in the configuration at `path` and writes it back.
fn set_config_value(path: &Path, name: &str, value: &str) -> Result<serde_json::Value> {
    let mut config = ConfigNv::from_file(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    config.set_value(name, value)?;
    config.try_save(None)?;
    config
        .get_value(name)
        .with_context(|| format!("{name} missing after update"))
}

fn compile(sequence: &SequenceArgs) -> Result<String> {
    let expt = sequence.experiment(sequence.load_config()?)?;
    let program = expt.create_program(sequence.n_avg, !sequence.dual)?;
    Ok(program.to_string())
}

fn dry_run(sequence: &SequenceArgs, out: &Path) -> Result<()> {
    let connector = DryRunConnector::new();
    let mut config = sequence.load_config()?;
    config.connect(ConnectOptions::default(), &connector)?;
    let mut expt = sequence.experiment(config)?;
    let options = ExecuteOptions {
        n_avg: sequence.n_avg,
        measure_contrast: !sequence.dual,
        live_plot: false,
    };
    expt.execute(options, &mut LogPlotter)?;
    expt.try_save(out)?;
    Ok(())
}

fn fit(path: &Path, model: Model, initial: &[f64], bounds: &Bounds) -> Result<()> {
    let expt = Experiment::try_load(path)
        .with_context(|| format!("Failed to load experiment {}", path.display()))?;
    let mut fitter = DataFitter::new(&expt)?;
    let initial = (!initial.is_empty()).then_some(initial);
    let Some(result) = fitter.fit(model, initial, bounds).cloned() else {
        bail!("Fitting {model} to {} failed", path.display());
    };
    let errors = result.std_errors();
    for ((name, value), error) in model.param_names().iter().zip(&result.params).zip(errors) {
        println!("{name:>10} = {value:.6} ± {error:.6}");
    }
    fitter.plot_fit(model, &mut LogPlotter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn sequence(args: &[&str]) -> SequenceArgs {
        let mut argv = vec!["nvctl", "compile"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Compile(sequence) => sequence,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fit() {
        let cli = Cli::try_parse_from([
            "nvctl", "fit", "p.expt", "exp_damped_cosine", "1", "0.1", "0.2", "-0.5", "--lower", "-2",
        ])
        .unwrap();
        let Commands::Fit {
            model,
            initial,
            lower,
            upper,
            ..
        } = cli.command
        else {
            panic!("expected fit");
        };
        assert_eq!(model, Model::ExpDampedCosine);
        assert_eq!(initial, vec![1.0, 0.1, 0.2, -0.5]);
        assert_eq!(lower, -2.0);
        assert!(upper.is_infinite());

        assert!(Cli::try_parse_from(["nvctl", "fit", "p.expt", "voigt"]).is_err());
    }

    #[test]
    fn test_partial_range_is_rejected() {
        assert!(Cli::try_parse_from(["nvctl", "compile", "time-rabi", "--start", "16"]).is_err());
    }

    #[test]
    fn test_sweep_units() {
        let odmr = sequence(&["pulsed-odmr", "--start", "75", "--stop", "85", "--step", "0.2"]);
        let sweep = odmr.sweep();
        assert_eq!(sweep.len(), 50);
        assert_eq!(sweep[0], 75e6);

        let rabi = sequence(&["time-rabi"]);
        assert_eq!(rabi.sweep(), default_rabi_durations());
    }

    #[test]
    fn test_compile_presets() {
        let text = compile(&sequence(&["power-rabi", "--n-avg", "10"])).unwrap();
        assert!(text.starts_with("program {"));
        assert!(text.contains("var = declare(fixed);"));

        let dual = compile(&sequence(&["time-rabi", "--dual"])).unwrap();
        assert!(dual.contains("counts1"));
        let single = compile(&sequence(&["time-rabi"])).unwrap();
        assert!(!single.contains("counts1"));

        assert!(compile(&sequence(&["cw-odmr", "--start", "60", "--stop", "60", "--step", "1"])).is_err());
    }

    #[test]
    fn test_config_set_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        ConfigNv::from_parameters(NvParameters::default())
            .try_save(Some(&path))
            .unwrap();

        let value = set_config_value(&path, "x180_len_NV", "48").unwrap();
        assert_eq!(value, serde_json::json!(48));
        let value = set_config_value(&path, "qop_ip", "10.0.0.1").unwrap();
        assert_eq!(value, serde_json::json!("10.0.0.1"));
        assert!(set_config_value(&path, "no_such_constant", "1").is_err());

        let config = ConfigNv::from_file(&path).unwrap();
        assert_eq!(config.parameters().x180_len_nv, 48);
        assert_eq!(config.parameters().qop_ip, "10.0.0.1");
        assert_eq!(config.hardware().operation("NV", "x180").unwrap().length, 48);

        let compiled = compile(&sequence(&["power-rabi", "--config", path.to_str().unwrap()])).unwrap();
        assert!(compiled.contains("duration=12"));
    }

    #[test]
    fn test_dry_run_writes_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("rabi.expt");
        dry_run(&sequence(&["time-rabi", "--n-avg", "10"]), &out).unwrap();

        let expt = Experiment::try_load(&out).unwrap();
        assert_eq!(expt.results().counts0.as_ref().unwrap().len(), 21);
        assert_eq!(expt.labels().title, "Time Rabi");
        assert!(DataFitter::new(&expt).is_ok());
    }
}
