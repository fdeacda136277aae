//! AMM stochastic simulation.
//!
//! Runs the step loop against the in-process paper exchange and writes one
//! CSV line per step. Configuration comes from a preset or a JSON file, with
//! individual settings overridable on the command line.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use amm_sim::*;
use anyhow::Context;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Reference,
    Calm,
    Stressed,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Reference => Preset::Reference,
            PresetArg::Calm => Preset::Calm,
            PresetArg::Stressed => Preset::Stressed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Arc4,
    Chacha,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Arc4 => SourceKind::Arc4,
            SourceArg::Chacha => SourceKind::Chacha,
        }
    }
}

/// Stochastic AMM simulation: reference price, arbitrage, random traders, liquidations
#[derive(Parser, Debug)]
#[command(name = "amm-sim")]
#[command(version)]
struct Args {
    /// JSON config file (takes precedence over --preset)
    #[arg(long, env = "SIM_CONFIG")]
    config: Option<PathBuf>,

    /// Built-in parameter set
    #[arg(long, value_enum, default_value = "reference")]
    preset: PresetArg,

    /// Seed string for the uniform source
    #[arg(long, env = "SIM_SEED")]
    seed: Option<String>,

    /// Number of steps
    #[arg(long, env = "SIM_STEPS")]
    steps: Option<u64>,

    /// Risk parameter beta (liquidation at debt ratio 1 - beta/1000)
    #[arg(long, env = "SIM_BETA")]
    beta: Option<u32>,

    /// Uniform generator
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Record file (default sim_{beta}_{steps}.csv)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Write the run summary as JSON here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log every audit event at debug level
    #[arg(long)]
    verbose: bool,

    /// trace, debug, info, warn or error
    #[arg(long, env = "SIM_LOG", default_value = "info")]
    log_level: tracing::Level,
}

impl Args {
    fn sim_config(&self) -> anyhow::Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => Preset::from(self.preset).config(),
        };
        if let Some(seed) = &self.seed {
            config.run.seed = seed.clone();
        }
        if let Some(steps) = self.steps {
            config.run.steps = steps;
        }
        if let Some(beta) = self.beta {
            config.risk.beta = beta;
        }
        if let Some(source) = self.source {
            config.run.source = source.into();
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    let config = args.sim_config().context("invalid configuration")?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(config.output_file_name()));

    let exchange = PaperExchange::from_config(&config).context("cannot seed paper exchange")?;
    let provisioner = SequentialProvisioner::from_config(&config.trader);
    let engine_config = if args.verbose {
        EngineConfig::verbose()
    } else {
        EngineConfig::default()
    };
    let mut engine = Engine::new(config.clone(), engine_config, exchange, provisioner)?;
    let mut state = SimulationState::from_config(&config);

    let file = File::create(&output).with_context(|| format!("cannot create {}", output.display()))?;
    let mut writer = RecordWriter::new(BufWriter::new(file))?;
    let summary = engine.run(&mut state, &mut writer)?;
    writer.finish()?;
    tracing::info!(path = %output.display(), records = summary.steps, "records written");

    if let Some(path) = &args.summary {
        let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)?;
        tracing::info!(path = %path.display(), "summary written");
    }

    Ok(())
}
