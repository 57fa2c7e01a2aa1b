use std::{fs, process::ExitCode};

use clap::{Parser, Subcommand};
use tpn::{
    data::read_events,
    table::{read_parquet, write_hit_pools_parquet, write_parquet, WriteOptions},
    threshold_scan, AnalysisConfig, CutFlow, EfficiencySummary, FeatureExtractor, FrozenTable,
    PlotBattery, TpnResult,
};
use tracing::{error, info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Logging verbosity (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<Level>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract features from an event file and write every report
    Run {
        /// JSON-lines event file
        #[arg(value_name = "EVENTS")]
        events: String,

        /// Path to config TOML (defaults are used if the file does not exist)
        #[arg(long, default_value = "tpn.toml")]
        config: String,

        /// Output directory (overrides config)
        #[arg(long)]
        output: Option<String>,

        /// Output file prefix (overrides config)
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Print the veto summary and cut flow of a previously written feature table
    Summarize {
        /// Parquet file written by `run`
        #[arg(value_name = "TABLE")]
        table: String,

        /// Path to config TOML for the cut-flow thresholds
        #[arg(long, default_value = "tpn.toml")]
        config: String,
    },
}

fn init_tracing(level: Option<Level>) {
    let filter = match level {
        Some(level) => EnvFilter::default().add_directive(LevelFilter::from_level(level).into()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::INFO.into())),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn log_scans(config: &AnalysisConfig, table: &FrozenTable) -> TpnResult<()> {
    for scan in &config.scans {
        let values = table.column(scan.column);
        for (cut, percent) in threshold_scan(values, scan.min, scan.max, scan.step, scan.invert)? {
            info!(column = %scan.column, cut, percent, invert = scan.invert, "threshold scan");
        }
    }
    Ok(())
}

fn run(
    events: &str,
    config: &str,
    output: Option<String>,
    prefix: Option<String>,
) -> TpnResult<()> {
    let mut config = AnalysisConfig::load_or_default(config)?;
    if let Some(output) = output {
        config.output.directory = output;
    }
    if let Some(prefix) = prefix {
        config.output.file_prefix = prefix;
    }
    let events = read_events(events)?;
    let extractor = FeatureExtractor::new(config.extractor.clone());
    let table = extractor.process_all(&events)?.finalize();

    fs::create_dir_all(&config.output.directory)?;
    if config.output.write_parquet {
        let options = WriteOptions::default()
            .batch_size(config.output.batch_size)
            .precision(config.output.precision);
        write_parquet(&table, &config.output.path_for(".parquet"), &options)?;
        write_hit_pools_parquet(
            &table,
            &config.output.path_for("_ecal_hits.parquet"),
            &config.output.path_for("_hcal_hits.parquet"),
            &options,
        )?;
    }

    let summary = EfficiencySummary::from_table(&table)?;
    print!("{summary}");

    let cutflow = CutFlow::from_table(&table, &config.cutflow)?;
    let results_path = config.output.path_for("_results.txt");
    fs::write(&results_path, cutflow.to_string())?;
    info!(path = %results_path, "wrote cut flow");

    if config.output.write_histograms {
        let battery = PlotBattery::build(&table)?;
        let histograms_path = config.output.path_for("_histograms.json");
        fs::write(&histograms_path, serde_json::to_vec_pretty(&battery)?)?;
        info!(
            path = %histograms_path,
            n_histograms = battery.histograms.len(),
            n_histograms_2d = battery.histograms_2d.len(),
            "wrote histogram battery"
        );
    }

    log_scans(&config, &table)
}

fn summarize(table: &str, config: &str) -> TpnResult<()> {
    let config = AnalysisConfig::load_or_default(config)?;
    let table = read_parquet(table)?;
    print!("{}", EfficiencySummary::from_table(&table)?);
    print!("{}", CutFlow::from_table(&table, &config.cutflow)?);
    log_scans(&config, &table)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level);
    let result = match args.command {
        Command::Run {
            events,
            config,
            output,
            prefix,
        } => run(&events, &config, output, prefix),
        Command::Summarize { table, config } => summarize(&table, &config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
