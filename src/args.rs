//! Argument parsing for running from the command line

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wave_slurper::chunk::MAX_CHUNK_SIZE;
use wave_slurper::output::{OutputConfig, Precision};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert Siglent SDS preamble and waveform data into a table
    Sds(SdsArgs),
    /// Convert Tektronix TDS preamble and curve data into a table
    Tds(TdsArgs),
    /// Stitch the transfers of a multi-chunk download into one data file
    Join(JoinArgs),
}

#[derive(clap::Args, Debug)]
pub struct SdsArgs {
    /// Result of a :WAVeform:PREamble? query, applies to all data files
    #[clap(short, long, value_parser)]
    pub preamble: PathBuf,
    #[clap(flatten)]
    pub output: OutputArgs,
    /// Results of :WAVeform:DATA? queries, one voltage column each
    #[clap(required = true, value_parser)]
    pub data: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct TdsArgs {
    /// Result of a WFMPRe? query
    #[clap(short, long, value_parser)]
    pub preamble: PathBuf,
    #[clap(flatten)]
    pub output: OutputArgs,
    /// Result of a CURVe? query
    #[clap(value_parser)]
    pub data: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct OutputArgs {
    /// Output file, a single dash for stdout
    #[clap(short, long, value_parser)]
    pub output: PathBuf,
    /// Field separator (`\t` for tab)
    #[clap(short, long, default_value = ",", value_parser = parse_separator)]
    pub separator: String,
    /// Don't print column titles
    #[clap(long, action)]
    pub no_title: bool,
    /// Don't print the time column
    #[clap(long, action)]
    pub no_time: bool,
    /// Print raw sample codes instead of voltages
    #[clap(short, long, action)]
    pub ints: bool,
    /// Digits after the decimal point (default: full precision)
    #[clap(long, value_parser)]
    pub precision: Option<usize>,
}

impl OutputArgs {
    pub fn config(&self) -> OutputConfig {
        OutputConfig {
            separator: self.separator.clone(),
            emit_header: !self.no_title,
            emit_calibrated_voltage: !self.ints,
            emit_time_column: !self.no_time,
            precision: self.precision.map_or(Precision::Full, Precision::Fixed),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct JoinArgs {
    /// Total points in the acquisition (:ACQuire:POINts?)
    #[clap(short = 'n', long, value_parser)]
    pub points: usize,
    /// Points requested per transfer
    #[clap(short = 'x', long, default_value_t = MAX_CHUNK_SIZE, value_parser = valid_chunk_size)]
    pub chunk_size: usize,
    /// Bytes per sample
    #[clap(short, long, default_value_t = 1)]
    #[clap(value_parser = clap::value_parser!(u8).range(1..=2))]
    pub width: u8,
    /// Output data file
    #[clap(short, long, value_parser)]
    pub output: PathBuf,
    /// Transfer files, in download order
    #[clap(required = true, value_parser)]
    pub transfers: Vec<PathBuf>,
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}

fn parse_separator(s: &str) -> Result<String, String> {
    match s {
        "" => Err("Separator can't be empty".to_string()),
        "\\t" => Ok("\t".to_string()),
        _ => Ok(s.to_string()),
    }
}

fn valid_chunk_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if (1..=MAX_CHUNK_SIZE).contains(&n) => Ok(n),
        _ => Err(format!("Expected a chunk size in 1..={MAX_CHUNK_SIZE}")),
    }
}
