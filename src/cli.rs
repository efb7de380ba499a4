use crate::{mixture::EmParams, util::Result};
use anyhow::anyhow;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use log::{Level, LevelFilter, Record};
use once_cell::sync::Lazy;
use owo_colors::{OwoColorize, Style};
use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
};

/// Full version string including the crate version and git description.
///
/// # Examples
/// * `0.1.0-1ba958a-dirty` - while on a dirty branch
/// * `0.1.0-1ba958a` - with a fresh commit
/// * `0.1.0` - when built outside a git checkout
pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    #[cfg(has_git_describe)]
    let git_describe = env!("VERGEN_GIT_DESCRIBE");
    #[cfg(not(has_git_describe))]
    let git_describe = "";
    if git_describe.is_empty() {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        format!("{}-{}", env!("CARGO_PKG_VERSION"), git_describe)
    }
});

#[derive(Parser, Debug)]
#[command(name="abcontam",
          version=&**FULL_VERSION,
          about="Allele-balance based sample contamination estimator",
          long_about = None,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,

    /// Silence all output
    #[arg(
        long = "quiet",
        action = ArgAction::SetTrue,
        global = true,
        conflicts_with = "verbosity",
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract allele-balance features from a single VCF
    Extract(ExtractArgs),
    /// Extract features from VCFs with known contamination into a training table
    TrainingData(TrainingDataArgs),
    /// Fit the contamination regression model
    Train(TrainArgs),
    /// Predict the contamination fraction of a VCF
    Predict(PredictArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Extract(_) => "extract",
            Command::TrainingData(_) => "training-data",
            Command::Train(_) => "train",
            Command::Predict(_) => "predict",
        }
    }
}

/// Mixture model fitting options shared by every extracting subcommand.
#[derive(Args, Debug, Clone)]
pub struct EmArgs {
    /// Starting log-space means of the two lognormal components
    #[arg(
        help_heading("Advanced"),
        long = "em-init-means",
        value_name = "MU1,MU2",
        default_value = "0.0,0.5",
        value_parser = parse_initial_means
    )]
    pub initial_means: (f64, f64),

    /// Starting log-space standard deviation of both components
    #[arg(
        help_heading("Advanced"),
        long = "em-init-scale",
        value_name = "SD",
        default_value = "1.0",
        value_parser = parse_positive_float
    )]
    pub initial_scale: f64,

    /// Stop once the log-likelihood improves by less than this amount
    #[arg(
        help_heading("Advanced"),
        long = "em-tolerance",
        value_name = "TOL",
        default_value = "1e-6",
        value_parser = parse_non_negative_float
    )]
    pub tolerance: f64,

    /// Maximum number of EM iterations
    #[arg(
        help_heading("Advanced"),
        long = "em-max-iter",
        value_name = "N",
        default_value = "1000",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_iterations: u32,
}

impl EmArgs {
    pub fn params(&self) -> EmParams {
        EmParams {
            initial_means: self.initial_means,
            initial_scale: self.initial_scale,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations as usize,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct ExtractArgs {
    /// Bgzipped and indexed VCF/BCF to characterise
    #[arg(
        required = true,
        long = "vcf",
        value_name = "VCF",
        value_parser = check_file_exists
    )]
    pub vcf: PathBuf,

    /// BED file of tag SNPs over which to characterise allele balance
    #[arg(
        required = true,
        short = 'l',
        long = "loci",
        value_name = "BED",
        value_parser = check_file_exists
    )]
    pub loci: PathBuf,

    /// Only read this sample from the VCF (default: all samples)
    #[arg(short = 's', long = "sample", value_name = "NAME")]
    pub sample: Option<String>,

    /// Output tsv path (default: stdout)
    #[arg(short = 'o', long = "out", value_name = "TSV", value_parser = check_prefix_path)]
    pub output_path: Option<String>,

    /// Value reported for mean/median bad MAF when no anomalous calls were seen
    #[arg(help_heading("Advanced"), long = "empty-fill", value_name = "VALUE")]
    pub empty_fill: Option<f64>,

    #[command(flatten)]
    pub em: EmArgs,
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct TrainingDataArgs {
    /// Two-column file: VCF path and known contamination fraction per line
    #[arg(
        required = true,
        short = 'i',
        long = "inputlist",
        value_name = "FILE",
        value_parser = check_file_exists
    )]
    pub input_list: PathBuf,

    /// BED file containing the loci over which to extract the features
    #[arg(
        required = true,
        short = 'l',
        long = "loci",
        value_name = "BED",
        value_parser = check_file_exists
    )]
    pub loci: PathBuf,

    /// Output tsv path
    #[arg(
        required = true,
        short = 'o',
        long = "out",
        value_name = "TSV",
        value_parser = check_prefix_path
    )]
    pub output_path: String,

    #[arg(
        short = '@',
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub num_threads: usize,

    /// Value reported for mean/median bad MAF when no anomalous calls were seen
    #[arg(help_heading("Advanced"), long = "empty-fill", value_name = "VALUE")]
    pub empty_fill: Option<f64>,

    #[command(flatten)]
    pub em: EmArgs,
}

#[derive(Parser, Debug, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["training_data", "input_list"])))]
#[command(arg_required_else_help(true))]
pub struct TrainArgs {
    /// Training table with extracted features
    #[arg(long = "training-data", value_name = "TSV", value_parser = check_file_exists)]
    pub training_data: Option<PathBuf>,

    /// Two-column file of VCF paths and contamination fractions to extract features from
    #[arg(
        short = 'i',
        long = "inputlist",
        value_name = "FILE",
        value_parser = check_file_exists,
        requires_all = ["loci", "extracted_features"]
    )]
    pub input_list: Option<PathBuf>,

    /// BED file containing the loci over which to extract the features
    #[arg(short = 'l', long = "loci", value_name = "BED", value_parser = check_file_exists)]
    pub loci: Option<PathBuf>,

    /// Where to write the features extracted from --inputlist
    #[arg(
        long = "extracted-features",
        value_name = "TSV",
        value_parser = check_prefix_path
    )]
    pub extracted_features: Option<String>,

    /// Output path of the serialized model
    #[arg(
        required = true,
        short = 'o',
        long = "out",
        value_name = "JSON",
        value_parser = check_prefix_path
    )]
    pub output_path: String,

    /// Ridge penalty applied to the standardized coefficients
    #[arg(
        long = "lambda",
        value_name = "LAMBDA",
        default_value = "1.0",
        value_parser = parse_non_negative_float
    )]
    pub lambda: f64,

    #[arg(
        short = '@',
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub num_threads: usize,

    #[command(flatten)]
    pub em: EmArgs,
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct PredictArgs {
    /// Serialized model produced by `train`
    #[arg(
        required = true,
        short = 'm',
        long = "model",
        value_name = "JSON",
        value_parser = check_file_exists
    )]
    pub model: PathBuf,

    /// VCF from which to extract features and predict contamination
    #[arg(
        required = true,
        long = "vcf",
        value_name = "VCF",
        value_parser = check_file_exists
    )]
    pub vcf: PathBuf,

    /// BED file containing loci over which to extract features
    #[arg(
        required = true,
        short = 'l',
        long = "loci",
        value_name = "BED",
        value_parser = check_file_exists
    )]
    pub loci: PathBuf,

    /// Only read this sample from the VCF (default: all samples)
    #[arg(short = 's', long = "sample", value_name = "NAME")]
    pub sample: Option<String>,

    #[command(flatten)]
    pub em: EmArgs,
}

/// Initializes the verbosity level for logging based on the command-line arguments.
///
/// Sets up the logger with a specific verbosity level that is determined
/// by the number of occurrences of the `-v` or `--verbose` flag in the command-line arguments.
pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = if args.quiet {
        LevelFilter::Off
    } else {
        match args.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .format(format_log)
        .filter_level(filter_level)
        .init();
}

static LEVEL_STYLES: Lazy<HashMap<Level, (&'static str, Style)>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(Level::Error, ("ERROR", Style::new().red()));
    m.insert(Level::Warn, ("WARN", Style::new().yellow()));
    m.insert(Level::Info, ("INFO", Style::new().green()));
    m.insert(Level::Debug, ("DEBUG", Style::new().blue()));
    m.insert(Level::Trace, ("TRACE", Style::new().magenta()));
    m
});

fn format_log(buf: &mut env_logger::fmt::Formatter, record: &Record) -> std::io::Result<()> {
    let level_str = match LEVEL_STYLES.get(&record.level()) {
        Some((level_text, style)) => level_text.style(*style).to_string(),
        None => record.level().to_string(),
    };
    writeln!(
        buf,
        "{} [{}] - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        level_str,
        record.args()
    )
}

/// Checks that the parent directory of an output path exists.
fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(anyhow!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

/// Validates that the provided string represents a valid number of threads.
fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse::<usize>()
        .map_err(|_| anyhow!("`{}` is not a valid thread number", s))?;
    if thread == 0 {
        return Err(anyhow!("Number of threads must be >= 1"));
    }
    Ok(thread)
}

/// Checks if the provided file path exists.
fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(anyhow!("File does not exist: {}", path.display()));
    }
    Ok(path.to_path_buf())
}

fn parse_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| anyhow!("Could not parse float: {}", e))?;
    if !value.is_finite() {
        return Err(anyhow!("The value must be finite, got: {}", s));
    }
    Ok(value)
}

fn parse_positive_float(s: &str) -> Result<f64> {
    let value = parse_float(s)?;
    if value <= 0.0 {
        return Err(anyhow!("The value must be > 0.0, got: {}", value));
    }
    Ok(value)
}

fn parse_non_negative_float(s: &str) -> Result<f64> {
    let value = parse_float(s)?;
    if value < 0.0 {
        return Err(anyhow!("The value must be >= 0.0, got: {}", value));
    }
    Ok(value)
}

/// Parses `MU1,MU2` into the two starting component means.
fn parse_initial_means(s: &str) -> Result<(f64, f64)> {
    const NUM_EXPECTED_VALUES: usize = 2;
    let values = s
        .split(',')
        .map(|x| parse_float(x.trim()))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != NUM_EXPECTED_VALUES {
        return Err(anyhow!(
            "Expected {} comma-separated values for the initial means. Got {} -> {}",
            NUM_EXPECTED_VALUES,
            values.len(),
            s
        ));
    }
    if values[0] == values[1] {
        return Err(anyhow!(
            "Initial means must be distinct, got {} twice",
            values[0]
        ));
    }
    Ok((values[0], values[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_initial_means() {
        assert_eq!(parse_initial_means("0.0,0.5").unwrap(), (0.0, 0.5));
        assert_eq!(parse_initial_means(" -1, 2 ").unwrap(), (-1.0, 2.0));
        assert!(parse_initial_means("0.5").is_err());
        assert!(parse_initial_means("0.5,0.5").is_err());
        assert!(parse_initial_means("a,1").is_err());
    }

    #[test]
    fn float_validators() {
        assert!(parse_positive_float("0").is_err());
        assert!(parse_non_negative_float("0").is_ok());
        assert!(parse_non_negative_float("-1e-3").is_err());
        assert!(parse_float("inf").is_err());
    }

    #[test]
    fn thread_validation() {
        assert_eq!(threads_in_range("4").unwrap(), 4);
        assert!(threads_in_range("0").is_err());
        assert!(threads_in_range("x").is_err());
    }

    #[test]
    fn em_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["abcontam", "train", "--training-data", "Cargo.toml", "-o", "m.json"])
            .unwrap();
        match cli.command {
            Command::Train(args) => assert_eq!(args.em.params(), EmParams::default()),
            other => panic!("unexpected command {}", other.name()),
        }
    }

    #[test]
    fn train_requires_a_source() {
        assert!(Cli::try_parse_from(["abcontam", "train", "-o", "m.json"]).is_err());
        assert!(Cli::try_parse_from([
            "abcontam",
            "train",
            "--inputlist",
            "Cargo.toml",
            "-o",
            "m.json"
        ])
        .is_err());
    }
}
