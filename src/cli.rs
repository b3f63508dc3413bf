use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse load-balancer access logs into JSON and filter them with queries
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "ELB_LOGS_CONFIG")]
    pub config: Option<PathBuf>,

    /// When to color error reports
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto, env = "ELB_LOGS_COLOR")]
    pub color: ColorMode,

    /// Increase diagnostic output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode raw access-log lines into one JSON record per line
    Parse {
        /// Log files to decode, in order ("-" for stdin)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Select records from JSON lines with a query expression
    Filter {
        /// Query expression, evaluated once per batch of records
        #[arg(short, long, env = "ELB_LOGS_EXPRESSION")]
        expression: String,

        /// Number of records per batch
        #[arg(short, long, env = "ELB_LOGS_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// JSON-lines files to read; stdin when omitted
        files: Vec<PathBuf>,
    },
    /// Print the storage key prefix and download directory for a partition
    Prefix {
        /// Account identifier that owns the logs
        #[arg(long, env = "ELB_LOGS_ACCOUNT")]
        account: String,

        #[arg(long, env = "ELB_LOGS_REGION")]
        region: Option<String>,

        /// Load balancer name
        #[arg(long)]
        elb: String,

        /// Time partition, e.g. 20150121T01
        #[arg(long)]
        time_prefix: String,

        #[arg(long, env = "ELB_LOGS_BUCKET")]
        bucket: Option<String>,

        /// Directory downloads are placed under
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// List matching keys from a local mirror of the bucket
        #[arg(long)]
        mirror: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
