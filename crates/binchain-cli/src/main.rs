/// binchain command-line tool: decode words and run extraction layouts
/// against binary files.
///
/// # Command overview
///
/// ```text
/// binchain <COMMAND> [OPTIONS]
///
/// Commands:
///   words   Decode every word operation at an offset
///   run     Run a layout against a file and print the captured values
///   help    Print help information
///
/// Global options:
///   -v, --verbose    Log parser activity at debug level (stderr)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                          |
/// |------|--------------------------------------------------|
/// | 0    | Success (a stalled stream parse is still success) |
/// | 1    | Error (I/O failure, bad layout, parse failure)   |
///
/// Logs and error details go to stderr so stdout can be piped cleanly.
use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cmd_run;
mod cmd_words;
mod layout;
mod report;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// The binchain command-line tool.
#[derive(Parser)]
#[command(name = "binchain", version, about = "Declarative binary extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log parser activity at debug level. Overrides `RUST_LOG`.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Decode every word operation at an offset.
    Words(WordsArgs),
    /// Run a layout against a file and print the captured values.
    Run(RunArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `binchain words`.
///
/// Prints one row per word operation: its canonical name, byte width and
/// the value it decodes at `--offset`. Operations that would read past the
/// end of the file show `-`.
#[derive(clap::Args)]
pub struct WordsArgs {
    /// File to read.
    pub file: PathBuf,

    /// Byte offset to decode at.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

/// Arguments for `binchain run`.
///
/// ```text
/// ┌──────────────────┬───────────────────────────────────────────────────┐
/// │ Flag             │ Effect                                            │
/// ├──────────────────┼───────────────────────────────────────────────────┤
/// │ --layout L       │ steps to run, see below                           │
/// │ --stream         │ feed the file through the stream parser           │
/// │ --chunk-size N   │ chunk size in stream mode (default 4096)          │
/// │ --scan-limit N   │ bytes `find` may skip (default 1 MiB)             │
/// │ --json           │ print the report as JSON                          │
/// └──────────────────┴───────────────────────────────────────────────────┘
/// ```
///
/// Layout steps are separated by whitespace or commas:
///
/// ```text
/// word16le:len         word read, any word-op name
/// buffer:body:len      byte slice, length literal or variable name
/// skip:4               discard bytes, length literal or variable name
/// find:cafe            skip past the next occurrence of hex bytes
/// flush                drop every captured value
/// ```
#[derive(clap::Args)]
pub struct RunArgs {
    /// File to parse.
    pub file: PathBuf,

    /// Layout to run, e.g. `"word16be:len buffer:body:len"`.
    #[arg(short, long)]
    pub layout: String,

    /// Use the stream parser instead of the buffer parser.
    #[arg(long)]
    pub stream: bool,

    /// Chunk size for stream mode.
    #[arg(long, default_value_t = 4096)]
    pub chunk_size: usize,

    /// Maximum bytes `find` may skip before giving up.
    #[arg(long)]
    pub scan_limit: Option<usize>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Words(args) => cmd_words::run(&args),
        Commands::Run(args) => cmd_run::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
