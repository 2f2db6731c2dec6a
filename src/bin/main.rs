//! Command-line adapter (SPEC_FULL.md §2.1 item 9, §6).
//!
//! Reads Adblock Plus syntax from stdin or `--input`, classifies each
//! line via `blocklist_compiler::parser`, feeds the results to a
//! `Compiler`, and writes the resulting rule list as JSON to stdout or
//! `--output`. Per-filter drops are silent by design (§7); the only
//! thing that produces a non-zero exit code here is an I/O failure
//! reading the input or writing the output.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use blocklist_compiler::{parser, Compiler, CompilerConfig, MergeMode};

#[derive(Parser, Debug)]
#[command(
    name = "blocklist-compiler",
    about = "Compiles Adblock Plus style filter lists into WebKit content-blocker rule sets"
)]
struct Cli {
    /// Read filter text from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the JSON rule list to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Rule-set optimizer policy.
    #[arg(long, value_enum, default_value_t = MergeArg::Auto)]
    merge: MergeArg,

    /// Maximum comma-joined selectors per css-display-none rule.
    #[arg(long, default_value_t = 5000)]
    selector_limit: usize,

    /// How many later rules the approximate merge considers per rule
    /// in heuristic mode.
    #[arg(long, default_value_t = 1000)]
    heuristic_window: usize,

    /// Pretty-print the JSON output instead of writing it compact.
    #[arg(long)]
    pretty: bool,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum MergeArg {
    Off,
    Auto,
    All,
}

impl From<MergeArg> for MergeMode {
    fn from(value: MergeArg) -> Self {
        match value {
            MergeArg::Off => MergeMode::Off,
            MergeArg::Auto => MergeMode::Auto,
            MergeArg::All => MergeMode::All,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("blocklist-compiler: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> io::Result<()> {
    let config = CompilerConfig {
        merge: cli.merge.into(),
        selector_limit: cli.selector_limit,
        heuristic_window: cli.heuristic_window,
    };
    let mut compiler = Compiler::new(config);

    let text = read_input(cli.input.as_deref())?;
    for line in text.lines() {
        if let Some(filter) = parser::parse_line(line) {
            compiler.add_filter(filter);
        }
    }

    let rules = compiler.generate_rules().map_err(|err| {
        io::Error::new(io::ErrorKind::Other, err.to_string())
    })?;
    log::debug!("compiled {} rules", rules.len());

    let json = if cli.pretty {
        serde_json::to_string_pretty(&rules)
    } else {
        serde_json::to_string(&rules)
    }
    .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

    write_output(cli.output.as_deref(), &json)
}

/// Read the whole input from a file or stdin. Filter lists are text
/// files, not unbounded streams, so reading eagerly keeps `run`'s
/// error-handling path simple.
fn read_input(path: Option<&std::path::Path>) -> io::Result<String> {
    let mut text = String::new();
    match path {
        Some(path) => {
            File::open(path)?.read_to_string(&mut text)?;
        }
        None => {
            io::stdin().lock().read_to_string(&mut text)?;
        }
    }
    Ok(text)
}

fn write_output(path: Option<&std::path::Path>, json: &str) -> io::Result<()> {
    match path {
        Some(path) => {
            let mut file = File::create(path)?;
            writeln!(file, "{json}")
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            writeln!(lock, "{json}")
        }
    }
}
