use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use seama::container::{
    self, BuildOptions, ExtractOptions, InspectOptions, DEFAULT_ALIGNMENT, DEFAULT_META_CAPACITY,
};
use seama::{PayloadOp, Seekable, Sequential, Source};
use std::error::Error;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "seama", about = "Inspect, build and extract Seama firmware seals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show seal metadata and list its entities
    Info {
        /// Seal to read, `-` for standard input
        input: PathBuf,
        /// Describe only this entity
        #[arg(short = 'e', long)]
        entity: Option<u32>,
        /// Reject metadata blocks of this many bytes or more
        #[arg(long, default_value_t = DEFAULT_META_CAPACITY)]
        meta_capacity: usize,
        /// Print a JSON document instead of the tab-separated listing
        #[arg(long)]
        json: bool,
    },
    /// Create a single entity
    Entity {
        output: PathBuf,
        /// Metadata string to put in the entity
        #[arg(short = 'm', long = "meta")]
        meta: Vec<String>,
        /// Append the contents of a file
        #[arg(short = 'f', long = "file")]
        file: Vec<PathBuf>,
        /// Append zeros until reaching this absolute offset (0x.. hex, 0.. octal)
        #[arg(short = 'b', long = "pad", value_parser = parse_offset)]
        pad: Vec<u64>,
        /// Pad each metadata string to this boundary
        #[arg(long, default_value_t = DEFAULT_ALIGNMENT)]
        alignment: u32,
    },
    /// Copy one entity out of a seal
    Extract {
        /// Seal to read, `-` for standard input
        input: PathBuf,
        /// Index of the entity to extract
        #[arg(short = 'e', long)]
        entity: u32,
        /// Output file (standard output when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("seama: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, entity, meta_capacity, json } => {
            let opts = InspectOptions { index: entity, meta_capacity };
            let report = container::inspect(open_source(&input)?, &opts)?;
            let mut out = io::stdout().lock();
            if json {
                writeln!(out, "{}", report.to_json()?)?;
            } else {
                report.write_text(&mut out)?;
            }
        }

        // ── Entity ───────────────────────────────────────────────────────────
        Commands::Entity { output, meta, alignment, .. } => {
            // -f and -b are replayed in command-line order, so rebuild the
            // interleaving from argument indices.
            let sub = matches
                .subcommand_matches("entity")
                .ok_or("entity arguments missing")?;
            let ops = payload_ops(sub);
            container::build_file(&output, &meta, &ops, &BuildOptions { alignment })
                .map_err(|e| format!("{}: {e}", output.display()))?;
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, entity, output } => {
            let source = open_source(&input)?;
            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path).map_err(|e| format!("Couldn't open {}: {e}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            container::extract(source, &mut out, &ExtractOptions { index: entity })?;
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_source(path: &Path) -> Result<Box<dyn Source>, Box<dyn Error>> {
    if path == Path::new("-") {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return Err("Reading from TTY stdin is unsupported".into());
        }
        return Ok(Box::new(Sequential::new(stdin.lock())));
    }
    let file = File::open(path).map_err(|e| format!("Couldn't open {}: {e}", path.display()))?;
    Ok(Box::new(Seekable::new(file)))
}

fn payload_ops(matches: &ArgMatches) -> Vec<PayloadOp> {
    let mut ops: Vec<(usize, PayloadOp)> = Vec::new();
    if let (Some(idx), Some(files)) = (matches.indices_of("file"), matches.get_many::<PathBuf>("file")) {
        ops.extend(idx.zip(files).map(|(i, f)| (i, PayloadOp::AppendFile(f.clone()))));
    }
    if let (Some(idx), Some(pads)) = (matches.indices_of("pad"), matches.get_many::<u64>("pad")) {
        ops.extend(idx.zip(pads).map(|(i, &p)| (i, PayloadOp::PadToOffset(p))));
    }
    ops.sort_by_key(|(i, _)| *i);
    ops.into_iter().map(|(_, op)| op).collect()
}

/// Parse an offset the way `strtol(s, NULL, 0)` would.
fn parse_offset(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid offset '{s}': {e}"))
}
