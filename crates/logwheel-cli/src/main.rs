#![forbid(unsafe_code)]

use clap::Parser;
use logwheel_core::config::load_settings;
use logwheel_core::{LineSource, RotatingWriter, WheelError, WheelSettings, pump};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "logwheel: write stdin to a log file, rotating it by size",
    long_about = "Reads lines from stdin and appends them to a log file. When the next \
                  line would push the file past --max-bytes, the file is renamed to \
                  <log>.<nanosecond-timestamp> and a new one is started. Only the newest \
                  --max-old-files rotated files are kept.",
    after_help = "EXAMPLES:\n    # Rotate an app's stdout at 50 MiB, keeping two old files\n    ./app | logwheel --log /var/log/app/log\n\n    # Small files, longer history, fsync on rotation\n    ./app | logwheel --log app.log --max-bytes 1048576 --max-old-files 10 --durable"
)]
struct Cli {
    /// Write logs to this path. Rotated files get a timestamp suffix.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Keep this many of the most recent rotated files and delete the others.
    /// [default: 2]
    #[arg(long, value_name = "N")]
    max_old_files: Option<usize>,

    /// Rotate log files at this size in bytes. [default: 52428800]
    #[arg(long, value_name = "BYTES")]
    max_bytes: Option<u64>,

    /// Fsync the log file before rotating it and on exit.
    #[arg(long, overrides_with = "no_durable")]
    durable: bool,

    /// Skip the fsync even if the config file sets `durable = true`.
    #[arg(long, overrides_with = "durable")]
    no_durable: bool,

    /// Read settings from a TOML file. Flags override file values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Settings given on the command line; unset flags stay `None`.
    fn settings(&self) -> WheelSettings {
        WheelSettings {
            log: self.log.clone(),
            max_old_files: self.max_old_files,
            max_bytes: self.max_bytes,
            durable: match (self.durable, self.no_durable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
        }
    }

    /// Layer flags over the config file (if any) over defaults.
    fn resolve(&self) -> anyhow::Result<logwheel_core::RotationConfig> {
        let file = match &self.config {
            Some(path) => load_settings(path)?,
            None => WheelSettings::default(),
        };
        let config = self.settings().merge(file).resolve()?;
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOGWHEEL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "logwheel=debug,info"
        } else {
            "logwheel=info,warn"
        })
    });

    let format = env::var("LOGWHEEL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Diagnostics always go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.resolve()?;
    debug!(?config, "resolved settings");

    let writer = RotatingWriter::open(config)?;
    let stats = pump(LineSource::new(io::stdin()), writer)?;
    info!(lines = stats.lines_written, rotations = stats.rotations, "input closed");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let result = run(&cli);

    if let Some(err) = result.as_ref().err().and_then(|e| e.downcast_ref::<WheelError>()) {
        let code = err.code();
        match code.hint() {
            Some(hint) => error!(code = %code, hint, "{}", code.message()),
            None => error!(code = %code, "{}", code.message()),
        }
    }

    result
}
