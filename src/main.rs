// LogScout - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (explicit --config or the platform default)
// 3. Logging initialisation (debug mode support)
// 4. Dispatch to discover / detect / parse / services
//
// Results are printed to stdout as JSON; diagnostics go to stderr.

use clap::{Parser, Subcommand};
use logscout::app::discover;
use logscout::core::detector;
use logscout::core::parsers::ParserKind;
use logscout::platform::config::{self, AppConfig, PlatformPaths};
use logscout::platform::fs::{FileSystem, LocalFs, PathTranslator};
use logscout::platform::os;
use logscout::util::constants;
use logscout::util::error::{LogScoutError, Result};
use logscout::util::logging;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// LogScout - discover host log files and classify their formats.
///
/// Reads the host's logging-daemon configuration, scans log directories and
/// decides per file which parser can read it, with a confidence score.
#[derive(Parser, Debug)]
#[command(name = "logscout", version, about)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full discovery pass: OS, logging services, scan and classification.
    Discover {
        /// Directory where the host's root filesystem is mounted.
        #[arg(short = 'r', long = "root")]
        root: Option<PathBuf>,

        /// Directory to scan (repeatable; replaces [scan] directories).
        #[arg(long = "dir")]
        dirs: Vec<PathBuf>,
    },

    /// Detect the format of one file and show every library entry's score.
    Detect {
        file: PathBuf,

        /// Number of lines to sample (defaults to [detection] sample_lines).
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
    },

    /// Parse one file with a dialect parser, one JSON record per line.
    Parse {
        file: PathBuf,

        /// syslog, auth, kernel, daemon, mail or journald.
        #[arg(long = "dialect", value_parser = parse_dialect)]
        dialect: ParserKind,

        /// Maximum number of lines to parse.
        #[arg(short = 'l', long = "limit", default_value_t = 1000)]
        limit: usize,
    },

    /// OS identification and detected logging services.
    Services {
        /// Directory where the host's root filesystem is mounted.
        #[arg(short = 'r', long = "root")]
        root: Option<PathBuf>,
    },
}

fn parse_dialect(name: &str) -> std::result::Result<ParserKind, String> {
    ParserKind::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = ParserKind::all().iter().map(|k| k.as_str()).collect();
        format!("unknown dialect '{name}' (expected one of: {})", known.join(", "))
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| LogScoutError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "serialise",
        source: io::Error::other(e),
    })?;
    println!("{text}");
    Ok(())
}

fn read_sample(path: &Path, max_lines: usize) -> Result<Vec<String>> {
    let local = LocalFs::new(PathTranslator::identity());
    local
        .read_lines(path, 0, max_lines)
        .map_err(|source| LogScoutError::Io {
            path: path.to_path_buf(),
            operation: "read",
            source,
        })
}

fn host_fs(root: Option<PathBuf>, config: &AppConfig) -> Arc<dyn FileSystem> {
    let prefix = root.or_else(|| config.mount_prefix.clone());
    Arc::new(LocalFs::new(PathTranslator::new(prefix)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectOutput {
    file: PathBuf,
    detected: Option<detector::DetectedFormat>,
    scores: Vec<detector::EntryScore>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServicesOutput {
    os: logscout::core::model::OsInfo,
    services: Vec<logscout::core::model::DetectedLoggingService>,
    primary_service: logscout::core::model::LoggingServiceType,
}

fn run(command: Command, mut config: AppConfig) -> Result<()> {
    match command {
        Command::Discover { root, dirs } => {
            if !dirs.is_empty() {
                config.scan.directories = dirs;
            }
            let fs = host_fs(root, &config);
            let report = discover::discover(fs, &config);
            for warning in &report.warnings {
                tracing::warn!(warning = %warning, "Discovery warning");
            }
            print_json(&report)
        }
        Command::Detect { file, lines } => {
            let max = lines
                .unwrap_or(config.detection.sample_lines)
                .clamp(1, constants::MAX_SAMPLE_LINES);
            let sample = read_sample(&file, max)?;
            let (library, warnings) = discover::load_library(&config.detection);
            for warning in &warnings {
                tracing::warn!(warning = %warning, "Pattern library warning");
            }
            print_json(&DetectOutput {
                detected: detector::detect_format_with(&library, &sample),
                scores: detector::score_library(&library, &sample),
                file,
            })
        }
        Command::Parse {
            file,
            dialect,
            limit,
        } => {
            let sample = read_sample(&file, limit)?;
            let mut parsed = 0usize;
            for line in &sample {
                if let Some(entry) = dialect.parse_line(line) {
                    let text = serde_json::to_string(&entry).map_err(|e| LogScoutError::Io {
                        path: file.clone(),
                        operation: "serialise",
                        source: io::Error::other(e),
                    })?;
                    println!("{text}");
                    parsed += 1;
                }
            }
            tracing::info!(file = %file.display(), dialect = dialect.as_str(), parsed, "Parse complete");
            Ok(())
        }
        Command::Services { root } => {
            let fs = host_fs(root, &config);
            let os_info = os::detect_os(fs.as_ref());
            let services = os::detect_logging_services(fs.as_ref(), &os_info);
            print_json(&ServicesOutput {
                primary_service: os::get_primary_logging_service(&services),
                os: os_info,
                services,
            })
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Config first: it may carry the log level. An explicitly named config
    // must load; the platform default falls back to defaults with a warning.
    let loaded = match cli.config.as_deref() {
        Some(path) => config::load_config_strict(path),
        None => Ok(config::load_config(&PlatformPaths::resolve().config_file())),
    };
    let (app_config, config_warnings) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            logging::init(cli.debug, None);
            tracing::error!(error = %e, "Failed to load configuration");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init(cli.debug, app_config.log_level.as_deref());
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "LogScout starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    if let Err(e) = run(cli.command, app_config) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
