//! sprocket-mcp: roller chain drive calculations for AI assistants and shells
//!
//! Without a subcommand (or with `serve`) this runs an MCP server on stdio.
//! The other subcommands run one calculation and print the JSON result.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use sprocket_mcp::config;
use sprocket_mcp::mcp::{ChainTools, McpServer};

/// Roller chain drive geometry and sprocket sizing.
///
/// Relates center distance, chain length (in pitches) and tooth counts for
/// two-sprocket chain drives, and finds tooth counts that suit a fixed center
/// distance.
#[derive(Parser, Debug)]
#[command(name = "sprocket-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Chain pitch, in the same unit as distances
    #[arg(short, long, global = true, conflicts_with = "chain", value_parser = finite_f64)]
    pitch: Option<f64>,

    /// ANSI roller chain number (e.g. 25, 40), used instead of --pitch
    #[arg(long, global = true)]
    chain: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server on stdin/stdout (default)
    Serve,

    /// Center distance for a chain of a given length in pitches
    Distance {
        /// Chain length in pitches
        #[arg(value_parser = finite_f64, allow_negative_numbers = true)]
        length_in_pitches: f64,
        /// Tooth count of one sprocket
        teeth_a: u32,
        /// Tooth count of the other sprocket
        teeth_b: u32,
    },

    /// Chain length in pitches needed at a center distance
    Length(PairArgs),

    /// Round a chain length up to an even number of links
    Round {
        /// Exact chain length in pitches
        #[arg(value_parser = finite_f64, allow_negative_numbers = true)]
        length_in_pitches: f64,
    },

    /// Fit a buildable chain at a fixed center distance
    Fit(PairArgs),

    /// Find the best tooth count for one sprocket at a fixed center distance
    Solve(SearchArgs),

    /// Find the best tooth counts for both sprockets at a fixed center distance
    SolveBoth {
        /// Fixed center-to-center distance
        #[arg(value_parser = finite_f64, allow_negative_numbers = true)]
        distance: f64,
        /// Lowest tooth count for the first sprocket
        #[arg(long)]
        min_teeth_a: Option<u32>,
        /// Highest tooth count for the first sprocket
        #[arg(long)]
        max_teeth_a: Option<u32>,
        /// Lowest tooth count for the second sprocket
        #[arg(long)]
        min_teeth_b: Option<u32>,
        /// Highest tooth count for the second sprocket
        #[arg(long)]
        max_teeth_b: Option<u32>,
    },

    /// List every candidate tooth count for one sprocket
    Scan(SearchArgs),
}

#[derive(Args, Debug)]
struct PairArgs {
    /// Center-to-center distance
    #[arg(value_parser = finite_f64, allow_negative_numbers = true)]
    distance: f64,
    /// Tooth count of one sprocket
    teeth_a: u32,
    /// Tooth count of the other sprocket
    teeth_b: u32,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Fixed center-to-center distance
    #[arg(value_parser = finite_f64, allow_negative_numbers = true)]
    distance: f64,
    /// Tooth count of the known sprocket
    fixed_teeth: u32,
    /// Lowest tooth count to try
    #[arg(long)]
    min_teeth: Option<u32>,
    /// Highest tooth count to try
    #[arg(long)]
    max_teeth: Option<u32>,
}

/// Parses a number that JSON can carry.
///
/// serde_json writes NaN and infinities as `null`, which would read as an
/// omitted argument.
fn finite_f64(value: &str) -> Result<f64, String> {
    let number: f64 = value
        .parse()
        .map_err(|e| format!("'{value}' is not a number: {e}"))?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(format!("'{value}' is not a finite number"))
    }
}

impl Command {
    /// Maps a one-shot command onto the MCP tool that implements it.
    ///
    /// Returns `None` for `serve`.
    fn tool_call(&self) -> Option<(&'static str, Value)> {
        let call = match self {
            Self::Serve => return None,
            Self::Distance {
                length_in_pitches,
                teeth_a,
                teeth_b,
            } => (
                "center_distance",
                json!({
                    "length_in_pitches": length_in_pitches,
                    "teeth_a": teeth_a,
                    "teeth_b": teeth_b,
                }),
            ),
            Self::Length(pair) => ("chain_length", pair.arguments()),
            Self::Round { length_in_pitches } => (
                "practical_length",
                json!({ "length_in_pitches": length_in_pitches }),
            ),
            Self::Fit(pair) => ("fit_chain", pair.arguments()),
            Self::Solve(search) => ("solve_sprocket", search.arguments()),
            Self::SolveBoth {
                distance,
                min_teeth_a,
                max_teeth_a,
                min_teeth_b,
                max_teeth_b,
            } => (
                "solve_both_sprockets",
                json!({
                    "distance": distance,
                    "min_teeth_a": min_teeth_a,
                    "max_teeth_a": max_teeth_a,
                    "min_teeth_b": min_teeth_b,
                    "max_teeth_b": max_teeth_b,
                }),
            ),
            Self::Scan(search) => ("scan_sprocket", search.arguments()),
        };
        Some(call)
    }
}

impl PairArgs {
    fn arguments(&self) -> Value {
        json!({
            "distance": self.distance,
            "teeth_a": self.teeth_a,
            "teeth_b": self.teeth_b,
        })
    }
}

impl SearchArgs {
    fn arguments(&self) -> Value {
        json!({
            "distance": self.distance,
            "fixed_teeth": self.fixed_teeth,
            "min_teeth": self.min_teeth,
            "max_teeth": self.max_teeth,
        })
    }
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Adds the global `--pitch` / `--chain` choice to a tool's arguments.
fn with_pitch(mut arguments: Value, cli: &Cli) -> Value {
    if let Some(fields) = arguments.as_object_mut() {
        fields.insert("pitch".to_string(), json!(cli.pitch));
        fields.insert("chain".to_string(), json!(cli.chain));
    }
    arguments
}

/// Runs one calculation and prints its result.
fn run_once(tools: &ChainTools, name: &str, arguments: Value, cli: &Cli) -> ExitCode {
    let result = tools.call(name, &with_pitch(arguments, cli));
    let text = result.first_text().unwrap_or_default();

    if result.is_error {
        eprintln!("{text}");
        ExitCode::FAILURE
    } else {
        println!("{text}");
        ExitCode::SUCCESS
    }
}

/// Runs the MCP server until the client disconnects.
fn serve(tools: ChainTools) -> ExitCode {
    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "sprocket-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting sprocket-mcp server"
    );

    let mut server = McpServer::new(tools);

    info!("MCP server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

/// Entry point for sprocket-mcp.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if let Some(source) = std::error::Error::source(&e) {
                eprintln!("  caused by: {source}");
            }
            return ExitCode::FAILURE;
        }
    };

    init_tracing(get_log_level(cli.verbose, cli.quiet, &cfg.logging.level));

    let tools = match ChainTools::from_config(&cfg) {
        Ok(tools) => tools,
        Err(e) => {
            error!(error = %e, "Invalid chain configuration");
            return ExitCode::FAILURE;
        }
    };

    match cli.command.as_ref().and_then(Command::tool_call) {
        Some((name, arguments)) => run_once(&tools, name, arguments, &cli),
        None => serve(tools),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_serves() {
        let cli = Cli::parse_from(["sprocket-mcp"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["sprocket-mcp", "serve"]);
        assert!(cli.command.unwrap().tool_call().is_none());
    }

    #[test]
    fn solve_maps_to_tool() {
        let cli = Cli::parse_from([
            "sprocket-mcp",
            "solve",
            "3.5",
            "11",
            "--min-teeth",
            "18",
            "--max-teeth",
            "36",
            "--chain",
            "25",
        ]);
        assert_eq!(cli.chain.as_deref(), Some("25"));

        let (name, arguments) = cli.command.unwrap().tool_call().unwrap();
        assert_eq!(name, "solve_sprocket");
        assert_eq!(arguments["fixed_teeth"], 11);
        assert_eq!(arguments["min_teeth"], 18);
        assert_eq!(arguments["max_teeth"], 36);
    }

    #[test]
    fn solve_both_bounds_are_optional() {
        let cli = Cli::parse_from(["sprocket-mcp", "solve-both", "3.5", "--min-teeth-a", "11"]);
        let (name, arguments) = cli.command.unwrap().tool_call().unwrap();
        assert_eq!(name, "solve_both_sprockets");
        assert_eq!(arguments["min_teeth_a"], 11);
        assert!(arguments["max_teeth_b"].is_null());
    }

    #[test]
    fn pitch_and_chain_conflict() {
        let result = Cli::try_parse_from([
            "sprocket-mcp", "fit", "3.5", "11", "24", "--pitch", "0.25", "--chain", "25",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for value in ["nan", "inf", "-inf", "NaN"] {
            let pitch = Cli::try_parse_from(["sprocket-mcp", "--pitch", value, "length", "5", "20", "20"]);
            assert!(pitch.is_err(), "--pitch {value} was accepted");

            let distance = Cli::try_parse_from(["sprocket-mcp", "fit", value, "11", "24"]);
            assert!(distance.is_err(), "distance {value} was accepted");

            let length = Cli::try_parse_from(["sprocket-mcp", "round", value]);
            assert!(length.is_err(), "length {value} was accepted");
        }

        let cli = Cli::parse_from(["sprocket-mcp", "--pitch", "0.5", "length", "5", "20", "20"]);
        assert_eq!(cli.pitch, Some(0.5));
    }

    #[test]
    fn explicit_pitch_reaches_the_tool() {
        let cli = Cli::parse_from(["sprocket-mcp", "--pitch", "0.5", "length", "5", "20", "20"]);
        let (name, arguments) = cli.command.as_ref().unwrap().tool_call().unwrap();
        let tools = ChainTools::from_config(&config::Config::default()).unwrap();

        let result = tools.call(name, &with_pitch(arguments, &cli));
        assert!(!result.is_error);
        let payload: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(payload["pitch"].as_f64(), Some(0.5));
        assert_eq!(payload["length_in_pitches"].as_f64(), Some(40.0));
    }

    #[test]
    fn negative_numbers_reach_the_tools() {
        let cli = Cli::parse_from(["sprocket-mcp", "round", "-1"]);
        let (name, arguments) = cli.command.unwrap().tool_call().unwrap();
        assert_eq!(name, "practical_length");
        assert_eq!(arguments["length_in_pitches"].as_f64(), Some(-1.0));

        let cli = Cli::parse_from(["sprocket-mcp", "length", "-3", "20", "20"]);
        let (_, arguments) = cli.command.as_ref().unwrap().tool_call().unwrap();
        assert_eq!(arguments["distance"].as_f64(), Some(-3.0));

        let tools = ChainTools::from_config(&config::Config::default()).unwrap();
        let result = tools.call("chain_length", &with_pitch(arguments, &cli));
        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("must be positive"));
    }

    #[test]
    fn log_level_selection() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "nonsense"), Level::WARN);
        assert_eq!(get_log_level(2, false, "warn"), Level::DEBUG);
        assert_eq!(get_log_level(5, false, "warn"), Level::TRACE);
    }
}
