//! evalctl - evaluate chess positions from the command line.
//!
//! Wires a local Stockfish process, and optionally a file of tablebase
//! answers, into the evaluation service:
//!
//! 1. **`eval <FEN>`**: prints the formatted evaluation of a position from
//!    the requested perspective, or both provider views with `--dual`.
//! 2. **`quality <FEN> <MOVE>`**: judges a move (UCI or SAN) played by the
//!    side to move.
//!
//! Results go to stdout (as JSON with `--json`); logs go to stderr and are
//! filtered through `RUST_LOG`. Orchestrator options come from `EVAL_*`
//! variables, engine options from `EVALCTL_*` variables (see [`config`]);
//! flags override both.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chess::Side;
use clap::{Parser, Subcommand};
use engine::{EngineConfig, StockfishProvider};
use eval_service::{EvaluationService, ServiceConfig, Strategy};
use evaluation::{FormattedEvaluation, NoTablebase, TablebaseProvider};

mod config;
mod tablebase;

use tablebase::StaticTablebase;

#[derive(Parser)]
#[command(name = "evalctl", about = "Chess position evaluation via engine and tablebase")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Stockfish binary. Searched for in common locations when omitted.
    #[arg(long, global = true)]
    stockfish: Option<PathBuf>,

    /// JSON file with tablebase answers.
    #[arg(long, global = true)]
    tablebase_json: Option<PathBuf>,

    /// Provider coordination: `sequential` or `race`.
    #[arg(long, global = true)]
    strategy: Option<Strategy>,

    /// Engine search time per position, in milliseconds.
    #[arg(long, global = true)]
    movetime: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a position.
    Eval {
        fen: String,

        /// Point of view (`w` or `b`). Defaults to the side to move.
        #[arg(short, long)]
        perspective: Option<Side>,

        /// Show engine and tablebase views side by side.
        #[arg(long)]
        dual: bool,

        #[arg(long)]
        json: bool,
    },
    /// Judge a move played by the side to move.
    Quality {
        fen: String,

        /// Move in UCI (`e2e4`) or SAN (`e4`) notation.
        #[arg(value_name = "MOVE")]
        mv: String,

        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn fen(&self) -> &str {
        match self {
            Self::Eval { fen, .. } | Self::Quality { fen, .. } => fen,
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
}

fn load_tablebase(path: Option<&PathBuf>, fen: &str) -> anyhow::Result<Arc<dyn TablebaseProvider>> {
    let Some(path) = path else {
        return Ok(Arc::new(NoTablebase));
    };
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Arc::new(StaticTablebase::from_json(&body, fen)?))
}

fn describe(label: &str, eval: &FormattedEvaluation) -> String {
    let mut line = format!("{}{}", label, eval.main_text);
    if let Some(detail) = &eval.detail_text {
        line.push_str(&format!("  ({})", detail));
    }
    line.push_str(&format!("  [{:?}]", eval.classification));
    line
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, service: &EvaluationService) -> anyhow::Result<()> {
    match cli.command {
        Commands::Eval {
            fen,
            perspective,
            dual,
            json,
        } => {
            let perspective = match perspective {
                Some(side) => side,
                None => chess::side_to_move(&fen).context("invalid FEN")?,
            };

            if dual {
                let result = service.get_formatted_dual_evaluation(&fen, perspective).await;
                if json {
                    return print_json(&result);
                }
                println!("{}", describe("engine:    ", &result.engine));
                match &result.tablebase {
                    Some(tb) => println!("{}", describe("tablebase: ", tb)),
                    None => println!("tablebase: -"),
                }
            } else {
                let result = service.get_formatted_evaluation(&fen, perspective).await;
                if json {
                    return print_json(&result);
                }
                println!("{}", describe("", &result));
            }
        }
        Commands::Quality { fen, mv, json } => {
            let player = chess::side_to_move(&fen).context("invalid FEN")?;
            let result = service.assess_move_quality(&fen, &mv, player).await;
            if json {
                return print_json(&result);
            }
            let mut line = format!("{} {}", result.quality.symbol(), result.quality);
            if let Some(reason) = &result.reason {
                line.push_str(&format!("  ({})", reason));
            }
            println!("{}", line);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut service_config = ServiceConfig::from_env();
    if let Some(strategy) = cli.strategy {
        service_config.strategy = strategy;
    }

    let engine_config = EngineConfig {
        path: cli.stockfish.clone().or_else(config::get_stockfish_path),
        threads: Some(config::get_engine_threads()),
        hash_mb: Some(config::get_engine_hash_mb()),
    };
    let movetime = cli.movetime.unwrap_or_else(config::get_movetime_ms);
    // Leave the engine room to finish its search before the service gives up
    service_config.engine_timeout_ms = service_config.engine_timeout_ms.max(movetime + 2000);

    let tablebase = load_tablebase(cli.tablebase_json.as_ref(), cli.command.fen())?;
    let engine = Arc::new(StockfishProvider::new(engine_config, movetime));
    let service = EvaluationService::new(service_config, engine.clone(), tablebase);

    tracing::debug!(movetime_ms = movetime, "evalctl starting");
    let result = run(cli, &service).await;
    engine.shutdown().await;
    result
}
