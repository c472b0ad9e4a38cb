use crate::uci::{parse_uci_message, UciMessage};
use crate::{EngineCommand, EngineEvent, EngineInfo, GoParams};
use cozy_chess::Move;
use evaluation::CancellationToken;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Grace period for `bestmove` after `stop`, or after movetime has elapsed.
const STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Stockfish not found")]
    NotFound,
    #[error("Failed to spawn Stockfish: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("Timeout waiting for engine to respond")]
    HandshakeTimeout,
    #[error("Engine did not finish the search in time")]
    SearchTimeout,
    #[error("Engine process closed")]
    Closed,
}

/// Configuration for engine performance tuning.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Explicit binary; searched for in common locations when `None`.
    pub path: Option<PathBuf>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

/// Result of one search.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    /// Last exact score line, or the last bound one if no exact score arrived.
    pub info: Option<EngineInfo>,
    pub best_move: Option<Move>,
    /// The search was cut short with `stop`.
    pub stopped: bool,
}

pub struct StockfishEngine {
    process: Child,
    stdin: mpsc::Sender<String>,
    event_rx: mpsc::Receiver<EngineEvent>,
    /// A `go` was sent whose `bestmove` has not been consumed yet.
    searching: bool,
}

impl StockfishEngine {
    /// Spawn a new Stockfish instance and complete the UCI handshake.
    #[tracing::instrument(level = "info")]
    pub async fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        let path = match &config.path {
            Some(p) => p.clone(),
            None => find_stockfish_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!(path = ?path, "Spawning Stockfish");

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn Stockfish: {}", e);
                EngineError::Spawn(e)
            })?;

        let mut stdin = process.stdin.take().ok_or(EngineError::NoStdin)?;
        let stdout = process.stdout.take().ok_or(EngineError::NoStdout)?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(256);

        // Output reader task
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Stockfish stdout EOF - engine closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);

                        let event = match parse_uci_message(trimmed) {
                            Ok(UciMessage::UciOk) => EngineEvent::UciOk,
                            Ok(UciMessage::ReadyOk) => EngineEvent::ReadyOk,
                            Ok(UciMessage::BestMove { mv, .. }) => EngineEvent::BestMove(mv),
                            Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                            Ok(UciMessage::Id { name, value }) => {
                                tracing::debug!("Engine id {}: {}", name, value);
                                continue;
                            }
                            Err(_) => continue,
                        };

                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from Stockfish stdout: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Output reader task exiting");
        });

        // Stdin writer task
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(async move {
            while let Some(cmd) = stdin_rx.recv().await {
                tracing::trace!("UCI >> {}", cmd.trim());
                if let Err(e) = stdin.write_all(cmd.as_bytes()).await {
                    tracing::error!("Failed to write to stdin: {}", e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    tracing::error!("Failed to flush stdin: {}", e);
                    break;
                }
            }
            tracing::debug!("Stdin writer task exiting");
        });

        let mut engine = Self {
            process,
            stdin: stdin_tx,
            event_rx,
            searching: false,
        };

        engine.send_command(EngineCommand::Uci).await?;
        engine.wait_for(HANDSHAKE_TIMEOUT, |e| matches!(e, EngineEvent::UciOk)).await?;

        if let Some(threads) = config.threads {
            let threads = threads.clamp(1, 512);
            tracing::info!("Setting Threads to {}", threads);
            engine.set_option("Threads", threads).await?;
        }
        if let Some(hash_mb) = config.hash_mb {
            let hash_mb = hash_mb.clamp(1, 33_554_432);
            tracing::info!("Setting Hash to {} MB", hash_mb);
            engine.set_option("Hash", hash_mb).await?;
        }

        engine.send_command(EngineCommand::IsReady).await?;
        engine.wait_for(HANDSHAKE_TIMEOUT, |e| matches!(e, EngineEvent::ReadyOk)).await?;

        tracing::info!("Stockfish engine spawned and initialized successfully");
        Ok(engine)
    }

    async fn set_option(&self, name: &str, value: impl ToString) -> Result<(), EngineError> {
        self.send_command(EngineCommand::SetOption {
            name: name.to_string(),
            value: Some(value.to_string()),
        })
        .await
    }

    /// Send a command to the engine
    pub async fn send_command(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        self.stdin
            .send(cmd.to_uci_line())
            .await
            .map_err(|_| EngineError::Closed)
    }

    /// Discard events until one matches, failing after `limit`.
    async fn wait_for(
        &mut self,
        limit: Duration,
        mut pred: impl FnMut(&EngineEvent) -> bool,
    ) -> Result<EngineEvent, EngineError> {
        let rx = &mut self.event_rx;
        let wait = async {
            while let Some(event) = rx.recv().await {
                if pred(&event) {
                    return Ok(event);
                }
            }
            Err(EngineError::Closed)
        };
        match tokio::time::timeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Timeout waiting for engine");
                Err(EngineError::HandshakeTimeout)
            }
        }
    }

    /// Stop a search abandoned by an earlier caller and drain its output.
    async fn resync(&mut self) -> Result<(), EngineError> {
        if !self.searching {
            return Ok(());
        }
        tracing::debug!("Stopping abandoned search");
        self.send_command(EngineCommand::Stop).await?;
        self.wait_for(STOP_GRACE, |e| matches!(e, EngineEvent::BestMove(_)))
            .await?;
        self.searching = false;
        Ok(())
    }

    /// Search `fen` for `movetime_ms`. Cancelling `cancel` sends `stop`; the
    /// engine is always drained to `bestmove` before returning.
    #[tracing::instrument(level = "debug", skip(self, cancel))]
    pub async fn analyze(
        &mut self,
        fen: &str,
        movetime_ms: u64,
        cancel: &CancellationToken,
    ) -> Result<Analysis, EngineError> {
        self.resync().await?;

        self.send_command(EngineCommand::SetPosition {
            fen: fen.to_string(),
            moves: Vec::new(),
        })
        .await?;
        self.send_command(EngineCommand::Go(GoParams::movetime(movetime_ms)))
            .await?;
        self.searching = true;

        let mut analysis = Analysis::default();
        let mut bounded: Option<EngineInfo> = None;
        let deadline = tokio::time::sleep(Duration::from_millis(movetime_ms) + STOP_GRACE);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(EngineEvent::Info(info)) if info.multipv.unwrap_or(1) == 1 => {
                        if info.is_exact() {
                            analysis.info = Some(info);
                        } else if info.score.is_some() {
                            bounded = Some(info);
                        }
                    }
                    Some(EngineEvent::BestMove(mv)) => {
                        analysis.best_move = mv;
                        break;
                    }
                    Some(_) => {}
                    None => return Err(EngineError::Closed),
                },
                _ = cancel.cancelled(), if !analysis.stopped => {
                    tracing::debug!("Search cancelled, sending stop");
                    self.send_command(EngineCommand::Stop).await?;
                    analysis.stopped = true;
                }
                _ = &mut deadline => {
                    // Leave `searching` set so the next call resyncs
                    return Err(EngineError::SearchTimeout);
                }
            }
        }

        self.searching = false;
        if analysis.info.is_none() {
            analysis.info = bounded;
        }
        Ok(analysis)
    }

    /// Shutdown the engine
    pub async fn shutdown(mut self) {
        let _ = self.send_command(EngineCommand::Quit).await;
        let _ = tokio::time::timeout(Duration::from_secs(1), self.process.wait()).await;
        let _ = self.process.kill().await;
    }
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(found) = paths.iter().map(Path::new).find(|p| p.exists()) {
        return Some(found.to_path_buf());
    }

    // In PATH
    std::env::var_os("PATH").and_then(|dirs| {
        std::env::split_paths(&dirs)
            .map(|dir| dir.join("stockfish"))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let config = EngineConfig {
            path: Some(PathBuf::from("/nonexistent/stockfish-binary")),
            ..Default::default()
        };
        let result = StockfishEngine::spawn(config).await;
        assert!(matches!(result, Err(EngineError::Spawn(_))));
    }
}
