//! Operator commands typed on the observer's console

use log::{debug, warn};
use shared::{MAX_LOSS_CHANCE, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverCommand {
    Pause,
    Resume,
    TogglePause,
    Reset,
    SetWindowSize(u32),
    SetLossChance(u32),
    Snapshot,
    Quit,
}

/// Parses one console line. Unknown commands and out-of-range values yield
/// an error message suitable for echoing back to the operator.
pub fn parse_command(line: &str) -> Result<ObserverCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err("empty command".to_string());
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "pause" => ObserverCommand::Pause,
        "resume" => ObserverCommand::Resume,
        "toggle" | "p" => ObserverCommand::TogglePause,
        "reset" => ObserverCommand::Reset,
        "snapshot" | "s" => ObserverCommand::Snapshot,
        "quit" | "exit" | "q" => ObserverCommand::Quit,
        "window" | "w" => {
            let size = parse_value(parts.next(), MIN_WINDOW_SIZE, MAX_WINDOW_SIZE)?;
            ObserverCommand::SetWindowSize(size)
        }
        "loss" | "l" => {
            let chance = parse_value(parts.next(), 0, MAX_LOSS_CHANCE)?;
            ObserverCommand::SetLossChance(chance)
        }
        other => return Err(format!("unknown command '{}'", other)),
    };

    if parts.next().is_some() {
        return Err(format!("too many arguments for '{}'", word));
    }

    Ok(command)
}

fn parse_value(arg: Option<&str>, min: u32, max: u32) -> Result<u32, String> {
    let arg = arg.ok_or_else(|| format!("expected a value between {} and {}", min, max))?;
    let value: u32 = arg
        .parse()
        .map_err(|_| format!("'{}' is not a number", arg))?;

    if value < min || value > max {
        return Err(format!("{} is outside {}..={}", value, min, max));
    }
    Ok(value)
}

/// Reads commands from stdin until EOF or until the receiver goes away
pub fn spawn_stdin_reader(tx: mpsc::Sender<ObserverCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Console input closed");
                    break;
                }
                Err(e) => {
                    warn!("Error reading console input: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match parse_command(&line) {
                Ok(command) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }
    })
}
