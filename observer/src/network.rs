use crate::console::ObserverCommand;
use crate::engine::StateEngine;
use crate::error::ObserverError;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{CodecError, ControlCommand, ObserverMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// What the client loop should do after a console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Send(ControlCommand),
    PrintSnapshot,
    Quit,
}

/// Applies one observer frame to the engine.
///
/// Returns true if a packet event changed engine state. Narrowed channels
/// are only logged; the same information arrives through `packet_event`.
pub fn apply_frame(engine: &mut StateEngine, text: &str) -> Result<bool, CodecError> {
    let message = ObserverMessage::from_text(text)?;

    match &message {
        ObserverMessage::ProgressUpdate {
            received, total, ..
        } => {
            debug!("Progress {}/{} bytes", received, total);
        }
        ObserverMessage::FileComplete { filename, size } => {
            info!("File {} complete ({} bytes)", filename, size);
        }
        ObserverMessage::PacketEvent { .. } => {}
    }

    match message.into_protocol_event()? {
        Some(event) => Ok(engine.apply(&event)),
        None => Ok(false),
    }
}

/// Applies a console command locally and says whether anything has to go
/// out to the bridge
pub fn apply_command(engine: &mut StateEngine, command: ObserverCommand) -> CommandOutcome {
    match command {
        ObserverCommand::Pause => {
            engine.pause();
            info!("Paused");
        }
        ObserverCommand::Resume => {
            engine.resume();
            info!("Resumed");
        }
        ObserverCommand::TogglePause => {
            let paused = engine.toggle_pause();
            info!("Paused: {}", paused);
        }
        ObserverCommand::Reset => {
            engine.reset();
            info!("State reset");
        }
        ObserverCommand::SetWindowSize(size) => {
            engine.note_window_request(u64::from(size));
            return CommandOutcome::Send(ControlCommand::window_size(size));
        }
        ObserverCommand::SetLossChance(chance) => {
            return CommandOutcome::Send(ControlCommand::loss_chance(chance));
        }
        ObserverCommand::Snapshot => return CommandOutcome::PrintSnapshot,
        ObserverCommand::Quit => return CommandOutcome::Quit,
    }

    CommandOutcome::Continue
}

fn print_snapshot(engine: &StateEngine) -> Result<(), CodecError> {
    let snapshot = engine.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// One observer session against the relay bridge
pub struct ObserverClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    engine: StateEngine,
    snapshot_interval: Option<Duration>,
}

impl ObserverClient {
    pub async fn connect(
        url: &str,
        snapshot_interval: Option<Duration>,
    ) -> Result<Self, ObserverError> {
        info!("Connecting to bridge at {}...", url);
        let (stream, _) = connect_async(url).await?;
        info!("Connected");

        Ok(ObserverClient {
            stream,
            engine: StateEngine::new(),
            snapshot_interval,
        })
    }

    pub fn engine(&self) -> &StateEngine {
        &self.engine
    }

    /// Runs until the bridge closes the session or a quit command arrives.
    /// Either way the engine is handed back so callers can inspect the final
    /// state. A connection that drops without a close frame is
    /// `ObserverError::Closed`.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<ObserverCommand>,
    ) -> Result<StateEngine, ObserverError> {
        let ObserverClient {
            stream,
            mut engine,
            snapshot_interval,
        } = self;
        let (mut sink, mut frames) = stream.split();

        let periodic = snapshot_interval.is_some();
        let mut snapshot_ticker = interval(snapshot_interval.unwrap_or(Duration::from_secs(3600)));
        let mut commands_open = true;

        loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = apply_frame(&mut engine, &text) {
                            warn!("Dropping malformed frame: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Bridge closed the session");
                        break;
                    }
                    None => {
                        warn!("Connection to the bridge dropped without a close frame");
                        return Err(ObserverError::Closed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        return Err(e.into());
                    }
                },

                command = commands.recv(), if commands_open => match command {
                    Some(command) => match apply_command(&mut engine, command) {
                        CommandOutcome::Continue => {}
                        CommandOutcome::Send(control) => {
                            let text = serde_json::to_string(&control).map_err(CodecError::from)?;
                            sink.send(Message::Text(text)).await?;
                            info!("Requested {:?} = {}", control.target, control.value);
                        }
                        CommandOutcome::PrintSnapshot => print_snapshot(&engine)?,
                        CommandOutcome::Quit => {
                            if let Err(e) = sink.close().await {
                                debug!("Error closing session: {}", e);
                            }
                            break;
                        }
                    },
                    None => {
                        debug!("Command channel closed");
                        commands_open = false;
                    }
                },

                _ = snapshot_ticker.tick(), if periodic => {
                    print_snapshot(&engine)?;
                },
            }
        }

        Ok(engine)
    }
}
