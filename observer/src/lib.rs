//! # Observer Library
//!
//! Client-side half of the protocol visualizer. An observer subscribes to
//! the relay bridge, rebuilds the sliding-window protocol state from the
//! events it is sent, and lets an operator steer the protocol engine.
//!
//! ## Architecture Overview
//!
//! Every observer owns its state outright. Two observers attached to the
//! same bridge see the same ordered event stream but may diverge when one
//! of them pauses or resets; nothing is shared between them.
//!
//! ### State Reconstruction
//! The engine applies `packet_event` frames in arrival order. Per-packet
//! status follows a small transition table in which ACKED is terminal, so
//! stale timeouts or retransmits observed after an acknowledgement never
//! downgrade a packet. Counters only grow until an explicit reset.
//!
//! ### Pause and Reset
//! Pausing drops incoming events entirely; they are not buffered and
//! replayed on resume. Reset returns all derived state to its initial value
//! without touching the bridge or the protocol engine.
//!
//! ### Control
//! Window size and loss chance changes are sent to the bridge, which
//! forwards them to the protocol engine. The observer never assumes a
//! change took effect until the engine reports it through later events.
//!
//! ## Module Organization
//!
//! ### Engine Module (`engine`)
//! - Packet status map, window bounds and cumulative metrics
//! - File transfer progress and preview path
//! - Throughput samples and ACK rate
//! - Serializable snapshots for rendering
//!
//! ### History Module (`history`)
//! Bounded log of applied events, newest last.
//!
//! ### Animation Module (`animation`)
//! Transient per-packet markers with explicit expiry instants.
//!
//! ### Console Module (`console`)
//! Parsing of operator commands read from stdin.
//!
//! ### Network Module (`network`)
//! WebSocket session with the bridge and the client loop tying frames,
//! commands and periodic snapshots together.
//!
//! ## Usage Example
//!
//! ```no_run
//! use observer::console::spawn_stdin_reader;
//! use observer::network::ObserverClient;
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), observer::ObserverError> {
//! let (tx, rx) = mpsc::channel(16);
//! spawn_stdin_reader(tx);
//!
//! let client =
//!     ObserverClient::connect("ws://127.0.0.1:3000", Some(Duration::from_secs(1))).await?;
//! let engine = client.run(rx).await?;
//! println!("{:?}", engine.metrics());
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod console;
pub mod engine;
pub mod error;
pub mod history;
pub mod network;

pub use engine::{EngineSnapshot, PacketStatus, StateEngine};
pub use error::ObserverError;
