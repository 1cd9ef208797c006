//! # Relay Bridge Library
//!
//! This library relays protocol events from a sliding-window transport engine
//! to any number of observers, and relays observer control commands back to
//! the engine. It is a stateless relay: apart from its sockets and the set of
//! connected observer sessions it keeps nothing between datagrams.
//!
//! ## Core Responsibilities
//!
//! ### Event Relay
//! Every datagram arriving on the event port is decoded against the wire
//! event schema. Malformed payloads are logged and dropped. Well-formed ones
//! are stamped with a relay sequence number, which is the authoritative
//! ordering clock for observers, and fanned out to every session.
//!
//! ### Secondary Channels
//! PROGRESS_UPDATE and FILE_COMPLETE events additionally produce narrowed
//! `progress_update` and `file_complete` frames, so observers that only care
//! about file transfers can ignore the raw stream.
//!
//! ### Control Relay
//! Observers submit `{target, value}` commands on their WebSocket. The bridge
//! translates them to the engine's control schema and sends them to the fixed
//! control address. Nothing is acknowledged, coalesced or retried.
//!
//! ## Architecture Design
//!
//! ### Sequential Inbound Loop
//! A single loop owns the inbound socket and the relay clock. It never waits
//! on an observer: broadcasting only queues frames.
//!
//! ### Per-Session Writers
//! Each observer gets a bounded queue drained by its own writer task. A slow
//! or disconnected observer fills or closes its own queue and loses frames;
//! nobody else is affected.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Addresses, session limits and their validation.
//!
//! ### Datagram Module (`datagram`)
//! The inbound event socket and the outbound control socket.
//!
//! ### Hub Module (`hub`)
//! Observer session registry and non-blocking fan-out.
//!
//! ### Relay Module (`relay`)
//! The bridge service tying the other modules together.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use bridge::config::BridgeConfig;
//! use bridge::relay::RelayBridge;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Events on udp://0.0.0.0:5000, control to udp://127.0.0.1:5001,
//!     // observers on ws://0.0.0.0:3000
//!     let bridge = RelayBridge::bind(&BridgeConfig::default()).await?;
//!     bridge.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod datagram;
pub mod error;
pub mod hub;
pub mod relay;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use relay::RelayBridge;
