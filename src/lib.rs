//! Rust library for remote control of Behringer X32 digital mixers
//!
//! This library provides an async API for controlling an X32 (or M32/XR
//! family) console over its OSC-over-UDP remote protocol. It supports:
//!
//! - Request/reply correlation over connectionless datagrams, with a
//!   per-call timeout
//! - Automatic subscription keep-alive (`/xcontrol` + `/xremote`)
//! - Unit conversion between dB / pan / percent and the wire's 0.0-1.0 scale
//! - Fader, mute, pan, name, send, EQ, gate and dynamics control per strip
//! - Preamp gain and phantom power
//! - Unsolicited state updates pushed by the console
//!
//! # Quick Start
//!
//! ```no_run
//! use x32_remote::X32Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = X32Client::connect("192.168.1.64").await?;
//!
//!     let info = client.info().await?;
//!     println!("Connected to {} running {}", info.console_model, info.console_version);
//!
//!     let ch1 = client.channel(1);
//!     ch1.set_fader_db(-10.0).await?;
//!     ch1.set_mute(false).await?;
//!     ch1.set_eq_gain(1, 5.0).await?;
//!
//!     // Raw access for anything without a typed wrapper
//!     let level = client.get("/bus/01/mix/fader").await?;
//!     println!("bus 1 fader: {:?}", level);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Client**: Connection state, request issuing and strip access
//! - **Strip**: High-level control API for channels, buses, DCAs, ...
//! - **Correlator**: Matches address-keyed replies to waiting calls
//! - **Transport**: UDP socket and inbound dispatch loop
//! - **Keeper**: Periodic subscription renewal
//! - **Protocol**: OSC message structures and the wire value union
//! - **Units / Paths**: Pure unit conversions and address builders

mod client;
mod config;
mod correlator;
mod error;
mod keeper;
pub mod paths;
mod protocol;
mod strip;
mod subscription;
mod transport;
pub mod units;

// Public exports
pub use client::{MixerInfo, MixerStatus, X32Client};
pub use config::{ClientOptions, DEFAULT_PORT};
pub use error::{Result, X32Error};
pub use paths::{TalkbackBank, Target};
pub use protocol::{decode_datagram, Message, Request, WireValue, XCONTROL, XREMOTE};
pub use strip::{Headamp, Strip};
pub use subscription::UpdateReceiver;
