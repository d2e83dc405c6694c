//! Graphene Runtime - process lifecycle and Marionette connection
//!
//! This crate provides the low-level infrastructure for driving the Graphene
//! runtime:
//!
//! - **Locate**: Finding the Graphene executable
//! - **Process**: Launching the runtime against a profile with Marionette enabled
//! - **Transport**: `length:json` framing over TCP (or any byte stream)
//! - **Connection**: Command/response correlation and handshake checks
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │   graphene-host   │  Host / Session / provider
//! └─────────┬─────────┘
//!           │
//! ┌─────────▼─────────┐
//! │ graphene-runtime  │  This crate
//! │  ┌─────────────┐  │
//! │  │ Connection  │  │  [0,id,cmd,params] / [1,id,err,result]
//! │  └─────────────┘  │
//! │  ┌─────────────┐  │
//! │  │ Transport   │  │  len:json frames
//! │  └─────────────┘  │
//! │  ┌─────────────┐  │
//! │  │ Process     │  │  graphene -profile … -marionette
//! │  └─────────────┘  │
//! └───────────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod locate;
pub mod process;
pub mod transport;

pub use connection::{Command, Connection, ErrorPayload, Handshake, MIN_PROTOCOL_LEVEL, Message, Response};
pub use error::{Error, Result};
pub use locate::{RUNTIME_ENV, locate_runtime};
pub use process::{LaunchOptions, RuntimeProcess};
pub use transport::{
	MarionetteTransport, MarionetteTransportReceiver, MarionetteTransportSender, TcpTransport, Transport,
	TransportParts, TransportReceiver,
};
